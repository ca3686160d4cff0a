//! Generates an image from a text prompt and saves every returned asset.

use chrono::Local;
use dial_ai_rust::{
    bucket::DialBucketClient,
    models::{Attachment, ImageGenerationOptions, ImageQuality, ImageSize, ImageStyle, Message},
    DialConfig,
};
use dotenv::dotenv;
use tracing_subscriber::EnvFilter;

const DEPLOYMENT: &str = "dall-e-3";
const PROMPT: &str = concat!(
    "Generate a vivid illustration of a sunny day on Bali, ",
    "with beaches, palm trees, and clear blue water."
);

async fn save_images(
    mut bucket: DialBucketClient,
    attachments: &[Attachment],
) -> Result<(), Box<dyn std::error::Error>> {
    let session = bucket.session()?;
    let report = session.download_attachments(attachments).await?;

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    for file in &report.files {
        let filename = format!("generated_image_{}_{}.png", timestamp, file.index);
        tokio::fs::write(&filename, &file.data).await?;
        println!("Saved generated image to {}", filename);
    }
    if report.skipped_count() > 0 {
        println!(
            "Skipped {} attachment(s) with inline content",
            report.skipped_count()
        );
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = DialConfig::from_env()?;
    let client = config.model_client(DEPLOYMENT);

    let options = ImageGenerationOptions::builder()
        .size(ImageSize::Square)
        .quality(ImageQuality::Standard)
        .style(ImageStyle::Vivid)
        .build();

    // Google's 'imagegeneration@005' deployment accepts the same request.
    let response = client.get_completion(&[Message::user(PROMPT)], options)?;

    let attachments = response.attachments();
    if attachments.is_empty() {
        println!("No attachments with generated images were returned by the model.");
        return Ok(());
    }

    tokio::runtime::Runtime::new()?.block_on(save_images(config.bucket_client(), attachments))
}
