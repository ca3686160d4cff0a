//! Uploads a local image and asks a vision model to describe it.

use std::path::PathBuf;

use dial_ai_rust::{
    models::{Attachment, CustomFields, Message},
    DialConfig,
};
use dotenv::dotenv;
use tracing_subscriber::EnvFilter;

const DEPLOYMENT: &str = "gpt-4o";
const IMAGE_FILE: &str = "dialx-banner.png";
const MIME_TYPE_PNG: &str = "image/png";

async fn put_image(
    config: &DialConfig,
    path: PathBuf,
) -> Result<Attachment, Box<dyn std::error::Error>> {
    let mut bucket = config.bucket_client();
    let attachment = bucket
        .scope(|bucket| {
            Box::pin(async move { bucket.put_path(&path, Some(MIME_TYPE_PNG)).await })
        })
        .await?;
    Ok(attachment)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = DialConfig::from_env()?;
    let client = config.model_client(DEPLOYMENT);

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(IMAGE_FILE));
    let attachment = tokio::runtime::Runtime::new()?.block_on(put_image(&config, path))?;
    println!("Uploaded attachment: {:?}", attachment);

    let message = Message::user("What do you see on this picture?").with_attachments([attachment]);
    let response = client.get_completion(&[message], CustomFields::new())?;

    println!("Model response:");
    println!("{}", response.content);

    Ok(())
}
