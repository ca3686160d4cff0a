//! Data structures exchanged with the DIAL bucket and chat completion APIs.

mod attachment;
mod custom_fields;
mod message;
mod response;
mod role;
mod upload;

pub use attachment::{Attachment, CustomContent};
pub use custom_fields::{
    CustomFields, ImageGenerationOptions, ImageQuality, ImageSize, ImageStyle,
};
pub use message::Message;
pub use response::Response;
pub use role::Role;
pub use upload::{UploadInfo, REFERENCE_KEYS};
