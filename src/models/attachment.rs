//! Attachment references and the custom content that carries them.

use serde::{Deserialize, Serialize};

use crate::error::{DialError, Result};

/// A typed reference to binary content stored outside a message.
///
/// `title` is a display name only. `url`, when present, is the handle the
/// bucket client needs to fetch the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAttachment")]
pub struct Attachment {
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(rename = "type")]
    mime_type: String,
}

#[derive(Deserialize)]
struct RawAttachment {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(rename = "type")]
    mime_type: String,
}

impl TryFrom<RawAttachment> for Attachment {
    type Error = DialError;

    fn try_from(raw: RawAttachment) -> Result<Self> {
        Self::new(raw.title, raw.url, raw.mime_type)
    }
}

impl Attachment {
    /// Creates an attachment, rejecting a missing or malformed MIME type.
    ///
    /// # Arguments
    ///
    /// * `title` - Display name of the asset
    /// * `url` - Reference resolvable through the bucket client, if any
    /// * `mime_type` - MIME type of the asset, e.g. `image/png`
    pub fn new(
        title: impl Into<String>,
        url: impl Into<Option<String>>,
        mime_type: impl Into<String>,
    ) -> Result<Self> {
        let mime_type = mime_type.into();
        validate_mime_type(&mime_type)?;
        Ok(Self {
            title: title.into(),
            url: url.into(),
            mime_type,
        })
    }

    /// Display name of the asset.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Reference to the stored bytes, absent for inline content.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// MIME type of the asset.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

fn validate_mime_type(mime_type: &str) -> Result<()> {
    if mime_type.trim().is_empty() {
        return Err(DialError::invalid("attachment type must not be empty"));
    }
    mime_type
        .parse::<mime_guess::Mime>()
        .map(|_| ())
        .map_err(|e| DialError::invalid(format!("invalid MIME type {mime_type:?}: {e}")))
}

/// Attachment-bearing extension of a message or response.
///
/// Attachment order is preserved exactly as given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomContent {
    #[serde(default)]
    attachments: Vec<Attachment>,
}

impl CustomContent {
    /// Creates custom content from an ordered sequence of attachments.
    pub fn new(attachments: impl IntoIterator<Item = Attachment>) -> Self {
        Self {
            attachments: attachments.into_iter().collect(),
        }
    }

    /// The attachments in their original order.
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Consumes the content and returns its attachments.
    pub fn into_attachments(self) -> Vec<Attachment> {
        self.attachments
    }

    /// Returns true when no attachments are present.
    pub fn is_empty(&self) -> bool {
        self.attachments.is_empty()
    }
}

impl From<Attachment> for CustomContent {
    fn from(attachment: Attachment) -> Self {
        Self::new([attachment])
    }
}

/// Builds custom content from optional entries, rejecting any gap.
impl TryFrom<Vec<Option<Attachment>>> for CustomContent {
    type Error = DialError;

    fn try_from(entries: Vec<Option<Attachment>>) -> Result<Self> {
        entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                entry.ok_or_else(|| {
                    DialError::invalid(format!("attachment at index {index} is null"))
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Self::new)
    }
}
