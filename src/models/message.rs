use serde::{Deserialize, Serialize};

use super::{Attachment, CustomContent, Role};

/// One turn of a multimodal conversation.
///
/// A message with empty `content` and only attachments is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    custom_content: Option<CustomContent>,
}

impl Message {
    /// Creates a text-only message.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            custom_content: None,
        }
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Returns the message with the given custom content attached.
    pub fn with_custom_content(mut self, custom_content: impl Into<CustomContent>) -> Self {
        self.custom_content = Some(custom_content.into());
        self
    }

    /// Returns the message with the given attachments attached.
    pub fn with_attachments(self, attachments: impl IntoIterator<Item = Attachment>) -> Self {
        self.with_custom_content(CustomContent::new(attachments))
    }

    /// The speaker of the message.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The textual payload.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// The attachment-bearing extension, if any.
    pub fn custom_content(&self) -> Option<&CustomContent> {
        self.custom_content.as_ref()
    }

    /// The attachments carried by the message, empty when there are none.
    pub fn attachments(&self) -> &[Attachment] {
        self.custom_content
            .as_ref()
            .map(CustomContent::attachments)
            .unwrap_or_default()
    }
}
