//! Normalized chat completion responses.

use serde::Deserialize;
use serde_json::Value;

use super::{Attachment, CustomContent, Message, Role};
use crate::error::{DialError, Result};

/// A normalized reply from the chat completion endpoint.
///
/// Mirrors the shape of [`Message`] so it can be fed back as a later turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    /// The model's textual reply, empty for pure generation tasks.
    pub content: String,
    /// Generated assets, in the order the backend returned them.
    pub custom_content: Option<CustomContent>,
}

#[derive(Deserialize)]
struct ReplyBody {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    custom_content: Option<CustomContent>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyBody,
}

impl Response {
    /// Normalizes a raw response body into a [`Response`].
    ///
    /// Accepts the flat `{content, custom_content}` shape as well as the
    /// `{choices: [{message: {...}}]}` shape, reading the first choice.
    pub fn from_value(mut body: Value) -> Result<Self> {
        let choices = body
            .get_mut("choices")
            .filter(|choices| !choices.is_null())
            .map(Value::take);
        let reply = match choices {
            Some(choices) => {
                let choices: Vec<Choice> = serde_json::from_value(choices)?;
                choices
                    .into_iter()
                    .next()
                    .map(|choice| choice.message)
                    .ok_or_else(|| DialError::Completion {
                        status: 200,
                        message: "response contains no choices".to_string(),
                    })?
            }
            None if body.get("content").is_some() || body.get("custom_content").is_some() => {
                serde_json::from_value::<ReplyBody>(body)?
            }
            None => {
                return Err(DialError::Completion {
                    status: 200,
                    message: format!("unrecognized response shape: {body}"),
                })
            }
        };

        Ok(Self {
            content: reply.content.unwrap_or_default(),
            custom_content: reply.custom_content,
        })
    }

    /// The generated attachments, empty when there are none.
    pub fn attachments(&self) -> &[Attachment] {
        self.custom_content
            .as_ref()
            .map(CustomContent::attachments)
            .unwrap_or_default()
    }

    /// Converts the reply into an assistant message for the next turn.
    pub fn into_message(self) -> Message {
        let message = Message::new(Role::Assistant, self.content);
        match self.custom_content {
            Some(custom_content) => message.with_custom_content(custom_content),
            None => message,
        }
    }
}
