//! Client implementation for the DIAL chat completion API.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    error::{DialError, Result},
    models::{CustomFields, Message, Response},
};

const API_KEY_HEADER: &str = "api-key";
/// Placeholder in the endpoint that is replaced by the deployment name
const MODEL_PLACEHOLDER: &str = "{model}";
/// Body keys owned by the client that custom fields may not override
const RESERVED_FIELDS: [&str; 2] = ["deployment_name", "messages"];

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    deployment_name: &'a str,
    messages: &'a [Message],
    #[serde(flatten)]
    custom_fields: CustomFields,
}

/// A blocking client bound to one chat completion deployment.
///
/// Construction is pure configuration; nothing touches the network until
/// [`get_completion`](Self::get_completion) is called. The call blocks the
/// current thread, so do not invoke it from inside an async runtime without
/// `spawn_blocking`.
#[derive(Debug, Clone)]
pub struct DialModelClient {
    endpoint: String,
    deployment_name: String,
    api_key: String,
    timeout: Option<Duration>,
}

impl DialModelClient {
    /// Creates a new model client.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Chat completion URL; a `{model}` placeholder is
    ///   replaced by the deployment name
    /// * `deployment_name` - The deployment to address, e.g. `gpt-4o`
    /// * `api_key` - The API key for authentication
    pub fn new(
        endpoint: impl Into<String>,
        deployment_name: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            deployment_name: deployment_name.into(),
            api_key: api_key.into(),
            timeout: None,
        }
    }

    /// Sets an overall request timeout. By default requests wait for the
    /// endpoint indefinitely.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The deployment this client addresses.
    pub fn deployment_name(&self) -> &str {
        &self.deployment_name
    }

    fn completion_url(&self) -> String {
        self.endpoint.replace(MODEL_PLACEHOLDER, &self.deployment_name)
    }

    fn validate(&self, messages: &[Message]) -> Result<()> {
        if messages.is_empty() {
            return Err(DialError::invalid("messages must not be empty"));
        }
        if self.endpoint.is_empty() {
            return Err(DialError::Config("endpoint must not be empty".into()));
        }
        if self.deployment_name.is_empty() {
            return Err(DialError::Config("deployment name must not be empty".into()));
        }
        if self.api_key.is_empty() {
            return Err(DialError::Config("API key must not be empty".into()));
        }
        Ok(())
    }

    fn build_request<'a>(
        &'a self,
        messages: &'a [Message],
        custom_fields: CustomFields,
    ) -> ChatRequest<'a> {
        let custom_fields = custom_fields
            .iter()
            .filter(|(key, _)| {
                let reserved = RESERVED_FIELDS.contains(&key.as_str());
                if reserved {
                    warn!(
                        key = key.as_str(),
                        "ignoring custom field that shadows a request field"
                    );
                }
                !reserved
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        ChatRequest {
            deployment_name: &self.deployment_name,
            messages,
            custom_fields,
        }
    }

    /// Sends the conversation to the deployment and returns its reply.
    ///
    /// # Arguments
    ///
    /// * `messages` - The conversation so far, oldest first
    /// * `custom_fields` - Backend-specific generation options, passed
    ///   through without interpretation
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` without touching the network if `messages`
    /// is empty, and `Completion` with the backend status on any
    /// non-success response.
    pub fn get_completion(
        &self,
        messages: &[Message],
        custom_fields: impl Into<CustomFields>,
    ) -> Result<Response> {
        self.validate(messages)?;
        let request = self.build_request(messages, custom_fields.into());
        let url = self.completion_url();
        debug!(
            %url,
            deployment = %self.deployment_name,
            messages = messages.len(),
            "sending chat completion request"
        );

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?;
        let response = client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            warn!(%status, deployment = %self.deployment_name, "chat completion failed");
            return Err(DialError::Completion {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = response.json()?;
        Response::from_value(body)
    }
}
