//! Connection settings shared by the bucket and model clients.

use typed_builder::TypedBuilder;

use crate::bucket::DialBucketClient;
use crate::client::DialModelClient;
use crate::error::{DialError, Result};

/// Environment variable holding the API key
pub const API_KEY_VAR: &str = "DIAL_API_KEY";
/// Environment variable holding the service root URL
pub const BASE_URL_VAR: &str = "DIAL_URL";
/// Environment variable overriding the chat completion endpoint
pub const COMPLETIONS_ENDPOINT_VAR: &str = "DIAL_CHAT_COMPLETIONS_ENDPOINT";

/// Read-only settings for one DIAL installation.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
#[builder(doc)]
pub struct DialConfig {
    /// The API key for authentication
    #[builder(setter(into))]
    pub api_key: String,
    /// Root URL of the DIAL service, used by the bucket client
    #[builder(setter(into))]
    pub base_url: String,
    /// Chat completion endpoint; may contain a `{model}` placeholder
    #[builder(setter(into))]
    pub completions_endpoint: String,
}

impl DialConfig {
    /// Default completion endpoint for a service root URL.
    pub fn default_completions_endpoint(base_url: &str) -> String {
        format!(
            "{}/openai/deployments/{{model}}/chat/completions",
            base_url.trim_end_matches('/')
        )
    }

    /// Loads the configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `DIAL_API_KEY` - The API key for authentication
    /// * `DIAL_URL` - Root URL of the DIAL service
    /// * `DIAL_CHAT_COMPLETIONS_ENDPOINT` - Optional endpoint override
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or empty.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(API_KEY_VAR)?;
        let base_url = std::env::var(BASE_URL_VAR)?;
        let completions_endpoint = std::env::var(COMPLETIONS_ENDPOINT_VAR)
            .unwrap_or_else(|_| Self::default_completions_endpoint(&base_url));

        let config = Self::builder()
            .api_key(api_key)
            .base_url(base_url)
            .completions_endpoint(completions_endpoint)
            .build();
        config.validate()?;
        Ok(config)
    }

    /// Checks that every setting is a non-empty string.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            (API_KEY_VAR, &self.api_key),
            (BASE_URL_VAR, &self.base_url),
            (COMPLETIONS_ENDPOINT_VAR, &self.completions_endpoint),
        ] {
            if value.trim().is_empty() {
                return Err(DialError::Config(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }

    /// Creates an unacquired bucket client for this installation.
    pub fn bucket_client(&self) -> DialBucketClient {
        DialBucketClient::new(&self.api_key, &self.base_url)
    }

    /// Creates a model client bound to `deployment_name`.
    pub fn model_client(&self, deployment_name: impl Into<String>) -> DialModelClient {
        DialModelClient::new(&self.completions_endpoint, deployment_name, &self.api_key)
    }
}
