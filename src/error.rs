//! Error types for the DIAL clients.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DialError>;

/// Errors that can occur when using the DIAL bucket and model clients.
#[derive(Debug, Error)]
pub enum DialError {
    /// A bucket operation was attempted outside an acquired session.
    #[error("bucket client is not acquired; open a session first")]
    NotAcquired,

    /// The bucket session was acquired twice without being released.
    #[error("bucket client is already acquired")]
    AlreadyAcquired,

    /// The local byte source could not be fully read.
    #[error("Failed to read upload content: {0}")]
    IoRead(#[source] std::io::Error),

    /// The object store rejected an upload.
    #[error("Upload failed with status {status}: {message}")]
    Upload {
        /// HTTP status returned by the store
        status: u16,
        /// Diagnostic returned by the store
        message: String,
    },

    /// The object store rejected a download.
    #[error("Download failed with status {status}: {message}")]
    Download {
        /// HTTP status returned by the store
        status: u16,
        /// Diagnostic returned by the store
        message: String,
    },

    /// The reference does not resolve to a stored object.
    #[error("File not found: {0}")]
    NotFound(String),

    /// The request violates the content model and was never sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The chat completion endpoint returned a non-success response.
    #[error("Completion failed with status {status}: {message}")]
    Completion {
        /// HTTP status returned by the endpoint
        status: u16,
        /// Diagnostic returned by the endpoint
        message: String,
    },

    /// Error occurred at the HTTP transport level.
    #[error("API request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Error occurred when parsing JSON.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error occurred when accessing environment variables.
    #[error("Environment variable not found: {0}")]
    Env(#[from] std::env::VarError),

    /// Invalid client configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl DialError {
    /// Creates a new InvalidRequest error with the given message.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Returns true when retrying the same operation may succeed.
    ///
    /// Lifecycle misuse, local read failures, missing objects and invalid
    /// requests are terminal. Store failures are treated as transient, and
    /// completion failures only when the status signals throttling or a
    /// server-side fault.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Upload { .. } | Self::Download { .. } => true,
            Self::Completion { status, .. } => *status == 429 || *status >= 500,
            Self::Request(e) => e.is_timeout() || e.is_connect(),
            Self::NotAcquired
            | Self::AlreadyAcquired
            | Self::IoRead(_)
            | Self::NotFound(_)
            | Self::InvalidRequest(_)
            | Self::Json(_)
            | Self::Env(_)
            | Self::Config(_) => false,
        }
    }
}
