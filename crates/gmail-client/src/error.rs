//! Error types for the Gmail client.

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the Gmail client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The OAuth client configuration file is missing or malformed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No stored token exists for the requested account.
    #[error("no token file for account '{account}'; run authorize(\"{account}\") first")]
    NotAuthorized { account: String },

    /// The token endpoint rejected a refresh attempt.
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    /// The loopback listener produced no usable authorization code.
    #[error("authorization callback failed: {0}")]
    AuthCallback(String),

    /// Non-2xx response from the Gmail API.
    #[error("Gmail API error {status}: {message}")]
    Api { status: u16, message: String },

    /// I/O error reading or writing local state.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization or parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] ureq::Error),
}

impl From<gmail_config::Error> for Error {
    fn from(err: gmail_config::Error) -> Self {
        match err {
            gmail_config::Error::Io(e) => Self::Io(e),
            gmail_config::Error::Json(e) => Self::Json(e),
            other => Self::Configuration(other.to_string()),
        }
    }
}
