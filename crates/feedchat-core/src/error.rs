//! Error types for every failure family the client distinguishes.
//!
//! Only [`AuthError`] is meant to interrupt the user. Feed and post failures are
//! logged and swallowed by the surface, and chat failures are folded into the
//! transcript as error messages.

use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Fallback alert text when the identity service gives no usable detail.
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not determine {0} directory")]
    NoDirectory(&'static str),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// The identity service refused the credentials.
    #[error("{0}")]
    Rejected(String),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("token response did not contain an access token")]
    MissingToken,
    #[error("could not save session: {0}")]
    Store(#[from] StoreError),
}

impl AuthError {
    /// Text for the blocking login alert.
    pub fn alert_message(&self) -> String {
        match self {
            AuthError::Rejected(detail) => detail.clone(),
            AuthError::Store(_) => self.to_string(),
            AuthError::Network(_) | AuthError::MissingToken => INVALID_CREDENTIALS.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("feed request failed with status {0}")]
    Status(StatusCode),
    #[error("feed response was not a list of posts: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("a newer feed refresh already landed")]
    Superseded,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("unsupported image type: {0}")]
    UnsupportedImage(String),
    #[error("could not read image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("post request failed with status {0}")]
    Status(StatusCode),
}

/// Display text of a `ChatError` is the description appended to the
/// transcript error message.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{0}")]
    Network(#[from] reqwest::Error),
    #[error("{message}")]
    Service { status: u16, message: String },
    #[error("HTTP error! status: {0}")]
    Status(u16),
    #[error("Invalid response format")]
    InvalidFormat,
}
