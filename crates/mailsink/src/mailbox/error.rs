//! Remote mailbox error types.

use thiserror::Error;

/// Errors that can occur while talking to the remote mailbox.
#[derive(Error, Debug)]
pub enum MailboxError {
    /// Failed to obtain or refresh an access token.
    #[error("Token request failed: {0}")]
    Token(String),

    /// Transport-level failure (connect, timeout, TLS).
    #[error("Mailbox request failed: {0}")]
    Transport(String),

    /// The API answered with a non-success status.
    #[error("Mailbox API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The API answered with a body we could not decode.
    #[error("Failed to decode mailbox response: {0}")]
    Decode(String),

    /// Invalid client configuration.
    #[error("Invalid mailbox configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for MailboxError {
    fn from(err: reqwest::Error) -> Self {
        MailboxError::Transport(err.to_string())
    }
}

/// Result type for mailbox operations.
pub type Result<T> = std::result::Result<T, MailboxError>;
