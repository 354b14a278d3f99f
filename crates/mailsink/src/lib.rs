pub mod config;
pub mod error;
pub mod mailbox;
pub mod pipeline;
pub mod policy;
pub mod sanitize;
pub mod secrets;
pub mod storage;
pub mod tracker;

pub use config::{load_allow_list, load_settings, load_settings_from_str, Settings};
pub use error::{ConfigError, MailsinkError, Result, StorageError};
pub use mailbox::{GraphMailClient, MailboxApi, MailboxError, RetryPolicy, TokenManager};
pub use pipeline::{AttachmentProcessor, ProcessingResult};
pub use secrets::{resolve_secret, SecretError};
pub use tracker::AttachmentTracker;
