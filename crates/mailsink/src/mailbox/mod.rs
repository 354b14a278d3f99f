//! Remote mailbox access.
//!
//! This module provides the narrow capability the pipeline consumes
//! (folder lookup, filtered message listing, attachment retrieval, and
//! message moves), together with OAuth2 client-credential token caching and
//! the bounded-retry discipline applied to every remote call.

pub mod client;
pub mod error;
pub mod retry;
pub mod token;

pub use client::{Attachment, GraphMailClient, MailFolder, MailboxApi, Message};
pub use error::MailboxError;
pub use retry::RetryPolicy;
pub use token::TokenManager;
