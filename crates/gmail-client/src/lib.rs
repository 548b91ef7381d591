//! Synchronous client library for the Gmail REST API
//!
//! This crate provides:
//! - OAuth2 authorization code flow with a loopback callback listener
//! - Token storage per account alias, with expiry-aware refresh
//! - Typed endpoint wrappers (messages, threads, drafts, labels, filters,
//!   settings, history, attachments)
//! - Convenience operations that compose them: reply, reply-all, forward,
//!   mark read/unread, archive
//!
//! Every operation blocks the calling thread until its network calls
//! complete. The on-disk token file is the only state shared across
//! processes; concurrent refreshes race at the file level and the last
//! writer wins.
//!
//! ```no_run
//! use gmail_client::{GmailClient, authorize};
//!
//! # fn main() -> gmail_client::Result<()> {
//! // One-time interactive setup
//! let client = authorize("work", None)?;
//!
//! // Later sessions reuse the stored token
//! let client = GmailClient::new("work", None)?;
//! client.reply("19305abc123", "Sounds good, thanks!")?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod gmail;
pub mod models;

pub use crate::config::GmailCredentials;
pub use error::{Error, Result};
pub use gmail::api::{ListQuery, MessageFormat};
pub use gmail::{
    GmailAuth, GmailClient, OutgoingMessage, ReplyAllRecipients, authorize,
    authorize_with_timeout, forward_body, labels, resolve_reply_all,
};
pub use gmail::body::{extract_body, extract_plain_text};
pub use models::{EmailAddress, parse_address_list};
