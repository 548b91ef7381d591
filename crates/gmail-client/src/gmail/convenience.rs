//! High-level mail operations
//!
//! Each operation composes primitive endpoint calls into one caller-visible
//! step: fetch the original, derive recipients and body, compose, send or
//! modify. No additional state is kept between the calls, so a concurrent
//! writer to the same thread can interleave with the fetch/send pair.

use log::info;

use crate::error::Result;

use super::api::{GmailMessage, Header, MessageFormat};
use super::body::extract_plain_text;
use super::client::GmailClient;
use super::compose::{OutgoingMessage, forward_body};
use super::recipients::resolve_reply_all;

/// Label IDs used by Gmail for common states
pub mod labels {
    pub const INBOX: &str = "INBOX";
    pub const UNREAD: &str = "UNREAD";
}

/// Headers fetched for a reply
const REPLY_HEADERS: &[&str] = &["From", "Subject", "Message-ID", "References", "Reply-To"];

/// Headers fetched for a reply-all (adds the recipient lists)
const REPLY_ALL_HEADERS: &[&str] = &[
    "From",
    "To",
    "Cc",
    "Subject",
    "Message-ID",
    "References",
    "Reply-To",
];

/// Body placeholder when a forwarded message has no extractable text
const FORWARD_FALLBACK_BODY: &str = "(no text body found)";

impl GmailClient {
    /// Reply to a message in its thread.
    ///
    /// Fetches the original message headers, builds a properly threaded
    /// reply to the sender (or Reply-To), and sends it.
    pub fn reply(&self, message_id: &str, body: &str) -> Result<GmailMessage> {
        let original = self.get_message(message_id, MessageFormat::Metadata, REPLY_HEADERS)?;
        let headers = payload_headers(&original);

        let reply_to = header_value(headers, "Reply-To");
        let to = if reply_to.is_empty() {
            header_value(headers, "From")
        } else {
            reply_to
        };
        let subject = prefixed_subject("Re:", header_value(headers, "Subject"));
        let original_message_id = header_value(headers, "Message-ID");
        let references = header_value(headers, "References");

        let mut builder =
            OutgoingMessage::builder(to, subject, body).in_reply_to(original_message_id);
        if !references.is_empty() {
            builder = builder.references(references);
        }

        info!("Replying to message {}", message_id);
        self.send_raw_message(&builder.build().encode(), Some(&original.thread_id))
    }

    /// Reply to all recipients of a message in its thread.
    ///
    /// Like [`reply`](Self::reply), but also fetches the authenticated
    /// user's own address and expands the Cc list to everyone on the
    /// original From/To/Cc headers, deduplicated and minus the user.
    pub fn reply_all(&self, message_id: &str, body: &str) -> Result<GmailMessage> {
        let original = self.get_message(message_id, MessageFormat::Metadata, REPLY_ALL_HEADERS)?;
        let headers = payload_headers(&original);

        let subject = prefixed_subject("Re:", header_value(headers, "Subject"));
        let original_message_id = header_value(headers, "Message-ID");
        let references = header_value(headers, "References");

        // Own address, to exclude from the recipient expansion
        let profile = self.get_profile()?;
        let recipients = resolve_reply_all(
            &header_value(headers, "From"),
            &header_value(headers, "To"),
            &header_value(headers, "Cc"),
            &header_value(headers, "Reply-To"),
            &profile.email_address,
        );

        let mut builder = OutgoingMessage::builder(recipients.to.display(), subject, body)
            .in_reply_to(original_message_id);
        if !references.is_empty() {
            builder = builder.references(references);
        }
        if !recipients.cc.is_empty() {
            let cc: Vec<String> = recipients.cc.iter().map(|a| a.display()).collect();
            builder = builder.cc(cc.join(", "));
        }

        info!(
            "Replying to all on message {} ({} cc)",
            message_id,
            recipients.cc.len()
        );
        self.send_raw_message(&builder.build().encode(), Some(&original.thread_id))
    }

    /// Forward a message to another recipient.
    ///
    /// Fetches the full message, extracts its plain-text body, prepends the
    /// forwarding banner (and optional note), and sends. Forwarding starts
    /// a new thread: no threading headers are set.
    pub fn forward(
        &self,
        message_id: &str,
        to: &str,
        note: Option<&str>,
    ) -> Result<GmailMessage> {
        let original = self.get_message(message_id, MessageFormat::Full, &[])?;
        let headers = payload_headers(&original);

        let subject = prefixed_subject("Fwd:", header_value(headers, "Subject"));
        let original_body = original
            .payload
            .as_ref()
            .and_then(extract_plain_text)
            .unwrap_or_else(|| FORWARD_FALLBACK_BODY.to_string());

        let message =
            OutgoingMessage::builder(to, subject, forward_body(&original_body, note)).build();

        info!("Forwarding message {} to {}", message_id, to);
        self.send_raw_message(&message.encode(), None)
    }

    /// Mark a message as read (remove the UNREAD label).
    pub fn mark_as_read(&self, message_id: &str) -> Result<GmailMessage> {
        self.modify_message(message_id, &[], &[labels::UNREAD])
    }

    /// Mark a message as unread (add the UNREAD label).
    pub fn mark_as_unread(&self, message_id: &str) -> Result<GmailMessage> {
        self.modify_message(message_id, &[labels::UNREAD], &[])
    }

    /// Archive a message (remove the INBOX label).
    pub fn archive(&self, message_id: &str) -> Result<GmailMessage> {
        self.modify_message(message_id, &[], &[labels::INBOX])
    }
}

/// Headers of a message payload, or an empty slice when absent.
fn payload_headers(message: &GmailMessage) -> &[Header] {
    message
        .payload
        .as_ref()
        .and_then(|payload| payload.headers.as_deref())
        .unwrap_or(&[])
}

/// First header value matching `name` (case-insensitive), else "".
fn header_value(headers: &[Header], name: &str) -> String {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.clone())
        .unwrap_or_default()
}

/// Prepend `prefix` ("Re:"/"Fwd:") unless already present, any case.
fn prefixed_subject(prefix: &str, subject: String) -> String {
    if subject.to_lowercase().starts_with(&prefix.to_lowercase()) {
        subject
    } else {
        format!("{} {}", prefix, subject)
    }
}
