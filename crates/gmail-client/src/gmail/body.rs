//! Message body extraction
//!
//! Finds the first part of a requested MIME type in a message payload tree
//! and decodes its base64url content. Decoding is best-effort: malformed
//! UTF-8 is replaced rather than surfaced, so extraction returns text or
//! nothing, never an error.

use base64::prelude::*;

use super::api::MessagePart;

/// Recursively extract the first body of `mime_type` from a payload tree.
///
/// A part matches when its MIME type equals `mime_type` exactly and it has
/// inline data. Children are searched depth-first in document order.
pub fn extract_body(payload: &MessagePart, mime_type: &str) -> Option<String> {
    if payload.mime_type.as_deref() == Some(mime_type)
        && let Some(body) = &payload.body
        && let Some(data) = &body.data
        && let Some(text) = decode_body_data(data)
    {
        return Some(text);
    }

    if let Some(parts) = &payload.parts {
        for part in parts {
            if let Some(text) = extract_body(part, mime_type) {
                return Some(text);
            }
        }
    }

    None
}

/// Extract the first text/plain body from a payload tree.
pub fn extract_plain_text(payload: &MessagePart) -> Option<String> {
    extract_body(payload, "text/plain")
}

/// Decode base64-encoded body data.
///
/// Gmail uses URL-safe base64 but padding can vary, so several engines are
/// tried in turn. Invalid UTF-8 sequences are replaced, not rejected.
fn decode_body_data(data: &str) -> Option<String> {
    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE};

    let decoders: &[&base64::engine::GeneralPurpose] =
        &[&BASE64_URL_SAFE_NO_PAD, &URL_SAFE, &STANDARD, &STANDARD_NO_PAD];

    for decoder in decoders {
        if let Ok(decoded) = decoder.decode(data) {
            return Some(String::from_utf8_lossy(&decoded).into_owned());
        }
    }

    None
}
