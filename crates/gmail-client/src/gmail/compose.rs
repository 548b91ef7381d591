//! Outgoing message composition
//!
//! Builds RFC 822 style MIME messages and encodes them for the Gmail API's
//! `raw` field (base64url without padding). Pure construction, no I/O.
//!
//! When a plain body and an HTML body are both present the message is a
//! `multipart/alternative` with the plain part first: readers that stop at
//! the first renderable part get the more compatible representation.

use base64::prelude::*;

/// Marker line inserted above a forwarded message body
const FORWARD_BANNER: &str = "---------- Forwarded message ----------";

/// A composed outgoing message
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    to: String,
    cc: Option<String>,
    bcc: Option<String>,
    subject: String,
    body: String,
    html_body: Option<String>,
    from_addr: Option<String>,
    in_reply_to: Option<String>,
    references: Option<String>,
}

impl OutgoingMessage {
    /// Start building a message with the required fields.
    pub fn builder(
        to: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> OutgoingMessageBuilder {
        OutgoingMessageBuilder {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
            cc: None,
            bcc: None,
            html_body: None,
            from_addr: None,
            in_reply_to: None,
            references: None,
        }
    }

    /// Serialize and encode for the Gmail API `raw` field.
    ///
    /// The output is unpadded base64url; decoders must re-add padding.
    pub fn encode(&self) -> String {
        BASE64_URL_SAFE_NO_PAD.encode(self.to_mime())
    }

    /// Serialize to MIME wire format.
    fn to_mime(&self) -> String {
        let mut message = String::new();
        message.push_str(&format!("To: {}\r\n", self.to));
        if let Some(cc) = &self.cc {
            message.push_str(&format!("Cc: {}\r\n", cc));
        }
        if let Some(bcc) = &self.bcc {
            message.push_str(&format!("Bcc: {}\r\n", bcc));
        }
        message.push_str(&format!("Subject: {}\r\n", self.subject));
        if let Some(from) = &self.from_addr {
            message.push_str(&format!("From: {}\r\n", from));
        }
        if let Some(in_reply_to) = &self.in_reply_to {
            message.push_str(&format!("In-Reply-To: {}\r\n", in_reply_to));
        }
        if let Some(references) = &self.references {
            message.push_str(&format!("References: {}\r\n", references));
        }
        message.push_str("MIME-Version: 1.0\r\n");

        match &self.html_body {
            None => {
                message.push_str("Content-Type: text/plain; charset=\"utf-8\"\r\n");
                message.push_str("Content-Transfer-Encoding: 8bit\r\n");
                message.push_str("\r\n");
                message.push_str(&self.body);
            }
            Some(html) => {
                let boundary = boundary();
                message.push_str(&format!(
                    "Content-Type: multipart/alternative; boundary=\"{}\"\r\n",
                    boundary
                ));
                message.push_str("\r\n");
                // Plain part first, HTML second: alternative parts are
                // ordered least to most capability-demanding
                message.push_str(&format!("--{}\r\n", boundary));
                message.push_str("Content-Type: text/plain; charset=\"utf-8\"\r\n");
                message.push_str("Content-Transfer-Encoding: 8bit\r\n");
                message.push_str("\r\n");
                message.push_str(&self.body);
                message.push_str("\r\n");
                message.push_str(&format!("--{}\r\n", boundary));
                message.push_str("Content-Type: text/html; charset=\"utf-8\"\r\n");
                message.push_str("Content-Transfer-Encoding: 8bit\r\n");
                message.push_str("\r\n");
                message.push_str(html);
                message.push_str("\r\n");
                message.push_str(&format!("--{}--\r\n", boundary));
            }
        }

        message
    }
}

/// Builder for [`OutgoingMessage`]
pub struct OutgoingMessageBuilder {
    to: String,
    subject: String,
    body: String,
    cc: Option<String>,
    bcc: Option<String>,
    html_body: Option<String>,
    from_addr: Option<String>,
    in_reply_to: Option<String>,
    references: Option<String>,
}

impl OutgoingMessageBuilder {
    pub fn cc(mut self, cc: impl Into<String>) -> Self {
        self.cc = Some(cc.into());
        self
    }

    pub fn bcc(mut self, bcc: impl Into<String>) -> Self {
        self.bcc = Some(bcc.into());
        self
    }

    /// Add an HTML rendering; the message becomes multipart/alternative.
    pub fn html_body(mut self, html_body: impl Into<String>) -> Self {
        self.html_body = Some(html_body.into());
        self
    }

    pub fn from_addr(mut self, from_addr: impl Into<String>) -> Self {
        self.from_addr = Some(from_addr.into());
        self
    }

    /// Thread this message as a reply to `message_id`.
    ///
    /// `References` defaults to the same value at build time so the thread
    /// chain stays intact when the original had no prior References header.
    pub fn in_reply_to(mut self, message_id: impl Into<String>) -> Self {
        self.in_reply_to = Some(message_id.into());
        self
    }

    pub fn references(mut self, references: impl Into<String>) -> Self {
        self.references = Some(references.into());
        self
    }

    pub fn build(self) -> OutgoingMessage {
        let references = self.references.or_else(|| self.in_reply_to.clone());
        OutgoingMessage {
            to: self.to,
            cc: self.cc,
            bcc: self.bcc,
            subject: self.subject,
            body: self.body,
            html_body: self.html_body,
            from_addr: self.from_addr,
            in_reply_to: self.in_reply_to,
            references,
        }
    }
}

/// Plain-text body of a forwarded message.
///
/// The optional note goes above the banner; the original body below it.
pub fn forward_body(original_body: &str, note: Option<&str>) -> String {
    match note {
        Some(note) => format!("{}\n\n{}\n{}", note, FORWARD_BANNER, original_body),
        None => format!("\n{}\n{}", FORWARD_BANNER, original_body),
    }
}

/// Generate a random-enough multipart boundary.
fn boundary() -> String {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let hasher = RandomState::new().build_hasher();
    format!("=_part_{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Decode an encoded message back to its MIME text.
    fn decode(encoded: &str) -> String {
        let bytes = BASE64_URL_SAFE_NO_PAD.decode(encoded).unwrap();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_simple_message_roundtrip() {
        let message = OutgoingMessage::builder("test@example.com", "Hello", "Hi there").build();
        let mime = decode(&message.encode());
        assert!(mime.contains("To: test@example.com\r\n"));
        assert!(mime.contains("Subject: Hello\r\n"));
        assert!(mime.contains("Content-Type: text/plain"));
        assert!(mime.ends_with("Hi there"));
    }

    #[test]
    fn test_encoded_message_has_no_padding() {
        // Vary the body length to hit every padding remainder
        for body in ["a", "ab", "abc", "abcd"] {
            let message = OutgoingMessage::builder("to@example.com", "Test", body).build();
            assert!(!message.encode().contains('='));
        }
    }

    #[test]
    fn test_cc_bcc_and_from_headers() {
        let message = OutgoingMessage::builder("to@example.com", "Test", "body")
            .cc("cc@example.com")
            .bcc("bcc@example.com")
            .from_addr("sender@example.com")
            .build();
        let mime = decode(&message.encode());
        assert!(mime.contains("Cc: cc@example.com\r\n"));
        assert!(mime.contains("Bcc: bcc@example.com\r\n"));
        assert!(mime.contains("From: sender@example.com\r\n"));
    }

    #[test]
    fn test_alternative_has_plain_part_before_html() {
        let message = OutgoingMessage::builder("to@example.com", "Test", "plain body")
            .html_body("<p>html body</p>")
            .build();
        let mime = decode(&message.encode());

        assert!(mime.contains("Content-Type: multipart/alternative"));
        let plain = mime.find("plain body").unwrap();
        let html = mime.find("<p>html body</p>").unwrap();
        assert!(plain < html);

        // Exactly two parts inside the boundary
        let plain_parts = mime.matches("Content-Type: text/plain").count();
        let html_parts = mime.matches("Content-Type: text/html").count();
        assert_eq!(plain_parts, 1);
        assert_eq!(html_parts, 1);
    }

    #[test]
    fn test_single_part_when_no_html() {
        let message = OutgoingMessage::builder("to@example.com", "Test", "body").build();
        let mime = decode(&message.encode());
        assert!(!mime.contains("multipart/alternative"));
        assert!(!mime.contains("--=_part_"));
    }

    #[test]
    fn test_reply_has_threading_headers() {
        let message = OutgoingMessage::builder("original@example.com", "Re: Hello", "Thanks!")
            .in_reply_to("<abc123@example.com>")
            .references("<first@example.com> <abc123@example.com>")
            .build();
        let mime = decode(&message.encode());
        assert!(mime.contains("In-Reply-To: <abc123@example.com>\r\n"));
        assert!(mime.contains("References: <first@example.com> <abc123@example.com>\r\n"));
    }

    #[test]
    fn test_reply_defaults_references_to_message_id() {
        let message = OutgoingMessage::builder("original@example.com", "Re: Hello", "Thanks!")
            .in_reply_to("<abc123@example.com>")
            .build();
        let mime = decode(&message.encode());
        assert!(mime.contains("References: <abc123@example.com>\r\n"));
    }

    #[test]
    fn test_forward_body_with_note() {
        let body = forward_body("Original content here", Some("FYI"));
        assert_eq!(
            body,
            "FYI\n\n---------- Forwarded message ----------\nOriginal content here"
        );
    }

    #[test]
    fn test_forward_body_without_note() {
        let body = forward_body("Original content", None);
        assert_eq!(
            body,
            "\n---------- Forwarded message ----------\nOriginal content"
        );
    }

    #[test]
    fn test_non_ascii_body_survives_roundtrip() {
        let message = OutgoingMessage::builder("to@example.com", "Grüße", "héllo wörld ✉").build();
        let mime = decode(&message.encode());
        assert!(mime.contains("héllo wörld ✉"));
        assert!(mime.contains("Subject: Grüße\r\n"));
    }
}
