//! Email address parsing and formatting

use serde::{Deserialize, Serialize};

/// An email address with optional display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    /// Display name (e.g., "John Doe")
    pub name: Option<String>,
    /// Email address (e.g., "john@example.com")
    pub email: String,
}

impl EmailAddress {
    /// Create a new email address with just the email
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            name: None,
            email: email.into(),
        }
    }

    /// Create a new email address with a display name
    pub fn with_name(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            email: email.into(),
        }
    }

    /// Parse an email address from a string like `John Doe <john@example.com>`.
    ///
    /// A quoted display name has its surrounding quotes stripped, so
    /// `"Doe, John" <john@example.com>` yields the name `Doe, John`.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();

        // Try to parse "Name <email>" format
        if let Some(angle_start) = s.rfind('<')
            && let Some(angle_end) = s.rfind('>')
            && angle_start < angle_end
        {
            let name = strip_quotes(s[..angle_start].trim());
            let email = s[angle_start + 1..angle_end].trim();
            return Self {
                name: if name.is_empty() {
                    None
                } else {
                    Some(name.to_string())
                },
                email: email.to_string(),
            };
        }

        // Otherwise, treat the whole string as an email
        Self {
            name: None,
            email: s.to_string(),
        }
    }

    /// The bare address lowercased for comparison and deduplication.
    ///
    /// Only ASCII is case-folded; non-ASCII domains are compared as-is.
    pub fn normalized(&self) -> String {
        self.email.to_ascii_lowercase()
    }

    /// Format the email address for an outgoing header
    pub fn display(&self) -> String {
        match &self.name {
            Some(name) => format!("{} <{}>", name, self.email),
            None => self.email.clone(),
        }
    }
}

fn strip_quotes(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(s)
}

/// Parse a comma-separated address list header value.
///
/// Commas inside a quoted display name do not split, so
/// `"Doe, John" <john@x.com>, me@x.com` yields two addresses.
pub fn parse_address_list(s: &str) -> Vec<EmailAddress> {
    let mut addresses = Vec::new();
    let mut in_quotes = false;
    let mut current = String::new();

    for ch in s.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            ',' if !in_quotes => {
                push_entry(&mut addresses, &current);
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    push_entry(&mut addresses, &current);

    addresses
}

fn push_entry(addresses: &mut Vec<EmailAddress>, entry: &str) {
    let entry = entry.trim();
    if !entry.is_empty() {
        addresses.push(EmailAddress::parse(entry));
    }
}
