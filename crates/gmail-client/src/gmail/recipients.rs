//! Reply-all recipient resolution
//!
//! Derives the To and Cc sets for a reply-all from the original message's
//! From/To/Cc headers, deduplicating on the normalized bare address and
//! excluding the authenticated user.

use std::collections::HashSet;

use crate::models::{EmailAddress, parse_address_list};

/// Recipients derived for a reply-all
#[derive(Debug, Clone)]
pub struct ReplyAllRecipients {
    /// The original sender (or Reply-To), full display form preserved
    pub to: EmailAddress,
    /// Everyone else, first-seen order, self excluded
    pub cc: Vec<EmailAddress>,
}

/// Resolve reply-all recipients from the original message's headers.
///
/// `reply_to` wins over `from` as the primary recipient when non-empty.
/// The Cc candidate pool is every address in `from`, `to`, `cc`, scanned in
/// that order. An address joins the Cc list once: duplicates (keyed on the
/// lowercased bare address, regardless of display name) and the
/// authenticated user's own address are dropped. Empty header values stand
/// for absent headers.
pub fn resolve_reply_all(
    from: &str,
    to: &str,
    cc: &str,
    reply_to: &str,
    self_address: &str,
) -> ReplyAllRecipients {
    let primary_raw = if reply_to.trim().is_empty() {
        from
    } else {
        reply_to
    };
    let primary = EmailAddress::parse(primary_raw);
    let self_normalized = self_address.to_ascii_lowercase();

    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(primary.normalized());

    let mut cc_list = Vec::new();
    for header in [from, to, cc] {
        if header.trim().is_empty() {
            continue;
        }
        for address in parse_address_list(header) {
            let bare = address.normalized();
            if bare.is_empty() || bare == self_normalized || seen.contains(&bare) {
                continue;
            }
            seen.insert(bare);
            cc_list.push(address);
        }
    }

    ReplyAllRecipients {
        to: primary,
        cc: cc_list,
    }
}
