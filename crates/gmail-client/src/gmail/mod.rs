//! Gmail API integration
//!
//! This module provides:
//! - OAuth2 authentication flow and token lifecycle
//! - Gmail API client covering the REST endpoint surface
//! - Outgoing message composition and raw-message encoding
//! - Reply-all recipient resolution and body extraction
//! - High-level convenience operations (reply, forward, archive, ...)

mod auth;
pub mod body;
mod client;
pub mod compose;
pub mod convenience;
pub mod recipients;

pub use auth::{GmailAuth, authorize, authorize_with_timeout};
pub use client::GmailClient;
pub use compose::{OutgoingMessage, forward_body};
pub use convenience::labels;
pub use recipients::{ReplyAllRecipients, resolve_reply_all};

/// Gmail API request and response types
pub mod api {
    use serde::{Deserialize, Serialize};

    /// Response from `GET /users/me/profile`
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ProfileResponse {
        pub email_address: String,
        pub messages_total: Option<u64>,
        pub threads_total: Option<u64>,
        pub history_id: Option<String>,
    }

    /// Response format for message and thread fetches
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum MessageFormat {
        Full,
        Metadata,
        Minimal,
        Raw,
    }

    impl MessageFormat {
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Full => "full",
                Self::Metadata => "metadata",
                Self::Minimal => "minimal",
                Self::Raw => "raw",
            }
        }
    }

    /// Query options shared by the message and thread list endpoints
    #[derive(Debug, Clone)]
    pub struct ListQuery {
        /// Gmail search query (e.g. "is:unread")
        pub query: Option<String>,
        pub max_results: u32,
        pub label_ids: Vec<String>,
        pub page_token: Option<String>,
        pub include_spam_trash: bool,
    }

    impl Default for ListQuery {
        fn default() -> Self {
            Self {
                query: None,
                max_results: 10,
                label_ids: Vec::new(),
                page_token: None,
                include_spam_trash: false,
            }
        }
    }

    /// Query options for the draft list endpoint
    #[derive(Debug, Clone)]
    pub struct DraftListQuery {
        pub query: Option<String>,
        pub max_results: u32,
        pub page_token: Option<String>,
        pub include_spam_trash: bool,
    }

    impl Default for DraftListQuery {
        fn default() -> Self {
            Self {
                query: None,
                max_results: 10,
                page_token: None,
                include_spam_trash: false,
            }
        }
    }

    /// Response from listing messages
    ///
    /// The `messages` key is absent (not an empty list) when nothing matched.
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ListMessagesResponse {
        pub messages: Option<Vec<MessageRef>>,
        pub next_page_token: Option<String>,
        pub result_size_estimate: Option<u32>,
    }

    /// Reference to a message (just ID and thread ID)
    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessageRef {
        pub id: String,
        pub thread_id: String,
    }

    /// Full message from the Gmail API
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GmailMessage {
        pub id: String,
        pub thread_id: String,
        pub label_ids: Option<Vec<String>>,
        pub snippet: Option<String>,
        pub history_id: Option<String>,
        pub internal_date: Option<String>,
        pub size_estimate: Option<u64>,
        pub payload: Option<MessagePart>,
        /// Present only for `format=raw` fetches
        pub raw: Option<String>,
    }

    /// Email header (name-value pair)
    #[derive(Debug, Clone, Deserialize, Serialize)]
    pub struct Header {
        pub name: String,
        pub value: String,
    }

    /// Message body content (base64url encoded when inline)
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessageBody {
        pub size: Option<u64>,
        pub data: Option<String>,
        pub attachment_id: Option<String>,
    }

    /// One node of a message payload tree
    ///
    /// The same type describes the root payload and every nested part, so
    /// body extraction recurses over a single finite tree shape.
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessagePart {
        pub part_id: Option<String>,
        pub mime_type: Option<String>,
        pub filename: Option<String>,
        pub headers: Option<Vec<Header>>,
        pub body: Option<MessageBody>,
        pub parts: Option<Vec<MessagePart>>,
    }

    /// Response from listing threads
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ListThreadsResponse {
        pub threads: Option<Vec<ThreadRef>>,
        pub next_page_token: Option<String>,
        pub result_size_estimate: Option<u32>,
    }

    /// Reference to a thread from a list response
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ThreadRef {
        pub id: String,
        pub snippet: Option<String>,
        pub history_id: Option<String>,
    }

    /// Full thread with its messages
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GmailThread {
        pub id: String,
        pub history_id: Option<String>,
        pub messages: Option<Vec<GmailMessage>>,
    }

    /// A draft wrapping an unsent message
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Draft {
        pub id: String,
        pub message: Option<GmailMessage>,
    }

    /// Response from listing drafts
    ///
    /// The `drafts` key is absent when no drafts matched.
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ListDraftsResponse {
        pub drafts: Option<Vec<Draft>>,
        pub next_page_token: Option<String>,
        pub result_size_estimate: Option<u32>,
    }

    /// A Gmail label
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Label {
        pub id: String,
        pub name: String,
        #[serde(rename = "type")]
        pub label_type: Option<String>,
        pub label_list_visibility: Option<String>,
        pub message_list_visibility: Option<String>,
        pub messages_total: Option<u64>,
        pub messages_unread: Option<u64>,
    }

    /// Response from listing labels
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ListLabelsResponse {
        pub labels: Option<Vec<Label>>,
    }

    /// A filter rule
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Filter {
        pub id: String,
        pub criteria: Option<FilterCriteria>,
        pub action: Option<FilterAction>,
    }

    /// Matching criteria for a filter
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct FilterCriteria {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub from: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub to: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub subject: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub query: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub negated_query: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub has_attachment: Option<bool>,
    }

    /// Action a filter applies to matching messages
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct FilterAction {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub add_label_ids: Option<Vec<String>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub remove_label_ids: Option<Vec<String>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub forward: Option<String>,
    }

    /// Response from listing filters
    ///
    /// The API nests the list under a singular `filter` key.
    #[derive(Debug, Deserialize)]
    pub struct ListFiltersResponse {
        pub filter: Option<Vec<Filter>>,
    }

    /// Vacation responder settings (used for both get and update)
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct VacationSettings {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub enable_auto_reply: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub response_subject: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub response_body_plain_text: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub response_body_html: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub restrict_to_contacts: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub restrict_to_domain: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub start_time: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub end_time: Option<i64>,
    }

    /// Query options for the history list endpoint
    #[derive(Debug, Clone)]
    pub struct HistoryQuery {
        pub start_history_id: String,
        pub label_id: Option<String>,
        pub max_results: u32,
        pub page_token: Option<String>,
        /// "messageAdded", "messageDeleted", "labelAdded", "labelRemoved"
        pub history_types: Vec<String>,
    }

    impl HistoryQuery {
        pub fn new(start_history_id: impl Into<String>) -> Self {
            Self {
                start_history_id: start_history_id.into(),
                label_id: None,
                max_results: 100,
                page_token: None,
                history_types: Vec::new(),
            }
        }
    }

    /// Response from listing history
    ///
    /// The `history` key is absent when nothing changed since the start ID.
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct HistoryResponse {
        pub history: Option<Vec<HistoryRecord>>,
        pub next_page_token: Option<String>,
        pub history_id: Option<String>,
    }

    /// One history record of mailbox changes
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct HistoryRecord {
        pub id: Option<String>,
        pub messages: Option<Vec<MessageRef>>,
        pub messages_added: Option<Vec<HistoryMessage>>,
        pub messages_deleted: Option<Vec<HistoryMessage>>,
        pub labels_added: Option<Vec<HistoryLabelChange>>,
        pub labels_removed: Option<Vec<HistoryLabelChange>>,
    }

    /// A message wrapped in a history record
    #[derive(Debug, Deserialize)]
    pub struct HistoryMessage {
        pub message: MessageRef,
    }

    /// A label change wrapped in a history record
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct HistoryLabelChange {
        pub message: MessageRef,
        pub label_ids: Option<Vec<String>>,
    }

    /// Response from fetching an attachment body
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AttachmentResponse {
        pub size: Option<u64>,
        pub data: Option<String>,
    }

    // --- request bodies ---

    /// Body for `POST /users/me/messages/send` and draft message payloads
    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SendMessageRequest {
        pub raw: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub thread_id: Option<String>,
    }

    /// Body for message and thread label modifications
    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ModifyRequest {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub add_label_ids: Option<Vec<String>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub remove_label_ids: Option<Vec<String>>,
    }

    /// Body for `POST /users/me/messages/batchModify`
    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct BatchModifyRequest {
        pub ids: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub add_label_ids: Option<Vec<String>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub remove_label_ids: Option<Vec<String>>,
    }

    /// Body for `POST /users/me/drafts`
    #[derive(Debug, Serialize)]
    pub struct CreateDraftRequest {
        pub message: SendMessageRequest,
    }

    /// Body for `POST /users/me/drafts/send`
    #[derive(Debug, Serialize)]
    pub struct SendDraftRequest {
        pub id: String,
    }

    /// Body for `POST /users/me/labels`
    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CreateLabelRequest {
        pub name: String,
        pub label_list_visibility: String,
        pub message_list_visibility: String,
    }

    impl CreateLabelRequest {
        /// A label with the default visibilities (shown everywhere).
        pub fn new(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                label_list_visibility: "labelShow".to_string(),
                message_list_visibility: "show".to_string(),
            }
        }
    }

    /// Body for `PATCH /users/me/labels/{id}`; omitted fields stay unchanged
    #[derive(Debug, Default, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct UpdateLabelRequest {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub label_list_visibility: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub message_list_visibility: Option<String>,
    }

    /// Body for `POST /users/me/settings/filters`
    #[derive(Debug, Serialize)]
    pub struct CreateFilterRequest {
        pub criteria: FilterCriteria,
        pub action: FilterAction,
    }
}
