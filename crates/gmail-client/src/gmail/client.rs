//! Gmail API HTTP client
//!
//! One wrapper method per REST endpoint, all sharing a small set of verb
//! helpers. Uses synchronous HTTP (ureq) to be executor-agnostic.
//!
//! Every request is gated on a valid bearer token: clients built from a
//! [`GmailAuth`] fetch (and transparently refresh) the token per call, while
//! [`GmailClient::with_access_token`] pins a fixed token instead.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{Error, Result};

use super::api::{
    AttachmentResponse, BatchModifyRequest, CreateDraftRequest, CreateFilterRequest,
    CreateLabelRequest, Draft, DraftListQuery, Filter, FilterAction, FilterCriteria, GmailMessage,
    GmailThread, HistoryQuery, HistoryResponse, Label, ListDraftsResponse, ListFiltersResponse,
    ListLabelsResponse, ListMessagesResponse, ListThreadsResponse, MessageFormat, ModifyRequest,
    ProfileResponse, SendDraftRequest, SendMessageRequest, UpdateLabelRequest, VacationSettings,
};
use super::auth::GmailAuth;
use super::compose::OutgoingMessage;

/// Gmail API base URL
const BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1";

/// Request timeout for API calls
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Where a client gets its bearer token from
enum TokenSource {
    /// Per-request lookup with transparent refresh
    Auth(GmailAuth),
    /// Fixed token supplied by the caller
    Fixed(String),
}

/// Synchronous client for the Gmail REST API
pub struct GmailClient {
    agent: ureq::Agent,
    base_url: String,
    tokens: TokenSource,
}

/// Build the shared HTTP agent.
///
/// Non-2xx statuses are returned as responses rather than transport errors
/// so the caller can extract the provider's error message from the body.
pub(crate) fn build_agent() -> ureq::Agent {
    ureq::Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(Some(REQUEST_TIMEOUT))
        .build()
        .new_agent()
}

impl GmailClient {
    /// Create a client for a stored account.
    ///
    /// The secrets directory is resolved once, here: an explicit path wins,
    /// then the `GMAIL_SECRETS_DIR` environment variable, then the default.
    pub fn new(account: &str, secrets_dir: Option<&std::path::Path>) -> Result<Self> {
        let secrets_dir = gmail_config::secrets_dir(secrets_dir)?;
        Ok(Self::from_auth(GmailAuth::new(account, secrets_dir)))
    }

    /// Create a client from an existing [`GmailAuth`].
    pub fn from_auth(auth: GmailAuth) -> Self {
        Self {
            agent: build_agent(),
            base_url: BASE_URL.to_string(),
            tokens: TokenSource::Auth(auth),
        }
    }

    /// Create a client with a fixed access token (no refresh).
    pub fn with_access_token(access_token: impl Into<String>) -> Self {
        Self {
            agent: build_agent(),
            base_url: BASE_URL.to_string(),
            tokens: TokenSource::Fixed(access_token.into()),
        }
    }

    /// Override the API base URL (used by tests against a local server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn access_token(&self) -> Result<String> {
        match &self.tokens {
            TokenSource::Auth(auth) => auth.get_access_token(),
            TokenSource::Fixed(token) => Ok(token.clone()),
        }
    }

    // ---- low-level helpers ------------------------------------------------

    fn url(&self, path: &str, query: &[(&str, String)]) -> String {
        let mut url = format!("{}{}", self.base_url, path);
        let mut separator = '?';
        for (key, value) in query {
            url.push(separator);
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
            separator = '&';
        }
        url
    }

    fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let token = self.access_token()?;
        let response = self
            .agent
            .get(&self.url(path, query))
            .header("Authorization", &format!("Bearer {}", token))
            .call()?;
        read_json(response)
    }

    fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let token = self.access_token()?;
        let response = self
            .agent
            .post(&self.url(path, &[]))
            .header("Authorization", &format!("Bearer {}", token))
            .send_json(body)?;
        read_json(response)
    }

    /// POST with a JSON body, discarding the (typically empty) response.
    fn post_no_content<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let token = self.access_token()?;
        let response = self
            .agent
            .post(&self.url(path, &[]))
            .header("Authorization", &format!("Bearer {}", token))
            .send_json(body)?;
        expect_success(response)
    }

    /// POST without a body (trash/untrash style endpoints).
    fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let token = self.access_token()?;
        let response = self
            .agent
            .post(&self.url(path, &[]))
            .header("Authorization", &format!("Bearer {}", token))
            .send_empty()?;
        read_json(response)
    }

    fn patch<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let token = self.access_token()?;
        let response = self
            .agent
            .patch(&self.url(path, &[]))
            .header("Authorization", &format!("Bearer {}", token))
            .send_json(body)?;
        read_json(response)
    }

    fn put<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let token = self.access_token()?;
        let response = self
            .agent
            .put(&self.url(path, &[]))
            .header("Authorization", &format!("Bearer {}", token))
            .send_json(body)?;
        read_json(response)
    }

    fn delete(&self, path: &str) -> Result<()> {
        let token = self.access_token()?;
        let response = self
            .agent
            .delete(&self.url(path, &[]))
            .header("Authorization", &format!("Bearer {}", token))
            .call()?;
        expect_success(response)
    }

    // === Profile API ===

    /// Get the authenticated user's profile.
    pub fn get_profile(&self) -> Result<ProfileResponse> {
        self.get("/users/me/profile", &[])
    }

    // === Messages API ===

    /// List messages matching the query.
    ///
    /// `messages` is `None` (the key is absent) when nothing matched.
    pub fn list_messages(&self, query: &super::api::ListQuery) -> Result<ListMessagesResponse> {
        self.get("/users/me/messages", &list_query_params(query))
    }

    /// Get a message.
    ///
    /// `metadata_headers` selects which headers are returned when
    /// `format` is [`MessageFormat::Metadata`].
    pub fn get_message(
        &self,
        message_id: &str,
        format: MessageFormat,
        metadata_headers: &[&str],
    ) -> Result<GmailMessage> {
        let mut params = vec![("format", format.as_str().to_string())];
        for header in metadata_headers {
            params.push(("metadataHeaders", (*header).to_string()));
        }
        self.get(&format!("/users/me/messages/{}", message_id), &params)
    }

    /// Compose and send a message.
    pub fn send_message(
        &self,
        message: &OutgoingMessage,
        thread_id: Option<&str>,
    ) -> Result<GmailMessage> {
        self.send_raw_message(&message.encode(), thread_id)
    }

    /// Send a pre-encoded raw message (base64url MIME).
    pub fn send_raw_message(&self, raw: &str, thread_id: Option<&str>) -> Result<GmailMessage> {
        self.post(
            "/users/me/messages/send",
            &SendMessageRequest {
                raw: raw.to_string(),
                thread_id: thread_id.map(String::from),
            },
        )
    }

    /// Add and/or remove labels on a message.
    pub fn modify_message(
        &self,
        message_id: &str,
        add_label_ids: &[&str],
        remove_label_ids: &[&str],
    ) -> Result<GmailMessage> {
        self.post(
            &format!("/users/me/messages/{}/modify", message_id),
            &modify_request(add_label_ids, remove_label_ids),
        )
    }

    /// Move a message to trash.
    pub fn trash_message(&self, message_id: &str) -> Result<GmailMessage> {
        self.post_empty(&format!("/users/me/messages/{}/trash", message_id))
    }

    /// Remove a message from trash.
    pub fn untrash_message(&self, message_id: &str) -> Result<GmailMessage> {
        self.post_empty(&format!("/users/me/messages/{}/untrash", message_id))
    }

    /// Permanently delete a message (bypasses trash).
    pub fn delete_message(&self, message_id: &str) -> Result<()> {
        self.delete(&format!("/users/me/messages/{}", message_id))
    }

    /// Add and/or remove labels on multiple messages at once.
    pub fn batch_modify_messages(
        &self,
        message_ids: &[&str],
        add_label_ids: &[&str],
        remove_label_ids: &[&str],
    ) -> Result<()> {
        let request = BatchModifyRequest {
            ids: message_ids.iter().map(|s| s.to_string()).collect(),
            add_label_ids: owned_labels(add_label_ids),
            remove_label_ids: owned_labels(remove_label_ids),
        };
        self.post_no_content("/users/me/messages/batchModify", &request)
    }

    // === Threads API ===

    /// List threads matching the query.
    pub fn list_threads(&self, query: &super::api::ListQuery) -> Result<ListThreadsResponse> {
        self.get("/users/me/threads", &list_query_params(query))
    }

    /// Get a thread with its messages.
    pub fn get_thread(
        &self,
        thread_id: &str,
        format: MessageFormat,
        metadata_headers: &[&str],
    ) -> Result<GmailThread> {
        let mut params = vec![("format", format.as_str().to_string())];
        for header in metadata_headers {
            params.push(("metadataHeaders", (*header).to_string()));
        }
        self.get(&format!("/users/me/threads/{}", thread_id), &params)
    }

    /// Add and/or remove labels on every message in a thread.
    pub fn modify_thread(
        &self,
        thread_id: &str,
        add_label_ids: &[&str],
        remove_label_ids: &[&str],
    ) -> Result<GmailThread> {
        self.post(
            &format!("/users/me/threads/{}/modify", thread_id),
            &modify_request(add_label_ids, remove_label_ids),
        )
    }

    /// Move a thread to trash.
    pub fn trash_thread(&self, thread_id: &str) -> Result<GmailThread> {
        self.post_empty(&format!("/users/me/threads/{}/trash", thread_id))
    }

    /// Remove a thread from trash.
    pub fn untrash_thread(&self, thread_id: &str) -> Result<GmailThread> {
        self.post_empty(&format!("/users/me/threads/{}/untrash", thread_id))
    }

    /// Permanently delete a thread.
    pub fn delete_thread(&self, thread_id: &str) -> Result<()> {
        self.delete(&format!("/users/me/threads/{}", thread_id))
    }

    // === Drafts API ===

    /// List drafts.
    ///
    /// `drafts` is `None` (the key is absent) when there are none.
    pub fn list_drafts(&self, query: &DraftListQuery) -> Result<ListDraftsResponse> {
        let mut params = vec![("maxResults", query.max_results.to_string())];
        if let Some(q) = &query.query {
            params.push(("q", q.clone()));
        }
        if let Some(token) = &query.page_token {
            params.push(("pageToken", token.clone()));
        }
        if query.include_spam_trash {
            params.push(("includeSpamTrash", "true".to_string()));
        }
        self.get("/users/me/drafts", &params)
    }

    /// Get a draft.
    pub fn get_draft(&self, draft_id: &str, format: MessageFormat) -> Result<Draft> {
        self.get(
            &format!("/users/me/drafts/{}", draft_id),
            &[("format", format.as_str().to_string())],
        )
    }

    /// Compose and store a draft.
    pub fn create_draft(
        &self,
        message: &OutgoingMessage,
        thread_id: Option<&str>,
    ) -> Result<Draft> {
        self.create_raw_draft(&message.encode(), thread_id)
    }

    /// Create a draft from a pre-encoded raw message.
    pub fn create_raw_draft(&self, raw: &str, thread_id: Option<&str>) -> Result<Draft> {
        self.post(
            "/users/me/drafts",
            &CreateDraftRequest {
                message: SendMessageRequest {
                    raw: raw.to_string(),
                    thread_id: thread_id.map(String::from),
                },
            },
        )
    }

    /// Send an existing draft.
    pub fn send_draft(&self, draft_id: &str) -> Result<GmailMessage> {
        self.post(
            "/users/me/drafts/send",
            &SendDraftRequest {
                id: draft_id.to_string(),
            },
        )
    }

    /// Permanently delete a draft.
    pub fn delete_draft(&self, draft_id: &str) -> Result<()> {
        self.delete(&format!("/users/me/drafts/{}", draft_id))
    }

    // === Labels API ===

    /// List all labels in the mailbox.
    pub fn list_labels(&self) -> Result<ListLabelsResponse> {
        self.get("/users/me/labels", &[])
    }

    /// Get a label.
    pub fn get_label(&self, label_id: &str) -> Result<Label> {
        self.get(&format!("/users/me/labels/{}", label_id), &[])
    }

    /// Create a label.
    pub fn create_label(&self, request: &CreateLabelRequest) -> Result<Label> {
        self.post("/users/me/labels", request)
    }

    /// Partially update a label; omitted fields remain unchanged.
    pub fn update_label(&self, label_id: &str, request: &UpdateLabelRequest) -> Result<Label> {
        self.patch(&format!("/users/me/labels/{}", label_id), request)
    }

    /// Delete a label.
    pub fn delete_label(&self, label_id: &str) -> Result<()> {
        self.delete(&format!("/users/me/labels/{}", label_id))
    }

    // === Filters API ===

    /// List all filters.
    pub fn list_filters(&self) -> Result<ListFiltersResponse> {
        self.get("/users/me/settings/filters", &[])
    }

    /// Get a filter.
    pub fn get_filter(&self, filter_id: &str) -> Result<Filter> {
        self.get(&format!("/users/me/settings/filters/{}", filter_id), &[])
    }

    /// Create a filter from criteria and an action.
    pub fn create_filter(&self, criteria: FilterCriteria, action: FilterAction) -> Result<Filter> {
        self.post(
            "/users/me/settings/filters",
            &CreateFilterRequest { criteria, action },
        )
    }

    /// Delete a filter.
    pub fn delete_filter(&self, filter_id: &str) -> Result<()> {
        self.delete(&format!("/users/me/settings/filters/{}", filter_id))
    }

    // === Settings API ===

    /// Get the vacation responder settings.
    pub fn get_vacation_settings(&self) -> Result<VacationSettings> {
        self.get("/users/me/settings/vacation", &[])
    }

    /// Replace the vacation responder settings.
    pub fn update_vacation_settings(&self, settings: &VacationSettings) -> Result<VacationSettings> {
        self.put("/users/me/settings/vacation", settings)
    }

    // === History API ===

    /// List mailbox changes since a history ID.
    ///
    /// `history` is `None` when nothing changed since `start_history_id`.
    pub fn list_history(&self, query: &HistoryQuery) -> Result<HistoryResponse> {
        let mut params = vec![
            ("startHistoryId", query.start_history_id.clone()),
            ("maxResults", query.max_results.to_string()),
        ];
        if let Some(label_id) = &query.label_id {
            params.push(("labelId", label_id.clone()));
        }
        if let Some(token) = &query.page_token {
            params.push(("pageToken", token.clone()));
        }
        for history_type in &query.history_types {
            params.push(("historyTypes", history_type.clone()));
        }
        self.get("/users/me/history", &params)
    }

    // === Attachments API ===

    /// Get an attachment body by ID.
    pub fn get_attachment(
        &self,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<AttachmentResponse> {
        self.get(
            &format!(
                "/users/me/messages/{}/attachments/{}",
                message_id, attachment_id
            ),
            &[],
        )
    }
}

fn list_query_params(query: &super::api::ListQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![("maxResults", query.max_results.to_string())];
    if let Some(q) = &query.query {
        params.push(("q", q.clone()));
    }
    for label_id in &query.label_ids {
        params.push(("labelIds", label_id.clone()));
    }
    if let Some(token) = &query.page_token {
        params.push(("pageToken", token.clone()));
    }
    if query.include_spam_trash {
        params.push(("includeSpamTrash", "true".to_string()));
    }
    params
}

fn modify_request(add_label_ids: &[&str], remove_label_ids: &[&str]) -> ModifyRequest {
    ModifyRequest {
        add_label_ids: owned_labels(add_label_ids),
        remove_label_ids: owned_labels(remove_label_ids),
    }
}

fn owned_labels(label_ids: &[&str]) -> Option<Vec<String>> {
    if label_ids.is_empty() {
        None
    } else {
        Some(label_ids.iter().map(|s| s.to_string()).collect())
    }
}

/// Parse a successful response as JSON, or surface the API error.
fn read_json<T: DeserializeOwned>(
    mut response: ureq::http::Response<ureq::Body>,
) -> Result<T> {
    let status = response.status().as_u16();
    if !(200..300).contains(&status) {
        let body = response.body_mut().read_to_string().unwrap_or_default();
        return Err(api_error(status, &body));
    }
    Ok(response.body_mut().read_json()?)
}

/// Check the status of a response whose body we don't need.
fn expect_success(mut response: ureq::http::Response<ureq::Body>) -> Result<()> {
    let status = response.status().as_u16();
    if !(200..300).contains(&status) {
        let body = response.body_mut().read_to_string().unwrap_or_default();
        return Err(api_error(status, &body));
    }
    Ok(())
}

/// Build an [`Error::Api`] from a non-2xx response body.
///
/// The provider message is taken from the conventional `{"error":{"message"}}`
/// envelope when present, otherwise the raw body text is used.
fn api_error(status: u16, body: &str) -> Error {
    #[derive(serde::Deserialize)]
    struct ErrorEnvelope {
        error: ErrorDetail,
    }
    #[derive(serde::Deserialize)]
    struct ErrorDetail {
        message: String,
    }

    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.trim().to_string());
    Error::Api { status, message }
}
