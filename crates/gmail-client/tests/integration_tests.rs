//! Integration tests for the Gmail client
//!
//! Each test drives the real client against a scripted local HTTP server
//! that records requests and plays back canned responses, so the full
//! request construction, raw-message encoding, and response parsing paths
//! are exercised without touching the network.

use base64::prelude::*;
use gmail_client::{Error, GmailClient, ListQuery, MessageFormat};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct RecordedRequest {
    method: String,
    path: String,
    headers: Vec<String>,
    body: String,
}

impl RecordedRequest {
    fn header(&self, name: &str) -> Option<&str> {
        let prefix = format!("{}:", name.to_ascii_lowercase());
        self.headers
            .iter()
            .find(|h| h.to_ascii_lowercase().starts_with(&prefix))
            .map(|h| h[prefix.len()..].trim())
    }

    fn json_body(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }

    /// Decode the base64url `raw` field of a send/draft request body.
    fn raw_mime(&self) -> String {
        let raw = self.json_body()["raw"].as_str().unwrap().to_string();
        let bytes = BASE64_URL_SAFE_NO_PAD.decode(raw).unwrap();
        String::from_utf8(bytes).unwrap()
    }
}

struct MockServer {
    url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: std::thread::JoinHandle<()>,
}

impl MockServer {
    /// Join the server thread and return the recorded requests.
    fn finish(self) -> Vec<RecordedRequest> {
        self.handle.join().unwrap();
        let requests = self.requests.lock().unwrap();
        requests.clone()
    }
}

/// Serve the given responses to sequential connections, recording requests.
fn mock_server(responses: Vec<(u16, String)>) -> MockServer {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&requests);

    let handle = std::thread::spawn(move || {
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(&mut stream);
            recorded.lock().unwrap().push(request);

            let reason = match status {
                200 => "OK",
                204 => "No Content",
                404 => "Not Found",
                _ => "Error",
            };
            let response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                reason,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
        }
    });

    MockServer {
        url: format!("http://{}", addr),
        requests,
        handle,
    }
}

fn read_request(stream: &mut TcpStream) -> RecordedRequest {
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut request_line = String::new();
    reader.read_line(&mut request_line).unwrap();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("").to_string();
    let path = parts.next().unwrap_or("").to_string();

    let mut headers = Vec::new();
    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        let line = line.trim_end().to_string();
        if line.is_empty() {
            break;
        }
        if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
            content_length = value.trim().parse().unwrap_or(0);
        }
        headers.push(line);
    }

    let mut body = vec![0u8; content_length];
    if content_length > 0 {
        reader.read_exact(&mut body).unwrap();
    }

    RecordedRequest {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    }
}

fn client_for(server: &MockServer) -> GmailClient {
    GmailClient::with_access_token("test-token-xxx").with_base_url(server.url.clone())
}

fn ok(body: &str) -> (u16, String) {
    (200, body.to_string())
}

/// Metadata-format message resource with the given headers.
fn message_with_headers(id: &str, thread_id: &str, headers: &[(&str, &str)]) -> String {
    let headers: Vec<serde_json::Value> = headers
        .iter()
        .map(|(name, value)| serde_json::json!({"name": name, "value": value}))
        .collect();
    serde_json::json!({
        "id": id,
        "threadId": thread_id,
        "payload": {"mimeType": "text/plain", "headers": headers}
    })
    .to_string()
}

#[test]
fn test_get_profile_sends_bearer_token() {
    let server = mock_server(vec![ok(
        r#"{"emailAddress": "me@x.com", "messagesTotal": 42, "historyId": "777"}"#,
    )]);
    let client = client_for(&server);

    let profile = client.get_profile().unwrap();
    assert_eq!(profile.email_address, "me@x.com");
    assert_eq!(profile.messages_total, Some(42));

    let requests = server.finish();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].path, "/users/me/profile");
    assert_eq!(
        requests[0].header("authorization"),
        Some("Bearer test-token-xxx")
    );
}

#[test]
fn test_api_error_carries_status_and_provider_message() {
    let server = mock_server(vec![(
        404,
        r#"{"error": {"message": "Requested entity was not found.", "code": 404}}"#.to_string(),
    )]);
    let client = client_for(&server);

    let err = client.get_profile().unwrap_err();
    match err {
        Error::Api { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Requested entity was not found.");
        }
        other => panic!("expected Api error, got {:?}", other),
    }
    server.finish();
}

#[test]
fn test_api_error_uses_raw_body_without_envelope() {
    let server = mock_server(vec![(500, "Internal Server Error".to_string())]);
    let client = client_for(&server);

    let err = client.get_profile().unwrap_err();
    match err {
        Error::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Internal Server Error");
        }
        other => panic!("expected Api error, got {:?}", other),
    }
    server.finish();
}

#[test]
fn test_list_messages_with_absent_key() {
    // No matches: the "messages" key is absent entirely, not an empty list
    let server = mock_server(vec![ok(r#"{"resultSizeEstimate": 0}"#)]);
    let client = client_for(&server);

    let response = client.list_messages(&ListQuery::default()).unwrap();
    assert!(response.messages.is_none());
    assert_eq!(response.result_size_estimate, Some(0));

    let requests = server.finish();
    assert_eq!(requests[0].path, "/users/me/messages?maxResults=10");
}

#[test]
fn test_list_messages_builds_query_string() {
    let server = mock_server(vec![ok(
        r#"{"messages": [{"id": "m1", "threadId": "t1"}], "nextPageToken": "next"}"#,
    )]);
    let client = client_for(&server);

    let query = ListQuery {
        query: Some("is:unread".to_string()),
        max_results: 25,
        label_ids: vec!["INBOX".to_string()],
        page_token: Some("abc".to_string()),
        include_spam_trash: true,
    };
    let response = client.list_messages(&query).unwrap();
    assert_eq!(response.messages.unwrap().len(), 1);

    let requests = server.finish();
    let path = &requests[0].path;
    assert!(path.starts_with("/users/me/messages?maxResults=25"));
    assert!(path.contains("q=is%3Aunread"));
    assert!(path.contains("labelIds=INBOX"));
    assert!(path.contains("pageToken=abc"));
    assert!(path.contains("includeSpamTrash=true"));
}

#[test]
fn test_reply_threads_into_original_conversation() {
    let server = mock_server(vec![
        ok(&message_with_headers(
            "m1",
            "t-1",
            &[
                ("From", "Alice <alice@x.com>"),
                ("Subject", "Hello"),
                ("Message-ID", "<m1@x>"),
            ],
        )),
        ok(r#"{"id": "sent-1", "threadId": "t-1"}"#),
    ]);
    let client = client_for(&server);

    let sent = client.reply("m1", "Thanks!").unwrap();
    assert_eq!(sent.id, "sent-1");

    let requests = server.finish();
    assert_eq!(requests.len(), 2);

    // The metadata fetch asks only for the headers a reply needs
    assert!(requests[0].path.starts_with("/users/me/messages/m1?format=metadata"));
    assert!(requests[0].path.contains("metadataHeaders=Message-ID"));
    assert!(requests[0].path.contains("metadataHeaders=Reply-To"));

    assert_eq!(requests[1].method, "POST");
    assert_eq!(requests[1].path, "/users/me/messages/send");
    assert_eq!(requests[1].json_body()["threadId"], "t-1");

    let mime = requests[1].raw_mime();
    assert!(mime.contains("To: Alice <alice@x.com>\r\n"));
    assert!(mime.contains("Subject: Re: Hello\r\n"));
    assert!(mime.contains("In-Reply-To: <m1@x>\r\n"));
    // No prior References header: the chain starts at the replied-to message
    assert!(mime.contains("References: <m1@x>\r\n"));
    assert!(mime.ends_with("Thanks!"));
}

#[test]
fn test_reply_prefers_reply_to_and_keeps_references() {
    let server = mock_server(vec![
        ok(&message_with_headers(
            "m2",
            "t-2",
            &[
                ("From", "Alice <alice@x.com>"),
                ("Reply-To", "list@x.com"),
                ("Subject", "Re: Plans"),
                ("Message-ID", "<m2@x>"),
                ("References", "<m0@x> <m1@x>"),
            ],
        )),
        ok(r#"{"id": "sent-2", "threadId": "t-2"}"#),
    ]);
    let client = client_for(&server);

    client.reply("m2", "Count me in.").unwrap();

    let requests = server.finish();
    let mime = requests[1].raw_mime();
    assert!(mime.contains("To: list@x.com\r\n"));
    // Already prefixed: no double "Re: Re:"
    assert!(mime.contains("Subject: Re: Plans\r\n"));
    assert!(mime.contains("In-Reply-To: <m2@x>\r\n"));
    assert!(mime.contains("References: <m0@x> <m1@x>\r\n"));
}

#[test]
fn test_reply_all_expands_cc_and_excludes_self() {
    let server = mock_server(vec![
        ok(&message_with_headers(
            "m3",
            "t-3",
            &[
                ("From", "Alice <alice@x.com>"),
                ("To", "Me <me@x.com>, Bob <bob@x.com>"),
                ("Cc", "\"Doe, John\" <john@x.com>"),
                ("Subject", "Plans"),
                ("Message-ID", "<m3@x>"),
            ],
        )),
        ok(r#"{"emailAddress": "me@x.com"}"#),
        ok(r#"{"id": "sent-3", "threadId": "t-3"}"#),
    ]);
    let client = client_for(&server);

    client.reply_all("m3", "Works for me.").unwrap();

    let requests = server.finish();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[1].path, "/users/me/profile");
    assert_eq!(requests[2].json_body()["threadId"], "t-3");

    let mime = requests[2].raw_mime();
    assert!(mime.contains("To: Alice <alice@x.com>\r\n"));
    assert!(mime.contains("Cc: Bob <bob@x.com>, Doe, John <john@x.com>\r\n"));
    assert!(mime.contains("Subject: Re: Plans\r\n"));
    assert!(mime.contains("In-Reply-To: <m3@x>\r\n"));

    // The authenticated user is nowhere in the outgoing recipient headers
    let cc_line = mime
        .lines()
        .find(|line| line.starts_with("Cc: "))
        .unwrap();
    assert!(!cc_line.contains("me@x.com"));
}

#[test]
fn test_forward_extracts_nested_body_and_adds_banner() {
    let encoded_body = BASE64_URL_SAFE_NO_PAD.encode("The original content");
    let original = serde_json::json!({
        "id": "m4",
        "threadId": "t-4",
        "payload": {
            "mimeType": "multipart/mixed",
            "headers": [{"name": "Subject", "value": "Quarterly report"}],
            "parts": [{
                "mimeType": "multipart/alternative",
                "parts": [
                    {"mimeType": "text/plain", "body": {"data": encoded_body}},
                    {"mimeType": "text/html", "body": {"data": "PGI-aGk8L2I-"}}
                ]
            }]
        }
    })
    .to_string();

    let server = mock_server(vec![
        ok(&original),
        ok(r#"{"id": "sent-4", "threadId": "t-new"}"#),
    ]);
    let client = client_for(&server);

    client.forward("m4", "dave@x.com", Some("FYI")).unwrap();

    let requests = server.finish();
    assert!(requests[0].path.starts_with("/users/me/messages/m4?format=full"));

    // Forwarding starts a new thread
    let body = requests[1].json_body();
    assert!(body.get("threadId").is_none());

    let mime = requests[1].raw_mime();
    assert!(mime.contains("To: dave@x.com\r\n"));
    assert!(mime.contains("Subject: Fwd: Quarterly report\r\n"));
    assert!(mime.contains("FYI\n\n---------- Forwarded message ----------\nThe original content"));
    assert!(!mime.contains("In-Reply-To"));
}

#[test]
fn test_forward_without_text_body_uses_placeholder() {
    let original = serde_json::json!({
        "id": "m5",
        "threadId": "t-5",
        "payload": {
            "mimeType": "multipart/mixed",
            "headers": [{"name": "Subject", "value": "Scans"}],
            "parts": [
                {"mimeType": "application/pdf", "body": {"attachmentId": "att-1"}}
            ]
        }
    })
    .to_string();

    let server = mock_server(vec![
        ok(&original),
        ok(r#"{"id": "sent-5", "threadId": "t-new"}"#),
    ]);
    let client = client_for(&server);

    client.forward("m5", "dave@x.com", None).unwrap();

    let requests = server.finish();
    let mime = requests[1].raw_mime();
    assert!(mime.contains("---------- Forwarded message ----------\n(no text body found)"));
}

#[test]
fn test_mark_as_read_removes_unread_label() {
    let server = mock_server(vec![ok(
        r#"{"id": "m6", "threadId": "t-6", "labelIds": ["INBOX"]}"#,
    )]);
    let client = client_for(&server);

    let modified = client.mark_as_read("m6").unwrap();
    assert_eq!(modified.label_ids.unwrap(), vec!["INBOX"]);

    let requests = server.finish();
    assert_eq!(requests[0].path, "/users/me/messages/m6/modify");
    assert_eq!(
        requests[0].json_body(),
        serde_json::json!({"removeLabelIds": ["UNREAD"]})
    );
}

#[test]
fn test_mark_as_unread_adds_unread_label() {
    let server = mock_server(vec![ok(
        r#"{"id": "m7", "threadId": "t-7", "labelIds": ["INBOX", "UNREAD"]}"#,
    )]);
    let client = client_for(&server);

    client.mark_as_unread("m7").unwrap();

    let requests = server.finish();
    assert_eq!(requests[0].path, "/users/me/messages/m7/modify");
    assert_eq!(
        requests[0].json_body(),
        serde_json::json!({"addLabelIds": ["UNREAD"]})
    );
}

#[test]
fn test_archive_removes_inbox_label() {
    let server = mock_server(vec![ok(r#"{"id": "m8", "threadId": "t-8", "labelIds": []}"#)]);
    let client = client_for(&server);

    client.archive("m8").unwrap();

    let requests = server.finish();
    assert_eq!(requests[0].path, "/users/me/messages/m8/modify");
    assert_eq!(
        requests[0].json_body(),
        serde_json::json!({"removeLabelIds": ["INBOX"]})
    );
}

#[test]
fn test_send_message_encodes_outgoing() {
    let server = mock_server(vec![ok(r#"{"id": "sent-9", "threadId": "t-9"}"#)]);
    let client = client_for(&server);

    let message = gmail_client::OutgoingMessage::builder("to@x.com", "Hi", "plain")
        .html_body("<p>rich</p>")
        .build();
    client.send_message(&message, None).unwrap();

    let requests = server.finish();
    let raw = requests[0].json_body()["raw"].as_str().unwrap().to_string();
    assert!(!raw.contains('='));

    let mime = requests[0].raw_mime();
    assert!(mime.contains("Content-Type: multipart/alternative"));
    let plain = mime.find("plain").unwrap();
    let html = mime.find("<p>rich</p>").unwrap();
    assert!(plain < html);
}

#[test]
fn test_batch_modify_and_delete_have_no_response_body() {
    let server = mock_server(vec![(204, String::new()), (204, String::new())]);
    let client = client_for(&server);

    client
        .batch_modify_messages(&["m1", "m2"], &["STARRED"], &[])
        .unwrap();
    client.delete_message("m1").unwrap();

    let requests = server.finish();
    assert_eq!(requests[0].path, "/users/me/messages/batchModify");
    assert_eq!(
        requests[0].json_body(),
        serde_json::json!({"ids": ["m1", "m2"], "addLabelIds": ["STARRED"]})
    );
    assert_eq!(requests[1].method, "DELETE");
    assert_eq!(requests[1].path, "/users/me/messages/m1");
}

#[test]
fn test_get_thread_and_modify_thread() {
    let server = mock_server(vec![
        ok(r#"{"id": "t-1", "historyId": "5", "messages": [{"id": "m1", "threadId": "t-1"}]}"#),
        ok(r#"{"id": "t-1", "historyId": "6"}"#),
    ]);
    let client = client_for(&server);

    let thread = client
        .get_thread("t-1", MessageFormat::Metadata, &["Subject"])
        .unwrap();
    assert_eq!(thread.messages.unwrap().len(), 1);

    client.modify_thread("t-1", &[], &["INBOX"]).unwrap();

    let requests = server.finish();
    assert!(requests[0].path.starts_with("/users/me/threads/t-1?format=metadata"));
    assert!(requests[0].path.contains("metadataHeaders=Subject"));
    assert_eq!(requests[1].path, "/users/me/threads/t-1/modify");
}

#[test]
fn test_draft_lifecycle_requests() {
    let server = mock_server(vec![
        ok(r#"{"id": "d-1", "message": {"id": "m1", "threadId": "t-1"}}"#),
        ok(r#"{"id": "sent-1", "threadId": "t-1"}"#),
    ]);
    let client = client_for(&server);

    let message = gmail_client::OutgoingMessage::builder("to@x.com", "Draft", "body").build();
    let draft = client.create_draft(&message, Some("t-1")).unwrap();
    assert_eq!(draft.id, "d-1");

    client.send_draft("d-1").unwrap();

    let requests = server.finish();
    assert_eq!(requests[0].path, "/users/me/drafts");
    let body = requests[0].json_body();
    assert_eq!(body["message"]["threadId"], "t-1");
    assert!(body["message"]["raw"].is_string());

    assert_eq!(requests[1].path, "/users/me/drafts/send");
    assert_eq!(requests[1].json_body(), serde_json::json!({"id": "d-1"}));
}

#[test]
fn test_list_filters_singular_key() {
    let server = mock_server(vec![ok(
        r#"{"filter": [{"id": "f-1", "criteria": {"from": "spam@x.com"}, "action": {"removeLabelIds": ["INBOX"]}}]}"#,
    )]);
    let client = client_for(&server);

    let filters = client.list_filters().unwrap();
    let filters = filters.filter.unwrap();
    assert_eq!(filters.len(), 1);
    assert_eq!(filters[0].criteria.as_ref().unwrap().from.as_deref(), Some("spam@x.com"));

    server.finish();
}

#[test]
fn test_history_query_params() {
    let server = mock_server(vec![ok(
        r#"{"historyId": "900", "history": [{"id": "899", "messagesAdded": [{"message": {"id": "m1", "threadId": "t1"}}]}]}"#,
    )]);
    let client = client_for(&server);

    let mut query = gmail_client::gmail::api::HistoryQuery::new("850");
    query.history_types = vec!["messageAdded".to_string()];
    let response = client.list_history(&query).unwrap();
    assert_eq!(response.history_id.as_deref(), Some("900"));

    let requests = server.finish();
    let path = &requests[0].path;
    assert!(path.contains("startHistoryId=850"));
    assert!(path.contains("historyTypes=messageAdded"));
}
