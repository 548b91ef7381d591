//! Gmail OAuth2 authentication
//!
//! Implements the OAuth2 authorization code flow and the token lifecycle.
//! Uses a local HTTP server to receive the OAuth callback.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.
//!
//! Tokens are stored per account alias as `gmail-{account}.json` in the
//! secrets directory, with owner-only file permissions. Refreshing rewrites
//! `access_token` and `expires_at` in place and keeps the previous
//! `refresh_token` when the provider omits one from the refresh response.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::GmailCredentials;
use crate::error::{Error, Result};

use super::client::{GmailClient, build_agent};

/// Google OAuth2 endpoints
const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Fixed port for the loopback OAuth callback
const REDIRECT_PORT: u16 = 8090;

/// Requested scope set (full Gmail access)
const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/gmail.readonly",
    "https://www.googleapis.com/auth/gmail.send",
    "https://www.googleapis.com/auth/gmail.modify",
    "https://mail.google.com/",
];

/// Refresh the access token when fewer than this many seconds remain
const EXPIRY_MARGIN_SECS: i64 = 300;

/// Assumed token lifetime when the endpoint omits `expires_in`
const DEFAULT_EXPIRES_IN: u64 = 3600;

/// How long `authorize` waits for the browser callback by default
const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// Token storage and refresh for one account alias
pub struct GmailAuth {
    account: String,
    secrets_dir: PathBuf,
    token_url: String,
}

/// Stored token record (`gmail-{account}.json`)
///
/// Provider fields this client does not interpret are kept in `extra` so a
/// load/refresh/save cycle never drops them.
#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
    access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    /// Absolute expiry, seconds since the epoch
    #[serde(default)]
    expires_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    token_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

/// Token response from Google
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    token_type: Option<String>,
    scope: Option<String>,
}

impl GmailAuth {
    /// Create token management for `account` under `secrets_dir`.
    pub fn new(account: impl Into<String>, secrets_dir: impl Into<PathBuf>) -> Self {
        Self {
            account: account.into(),
            secrets_dir: secrets_dir.into(),
            token_url: TOKEN_URL.to_string(),
        }
    }

    /// The account alias this instance is bound to.
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Path of the stored token file for this account.
    pub fn token_path(&self) -> PathBuf {
        self.secrets_dir.join(format!("gmail-{}.json", self.account))
    }

    /// Get a valid access token, refreshing and persisting if near expiry.
    pub fn get_access_token(&self) -> Result<String> {
        let mut token = self.load_token()?.ok_or_else(|| Error::NotAuthorized {
            account: self.account.clone(),
        })?;

        let now = chrono::Utc::now().timestamp();
        if needs_refresh(token.expires_at, now) {
            debug!(
                "Access token for '{}' expires at {}, refreshing",
                self.account, token.expires_at
            );
            let creds = GmailCredentials::load(&self.secrets_dir)?;
            let refresh_token = token.refresh_token.clone().ok_or_else(|| {
                Error::RefreshFailed("stored token has no refresh_token".to_string())
            })?;

            let response = self.refresh_access_token(&creds, &refresh_token)?;
            token.access_token = response.access_token;
            token.expires_at = expires_at_from(response.expires_in, chrono::Utc::now().timestamp());
            // Not always returned on refresh; the prior value must survive
            if let Some(new_refresh) = response.refresh_token {
                token.refresh_token = Some(new_refresh);
            }
            self.save_token(&token)?;
            info!("Refreshed access token for '{}'", self.account);
        }

        Ok(token.access_token)
    }

    /// Build the authorization URL for the consent screen.
    pub fn auth_url(client_id: &str) -> String {
        let redirect_uri = format!("http://localhost:{}", REDIRECT_PORT);
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            AUTH_URL,
            urlencoding::encode(client_id),
            urlencoding::encode(&redirect_uri),
            urlencoding::encode(&SCOPES.join(" ")),
        )
    }

    /// Exchange an authorization code for tokens.
    fn exchange_code(&self, creds: &GmailCredentials, code: &str) -> Result<TokenResponse> {
        let redirect_uri = format!("http://localhost:{}", REDIRECT_PORT);
        self.token_request(&[
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri.as_str()),
        ])
    }

    /// Refresh an access token using a refresh token.
    fn refresh_access_token(
        &self,
        creds: &GmailCredentials,
        refresh_token: &str,
    ) -> Result<TokenResponse> {
        self.token_request(&[
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .map_err(|e| match e {
            Error::Api { status, message } => {
                Error::RefreshFailed(format!("token endpoint returned {}: {}", status, message))
            }
            other => Error::RefreshFailed(other.to_string()),
        })
    }

    /// POST a form to the token endpoint and parse the token response.
    fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let agent = build_agent();
        let mut response = agent
            .post(&self.token_url)
            .send_form(form.iter().copied())?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.body_mut().read_to_string().unwrap_or_default();
            return Err(Error::Api {
                status,
                message: oauth_error_message(&body),
            });
        }

        Ok(response.body_mut().read_json()?)
    }

    /// Load the stored token, or None if no file exists for this account.
    fn load_token(&self) -> Result<Option<StoredToken>> {
        let content = match std::fs::read_to_string(self.token_path()) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Persist the token record with owner-only permissions.
    fn save_token(&self, token: &StoredToken) -> Result<()> {
        gmail_config::save_json_secure(&self.token_path(), token)?;
        Ok(())
    }
}

/// Run the full authorization flow with the default callback timeout.
///
/// Opens the consent URL in the user's browser, captures the authorization
/// code on the loopback listener, exchanges it for tokens, persists them
/// under `account`, and returns a client bound to that account.
pub fn authorize(account: &str, secrets_dir: Option<&Path>) -> Result<GmailClient> {
    authorize_with_timeout(account, secrets_dir, DEFAULT_CALLBACK_TIMEOUT)
}

/// Run the full authorization flow, waiting at most `timeout` for the
/// browser callback.
pub fn authorize_with_timeout(
    account: &str,
    secrets_dir: Option<&Path>,
    timeout: Duration,
) -> Result<GmailClient> {
    let secrets_dir = gmail_config::secrets_dir(secrets_dir)?;
    let creds = GmailCredentials::load(&secrets_dir)?;
    let auth = GmailAuth::new(account, &secrets_dir);

    let auth_url = GmailAuth::auth_url(&creds.client_id);
    let listener = TcpListener::bind(("127.0.0.1", REDIRECT_PORT))?;

    println!("\n=== Gmail Authorization Required ===");
    println!("Opening browser for authorization...");
    println!("If the browser doesn't open, visit: {}", auth_url);

    if let Err(e) = open::that(&auth_url) {
        eprintln!("Failed to open browser: {}. Please open the URL manually.", e);
    }

    println!("Waiting for authorization...");
    let code = wait_for_callback(listener, timeout)?;

    debug!("Exchanging authorization code for tokens");
    let response = auth.exchange_code(&creds, &code)?;
    let now = chrono::Utc::now().timestamp();
    let token = StoredToken {
        access_token: response.access_token,
        refresh_token: response.refresh_token,
        expires_at: expires_at_from(response.expires_in, now),
        token_type: response.token_type,
        scope: response.scope,
        extra: serde_json::Map::new(),
    };
    auth.save_token(&token)?;
    info!("Authorized account '{}'", account);

    Ok(GmailClient::from_auth(auth))
}

/// Accept exactly one callback request and extract the `code` parameter.
///
/// The listener answers with a static confirmation page and stops after the
/// first request, successful or not.
fn wait_for_callback(listener: TcpListener, timeout: Duration) -> Result<String> {
    let deadline = Instant::now() + timeout;
    listener.set_nonblocking(true)?;

    let stream = loop {
        match listener.accept() {
            Ok((stream, _)) => break stream,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                if Instant::now() >= deadline {
                    return Err(Error::AuthCallback(format!(
                        "timed out after {}s waiting for the authorization callback",
                        timeout.as_secs()
                    )));
                }
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(e) => return Err(e.into()),
        }
    };

    handle_callback(stream)
}

fn handle_callback(mut stream: TcpStream) -> Result<String> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(Duration::from_secs(10)))?;

    let mut reader = BufReader::new(&stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;

    // Format: GET /?code=AUTH_CODE&scope=... HTTP/1.1
    let path = request_line.split_whitespace().nth(1).unwrap_or("/");
    let (code, error) = parse_callback_path(path);

    // Send response to browser
    let (status, body) = if code.is_some() {
        ("200 OK", "Authorization successful! You can close this tab.")
    } else {
        ("400 Bad Request", "Authorization failed. Please try again.")
    };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n<html><body><h1>{}</h1></body></html>",
        status, body
    );
    stream.write_all(response.as_bytes()).ok();

    if let Some(err) = error {
        return Err(Error::AuthCallback(format!("OAuth error: {}", err)));
    }

    code.ok_or_else(|| {
        Error::AuthCallback("no authorization code received from callback".to_string())
    })
}

/// Extract the `code` and `error` query parameters from a callback path.
fn parse_callback_path(path: &str) -> (Option<String>, Option<String>) {
    let Ok(url) = url::Url::parse(&format!("http://localhost{}", path)) else {
        return (None, None);
    };

    let mut code = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }
    (code, error)
}

/// True when fewer than [`EXPIRY_MARGIN_SECS`] remain before `expires_at`.
fn needs_refresh(expires_at: i64, now: i64) -> bool {
    expires_at < now + EXPIRY_MARGIN_SECS
}

/// Absolute expiry computed from the endpoint's relative `expires_in`.
fn expires_at_from(expires_in: Option<u64>, now: i64) -> i64 {
    now + expires_in.unwrap_or(DEFAULT_EXPIRES_IN) as i64
}

/// Human-readable message from an OAuth error response body.
fn oauth_error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct OAuthError {
        error: String,
        #[serde(default)]
        error_description: String,
    }

    match serde_json::from_str::<OAuthError>(body) {
        Ok(e) if !e.error_description.is_empty() => {
            format!("{}: {}", e.error, e.error_description)
        }
        Ok(e) => e.error,
        Err(_) => body.trim().to_string(),
    }
}
