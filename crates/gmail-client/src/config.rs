//! OAuth client credential loading
//!
//! Reads `credentials.json` from the secrets directory, in the Google Cloud
//! Console download format: a top-level `installed` (desktop app) or `web`
//! (web app) object carrying the client id and secret.

use serde::Deserialize;
use std::path::Path;

use crate::error::{Error, Result};

/// Credentials filename inside the secrets directory.
const CREDENTIALS_FILE: &str = "credentials.json";

/// OAuth client credentials for the Google token endpoints.
#[derive(Debug, Clone)]
pub struct GmailCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Google Cloud Console credential file format.
#[derive(Deserialize)]
struct GoogleCredentialFile {
    installed: Option<InstalledCredentials>,
    web: Option<InstalledCredentials>,
}

#[derive(Deserialize)]
struct InstalledCredentials {
    client_id: String,
    client_secret: String,
}

impl GmailCredentials {
    /// Load credentials from `credentials.json` under `secrets_dir`.
    pub fn load(secrets_dir: &Path) -> Result<Self> {
        let path = secrets_dir.join(CREDENTIALS_FILE);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Parse credentials from a JSON string in the Google Cloud Console format.
    pub fn from_json(json: &str) -> Result<Self> {
        let creds: GoogleCredentialFile = serde_json::from_str(json)
            .map_err(|e| Error::Configuration(format!("malformed credentials file: {}", e)))?;
        Self::from_credential_file(creds)
    }

    /// Support both "installed" (desktop) and "web" credential types.
    fn from_credential_file(creds: GoogleCredentialFile) -> Result<Self> {
        let installed = creds.installed.or(creds.web).ok_or_else(|| {
            Error::Configuration(
                "credentials file missing 'installed' or 'web' section".to_string(),
            )
        })?;

        Ok(Self {
            client_id: installed.client_id,
            client_secret: installed.client_secret,
        })
    }
}
