//! Configuration plumbing for the Gmail client workspace
//!
//! Resolves the secrets directory that holds OAuth client credentials and
//! per-account token files, and provides JSON load/save helpers. Token
//! files contain bearer credentials, so saves go through [`save_json_secure`]
//! which creates the file with owner-only permissions.
//!
//! The secrets directory is resolved once, at client construction, via
//! [`secrets_dir`]; library code never reads the environment on its own.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Environment variable overriding the default secrets directory.
pub const SECRETS_DIR_ENV: &str = "GMAIL_SECRETS_DIR";

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not determine home directory")]
    NoHomeDir,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Resolve the secrets directory.
///
/// Priority: an explicit path from the caller, then the `GMAIL_SECRETS_DIR`
/// environment variable, then `~/secrets/google-oauth`.
pub fn secrets_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }

    if let Ok(dir) = std::env::var(SECRETS_DIR_ENV)
        && !dir.is_empty()
    {
        return Ok(PathBuf::from(dir));
    }

    let home = dirs::home_dir().ok_or(Error::NoHomeDir)?;
    Ok(home.join("secrets").join("google-oauth"))
}

/// Load and parse a JSON file.
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Save a value as pretty-printed JSON with owner-only permissions.
///
/// The file is created (or truncated) with mode 0600 on unix and written in
/// a single call, so a concurrent reader sees either the old content or the
/// new content, never a partial record.
pub fn save_json_secure<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Record {
        access_token: String,
        expires_at: i64,
    }

    #[test]
    fn test_explicit_dir_wins() {
        let dir = secrets_dir(Some(Path::new("/tmp/my-secrets"))).unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/my-secrets"));
    }

    #[test]
    fn test_env_override() {
        unsafe { std::env::set_var(SECRETS_DIR_ENV, "/tmp/env-secrets") };
        let dir = secrets_dir(None).unwrap();
        unsafe { std::env::remove_var(SECRETS_DIR_ENV) };
        assert_eq!(dir, PathBuf::from("/tmp/env-secrets"));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("token.json");
        let record = Record {
            access_token: "abc123".to_string(),
            expires_at: 1_700_000_000,
        };

        save_json_secure(&path, &record).unwrap();
        let loaded: Record = load_json_file(&path).unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_save_overwrites_prior_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("token.json");

        save_json_secure(
            &path,
            &Record {
                access_token: "a-much-longer-first-token-value".to_string(),
                expires_at: 1,
            },
        )
        .unwrap();
        save_json_secure(
            &path,
            &Record {
                access_token: "short".to_string(),
                expires_at: 2,
            },
        )
        .unwrap();

        let loaded: Record = load_json_file(&path).unwrap();
        assert_eq!(loaded.access_token, "short");
        assert_eq!(loaded.expires_at, 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_has_restricted_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("token.json");
        save_json_secure(
            &path,
            &Record {
                access_token: "abc".to_string(),
                expires_at: 0,
            },
        )
        .unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let result: Result<Record> = load_json_file(&tmp.path().join("nope.json"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
