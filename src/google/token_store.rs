//! Token file storage.
//!
//! The token lives in a single JSON file (default `token.json` in the working
//! directory). Writes go through a sibling temp file and a rename so a crash
//! never leaves a half-written token behind.

use std::path::{Path, PathBuf};

use crate::error::AuthError;
use crate::google::GoogleToken;

/// What was found at the token path.
#[derive(Debug)]
pub enum StoredToken {
    /// No file at the path.
    Missing,
    /// File parsed into a token.
    Present(GoogleToken),
    /// File exists but does not parse; the reason is kept for logging.
    Corrupt(String),
}

/// File-backed token storage.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the token file without failing on bad content.
    pub fn load(&self) -> Result<StoredToken, AuthError> {
        if !self.path.exists() {
            return Ok(StoredToken::Missing);
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(match serde_json::from_str::<GoogleToken>(&content) {
            Ok(token) => StoredToken::Present(token),
            Err(e) => StoredToken::Corrupt(e.to_string()),
        })
    }

    /// Persist a token, owner-readable only on unix.
    pub fn save(&self, token: &GoogleToken) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(token)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))?;
        }

        std::fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), "Saved Google token");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_token() -> GoogleToken {
        GoogleToken {
            token: "ya29.saved".into(),
            refresh_token: Some("1//r".into()),
            token_uri: "https://oauth2.googleapis.com/token".into(),
            client_id: "c".into(),
            client_secret: None,
            scopes: vec![],
            expiry: Some("2030-01-01T00:00:00Z".into()),
        }
    }

    #[test]
    fn missing_file_loads_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        assert!(matches!(store.load().unwrap(), StoredToken::Missing));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("nested").join("token.json"));
        store.save(&sample_token()).unwrap();

        match store.load().unwrap() {
            StoredToken::Present(token) => {
                assert_eq!(token.token, "ya29.saved");
                assert_eq!(token.refresh_token.as_deref(), Some("1//r"));
            }
            other => panic!("expected token, got {other:?}"),
        }
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        store.save(&sample_token()).unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn garbage_file_is_corrupt_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = TokenStore::new(&path);
        assert!(matches!(store.load().unwrap(), StoredToken::Corrupt(_)));
    }
}
