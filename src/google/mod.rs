//! Google OAuth plumbing shared by the Gmail and Calendar clients.
//!
//! Token format is compatible with the `token.json` written by the
//! google-auth client libraries, so an existing token keeps working.
//!
//! Modules:
//! - auth: token lifecycle (absent / valid / expired / invalid) and consent flow
//! - token_store: token file I/O

pub mod auth;
pub mod token_store;

pub use auth::{Authenticator, TokenState};
pub use token_store::TokenStore;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// OAuth2 scopes the agent needs: read + relabel mail, write calendar events.
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/gmail.modify",
    "https://www.googleapis.com/auth/calendar",
];

/// Treat tokens this close to expiry as already expired.
const EXPIRY_SKEW_SECS: i64 = 60;

// ============================================================================
// Token types
// ============================================================================

/// OAuth2 token payload persisted in the token file.
///
/// Field names match what `google.oauth2.credentials.Credentials.to_json()`
/// produces. Both `token` and `access_token` are accepted on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleToken {
    /// The access token (google-auth writes this as "token")
    #[serde(alias = "access_token")]
    pub token: String,
    /// Long-lived refresh token
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Expiry time (ISO 8601, UTC)
    #[serde(default)]
    pub expiry: Option<String>,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl GoogleToken {
    /// Whether the access token is expired (or about to be) at `now`.
    ///
    /// A missing or unparseable expiry counts as expired so a refresh is tried.
    pub fn is_expired_at(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        match self.expiry.as_deref().and_then(parse_expiry) {
            Some(expiry) => expiry <= now + chrono::Duration::seconds(EXPIRY_SKEW_SECS),
            None => true,
        }
    }
}

/// Parse an expiry stamp. google-auth writes `2026-02-08T12:00:00.000000Z`; older
/// files may carry no zone at all, in which case UTC is assumed.
fn parse_expiry(raw: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&chrono::Utc));
    }
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// OAuth2 client credentials from credentials.json.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientCredentials {
    #[serde(alias = "web")]
    pub installed: InstalledAppCredentials,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstalledAppCredentials {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    "https://accounts.google.com/o/oauth2/auth".to_string()
}

// ============================================================================
// Session handle
// ============================================================================

/// A ready-to-use authenticated handle for Google APIs.
///
/// Produced only by [`Authenticator::ready`]; holds a valid access token.
#[derive(Clone)]
pub struct GoogleSession {
    http: reqwest::Client,
    access_token: SecretString,
}

impl GoogleSession {
    pub(crate) fn new(access_token: SecretString) -> Self {
        Self {
            http: reqwest::Client::new(),
            access_token,
        }
    }

    /// Start a GET request with bearer auth.
    pub fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.http
            .get(url)
            .bearer_auth(self.access_token.expose_secret())
    }

    /// Start a POST request with bearer auth.
    pub fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.http
            .post(url)
            .bearer_auth(self.access_token.expose_secret())
    }
}

impl std::fmt::Debug for GoogleSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSession").finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with_expiry(expiry: Option<String>) -> GoogleToken {
        GoogleToken {
            token: "ya29.test".to_string(),
            refresh_token: Some("1//refresh".to_string()),
            token_uri: default_token_uri(),
            client_id: "client".to_string(),
            client_secret: Some("secret".to_string()),
            scopes: SCOPES.iter().map(|s| s.to_string()).collect(),
            expiry,
        }
    }

    #[test]
    fn google_auth_token_format_parses() {
        let stored_json = r#"{
            "token": "ya29.stored-token",
            "refresh_token": "1//stored-refresh",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_id": "client.apps.googleusercontent.com",
            "client_secret": "secret",
            "scopes": [
                "https://www.googleapis.com/auth/gmail.modify",
                "https://www.googleapis.com/auth/calendar"
            ],
            "universe_domain": "googleapis.com",
            "account": "",
            "expiry": "2026-02-08T12:00:00.000000Z"
        }"#;

        let token: GoogleToken = serde_json::from_str(stored_json).unwrap();
        assert_eq!(token.token, "ya29.stored-token");
        assert_eq!(token.refresh_token.as_deref(), Some("1//stored-refresh"));
        assert_eq!(token.scopes.len(), 2);
    }

    #[test]
    fn access_token_alias_accepted() {
        let json = r#"{"access_token": "ya29.alias", "refresh_token": null, "client_id": "c"}"#;
        let token: GoogleToken = serde_json::from_str(json).unwrap();
        assert_eq!(token.token, "ya29.alias");
        assert_eq!(token.token_uri, "https://oauth2.googleapis.com/token");
    }

    #[test]
    fn expiry_in_future_is_not_expired() {
        let now = chrono::Utc::now();
        let token = token_with_expiry(Some((now + chrono::Duration::hours(1)).to_rfc3339()));
        assert!(!token.is_expired_at(now));
    }

    #[test]
    fn expiry_in_past_is_expired() {
        let now = chrono::Utc::now();
        let token = token_with_expiry(Some((now - chrono::Duration::hours(1)).to_rfc3339()));
        assert!(token.is_expired_at(now));
    }

    #[test]
    fn expiry_within_skew_is_expired() {
        let now = chrono::Utc::now();
        let token = token_with_expiry(Some((now + chrono::Duration::seconds(30)).to_rfc3339()));
        assert!(token.is_expired_at(now));
    }

    #[test]
    fn missing_or_garbled_expiry_is_expired() {
        let now = chrono::Utc::now();
        assert!(token_with_expiry(None).is_expired_at(now));
        assert!(token_with_expiry(Some("tomorrow".into())).is_expired_at(now));
    }

    #[test]
    fn naive_expiry_assumed_utc() {
        let parsed = parse_expiry("2026-02-08T12:00:00.123456").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-02-08T12:00:00.123456+00:00");
    }

    #[test]
    fn credentials_accept_installed_and_web() {
        let installed = r#"{"installed": {
            "client_id": "12345.apps.googleusercontent.com",
            "client_secret": "secret",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "redirect_uris": ["http://localhost"]
        }}"#;
        let creds: ClientCredentials = serde_json::from_str(installed).unwrap();
        assert_eq!(creds.installed.client_secret.as_deref(), Some("secret"));

        let web = r#"{"web": {"client_id": "web-client"}}"#;
        let creds: ClientCredentials = serde_json::from_str(web).unwrap();
        assert_eq!(creds.installed.client_id, "web-client");
        assert_eq!(creds.installed.auth_uri, "https://accounts.google.com/o/oauth2/auth");
    }
}
