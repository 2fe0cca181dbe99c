//! Token lifecycle and the installed-app OAuth2 consent flow.
//!
//! The stored token is classified into a [`TokenState`] and driven through a
//! small, bounded set of transitions until it is `Valid`:
//!
//! ```text
//! Absent ──consent──▶ Valid
//! Expired ──refresh──▶ Valid | Invalid (invalid_grant or no refresh token)
//! Invalid ──consent──▶ Valid
//! Valid ──▶ GoogleSession
//! ```

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use secrecy::SecretString;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::error::AuthError;
use crate::google::token_store::{StoredToken, TokenStore};
use crate::google::{ClientCredentials, GoogleSession, GoogleToken, SCOPES};

/// Upper bound on state transitions in one `ready()` call.
const MAX_TRANSITIONS: usize = 4;

/// Fallback lifetime when the token endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Where the stored token stands.
#[derive(Debug)]
pub enum TokenState {
    Absent,
    Valid(GoogleToken),
    Expired(GoogleToken),
    Invalid(String),
}

impl TokenState {
    /// Classify whatever the store returned at time `now`.
    pub fn inspect(stored: StoredToken, now: DateTime<Utc>) -> Self {
        match stored {
            StoredToken::Missing => TokenState::Absent,
            StoredToken::Corrupt(reason) => TokenState::Invalid(format!("unreadable token file: {reason}")),
            StoredToken::Present(token) if token.is_expired_at(now) => TokenState::Expired(token),
            StoredToken::Present(token) => TokenState::Valid(token),
        }
    }
}

/// The network half of the lifecycle: refreshing and fresh consent.
#[async_trait]
pub trait OAuthFlow: Send + Sync {
    /// Exchange the refresh token for a new access token.
    ///
    /// Returns `AuthError::Revoked` when the grant is no longer valid.
    async fn refresh(&self, token: &GoogleToken) -> Result<GoogleToken, AuthError>;

    /// Run interactive consent and return a brand-new token.
    async fn consent(&self) -> Result<GoogleToken, AuthError>;
}

/// Owns the token file and drives it to a usable session.
pub struct Authenticator {
    store: TokenStore,
    flow: Box<dyn OAuthFlow>,
}

impl Authenticator {
    pub fn new(store: TokenStore, flow: Box<dyn OAuthFlow>) -> Self {
        Self { store, flow }
    }

    /// Authenticator backed by the real Google endpoints.
    pub fn installed_app(token_path: impl Into<PathBuf>, credentials_path: impl Into<PathBuf>) -> Self {
        Self::new(
            TokenStore::new(token_path),
            Box::new(InstalledAppFlow::new(credentials_path)),
        )
    }

    /// Return a session with a valid access token, refreshing or running
    /// consent as needed. Any failure here is fatal for the run.
    pub async fn ready(&self) -> Result<GoogleSession, AuthError> {
        let mut state = TokenState::inspect(self.store.load()?, Utc::now());

        for _ in 0..MAX_TRANSITIONS {
            state = match state {
                TokenState::Valid(token) => {
                    tracing::debug!(path = %self.store.path().display(), "Google token valid");
                    return Ok(GoogleSession::new(SecretString::from(token.token)));
                }
                TokenState::Expired(token) => self.try_refresh(token).await?,
                TokenState::Absent => {
                    tracing::info!(
                        path = %self.store.path().display(),
                        "No Google token found, starting consent flow"
                    );
                    self.run_consent().await?
                }
                TokenState::Invalid(reason) => {
                    tracing::warn!(reason = %reason, "Google token invalid, starting consent flow");
                    self.run_consent().await?
                }
            };
        }

        Err(AuthError::Unsettled(MAX_TRANSITIONS))
    }

    async fn try_refresh(&self, token: GoogleToken) -> Result<TokenState, AuthError> {
        if token.refresh_token.as_deref().is_none_or(str::is_empty) {
            return Ok(TokenState::Invalid("expired token has no refresh token".into()));
        }

        match self.flow.refresh(&token).await {
            Ok(fresh) => {
                self.store.save(&fresh)?;
                tracing::info!("Refreshed Google access token");
                Ok(TokenState::Valid(fresh))
            }
            Err(AuthError::Revoked) => Ok(TokenState::Invalid("refresh token revoked".into())),
            Err(e) => Err(e),
        }
    }

    async fn run_consent(&self) -> Result<TokenState, AuthError> {
        let token = self.flow.consent().await?;
        self.store.save(&token)?;
        tracing::info!(path = %self.store.path().display(), "Saved new Google token");
        Ok(TokenState::Valid(token))
    }
}

// ============================================================================
// Installed-app flow
// ============================================================================

/// OAuth2 against Google's endpoints using `credentials.json`.
pub struct InstalledAppFlow {
    credentials_path: PathBuf,
    http: reqwest::Client,
}

impl InstalledAppFlow {
    pub fn new(credentials_path: impl Into<PathBuf>) -> Self {
        Self {
            credentials_path: credentials_path.into(),
            http: reqwest::Client::new(),
        }
    }

    fn load_credentials(&self) -> Result<ClientCredentials, AuthError> {
        if !self.credentials_path.exists() {
            return Err(AuthError::CredentialsNotFound(self.credentials_path.clone()));
        }
        let content = std::fs::read_to_string(&self.credentials_path)?;
        serde_json::from_str(&content).map_err(|e| AuthError::InvalidCredentials(e.to_string()))
    }
}

#[async_trait]
impl OAuthFlow for InstalledAppFlow {
    async fn refresh(&self, token: &GoogleToken) -> Result<GoogleToken, AuthError> {
        let refresh_token = token.refresh_token.as_deref().ok_or(AuthError::Revoked)?;

        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", token.client_id.as_str()),
        ];
        if let Some(secret) = token.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }

        let resp = self.http.post(&token.token_uri).form(&form).send().await?;
        let status = resp.status();
        let body: serde_json::Value = resp.json().await.unwrap_or_default();

        if !status.is_success() {
            if body["error"].as_str() == Some("invalid_grant") {
                return Err(AuthError::Revoked);
            }
            return Err(AuthError::RefreshFailed(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        apply_token_response(token.clone(), &body, Utc::now())
    }

    async fn consent(&self) -> Result<GoogleToken, AuthError> {
        let creds = self.load_credentials()?.installed;

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://localhost:{port}");
        let state = random_state();

        let auth_url = authorization_url(&creds.auth_uri, &creds.client_id, &redirect_uri, &state);
        tracing::info!(url = %auth_url, "Opening browser for Google consent");
        if let Err(e) = open::that(&auth_url) {
            tracing::warn!(error = %e, "Could not open browser; visit the URL above manually");
        }

        let code = wait_for_code(&listener, &state).await?;

        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("client_id", creds.client_id.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
        ];
        if let Some(secret) = creds.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }

        let resp = self.http.post(&creds.token_uri).form(&form).send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::ExchangeFailed(format!("HTTP {status}: {body}")));
        }
        let body: serde_json::Value = resp.json().await?;

        let blank = GoogleToken {
            token: String::new(),
            refresh_token: None,
            token_uri: creds.token_uri.clone(),
            client_id: creds.client_id.clone(),
            client_secret: creds.client_secret.clone(),
            scopes: SCOPES.iter().map(|s| s.to_string()).collect(),
            expiry: None,
        };
        apply_token_response(blank, &body, Utc::now())
            .map_err(|e| AuthError::ExchangeFailed(e.to_string()))
    }
}

/// Merge a token endpoint response into `token`.
///
/// Google omits `refresh_token` on refresh responses; the old one is kept.
fn apply_token_response(
    mut token: GoogleToken,
    body: &serde_json::Value,
    now: DateTime<Utc>,
) -> Result<GoogleToken, AuthError> {
    let access_token = body["access_token"]
        .as_str()
        .ok_or_else(|| AuthError::RefreshFailed("no access_token in response".into()))?;
    let expires_in = body["expires_in"].as_i64().unwrap_or(DEFAULT_EXPIRES_IN_SECS);

    token.token = access_token.to_string();
    if let Some(refresh) = body["refresh_token"].as_str() {
        token.refresh_token = Some(refresh.to_string());
    }
    token.expiry = Some((now + chrono::Duration::seconds(expires_in)).to_rfc3339());
    Ok(token)
}

fn random_state() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

fn authorization_url(auth_uri: &str, client_id: &str, redirect_uri: &str, state: &str) -> String {
    let scope = SCOPES.join(" ");
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", &scope)
        .append_pair("access_type", "offline")
        .append_pair("prompt", "consent")
        .append_pair("state", state)
        .finish();
    format!("{auth_uri}?{query}")
}

/// Accept redirects until one carries a code (or an error), then answer the
/// browser. Stray requests such as `/favicon.ico` are ignored.
async fn wait_for_code(listener: &TcpListener, expected_state: &str) -> Result<String, AuthError> {
    loop {
        let (mut stream, _) = listener.accept().await?;
        let mut buffer = [0u8; 4096];
        let n = stream.read(&mut buffer).await?;
        let request = String::from_utf8_lossy(&buffer[..n]);
        let request_line = request.lines().next().unwrap_or_default();

        let outcome = match parse_redirect(request_line, expected_state) {
            None => {
                let _ = respond(&mut stream, "404 Not Found", "Not found").await;
                continue;
            }
            Some(outcome) => outcome,
        };

        let message = match &outcome {
            Ok(_) => "Authorization successful. You can close this tab.",
            Err(AuthError::StateMismatch) => "Authorization failed: state mismatch.",
            Err(_) => "Authorization was denied. You can close this tab.",
        };
        let _ = respond(&mut stream, "200 OK", message).await;
        return outcome;
    }
}

/// Interpret `GET /?code=…&state=…` from the loopback redirect.
///
/// `None` means the request is not an OAuth redirect at all.
fn parse_redirect(request_line: &str, expected_state: &str) -> Option<Result<String, AuthError>> {
    let target = request_line.split_whitespace().nth(1)?;
    let url = url::Url::parse(&format!("http://localhost{target}")).ok()?;

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if error.is_some() {
        return Some(Err(AuthError::ConsentCancelled));
    }
    let code = code.filter(|c| !c.is_empty())?;
    if state.as_deref() != Some(expected_state) {
        return Some(Err(AuthError::StateMismatch));
    }
    Some(Ok(code))
}

async fn respond(stream: &mut tokio::net::TcpStream, status: &str, message: &str) -> std::io::Result<()> {
    let body = format!(
        "<html><body style=\"font-family: system-ui; text-align: center; padding: 40px;\"><h2>{message}</h2></body></html>"
    );
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await
}

// ============================================================================
// Tests
// ============================================================================
