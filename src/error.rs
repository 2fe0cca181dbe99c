//! Error types for the placement agent.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Google OAuth errors. Any of these is fatal for a run.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Credentials not found at {0}")]
    CredentialsNotFound(PathBuf),

    #[error("Invalid credentials format: {0}")]
    InvalidCredentials(String),

    #[error("Token at {path} is unreadable: {reason}")]
    TokenUnreadable { path: PathBuf, reason: String },

    #[error("Token expired or revoked")]
    Revoked,

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Token exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("OAuth consent was cancelled or denied")]
    ConsentCancelled,

    #[error("OAuth state mismatch")]
    StateMismatch,

    #[error("Authentication did not settle after {0} transitions")]
    Unsettled(usize),

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Mail provider errors.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Mail API unauthorized")]
    Unauthorized,

    #[error("Mail API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Message {id} has no text/plain part")]
    NoTextBody { id: String },

    #[error("Failed to decode message body: {0}")]
    Decode(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Classification errors. The pipeline treats every variant as "unclassifiable".
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Model output is not valid JSON: {0}")]
    Parse(String),

    #[error("Model output has no email_type")]
    MissingKind,
}

/// Calendar errors.
#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("Could not parse {field} {value:?} as {expected}")]
    InvalidDate {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Calendar API unauthorized")]
    Unauthorized,

    #[error("Calendar API error {status}: {message}")]
    Api { status: u16, message: String },
}

/// Web research errors.
#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Search for {query:?} failed: {reason}")]
    Search { query: String, reason: String },

    #[error("Fetching {url} failed: {reason}")]
    Fetch { url: String, reason: String },

    #[error("No readable text on {0}")]
    EmptyPage(String),
}

/// Messaging errors.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Messaging channel not configured: {0}")]
    NotConfigured(#[from] ConfigError),

    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Channel {name} rejected message ({status}): {message}")]
    Rejected {
        name: String,
        status: u16,
        message: String,
    },

    #[error("Invalid response from channel {name}: {reason}")]
    InvalidResponse { name: String, reason: String },
}
