//! Twilio Programmable Messaging channel (SMS or `whatsapp:` numbers).

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::error::{ConfigError, NotifyError};
use crate::notify::MessagingChannel;

const TWILIO_API_BASE: &str = "https://api.twilio.com";
const CHANNEL_NAME: &str = "twilio";

/// Account credentials plus the fixed sender and recipient.
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: SecretString,
    /// Sender, e.g. `whatsapp:+14155238886`.
    pub from: String,
    /// Recipient, e.g. `whatsapp:+919999999999`.
    pub to: String,
}

impl TwilioConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// All four values are required; the first missing one is reported.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
        };

        Ok(Self {
            account_sid: require("TWILIO_ACCOUNT_SID")?,
            auth_token: SecretString::from(require("TWILIO_AUTH_TOKEN")?),
            from: require("TWILIO_PHONE_NUMBER")?,
            to: require("MY_PHONE_NUMBER")?,
        })
    }

    /// The auth token as asterisks of the same length.
    pub fn masked_token(&self) -> String {
        "*".repeat(self.auth_token.expose_secret().chars().count())
    }
}

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: Option<String>,
    error_code: Option<i64>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<i64>,
    message: Option<String>,
}

/// Sends each message as one `Messages.json` create call.
pub struct TwilioChannel {
    config: TwilioConfig,
    client: reqwest::Client,
    base_url: String,
}

impl TwilioChannel {
    pub fn new(config: TwilioConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            base_url: TWILIO_API_BASE.to_string(),
        }
    }

    /// Point at a different API host (local fakes).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.config.account_sid
        )
    }
}

#[async_trait]
impl MessagingChannel for TwilioChannel {
    fn name(&self) -> &str {
        CHANNEL_NAME
    }

    async fn send(&self, body: &str) -> Result<String, NotifyError> {
        debug!(to = %self.config.to, chars = body.chars().count(), "Creating Twilio message");
        let resp = self
            .client
            .post(self.messages_url())
            .basic_auth(
                &self.config.account_sid,
                Some(self.config.auth_token.expose_secret()),
            )
            .form(&[
                ("From", self.config.from.as_str()),
                ("To", self.config.to.as_str()),
                ("Body", body),
            ])
            .send()
            .await?;

        let status = resp.status().as_u16();
        let text = resp.text().await?;
        parse_message_response(status, &text)
    }
}

/// Turn a create-message response into the message sid.
fn parse_message_response(status: u16, body: &str) -> Result<String, NotifyError> {
    if !(200..300).contains(&status) {
        let message = match serde_json::from_str::<ApiError>(body) {
            Ok(ApiError {
                code: Some(code),
                message: Some(message),
            }) => format!("{message} (code {code})"),
            Ok(ApiError {
                message: Some(message),
                ..
            }) => message,
            _ => body.chars().take(200).collect(),
        };
        return Err(NotifyError::Rejected {
            name: CHANNEL_NAME.into(),
            status,
            message,
        });
    }

    let resource: MessageResource =
        serde_json::from_str(body).map_err(|e| NotifyError::InvalidResponse {
            name: CHANNEL_NAME.into(),
            reason: e.to_string(),
        })?;

    if let Some(code) = resource.error_code {
        return Err(NotifyError::Rejected {
            name: CHANNEL_NAME.into(),
            status,
            message: format!(
                "{} (code {code})",
                resource.error_message.as_deref().unwrap_or("message failed")
            ),
        });
    }

    resource.sid.ok_or_else(|| NotifyError::InvalidResponse {
        name: CHANNEL_NAME.into(),
        reason: "missing sid".into(),
    })
}
