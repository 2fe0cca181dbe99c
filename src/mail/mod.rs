//! Mailbox reader: unread placement mail in, plain-text bodies out.
//!
//! The provider sits behind the [`Mailbox`] trait; the reader only deals in
//! message ids and provider-agnostic [`MessagePart`] trees.

pub mod gmail;
pub mod parts;

pub use gmail::GmailClient;
pub use parts::{MessagePart, decode_url_safe_base64, find_plain_text};

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::config::MailSettings;
use crate::error::MailError;

/// A decoded email ready for classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEmail {
    pub id: String,
    pub snippet: String,
    pub body: String,
}

/// A message as returned by the provider, before body extraction.
#[derive(Debug, Clone)]
pub struct FetchedMessage {
    pub id: String,
    pub snippet: String,
    pub payload: MessagePart,
}

/// A mail provider.
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// Ids of messages matching a provider search query.
    async fn search(&self, query: &str) -> Result<Vec<String>, MailError>;

    /// Full message including its part tree.
    async fn fetch(&self, id: &str) -> Result<FetchedMessage, MailError>;

    /// Clear the unread flag.
    async fn mark_read(&self, id: &str) -> Result<(), MailError>;
}

/// Builds the unread search query.
///
/// `is:unread [from:<sender>] after:YYYY/MM/DD`
pub fn build_query(sender: Option<&str>, after: NaiveDate) -> String {
    let mut query = String::from("is:unread");
    if let Some(sender) = sender.map(str::trim).filter(|s| !s.is_empty()) {
        query.push_str(" from:");
        query.push_str(sender);
    }
    query.push_str(&format!(" after:{}", after.format("%Y/%m/%d")));
    query
}

/// Query for the configured sender and lookback window relative to `today`.
pub fn query_for(settings: &MailSettings, today: NaiveDate) -> String {
    let after = today
        .checked_sub_days(chrono::Days::new(u64::from(settings.lookback_days)))
        .unwrap_or(NaiveDate::MIN);
    build_query(settings.sender.as_deref(), after)
}

/// Reads and decodes unread mail.
pub struct MailboxReader {
    mailbox: Arc<dyn Mailbox>,
}

impl MailboxReader {
    pub fn new(mailbox: Arc<dyn Mailbox>) -> Self {
        Self { mailbox }
    }

    /// Fetch and decode every message matching `query`.
    ///
    /// A failing search is an error. A failing or undecodable individual
    /// message is logged and left out.
    pub async fn fetch_unread(&self, query: &str) -> Result<Vec<RawEmail>, MailError> {
        info!(query = %query, "Searching mailbox");
        let ids = self.mailbox.search(query).await?;

        if ids.is_empty() {
            info!("No new placement emails found");
            return Ok(Vec::new());
        }
        info!(count = ids.len(), "Found matching email(s), fetching bodies");

        let mut emails = Vec::with_capacity(ids.len());
        for id in &ids {
            let message = match self.mailbox.fetch(id).await {
                Ok(m) => m,
                Err(e) => {
                    warn!(id = %id, error = %e, "Failed to fetch message, skipping");
                    continue;
                }
            };
            match decode_message(message) {
                Ok(email) => {
                    debug!(id = %email.id, chars = email.body.chars().count(), "Decoded message body");
                    emails.push(email);
                }
                Err(e) => warn!(id = %id, error = %e, "No usable text body, skipping"),
            }
        }

        Ok(emails)
    }

    pub async fn mark_read(&self, id: &str) -> Result<(), MailError> {
        self.mailbox.mark_read(id).await
    }
}

/// Extract and decode the plain-text body of a fetched message.
pub fn decode_message(message: FetchedMessage) -> Result<RawEmail, MailError> {
    let data = find_plain_text(&message.payload).ok_or_else(|| MailError::NoTextBody {
        id: message.id.clone(),
    })?;
    let body = decode_url_safe_base64(data)?;
    Ok(RawEmail {
        id: message.id,
        snippet: message.snippet,
        body,
    })
}
