//! Gmail API v1 adapter.
//!
//! Gmail's JSON field names stay in this file; everything it hands back is a
//! provider-agnostic [`MessagePart`] tree.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::MailError;
use crate::google::GoogleSession;
use crate::mail::{FetchedMessage, Mailbox, MessagePart};

const GMAIL_API: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

// ============================================================================
// API response types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageListResponse {
    #[serde(default)]
    messages: Vec<MessageStub>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageStub {
    id: String,
}

#[derive(Debug, Deserialize)]
struct FullMessage {
    id: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    payload: Option<GmailPart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailPart {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    body: Option<GmailBody>,
    #[serde(default)]
    parts: Vec<GmailPart>,
}

#[derive(Debug, Deserialize)]
struct GmailBody {
    #[serde(default)]
    data: Option<String>,
}

impl From<GmailPart> for MessagePart {
    fn from(part: GmailPart) -> Self {
        MessagePart {
            mime_type: part.mime_type,
            data: part.body.and_then(|b| b.data),
            children: part.parts.into_iter().map(MessagePart::from).collect(),
        }
    }
}

// ============================================================================
// Client
// ============================================================================

/// Gmail-backed [`Mailbox`].
pub struct GmailClient {
    session: GoogleSession,
}

impl GmailClient {
    pub fn new(session: GoogleSession) -> Self {
        Self { session }
    }
}

/// Map a non-success response to a `MailError`.
async fn check(resp: reqwest::Response) -> Result<reqwest::Response, MailError> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(MailError::Unauthorized);
    }
    if !status.is_success() {
        let message = resp.text().await.unwrap_or_default();
        return Err(MailError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(resp)
}

#[async_trait]
impl Mailbox for GmailClient {
    async fn search(&self, query: &str) -> Result<Vec<String>, MailError> {
        let url = format!("{GMAIL_API}/messages");
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.session.get(&url).query(&[("q", query)]);
            if let Some(token) = page_token.as_deref() {
                request = request.query(&[("pageToken", token)]);
            }
            let list: MessageListResponse = check(request.send().await?).await?.json().await?;
            ids.extend(list.messages.into_iter().map(|m| m.id));

            match list.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(ids)
    }

    async fn fetch(&self, id: &str) -> Result<FetchedMessage, MailError> {
        let url = format!("{GMAIL_API}/messages/{id}");
        let resp = self
            .session
            .get(&url)
            .query(&[("format", "full")])
            .send()
            .await?;
        let message: FullMessage = check(resp).await?.json().await?;
        Ok(into_fetched(message))
    }

    async fn mark_read(&self, id: &str) -> Result<(), MailError> {
        let url = format!("{GMAIL_API}/messages/{id}/modify");
        let resp = self
            .session
            .post(&url)
            .json(&serde_json::json!({ "removeLabelIds": ["UNREAD"] }))
            .send()
            .await?;
        check(resp).await?;
        tracing::debug!(id = %id, "Marked email as read");
        Ok(())
    }
}

fn into_fetched(message: FullMessage) -> FetchedMessage {
    FetchedMessage {
        id: message.id,
        snippet: message.snippet,
        payload: message.payload.map(MessagePart::from).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::{decode_message, find_plain_text};

    #[test]
    fn full_payload_converts_to_part_tree() {
        let raw = r#"{
            "id": "18f0",
            "threadId": "18f0",
            "snippet": "Dear students, Acme is hiring",
            "payload": {
                "mimeType": "multipart/mixed",
                "body": {"size": 0},
                "parts": [
                    {
                        "mimeType": "multipart/alternative",
                        "body": {"size": 0},
                        "parts": [
                            {"mimeType": "text/plain", "body": {"size": 5, "data": "aGVsbG8"}},
                            {"mimeType": "text/html", "body": {"size": 12, "data": "PGI-aGk8L2I-"}}
                        ]
                    },
                    {"mimeType": "application/pdf", "filename": "jd.pdf", "body": {"attachmentId": "ANGj"}}
                ]
            }
        }"#;

        let message: FullMessage = serde_json::from_str(raw).unwrap();
        let fetched = into_fetched(message);
        assert_eq!(fetched.payload.mime_type, "multipart/mixed");
        assert_eq!(fetched.payload.children.len(), 2);
        assert_eq!(find_plain_text(&fetched.payload), Some("aGVsbG8"));

        let email = decode_message(fetched).unwrap();
        assert_eq!(email.body, "hello");
        assert_eq!(email.snippet, "Dear students, Acme is hiring");
    }

    #[test]
    fn missing_payload_becomes_empty_tree() {
        let message: FullMessage = serde_json::from_str(r#"{"id": "x"}"#).unwrap();
        let fetched = into_fetched(message);
        assert!(fetched.payload.children.is_empty());
        assert!(fetched.payload.data.is_none());
    }

    #[test]
    fn list_response_tolerates_no_messages() {
        let list: MessageListResponse = serde_json::from_str(r#"{"resultSizeEstimate": 0}"#).unwrap();
        assert!(list.messages.is_empty());
        assert!(list.next_page_token.is_none());
    }
}
