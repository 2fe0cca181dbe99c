//! Provider-agnostic MIME part tree and plain-text extraction.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

use crate::error::MailError;

/// Standard alphabet, padding optional.
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// One node of a message's MIME structure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagePart {
    pub mime_type: String,
    /// Encoded body data (URL-safe base64), if this node carries any.
    pub data: Option<String>,
    pub children: Vec<MessagePart>,
}

impl MessagePart {
    pub fn leaf(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: Some(data.into()),
            children: Vec::new(),
        }
    }

    pub fn multipart(mime_type: impl Into<String>, children: Vec<MessagePart>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: None,
            children,
        }
    }
}

/// Depth-first search for the first `text/plain` node with data.
///
/// Children are searched before the node itself, in order, so a nested
/// `multipart/alternative` is fully explored before later siblings.
pub fn find_plain_text(part: &MessagePart) -> Option<&str> {
    for child in &part.children {
        if let Some(data) = find_plain_text(child) {
            return Some(data);
        }
    }

    if part.mime_type.eq_ignore_ascii_case("text/plain")
        && let Some(data) = part.data.as_deref()
        && !data.is_empty()
    {
        return Some(data);
    }
    None
}

/// Decode URL-safe base64 (padding optional) into UTF-8 text.
pub fn decode_url_safe_base64(data: &str) -> Result<String, MailError> {
    let standard = data.replace('-', "+").replace('_', "/");
    let bytes = LENIENT_STANDARD
        .decode(standard.trim())
        .map_err(|e| MailError::Decode(format!("base64: {e}")))?;
    String::from_utf8(bytes).map_err(|e| MailError::Decode(format!("utf-8: {e}")))
}
