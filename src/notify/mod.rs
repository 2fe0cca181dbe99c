//! Report delivery over a messaging channel.
//!
//! One summary message, then the report either whole (with a single header)
//! or as ordered, size-bounded parts. Lengths are counted in characters.

pub mod twilio;

pub use twilio::{TwilioChannel, TwilioConfig};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::classifier::ClassifiedDetails;
use crate::config::Pacing;
use crate::error::NotifyError;

const SINGLE_HEADER: &str = "📄 *AI-Generated Preparation Report* 📄\n\n";
const NOT_AVAILABLE: &str = "N/A";

fn part_header(index: usize, total: usize) -> String {
    format!("📄 *Prep Report [Part {index}/{total}]* 📄\n\n")
}

/// A destination that accepts text messages.
#[async_trait]
pub trait MessagingChannel: Send + Sync {
    /// Channel name, for logging.
    fn name(&self) -> &str;

    /// Send one message; returns the provider's delivery id.
    async fn send(&self, body: &str) -> Result<String, NotifyError>;
}

/// Per-message size budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelLimits {
    /// Hard limit per message, in characters.
    pub max_len: usize,
    /// Room kept for the "Part i/N" header.
    pub header_reserve: usize,
}

impl Default for ChannelLimits {
    fn default() -> Self {
        Self {
            max_len: 1600,
            header_reserve: 50,
        }
    }
}

/// Split a report into the messages that carry it.
///
/// Fits in one message → single header + report. Otherwise
/// `ceil(len / (max_len - header_reserve))` contiguous slices, each with a
/// part header. When the longest part header would not fit in
/// `header_reserve`, the reserve grows to that header's length.
pub fn plan_report_messages(report: &str, limits: ChannelLimits) -> Vec<String> {
    let len = report.chars().count();
    if len + SINGLE_HEADER.chars().count() <= limits.max_len {
        return vec![format!("{SINGLE_HEADER}{report}")];
    }

    // Terminates: the reserve only grows, and is bounded by the header for `len` parts.
    let mut reserve = limits.header_reserve;
    let (chunk_len, total) = loop {
        let chunk_len = limits.max_len.saturating_sub(reserve).max(1);
        let total = len.div_ceil(chunk_len);
        let needed = part_header(total, total).chars().count();
        if needed <= reserve {
            break (chunk_len, total);
        }
        reserve = needed;
    };
    let chars: Vec<char> = report.chars().collect();

    chars
        .chunks(chunk_len)
        .enumerate()
        .map(|(i, chunk)| {
            let mut message = part_header(i + 1, total);
            message.extend(chunk.iter());
            message
        })
        .collect()
}

/// The fixed opportunity summary.
pub fn summary_message(details: &ClassifiedDetails) -> String {
    let (compensation, deadline, interview) = match details {
        ClassifiedDetails::NewOpportunity {
            compensation,
            application_deadline,
            interview_date,
            ..
        } => (
            compensation.as_deref(),
            application_deadline.as_deref(),
            interview_date.as_deref(),
        ),
        _ => (None, None, None),
    };

    format!(
        "🚀 *New Opportunity Found!* 🚀\n\n\
         *Company:* {}\n\
         *Role:* {}\n\
         *CTC/Stipend:* {}\n\
         *Apply By:* {}\n\
         *Test/Interview:* {}\n\n\
         I've added events to your calendar. The full AI-generated prep report will follow in \
         the next message(s). Good luck!",
        details.company_name().unwrap_or(NOT_AVAILABLE),
        details.job_role().unwrap_or(NOT_AVAILABLE),
        compensation.unwrap_or(NOT_AVAILABLE),
        deadline.unwrap_or(NOT_AVAILABLE),
        interview.unwrap_or(NOT_AVAILABLE),
    )
}

/// Result of one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// No channel configured.
    Skipped,
    /// Summary and every report message went out.
    Complete { messages: usize },
    /// A send failed; nothing after it was attempted.
    Interrupted { sent: usize, planned: usize },
}

impl Delivery {
    pub fn is_complete(&self) -> bool {
        matches!(self, Delivery::Complete { .. })
    }
}

/// Build the Twilio channel from the environment, or `None` if unconfigured.
pub fn channel_from_env() -> Option<Arc<dyn MessagingChannel>> {
    match TwilioConfig::from_env() {
        Ok(config) => Some(Arc::new(TwilioChannel::new(config))),
        Err(e) => {
            let e = NotifyError::from(e);
            warn!(error = %e, "Messaging disabled for this run");
            None
        }
    }
}

/// Sends summaries and reports.
pub struct Notifier {
    channel: Option<Arc<dyn MessagingChannel>>,
    limits: ChannelLimits,
    pacing: Pacing,
}

impl Notifier {
    pub fn new(channel: Option<Arc<dyn MessagingChannel>>, limits: ChannelLimits, pacing: Pacing) -> Self {
        Self {
            channel,
            limits,
            pacing,
        }
    }

    /// Deliver the summary and the report, in order.
    pub async fn deliver(&self, report: &str, details: &ClassifiedDetails) -> Delivery {
        let Some(channel) = self.channel.as_ref() else {
            warn!("Messaging channel not configured, skipping notification");
            return Delivery::Skipped;
        };

        let parts = plan_report_messages(report, self.limits);
        let planned = parts.len() + 1;
        info!(
            channel = channel.name(),
            report_chars = report.chars().count(),
            parts = parts.len(),
            "Sending report"
        );

        match channel.send(&summary_message(details)).await {
            Ok(sid) => info!(sid = %sid, "Summary message sent"),
            Err(e) => {
                error!(error = %e, "Failed to send summary message");
                return Delivery::Interrupted { sent: 0, planned };
            }
        }
        pause(self.pacing.after_summary).await;

        let total = parts.len();
        for (i, body) in parts.iter().enumerate() {
            match channel.send(body).await {
                Ok(sid) => info!(sid = %sid, part = i + 1, total, "Report message sent"),
                Err(e) => {
                    error!(
                        error = %e,
                        part = i + 1,
                        total,
                        "Failed to send report part, dropping the rest"
                    );
                    return Delivery::Interrupted { sent: i + 1, planned };
                }
            }
            if i + 1 < total {
                pause(self.pacing.between_report_parts).await;
            }
        }

        Delivery::Complete { messages: planned }
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
