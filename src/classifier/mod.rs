//! Email classification.
//!
//! One model call per email. The model's JSON is untrusted: it is pulled out
//! of any fence or prose, coerced field by field, and turned into a closed
//! [`ClassifiedDetails`] union. Only the kind drives control flow downstream.

pub mod prompt;

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::ClassifyError;
use crate::llm::{ChatMessage, CompletionRequest, FinishReason, LlmProvider, extract_json_object};

const CLASSIFY_TEMPERATURE: f32 = 0.2;
const CLASSIFY_TOP_P: f32 = 1.0;
const CLASSIFY_TOP_K: u32 = 1;
const CLASSIFY_MAX_TOKENS: u32 = 2048;

/// Email category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    NewOpportunity,
    TestSchedule,
    SelectionList,
    TechTalk,
    General,
    Other,
}

impl Kind {
    /// Map a model label onto a kind, ignoring case, spaces, and underscores.
    pub fn from_label(label: &str) -> Self {
        let normalized: String = label
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "newopportunity" => Kind::NewOpportunity,
            "testschedule" => Kind::TestSchedule,
            "selectionlist" => Kind::SelectionList,
            "techtalk" => Kind::TechTalk,
            "generalnotification" | "general" => Kind::General,
            _ => Kind::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Kind::NewOpportunity => "new_opportunity",
            Kind::TestSchedule => "test_schedule",
            Kind::SelectionList => "selection_list",
            Kind::TechTalk => "tech_talk",
            Kind::General => "general",
            Kind::Other => "other",
        }
    }
}

/// Typed classification result. Every field may be absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedDetails {
    NewOpportunity {
        company_name: Option<String>,
        job_role: Option<String>,
        /// CTC or stipend, free text.
        compensation: Option<String>,
        /// `YYYY-MM-DD`, unvalidated.
        application_deadline: Option<String>,
        /// `YYYY-MM-DD`, unvalidated.
        interview_date: Option<String>,
        eligibility: Option<String>,
    },
    TestSchedule {
        company_name: Option<String>,
        job_role: Option<String>,
        /// ISO-8601 local date-time, unvalidated.
        starts_at: Option<String>,
        duration: Option<String>,
        location: Option<String>,
    },
    SelectionList {
        company_name: Option<String>,
        round_name: Option<String>,
    },
    TechTalk {
        topic: Option<String>,
        speaker: Option<String>,
        date_time: Option<String>,
        venue: Option<String>,
    },
    General,
    Other,
}

impl ClassifiedDetails {
    pub fn kind(&self) -> Kind {
        match self {
            ClassifiedDetails::NewOpportunity { .. } => Kind::NewOpportunity,
            ClassifiedDetails::TestSchedule { .. } => Kind::TestSchedule,
            ClassifiedDetails::SelectionList { .. } => Kind::SelectionList,
            ClassifiedDetails::TechTalk { .. } => Kind::TechTalk,
            ClassifiedDetails::General => Kind::General,
            ClassifiedDetails::Other => Kind::Other,
        }
    }

    pub fn company_name(&self) -> Option<&str> {
        match self {
            ClassifiedDetails::NewOpportunity { company_name, .. }
            | ClassifiedDetails::TestSchedule { company_name, .. }
            | ClassifiedDetails::SelectionList { company_name, .. } => company_name.as_deref(),
            ClassifiedDetails::TechTalk { speaker, .. } => speaker.as_deref(),
            ClassifiedDetails::General | ClassifiedDetails::Other => None,
        }
    }

    pub fn job_role(&self) -> Option<&str> {
        match self {
            ClassifiedDetails::NewOpportunity { job_role, .. }
            | ClassifiedDetails::TestSchedule { job_role, .. } => job_role.as_deref(),
            _ => None,
        }
    }
}

/// Classifies email bodies with a language model.
pub struct Classifier {
    llm: Arc<dyn LlmProvider>,
    /// Extra attempts after an unparseable answer.
    retries: u32,
}

impl Classifier {
    pub fn new(llm: Arc<dyn LlmProvider>, retries: u32) -> Self {
        Self { llm, retries }
    }

    /// Classify one email body.
    ///
    /// Model call failures return immediately; unparseable output is retried
    /// up to `retries` times before giving up.
    pub async fn classify(&self, body: &str) -> Result<ClassifiedDetails, ClassifyError> {
        let mut attempt = 0;
        loop {
            let request = CompletionRequest::new(vec![
                ChatMessage::system(prompt::system_prompt()),
                ChatMessage::user(prompt::user_prompt(body)),
            ])
            .with_temperature(CLASSIFY_TEMPERATURE)
            .with_top_p(CLASSIFY_TOP_P)
            .with_top_k(CLASSIFY_TOP_K)
            .with_max_tokens(CLASSIFY_MAX_TOKENS);

            let response = self.llm.complete(request).await?;
            if response.finish_reason == FinishReason::Length {
                warn!(
                    output_tokens = response.output_tokens,
                    "Classification hit the token limit"
                );
            }

            match parse_details(&response.content) {
                Ok(details) => {
                    info!(kind = details.kind().label(), "Email classified");
                    return Ok(details);
                }
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    warn!(
                        error = %e,
                        attempt,
                        "Unparseable classification, retrying"
                    );
                }
                Err(e) => {
                    debug!(raw_response = %response.content, "Giving up on classification");
                    return Err(e);
                }
            }
        }
    }
}

// ── Response parsing ────────────────────────────────────────────────

/// Parse model output into typed details.
pub fn parse_details(raw: &str) -> Result<ClassifiedDetails, ClassifyError> {
    let json_str = extract_json_object(raw)
        .ok_or_else(|| ClassifyError::Parse("no JSON object in model output".into()))?;
    let value: Value =
        serde_json::from_str(json_str).map_err(|e| ClassifyError::Parse(e.to_string()))?;
    let Value::Object(obj) = value else {
        return Err(ClassifyError::Parse("expected a JSON object".into()));
    };

    let label = text(&obj, "email_type").ok_or(ClassifyError::MissingKind)?;

    Ok(match Kind::from_label(&label) {
        Kind::NewOpportunity => ClassifiedDetails::NewOpportunity {
            company_name: text(&obj, "company_name"),
            job_role: text(&obj, "job_role"),
            compensation: text(&obj, "ctc_or_stipend"),
            application_deadline: first(&obj, "application_deadline"),
            interview_date: first(&obj, "interview_or_test_date"),
            eligibility: text(&obj, "eligibility_criteria"),
        },
        Kind::TestSchedule => ClassifiedDetails::TestSchedule {
            company_name: text(&obj, "company_name"),
            job_role: text(&obj, "job_role"),
            starts_at: first(&obj, "test_date_time"),
            duration: text(&obj, "test_duration"),
            location: text(&obj, "test_location_or_mode"),
        },
        Kind::SelectionList => ClassifiedDetails::SelectionList {
            company_name: text(&obj, "company_name"),
            round_name: text(&obj, "round_name"),
        },
        Kind::TechTalk => ClassifiedDetails::TechTalk {
            topic: text(&obj, "topic"),
            speaker: text(&obj, "speaker_or_company"),
            date_time: first(&obj, "date_time"),
            venue: text(&obj, "venue"),
        },
        Kind::General => ClassifiedDetails::General,
        Kind::Other => ClassifiedDetails::Other,
    })
}

/// Scalar coercion: strings, numbers, and booleans become text; blanks and
/// placeholder words become `None`.
fn scalar(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    let lowered = s.to_ascii_lowercase();
    if s.is_empty() || matches!(lowered.as_str(), "null" | "none" | "n/a" | "na") {
        None
    } else {
        Some(s)
    }
}

/// A text field. Arrays are joined with ", ".
fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(scalar).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        other => scalar(other),
    }
}

/// A date field. Arrays yield their first usable element.
fn first(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::Array(items) => items.iter().find_map(scalar),
        other => scalar(other),
    }
}
