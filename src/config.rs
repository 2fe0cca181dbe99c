//! Configuration types.
//!
//! Everything is read from the environment once at startup (after `.env` is
//! loaded) and handed to components by reference.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::LlmConfig;

/// Default Gemini model for both classification and report synthesis.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";

/// Default target zone for calendar events.
pub const DEFAULT_TIME_ZONE: &str = "Asia/Kolkata";

/// Upper bound for `PLACEMENT_LOOKBACK_DAYS` (ten years).
pub const MAX_LOOKBACK_DAYS: u32 = 3650;

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Generative model settings.
    pub llm: LlmConfig,
    /// Which emails are picked up.
    pub mail: MailSettings,
    /// Google OAuth files and calendar target.
    pub google: GoogleSettings,
    /// Zone attached to every calendar event.
    pub time_zone: Tz,
    /// Politeness and ordering pauses.
    pub pacing: Pacing,
    /// Extra classification attempts when the model returns unparseable output.
    pub classify_retries: u32,
    /// Directory for a daily-rolling log file, if any.
    pub log_dir: Option<PathBuf>,
}

/// Inbox filter settings.
#[derive(Debug, Clone)]
pub struct MailSettings {
    /// Only mail from this address is considered (no filter when `None`).
    pub sender: Option<String>,
    /// How many days back the `after:` filter reaches.
    pub lookback_days: u32,
}

/// Google-side settings.
#[derive(Debug, Clone)]
pub struct GoogleSettings {
    pub token_path: PathBuf,
    pub credentials_path: PathBuf,
    pub calendar_id: String,
}

/// Named pauses between dependent external calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Pause after finishing one email, before the next.
    pub between_emails: Duration,
    /// Pause after each scraped page.
    pub between_page_fetches: Duration,
    /// Pause after the summary message, before the report.
    pub after_summary: Duration,
    /// Pause between report parts.
    pub between_report_parts: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            between_emails: Duration::from_secs(5),
            between_page_fetches: Duration::from_secs(1),
            after_summary: Duration::from_secs(2),
            between_report_parts: Duration::from_secs(3),
        }
    }
}

impl Pacing {
    /// No pauses at all (tests, dry runs).
    pub fn none() -> Self {
        Self {
            between_emails: Duration::ZERO,
            between_page_fetches: Duration::ZERO,
            after_summary: Duration::ZERO,
            between_report_parts: Duration::ZERO,
        }
    }
}

impl AgentConfig {
    /// Build config from process environment variables.
    ///
    /// Fails when `GEMINI_API_KEY` is missing or any value is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = get("GEMINI_API_KEY")
            .ok_or_else(|| ConfigError::MissingEnvVar("GEMINI_API_KEY".into()))?;
        let model = get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let time_zone_name = get("PLACEMENT_TIMEZONE").unwrap_or_else(|| DEFAULT_TIME_ZONE.into());
        let time_zone = Tz::from_str(&time_zone_name).map_err(|e| ConfigError::InvalidValue {
            key: "PLACEMENT_TIMEZONE".into(),
            message: e.to_string(),
        })?;

        let lookback_days = parse_or(&get, "PLACEMENT_LOOKBACK_DAYS", 2)?;
        if lookback_days > MAX_LOOKBACK_DAYS {
            return Err(ConfigError::InvalidValue {
                key: "PLACEMENT_LOOKBACK_DAYS".into(),
                message: format!("{lookback_days} exceeds the {MAX_LOOKBACK_DAYS} day limit"),
            });
        }

        let defaults = Pacing::default();
        let pacing = Pacing {
            between_emails: Duration::from_secs(parse_or(
                &get,
                "PLACEMENT_EMAIL_PAUSE_SECS",
                defaults.between_emails.as_secs(),
            )?),
            between_page_fetches: Duration::from_millis(parse_or(
                &get,
                "PLACEMENT_SCRAPE_DELAY_MS",
                defaults.between_page_fetches.as_millis() as u64,
            )?),
            after_summary: Duration::from_secs(parse_or(
                &get,
                "PLACEMENT_SUMMARY_DELAY_SECS",
                defaults.after_summary.as_secs(),
            )?),
            between_report_parts: Duration::from_secs(parse_or(
                &get,
                "PLACEMENT_PART_DELAY_SECS",
                defaults.between_report_parts.as_secs(),
            )?),
        };

        Ok(Self {
            llm: LlmConfig {
                api_key: SecretString::from(api_key),
                model,
            },
            mail: MailSettings {
                sender: get("PLACEMENT_SENDER"),
                lookback_days,
            },
            google: GoogleSettings {
                token_path: get("GOOGLE_TOKEN_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("token.json")),
                credentials_path: get("GOOGLE_CREDENTIALS_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("credentials.json")),
                calendar_id: get("GOOGLE_CALENDAR_ID").unwrap_or_else(|| "primary".into()),
            },
            time_zone,
            pacing,
            classify_retries: parse_or(&get, "PLACEMENT_CLASSIFY_RETRIES", 1)?,
            log_dir: get("PLACEMENT_LOG_DIR").map(PathBuf::from),
        })
    }
}

/// Parse `key` if present, otherwise fall back to `default`.
///
/// A present but malformed value is an error, never silently defaulted.
fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{raw:?}: {e}"),
        }),
    }
}
