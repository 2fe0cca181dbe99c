//! Calendar reminders derived from classified emails.
//!
//! [`plan_events`] is pure: it turns details into zero, one, or two event
//! drafts. [`ScheduleWriter`] inserts each draft independently so one bad
//! field or one failed insert never blocks its sibling.

pub mod google;

pub use google::GoogleCalendar;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta};
use chrono_tz::Tz;
use tracing::{info, warn};

use crate::classifier::ClassifiedDetails;
use crate::error::CalendarError;

const UNKNOWN_COMPANY: &str = "Unknown Company";
const NOT_AVAILABLE: &str = "N/A";
const DEFAULT_TEST_LOCATION: &str = "Check Email";

const ONE_DAY_MINUTES: u32 = 24 * 60;

/// Start or end of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTime {
    AllDay(NaiveDate),
    /// Wall-clock time in the event's zone.
    Timed(NaiveDateTime),
}

/// A reminder override, `minutes` before the start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub method: &'static str,
    pub minutes: u32,
}

impl Reminder {
    pub fn popup(minutes: u32) -> Self {
        Self {
            method: "popup",
            minutes,
        }
    }
}

/// An event to be created.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub start: EventTime,
    /// Exclusive end; all-day events end the day after they start.
    pub end: EventTime,
    pub time_zone: Tz,
    pub reminders: Vec<Reminder>,
}

/// What the provider returned for an inserted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedEvent {
    pub id: String,
    pub title: String,
    pub link: Option<String>,
}

/// A calendar that accepts new events.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    async fn insert_event(&self, event: &CalendarEvent) -> Result<CreatedEvent, CalendarError>;
}

/// Derive event drafts from classified details.
///
/// Absent fields produce no entry. Present but unparseable fields produce an
/// `Err` entry so the caller can log them.
pub fn plan_events(details: &ClassifiedDetails, tz: Tz) -> Vec<Result<CalendarEvent, CalendarError>> {
    let mut planned = Vec::new();

    match details {
        ClassifiedDetails::NewOpportunity {
            company_name,
            job_role,
            compensation,
            application_deadline,
            interview_date,
            eligibility,
        } => {
            let company = company_name.as_deref().unwrap_or(UNKNOWN_COMPANY);
            let role = job_role.as_deref().unwrap_or(NOT_AVAILABLE);

            if let Some(raw) = application_deadline {
                planned.push(parse_date("application_deadline", raw).and_then(|date| {
                    all_day_event(
                        "application_deadline",
                        format!("Apply for {company}"),
                        format!(
                            "Role: {role}\nCTC/Stipend: {}\nEligibility: {}",
                            compensation.as_deref().unwrap_or(NOT_AVAILABLE),
                            eligibility.as_deref().unwrap_or(NOT_AVAILABLE),
                        ),
                        date,
                        tz,
                        vec![Reminder::popup(ONE_DAY_MINUTES), Reminder::popup(2 * ONE_DAY_MINUTES)],
                    )
                }));
            }

            if let Some(raw) = interview_date {
                planned.push(parse_date("interview_or_test_date", raw).and_then(|date| {
                    all_day_event(
                        "interview_or_test_date",
                        format!("Interview/Test: {company}"),
                        format!("Check email for specific timings and details for the {role} role."),
                        date,
                        tz,
                        vec![Reminder::popup(ONE_DAY_MINUTES)],
                    )
                }));
            }
        }
        ClassifiedDetails::TestSchedule {
            company_name,
            job_role,
            starts_at: Some(raw),
            duration,
            location,
        } => {
            let event = parse_local_datetime("test_date_time", raw, tz).and_then(|start| {
                let end = start
                    .checked_add_signed(TimeDelta::hours(1))
                    .ok_or_else(|| out_of_range("test_date_time", raw))?;
                Ok(CalendarEvent {
                    title: format!("Test: {}", company_name.as_deref().unwrap_or(UNKNOWN_COMPANY)),
                    description: format!(
                        "Role: {}\nDuration: {}",
                        job_role.as_deref().unwrap_or(NOT_AVAILABLE),
                        duration.as_deref().unwrap_or(NOT_AVAILABLE),
                    ),
                    location: Some(location.clone().unwrap_or_else(|| DEFAULT_TEST_LOCATION.to_string())),
                    start: EventTime::Timed(start),
                    end: EventTime::Timed(end),
                    time_zone: tz,
                    reminders: vec![Reminder::popup(60), Reminder::popup(ONE_DAY_MINUTES)],
                })
            });
            planned.push(event);
        }
        _ => {}
    }

    planned
}

fn all_day_event(
    field: &'static str,
    title: String,
    description: String,
    date: NaiveDate,
    tz: Tz,
    reminders: Vec<Reminder>,
) -> Result<CalendarEvent, CalendarError> {
    let end = date
        .checked_add_days(chrono::Days::new(1))
        .ok_or_else(|| out_of_range(field, &date.to_string()))?;
    Ok(CalendarEvent {
        title,
        description,
        location: None,
        start: EventTime::AllDay(date),
        end: EventTime::AllDay(end),
        time_zone: tz,
        reminders,
    })
}

/// The event would end past the last representable date.
fn out_of_range(field: &'static str, value: &str) -> CalendarError {
    CalendarError::InvalidDate {
        field,
        value: value.to_string(),
        expected: "a date before the end of the supported range",
    }
}

fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate, CalendarError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| CalendarError::InvalidDate {
        field,
        value: raw.to_string(),
        expected: "YYYY-MM-DD",
    })
}

/// Parse an ISO-8601 timestamp as wall-clock time in `tz`.
///
/// Seconds and fractions are optional. A timestamp carrying an offset is
/// converted into `tz`; one without is taken as already local.
fn parse_local_datetime(field: &'static str, raw: &str, tz: Tz) -> Result<NaiveDateTime, CalendarError> {
    let trimmed = raw.trim();

    let with_offset = DateTime::parse_from_rfc3339(trimmed)
        .or_else(|_| DateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M%:z"));
    if let Ok(dt) = with_offset {
        return Ok(dt.with_timezone(&tz).naive_local());
    }

    const LOCAL_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| CalendarError::InvalidDate {
            field,
            value: raw.to_string(),
            expected: "ISO-8601 date-time",
        })
}

/// Writes reminder events for classified emails.
pub struct ScheduleWriter {
    calendar: Arc<dyn CalendarProvider>,
    time_zone: Tz,
}

impl ScheduleWriter {
    pub fn new(calendar: Arc<dyn CalendarProvider>, time_zone: Tz) -> Self {
        Self { calendar, time_zone }
    }

    /// Create every event the details call for; failures are logged per event.
    pub async fn write(&self, details: &ClassifiedDetails) -> Vec<CreatedEvent> {
        let mut created = Vec::new();

        for planned in plan_events(details, self.time_zone) {
            let event = match planned {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "Skipping calendar event");
                    continue;
                }
            };

            match self.calendar.insert_event(&event).await {
                Ok(done) => {
                    info!(
                        title = %done.title,
                        link = done.link.as_deref().unwrap_or("-"),
                        "Created calendar event"
                    );
                    created.push(done);
                }
                Err(e) => warn!(title = %event.title, error = %e, "Failed to create calendar event"),
            }
        }

        created
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono_tz::Asia::Kolkata;

    use super::*;

    fn opportunity(deadline: Option<&str>, interview: Option<&str>) -> ClassifiedDetails {
        ClassifiedDetails::NewOpportunity {
            company_name: Some("Acme".into()),
            job_role: Some("SDE".into()),
            compensation: Some("12 LPA".into()),
            application_deadline: deadline.map(String::from),
            interview_date: interview.map(String::from),
            eligibility: None,
        }
    }

    fn test_schedule(starts_at: &str) -> ClassifiedDetails {
        ClassifiedDetails::TestSchedule {
            company_name: None,
            job_role: Some("Analyst".into()),
            starts_at: Some(starts_at.into()),
            duration: Some("90 minutes".into()),
            location: None,
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Records inserted events; fails inserts whose title contains `fail_on`.
    struct RecordingCalendar {
        inserted: Mutex<Vec<CalendarEvent>>,
        fail_on: Option<&'static str>,
    }

    impl RecordingCalendar {
        fn new(fail_on: Option<&'static str>) -> Self {
            Self {
                inserted: Mutex::new(Vec::new()),
                fail_on,
            }
        }
    }

    #[async_trait]
    impl CalendarProvider for RecordingCalendar {
        async fn insert_event(&self, event: &CalendarEvent) -> Result<CreatedEvent, CalendarError> {
            if let Some(needle) = self.fail_on
                && event.title.contains(needle)
            {
                return Err(CalendarError::Api {
                    status: 500,
                    message: "backend".into(),
                });
            }
            let mut inserted = self.inserted.lock().unwrap();
            inserted.push(event.clone());
            Ok(CreatedEvent {
                id: format!("evt{}", inserted.len()),
                title: event.title.clone(),
                link: Some("https://calendar.google.com/event?eid=x".into()),
            })
        }
    }

    #[test]
    fn opportunity_with_both_dates_plans_two_events() {
        let planned = plan_events(&opportunity(Some("2025-04-05"), Some("2025-04-10")), Kolkata);
        assert_eq!(planned.len(), 2);

        let apply = planned[0].as_ref().unwrap();
        assert_eq!(apply.title, "Apply for Acme");
        assert_eq!(apply.description, "Role: SDE\nCTC/Stipend: 12 LPA\nEligibility: N/A");
        assert_eq!(apply.start, EventTime::AllDay(ymd(2025, 4, 5)));
        assert_eq!(apply.end, EventTime::AllDay(ymd(2025, 4, 6)));
        assert_eq!(apply.reminders, vec![Reminder::popup(1440), Reminder::popup(2880)]);
        assert_eq!(apply.time_zone, Kolkata);

        let interview = planned[1].as_ref().unwrap();
        assert_eq!(interview.title, "Interview/Test: Acme");
        assert_eq!(
            interview.description,
            "Check email for specific timings and details for the SDE role."
        );
        assert_eq!(interview.reminders, vec![Reminder::popup(1440)]);
    }

    #[test]
    fn absent_fields_plan_nothing() {
        assert!(plan_events(&opportunity(None, None), Kolkata).is_empty());
        assert!(plan_events(&ClassifiedDetails::General, Kolkata).is_empty());
        let no_time = ClassifiedDetails::TestSchedule {
            company_name: Some("Acme".into()),
            job_role: None,
            starts_at: None,
            duration: None,
            location: None,
        };
        assert!(plan_events(&no_time, Kolkata).is_empty());
    }

    #[test]
    fn bad_deadline_does_not_block_interview() {
        let planned = plan_events(&opportunity(Some("next Monday"), Some("2025-04-10")), Kolkata);
        assert_eq!(planned.len(), 2);
        assert!(matches!(
            planned[0],
            Err(CalendarError::InvalidDate { field: "application_deadline", .. })
        ));
        assert_eq!(planned[1].as_ref().unwrap().title, "Interview/Test: Acme");
    }

    #[test]
    fn missing_company_and_role_render_placeholders() {
        let details = ClassifiedDetails::NewOpportunity {
            company_name: None,
            job_role: None,
            compensation: None,
            application_deadline: Some("2025-01-31".into()),
            interview_date: None,
            eligibility: None,
        };
        let planned = plan_events(&details, Kolkata);
        let event = planned[0].as_ref().unwrap();
        assert_eq!(event.title, "Apply for Unknown Company");
        assert_eq!(event.description, "Role: N/A\nCTC/Stipend: N/A\nEligibility: N/A");
    }

    #[test]
    fn all_day_end_crosses_month() {
        let planned = plan_events(&opportunity(Some("2024-02-29"), None), Kolkata);
        assert_eq!(planned[0].as_ref().unwrap().end, EventTime::AllDay(ymd(2024, 3, 1)));
    }

    #[test]
    fn deadline_on_last_supported_day_is_rejected() {
        let last_day = NaiveDate::MAX.to_string();
        let planned = plan_events(&opportunity(Some(&last_day), Some("2025-04-10")), Kolkata);
        assert_eq!(planned.len(), 2);
        assert!(matches!(
            planned[0],
            Err(CalendarError::InvalidDate { field: "application_deadline", .. })
        ));
        assert_eq!(planned[1].as_ref().unwrap().title, "Interview/Test: Acme");
    }

    #[test]
    fn test_running_past_last_supported_day_is_rejected() {
        let late = format!("{}T23:30:00", NaiveDate::MAX);
        let planned = plan_events(&test_schedule(&late), Kolkata);
        assert_eq!(planned.len(), 1);
        assert!(matches!(
            planned[0],
            Err(CalendarError::InvalidDate { field: "test_date_time", .. })
        ));
    }

    #[test]
    fn test_schedule_is_one_hour() {
        let planned = plan_events(&test_schedule("2025-04-05T15:00:00"), Kolkata);
        assert_eq!(planned.len(), 1);
        let event = planned[0].as_ref().unwrap();
        let start = ymd(2025, 4, 5).and_hms_opt(15, 0, 0).unwrap();
        assert_eq!(event.start, EventTime::Timed(start));
        assert_eq!(event.end, EventTime::Timed(start + TimeDelta::hours(1)));
        assert_eq!(event.title, "Test: Unknown Company");
        assert_eq!(event.location.as_deref(), Some("Check Email"));
        assert_eq!(event.description, "Role: Analyst\nDuration: 90 minutes");
        assert_eq!(event.reminders, vec![Reminder::popup(60), Reminder::popup(1440)]);
    }

    #[test]
    fn test_schedule_end_crosses_midnight() {
        let planned = plan_events(&test_schedule("2025-04-05T23:30"), Kolkata);
        let event = planned[0].as_ref().unwrap();
        assert_eq!(
            event.end,
            EventTime::Timed(ymd(2025, 4, 6).and_hms_opt(0, 30, 0).unwrap())
        );
    }

    #[test]
    fn datetime_variants_parse() {
        let expected = ymd(2025, 4, 5).and_hms_opt(15, 0, 0).unwrap();
        for raw in [
            "2025-04-05T15:00:00",
            "2025-04-05T15:00",
            "2025-04-05T15:00:00.000",
            "2025-04-05 15:00",
            "2025-04-05T09:30:00Z",
            "2025-04-05T15:00:00+05:30",
            "2025-04-05T15:00+05:30",
        ] {
            assert_eq!(parse_local_datetime("t", raw, Kolkata).unwrap(), expected, "{raw}");
        }
    }

    #[test]
    fn unparseable_datetime_is_error() {
        let planned = plan_events(&test_schedule("Saturday 3pm"), Kolkata);
        assert!(matches!(planned[0], Err(CalendarError::InvalidDate { .. })));
    }

    #[tokio::test]
    async fn writer_skips_unparseable_and_inserts_rest() {
        let calendar = Arc::new(RecordingCalendar::new(None));
        let writer = ScheduleWriter::new(calendar.clone(), Kolkata);

        let created = writer
            .write(&opportunity(Some("next Monday"), Some("2025-04-10")))
            .await;

        assert_eq!(created.len(), 1);
        assert_eq!(created[0].title, "Interview/Test: Acme");
        let inserted = calendar.inserted.lock().unwrap();
        assert_eq!(inserted.len(), 1);
        assert_eq!(inserted[0].start, EventTime::AllDay(ymd(2025, 4, 10)));
    }

    #[tokio::test]
    async fn insert_failure_does_not_block_sibling() {
        let calendar = Arc::new(RecordingCalendar::new(Some("Apply")));
        let writer = ScheduleWriter::new(calendar.clone(), Kolkata);

        let created = writer
            .write(&opportunity(Some("2025-04-05"), Some("2025-04-10")))
            .await;

        assert_eq!(created.len(), 1);
        assert_eq!(created[0].title, "Interview/Test: Acme");
    }

    #[tokio::test]
    async fn other_kinds_write_nothing() {
        let calendar = Arc::new(RecordingCalendar::new(None));
        let writer = ScheduleWriter::new(calendar.clone(), Kolkata);
        let talk = ClassifiedDetails::TechTalk {
            topic: Some("Rust".into()),
            speaker: None,
            date_time: Some("2025-04-05T15:00:00".into()),
            venue: None,
        };

        assert!(writer.write(&talk).await.is_empty());
        assert!(calendar.inserted.lock().unwrap().is_empty());
    }
}
