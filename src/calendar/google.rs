//! Google Calendar API v3 event insertion.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::calendar::{CalendarEvent, CalendarProvider, CreatedEvent, EventTime};
use crate::error::CalendarError;
use crate::google::GoogleSession;

const CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3";

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventBody<'a> {
    summary: &'a str,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
    start: EventDateTime,
    end: EventDateTime,
    reminders: Reminders,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventDateTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_time: Option<String>,
    time_zone: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Reminders {
    use_default: bool,
    overrides: Vec<ReminderOverride>,
}

#[derive(Debug, Serialize)]
struct ReminderOverride {
    method: &'static str,
    minutes: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertedEvent {
    #[serde(default)]
    id: String,
    #[serde(default)]
    html_link: Option<String>,
}

fn event_time(time: EventTime, time_zone: &str) -> EventDateTime {
    match time {
        EventTime::AllDay(date) => EventDateTime {
            date: Some(date.format("%Y-%m-%d").to_string()),
            date_time: None,
            time_zone: time_zone.to_string(),
        },
        EventTime::Timed(at) => EventDateTime {
            date: None,
            date_time: Some(at.format("%Y-%m-%dT%H:%M:%S").to_string()),
            time_zone: time_zone.to_string(),
        },
    }
}

fn event_body(event: &CalendarEvent) -> EventBody<'_> {
    let zone = event.time_zone.name();
    EventBody {
        summary: &event.title,
        description: &event.description,
        location: event.location.as_deref(),
        start: event_time(event.start, zone),
        end: event_time(event.end, zone),
        reminders: Reminders {
            use_default: false,
            overrides: event
                .reminders
                .iter()
                .map(|r| ReminderOverride {
                    method: r.method,
                    minutes: r.minutes,
                })
                .collect(),
        },
    }
}

// ============================================================================
// Client
// ============================================================================

/// Google Calendar-backed [`CalendarProvider`].
pub struct GoogleCalendar {
    session: GoogleSession,
    calendar_id: String,
}

impl GoogleCalendar {
    pub fn new(session: GoogleSession, calendar_id: impl Into<String>) -> Self {
        Self {
            session,
            calendar_id: calendar_id.into(),
        }
    }

    fn events_url(&self) -> String {
        let id: String = url::form_urlencoded::byte_serialize(self.calendar_id.as_bytes()).collect();
        format!("{CALENDAR_API}/calendars/{id}/events")
    }
}

#[async_trait]
impl CalendarProvider for GoogleCalendar {
    async fn insert_event(&self, event: &CalendarEvent) -> Result<CreatedEvent, CalendarError> {
        let resp = self
            .session
            .post(&self.events_url())
            .json(&event_body(event))
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(CalendarError::Unauthorized);
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(CalendarError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let inserted: InsertedEvent = resp.json().await?;
        Ok(CreatedEvent {
            id: inserted.id,
            title: event.title.clone(),
            link: inserted.html_link,
        })
    }
}
