//! One pass over unread placement mail.
//!
//! Flow per email, strictly in sequence:
//! 1. Classify the body
//! 2. Branch on kind: calendar reminders and/or research report + notification
//! 3. Mark read
//! 4. Pause before the next email

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::calendar::ScheduleWriter;
use crate::classifier::{ClassifiedDetails, Classifier, Kind};
use crate::config::Pacing;
use crate::error::MailError;
use crate::mail::{MailboxReader, RawEmail};
use crate::notify::Notifier;
use crate::pipeline::types::{EmailOutcome, RunSummary};
use crate::research::ReportGenerator;

/// Wires the stages together.
pub struct PlacementAgent {
    reader: MailboxReader,
    classifier: Classifier,
    schedule: ScheduleWriter,
    research: ReportGenerator,
    notifier: Notifier,
    pacing: Pacing,
}

impl PlacementAgent {
    pub fn new(
        reader: MailboxReader,
        classifier: Classifier,
        schedule: ScheduleWriter,
        research: ReportGenerator,
        notifier: Notifier,
        pacing: Pacing,
    ) -> Self {
        Self {
            reader,
            classifier,
            schedule,
            research,
            notifier,
            pacing,
        }
    }

    /// Process every unread email matching `query`.
    ///
    /// Only a failed mailbox search is an error; each email's problems stay
    /// inside that email.
    pub async fn run_once(&self, query: &str) -> Result<RunSummary, MailError> {
        let emails = self.reader.fetch_unread(query).await?;
        let mut summary = RunSummary {
            fetched: emails.len(),
            ..Default::default()
        };

        let total = emails.len();
        for (i, email) in emails.iter().enumerate() {
            info!(id = %email.id, position = i + 1, total, "Processing email");
            let outcome = self.process_email(email).await;
            summary.record(&outcome);

            if i + 1 < total && !self.pacing.between_emails.is_zero() {
                tokio::time::sleep(self.pacing.between_emails).await;
            }
        }

        info!(
            fetched = summary.fetched,
            classified = summary.classified,
            unclassifiable = summary.unclassifiable,
            events = summary.events_created,
            reports = summary.reports_generated,
            delivered = summary.reports_delivered,
            "Run complete"
        );
        Ok(summary)
    }

    /// Classify one email, act on it, then mark it read.
    pub async fn process_email(&self, email: &RawEmail) -> EmailOutcome {
        let mut outcome = EmailOutcome::new(&email.id);

        match self.classifier.classify(&email.body).await {
            Ok(details) => {
                outcome.kind = Some(details.kind());
                self.act(&details, &mut outcome).await;
            }
            Err(e) => {
                warn!(id = %email.id, error = %e, "Could not classify email");
            }
        }

        match self.reader.mark_read(&email.id).await {
            Ok(()) => outcome.marked_read = true,
            Err(e) => error!(id = %email.id, error = %e, "Failed to mark email as read"),
        }

        outcome
    }

    async fn act(&self, details: &ClassifiedDetails, outcome: &mut EmailOutcome) {
        let kind = details.kind();
        info!(
            id = %outcome.id,
            kind = kind.label(),
            company = details.company_name().unwrap_or("-"),
            "Email classified"
        );

        match kind {
            Kind::NewOpportunity => {
                outcome.events_created = self.schedule.write(details).await.len();

                let Some(company) = details.company_name() else {
                    warn!(id = %outcome.id, "No company name, skipping prep report");
                    return;
                };
                let report = self.research.generate(company, details.job_role()).await;
                outcome.report = Some(report.outcome);
                outcome.delivery = Some(self.notifier.deliver(&report.body, details).await);
            }
            Kind::TestSchedule => {
                outcome.events_created = self.schedule.write(details).await.len();
            }
            Kind::SelectionList | Kind::TechTalk => {
                info!(id = %outcome.id, details = ?details, "No action for this kind");
            }
            Kind::General | Kind::Other => {
                info!(id = %outcome.id, "General email, nothing to do");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::calendar::{CalendarEvent, CalendarProvider, CreatedEvent};
    use crate::error::{CalendarError, LlmError, NotifyError, ResearchError};
    use crate::llm::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider};
    use crate::mail::{FetchedMessage, Mailbox, MessagePart};
    use crate::notify::{ChannelLimits, Delivery, MessagingChannel};
    use crate::research::{PageFetcher, ReportOutcome, ResearchSettings, WebSearch};

    struct ScriptedLlm {
        replies: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                return Err(LlmError::RequestFailed {
                    provider: "scripted".into(),
                    reason: "out of replies".into(),
                });
            }
            Ok(CompletionResponse {
                content: replies.remove(0),
                input_tokens: 0,
                output_tokens: 0,
                finish_reason: FinishReason::Stop,
            })
        }
    }

    #[derive(Default)]
    struct MemoryMailbox {
        marked: Mutex<Vec<String>>,
        fail_mark: bool,
    }

    #[async_trait]
    impl Mailbox for MemoryMailbox {
        async fn search(&self, _query: &str) -> Result<Vec<String>, MailError> {
            Ok(Vec::new())
        }

        async fn fetch(&self, id: &str) -> Result<FetchedMessage, MailError> {
            Ok(FetchedMessage {
                id: id.to_string(),
                snippet: String::new(),
                payload: MessagePart::leaf("text/plain", ""),
            })
        }

        async fn mark_read(&self, id: &str) -> Result<(), MailError> {
            if self.fail_mark {
                return Err(MailError::Unauthorized);
            }
            self.marked.lock().unwrap().push(id.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingCalendar {
        titles: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CalendarProvider for CountingCalendar {
        async fn insert_event(&self, event: &CalendarEvent) -> Result<CreatedEvent, CalendarError> {
            let mut titles = self.titles.lock().unwrap();
            titles.push(event.title.clone());
            Ok(CreatedEvent {
                id: format!("ev{}", titles.len()),
                title: event.title.clone(),
                link: None,
            })
        }
    }

    #[derive(Default)]
    struct NoResults {
        queries: Mutex<usize>,
    }

    #[async_trait]
    impl WebSearch for NoResults {
        async fn search(&self, _query: &str, _max: usize) -> Result<Vec<String>, ResearchError> {
            *self.queries.lock().unwrap() += 1;
            Ok(Vec::new())
        }
    }

    struct NoPages;

    #[async_trait]
    impl PageFetcher for NoPages {
        async fn fetch(&self, url: &str) -> Result<String, ResearchError> {
            Err(ResearchError::EmptyPage(url.to_string()))
        }
    }

    #[derive(Default)]
    struct Outbox {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MessagingChannel for Outbox {
        fn name(&self) -> &str {
            "outbox"
        }

        async fn send(&self, body: &str) -> Result<String, NotifyError> {
            self.sent.lock().unwrap().push(body.to_string());
            Ok("SM1".into())
        }
    }

    struct Harness {
        agent: PlacementAgent,
        mailbox: Arc<MemoryMailbox>,
        calendar: Arc<CountingCalendar>,
        search: Arc<NoResults>,
        outbox: Arc<Outbox>,
    }

    fn harness(classifier_replies: &[&str], mailbox: MemoryMailbox) -> Harness {
        let mailbox = Arc::new(mailbox);
        let calendar = Arc::new(CountingCalendar::default());
        let search = Arc::new(NoResults::default());
        let outbox = Arc::new(Outbox::default());
        let llm = Arc::new(ScriptedLlm {
            replies: Mutex::new(classifier_replies.iter().map(|r| r.to_string()).collect()),
        });

        let agent = PlacementAgent::new(
            MailboxReader::new(mailbox.clone()),
            Classifier::new(llm.clone(), 0),
            ScheduleWriter::new(calendar.clone(), chrono_tz::Asia::Kolkata),
            ReportGenerator::new(
                search.clone(),
                Arc::new(NoPages),
                llm,
                ResearchSettings {
                    fetch_delay: Duration::ZERO,
                    ..Default::default()
                },
            ),
            Notifier::new(Some(outbox.clone()), ChannelLimits::default(), Pacing::none()),
            Pacing::none(),
        );

        Harness {
            agent,
            mailbox,
            calendar,
            search,
            outbox,
        }
    }

    fn email(id: &str) -> RawEmail {
        RawEmail {
            id: id.to_string(),
            snippet: String::new(),
            body: "placement mail".to_string(),
        }
    }

    #[tokio::test]
    async fn new_opportunity_gets_events_report_and_messages() {
        let h = harness(
            &[r#"{"email_type":"New Opportunity","company_name":"Acme","job_role":"SDE",
                 "application_deadline":"2025-04-05","interview_or_test_date":"2025-04-12"}"#],
            MemoryMailbox::default(),
        );

        let outcome = h.agent.process_email(&email("m1")).await;

        assert_eq!(outcome.kind, Some(Kind::NewOpportunity));
        assert_eq!(outcome.events_created, 2);
        assert_eq!(outcome.report, Some(ReportOutcome::NoSources));
        assert_eq!(outcome.delivery, Some(Delivery::Complete { messages: 2 }));
        assert!(outcome.marked_read);
        assert_eq!(*h.search.queries.lock().unwrap(), 9);
        assert_eq!(h.outbox.sent.lock().unwrap().len(), 2);
        assert_eq!(*h.mailbox.marked.lock().unwrap(), vec!["m1"]);
    }

    #[tokio::test]
    async fn opportunity_without_company_skips_report() {
        let h = harness(
            &[r#"{"email_type":"New Opportunity","application_deadline":"2025-04-05"}"#],
            MemoryMailbox::default(),
        );

        let outcome = h.agent.process_email(&email("m1")).await;

        assert_eq!(outcome.events_created, 1);
        assert_eq!(outcome.report, None);
        assert_eq!(*h.search.queries.lock().unwrap(), 0);
        assert!(h.outbox.sent.lock().unwrap().is_empty());
        assert!(outcome.marked_read);
    }

    #[tokio::test]
    async fn test_schedule_only_writes_calendar() {
        let h = harness(
            &[r#"{"email_type":"Test Schedule","company_name":"Acme","test_date_time":"2025-04-10T10:00:00","test_duration":"90 minutes"}"#],
            MemoryMailbox::default(),
        );

        let outcome = h.agent.process_email(&email("m1")).await;

        assert_eq!(outcome.kind, Some(Kind::TestSchedule));
        assert_eq!(outcome.events_created, 1);
        assert!(outcome.report.is_none());
        assert!(h.outbox.sent.lock().unwrap().is_empty());
        assert_eq!(h.calendar.titles.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn other_kinds_are_only_logged() {
        let h = harness(
            &[
                r#"{"email_type":"Selection List","company_name":"Acme"}"#,
                r#"{"email_type":"Tech Talk","topic":"Rust"}"#,
                r#"{"email_type":"General Notification","is_opportunity":true}"#,
            ],
            MemoryMailbox::default(),
        );

        for id in ["a", "b", "c"] {
            let outcome = h.agent.process_email(&email(id)).await;
            assert!(outcome.kind.is_some());
            assert_eq!(outcome.events_created, 0);
            assert!(outcome.report.is_none());
            assert!(outcome.marked_read);
        }
        assert!(h.calendar.titles.lock().unwrap().is_empty());
        assert!(h.outbox.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unclassifiable_email_is_still_marked_read() {
        let h = harness(&["I cannot help with that."], MemoryMailbox::default());

        let outcome = h.agent.process_email(&email("m1")).await;

        assert_eq!(outcome.kind, None);
        assert!(outcome.marked_read);
        assert!(h.calendar.titles.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn model_call_failure_still_marks_read_and_does_nothing_else() {
        // No scripted replies: the classifier's model call itself errors.
        let h = harness(&[], MemoryMailbox::default());

        let outcome = h.agent.process_email(&email("m1")).await;

        assert_eq!(outcome.kind, None);
        assert_eq!(outcome.events_created, 0);
        assert!(outcome.report.is_none());
        assert!(outcome.delivery.is_none());
        assert!(outcome.marked_read);
        assert_eq!(*h.mailbox.marked.lock().unwrap(), vec!["m1"]);
        assert!(h.calendar.titles.lock().unwrap().is_empty());
        assert_eq!(*h.search.queries.lock().unwrap(), 0);
        assert!(h.outbox.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn mark_read_failure_is_reported_not_raised() {
        let h = harness(
            &[r#"{"email_type":"General Notification"}"#],
            MemoryMailbox {
                fail_mark: true,
                ..Default::default()
            },
        );

        let outcome = h.agent.process_email(&email("m1")).await;
        assert_eq!(outcome.kind, Some(Kind::General));
        assert!(!outcome.marked_read);
    }

    #[tokio::test]
    async fn empty_inbox_is_an_empty_run() {
        let h = harness(&[], MemoryMailbox::default());
        let summary = h.agent.run_once("is:unread").await.unwrap();
        assert_eq!(summary, RunSummary::default());
    }
}
