//! Per-email outcomes and the run tally.

use crate::classifier::Kind;
use crate::notify::Delivery;
use crate::research::ReportOutcome;

/// What happened to one email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailOutcome {
    pub id: String,
    /// `None` when the email could not be classified.
    pub kind: Option<Kind>,
    pub events_created: usize,
    pub report: Option<ReportOutcome>,
    pub delivery: Option<Delivery>,
    pub marked_read: bool,
}

impl EmailOutcome {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: None,
            events_created: 0,
            report: None,
            delivery: None,
            marked_read: false,
        }
    }
}

/// Counters for a whole run, logged once at the end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub fetched: usize,
    pub classified: usize,
    pub unclassifiable: usize,
    pub events_created: usize,
    pub reports_generated: usize,
    pub reports_delivered: usize,
    pub mark_read_failures: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &EmailOutcome) {
        if outcome.kind.is_some() {
            self.classified += 1;
        } else {
            self.unclassifiable += 1;
        }
        self.events_created += outcome.events_created;
        if outcome.report.is_some() {
            self.reports_generated += 1;
        }
        if outcome.delivery.is_some_and(|d| d.is_complete()) {
            self.reports_delivered += 1;
        }
        if !outcome.marked_read {
            self.mark_read_failures += 1;
        }
    }
}
