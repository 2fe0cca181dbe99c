//! Email processing pipeline.
//!
//! Every unread placement email flows through:
//! 1. `MailboxReader::fetch_unread()`: search and decode
//! 2. `Classifier::classify()`: one model call, typed details
//! 3. `ScheduleWriter::write()`: calendar reminders
//! 4. `ReportGenerator::generate()` + `Notifier::deliver()`: prep report to the phone
//!
//! Emails are handled one at a time; nothing runs in parallel.

pub mod processor;
pub mod types;

pub use processor::PlacementAgent;
pub use types::{EmailOutcome, RunSummary};
