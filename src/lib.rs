//! Placement agent: turns unread placement-cell mail into calendar
//! reminders and phone-delivered prep reports.

pub mod calendar;
pub mod classifier;
pub mod config;
pub mod error;
pub mod google;
pub mod llm;
pub mod mail;
pub mod notify;
pub mod pipeline;
pub mod research;
