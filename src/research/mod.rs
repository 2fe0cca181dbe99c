//! Web research and prep-report synthesis.
//!
//! A fixed fan-out of search queries, a polite sequential scrape of the top
//! results, and one model call that turns the scraped text into a guide.

pub mod fetch;
pub mod prompt;
pub mod search;

pub use fetch::{HttpPageFetcher, browser_client, extract_page_text};
pub use search::{DuckDuckGoSearch, parse_search_results};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::ResearchError;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};

/// Sent instead of a report when nothing could be scraped.
pub const FAILURE_REPORT: &str = "Could not generate a report. Failed to gather information online.";

/// Role used when the email did not name one.
pub const DEFAULT_ROLE: &str = "campus recruitment for freshers";

const RESULTS_PER_QUERY: usize = 3;
const MAX_SCRAPED_CHARS: usize = 15_000;

/// A search engine returning result URLs.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>, ResearchError>;
}

/// Fetches a page's raw HTML.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, ResearchError>;
}

/// How a report came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    Generated,
    /// Nothing was scraped; the model was not called.
    NoSources,
    /// The model call failed; the body carries the error text.
    ModelFailed,
}

/// Report text plus how it was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub body: String,
    pub outcome: ReportOutcome,
}

/// Tunables for a research run.
#[derive(Debug, Clone, Copy)]
pub struct ResearchSettings {
    pub results_per_query: usize,
    pub max_chars: usize,
    /// Pause after each page fetch.
    pub fetch_delay: Duration,
}

impl Default for ResearchSettings {
    fn default() -> Self {
        Self {
            results_per_query: RESULTS_PER_QUERY,
            max_chars: MAX_SCRAPED_CHARS,
            fetch_delay: Duration::from_secs(1),
        }
    }
}

/// The nine research queries for a company and role.
pub fn build_queries(company: &str, role: &str) -> Vec<String> {
    vec![
        format!("'{company}' '{role}' interview experience geeksforgeeks"),
        format!("'{company}' technical interview questions glassdoor"),
        format!("'{company}' '{role}' recruitment process"),
        format!("'{company}' compensation details"),
        format!("site:leetcode.com '{company}' '{role}' interview"),
        format!("'{company}' '{role}' interview process"),
        format!("'{company}' '{role}' interview questions"),
        format!("what is it like to work at '{company}'"),
        format!("'{company}' company culture"),
    ]
}

/// First `max` characters of `text`, never splitting a character.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Builds prep reports.
pub struct ReportGenerator {
    search: Arc<dyn WebSearch>,
    fetcher: Arc<dyn PageFetcher>,
    llm: Arc<dyn LlmProvider>,
    settings: ResearchSettings,
}

impl ReportGenerator {
    pub fn new(
        search: Arc<dyn WebSearch>,
        fetcher: Arc<dyn PageFetcher>,
        llm: Arc<dyn LlmProvider>,
        settings: ResearchSettings,
    ) -> Self {
        Self {
            search,
            fetcher,
            llm,
            settings,
        }
    }

    /// Research `company` and synthesize a guide. Never fails: problems are
    /// logged and reflected in the report outcome.
    pub async fn generate(&self, company: &str, role: Option<&str>) -> Report {
        let role = role.map(str::trim).filter(|r| !r.is_empty()).unwrap_or(DEFAULT_ROLE);
        info!(company = %company, role = %role, "Starting research");

        let scraped = self.gather(company, role).await;
        if scraped.is_empty() {
            warn!(company = %company, "Could not gather any information from the web");
            return Report {
                body: FAILURE_REPORT.to_string(),
                outcome: ReportOutcome::NoSources,
            };
        }

        let excerpt = truncate_chars(&scraped, self.settings.max_chars);
        info!(
            scraped_chars = scraped.chars().count(),
            used_chars = excerpt.chars().count(),
            "Synthesizing report"
        );

        let request =
            CompletionRequest::new(vec![ChatMessage::user(prompt::report_prompt(company, role, excerpt))]);

        match self.llm.complete(request).await {
            Ok(response) => {
                info!(chars = response.content.chars().count(), "Report generated");
                Report {
                    body: response.content,
                    outcome: ReportOutcome::Generated,
                }
            }
            Err(e) => {
                warn!(error = %e, "Report synthesis failed");
                Report {
                    body: format!("An error occurred while generating the report: {e}"),
                    outcome: ReportOutcome::ModelFailed,
                }
            }
        }
    }

    /// Run every query and scrape its top results into one buffer.
    async fn gather(&self, company: &str, role: &str) -> String {
        let mut buffer = String::new();

        for query in build_queries(company, role) {
            let urls = match self.search.search(&query, self.settings.results_per_query).await {
                Ok(urls) => urls,
                Err(e) => {
                    warn!(query = %query, error = %e, "Search failed, skipping query");
                    continue;
                }
            };
            debug!(query = %query, results = urls.len(), "Search complete");

            for url in urls {
                match self.scrape(&url).await {
                    Ok(text) => {
                        debug!(url = %url, chars = text.chars().count(), "Scraped page");
                        buffer.push_str(&text);
                        buffer.push_str("\n\n");
                    }
                    Err(e) => warn!(url = %url, error = %e, "Could not scrape page"),
                }
                if !self.settings.fetch_delay.is_zero() {
                    tokio::time::sleep(self.settings.fetch_delay).await;
                }
            }
        }

        buffer
    }

    async fn scrape(&self, url: &str) -> Result<String, ResearchError> {
        let html = self.fetcher.fetch(url).await?;
        let text = extract_page_text(&html);
        if text.is_empty() {
            return Err(ResearchError::EmptyPage(url.to_string()));
        }
        Ok(text)
    }
}
