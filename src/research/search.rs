//! DuckDuckGo HTML search.

use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

use crate::error::ResearchError;
use crate::research::WebSearch;

const DDG_HTML_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const DDG_BASE: &str = "https://duckduckgo.com";

static RESULT_LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a.result__a").unwrap());

/// Web search over DuckDuckGo's no-JS results page.
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
    endpoint: String,
}

impl DuckDuckGoSearch {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            endpoint: DDG_HTML_ENDPOINT.to_string(),
        }
    }
}

#[async_trait]
impl WebSearch for DuckDuckGoSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>, ResearchError> {
        let search_err = |reason: String| ResearchError::Search {
            query: query.to_string(),
            reason,
        };

        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| search_err(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(search_err(format!("HTTP {}", status.as_u16())));
        }

        let html = resp.text().await.map_err(|e| search_err(e.to_string()))?;
        Ok(parse_search_results(&html, max_results))
    }
}

/// Pull up to `max` organic result URLs out of a results page.
///
/// Redirect links (`/l/?uddg=…`) are unwrapped; ads and non-http links are
/// dropped; duplicates keep their first position.
pub fn parse_search_results(html: &str, max: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut urls: Vec<String> = Vec::new();

    for anchor in document.select(&RESULT_LINK) {
        if urls.len() >= max {
            break;
        }
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(target) = resolve_result_href(href) else {
            continue;
        };
        if !urls.contains(&target) {
            urls.push(target);
        }
    }

    urls
}

fn resolve_result_href(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else if href.starts_with('/') {
        format!("{DDG_BASE}{href}")
    } else {
        href.to_string()
    };
    let url = Url::parse(&absolute).ok()?;

    let target = if is_duckduckgo(&url) {
        if url.path() == "/y.js" {
            return None;
        }
        let (_, uddg) = url.query_pairs().find(|(k, _)| k == "uddg")?;
        Url::parse(&uddg).ok()?
    } else {
        url
    };

    if is_duckduckgo(&target) || target.query_pairs().any(|(k, _)| k == "ad_domain") {
        return None;
    }
    matches!(target.scheme(), "http" | "https").then(|| target.to_string())
}

fn is_duckduckgo(url: &Url) -> bool {
    url.host_str()
        .is_some_and(|h| h == "duckduckgo.com" || h.ends_with(".duckduckgo.com"))
}
