//! Web collaborator: gather real interview-question material for a topic.
//!
//! Used only when the `web_search_questions` capability is on. Every call
//! is bounded in time (client-level timeout) and in size (fetched text is
//! truncated), and every failure degrades to "no reference material" —
//! the question stage then generates original questions instead.

use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::StageError;
use crate::output::ExperienceLevel;

/// One search result.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
}

/// Maximum characters of fetched page text carried into a prompt.
const MAX_FETCHED_CHARS: usize = 2000;
/// Maximum search hits considered per query.
const MAX_HITS: usize = 5;

static RE_RESULT_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<a[^>]+class="result__a"[^>]+href="(?P<url>[^"]+)"[^>]*>(?P<title>[^<]+)</a>"#)
        .unwrap()
});

static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<script.*?</script>|<style.*?</style>|<[^>]+>").unwrap());

static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Web search / page-fetch collaborator.
pub struct WebQuestionSource {
    client: reqwest::Client,
}

impl WebQuestionSource {
    pub fn new(timeout_secs: u64) -> Result<Self, StageError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("resume-tailor/0.1")
            .build()
            .map_err(|e| StageError::Fetch {
                url: String::new(),
                detail: format!("client build failed: {e}"),
            })?;
        Ok(Self { client })
    }

    /// Search the web, returning an ordered, bounded list of hits.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, StageError> {
        let url = search_url(query);
        let body = self.get_text(&url).await?;

        let hits: Vec<SearchHit> = RE_RESULT_LINK
            .captures_iter(&body)
            .take(MAX_HITS)
            .map(|c| SearchHit {
                url: c["url"].to_string(),
                title: c["title"].trim().to_string(),
            })
            .collect();

        debug!("search '{}' → {} hits", query, hits.len());
        Ok(hits)
    }

    /// Fetch a page and reduce it to bounded plain text. `None` on any
    /// failure or when nothing readable remains.
    pub async fn fetch_text(&self, url: &str) -> Option<String> {
        let body = match self.get_text(url).await {
            Ok(b) => b,
            Err(e) => {
                warn!("{e}");
                return None;
            }
        };
        let text = strip_html(&body);
        if text.is_empty() {
            return None;
        }
        Some(truncate_chars(&text, MAX_FETCHED_CHARS))
    }

    /// Search for real interview questions on `topic` and fetch the first
    /// usable hit. Returns `(source_url, bounded_text)`.
    pub async fn gather_reference_material(
        &self,
        topic: &str,
        level: ExperienceLevel,
    ) -> Option<(String, String)> {
        let query = format!("{topic} interview questions {level}");
        let hits = match self.search(&query).await {
            Ok(h) => h,
            Err(e) => {
                warn!("reference search failed: {e}");
                return None;
            }
        };

        for hit in hits {
            if let Some(text) = self.fetch_text(&hit.url).await {
                return Some((hit.url, text));
            }
        }
        None
    }

    async fn get_text(&self, url: &str) -> Result<String, StageError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StageError::Fetch {
                url: url.to_string(),
                detail: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(StageError::Fetch {
                url: url.to_string(),
                detail: format!("HTTP {}", response.status()),
            });
        }

        response.text().await.map_err(|e| StageError::Fetch {
            url: url.to_string(),
            detail: e.to_string(),
        })
    }
}

fn strip_html(body: &str) -> String {
    let no_tags = RE_TAG.replace_all(body, " ");
    RE_WS.replace_all(no_tags.trim(), " ").to_string()
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

fn search_url(query: &str) -> String {
    format!(
        "https://html.duckduckgo.com/html/?q={}",
        urlencoding::encode(query)
    )
}
