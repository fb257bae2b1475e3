//! Web search through the Tavily API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{endpoint, send_and_decode};
use crate::agent::traits::Searcher;
use crate::error::SourceError;

/// Public Tavily endpoint.
pub const TAVILY_BASE_URL: &str = "https://api.tavily.com";

/// [`Searcher`] backed by Tavily.
#[derive(Clone)]
pub struct TavilySearcher {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    max_results: usize,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

impl SearchHit {
    fn render(&self) -> String {
        format!("Title: {}\nURL: {}\n{}", self.title, self.url, self.content)
    }
}

impl TavilySearcher {
    /// Creates a searcher returning at most `max_results` hits per query.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Misconfigured`] if `api_key` is blank.
    pub fn new(api_key: impl Into<String>, max_results: usize) -> Result<Self, SourceError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(SourceError::Misconfigured {
                message: "Tavily API key cannot be empty".to_string(),
            });
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: TAVILY_BASE_URL.to_string(),
            api_key,
            max_results,
        })
    }

    /// Points the searcher at a different host (proxies, test servers).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl std::fmt::Debug for TavilySearcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TavilySearcher")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("max_results", &self.max_results)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Searcher for TavilySearcher {
    fn name(&self) -> &'static str {
        "tavily"
    }

    async fn search(&self, query: &str) -> Result<Vec<String>, SourceError> {
        let request = self
            .http
            .post(endpoint(&self.base_url, "search"))
            .bearer_auth(&self.api_key)
            .json(&SearchRequest {
                api_key: &self.api_key,
                query,
                max_results: self.max_results,
            });

        let response: SearchResponse = send_and_decode(request).await?;
        let results: Vec<String> = response.results.iter().map(SearchHit::render).collect();
        debug!(count = results.len(), "tavily search");
        Ok(results)
    }
}
