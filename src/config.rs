//! Application settings with builder pattern and environment variable support.
//!
//! Settings are resolved in order: explicit values → environment variables →
//! defaults. The binary loads a `.env` file into the environment first.

use std::path::PathBuf;
use std::time::Duration;

use serde_json::json;

use crate::agent::orchestrator::DEFAULT_MAX_ITERATIONS;
use crate::agent::context::{ContextLimits, DEFAULT_MAX_CHARS, DEFAULT_MAX_ITEMS};
use crate::agent::policy::{DEFAULT_LOOKAHEAD_YEARS, DEFAULT_RECENCY_KEYWORDS, RoutingPolicy};
use crate::error::ConfigError;

/// Default LLM provider.
pub const DEFAULT_PROVIDER: &str = "ollama";
/// Default Ollama server.
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
/// Default chat model.
pub const DEFAULT_MODEL: &str = "llama3";
/// Default embedding model served by Ollama.
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";
/// Default Qdrant REST endpoint.
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6333";
/// Default Qdrant collection.
pub const DEFAULT_QDRANT_COLLECTION: &str = "aequitas_documents";

const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 2048;
const DEFAULT_TAVILY_MAX_RESULTS: usize = 5;
const DEFAULT_RETRIEVAL_TOP_K: usize = 5;
const DEFAULT_SOURCE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SYNTHESIS_TIMEOUT_SECS: u64 = 120;

/// Resolved application settings.
#[derive(Clone)]
pub struct Settings {
    /// LLM provider name (`ollama` or `openai`).
    pub provider: String,
    /// API key for the provider (unused by Ollama).
    pub api_key: Option<String>,
    /// Base URL override for the OpenAI-compatible endpoint.
    pub base_url: Option<String>,
    /// Ollama server, used for embeddings and as the default chat endpoint.
    pub ollama_base_url: String,
    /// Chat model for answer synthesis.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens in a generated answer.
    pub max_tokens: u32,
    /// Tavily API key. Web search is disabled when absent.
    pub tavily_api_key: Option<String>,
    /// Maximum Tavily results per search.
    pub tavily_max_results: usize,
    /// Whether to wire the local retriever at all.
    pub local_retrieval: bool,
    /// Qdrant REST endpoint.
    pub qdrant_url: String,
    /// Qdrant API key (cloud instances).
    pub qdrant_api_key: Option<String>,
    /// Collection searched by the local retriever.
    pub qdrant_collection: String,
    /// Named vector to search, for collections with several vectors.
    pub qdrant_vector_name: Option<String>,
    /// Embedding model used to vectorize queries.
    pub embedding_model: String,
    /// Documents fetched per local retrieval.
    pub retrieval_top_k: usize,
    /// Default iteration budget per run.
    pub max_iterations: usize,
    /// Keywords that mark a query as recency-sensitive.
    pub recency_keywords: Vec<String>,
    /// Calendar years, from the current one, that mark a query as recency-sensitive.
    pub lookahead_years: u32,
    /// Items per context section.
    pub context_items: usize,
    /// Characters per context item.
    pub context_chars: usize,
    /// Deadline for each evidence source call.
    pub source_timeout: Duration,
    /// Deadline for the synthesizer call.
    pub synthesis_timeout: Duration,
    /// Directory containing prompt overrides.
    pub prompt_dir: Option<PathBuf>,
}

impl Settings {
    /// Creates a new builder for `Settings`.
    #[must_use]
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Creates settings from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::builder().from_env()?.build()
    }

    /// Routing policy configured by these settings.
    #[must_use]
    pub fn routing_policy(&self) -> RoutingPolicy {
        RoutingPolicy::new(&self.recency_keywords, self.lookahead_years)
    }

    /// Context limits configured by these settings.
    #[must_use]
    pub const fn context_limits(&self) -> ContextLimits {
        ContextLimits {
            max_items: self.context_items,
            max_chars: self.context_chars,
        }
    }

    /// Whether a Tavily key is available.
    #[must_use]
    pub fn web_search_enabled(&self) -> bool {
        self.tavily_api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }

    /// Settings as JSON with every secret replaced by a marker.
    #[must_use]
    pub fn redacted(&self) -> serde_json::Value {
        json!({
            "provider": self.provider,
            "api_key": redact(self.api_key.as_deref()),
            "base_url": self.base_url,
            "ollama_base_url": self.ollama_base_url,
            "model": self.model,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "tavily_api_key": redact(self.tavily_api_key.as_deref()),
            "tavily_max_results": self.tavily_max_results,
            "local_retrieval": self.local_retrieval,
            "qdrant_url": self.qdrant_url,
            "qdrant_api_key": redact(self.qdrant_api_key.as_deref()),
            "qdrant_collection": self.qdrant_collection,
            "qdrant_vector_name": self.qdrant_vector_name,
            "embedding_model": self.embedding_model,
            "retrieval_top_k": self.retrieval_top_k,
            "max_iterations": self.max_iterations,
            "recency_keywords": self.recency_keywords,
            "lookahead_years": self.lookahead_years,
            "context_items": self.context_items,
            "context_chars": self.context_chars,
            "source_timeout_secs": self.source_timeout.as_secs(),
            "synthesis_timeout_secs": self.synthesis_timeout.as_secs(),
            "prompt_dir": self.prompt_dir.as_ref().map(|p| p.display().to_string()),
        })
    }
}

fn redact(secret: Option<&str>) -> &'static str {
    match secret {
        Some(s) if !s.is_empty() => "<redacted>",
        _ => "<none>",
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("provider", &self.provider)
            .field("api_key", &redact(self.api_key.as_deref()))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("tavily_api_key", &redact(self.tavily_api_key.as_deref()))
            .field("qdrant_url", &self.qdrant_url)
            .field("qdrant_api_key", &redact(self.qdrant_api_key.as_deref()))
            .field("qdrant_collection", &self.qdrant_collection)
            .field("max_iterations", &self.max_iterations)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Settings`].
#[derive(Clone, Default)]
pub struct SettingsBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    ollama_base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    tavily_api_key: Option<String>,
    tavily_max_results: Option<usize>,
    local_retrieval: Option<bool>,
    qdrant_url: Option<String>,
    qdrant_api_key: Option<String>,
    qdrant_collection: Option<String>,
    qdrant_vector_name: Option<String>,
    embedding_model: Option<String>,
    retrieval_top_k: Option<usize>,
    max_iterations: Option<usize>,
    recency_keywords: Option<Vec<String>>,
    lookahead_years: Option<u32>,
    context_items: Option<usize>,
    context_chars: Option<usize>,
    source_timeout: Option<Duration>,
    synthesis_timeout: Option<Duration>,
    prompt_dir: Option<PathBuf>,
}

impl std::fmt::Debug for SettingsBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsBuilder")
            .field("provider", &self.provider)
            .field("api_key", &redact(self.api_key.as_deref()))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("tavily_api_key", &redact(self.tavily_api_key.as_deref()))
            .field("qdrant_url", &self.qdrant_url)
            .field("qdrant_api_key", &redact(self.qdrant_api_key.as_deref()))
            .field("qdrant_collection", &self.qdrant_collection)
            .field("max_iterations", &self.max_iterations)
            .finish_non_exhaustive()
    }
}

impl SettingsBuilder {
    /// Populates unset fields from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a numeric or boolean
    /// variable cannot be parsed.
    pub fn from_env(self) -> Result<Self, ConfigError> {
        self.from_lookup(|key| std::env::var(key).ok())
    }

    /// Populates unset fields from `lookup`, which maps a variable name to
    /// its value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a numeric or boolean
    /// variable cannot be parsed.
    pub fn from_lookup<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        fill(&mut self.provider, || text("AEQUITAS_PROVIDER"));
        fill(&mut self.api_key, || {
            text("OPENAI_API_KEY").or_else(|| text("AEQUITAS_API_KEY"))
        });
        fill(&mut self.base_url, || {
            text("OPENAI_BASE_URL").or_else(|| text("AEQUITAS_BASE_URL"))
        });
        fill(&mut self.ollama_base_url, || text("OLLAMA_BASE_URL"));
        fill(&mut self.model, || text("DEFAULT_MODEL"));
        fill(&mut self.tavily_api_key, || text("TAVILY_API_KEY"));
        fill(&mut self.qdrant_url, || text("QDRANT_URL"));
        fill(&mut self.qdrant_api_key, || text("QDRANT_API_KEY"));
        fill(&mut self.qdrant_collection, || text("QDRANT_COLLECTION"));
        fill(&mut self.qdrant_vector_name, || text("QDRANT_VECTOR_NAME"));
        fill(&mut self.embedding_model, || text("EMBEDDING_MODEL"));
        fill(&mut self.prompt_dir, || {
            text("AEQUITAS_PROMPT_DIR").map(PathBuf::from)
        });
        fill(&mut self.recency_keywords, || {
            text("AEQUITAS_RECENCY_KEYWORDS").map(|v| {
                v.split(',')
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
                    .collect()
            })
        });

        try_fill(&mut self.temperature, "MODEL_TEMPERATURE", &text)?;
        try_fill(&mut self.max_tokens, "MODEL_MAX_TOKENS", &text)?;
        try_fill(&mut self.tavily_max_results, "TAVILY_MAX_RESULTS", &text)?;
        try_fill(&mut self.local_retrieval, "LOCAL_RETRIEVAL", &text)?;
        try_fill(&mut self.retrieval_top_k, "RETRIEVAL_TOP_K", &text)?;
        try_fill(&mut self.max_iterations, "MAX_ITERATIONS", &text)?;
        try_fill(&mut self.lookahead_years, "AEQUITAS_LOOKAHEAD_YEARS", &text)?;
        try_fill(&mut self.context_items, "AEQUITAS_CONTEXT_ITEMS", &text)?;
        try_fill(&mut self.context_chars, "AEQUITAS_CONTEXT_CHARS", &text)?;

        if self.source_timeout.is_none() {
            let mut secs: Option<u64> = None;
            try_fill(&mut secs, "AEQUITAS_SOURCE_TIMEOUT_SECS", &text)?;
            self.source_timeout = secs.map(Duration::from_secs);
        }
        if self.synthesis_timeout.is_none() {
            let mut secs: Option<u64> = None;
            try_fill(&mut secs, "AEQUITAS_SYNTHESIS_TIMEOUT_SECS", &text)?;
            self.synthesis_timeout = secs.map(Duration::from_secs);
        }

        Ok(self)
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the provider API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override for the chat endpoint.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the Ollama server URL.
    #[must_use]
    pub fn ollama_base_url(mut self, url: impl Into<String>) -> Self {
        self.ollama_base_url = Some(url.into());
        self
    }

    /// Sets the chat model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    /// Sets the maximum answer tokens.
    #[must_use]
    pub const fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    /// Sets the Tavily API key.
    #[must_use]
    pub fn tavily_api_key(mut self, key: impl Into<String>) -> Self {
        self.tavily_api_key = Some(key.into());
        self
    }

    /// Sets the maximum Tavily results per search.
    #[must_use]
    pub const fn tavily_max_results(mut self, n: usize) -> Self {
        self.tavily_max_results = Some(n);
        self
    }

    /// Enables or disables the local retriever.
    #[must_use]
    pub const fn local_retrieval(mut self, enabled: bool) -> Self {
        self.local_retrieval = Some(enabled);
        self
    }

    /// Sets the Qdrant REST endpoint.
    #[must_use]
    pub fn qdrant_url(mut self, url: impl Into<String>) -> Self {
        self.qdrant_url = Some(url.into());
        self
    }

    /// Sets the Qdrant collection.
    #[must_use]
    pub fn qdrant_collection(mut self, name: impl Into<String>) -> Self {
        self.qdrant_collection = Some(name.into());
        self
    }

    /// Sets the embedding model.
    #[must_use]
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = Some(model.into());
        self
    }

    /// Sets the number of documents fetched per local retrieval.
    #[must_use]
    pub const fn retrieval_top_k(mut self, n: usize) -> Self {
        self.retrieval_top_k = Some(n);
        self
    }

    /// Sets the default iteration budget.
    #[must_use]
    pub const fn max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = Some(n);
        self
    }

    /// Sets the recency keyword list.
    #[must_use]
    pub fn recency_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recency_keywords = Some(keywords.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the year lookahead.
    #[must_use]
    pub const fn lookahead_years(mut self, n: u32) -> Self {
        self.lookahead_years = Some(n);
        self
    }

    /// Sets the items per context section.
    #[must_use]
    pub const fn context_items(mut self, n: usize) -> Self {
        self.context_items = Some(n);
        self
    }

    /// Sets the characters per context item.
    #[must_use]
    pub const fn context_chars(mut self, n: usize) -> Self {
        self.context_chars = Some(n);
        self
    }

    /// Sets the evidence source deadline.
    #[must_use]
    pub const fn source_timeout(mut self, d: Duration) -> Self {
        self.source_timeout = Some(d);
        self
    }

    /// Sets the synthesizer deadline.
    #[must_use]
    pub const fn synthesis_timeout(mut self, d: Duration) -> Self {
        self.synthesis_timeout = Some(d);
        self
    }

    /// Sets the prompt override directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Builds the [`Settings`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the iteration budget is zero.
    pub fn build(self) -> Result<Settings, ConfigError> {
        let max_iterations = self.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS);
        if max_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                key: "MAX_ITERATIONS".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Settings {
            provider: self
                .provider
                .unwrap_or_else(|| DEFAULT_PROVIDER.to_string()),
            api_key: self.api_key,
            base_url: self.base_url,
            ollama_base_url: self
                .ollama_base_url
                .unwrap_or_else(|| DEFAULT_OLLAMA_BASE_URL.to_string()),
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            tavily_api_key: self.tavily_api_key,
            tavily_max_results: self
                .tavily_max_results
                .unwrap_or(DEFAULT_TAVILY_MAX_RESULTS),
            local_retrieval: self.local_retrieval.unwrap_or(true),
            qdrant_url: self
                .qdrant_url
                .unwrap_or_else(|| DEFAULT_QDRANT_URL.to_string()),
            qdrant_api_key: self.qdrant_api_key,
            qdrant_collection: self
                .qdrant_collection
                .unwrap_or_else(|| DEFAULT_QDRANT_COLLECTION.to_string()),
            qdrant_vector_name: self.qdrant_vector_name,
            embedding_model: self
                .embedding_model
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            retrieval_top_k: self.retrieval_top_k.unwrap_or(DEFAULT_RETRIEVAL_TOP_K),
            max_iterations,
            recency_keywords: self.recency_keywords.unwrap_or_else(|| {
                DEFAULT_RECENCY_KEYWORDS
                    .iter()
                    .map(ToString::to_string)
                    .collect()
            }),
            lookahead_years: self.lookahead_years.unwrap_or(DEFAULT_LOOKAHEAD_YEARS),
            context_items: self.context_items.unwrap_or(DEFAULT_MAX_ITEMS),
            context_chars: self.context_chars.unwrap_or(DEFAULT_MAX_CHARS),
            source_timeout: self
                .source_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_SOURCE_TIMEOUT_SECS)),
            synthesis_timeout: self
                .synthesis_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_SYNTHESIS_TIMEOUT_SECS)),
            prompt_dir: self.prompt_dir,
        })
    }
}

fn fill<T>(slot: &mut Option<T>, value: impl FnOnce() -> Option<T>) {
    if slot.is_none() {
        *slot = value();
    }
}

fn try_fill<T>(
    slot: &mut Option<T>,
    key: &str,
    text: &dyn Fn(&str) -> Option<String>,
) -> Result<(), ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if slot.is_some() {
        return Ok(());
    }
    if let Some(raw) = text(key) {
        let parsed = raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            })?;
        *slot = Some(parsed);
    }
    Ok(())
}
