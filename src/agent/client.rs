//! Provider registry and agent factory.
//!
//! Maps provider names to concrete [`LlmProvider`] implementations and wires
//! the configured evidence sources into a [`ReasoningAgent`].

use std::sync::Arc;

use tracing::{info, warn};

use super::orchestrator::{AdapterTimeouts, ReasoningAgent};
use super::prompt::PromptSet;
use super::provider::LlmProvider;
#[cfg(feature = "openai")]
use super::providers::OpenAiProvider;
use super::synthesizer::{AnswerAgent, LlmSynthesizer};
use crate::config::Settings;
use crate::error::{AgentError, Result};
use crate::sources::{OllamaEmbedder, QdrantConfig, QdrantRetriever, TavilySearcher};

/// Creates an [`LlmProvider`] based on the configured provider name.
///
/// # Supported Providers
///
/// - `"ollama"` (default): a local Ollama server through its `/v1` endpoint
/// - `"openai"`: `OpenAI`-compatible APIs; requires an API key
///
/// # Errors
///
/// Returns [`AgentError::UnsupportedProvider`] for unknown provider names
/// (or for every name when built without the `openai` feature) and
/// [`AgentError::ApiKeyMissing`] for `openai` without a key.
#[cfg(feature = "openai")]
pub fn create_provider(settings: &Settings) -> std::result::Result<Arc<dyn LlmProvider>, AgentError> {
    match settings.provider.as_str() {
        "ollama" => {
            let api_base = settings.base_url.clone().unwrap_or_else(|| {
                format!("{}/v1", settings.ollama_base_url.trim_end_matches('/'))
            });
            Ok(Arc::new(OpenAiProvider::ollama(&api_base)))
        }
        "openai" => {
            let api_key = settings
                .api_key
                .as_deref()
                .filter(|k| !k.trim().is_empty())
                .ok_or(AgentError::ApiKeyMissing)?;
            Ok(Arc::new(OpenAiProvider::new(
                api_key,
                settings.base_url.as_deref(),
            )))
        }
        other => Err(AgentError::UnsupportedProvider {
            name: other.to_string(),
        }),
    }
}

/// Creates an [`LlmProvider`] based on the configured provider name.
///
/// # Errors
///
/// Always returns [`AgentError::UnsupportedProvider`]: no provider is
/// compiled in without the `openai` feature.
#[cfg(not(feature = "openai"))]
pub fn create_provider(settings: &Settings) -> std::result::Result<Arc<dyn LlmProvider>, AgentError> {
    Err(AgentError::UnsupportedProvider {
        name: settings.provider.clone(),
    })
}

/// Builds a [`ReasoningAgent`] from settings.
///
/// The local retriever is wired when `local_retrieval` is on; the web
/// searcher when a Tavily key is present. A missing source is logged and
/// the loop simply skips that step.
///
/// # Errors
///
/// Returns an error if the LLM provider cannot be created.
pub fn build_agent(settings: &Settings) -> Result<ReasoningAgent> {
    let prompts = PromptSet::load(settings.prompt_dir.as_deref());
    let provider = create_provider(settings)?;
    let synthesizer = LlmSynthesizer::new(
        provider,
        AnswerAgent::new(settings, prompts.system.clone()),
    );

    let mut builder = ReasoningAgent::builder()
        .synthesizer(Arc::new(synthesizer))
        .policy(settings.routing_policy())
        .context_limits(settings.context_limits())
        .prompts(prompts)
        .max_iterations(settings.max_iterations)
        .timeouts(AdapterTimeouts {
            retriever: Some(settings.source_timeout),
            searcher: Some(settings.source_timeout),
            synthesizer: Some(settings.synthesis_timeout),
        });

    if settings.local_retrieval {
        let embedder = OllamaEmbedder::new(&settings.ollama_base_url, &settings.embedding_model);
        let retriever = QdrantRetriever::new(
            QdrantConfig {
                url: settings.qdrant_url.clone(),
                api_key: settings.qdrant_api_key.clone(),
                collection: settings.qdrant_collection.clone(),
                vector_name: settings.qdrant_vector_name.clone(),
                top_k: settings.retrieval_top_k,
            },
            Arc::new(embedder),
        );
        info!(collection = %settings.qdrant_collection, "local retrieval enabled");
        builder = builder.retriever(Arc::new(retriever));
    } else {
        info!("local retrieval disabled");
    }

    match settings.tavily_api_key.as_deref() {
        Some(key) if settings.web_search_enabled() => {
            let searcher = TavilySearcher::new(key, settings.tavily_max_results)?;
            info!(max_results = settings.tavily_max_results, "web search enabled");
            builder = builder.searcher(Arc::new(searcher));
        }
        _ => warn!("TAVILY_API_KEY not set, web search disabled"),
    }

    Ok(builder.build())
}
