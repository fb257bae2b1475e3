//! Capability traits consumed by the reasoning loop.
//!
//! The orchestrator only knows these seams: two evidence sources and one
//! answer synthesizer, each a fallible async call. The [`Agent`] trait sits
//! one level down and describes an LLM role (system prompt, model,
//! sampling) that a synthesizer can be built from.

use async_trait::async_trait;

use super::message::{ChatRequest, ChatResponse, TokenUsage, system_message, user_message};
use super::provider::LlmProvider;
use crate::error::{AgentError, SourceError};

/// Local knowledge lookup (vector store, document index, ...).
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Returns document snippets for `query`, most relevant first.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the store cannot be reached or answers
    /// with something undecodable. The orchestrator treats that as an
    /// empty result.
    async fn retrieve(&self, query: &str) -> Result<Vec<String>, SourceError>;
}

/// Live web search.
#[async_trait]
pub trait Searcher: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Returns result snippets for `query`, in the engine's ranking order.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] on transport or decoding failures. The
    /// orchestrator treats that as an empty result.
    async fn search(&self, query: &str) -> Result<Vec<String>, SourceError>;
}

/// Produces the final answer from an assembled prompt.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Generates text for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] when the model call fails. The orchestrator
    /// substitutes a fixed apology rather than failing the run.
    async fn generate(&self, prompt: &str) -> Result<String, AgentError>;
}

/// Response from an agent execution.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    /// The agent's text output.
    pub content: String,
    /// Token usage for this call.
    pub usage: TokenUsage,
    /// Why the model stopped generating (e.g. `"stop"`, `"length"`).
    pub finish_reason: Option<String>,
}

/// An LLM role with a fixed system prompt and sampling configuration.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Agent name for logging and identification.
    fn name(&self) -> &'static str;

    /// Model identifier to use for this agent.
    fn model(&self) -> &str;

    /// System prompt that defines the agent's role and behavior.
    fn system_prompt(&self) -> &str;

    /// Sampling temperature (0.0 = deterministic, higher = more creative).
    fn temperature(&self) -> f32 {
        0.0
    }

    /// Maximum tokens for the response.
    fn max_tokens(&self) -> u32 {
        2048
    }

    /// Executes the agent with the given user message.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures.
    async fn execute(
        &self,
        provider: &dyn LlmProvider,
        user_msg: &str,
    ) -> Result<AgentResponse, AgentError> {
        let request = ChatRequest {
            model: self.model().to_string(),
            messages: vec![system_message(self.system_prompt()), user_message(user_msg)],
            temperature: Some(self.temperature()),
            max_tokens: Some(self.max_tokens()),
        };

        let response: ChatResponse = provider.chat(&request).await?;

        Ok(AgentResponse {
            content: response.content,
            usage: response.usage,
            finish_reason: response.finish_reason,
        })
    }
}
