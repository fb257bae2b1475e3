//! Reasoning agent for Aequitas.
//!
//! Routes each query between a local knowledge base and live web search
//! before synthesizing an answer with a language model.
//!
//! # Architecture
//!
//! ```text
//! User query → ReasoningAgent
//!   ├── RoutingPolicy (recency keywords, upcoming years)
//!   ├── Retriever  (Qdrant + Ollama embeddings)
//!   ├── Searcher   (Tavily)
//!   ├── ContextAssembler (bounded context from both sources)
//!   └── Synthesizer → LlmSynthesizer → AnswerAgent → LlmProvider
//! ```
//!
//! The loop only depends on the [`Retriever`], [`Searcher`] and
//! [`Synthesizer`] traits; any of them can be replaced.

pub mod client;
pub mod context;
pub mod message;
pub mod orchestrator;
pub mod policy;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod synthesizer;
pub mod traits;

// Re-export key types
pub use client::{build_agent, create_provider};
pub use context::{ContextAssembler, ContextLimits, NO_CONTEXT};
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
pub use orchestrator::{AdapterTimeouts, DEGRADED_ANSWER, ReasoningAgent, ReasoningAgentBuilder};
pub use policy::RoutingPolicy;
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use synthesizer::{AnswerAgent, LlmSynthesizer};
pub use traits::{Agent, AgentResponse, Retriever, Searcher, Synthesizer};
