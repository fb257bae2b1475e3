//! # Aequitas
//!
//! A reasoning agent that answers questions by combining a local semantic
//! knowledge base with live web search.
//!
//! Each query runs through a small state machine: a routing policy decides
//! whether to consult local documents, search the web, or answer; evidence
//! accumulates in an [`AgentState`]; a bounded context is assembled from it
//! and handed to a language model. Source failures degrade to "no results"
//! and a failed model call degrades to a fixed apology, so a run always ends
//! with an answer.
//!
//! ## Quick start
//!
//! ```no_run
//! use aequitas_rs::{Settings, agent::build_agent};
//!
//! # async fn demo() -> aequitas_rs::Result<()> {
//! let settings = Settings::from_env()?;
//! let agent = build_agent(&settings)?;
//! let state = agent.run("What is diversification?", 5).await?;
//! assert!(state.answer.is_some());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`core`]: run state
//! - [`agent`]: routing policy, context assembly, reasoning loop, LLM plumbing
//! - [`sources`]: Qdrant retrieval, Tavily search, Ollama embeddings
//! - [`config`]: settings resolution
//! - [`cli`]: command-line interface
//! - [`error`]: error types

pub mod agent;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
#[cfg(feature = "mcp")]
pub mod mcp;
pub mod sources;

pub use agent::{
    AdapterTimeouts, ContextAssembler, ContextLimits, ReasoningAgent, Retriever, RoutingPolicy,
    Searcher, Synthesizer,
};
pub use config::Settings;
pub use crate::core::{Action, AgentState, EvidenceEntry, SourceKind};
pub use error::{AgentError, CommandError, ConfigError, Error, Result, SourceError};
