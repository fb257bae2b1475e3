//! Error types for Aequitas.
//!
//! Each layer owns its error enum: [`AgentError`] for the reasoning loop and
//! the language model, [`SourceError`] for evidence sources, [`ConfigError`]
//! for settings resolution, and [`CommandError`] for the CLI. They all
//! convert into the top-level [`Error`].

use std::time::Duration;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Reasoning loop or language model failure.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Evidence source failure.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Invalid or incomplete configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// CLI command failure.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the reasoning loop and the answer synthesizer.
///
/// Only [`AgentError::NoSynthesizer`], [`AgentError::InvalidQuery`],
/// [`AgentError::InvalidBudget`] and [`AgentError::Cancelled`] ever escape
/// a run. Everything else is recovered inside the loop.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The agent was built without an answer synthesizer.
    #[error("no synthesizer configured: the agent cannot produce an answer")]
    NoSynthesizer,

    /// The query was rejected before the run started.
    #[error("invalid query: {message}")]
    InvalidQuery {
        /// Why the query was rejected.
        message: String,
    },

    /// `max_iterations` must be at least 1.
    #[error("invalid iteration budget: {max_iterations} (must be at least 1)")]
    InvalidBudget {
        /// The rejected budget.
        max_iterations: usize,
    },

    /// The run was cancelled between dispatches.
    #[error("run cancelled after {iteration} iteration(s)")]
    Cancelled {
        /// Completed policy evaluations at the time of cancellation.
        iteration: usize,
    },

    /// No API key was available for a provider that needs one.
    #[error("API key missing: set OPENAI_API_KEY or choose the ollama provider")]
    ApiKeyMissing,

    /// Provider name not recognized.
    #[error("unsupported LLM provider: {name}")]
    UnsupportedProvider {
        /// The unknown provider name.
        name: String,
    },

    /// LLM API request failed.
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Provider error message.
        message: String,
        /// HTTP status, when known.
        status: Option<u16>,
    },

    /// The model returned something unusable.
    #[error("failed to parse model response: {message}")]
    ResponseParse {
        /// What was wrong with the response.
        message: String,
    },

    /// The async runtime for a blocking run could not be created.
    #[error("failed to start async runtime: {message}")]
    Runtime {
        /// Underlying I/O error message.
        message: String,
    },

    /// The synthesizer did not answer within its deadline.
    #[error("synthesis timed out after {elapsed:?}")]
    Timeout {
        /// Configured deadline.
        elapsed: Duration,
    },
}

/// Errors raised by evidence sources (local retrieval, web search, embeddings).
///
/// The reasoning loop treats every variant as "attempted, zero results".
#[derive(Debug, Error)]
pub enum SourceError {
    /// Transport-level failure.
    #[error("request failed: {message}")]
    Request {
        /// Underlying error message.
        message: String,
    },

    /// Non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Error message extracted from the body.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("invalid response: {message}")]
    InvalidResponse {
        /// Decoding failure description.
        message: String,
    },

    /// The configured vector collection does not exist.
    #[error("collection not found: {collection}")]
    CollectionNotFound {
        /// Collection name.
        collection: String,
    },

    /// The source rejected its configuration.
    #[error("source misconfigured: {message}")]
    Misconfigured {
        /// What is wrong.
        message: String,
    },

    /// The source did not answer within its deadline.
    #[error("source timed out after {elapsed:?}")]
    Timeout {
        /// Configured deadline.
        elapsed: Duration,
    },
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Self::HttpStatus {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else if err.is_decode() {
            Self::InvalidResponse {
                message: err.to_string(),
            }
        } else {
            Self::Request {
                message: err.to_string(),
            }
        }
    }
}

/// Settings resolution errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable or explicit value could not be parsed.
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        /// Setting or environment variable name.
        key: String,
        /// The offending value.
        value: String,
        /// Parse failure.
        reason: String,
    },
}

/// CLI command errors.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command could not complete.
    #[error("{0}")]
    ExecutionFailed(String),

    /// Output could not be rendered.
    #[error("output formatting failed: {0}")]
    OutputFormat(String),
}
