//! Reasoning loop that routes a query between local retrieval, web search
//! and answer synthesis.
//!
//! Coordinates one run: validate → repeat {policy → dispatch → mutate state}
//! until the synthesizer has produced the answer.
//!
//! ```text
//! query → AgentState
//!   ├── RoutingPolicy::decide (iteration += 1, budget check)
//!   ├── Retrieve  → Retriever  → retrieved_docs
//!   ├── SearchWeb → Searcher   → web_results
//!   └── Generate  → ContextAssembler → Synthesizer → answer (terminal)
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, Stream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::context::{ContextAssembler, ContextLimits, truncate};
use super::policy::RoutingPolicy;
use super::prompt::PromptSet;
use super::traits::{Retriever, Searcher, Synthesizer};
use crate::core::{Action, AgentState, SourceKind};
use crate::error::{AgentError, SourceError};

/// Answer recorded when the synthesizer fails or times out.
pub const DEGRADED_ANSWER: &str =
    "I apologize, but I encountered an error while generating the response. Please try again.";

/// Iteration budget used by [`ReasoningAgent::run_default`].
pub const DEFAULT_MAX_ITERATIONS: usize = 5;

/// Longest accepted query, in bytes.
pub const MAX_QUERY_LEN: usize = 10_000;

/// Optional deadline per adapter kind. `None` waits indefinitely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdapterTimeouts {
    /// Deadline for [`Retriever::retrieve`].
    pub retriever: Option<Duration>,
    /// Deadline for [`Searcher::search`].
    pub searcher: Option<Duration>,
    /// Deadline for [`Synthesizer::generate`].
    pub synthesizer: Option<Duration>,
}

/// Hybrid local/web reasoning agent.
///
/// Holds no per-run state: share it behind an `Arc` and call [`run`]
/// concurrently for independent queries.
///
/// [`run`]: ReasoningAgent::run
pub struct ReasoningAgent {
    retriever: Option<Arc<dyn Retriever>>,
    searcher: Option<Arc<dyn Searcher>>,
    synthesizer: Option<Arc<dyn Synthesizer>>,
    policy: RoutingPolicy,
    assembler: ContextAssembler,
    prompts: PromptSet,
    timeouts: AdapterTimeouts,
    default_max_iterations: usize,
}

impl ReasoningAgent {
    /// Creates a builder with no adapters and default policy, limits and prompts.
    #[must_use]
    pub fn builder() -> ReasoningAgentBuilder {
        ReasoningAgentBuilder::default()
    }

    /// Routing policy in use.
    #[must_use]
    pub const fn policy(&self) -> &RoutingPolicy {
        &self.policy
    }

    /// Budget used when the caller does not supply one.
    #[must_use]
    pub const fn default_max_iterations(&self) -> usize {
        self.default_max_iterations
    }

    /// Runs `query` with the agent's default budget.
    ///
    /// # Errors
    ///
    /// See [`ReasoningAgent::run`].
    pub async fn run_default(&self, query: &str) -> Result<AgentState, AgentError> {
        self.run(query, self.default_max_iterations).await
    }

    /// Runs `query` to completion and returns the final state.
    ///
    /// Source and synthesizer failures are absorbed into the state; the
    /// returned state always carries an answer.
    ///
    /// # Errors
    ///
    /// - [`AgentError::NoSynthesizer`] if no synthesizer was configured
    /// - [`AgentError::InvalidQuery`] if `query` is blank or too long
    /// - [`AgentError::InvalidBudget`] if `max_iterations` is zero
    pub async fn run(&self, query: &str, max_iterations: usize) -> Result<AgentState, AgentError> {
        self.run_with_cancel(query, max_iterations, &CancellationToken::new())
            .await
    }

    /// Like [`ReasoningAgent::run`], checking `cancel` before every dispatch.
    ///
    /// An adapter call already in flight is allowed to finish.
    ///
    /// # Errors
    ///
    /// As [`ReasoningAgent::run`], plus [`AgentError::Cancelled`] once the
    /// token fires.
    pub async fn run_with_cancel(
        &self,
        query: &str,
        max_iterations: usize,
        cancel: &CancellationToken,
    ) -> Result<AgentState, AgentError> {
        let mut state = self.begin(query, max_iterations)?;

        loop {
            if cancel.is_cancelled() {
                info!(iteration = state.iteration, "reasoning run cancelled");
                return Err(AgentError::Cancelled {
                    iteration: state.iteration,
                });
            }

            self.step(&mut state).await;

            if state.is_terminated() {
                info!(
                    iterations = state.iteration,
                    local = state.retrieved_count(),
                    web = state.web_count(),
                    "reasoning run complete"
                );
                return Ok(state);
            }
        }
    }

    /// Synchronous wrapper around [`ReasoningAgent::run`].
    ///
    /// Builds a current-thread runtime for the duration of the call, so it
    /// must not be called from inside an async context.
    ///
    /// # Errors
    ///
    /// As [`ReasoningAgent::run`], plus [`AgentError::Runtime`] if the
    /// runtime cannot be created.
    pub fn run_blocking(&self, query: &str, max_iterations: usize) -> Result<AgentState, AgentError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| AgentError::Runtime {
                message: e.to_string(),
            })?;
        runtime.block_on(self.run(query, max_iterations))
    }

    /// Streams the state after every dispatch.
    ///
    /// The last item carries the answer. A validation failure is yielded as
    /// the only item.
    pub fn stream<'a>(
        &'a self,
        query: &'a str,
        max_iterations: usize,
    ) -> impl Stream<Item = Result<AgentState, AgentError>> + 'a {
        self.stream_with_cancel(query, max_iterations, CancellationToken::new())
    }

    /// Like [`stream`](Self::stream), checking `cancel` before each step.
    ///
    /// Once cancelled, the stream yields `Cancelled` and ends.
    pub fn stream_with_cancel<'a>(
        &'a self,
        query: &'a str,
        max_iterations: usize,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<AgentState, AgentError>> + 'a {
        stream::unfold(Cursor::Start, move |cursor| {
            let cancel = cancel.clone();
            async move {
                let mut state = match cursor {
                    Cursor::Done => return None,
                    Cursor::Start => match self.begin(query, max_iterations) {
                        Ok(state) => state,
                        Err(e) => return Some((Err(e), Cursor::Done)),
                    },
                    Cursor::Running(state) => *state,
                };

                if cancel.is_cancelled() {
                    info!(iteration = state.iteration, "reasoning stream cancelled");
                    let err = AgentError::Cancelled {
                        iteration: state.iteration,
                    };
                    return Some((Err(err), Cursor::Done));
                }

                self.step(&mut state).await;

                let next = if state.is_terminated() {
                    Cursor::Done
                } else {
                    Cursor::Running(Box::new(state.clone()))
                };
                Some((Ok(state), next))
            }
        })
    }

    /// Performs one policy evaluation and its dispatch.
    ///
    /// Returns the action actually dispatched, which differs from the
    /// policy's choice when the budget is exhausted or the adapter for the
    /// chosen action is absent. A terminated state is left untouched.
    pub async fn step(&self, state: &mut AgentState) -> Action {
        if state.is_terminated() {
            return Action::Generate;
        }

        let decided = self.policy.decide(state);
        state.iteration += 1;

        let mut action = decided;
        if action != Action::Generate && state.budget_exhausted() {
            debug!(
                iteration = state.iteration,
                max_iterations = state.max_iterations,
                decided = %decided,
                "iteration budget exhausted, forcing generate"
            );
            action = Action::Generate;
        }
        if !self.can_dispatch(action) {
            debug!(decided = %decided, "no adapter for action, substituting generate");
            action = Action::Generate;
        }

        state.next_action = Some(action);
        debug!(iteration = state.iteration, action = %action, "routing decision");

        match action {
            Action::Retrieve => self.retrieve(state).await,
            Action::SearchWeb => self.search(state).await,
            Action::Generate => self.generate(state).await,
        }

        action
    }

    fn begin(&self, query: &str, max_iterations: usize) -> Result<AgentState, AgentError> {
        if self.synthesizer.is_none() {
            return Err(AgentError::NoSynthesizer);
        }
        if query.trim().is_empty() {
            return Err(AgentError::InvalidQuery {
                message: "query cannot be empty".to_string(),
            });
        }
        if query.len() > MAX_QUERY_LEN {
            return Err(AgentError::InvalidQuery {
                message: format!(
                    "query exceeds maximum length ({} bytes, max {MAX_QUERY_LEN})",
                    query.len()
                ),
            });
        }
        if max_iterations == 0 {
            return Err(AgentError::InvalidBudget { max_iterations });
        }

        info!(query = %truncate(query, 80), max_iterations, "starting reasoning run");
        Ok(AgentState::new(query, max_iterations))
    }

    const fn can_dispatch(&self, action: Action) -> bool {
        match action {
            Action::Retrieve => self.retriever.is_some(),
            Action::SearchWeb => self.searcher.is_some(),
            Action::Generate => true,
        }
    }

    async fn retrieve(&self, state: &mut AgentState) {
        let docs = match self.retriever.as_deref() {
            Some(retriever) => recover(
                retriever.name(),
                source_deadline(self.timeouts.retriever, retriever.retrieve(&state.query)).await,
            ),
            None => Vec::new(),
        };

        let count = docs.len();
        state.retrieved_docs = Some(docs);
        state.record(
            SourceKind::LocalRetrieval,
            format!("Retrieved {count} documents from local database"),
        );
        debug!(count, "local retrieval complete");
    }

    async fn search(&self, state: &mut AgentState) {
        let results = match self.searcher.as_deref() {
            Some(searcher) => recover(
                searcher.name(),
                source_deadline(self.timeouts.searcher, searcher.search(&state.query)).await,
            ),
            None => Vec::new(),
        };

        let count = results.len();
        state.web_results = Some(results);
        state.record(
            SourceKind::WebSearch,
            format!("Retrieved {count} results from web search"),
        );
        debug!(count, "web search complete");
    }

    async fn generate(&self, state: &mut AgentState) {
        let context = self.assembler.assemble(
            state.retrieved_docs.as_deref(),
            state.web_results.as_deref(),
        );
        let prompt = self.prompts.answer_prompt(&state.query, &context);

        let answer = match self.synthesizer.as_deref() {
            Some(synthesizer) => {
                let result = match self.timeouts.synthesizer {
                    Some(limit) => tokio::time::timeout(limit, synthesizer.generate(&prompt))
                        .await
                        .unwrap_or_else(|_| Err(AgentError::Timeout { elapsed: limit })),
                    None => synthesizer.generate(&prompt).await,
                };
                result.unwrap_or_else(|e| {
                    warn!(synthesizer = synthesizer.name(), error = %e, "answer synthesis failed");
                    DEGRADED_ANSWER.to_string()
                })
            }
            None => DEGRADED_ANSWER.to_string(),
        };

        state.record(SourceKind::Synthesizer, answer.clone());
        state.answer = Some(answer);
    }
}

enum Cursor {
    Start,
    Running(Box<AgentState>),
    Done,
}

async fn source_deadline<F>(limit: Option<Duration>, call: F) -> Result<Vec<String>, SourceError>
where
    F: Future<Output = Result<Vec<String>, SourceError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or_else(|_| Err(SourceError::Timeout { elapsed: limit })),
        None => call.await,
    }
}

fn recover(source: &str, result: Result<Vec<String>, SourceError>) -> Vec<String> {
    result.unwrap_or_else(|e| {
        warn!(source, error = %e, "evidence source failed, continuing with no results");
        Vec::new()
    })
}

impl std::fmt::Debug for ReasoningAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReasoningAgent")
            .field("retriever", &self.retriever.as_ref().map(|r| r.name()))
            .field("searcher", &self.searcher.as_ref().map(|s| s.name()))
            .field("synthesizer", &self.synthesizer.as_ref().map(|s| s.name()))
            .field("policy", &self.policy)
            .field("assembler", &self.assembler)
            .field("timeouts", &self.timeouts)
            .field("default_max_iterations", &self.default_max_iterations)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ReasoningAgent`].
///
/// Every adapter is optional. A missing source makes the loop skip the
/// corresponding step; a missing synthesizer makes every run fail with
/// [`AgentError::NoSynthesizer`].
#[derive(Default)]
pub struct ReasoningAgentBuilder {
    retriever: Option<Arc<dyn Retriever>>,
    searcher: Option<Arc<dyn Searcher>>,
    synthesizer: Option<Arc<dyn Synthesizer>>,
    policy: Option<RoutingPolicy>,
    limits: Option<ContextLimits>,
    prompts: Option<PromptSet>,
    timeouts: AdapterTimeouts,
    max_iterations: Option<usize>,
}

impl ReasoningAgentBuilder {
    /// Sets the local retriever.
    #[must_use]
    pub fn retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Sets the web searcher.
    #[must_use]
    pub fn searcher(mut self, searcher: Arc<dyn Searcher>) -> Self {
        self.searcher = Some(searcher);
        self
    }

    /// Sets the answer synthesizer.
    #[must_use]
    pub fn synthesizer(mut self, synthesizer: Arc<dyn Synthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// Sets the routing policy.
    #[must_use]
    pub fn policy(mut self, policy: RoutingPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Sets the context limits.
    #[must_use]
    pub const fn context_limits(mut self, limits: ContextLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Sets the prompt set; only the answer template is used by the loop.
    #[must_use]
    pub fn prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = Some(prompts);
        self
    }

    /// Sets the per-adapter deadlines.
    #[must_use]
    pub const fn timeouts(mut self, timeouts: AdapterTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Sets the budget used by [`ReasoningAgent::run_default`].
    #[must_use]
    pub const fn max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = Some(n);
        self
    }

    /// Builds the agent.
    #[must_use]
    pub fn build(self) -> ReasoningAgent {
        ReasoningAgent {
            retriever: self.retriever,
            searcher: self.searcher,
            synthesizer: self.synthesizer,
            policy: self.policy.unwrap_or_default(),
            assembler: ContextAssembler::new(self.limits.unwrap_or_default()),
            prompts: self.prompts.unwrap_or_default(),
            timeouts: self.timeouts,
            default_max_iterations: self.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
        }
    }
}
