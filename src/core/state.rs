//! Run state threaded through the reasoning loop.
//!
//! [`AgentState`] is the single mutable record of one query. Decision fields
//! (`retrieved_docs`, `web_results`) are kept apart from the audit trail
//! (`evidence_log`) so routing never depends on log contents.

use serde::{Deserialize, Serialize};

/// Step the routing policy can choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Consult the local vector store.
    Retrieve,
    /// Consult live web search.
    SearchWeb,
    /// Assemble context and synthesize the answer (terminal).
    Generate,
}

impl Action {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Retrieve => "retrieve",
            Self::SearchWeb => "search_web",
            Self::Generate => "generate",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Producer of an evidence log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Local semantic retrieval.
    LocalRetrieval,
    /// Web search.
    WebSearch,
    /// Answer synthesizer.
    Synthesizer,
}

impl SourceKind {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LocalRetrieval => "local_retrieval",
            Self::WebSearch => "web_search",
            Self::Synthesizer => "synthesizer",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the append-only evidence log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceEntry {
    /// Which step produced this entry.
    pub source_kind: SourceKind,
    /// Human-readable description (or the answer itself for synthesis).
    pub content: String,
}

/// State of a single reasoning run.
///
/// Created by [`AgentState::new`] with every optional field absent and
/// `iteration == 0`. The orchestrator mutates it in place; callers receive
/// it back once the run has terminated (or after every dispatch when
/// streaming).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentState {
    /// The original user question.
    pub query: String,
    /// Every message produced by a dispatched step, in causal order.
    pub evidence_log: Vec<EvidenceEntry>,
    /// Local retrieval results. `None` means retrieval was never attempted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieved_docs: Option<Vec<String>>,
    /// Web search results. `None` means search was never attempted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_results: Option<Vec<String>>,
    /// Decision cached between policy evaluation and dispatch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_action: Option<Action>,
    /// Final answer, set once by the terminal step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    /// Completed policy evaluations.
    pub iteration: usize,
    /// Policy evaluations allowed before synthesis is forced.
    pub max_iterations: usize,
}

impl AgentState {
    /// Creates the initial state for a query.
    #[must_use]
    pub fn new(query: impl Into<String>, max_iterations: usize) -> Self {
        Self {
            query: query.into(),
            evidence_log: Vec::new(),
            retrieved_docs: None,
            web_results: None,
            next_action: None,
            answer: None,
            iteration: 0,
            max_iterations,
        }
    }

    /// Returns `true` once local retrieval has been attempted.
    #[must_use]
    pub const fn retrieval_attempted(&self) -> bool {
        self.retrieved_docs.is_some()
    }

    /// Returns `true` once web search has been attempted.
    #[must_use]
    pub const fn search_attempted(&self) -> bool {
        self.web_results.is_some()
    }

    /// Returns `true` once the run has produced its answer.
    #[must_use]
    pub const fn is_terminated(&self) -> bool {
        self.answer.is_some()
    }

    /// Returns `true` when the iteration count has passed the budget.
    #[must_use]
    pub const fn budget_exhausted(&self) -> bool {
        self.iteration > self.max_iterations
    }

    /// Number of local documents retrieved (0 when not attempted).
    #[must_use]
    pub fn retrieved_count(&self) -> usize {
        self.retrieved_docs.as_ref().map_or(0, Vec::len)
    }

    /// Number of web results retrieved (0 when not attempted).
    #[must_use]
    pub fn web_count(&self) -> usize {
        self.web_results.as_ref().map_or(0, Vec::len)
    }

    /// Source kinds of the evidence log, i.e. the dispatch path so far.
    #[must_use]
    pub fn dispatch_path(&self) -> Vec<SourceKind> {
        self.evidence_log.iter().map(|e| e.source_kind).collect()
    }

    pub(crate) fn record(&mut self, source_kind: SourceKind, content: impl Into<String>) {
        self.evidence_log.push(EvidenceEntry {
            source_kind,
            content: content.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = AgentState::new("What is diversification?", 5);
        assert_eq!(state.query, "What is diversification?");
        assert_eq!(state.iteration, 0);
        assert_eq!(state.max_iterations, 5);
        assert!(state.evidence_log.is_empty());
        assert!(!state.retrieval_attempted());
        assert!(!state.search_attempted());
        assert!(state.next_action.is_none());
        assert!(!state.is_terminated());
    }

    #[test]
    fn test_attempted_but_empty_is_distinct_from_absent() {
        let mut state = AgentState::new("q", 5);
        state.retrieved_docs = Some(Vec::new());
        assert!(state.retrieval_attempted());
        assert_eq!(state.retrieved_count(), 0);
        assert!(!state.search_attempted());
    }

    #[test]
    fn test_budget_exhausted() {
        let mut state = AgentState::new("q", 1);
        state.iteration = 1;
        assert!(!state.budget_exhausted());
        state.iteration = 2;
        assert!(state.budget_exhausted());
    }

    #[test]
    fn test_serialization_omits_absent_fields() {
        let state = AgentState::new("q", 3);
        let json = serde_json::to_string(&state).unwrap_or_default();
        assert!(json.contains("\"query\":\"q\""));
        assert!(json.contains("\"iteration\":0"));
        assert!(!json.contains("retrieved_docs"));
        assert!(!json.contains("web_results"));
        assert!(!json.contains("answer"));
    }

    #[test]
    fn test_action_serialization() {
        let json = serde_json::to_string(&Action::SearchWeb).unwrap_or_default();
        assert_eq!(json, "\"search_web\"");
        assert_eq!(Action::Generate.to_string(), "generate");
        assert_eq!(SourceKind::LocalRetrieval.to_string(), "local_retrieval");
    }

    #[test]
    fn test_dispatch_path() {
        let mut state = AgentState::new("q", 5);
        state.record(SourceKind::WebSearch, "Retrieved 3 results from web search");
        state.record(SourceKind::Synthesizer, "answer");
        assert_eq!(
            state.dispatch_path(),
            vec![SourceKind::WebSearch, SourceKind::Synthesizer]
        );
    }
}
