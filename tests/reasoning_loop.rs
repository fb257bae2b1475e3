//! End-to-end behavior of the reasoning loop with in-memory adapters.

mod common;

use std::sync::Arc;
use std::time::Duration;

use aequitas_rs::agent::DEGRADED_ANSWER;
use aequitas_rs::agent::context::NO_CONTEXT;
use aequitas_rs::{
    Action, AdapterTimeouts, AgentError, ReasoningAgent, Retriever, RoutingPolicy, SourceError,
    SourceKind,
};
use async_trait::async_trait;
use common::{Behavior, MockRetriever, MockSearcher, MockSynthesizer, SynthBehavior};
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

const PLAIN_QUERY: &str = "What is diversification in investing?";
const RECENT_QUERY: &str = "What are the latest 2026 market trends?";

struct Wiring {
    retriever: Arc<MockRetriever>,
    searcher: Arc<MockSearcher>,
    synthesizer: Arc<MockSynthesizer>,
    agent: ReasoningAgent,
}

fn wire(retriever: Behavior, searcher: Behavior, synth: SynthBehavior) -> Wiring {
    wire_with(retriever, searcher, synth, AdapterTimeouts::default())
}

fn wire_with(
    retriever: Behavior,
    searcher: Behavior,
    synth: SynthBehavior,
    timeouts: AdapterTimeouts,
) -> Wiring {
    let retriever = Arc::new(MockRetriever::new(retriever));
    let searcher = Arc::new(MockSearcher::new(searcher));
    let synthesizer = Arc::new(MockSynthesizer::new(synth));
    let agent = ReasoningAgent::builder()
        .retriever(retriever.clone())
        .searcher(searcher.clone())
        .synthesizer(synthesizer.clone())
        .timeouts(timeouts)
        .build();
    Wiring {
        retriever,
        searcher,
        synthesizer,
        agent,
    }
}

#[tokio::test]
async fn plain_query_retrieves_then_generates() {
    let retriever = Arc::new(MockRetriever::new(Behavior::items(&[
        "Diversification spreads risk across assets.",
        "A diversified portfolio mixes stocks and bonds.",
    ])));
    let synthesizer = Arc::new(MockSynthesizer::answering());
    let agent = ReasoningAgent::builder()
        .retriever(retriever.clone())
        .synthesizer(synthesizer.clone())
        .build();

    let state = agent
        .run(PLAIN_QUERY, 5)
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(
        state.dispatch_path(),
        vec![SourceKind::LocalRetrieval, SourceKind::Synthesizer]
    );
    assert_eq!(state.retrieved_count(), 2);
    assert!(state.web_results.is_none());
    assert_eq!(state.answer.as_deref(), Some("Synthesized answer."));
    assert_eq!(state.iteration, 2);
    assert_eq!(state.next_action, Some(Action::Generate));
    assert_eq!(
        state.evidence_log[0].content,
        "Retrieved 2 documents from local database"
    );
    assert_eq!(state.evidence_log[1].content, "Synthesized answer.");
    assert_eq!(retriever.calls(), 1);

    let prompts = synthesizer.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("## Local Knowledge Base:\n1. Diversification spreads risk"));
    assert!(prompts[0].contains(PLAIN_QUERY));
    assert!(!prompts[0].contains("## Web Search Results:"));
}

#[tokio::test]
async fn recent_query_searches_web_and_skips_retrieval() {
    let w = wire(
        Behavior::items(&["irrelevant archive"]),
        Behavior::items(&["trend one", "trend two", "trend three"]),
        SynthBehavior::Answer,
    );

    let state = w
        .agent
        .run(RECENT_QUERY, 5)
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(
        state.dispatch_path(),
        vec![SourceKind::WebSearch, SourceKind::Synthesizer]
    );
    assert!(state.retrieved_docs.is_none());
    assert_eq!(state.web_count(), 3);
    assert_eq!(
        state.evidence_log[0].content,
        "Retrieved 3 results from web search"
    );
    assert_eq!(w.retriever.calls(), 0);
    assert_eq!(w.searcher.calls(), 1);
    assert!(w.synthesizer.prompts()[0].contains("## Web Search Results:\n1. trend one"));
}

#[tokio::test]
async fn failing_sources_still_produce_an_answer() {
    let w = wire(Behavior::Fail, Behavior::Fail, SynthBehavior::Answer);

    let state = w
        .agent
        .run(RECENT_QUERY, 5)
        .await
        .unwrap_or_else(|_| unreachable!());

    assert!(state.is_terminated());
    assert_eq!(state.web_results, Some(Vec::new()));
    assert!(state.retrieved_docs.is_none());
    assert_eq!(
        state.evidence_log[0].content,
        "Retrieved 0 results from web search"
    );
    assert!(w.synthesizer.prompts()[0].contains(NO_CONTEXT));
}

#[tokio::test]
async fn hanging_sources_time_out_and_degrade() {
    let timeouts = AdapterTimeouts {
        retriever: Some(Duration::from_millis(20)),
        searcher: Some(Duration::from_millis(20)),
        synthesizer: None,
    };
    let w = wire_with(Behavior::Hang, Behavior::Hang, SynthBehavior::Answer, timeouts);

    let recent = w
        .agent
        .run(RECENT_QUERY, 5)
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(recent.web_results, Some(Vec::new()));
    assert_eq!(recent.answer.as_deref(), Some("Synthesized answer."));

    let plain = w
        .agent
        .run(PLAIN_QUERY, 5)
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(plain.retrieved_docs, Some(Vec::new()));
    assert!(plain.web_results.is_none());
    assert!(plain.is_terminated());
}

#[tokio::test]
async fn synthesizer_failure_yields_degraded_answer() {
    let w = wire(
        Behavior::items(&["doc"]),
        Behavior::items(&[]),
        SynthBehavior::Fail,
    );

    let state = w
        .agent
        .run(PLAIN_QUERY, 5)
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(state.answer.as_deref(), Some(DEGRADED_ANSWER));
    assert_eq!(
        state.evidence_log.last().map(|e| e.content.as_str()),
        Some(DEGRADED_ANSWER)
    );
}

#[tokio::test]
async fn synthesizer_timeout_yields_degraded_answer() {
    let timeouts = AdapterTimeouts {
        synthesizer: Some(Duration::from_millis(20)),
        ..AdapterTimeouts::default()
    };
    let w = wire_with(
        Behavior::items(&["doc"]),
        Behavior::items(&[]),
        SynthBehavior::Slow(Duration::from_secs(5)),
        timeouts,
    );

    let state = w
        .agent
        .run(PLAIN_QUERY, 5)
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(state.answer.as_deref(), Some(DEGRADED_ANSWER));
}

/// Local-first bias: a query that is not recency-sensitive never reaches
/// web search, even when local retrieval comes back empty.
#[tokio::test]
async fn empty_local_results_do_not_fall_back_to_web() {
    let w = wire(
        Behavior::items(&[]),
        Behavior::items(&["web snippet"]),
        SynthBehavior::Answer,
    );

    let state = w
        .agent
        .run(PLAIN_QUERY, 5)
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(state.retrieved_docs, Some(Vec::new()));
    assert!(state.web_results.is_none());
    assert_eq!(w.searcher.calls(), 0);
    assert!(w.synthesizer.prompts()[0].contains(NO_CONTEXT));
}

#[tokio::test]
async fn missing_retriever_goes_straight_to_generate() {
    let synthesizer = Arc::new(MockSynthesizer::answering());
    let agent = ReasoningAgent::builder()
        .synthesizer(synthesizer.clone())
        .build();

    let state = agent
        .run(PLAIN_QUERY, 5)
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(state.dispatch_path(), vec![SourceKind::Synthesizer]);
    assert!(state.retrieved_docs.is_none());
    assert!(synthesizer.prompts()[0].contains(NO_CONTEXT));
}

#[tokio::test]
async fn no_synthesizer_fails_before_any_dispatch() {
    let retriever = Arc::new(MockRetriever::new(Behavior::items(&["doc"])));
    let agent = ReasoningAgent::builder().retriever(retriever.clone()).build();

    let result = agent.run(PLAIN_QUERY, 5).await;

    assert!(matches!(result, Err(AgentError::NoSynthesizer)));
    assert_eq!(retriever.calls(), 0);
}

#[tokio::test]
async fn custom_keywords_replace_defaults() {
    let w = wire(
        Behavior::items(&["doc"]),
        Behavior::items(&["web"]),
        SynthBehavior::Answer,
    );
    let agent = ReasoningAgent::builder()
        .retriever(w.retriever.clone())
        .searcher(w.searcher.clone())
        .synthesizer(w.synthesizer.clone())
        .policy(RoutingPolicy::new(["breaking"], 0))
        .build();

    let latest = agent
        .run("latest dividend policy", 5)
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(latest.dispatch_path()[0], SourceKind::LocalRetrieval);

    let breaking = agent
        .run("BREAKING: rate decision", 5)
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(breaking.dispatch_path()[0], SourceKind::WebSearch);
}

#[tokio::test]
async fn cancelled_token_stops_before_first_dispatch() {
    let w = wire(
        Behavior::items(&["doc"]),
        Behavior::items(&[]),
        SynthBehavior::Answer,
    );
    let token = CancellationToken::new();
    token.cancel();

    let result = w.agent.run_with_cancel(PLAIN_QUERY, 5, &token).await;

    assert!(matches!(result, Err(AgentError::Cancelled { iteration: 0 })));
    assert_eq!(w.retriever.calls(), 0);
    assert!(w.synthesizer.prompts().is_empty());
}

struct CancellingRetriever {
    token: CancellationToken,
}

#[async_trait]
impl Retriever for CancellingRetriever {
    fn name(&self) -> &'static str {
        "cancelling"
    }

    async fn retrieve(&self, _query: &str) -> Result<Vec<String>, SourceError> {
        self.token.cancel();
        Ok(vec!["finished anyway".to_string()])
    }
}

#[tokio::test]
async fn cancellation_lets_in_flight_call_finish() {
    let token = CancellationToken::new();
    let synthesizer = Arc::new(MockSynthesizer::answering());
    let agent = ReasoningAgent::builder()
        .retriever(Arc::new(CancellingRetriever {
            token: token.clone(),
        }))
        .synthesizer(synthesizer.clone())
        .build();

    let result = agent.run_with_cancel(PLAIN_QUERY, 5, &token).await;

    assert!(matches!(result, Err(AgentError::Cancelled { iteration: 1 })));
    assert!(synthesizer.prompts().is_empty());
}

#[tokio::test]
async fn stream_yields_state_after_each_dispatch() {
    let w = wire(
        Behavior::items(&["doc one", "doc two"]),
        Behavior::items(&[]),
        SynthBehavior::Answer,
    );

    let states: Vec<_> = w.agent.stream(PLAIN_QUERY, 5).collect().await;

    assert_eq!(states.len(), 2);
    let first = states[0].as_ref().unwrap_or_else(|_| unreachable!());
    assert_eq!(first.iteration, 1);
    assert_eq!(first.retrieved_count(), 2);
    assert!(first.answer.is_none());

    let last = states[1].as_ref().unwrap_or_else(|_| unreachable!());
    assert_eq!(last.answer.as_deref(), Some("Synthesized answer."));
    assert_eq!(last.evidence_log.len(), 2);
}

#[tokio::test]
async fn stream_and_run_agree() {
    let w = wire(
        Behavior::items(&[]),
        Behavior::items(&["a", "b"]),
        SynthBehavior::Answer,
    );

    let ran = w
        .agent
        .run(RECENT_QUERY, 5)
        .await
        .unwrap_or_else(|_| unreachable!());
    let streamed: Vec<_> = w.agent.stream(RECENT_QUERY, 5).collect().await;
    let last = streamed
        .last()
        .and_then(|r| r.as_ref().ok())
        .unwrap_or_else(|| unreachable!());

    assert_eq!(&ran, last);
}

#[tokio::test]
async fn stream_reports_validation_error_once() {
    let w = wire(
        Behavior::items(&[]),
        Behavior::items(&[]),
        SynthBehavior::Answer,
    );

    let items: Vec<_> = w.agent.stream("", 5).collect().await;

    assert_eq!(items.len(), 1);
    assert!(matches!(items[0], Err(AgentError::InvalidQuery { .. })));
}

#[tokio::test]
async fn independent_runs_share_one_agent() {
    let w = wire(
        Behavior::items(&["doc"]),
        Behavior::items(&["web"]),
        SynthBehavior::Answer,
    );
    let agent = Arc::new(w.agent);

    let mut handles = Vec::new();
    for i in 0..8 {
        let agent = Arc::clone(&agent);
        let query = if i % 2 == 0 { PLAIN_QUERY } else { RECENT_QUERY };
        handles.push(tokio::spawn(async move { agent.run(query, 5).await }));
    }

    for handle in handles {
        let state = handle
            .await
            .unwrap_or_else(|_| unreachable!())
            .unwrap_or_else(|_| unreachable!());
        assert!(state.is_terminated());
        assert_eq!(state.iteration, 2);
    }
    assert_eq!(w.retriever.calls(), 4);
    assert_eq!(w.searcher.calls(), 4);
}

#[tokio::test]
async fn final_state_serializes_with_expected_fields() {
    let w = wire(
        Behavior::items(&["doc"]),
        Behavior::items(&[]),
        SynthBehavior::Answer,
    );

    let state = w
        .agent
        .run(PLAIN_QUERY, 5)
        .await
        .unwrap_or_else(|_| unreachable!());
    let json = serde_json::to_value(&state).unwrap_or_default();

    assert_eq!(json["query"], PLAIN_QUERY);
    assert_eq!(json["answer"], "Synthesized answer.");
    assert_eq!(json["retrieved_docs"][0], "doc");
    assert!(json.get("web_results").is_none());
    assert_eq!(json["iteration"], 2);
    assert_eq!(json["evidence_log"][0]["source_kind"], "local_retrieval");
}
