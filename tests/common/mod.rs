//! In-memory adapters shared by the integration tests.

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use aequitas_rs::{AgentError, Retriever, Searcher, SourceError, Synthesizer};
use async_trait::async_trait;

/// How a mock source answers.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Returns these snippets.
    Items(Vec<String>),
    /// Fails with a transport error.
    Fail,
    /// Never answers.
    Hang,
}

impl Behavior {
    pub fn items(items: &[&str]) -> Self {
        Self::Items(items.iter().map(ToString::to_string).collect())
    }

    async fn answer(&self) -> Result<Vec<String>, SourceError> {
        match self {
            Self::Items(items) => Ok(items.clone()),
            Self::Fail => Err(SourceError::Request {
                message: "connection refused".to_string(),
            }),
            Self::Hang => {
                std::future::pending::<()>().await;
                Ok(Vec::new())
            }
        }
    }
}

/// Retriever with scripted behavior and a call counter.
pub struct MockRetriever {
    behavior: Behavior,
    calls: AtomicUsize,
}

impl MockRetriever {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Retriever for MockRetriever {
    fn name(&self) -> &'static str {
        "mock-retriever"
    }

    async fn retrieve(&self, _query: &str) -> Result<Vec<String>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.behavior.answer().await
    }
}

/// Searcher with scripted behavior and a call counter.
pub struct MockSearcher {
    behavior: Behavior,
    calls: AtomicUsize,
}

impl MockSearcher {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Searcher for MockSearcher {
    fn name(&self) -> &'static str {
        "mock-searcher"
    }

    async fn search(&self, _query: &str) -> Result<Vec<String>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.behavior.answer().await
    }
}

/// How the mock synthesizer answers.
#[derive(Debug, Clone, Copy)]
pub enum SynthBehavior {
    Answer,
    Fail,
    Slow(Duration),
}

/// Synthesizer that records every prompt it receives.
pub struct MockSynthesizer {
    behavior: SynthBehavior,
    prompts: Mutex<Vec<String>>,
}

impl MockSynthesizer {
    pub fn new(behavior: SynthBehavior) -> Self {
        Self {
            behavior,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn answering() -> Self {
        Self::new(SynthBehavior::Answer)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Synthesizer for MockSynthesizer {
    fn name(&self) -> &'static str {
        "mock-synthesizer"
    }

    async fn generate(&self, prompt: &str) -> Result<String, AgentError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        match self.behavior {
            SynthBehavior::Answer => Ok("Synthesized answer.".to_string()),
            SynthBehavior::Fail => Err(AgentError::ApiRequest {
                message: "model offline".to_string(),
                status: Some(503),
            }),
            SynthBehavior::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok("Too late.".to_string())
            }
        }
    }
}
