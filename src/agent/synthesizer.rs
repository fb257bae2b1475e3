//! Answer synthesis on top of an [`LlmProvider`].
//!
//! [`AnswerAgent`] describes the role (system prompt, model, sampling);
//! [`LlmSynthesizer`] runs it on a provider and exposes it to the reasoning
//! loop as a [`Synthesizer`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::provider::LlmProvider;
use super::traits::{Agent, Synthesizer};
use crate::config::Settings;
use crate::error::AgentError;

/// Agent that writes the final answer from the assembled context.
#[derive(Debug, Clone)]
pub struct AnswerAgent {
    model: String,
    temperature: f32,
    max_tokens: u32,
    system_prompt: String,
}

impl AnswerAgent {
    /// Creates an answer agent from settings and a system prompt.
    #[must_use]
    pub fn new(settings: &Settings, system_prompt: String) -> Self {
        Self {
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            system_prompt,
        }
    }
}

#[async_trait]
impl Agent for AnswerAgent {
    fn name(&self) -> &'static str {
        "answer"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn temperature(&self) -> f32 {
        self.temperature
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

/// [`Synthesizer`] that runs an [`AnswerAgent`] on a provider.
pub struct LlmSynthesizer {
    provider: Arc<dyn LlmProvider>,
    agent: AnswerAgent,
}

impl LlmSynthesizer {
    /// Creates a synthesizer.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, agent: AnswerAgent) -> Self {
        Self { provider, agent }
    }
}

impl std::fmt::Debug for LlmSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSynthesizer")
            .field("provider", &self.provider.name())
            .field("agent", &self.agent)
            .finish()
    }
}

#[async_trait]
impl Synthesizer for LlmSynthesizer {
    fn name(&self) -> &'static str {
        self.provider.name()
    }

    async fn generate(&self, prompt: &str) -> Result<String, AgentError> {
        let response = self.agent.execute(&*self.provider, prompt).await?;

        debug!(
            model = self.agent.model(),
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            finish_reason = response.finish_reason.as_deref().unwrap_or("unknown"),
            "answer generated"
        );

        if response.content.trim().is_empty() {
            return Err(AgentError::ResponseParse {
                message: "model returned an empty answer".to_string(),
            });
        }

        Ok(response.content)
    }
}
