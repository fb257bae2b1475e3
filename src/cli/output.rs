//! Output formatting for CLI commands.

use std::fmt::Write as _;

use serde::Serialize;

use crate::core::{AgentState, SourceKind};
use crate::error::CommandError;

const RULE_WIDTH: usize = 60;

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
    /// One JSON document per line.
    Ndjson,
}

impl OutputFormat {
    /// Parses a format name; unknown names fall back to text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "ndjson" | "jsonl" => Self::Ndjson,
            _ => Self::Text,
        }
    }

    /// Serializes `value` for this format. Text falls back to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::OutputFormat`] if `value` cannot be serialized.
    pub fn to_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, CommandError> {
        let rendered = match self {
            Self::Ndjson => serde_json::to_string(value),
            Self::Text | Self::Json => serde_json::to_string_pretty(value),
        };
        rendered.map_err(|e| CommandError::OutputFormat(e.to_string()))
    }
}

/// Renders a finished run: the answer framed by rules, then source counts
/// and the iteration count.
#[must_use]
pub fn format_answer(state: &AgentState) -> String {
    let rule = "-".repeat(RULE_WIDTH);
    let mut output = String::new();
    let _ = writeln!(output, "{rule}");
    let _ = writeln!(
        output,
        "Answer:\n{}",
        state.answer.as_deref().unwrap_or("No answer generated")
    );
    let _ = writeln!(output, "{rule}");

    if state.retrieved_count() > 0 {
        let _ = writeln!(output, "Retrieved {} local documents", state.retrieved_count());
    }
    if state.web_count() > 0 {
        let _ = writeln!(output, "Retrieved {} web results", state.web_count());
    }
    let _ = writeln!(output, "Iterations: {}", state.iteration);
    output
}

/// One progress line for an intermediate state of a streamed run.
#[must_use]
pub fn format_progress(state: &AgentState) -> String {
    let action = state.next_action.map_or("none", |a| a.as_str());
    let detail = state
        .evidence_log
        .last()
        .map_or("", |entry| match entry.source_kind {
            SourceKind::Synthesizer => "answer ready",
            SourceKind::LocalRetrieval | SourceKind::WebSearch => entry.content.as_str(),
        });
    format!("[{}] {action}: {detail}", state.iteration)
}
