//! MCP server implementation for Aequitas.
//!
//! Exposes [`ReasoningAgent::run`] as the `ask` tool.

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use tracing::debug;

use crate::agent::ReasoningAgent;
use crate::error::AgentError;

use super::params::AskParams;

/// Aequitas MCP server.
///
/// Cheap to clone: every clone shares the same agent.
#[derive(Clone)]
pub struct AequitasMcpServer {
    tool_router: ToolRouter<Self>,
    agent: Arc<ReasoningAgent>,
}

#[tool_router]
impl AequitasMcpServer {
    /// Answer a question from the local knowledge base and web search.
    #[tool(
        name = "ask",
        description = "Answer a question with the Aequitas reasoning agent. Routes the query to the local financial knowledge base, live web search, or both, then synthesizes an answer with a language model. Returns JSON with the answer, the evidence gathered, and the number of iterations."
    )]
    async fn ask(
        &self,
        Parameters(params): Parameters<AskParams>,
    ) -> Result<CallToolResult, McpError> {
        let max_iterations = params
            .max_iterations
            .unwrap_or_else(|| self.agent.default_max_iterations());
        debug!(max_iterations, "mcp ask");

        let state = self
            .agent
            .run(&params.query, max_iterations)
            .await
            .map_err(|e| match e {
                AgentError::InvalidQuery { .. } | AgentError::InvalidBudget { .. } => {
                    McpError::invalid_params(e.to_string(), None)
                }
                other => McpError::internal_error(format!("Reasoning run failed: {other}"), None),
            })?;

        let json = serde_json::to_string_pretty(&state)
            .map_err(|e| McpError::internal_error(format!("Serialization error: {e}"), None))?;

        Ok(CallToolResult::success(vec![Content::text(json)]))
    }
}

#[tool_handler]
impl ServerHandler for AequitasMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "aequitas-rs".to_string(),
                title: Some("Aequitas MCP Server".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Aequitas: financial reasoning agent combining a local knowledge base with \
                 live web search. Use the `ask` tool with a natural-language question."
                    .to_string(),
            ),
        }
    }
}

impl AequitasMcpServer {
    /// Creates a new MCP server around `agent`.
    #[must_use]
    pub fn new(agent: Arc<ReasoningAgent>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            agent,
        }
    }

    /// The agent answering `ask` calls.
    #[must_use]
    pub fn agent(&self) -> &ReasoningAgent {
        &self.agent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Synthesizer;
    use async_trait::async_trait;

    struct Fixed;

    #[async_trait]
    impl Synthesizer for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn generate(&self, _prompt: &str) -> Result<String, AgentError> {
            Ok("Spread your risk.".to_string())
        }
    }

    fn server() -> AequitasMcpServer {
        AequitasMcpServer::new(Arc::new(
            ReasoningAgent::builder()
                .synthesizer(Arc::new(Fixed))
                .build(),
        ))
    }

    #[tokio::test]
    async fn test_ask_returns_state_json() {
        let result = server()
            .ask(Parameters(AskParams {
                query: "What is diversification?".to_string(),
                max_iterations: None,
            }))
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(result.is_error, Some(false));
        let body = serde_json::to_string(&result).unwrap_or_default();
        assert!(body.contains("Spread your risk."));
    }

    #[tokio::test]
    async fn test_ask_rejects_zero_budget() {
        let result = server()
            .ask(Parameters(AskParams {
                query: "What is a bond?".to_string(),
                max_iterations: Some(0),
            }))
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_server_info() {
        let info = server().get_info();
        assert_eq!(info.server_info.name, "aequitas-rs");
        assert!(info.capabilities.tools.is_some());
    }
}
