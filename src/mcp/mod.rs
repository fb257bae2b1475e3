//! MCP (Model Context Protocol) server for Aequitas.
//!
//! Exposes the reasoning agent as a single MCP tool so external agents can
//! delegate financial questions to it.
//!
//! # Feature Gate
//!
//! This module requires the `mcp` feature flag:
//! ```toml
//! [dependencies]
//! aequitas-rs = { version = "...", features = ["mcp"] }
//! ```
//!
//! # Architecture
//!
//! ```text
//! MCP Client
//!   ↓ ask(query, max_iterations?)
//! AequitasMcpServer
//!   ↓
//! ReasoningAgent::run()
//!   ├── Retrieve (Qdrant) / SearchWeb (Tavily)
//!   └── Generate (LLM)
//!   ↓
//! AgentState JSON → MCP Client
//! ```

pub mod params;
pub mod server;
pub mod transport;

pub use params::AskParams;
pub use server::AequitasMcpServer;
pub use transport::{serve_sse, serve_stdio};
