//! Core domain types shared by the reasoning loop, the CLI, and the MCP
//! server.

pub mod state;

pub use state::{Action, AgentState, EvidenceEntry, SourceKind};
