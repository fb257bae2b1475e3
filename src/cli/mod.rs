//! CLI layer for Aequitas.
//!
//! Provides the command-line interface using clap, with commands for
//! asking questions, chatting, and managing prompts and configuration.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
#[cfg(feature = "mcp")]
pub use parser::McpCommands;
pub use parser::{Cli, Commands};
