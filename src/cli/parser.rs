//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Aequitas: hybrid local/web reasoning agent for financial questions.
///
/// Answers each query from a local Qdrant knowledge base, live Tavily web
/// search, or both, and synthesizes the result with a language model.
#[derive(Parser, Debug)]
#[command(name = "aequitas-rs")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (debug logging on stderr).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json, ndjson).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a single query.
    #[command(after_help = r#"Examples:
  aequitas-rs ask "What is diversification?"
  aequitas-rs ask "Latest 2026 market trends" --stream
  aequitas-rs ask "Explain bond duration" --no-web -n 3
  aequitas-rs --format json ask "What is a bond?" | jq '.answer'
"#)]
    Ask {
        /// The question to answer.
        query: String,

        /// Iteration budget for this run (defaults to MAX_ITERATIONS).
        #[arg(short = 'n', long)]
        max_iterations: Option<usize>,

        /// Disable web search for this run.
        #[arg(long)]
        no_web: bool,

        /// Disable local retrieval for this run.
        #[arg(long)]
        no_local: bool,

        /// Print a progress line after every step.
        #[arg(long)]
        stream: bool,
    },

    /// Interactive session; type `exit`, `quit` or `q` to leave.
    Chat {
        /// Iteration budget per query (defaults to MAX_ITERATIONS).
        #[arg(short = 'n', long)]
        max_iterations: Option<usize>,

        /// Disable web search.
        #[arg(long)]
        no_web: bool,

        /// Disable local retrieval.
        #[arg(long)]
        no_local: bool,
    },

    /// Write the default prompt templates for customization.
    ///
    /// Existing files are never overwritten.
    #[command(after_help = r#"Examples:
  aequitas-rs init-prompts                      # ~/.config/aequitas-rs/prompts
  aequitas-rs init-prompts --dir ./prompts
  AEQUITAS_PROMPT_DIR=./prompts aequitas-rs ask "..."
"#)]
    InitPrompts {
        /// Target directory.
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Show the resolved configuration (secrets redacted).
    Config,

    /// MCP server operations.
    #[cfg(feature = "mcp")]
    #[command(subcommand)]
    Mcp(McpCommands),
}

/// MCP server subcommands.
#[cfg(feature = "mcp")]
#[derive(Subcommand, Debug)]
pub enum McpCommands {
    /// Start MCP server with stdio transport.
    ///
    /// Reads JSON-RPC messages from stdin, writes responses to stdout.
    #[command(after_help = r#"Examples:
  aequitas-rs mcp stdio
  TAVILY_API_KEY=tvly-... aequitas-rs mcp stdio
"#)]
    Stdio,

    /// Start MCP server with SSE/HTTP transport.
    ///
    /// Listens for incoming HTTP connections using streamable HTTP transport.
    #[command(after_help = r#"Examples:
  aequitas-rs mcp sse                            # Listen on 127.0.0.1:3000
  aequitas-rs mcp sse --host 0.0.0.0 --port 8080
"#)]
    Sse {
        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to.
        #[arg(long, default_value = "3000")]
        port: u16,
    },
}
