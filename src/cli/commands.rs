//! CLI command implementations.
//!
//! Contains the business logic for each CLI command. Commands return the
//! text to print; interactive and streaming commands additionally write
//! progress to the supplied writer as it happens.

use std::fmt::Write as FmtWrite;
use std::io::{self, Write as IoWrite};
use std::path::Path;
use std::pin::pin;
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::runtime::Runtime;
use tokio::sync::{Notify, mpsc};
use tokio_util::sync::CancellationToken;

use crate::agent::{PromptSet, ReasoningAgent, build_agent};
use crate::cli::output::{OutputFormat, format_answer, format_progress};
#[cfg(feature = "mcp")]
use crate::cli::parser::McpCommands;
use crate::cli::parser::{Cli, Commands};
use crate::config::Settings;
use crate::core::AgentState;
use crate::error::{AgentError, CommandError, Error, Result};

/// Words that end an interactive session.
const EXIT_WORDS: [&str; 3] = ["exit", "quit", "q"];

/// Executes the CLI command.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);

    match &cli.command {
        Commands::Ask {
            query,
            max_iterations,
            no_web,
            no_local,
            stream,
        } => {
            let settings = load_settings(*no_web, *no_local)?;
            let agent = build_agent(&settings)?;
            let max_iterations = max_iterations.unwrap_or(settings.max_iterations);
            let rt = runtime()?;
            let interrupts = listen_for_interrupts(&rt);
            let mut stdout = io::stdout().lock();
            cmd_ask(
                &rt,
                &agent,
                query,
                max_iterations,
                *stream,
                format,
                &interrupts,
                &mut stdout,
            )
        }
        Commands::Chat {
            max_iterations,
            no_web,
            no_local,
        } => {
            let settings = load_settings(*no_web, *no_local)?;
            let agent = build_agent(&settings)?;
            let max_iterations = max_iterations.unwrap_or(settings.max_iterations);
            let rt = runtime()?;
            let interrupts = listen_for_interrupts(&rt);
            let lines = read_stdin_lines();
            let mut stdout = io::stdout().lock();
            cmd_chat(
                &rt,
                &agent,
                max_iterations,
                format,
                lines,
                &interrupts,
                &mut stdout,
            )
        }
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
        Commands::Config => cmd_config(&Settings::from_env()?, format),
        #[cfg(feature = "mcp")]
        Commands::Mcp(cmd) => cmd_mcp(cmd),
    }
}

/// Resolves settings from the environment, then applies the per-command
/// source switches.
fn load_settings(no_web: bool, no_local: bool) -> Result<Settings> {
    let mut builder = Settings::builder();
    if no_local {
        builder = builder.local_retrieval(false);
    }
    let mut settings = builder.from_env()?.build()?;
    if no_web {
        settings.tavily_api_key = None;
    }
    Ok(settings)
}

fn runtime() -> Result<Runtime> {
    Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}")).into()
    })
}

/// Installs one Ctrl-C listener for the whole command.
///
/// Each Ctrl-C stores a wakeup in the returned [`Notify`]; whoever is
/// waiting at the time (an in-flight run or the chat prompt) consumes it.
fn listen_for_interrupts(rt: &Runtime) -> Arc<Notify> {
    let interrupts = Arc::new(Notify::new());
    let notify = Arc::clone(&interrupts);
    rt.spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            notify.notify_one();
        }
    });
    interrupts
}

/// Feeds stdin lines through a channel so the chat prompt can wait on
/// input and Ctrl-C at the same time.
fn read_stdin_lines() -> mpsc::UnboundedReceiver<io::Result<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in io::stdin().lines() {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Runs `query`; an interrupt cancels it at the next checkpoint and lets
/// the in-flight call finish.
async fn run_interruptible(
    agent: &ReasoningAgent,
    query: &str,
    max_iterations: usize,
    interrupts: &Notify,
) -> std::result::Result<AgentState, AgentError> {
    let cancel = CancellationToken::new();
    let mut run = pin!(agent.run_with_cancel(query, max_iterations, &cancel));
    tokio::select! {
        biased;
        result = &mut run => result,
        () = interrupts.notified() => {
            cancel.cancel();
            run.await
        }
    }
}

fn render_state(state: &AgentState, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(format_answer(state)),
        OutputFormat::Json | OutputFormat::Ndjson => {
            let mut json = format.to_json(state)?;
            json.push('\n');
            Ok(json)
        }
    }
}

/// Answers one query.
///
/// With `stream`, a progress line (text) or the intermediate state
/// (JSON formats, one line each) is written to `out` after every step.
/// An interrupt cancels the run at its next checkpoint.
#[allow(clippy::too_many_arguments)]
fn cmd_ask<W: IoWrite>(
    rt: &Runtime,
    agent: &ReasoningAgent,
    query: &str,
    max_iterations: usize,
    stream: bool,
    format: OutputFormat,
    interrupts: &Notify,
    out: &mut W,
) -> Result<String> {
    let result = if stream {
        rt.block_on(stream_run(agent, query, max_iterations, format, interrupts, out))
    } else {
        rt.block_on(run_interruptible(agent, query, max_iterations, interrupts))
            .map_err(Error::from)
    };

    let state =
        result.map_err(|e| CommandError::ExecutionFailed(format!("Query failed: {e}")))?;
    render_state(&state, format)
}

async fn stream_run<W: IoWrite>(
    agent: &ReasoningAgent,
    query: &str,
    max_iterations: usize,
    format: OutputFormat,
    interrupts: &Notify,
    out: &mut W,
) -> Result<AgentState> {
    let cancel = CancellationToken::new();
    let mut states = pin!(agent.stream_with_cancel(query, max_iterations, cancel.clone()));
    loop {
        let item = tokio::select! {
            biased;
            item = states.next() => item,
            () = interrupts.notified() => {
                cancel.cancel();
                states.next().await
            }
        };
        let Some(item) = item else {
            break;
        };

        let state = item?;
        if state.is_terminated() {
            return Ok(state);
        }
        let line = match format {
            OutputFormat::Text => format_progress(&state),
            OutputFormat::Json | OutputFormat::Ndjson => OutputFormat::Ndjson.to_json(&state)?,
        };
        writeln!(out, "{line}")?;
        out.flush()?;
    }
    Err(CommandError::ExecutionFailed("run ended without an answer".to_string()).into())
}

/// Interactive loop over `lines`.
///
/// Blank lines are ignored, an exit word or end of input leaves, and a
/// failed query is reported without ending the session. An interrupt
/// during a run cancels that run; an interrupt at the prompt ends the
/// session.
fn cmd_chat<W: IoWrite>(
    rt: &Runtime,
    agent: &ReasoningAgent,
    max_iterations: usize,
    format: OutputFormat,
    mut lines: mpsc::UnboundedReceiver<io::Result<String>>,
    interrupts: &Notify,
    out: &mut W,
) -> Result<String> {
    let interactive = format == OutputFormat::Text;
    if interactive {
        let rule = "=".repeat(60);
        writeln!(out, "{rule}\nAequitas ready! Type 'exit' or 'quit' to stop.\n{rule}")?;
    }

    let farewell = loop {
        if interactive {
            write!(out, "\nYour query: ")?;
            out.flush()?;
        }

        let next = rt.block_on(async {
            tokio::select! {
                biased;
                () = interrupts.notified() => None,
                line = lines.recv() => Some(line),
            }
        });
        let line = match next {
            None => break "\nInterrupted. Goodbye!\n",
            Some(None) => break "\nGoodbye!\n",
            Some(Some(line)) => line?,
        };

        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if EXIT_WORDS.contains(&query.to_lowercase().as_str()) {
            break "\nGoodbye!\n";
        }

        match rt.block_on(run_interruptible(agent, query, max_iterations, interrupts)) {
            Ok(state) => write!(out, "{}", render_state(&state, format)?)?,
            Err(e) => writeln!(out, "Error: {e}")?,
        }
        out.flush()?;
    };

    Ok(if interactive {
        farewell.to_string()
    } else {
        String::new()
    })
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(Path::to_path_buf)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ))
            } else {
                let mut output = format!(
                    "Wrote {} prompt template(s) to: {}\n",
                    written.len(),
                    target_dir.display()
                );
                for path in &written {
                    let _ = writeln!(
                        output,
                        "  {}",
                        path.file_name()
                            .and_then(|n| n.to_str())
                            .unwrap_or("unknown")
                    );
                }
                output.push_str("\nEdit these files to customize the answer prompts.\n");
                Ok(output)
            }
        }
        OutputFormat::Json | OutputFormat::Ndjson => {
            let json = serde_json::json!({
                "directory": target_dir.to_string_lossy(),
                "written": written.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
                "count": written.len()
            });
            Ok(format.to_json(&json)?)
        }
    }
}

fn cmd_config(settings: &Settings, format: OutputFormat) -> Result<String> {
    let redacted = settings.redacted();
    match format {
        OutputFormat::Text => {
            let mut output = String::new();
            if let Some(map) = redacted.as_object() {
                for (key, value) in map {
                    let shown = match value {
                        serde_json::Value::String(s) => s.clone(),
                        serde_json::Value::Null => "-".to_string(),
                        other => other.to_string(),
                    };
                    let _ = writeln!(output, "{key:<24} {shown}");
                }
            }
            Ok(output)
        }
        OutputFormat::Json | OutputFormat::Ndjson => Ok(format.to_json(&redacted)?),
    }
}

/// Starts the MCP server with the specified transport.
///
/// Runs until the client disconnects (stdio) or the server is stopped (SSE).
#[cfg(feature = "mcp")]
fn cmd_mcp(cmd: &McpCommands) -> Result<String> {
    use crate::mcp::{AequitasMcpServer, serve_sse, serve_stdio};

    let settings = Settings::from_env()?;
    let agent = build_agent(&settings)?;
    let server = AequitasMcpServer::new(Arc::new(agent));

    let rt = runtime()?;
    rt.block_on(async {
        match cmd {
            McpCommands::Stdio => serve_stdio(server).await,
            McpCommands::Sse { host, port } => serve_sse(server, host, *port).await,
        }
    })
    .map_err(|e| CommandError::ExecutionFailed(format!("MCP server error: {e}")))?;

    Ok(String::new())
}
