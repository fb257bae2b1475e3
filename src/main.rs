//! Aequitas CLI entry point.

#![allow(clippy::print_stderr)]

use std::io::{self, Write};
use std::process::ExitCode;

use aequitas_rs::cli::{Cli, execute};
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match execute(&cli) {
        Ok(output) => {
            if !output.is_empty() {
                let mut stdout = io::stdout().lock();
                let _ = stdout.write_all(output.as_bytes());
                if !output.ends_with('\n') {
                    let _ = stdout.write_all(b"\n");
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout carries only answers and MCP traffic.
fn init_logging(verbose: bool) {
    let default = if verbose { "aequitas_rs=debug,warn" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}
