//! Transports for the Aequitas MCP server.

use std::sync::Arc;

use rmcp::ServiceExt;
use rmcp::transport::io::stdio;
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::server::AequitasMcpServer;

/// Path the HTTP transport is mounted on.
pub const MCP_PATH: &str = "/mcp";

/// Serves MCP over stdin/stdout until the client disconnects.
///
/// # Errors
///
/// Returns an error if the handshake fails or the session ends abnormally.
pub async fn serve_stdio(server: AequitasMcpServer) -> anyhow::Result<()> {
    info!("serving MCP over stdio");
    server.serve(stdio()).await?.waiting().await?;
    Ok(())
}

/// Serves MCP over streamable HTTP on `host:port` until Ctrl-C.
///
/// Each session gets a clone of `server`; clones share one agent.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn serve_sse(server: AequitasMcpServer, host: &str, port: u16) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig {
            cancellation_token: shutdown.child_token(),
            ..Default::default()
        },
    );

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    let addr = listener.local_addr()?;
    info!(%addr, path = MCP_PATH, "serving MCP over HTTP");

    // stdout is reserved for command output
    #[allow(clippy::print_stderr)]
    {
        eprintln!("Aequitas MCP server listening on http://{addr}{MCP_PATH}");
    }

    let router = axum::Router::new().nest_service(MCP_PATH, service);
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down MCP server");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
