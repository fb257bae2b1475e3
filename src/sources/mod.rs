//! Concrete evidence sources and the HTTP plumbing they share.
//!
//! - [`OllamaEmbedder`]: query embeddings for local retrieval
//! - [`QdrantRetriever`]: semantic search over a Qdrant collection
//! - [`TavilySearcher`]: live web search

pub mod embedding;
pub mod qdrant;
pub mod tavily;

pub use embedding::{Embedder, OllamaEmbedder};
pub use qdrant::{QdrantConfig, QdrantRetriever};
pub use tavily::TavilySearcher;

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::SourceError;

/// Joins `base` and `path` with exactly one slash.
pub(crate) fn endpoint(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Sends `request` and decodes a JSON body, mapping non-success statuses to
/// [`SourceError::HttpStatus`].
pub(crate) async fn send_and_decode<T>(request: reqwest::RequestBuilder) -> Result<T, SourceError>
where
    T: for<'de> Deserialize<'de>,
{
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(SourceError::HttpStatus {
            status: status.as_u16(),
            message: error_message(&body),
        });
    }

    serde_json::from_str(&body).map_err(|err| SourceError::InvalidResponse {
        message: format!("failed to decode response body: {err}"),
    })
}

/// Extracts a human-readable message from an error body.
///
/// Understands Qdrant's `{"status": {"error": ...}}`, the common
/// `{"detail": ...}` and `{"error": ...}` shapes, and falls back to the raw
/// body.
pub(crate) fn error_message(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty error response".to_string();
    }

    let Ok(json) = serde_json::from_str::<JsonValue>(trimmed) else {
        return trimmed.to_string();
    };

    let candidates = [
        json.pointer("/status/error"),
        json.get("status").filter(|s| s.is_string()),
        json.pointer("/detail/error"),
        json.get("detail"),
        json.get("error"),
    ];

    candidates
        .into_iter()
        .flatten()
        .find_map(|v| match v {
            JsonValue::String(s) => Some(s.clone()),
            JsonValue::Null => None,
            other => Some(other.to_string()),
        })
        .unwrap_or_else(|| trimmed.to_string())
}
