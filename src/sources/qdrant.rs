//! Local retrieval over a Qdrant collection via its REST API.
//!
//! The query is embedded with an [`Embedder`] and sent to
//! `POST /collections/{name}/points/search`. Document text is read from the
//! `text` payload field, falling back to `content`.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, warn};

use super::embedding::Embedder;
use super::{endpoint, send_and_decode};
use crate::agent::traits::Retriever;
use crate::error::SourceError;

/// Payload fields that may hold document text, in lookup order.
const TEXT_FIELDS: [&str; 2] = ["text", "content"];

/// Connection settings for [`QdrantRetriever`].
#[derive(Clone)]
pub struct QdrantConfig {
    /// REST endpoint, e.g. `http://localhost:6333`.
    pub url: String,
    /// API key for secured or cloud instances.
    pub api_key: Option<String>,
    /// Collection to search.
    pub collection: String,
    /// Named vector to search, for collections with several vectors.
    pub vector_name: Option<String>,
    /// Documents returned per query.
    pub top_k: usize,
}

impl fmt::Debug for QdrantConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let api_key = if self.api_key.is_some() {
            "<redacted>"
        } else {
            "<none>"
        };
        f.debug_struct("QdrantConfig")
            .field("url", &self.url)
            .field("api_key", &api_key)
            .field("collection", &self.collection)
            .field("vector_name", &self.vector_name)
            .field("top_k", &self.top_k)
            .finish()
    }
}

/// [`Retriever`] backed by Qdrant.
pub struct QdrantRetriever {
    http: reqwest::Client,
    config: QdrantConfig,
    embedder: Arc<dyn Embedder>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum SearchVector {
    Plain(Vec<f32>),
    Named { name: String, vector: Vec<f32> },
}

#[derive(Debug, Serialize)]
struct SearchPointsRequest {
    vector: SearchVector,
    limit: usize,
    with_payload: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    #[serde(default)]
    score: f32,
    #[serde(default)]
    payload: Option<Map<String, JsonValue>>,
}

impl QdrantRetriever {
    /// Creates a retriever that embeds queries with `embedder`.
    #[must_use]
    pub fn new(config: QdrantConfig, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            embedder,
        }
    }

    /// Connection settings.
    #[must_use]
    pub const fn config(&self) -> &QdrantConfig {
        &self.config
    }

    fn request_builder(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self.http.post(endpoint(&self.config.url, path));
        match self.config.api_key.as_deref() {
            Some(api_key) => request.header("api-key", api_key),
            None => request,
        }
    }

    fn search_request(&self, vector: Vec<f32>) -> SearchPointsRequest {
        let vector = match &self.config.vector_name {
            Some(name) => SearchVector::Named {
                name: name.clone(),
                vector,
            },
            None => SearchVector::Plain(vector),
        };
        SearchPointsRequest {
            vector,
            limit: self.config.top_k,
            with_payload: true,
        }
    }

    async fn search(&self, query: &str) -> Result<Vec<String>, SourceError> {
        if self.config.top_k == 0 {
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed(query).await?;
        let request = self
            .request_builder(&format!(
                "collections/{}/points/search",
                self.config.collection
            ))
            .json(&self.search_request(vector));

        let response: ApiResponse<Vec<ScoredPoint>> =
            send_and_decode(request).await.map_err(|e| self.classify(e))?;

        Ok(documents_from_points(response.result))
    }

    fn classify(&self, err: SourceError) -> SourceError {
        match err {
            SourceError::HttpStatus { status: 404, message }
                if message.to_lowercase().contains("collection") =>
            {
                SourceError::CollectionNotFound {
                    collection: self.config.collection.clone(),
                }
            }
            other => other,
        }
    }
}

impl fmt::Debug for QdrantRetriever {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QdrantRetriever")
            .field("config", &self.config)
            .field("embedder", &self.embedder.model())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Retriever for QdrantRetriever {
    fn name(&self) -> &'static str {
        "qdrant"
    }

    async fn retrieve(&self, query: &str) -> Result<Vec<String>, SourceError> {
        match self.search(query).await {
            Err(SourceError::CollectionNotFound { collection }) => {
                warn!(%collection, "collection does not exist, no local documents");
                Ok(Vec::new())
            }
            Ok(docs) => {
                debug!(count = docs.len(), collection = %self.config.collection, "qdrant search");
                Ok(docs)
            }
            Err(e) => Err(e),
        }
    }
}

/// Orders points by descending score and extracts their document text.
///
/// Points without a usable text field are skipped.
fn documents_from_points(mut points: Vec<ScoredPoint>) -> Vec<String> {
    points.sort_by(|a, b| b.score.total_cmp(&a.score));
    points
        .into_iter()
        .filter_map(|point| point.payload.as_ref().and_then(payload_text))
        .collect()
}

fn payload_text(payload: &Map<String, JsonValue>) -> Option<String> {
    TEXT_FIELDS
        .iter()
        .find_map(|field| payload.get(*field).and_then(JsonValue::as_str))
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        fn model(&self) -> &str {
            "fixed"
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, SourceError> {
            Ok(vec![0.1, 0.2])
        }
    }

    fn config(vector_name: Option<&str>) -> QdrantConfig {
        QdrantConfig {
            url: "http://localhost:6333".to_string(),
            api_key: Some("secret".to_string()),
            collection: "aequitas_documents".to_string(),
            vector_name: vector_name.map(ToString::to_string),
            top_k: 5,
        }
    }

    fn points(body: &str) -> Vec<ScoredPoint> {
        serde_json::from_str::<ApiResponse<Vec<ScoredPoint>>>(body)
            .map(|r| r.result)
            .unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn test_documents_prefer_text_then_content() {
        let docs = documents_from_points(points(
            r#"{"result":[
                {"id":1,"score":0.9,"payload":{"text":"Diversification spreads risk.","content":"ignored"}},
                {"id":2,"score":0.8,"payload":{"content":"Bonds pay coupons."}},
                {"id":3,"score":0.7,"payload":{"source":"report.pdf"}},
                {"id":4,"score":0.6}
            ],"status":"ok","time":0.001}"#,
        ));
        assert_eq!(docs, vec!["Diversification spreads risk.", "Bonds pay coupons."]);
    }

    #[test]
    fn test_documents_sorted_by_score() {
        let docs = documents_from_points(points(
            r#"{"result":[
                {"id":1,"score":0.2,"payload":{"text":"low"}},
                {"id":2,"score":0.95,"payload":{"text":"high"}}
            ]}"#,
        ));
        assert_eq!(docs, vec!["high", "low"]);
    }

    #[test]
    fn test_plain_search_request() {
        let retriever = QdrantRetriever::new(config(None), Arc::new(FixedEmbedder));
        let json = serde_json::to_value(retriever.search_request(vec![0.5])).unwrap_or_default();
        assert_eq!(json["vector"], serde_json::json!([0.5]));
        assert_eq!(json["limit"], 5);
        assert_eq!(json["with_payload"], true);
    }

    #[test]
    fn test_named_vector_request() {
        let retriever = QdrantRetriever::new(config(Some("dense")), Arc::new(FixedEmbedder));
        let json = serde_json::to_value(retriever.search_request(vec![0.5])).unwrap_or_default();
        assert_eq!(json["vector"]["name"], "dense");
        assert_eq!(json["vector"]["vector"], serde_json::json!([0.5]));
    }

    #[test]
    fn test_missing_collection_classified() {
        let retriever = QdrantRetriever::new(config(None), Arc::new(FixedEmbedder));
        let err = retriever.classify(SourceError::HttpStatus {
            status: 404,
            message: "Not found: Collection `aequitas_documents` doesn't exist!".to_string(),
        });
        assert!(matches!(err, SourceError::CollectionNotFound { .. }));

        let err = retriever.classify(SourceError::HttpStatus {
            status: 500,
            message: "collection broken".to_string(),
        });
        assert!(matches!(err, SourceError::HttpStatus { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_zero_top_k_skips_network() {
        let mut cfg = config(None);
        cfg.top_k = 0;
        let retriever = QdrantRetriever::new(cfg, Arc::new(FixedEmbedder));
        let docs = retriever
            .retrieve("anything")
            .await
            .unwrap_or_else(|_| unreachable!());
        assert!(docs.is_empty());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let retriever = QdrantRetriever::new(config(None), Arc::new(FixedEmbedder));
        let debug = format!("{retriever:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));
    }
}
