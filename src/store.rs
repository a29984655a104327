//! Document store adapter
//!
//! Wraps a Chroma-style vector index reached over HTTP. The index and the
//! embedding model are black boxes: this module only knows how to turn a
//! query string into "the k nearest documents with their distance scores".
//!
//! The connection (collection lookup plus embedding client) is initialized
//! lazily, at most once per process. A failed initialization is cached and
//! logged once; every later query then returns an empty result so callers
//! can treat "store unavailable" as "no candidates" instead of an error.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::debug;
use tracing::error;
use tracing::info;

use crate::config::AppConfig;
use crate::config::EmbeddingsConfig;
use crate::config::StoreConfig;
use crate::embeddings::EmbeddingClient;
use crate::errors::AichefError;
use crate::errors::Result;

/// A retrieved document: free text plus an arbitrary metadata bag and a
/// distance score (lower is more similar; not bounded to [0, 1]).
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub content: String,
    pub metadata: Map<String, Value>,
    pub score: f32,
}

/// Query-only access to a vector index
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Return the `k` nearest documents for `text`, best first.
    async fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredDocument>>;
}

/// Production store backed by a Chroma server
pub struct ChromaStore {
    store: StoreConfig,
    embeddings: EmbeddingsConfig,
    handle: OnceCell<Option<StoreHandle>>,
}

struct StoreHandle {
    http: Client,
    query_url: String,
    embedder: EmbeddingClient,
}

impl ChromaStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: config.store.clone(),
            embeddings: config.embeddings.clone(),
            handle: OnceCell::new(),
        }
    }

    /// Initialize at most once; all concurrent callers observe the same
    /// handle or the same cached "unavailable" outcome.
    async fn handle(&self) -> Option<&StoreHandle> {
        self.handle
            .get_or_init(|| async {
                info!(
                    "Initializing vector store: {} (collection {})",
                    self.store.endpoint, self.store.collection
                );
                match StoreHandle::connect(&self.store, &self.embeddings).await {
                    Ok(handle) => {
                        info!("Vector store ready");
                        Some(handle)
                    }
                    Err(e) => {
                        error!("Vector store initialization failed: {}", e);
                        None
                    }
                }
            })
            .await
            .as_ref()
    }
}

#[async_trait]
impl DocumentStore for ChromaStore {
    async fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredDocument>> {
        let Some(handle) = self.handle().await else {
            // Unavailable store is an expected "no candidates" outcome
            return Ok(Vec::new());
        };

        let embedding = handle.embedder.generate(text).await?;
        let request = QueryRequest {
            query_embeddings: vec![embedding],
            n_results: k,
            include: &["documents", "metadatas", "distances"],
        };

        let response = handle
            .http
            .post(&handle.query_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AichefError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AichefError::Store(format!(
                "query failed ({status}): {body}"
            )));
        }

        let payload: QueryResponse = response
            .json()
            .await
            .map_err(|e| AichefError::Store(format!("Failed to parse query response: {e}")))?;

        let documents = payload.into_documents();
        debug!("Store returned {} documents", documents.len());
        Ok(documents)
    }
}

impl StoreHandle {
    async fn connect(store: &StoreConfig, embeddings: &EmbeddingsConfig) -> Result<Self> {
        let embedder = EmbeddingClient::from_config(embeddings)?;

        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| AichefError::Http(e.to_string()))?;

        // Resolve the collection name to its id. The name must match the one
        // used by the ingestion job.
        let base = store.endpoint.trim_end_matches('/');
        let url = format!("{}/api/v1/collections/{}", base, store.collection);
        let response = http
            .get(&url)
            .send()
            .await
            .map_err(|e| AichefError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AichefError::Store(format!(
                "collection '{}' not available ({status})",
                store.collection
            )));
        }

        let collection: CollectionInfo = response
            .json()
            .await
            .map_err(|e| AichefError::Store(format!("Failed to parse collection info: {e}")))?;

        let query_url = format!("{}/api/v1/collections/{}/query", base, collection.id);
        Ok(Self {
            http,
            query_url,
            embedder,
        })
    }
}

#[derive(Deserialize)]
struct CollectionInfo {
    id: String,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query_embeddings: Vec<Vec<f32>>,
    n_results: usize,
    include: &'a [&'a str],
}

/// Chroma groups results per query embedding; we always send exactly one.
#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    documents: Vec<Vec<Option<String>>>,
    #[serde(default)]
    metadatas: Vec<Vec<Option<Map<String, Value>>>>,
    #[serde(default)]
    distances: Vec<Vec<f32>>,
}

impl QueryResponse {
    fn into_documents(self) -> Vec<ScoredDocument> {
        let documents = self.documents.into_iter().next().unwrap_or_default();
        let metadatas = self.metadatas.into_iter().next().unwrap_or_default();
        let distances = self.distances.into_iter().next().unwrap_or_default();

        documents
            .into_iter()
            .zip(metadatas)
            .zip(distances)
            .map(|((content, metadata), score)| ScoredDocument {
                content: content.unwrap_or_default(),
                metadata: metadata.unwrap_or_default(),
                score,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_query_response_rows() {
        let payload: QueryResponse = serde_json::from_value(json!({
            "ids": [["r1", "r2"]],
            "documents": [["菜名: 番茄炒蛋", null]],
            "metadatas": [[{"id": "r1", "name": "番茄炒蛋"}, null]],
            "distances": [[0.3, 0.9]],
        }))
        .unwrap();

        let docs = payload.into_documents();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].content, "菜名: 番茄炒蛋");
        assert_eq!(docs[0].metadata["name"], "番茄炒蛋");
        assert!((docs[0].score - 0.3).abs() < f32::EPSILON);
        // Missing document text and metadata degrade to empty values
        assert_eq!(docs[1].content, "");
        assert!(docs[1].metadata.is_empty());
    }

    #[test]
    fn test_query_response_empty() {
        let payload = QueryResponse::default();
        assert!(payload.into_documents().is_empty());
    }
}
