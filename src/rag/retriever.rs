//! Candidate retrieval with distance-threshold filtering

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::rag::Candidate;
use crate::rag::StoredList;
use crate::rag::UNKNOWN_NAME;
use crate::store::DocumentStore;
use crate::store::ScoredDocument;

/// Retriever over the document store
pub struct Retriever {
    store: Arc<dyn DocumentStore>,
}

impl Retriever {
    /// Create a new retriever
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Retrieve the nearest recipes for a query, keeping only hits with
    /// `score <= score_threshold`.
    ///
    /// The score is a distance (lower is closer), so the threshold is a
    /// maximum-distance cutoff. An unavailable store yields an empty list:
    /// that is a normal "no results" outcome, not an error.
    ///
    /// # Errors
    /// - Embedding or store transport failures after a successful store init
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        score_threshold: f32,
    ) -> Result<Vec<Candidate>> {
        debug!("Retrieving top {} for query: {}", top_k, query);

        let documents = self.store.query(query, top_k).await?;

        let candidates: Vec<Candidate> = documents
            .into_iter()
            .filter(|doc| doc.score <= score_threshold)
            .map(candidate_from_document)
            .collect();

        debug!(
            "Kept {} candidates under threshold {}",
            candidates.len(),
            score_threshold
        );
        Ok(candidates)
    }
}

/// Normalize one stored document into a candidate, substituting defaults for
/// missing metadata fields.
fn candidate_from_document(doc: ScoredDocument) -> Candidate {
    let ScoredDocument {
        content,
        metadata,
        score,
    } = doc;

    Candidate {
        id: string_field(&metadata, "id", ""),
        name: string_field(&metadata, "name", UNKNOWN_NAME),
        tags: list_field(&metadata, "tags"),
        image: string_field(&metadata, "image", ""),
        instructions: list_field(&metadata, "instructions"),
        content,
        score,
    }
}

fn string_field(
    metadata: &serde_json::Map<String, Value>,
    key: &str,
    default: &str,
) -> String {
    match metadata.get(key) {
        Some(Value::String(s)) => s.clone(),
        // Numeric ids show up in some source dumps; stringify them
        Some(Value::Number(n)) => n.to_string(),
        _ => default.to_string(),
    }
}

fn list_field<T: serde::de::DeserializeOwned>(
    metadata: &serde_json::Map<String, Value>,
    key: &str,
) -> StoredList<T> {
    metadata
        .get(key)
        .and_then(|value| serde_json::from_value(value.clone()).ok())
        .unwrap_or_default()
}
