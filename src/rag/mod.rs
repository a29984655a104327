//! RAG (Retrieval-Augmented Generation) module
//!
//! End-to-end retrieval and selection for recipe queries:
//! - Vector retrieval with a maximum-distance cutoff
//! - LLM-based selection of a single candidate with a justification
//! - Assembly of the structured recipe response
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use aichef::config::AppConfig;
//! use aichef::llm::LlmService;
//! use aichef::rag::RecipeService;
//! use aichef::store::ChromaStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let store = Arc::new(ChromaStore::new(&config));
//!     let llm = LlmService::from_config(&config)?;
//!     let service = RecipeService::new(store, llm, &config);
//!
//!     if let Some(recipe) = service.search("番茄炒蛋").await? {
//!         println!("{}: {}", recipe.recipe_name, recipe.message);
//!     }
//!     Ok(())
//! }
//! ```

pub mod assembler;
pub mod pipeline;
pub mod prompts;
pub mod retriever;
pub mod selector;

pub use assembler::RecipeResponse;
pub use assembler::RecipeStep;
pub use pipeline::RagAnswer;
pub use pipeline::RecipeService;
pub use retriever::Retriever;
pub use selector::Selection;
pub use selector::SelectionSource;
pub use selector::Selector;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

/// Placeholder for a recipe with no name in the store
pub const UNKNOWN_NAME: &str = "未知";

/// A structured value that may still be carrying its persisted encoding.
///
/// The ingestion job serializes list fields (`tags`, `instructions`) to JSON
/// text before writing them into the metadata bag, but older documents carry
/// the already-decoded arrays. Both shapes are accepted and normalized by a
/// single `decode` call; a string that fails to parse degrades to an empty
/// vector rather than an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredList<T> {
    Decoded(Vec<T>),
    Encoded(String),
}

impl<T> Default for StoredList<T> {
    fn default() -> Self {
        Self::Decoded(Vec::new())
    }
}

impl<T> StoredList<T> {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Decoded(items) => items.is_empty(),
            Self::Encoded(raw) => raw.is_empty(),
        }
    }
}

impl<T: Serialize> StoredList<T> {
    /// Render for prompt display without forcing a decode
    pub fn preview(&self) -> String {
        match self {
            Self::Decoded(items) => serde_json::to_string(items).unwrap_or_default(),
            Self::Encoded(raw) => raw.clone(),
        }
    }
}

impl<T: DeserializeOwned> StoredList<T> {
    /// Normalize to a plain vector, decoding serialized text if needed
    pub fn decode(self) -> Vec<T> {
        match self {
            Self::Decoded(items) => items,
            Self::Encoded(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                debug!("Dropping undecodable stored list: {}", e);
                Vec::new()
            }),
        }
    }
}

/// One instruction step as persisted by the ingestion job
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepRecord {
    #[serde(default)]
    pub description: String,
    #[serde(rename = "imgLink", default)]
    pub img_link: Option<String>,
}

/// A retrieved recipe candidate with its distance score
///
/// Produced per query by the retriever, ordered ascending by score (best
/// first). Ordering is only a retrieval artifact: the selector makes its own
/// choice and must not assume index 0 is the best answer.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub tags: StoredList<String>,
    pub image: String,
    pub instructions: StoredList<StepRecord>,
    pub content: String,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_list_decodes_serialized_text() {
        let list: StoredList<String> = StoredList::Encoded(r#"["辣味","家常菜"]"#.to_string());
        assert_eq!(list.decode(), vec!["辣味".to_string(), "家常菜".to_string()]);
    }

    #[test]
    fn test_stored_list_invalid_text_degrades_to_empty() {
        let list: StoredList<String> = StoredList::Encoded("not-json".to_string());
        assert!(list.decode().is_empty());
    }

    #[test]
    fn test_stored_list_passes_through_decoded() {
        let list = StoredList::Decoded(vec!["清淡".to_string()]);
        assert_eq!(list.decode(), vec!["清淡".to_string()]);
    }

    #[test]
    fn test_stored_list_from_metadata_value() {
        // Array form
        let value = serde_json::json!(["辣味", "下饭"]);
        let list: StoredList<String> = serde_json::from_value(value).unwrap();
        assert!(matches!(list, StoredList::Decoded(_)));

        // Serialized-text form
        let value = serde_json::json!(r#"["辣味","下饭"]"#);
        let list: StoredList<String> = serde_json::from_value(value).unwrap();
        assert!(matches!(list, StoredList::Encoded(_)));
        assert_eq!(list.decode().len(), 2);
    }

    #[test]
    fn test_step_record_img_link_rename() {
        let step: StepRecord =
            serde_json::from_str(r#"{"description":"切块","imgLink":"http://x/1.png"}"#).unwrap();
        assert_eq!(step.description, "切块");
        assert_eq!(step.img_link.as_deref(), Some("http://x/1.png"));

        let bare: StepRecord = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(bare.description, "");
        assert!(bare.img_link.is_none());
    }
}
