//! Response assembly from a selected candidate
//!
//! Pure data reshaping: no I/O, and every malformed input degrades to a safe
//! default instead of an error.

use serde::Deserialize;
use serde::Serialize;

use crate::rag::Candidate;

/// Placeholder id when the store carries none
const UNKNOWN_ID: &str = "unknown";
/// Placeholder name when the store carries none
const UNNAMED_RECIPE: &str = "未命名";

/// One cooking step in the response contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeStep {
    /// 1-based position
    pub step_index: usize,
    pub description: String,
    pub image_url: Option<String>,
}

/// The structured recipe returned to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeResponse {
    pub recipe_id: String,
    pub recipe_name: String,
    pub tags: Vec<String>,
    pub cover_image: Option<String>,
    pub steps: Vec<RecipeStep>,
    /// The selector's justification, verbatim
    pub message: String,
}

/// Build the response contract from the selected candidate.
///
/// Serialized-text `tags`/`instructions` are decoded here (failure means an
/// empty list), steps get their 1-based indices by position, and `"null"` or
/// empty image links become `None`.
pub fn assemble(candidate: Candidate, message: String) -> RecipeResponse {
    let tags = candidate.tags.decode();

    let steps = candidate
        .instructions
        .decode()
        .into_iter()
        .enumerate()
        .map(|(idx, step)| RecipeStep {
            step_index: idx + 1,
            description: step.description,
            image_url: normalize_image_link(step.img_link),
        })
        .collect();

    RecipeResponse {
        recipe_id: default_if_empty(candidate.id, UNKNOWN_ID),
        recipe_name: default_if_empty(candidate.name, UNNAMED_RECIPE),
        tags,
        cover_image: normalize_image_link(Some(candidate.image)),
        steps,
        message,
    }
}

/// The ingestion job writes the literal string "null" for absent images
fn normalize_image_link(link: Option<String>) -> Option<String> {
    match link {
        Some(s) if !s.is_empty() && s != "null" => Some(s),
        _ => None,
    }
}

fn default_if_empty(value: String, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value
    }
}
