//! Recipe pipeline: Retrieve -> Select -> Assemble
//!
//! Each invocation is a strict sequential pipeline inside one request
//! context; the only shared state is the store handle behind the retriever.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::AppConfig;
use crate::errors::Result;
use crate::llm::LlmService;
use crate::rag::assembler;
use crate::rag::prompts;
use crate::rag::Candidate;
use crate::rag::RecipeResponse;
use crate::rag::Retriever;
use crate::rag::Selector;
use crate::store::DocumentStore;

/// Fan-out for the free-text answer surface
const ANSWER_TOP_K: usize = 3;
const ANSWER_TEMPERATURE: f32 = 0.7;
const ANSWER_MAX_TOKENS: usize = 1024;

/// Free-text answer plus the retrieved sources for citation display
#[derive(Debug, Clone, Serialize)]
pub struct RagAnswer {
    pub answer: String,
    pub source_docs: Vec<Candidate>,
}

/// Complete recipe recommendation service
pub struct RecipeService {
    retriever: Retriever,
    selector: Selector,
    llm: Option<LlmService>,
    top_k: usize,
    score_threshold: f32,
}

impl RecipeService {
    /// Compose the service from an injected store and optional LLM client
    pub fn new(store: Arc<dyn DocumentStore>, llm: Option<LlmService>, config: &AppConfig) -> Self {
        Self {
            retriever: Retriever::new(store),
            selector: Selector::new(llm.clone()),
            llm,
            top_k: config.top_k(),
            score_threshold: config.score_threshold(),
        }
    }

    /// Structured search: retrieve, let the model pick one candidate, and
    /// assemble the recipe response.
    ///
    /// `Ok(None)` is the sole not-found path, produced only when retrieval
    /// yields no candidates under the threshold.
    ///
    /// # Errors
    /// - Embedding or store transport failures (store unavailability is not
    ///   an error; it shows up as not-found)
    pub async fn search(&self, query: &str) -> Result<Option<RecipeResponse>> {
        info!("Processing recipe search: {}", query);

        let mut candidates = self
            .retriever
            .retrieve(query, self.top_k, self.score_threshold)
            .await?;

        if candidates.is_empty() {
            info!("No candidates under threshold for query: {}", query);
            return Ok(None);
        }

        debug!(
            "Candidates: {:?}",
            candidates.iter().map(|c| c.name.as_str()).collect::<Vec<_>>()
        );

        let selection = self.selector.select(query, &candidates).await;

        // The selector may answer out of range; bounds are enforced here
        let index = clamp_index(selection.index, candidates.len());
        info!(
            "Selected candidate {} via {:?}: {}",
            index, selection.source, candidates[index].name
        );

        let chosen = candidates.swap_remove(index);
        Ok(Some(assembler::assemble(chosen, selection.reason)))
    }

    /// Degenerate free-text pipeline: retrieve then answer directly, with no
    /// selection or parsing step.
    ///
    /// This surface is deliberately permissive: a failed model call surfaces
    /// its stringified error as the answer text, alongside the sources.
    ///
    /// # Errors
    /// - Embedding or store transport failures
    pub async fn answer(&self, query: &str) -> Result<RagAnswer> {
        info!("Processing free-text query: {}", query);

        let candidates = self
            .retriever
            .retrieve(query, ANSWER_TOP_K, self.score_threshold)
            .await?;

        let Some(llm) = &self.llm else {
            return Ok(RagAnswer {
                answer: crate::rag::selector::NO_CLIENT_MESSAGE.to_string(),
                source_docs: candidates,
            });
        };

        let prompt = prompts::build_answer_prompt(query, &candidates);
        let answer = match llm
            .complete(
                prompts::ANSWER_SYSTEM_PROMPT,
                &prompt,
                ANSWER_TEMPERATURE,
                ANSWER_MAX_TOKENS,
            )
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!("Answer generation failed: {}", e);
                format!("生成回答失败：{e}")
            }
        };

        Ok(RagAnswer {
            answer,
            source_docs: candidates,
        })
    }
}

/// Clamp a selection index into `[0, len - 1]`, defaulting to 0 when out of
/// range. Callers only invoke this with a non-empty candidate list.
fn clamp_index(index: usize, len: usize) -> usize {
    if index < len {
        index
    } else {
        0
    }
}
