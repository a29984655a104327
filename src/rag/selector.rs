//! LLM-based candidate selection
//!
//! The model is asked to answer in the literal shape `"<index> ||| <reason>"`.
//! Replies rarely deviate, but when they do the parser walks a short chain of
//! fallback productions: strict form, then a bare leading integer, then a
//! deterministic index-0 default. A missing or failing model never surfaces
//! as an error here; callers always get a usable selection.
//!
//! Bounds are deliberately not enforced in this module: the parsed index may
//! exceed the candidate count, and the pipeline clamps it at the call site.

use tracing::debug;
use tracing::warn;

use crate::llm::LlmService;
use crate::rag::prompts;
use crate::rag::Candidate;

/// Selection temperature; slightly loose so the justification reads naturally
const SELECT_TEMPERATURE: f32 = 0.4;
const SELECT_MAX_TOKENS: usize = 200;

/// Fallback message when no LLM credential is configured
pub const NO_CLIENT_MESSAGE: &str = "API Key 未配置，默认推荐：";
/// Fallback message when the model call itself fails
pub const MODEL_ERROR_MESSAGE: &str = "为您推荐以下菜谱：";

/// The selector's choice: an index into the candidate list and a
/// natural-language justification.
///
/// `index` is not guaranteed to be in bounds; clamping is the caller's
/// contract.
#[derive(Debug, Clone)]
pub struct Selection {
    pub index: usize,
    pub reason: String,
    pub source: SelectionSource,
}

/// Where the selection came from, for observability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSource {
    /// Strict `index ||| reason` reply
    Model,
    /// Reply carried only a leading index; reason was fabricated
    LooseReply,
    /// No LLM client configured
    NoClient,
    /// Model call failed (network, auth, malformed response)
    ModelError,
    /// Reply carried no recoverable index
    Unparseable,
}

/// Selector over an optional LLM client
pub struct Selector {
    llm: Option<LlmService>,
}

impl Selector {
    pub fn new(llm: Option<LlmService>) -> Self {
        Self { llm }
    }

    /// Pick one candidate and justify the pick.
    ///
    /// Callers guarantee `candidates` is non-empty; the empty short-circuit
    /// lives one layer up in the pipeline.
    pub async fn select(&self, query: &str, candidates: &[Candidate]) -> Selection {
        let Some(llm) = &self.llm else {
            // Deterministic and offline: no network call is attempted
            return Selection {
                index: 0,
                reason: NO_CLIENT_MESSAGE.to_string(),
                source: SelectionSource::NoClient,
            };
        };

        let user_prompt = prompts::build_select_prompt(query, candidates);
        match llm
            .complete(
                prompts::SELECT_SYSTEM_PROMPT,
                &user_prompt,
                SELECT_TEMPERATURE,
                SELECT_MAX_TOKENS,
            )
            .await
        {
            Ok(content) => {
                debug!("Model reply: {}", content);
                resolve_reply(&content, candidates)
            }
            Err(e) => {
                warn!("Selection model call failed: {}", e);
                Selection {
                    index: 0,
                    reason: MODEL_ERROR_MESSAGE.to_string(),
                    source: SelectionSource::ModelError,
                }
            }
        }
    }
}

/// Parsed shape of a model reply
#[derive(Debug, PartialEq, Eq)]
enum ParsedReply {
    /// `index ||| reason`
    Strict { index: usize, reason: String },
    /// Bare reply starting with an integer
    Loose { index: usize },
    Unparsed,
}

/// Parse a reply against the `index ||| reason` grammar.
///
/// Splits on the first `|||` only and takes the first integer found in the
/// left part. A reply without the separator still counts if it starts with
/// an integer.
fn parse_reply(content: &str) -> ParsedReply {
    let content = content.trim();

    if let Some((left, right)) = content.split_once("|||") {
        if let Some(index) = first_integer(left) {
            return ParsedReply::Strict {
                index,
                reason: right.trim().to_string(),
            };
        }
    }

    if let Some(index) = leading_integer(content) {
        return ParsedReply::Loose { index };
    }

    ParsedReply::Unparsed
}

/// Map a model reply onto the candidate list
fn resolve_reply(content: &str, candidates: &[Candidate]) -> Selection {
    match parse_reply(content) {
        ParsedReply::Strict { index, reason } => Selection {
            index,
            reason,
            source: SelectionSource::Model,
        },
        // A loose index still needs the candidate name for the fabricated
        // reason, so out-of-range here falls through to the default.
        ParsedReply::Loose { index } => match candidates.get(index) {
            Some(chosen) => Selection {
                index,
                reason: format!("为您推荐【{}】", chosen.name),
                source: SelectionSource::LooseReply,
            },
            None => default_selection(candidates),
        },
        ParsedReply::Unparsed => default_selection(candidates),
    }
}

fn default_selection(candidates: &[Candidate]) -> Selection {
    let name = candidates.first().map(|c| c.name.as_str()).unwrap_or(crate::rag::UNKNOWN_NAME);
    Selection {
        index: 0,
        reason: format!("试试这道【{name}】，应该不错！"),
        source: SelectionSource::Unparseable,
    }
}

/// First run of ASCII digits anywhere in the text
fn first_integer(text: &str) -> Option<usize> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// Run of ASCII digits at the very start of the text
fn leading_integer(text: &str) -> Option<usize> {
    let digits: String = text.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::StoredList;

    fn candidate(name: &str) -> Candidate {
        Candidate {
            id: "r1".to_string(),
            name: name.to_string(),
            tags: StoredList::default(),
            image: String::new(),
            instructions: StoredList::default(),
            content: format!("菜名: {name}"),
            score: 0.3,
        }
    }

    fn two_candidates() -> Vec<Candidate> {
        vec![candidate("麻婆豆腐"), candidate("清蒸鱼")]
    }

    #[test]
    fn test_strict_reply() {
        let selection = resolve_reply("1 ||| 清蒸鱼更清淡", &two_candidates());
        assert_eq!(selection.index, 1);
        assert_eq!(selection.reason, "清蒸鱼更清淡");
        assert_eq!(selection.source, SelectionSource::Model);
    }

    #[test]
    fn test_strict_reply_with_noise_around_index() {
        let selection = resolve_reply("我选 选项[1] ||| 口味更合适", &two_candidates());
        assert_eq!(selection.index, 1);
        assert_eq!(selection.reason, "口味更合适");
    }

    #[test]
    fn test_strict_reply_splits_on_first_separator_only() {
        let selection = resolve_reply("0 ||| 左边 ||| 右边", &two_candidates());
        assert_eq!(selection.index, 0);
        assert_eq!(selection.reason, "左边 ||| 右边");
    }

    #[test]
    fn test_loose_reply_fabricates_reason() {
        let selection = resolve_reply("1，这道比较清淡", &two_candidates());
        assert_eq!(selection.index, 1);
        assert_eq!(selection.reason, "为您推荐【清蒸鱼】");
        assert_eq!(selection.source, SelectionSource::LooseReply);
    }

    #[test]
    fn test_unparseable_reply_defaults_to_first_candidate() {
        let selection = resolve_reply("garbage text no numbers", &two_candidates());
        assert_eq!(selection.index, 0);
        assert!(selection.reason.contains("麻婆豆腐"));
        assert_eq!(selection.source, SelectionSource::Unparseable);
    }

    #[test]
    fn test_strict_reply_may_be_out_of_range() {
        // Bounds are the caller's contract, not the selector's
        let selection = resolve_reply("99 ||| 随便选的", &two_candidates());
        assert_eq!(selection.index, 99);
        assert_eq!(selection.source, SelectionSource::Model);
    }

    #[test]
    fn test_loose_out_of_range_falls_back() {
        let selection = resolve_reply("99", &two_candidates());
        assert_eq!(selection.index, 0);
        assert_eq!(selection.source, SelectionSource::Unparseable);
    }

    #[test]
    fn test_parse_reply_grammar() {
        assert_eq!(
            parse_reply("  2 ||| 理由 "),
            ParsedReply::Strict {
                index: 2,
                reason: "理由".to_string()
            }
        );
        assert_eq!(parse_reply("3"), ParsedReply::Loose { index: 3 });
        assert_eq!(parse_reply("||| 没有数字"), ParsedReply::Unparsed);
        assert_eq!(parse_reply(""), ParsedReply::Unparsed);
    }

    #[tokio::test]
    async fn test_select_without_client_is_deterministic() {
        let selector = Selector::new(None);
        let candidates = two_candidates();

        for _ in 0..3 {
            let selection = selector.select("想吃鱼", &candidates).await;
            assert_eq!(selection.index, 0);
            assert_eq!(selection.reason, NO_CLIENT_MESSAGE);
            assert_eq!(selection.source, SelectionSource::NoClient);
        }
    }
}
