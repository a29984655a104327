//! Prompt templates for selection and free-text answering

use crate::rag::Candidate;

/// Snippet length (in characters) shown per candidate in the prompt
const SNIPPET_CHARS: usize = 150;

/// System instruction encoding the selection policy.
///
/// Dietary restrictions are handled softly: when every candidate conflicts
/// with a stated restriction the model must still pick one and explain a
/// concrete adaptation instead of refusing.
pub const SELECT_SYSTEM_PROMPT: &str = r#"你是一位聪明、懂变通的私家大厨。你的任务是从给定的候选菜谱中，为用户推荐**最合适**的一道。

【推荐逻辑】：
1. **找最大公约数**：优先选择食材、口味最接近用户需求的菜。
2. **灵活处理忌口**：
   - 如果用户说“不要辣”，尽量选不辣的。
   - **关键点**：如果候选项全都有辣，**不要拒绝回答！** 请选一个最容易“去辣”的菜（比如把辣椒油换成香油），并在理由里告诉用户怎么调整。
3. **不仅是选择，更是建议**：推荐理由要告诉用户“为什么选它”或者“怎么做更符合你的要求”。

【输出格式】：
请直接返回一行：索引数字 ||| 推荐理由
（例如：1 ||| 虽然原谱有辣椒，但这道菜只要不放辣椒油，依然非常鲜美，很适合您。）"#;

/// Build the user prompt enumerating the candidates
pub fn build_select_prompt(query: &str, candidates: &[Candidate]) -> String {
    let mut candidates_str = String::new();
    for (i, candidate) in candidates.iter().enumerate() {
        candidates_str.push_str(&format!(
            "选项[{i}]: {}\n   - 标签: {}\n   - 简介: {}...\n\n",
            candidate.name,
            candidate.tags.preview(),
            snippet(&candidate.content),
        ));
    }

    format!("用户需求：【{query}】\n\n候选列表：\n{candidates_str}\n请做出你的选择：")
}

/// System instruction for the free-text answer surface
pub const ANSWER_SYSTEM_PROMPT: &str =
    "你是一位热心的菜谱助手。请根据提供的候选菜谱回答用户的问题：推荐合适的菜并简要说明做法要点。如果候选菜谱都不相关，请如实说明。回答要简洁、友好。";

/// Build the user prompt for the free-text answer surface
pub fn build_answer_prompt(query: &str, candidates: &[Candidate]) -> String {
    let mut context = String::new();
    for (i, candidate) in candidates.iter().enumerate() {
        context.push_str(&format!(
            "[菜谱 {}] {}\n标签: {}\n内容: {}...\n\n",
            i + 1,
            candidate.name,
            candidate.tags.preview(),
            snippet(&candidate.content),
        ));
    }

    format!("用户问题：【{query}】\n\n候选菜谱：\n{context}\n请给出你的回答：")
}

/// First ~150 characters of the content with newlines flattened
fn snippet(content: &str) -> String {
    content
        .chars()
        .take(SNIPPET_CHARS)
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::StoredList;

    fn candidate(name: &str, content: &str) -> Candidate {
        Candidate {
            id: "r1".to_string(),
            name: name.to_string(),
            tags: StoredList::Encoded(r#"["家常菜"]"#.to_string()),
            image: String::new(),
            instructions: StoredList::default(),
            content: content.to_string(),
            score: 0.4,
        }
    }

    #[test]
    fn test_select_prompt_enumerates_candidates() {
        let candidates = vec![candidate("麻婆豆腐", "豆腐 牛肉末 豆瓣酱"), candidate("清蒸鱼", "鲈鱼 姜丝")];
        let prompt = build_select_prompt("不要辣", &candidates);

        assert!(prompt.contains("选项[0]: 麻婆豆腐"));
        assert!(prompt.contains("选项[1]: 清蒸鱼"));
        assert!(prompt.contains("用户需求：【不要辣】"));
        assert!(prompt.contains(r#"["家常菜"]"#));
    }

    #[test]
    fn test_snippet_truncates_by_chars_and_flattens_newlines() {
        let long = "辣\n味".repeat(200);
        let s = snippet(&long);
        assert_eq!(s.chars().count(), 150);
        assert!(!s.contains('\n'));
    }
}
