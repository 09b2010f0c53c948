//! Answer-generation collaborator.
//!
//! Thin orchestration over an OpenAI-compatible chat completions API
//! (the default config points at Groq). The retrieval core hands this
//! module the passages it found — possibly none — plus the question and
//! prior transcript; phrasing for the no-context case lives here, not
//! in the core.
//!
//! Deliberately glue, not core: no prompt wording here is load-bearing,
//! and backend failures are surfaced to the caller rather than retried.

use anyhow::{bail, Context, Result};
use std::time::Duration;

use crate::config::AnswerConfig;
use crate::models::ScoredPassage;

const SYSTEM_PROMPT: &str = "You are a legal research assistant. Answer the question using the \
    document context when it is provided, citing the relevant passages. When no document context \
    is available, say so and answer from general legal knowledge, with appropriate caveats.";

/// Join retrieved passages into the context block for the prompt.
pub fn build_context(passages: &[ScoredPassage]) -> String {
    if passages.is_empty() {
        return "No document context available.".to_string();
    }

    passages
        .iter()
        .map(|p| p.passage.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Generate an answer from the retrieved passages, prior transcript,
/// and the current question.
pub async fn generate_answer(
    config: &AnswerConfig,
    passages: &[ScoredPassage],
    history: &str,
    question: &str,
) -> Result<String> {
    let api_key = std::env::var("GROQ_API_KEY")
        .or_else(|_| std::env::var("OPENAI_API_KEY"))
        .context("GROQ_API_KEY (or OPENAI_API_KEY) not set")?;

    let context = build_context(passages);
    let history = if history.trim().is_empty() {
        "No previous conversation."
    } else {
        history
    };

    let user_prompt = format!(
        "### Previous Conversation:\n{}\n\n### Document Context:\n{}\n\n### Current Question:\n{}",
        history, context, question
    );

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let body = serde_json::json!({
        "model": config.model,
        "messages": [
            { "role": "system", "content": SYSTEM_PROMPT },
            { "role": "user", "content": user_prompt },
        ],
    });

    let response = client
        .post(format!("{}/chat/completions", config.base_url.trim_end_matches('/')))
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await
        .context("answer backend unreachable")?;

    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        bail!("answer backend error {}: {}", status, body_text);
    }

    let json: serde_json::Value = response.json().await?;
    let answer = json
        .pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .context("invalid answer response: missing message content")?;

    Ok(answer.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Passage;

    fn scored(text: &str, ordinal: usize) -> ScoredPassage {
        ScoredPassage {
            passage: Passage {
                id: format!("p{}", ordinal),
                document_id: "doc1".to_string(),
                ordinal,
                text: text.to_string(),
                overlap: 0,
                hash: String::new(),
            },
            distance: ordinal as f32,
        }
    }

    #[test]
    fn test_build_context_empty() {
        assert_eq!(build_context(&[]), "No document context available.");
    }

    #[test]
    fn test_build_context_joins_passages() {
        let passages = vec![scored("Section 1 text.", 0), scored("Section 2 text.", 1)];
        let context = build_context(&passages);
        assert_eq!(context, "Section 1 text.\n\nSection 2 text.");
    }
}
