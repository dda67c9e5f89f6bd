//! LLM-backed implementation of the reasoning judgements
//!
//! Builds a system + user prompt per judgement, calls the chat client with
//! model fallback, and extracts the first JSON object from the response text.

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};
use crate::llm::{LlmClient, Message};

use super::{
    ConceptBrief, DuplicateVerdict, EffortEstimates, EstimateInput, PathVerdict, ReasoningService,
};

const DUPLICATE_SYSTEM_PROMPT: &str = r#"You check whether a candidate learning concept is a semantic duplicate of any concept in an existing set. Two concepts are duplicates when a learner would study the same material under either name, even if the wording differs.

Respond with only a JSON object:
{"isDuplicate": bool, "reason": "one sentence", "matchedTitle": "title of the matched existing concept, omit if none"}"#;

const PATH_SYSTEM_PROMPT: &str = r#"You judge whether one learning concept is a sound prerequisite for another. The relation "A -> B" asserts a learner should study A before B. Judge pedagogical soundness: does A provide knowledge B builds on? Reversed orderings and unrelated pairs are not sound.

Respond with only a JSON object:
{"isValid": bool, "reason": "one sentence", "recommendation": "optional fix, omit if valid"}"#;

const ESTIMATE_SYSTEM_PROMPT: &str = r#"You estimate how many hours of focused study each learning concept needs for a motivated beginner. Use the title and description; typical concepts take 1 to 6 hours.

Respond with only a JSON object:
{"nodes": [{"id": "node id", "estimatedHours": number}], "suggestedDailyHours": number}"#;

/// Production reasoning service backed by the chat client
#[derive(Debug, Clone)]
pub struct LlmReasoner {
    client: LlmClient,
}

impl LlmReasoner {
    /// Create a reasoner over an existing chat client
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }

    async fn ask(&self, system: &str, user: String) -> Result<String> {
        let messages = vec![Message::system(system), Message::user(user)];
        let response = self.client.complete_with_fallback(messages).await?;
        debug!(tokens = response.tokens_used, model = %response.model, "Reasoning response received");
        Ok(response.content)
    }
}

#[async_trait]
impl ReasoningService for LlmReasoner {
    async fn check_duplicate(
        &self,
        candidate: &ConceptBrief,
        existing: &[ConceptBrief],
    ) -> Result<DuplicateVerdict> {
        let user = format!(
            "Candidate concept:\n{}\n\nExisting concepts:\n{}",
            serde_json::to_string(candidate)
                .map_err(|e| Error::Other(format!("Failed to serialize candidate: {}", e)))?,
            serde_json::to_string(existing)
                .map_err(|e| Error::Other(format!("Failed to serialize existing set: {}", e)))?,
        );

        let content = self.ask(DUPLICATE_SYSTEM_PROMPT, user).await?;
        parse_json_object(&content)
    }

    async fn judge_path(&self, from: &str, to: &str) -> Result<PathVerdict> {
        let user = format!(
            "Prerequisite relation to judge: learn \"{}\" before \"{}\".",
            from, to
        );

        let content = self.ask(PATH_SYSTEM_PROMPT, user).await?;
        parse_json_object(&content)
    }

    async fn estimate_effort(&self, nodes: &[EstimateInput]) -> Result<EffortEstimates> {
        let user = format!(
            "Concepts to estimate:\n{}",
            serde_json::to_string(nodes)
                .map_err(|e| Error::Other(format!("Failed to serialize nodes: {}", e)))?,
        );

        let content = self.ask(ESTIMATE_SYSTEM_PROMPT, user).await?;
        parse_json_object(&content)
    }
}

/// Extract and parse the first JSON object embedded in model output.
///
/// Models frequently wrap the object in prose or a code fence; slice from the
/// first '{' to the last '}' before parsing.
fn parse_json_object<T: serde::de::DeserializeOwned>(response: &str) -> Result<T> {
    let json_start = response.find('{');
    let json_end = response.rfind('}');

    if let (Some(start), Some(end)) = (json_start, json_end)
        && start < end
    {
        let json_str = &response[start..=end];
        return serde_json::from_str(json_str).map_err(|e| {
            Error::ReasonerError(format!("Malformed verdict from reasoning service: {}", e))
        });
    }

    Err(Error::ReasonerError(
        "No JSON object in reasoning service response".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_json() {
        let verdict: PathVerdict =
            parse_json_object(r#"{"isValid": true, "reason": "sound"}"#).unwrap();
        assert!(verdict.is_valid);
    }

    #[test]
    fn test_parse_json_wrapped_in_prose() {
        let response = r#"Here is my judgement:
```json
{"isValid": false, "reason": "reversed", "recommendation": "swap"}
```
Let me know if you need more."#;

        let verdict: PathVerdict = parse_json_object(response).unwrap();
        assert!(!verdict.is_valid);
        assert_eq!(verdict.recommendation.as_deref(), Some("swap"));
    }

    #[test]
    fn test_parse_no_json_is_error() {
        let result: Result<PathVerdict> = parse_json_object("I cannot judge that.");
        assert!(matches!(result, Err(Error::ReasonerError(_))));
    }

    #[test]
    fn test_parse_malformed_json_is_error() {
        let result: Result<PathVerdict> = parse_json_object(r#"{"isValid": maybe}"#);
        assert!(matches!(result, Err(Error::ReasonerError(_))));
    }

    #[test]
    fn test_prompts_demand_json() {
        assert!(DUPLICATE_SYSTEM_PROMPT.contains("isDuplicate"));
        assert!(PATH_SYSTEM_PROMPT.contains("isValid"));
        assert!(ESTIMATE_SYSTEM_PROMPT.contains("estimatedHours"));
    }
}
