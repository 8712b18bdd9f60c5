use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::gemini::generate_content::types::{Candidate, PromptFeedback, UsageMetadata};
use crate::gemini::types::Part;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<Candidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<PromptFeedback>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<UsageMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
}

impl GenerateContentResponse {
    pub fn is_blocked(&self) -> bool {
        self.prompt_feedback
            .as_ref()
            .is_some_and(PromptFeedback::is_blocked)
    }

    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
    }

    pub fn parts(&self) -> impl Iterator<Item = &Part> {
        self.candidates
            .iter()
            .flat_map(|candidate| candidate.content.parts.iter())
    }

    /// A chunk that only announces reasoning: every part is a thought without
    /// any payload, nothing is blocked and no usage has been reported yet.
    ///
    /// Gemini emits these ahead of a safety block as often as ahead of a real
    /// answer, so the relay cannot tell them apart from this chunk alone.
    pub fn is_empty_thought(&self) -> bool {
        let mut parts = self.parts().peekable();
        if parts.peek().is_none() {
            return false;
        }
        if !parts.all(|part| part.is_thought() && !part.has_payload()) {
            return false;
        }
        if self.is_blocked() {
            return false;
        }
        self.usage_metadata
            .as_ref()
            .is_none_or(|usage| usage.total() == 0)
    }
}

/// Checks the raw body for a `usageMetadata` object without a
/// `candidatesTokenCount` key.
///
/// Presence is checked on the untyped document because a typed parse cannot
/// tell an absent count from an explicit zero.
pub fn lacks_candidates_token_count(body: &[u8]) -> bool {
    let Ok(JsonValue::Object(root)) = serde_json::from_slice::<JsonValue>(body) else {
        return false;
    };
    match root.get("usageMetadata") {
        Some(JsonValue::Object(usage)) => !usage.contains_key("candidatesTokenCount"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> GenerateContentResponse {
        serde_json::from_str(raw).expect("valid envelope")
    }

    #[test]
    fn blocked_prompt_feedback() {
        let response = parse(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#);
        assert!(response.is_blocked());
        assert_eq!(response.block_reason(), Some("SAFETY"));

        let response = parse(r#"{"promptFeedback":{"safetyRatings":[]}}"#);
        assert!(!response.is_blocked());
    }

    #[test]
    fn empty_thought_chunk() {
        let response = parse(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"thought":true,"text":""}]}}]}"#,
        );
        assert!(response.is_empty_thought());

        let response = parse(
            r#"{"candidates":[{"content":{"parts":[{"thought":true}]}}],
                "usageMetadata":{"promptTokenCount":4,"totalTokenCount":0}}"#,
        );
        assert!(response.is_empty_thought());
    }

    #[test]
    fn thought_with_text_is_not_empty() {
        let response = parse(
            r#"{"candidates":[{"content":{"parts":[{"thought":true,"text":"thinking"}]}}]}"#,
        );
        assert!(!response.is_empty_thought());
    }

    #[test]
    fn reported_usage_is_not_empty_thought() {
        let response = parse(
            r#"{"candidates":[{"content":{"parts":[{"thought":true}]}}],
                "usageMetadata":{"totalTokenCount":12}}"#,
        );
        assert!(!response.is_empty_thought());
    }

    #[test]
    fn no_parts_is_not_empty_thought() {
        assert!(!parse(r#"{"candidates":[]}"#).is_empty_thought());
        assert!(!parse(r#"{"candidates":[{"content":{"parts":[]}}]}"#).is_empty_thought());
    }

    #[test]
    fn mixed_parts_are_not_empty_thought() {
        let response = parse(
            r#"{"candidates":[{"content":{"parts":[{"thought":true},{"text":"hi"}]}}]}"#,
        );
        assert!(!response.is_empty_thought());
    }

    #[test]
    fn detects_missing_candidates_token_count() {
        assert!(lacks_candidates_token_count(
            br#"{"usageMetadata":{"promptTokenCount":3,"totalTokenCount":3}}"#
        ));
        assert!(!lacks_candidates_token_count(
            br#"{"usageMetadata":{"candidatesTokenCount":0}}"#
        ));
        assert!(!lacks_candidates_token_count(br#"{"candidates":[]}"#));
        assert!(!lacks_candidates_token_count(b"not json"));
    }

    #[test]
    fn unknown_modality_still_parses() {
        let response = parse(
            r#"{"usageMetadata":{"promptTokensDetails":[{"modality":"HOLOGRAM","tokenCount":2}]}}"#,
        );
        let details = response
            .usage_metadata
            .and_then(|usage| usage.prompt_tokens_details)
            .expect("details");
        assert_eq!(details[0].token_count, 2);
    }
}
