use serde::{Deserialize, Serialize};

use gemrelay_protocol::gemini::{Modality, UsageMetadata};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionDetails {
    pub reasoning_tokens: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptDetails {
    pub audio_tokens: u32,
    pub text_tokens: u32,
}

/// Normalized token usage of one request.
///
/// `completion_tokens` includes reasoning; `completion_details` breaks the
/// reasoning share out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub completion_details: CompletionDetails,
    pub prompt_details: PromptDetails,
}

impl UsageRecord {
    pub fn from_gemini(usage: &UsageMetadata) -> Self {
        let mut record = Self::default();
        record.apply_gemini(usage);
        record
    }

    /// Overwrites this record with the provider's counts. Applying the same
    /// envelope twice yields the same record.
    pub fn apply_gemini(&mut self, usage: &UsageMetadata) {
        let candidates = usage.candidates_token_count.unwrap_or(0);
        let thoughts = usage.thoughts_token_count.unwrap_or(0);

        self.prompt_tokens = usage.prompt_token_count.unwrap_or(0);
        self.completion_tokens = candidates.saturating_add(thoughts);
        self.total_tokens = usage.total();
        self.completion_details.reasoning_tokens = thoughts;

        self.prompt_details = PromptDetails::default();
        for detail in usage.prompt_tokens_details.iter().flatten() {
            match detail.modality {
                Modality::Audio => self.prompt_details.audio_tokens = detail.token_count,
                Modality::Text => self.prompt_details.text_tokens = detail.token_count,
                _ => {}
            }
        }
    }

    /// Prompt-only usage, as reported for embeddings.
    pub fn prompt_only(prompt_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            total_tokens: prompt_tokens,
            ..Self::default()
        }
    }

    pub fn estimated(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
            ..Self::default()
        }
    }
}
