mod keywords;
mod policy;
mod quota;
mod service;
mod store;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use keywords::{KeywordError, KeywordSet};
pub use policy::HealthPolicy;
pub use quota::{
    GEMINI_PERMANENT_QUOTA_MESSAGE, GeminiQuotaMatcher, QuotaMatcher, QuotaMatcherRegistry,
    QuotaVerdict,
};
pub use service::{ChannelHealth, TransitionOutcome, dedupe_key};
pub use store::{ChannelRecord, MemoryStatusStore};

pub type ChannelId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ChannelStatus {
    Unknown = 0,
    Enabled = 1,
    ManuallyDisabled = 2,
    AutoDisabled = 3,
}

impl ChannelStatus {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for ChannelStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ChannelStatus::Unknown),
            1 => Ok(ChannelStatus::Enabled),
            2 => Ok(ChannelStatus::ManuallyDisabled),
            3 => Ok(ChannelStatus::AutoDisabled),
            other => Err(format!("unknown channel status {other}")),
        }
    }
}

impl From<ChannelStatus> for u8 {
    fn from(value: ChannelStatus) -> Self {
        value.code()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    Gemini,
    #[serde(rename = "vertexai")]
    VertexAi,
    Custom,
}

impl ChannelType {
    /// Providers that answer 403 when a key's quota or permission is gone
    /// for good rather than for a single request.
    pub fn forbidden_means_exhausted(self) -> bool {
        matches!(self, ChannelType::Gemini)
    }
}

/// Identity of the channel a failure came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelError {
    pub channel_id: ChannelId,
    pub channel_name: String,
    /// Key in use for multi-key channels.
    #[serde(default)]
    pub using_key: String,
    pub auto_ban: bool,
}

/// Persists channel status transitions.
#[async_trait]
pub trait ChannelStatusStore: Send + Sync {
    /// Returns false when nothing was persisted.
    async fn update_channel_status(
        &self,
        channel_id: ChannelId,
        using_key: &str,
        status: ChannelStatus,
        reason: &str,
    ) -> bool;
}
