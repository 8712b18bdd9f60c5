use std::collections::HashMap;
use std::sync::Arc;

use super::ChannelType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaVerdict {
    /// The key's quota is gone until billing changes.
    Permanent,
    /// Rate or per-minute limits; the key recovers on its own.
    Transient,
    Unknown,
}

/// Provider-specific reading of quota error messages.
pub trait QuotaMatcher: Send + Sync {
    fn channel_type(&self) -> ChannelType;

    fn classify(&self, message: &str) -> QuotaVerdict;
}

pub const GEMINI_PERMANENT_QUOTA_MESSAGE: &str = "You exceeded your current quota, please check your plan and billing details. For more information on this error, head to: https://ai.google.dev/gemini-api/docs/rate-limits.";

const GEMINI_QUOTA_PREFIX: &str = "You exceeded your current quota";

/// Gemini sends the same lead sentence for exhausted billing and for
/// per-metric rate limits; only the bare sentence means exhaustion.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeminiQuotaMatcher;

impl QuotaMatcher for GeminiQuotaMatcher {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Gemini
    }

    fn classify(&self, message: &str) -> QuotaVerdict {
        let message = message.trim();
        if message == GEMINI_PERMANENT_QUOTA_MESSAGE {
            QuotaVerdict::Permanent
        } else if message.starts_with(GEMINI_QUOTA_PREFIX) {
            QuotaVerdict::Transient
        } else {
            QuotaVerdict::Unknown
        }
    }
}

#[derive(Default, Clone)]
pub struct QuotaMatcherRegistry {
    matchers: HashMap<ChannelType, Arc<dyn QuotaMatcher>>,
}

impl QuotaMatcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in matcher.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(GeminiQuotaMatcher));
        registry
    }

    pub fn register(&mut self, matcher: Arc<dyn QuotaMatcher>) {
        self.matchers.insert(matcher.channel_type(), matcher);
    }

    pub fn classify(&self, channel_type: ChannelType, message: &str) -> QuotaVerdict {
        self.matchers
            .get(&channel_type)
            .map(|matcher| matcher.classify(message))
            .unwrap_or(QuotaVerdict::Unknown)
    }
}
