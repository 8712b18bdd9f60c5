use gemrelay_common::RelayConfig;

use super::{
    ChannelStatus, ChannelType, KeywordError, KeywordSet, QuotaMatcherRegistry, QuotaVerdict,
};
use crate::errors::RelayError;

const DISABLING_CODES: &[&str] = &[
    "invalid_api_key",
    "account_deactivated",
    "billing_not_active",
    "pre_consume_token_quota_failed",
];

const DISABLING_TYPES: &[&str] = &[
    "insufficient_quota",
    "insufficient_user_quota",
    "authentication_error",
    "permission_error",
    "forbidden",
];

/// Decides when a channel leaves or re-enters rotation.
#[derive(Clone)]
pub struct HealthPolicy {
    automatic_disable: bool,
    automatic_enable: bool,
    keywords: KeywordSet,
    quota: QuotaMatcherRegistry,
}

impl HealthPolicy {
    pub fn new(config: &RelayConfig) -> Result<Self, KeywordError> {
        Ok(Self {
            automatic_disable: config.automatic_disable_enabled,
            automatic_enable: config.automatic_enable_enabled,
            keywords: KeywordSet::new(&config.disable_keywords)?,
            quota: QuotaMatcherRegistry::builtin(),
        })
    }

    pub fn with_quota_matchers(mut self, quota: QuotaMatcherRegistry) -> Self {
        self.quota = quota;
        self
    }

    pub fn should_disable(&self, channel_type: ChannelType, error: Option<&RelayError>) -> bool {
        if !self.automatic_disable {
            return false;
        }
        let Some(error) = error else {
            return false;
        };
        if error.channel_error {
            return true;
        }
        if error.skip_retry {
            return false;
        }
        match error.status {
            401 => return true,
            403 if channel_type.forbidden_means_exhausted() => return true,
            _ => {}
        }
        if DISABLING_CODES.contains(&error.code.as_str()) {
            return true;
        }
        if DISABLING_TYPES.contains(&error.error_type()) {
            return true;
        }
        if self.quota.classify(channel_type, &error.message) == QuotaVerdict::Permanent {
            return true;
        }
        self.keywords.contains_any(&error.message)
    }

    /// Only channels this policy disabled come back automatically.
    pub fn should_enable(&self, error: Option<&RelayError>, status: ChannelStatus) -> bool {
        self.automatic_enable && error.is_none() && status == ChannelStatus::AutoDisabled
    }
}
