use std::sync::Arc;

use tracing::{info, warn};

use super::{
    ChannelError, ChannelId, ChannelStatus, ChannelStatusStore, ChannelType, HealthPolicy,
};
use crate::errors::RelayError;
use crate::notify::{Notification, NotifyHub};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Status persisted and the operator notified.
    Applied,
    /// The channel opted out of automatic disabling.
    AutoBanOff,
    /// The store refused the update; nobody was notified.
    PersistFailed,
}

/// Applies health decisions: persists transitions and tells the operator.
#[derive(Clone)]
pub struct ChannelHealth {
    policy: HealthPolicy,
    store: Arc<dyn ChannelStatusStore>,
    notify: NotifyHub,
}

impl ChannelHealth {
    pub fn new(
        policy: HealthPolicy,
        store: Arc<dyn ChannelStatusStore>,
        notify: NotifyHub,
    ) -> Self {
        Self {
            policy,
            store,
            notify,
        }
    }

    pub fn policy(&self) -> &HealthPolicy {
        &self.policy
    }

    pub async fn disable(&self, channel: &ChannelError, reason: &str) -> TransitionOutcome {
        warn!(
            event = "channel_disable_requested",
            channel_id = channel.channel_id,
            channel_name = %channel.channel_name,
            reason = %reason,
        );
        if !channel.auto_ban {
            info!(
                event = "channel_disable_skipped",
                channel_id = channel.channel_id,
                channel_name = %channel.channel_name,
                "automatic disabling is off for this channel"
            );
            return TransitionOutcome::AutoBanOff;
        }

        let status = ChannelStatus::AutoDisabled;
        if !self
            .store
            .update_channel_status(channel.channel_id, &channel.using_key, status, reason)
            .await
        {
            warn!(
                event = "channel_status_persist_failed",
                channel_id = channel.channel_id,
                status = status.code(),
            );
            return TransitionOutcome::PersistFailed;
        }

        info!(event = "channel_disabled", channel_id = channel.channel_id, reason = %reason);
        let subject = format!(
            "Channel \"{}\" (#{}) has been disabled",
            channel.channel_name, channel.channel_id
        );
        let body = format!("{subject}, reason: {reason}");
        self.notify
            .notify(Notification::new(
                dedupe_key(channel.channel_id, status),
                subject,
                body,
            ))
            .await;
        TransitionOutcome::Applied
    }

    pub async fn enable(
        &self,
        channel_id: ChannelId,
        using_key: &str,
        channel_name: &str,
    ) -> TransitionOutcome {
        let status = ChannelStatus::Enabled;
        if !self
            .store
            .update_channel_status(channel_id, using_key, status, "")
            .await
        {
            warn!(
                event = "channel_status_persist_failed",
                channel_id,
                status = status.code(),
            );
            return TransitionOutcome::PersistFailed;
        }

        info!(event = "channel_enabled", channel_id);
        let subject = format!("Channel \"{channel_name}\" (#{channel_id}) has been enabled");
        self.notify
            .notify(Notification::new(
                dedupe_key(channel_id, status),
                subject.clone(),
                subject,
            ))
            .await;
        TransitionOutcome::Applied
    }

    /// Feeds one request result through the policy and applies whichever
    /// transition it calls for. Returns `None` when no transition applies.
    pub async fn observe(
        &self,
        channel_type: ChannelType,
        channel: &ChannelError,
        current: ChannelStatus,
        error: Option<&RelayError>,
    ) -> Option<TransitionOutcome> {
        if let Some(err) = error {
            if self.policy.should_disable(channel_type, Some(err)) {
                return Some(self.disable(channel, &err.message).await);
            }
        }
        if self.policy.should_enable(error, current) {
            return Some(
                self.enable(channel.channel_id, &channel.using_key, &channel.channel_name)
                    .await,
            );
        }
        None
    }
}

pub fn dedupe_key(channel_id: ChannelId, status: ChannelStatus) -> String {
    format!("channel_update_{channel_id}_{}", status.code())
}
