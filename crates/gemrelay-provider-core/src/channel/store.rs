use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ChannelId, ChannelStatus, ChannelStatusStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRecord {
    pub status: ChannelStatus,
    pub reason: String,
}

/// In-process status store for single-node setups and tests. Only channels
/// that were registered can be updated.
#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    channels: RwLock<HashMap<ChannelId, ChannelRecord>>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, channel_id: ChannelId, status: ChannelStatus) {
        self.channels.write().await.insert(
            channel_id,
            ChannelRecord {
                status,
                reason: String::new(),
            },
        );
    }

    pub async fn get(&self, channel_id: ChannelId) -> Option<ChannelRecord> {
        self.channels.read().await.get(&channel_id).cloned()
    }
}

#[async_trait]
impl ChannelStatusStore for MemoryStatusStore {
    async fn update_channel_status(
        &self,
        channel_id: ChannelId,
        _using_key: &str,
        status: ChannelStatus,
        reason: &str,
    ) -> bool {
        let mut channels = self.channels.write().await;
        let Some(record) = channels.get_mut(&channel_id) else {
            return false;
        };
        // A manual disable is an operator decision; automation leaves it alone.
        if record.status == ChannelStatus::ManuallyDisabled {
            return false;
        }
        record.status = status;
        record.reason = reason.to_string();
        true
    }
}
