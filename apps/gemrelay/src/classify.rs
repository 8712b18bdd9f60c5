use std::error::Error;
use std::sync::Arc;

use gemrelay_common::RelayConfig;
use gemrelay_provider_core::{
    ChannelError, ChannelHealth, ChannelStatus, ChannelType, DEFAULT_DEDUPE_WINDOW, HealthPolicy,
    MemoryStatusStore, NotificationSink, NotifyHub, RelayError, TerminalNotificationSink,
    TransitionOutcome,
};
use serde::{Deserialize, Serialize};

use crate::cli::ClassifyArgs;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassifyInput {
    channel_type: ChannelType,
    channel: ChannelError,
    status: ChannelStatus,
    #[serde(default)]
    error: Option<RelayError>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClassifyReport {
    should_disable: bool,
    should_enable: bool,
    transition: Option<&'static str>,
    status: Option<ChannelStatus>,
}

pub(crate) async fn run(
    config: &RelayConfig,
    args: ClassifyArgs,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let raw = tokio::fs::read(&args.file).await?;
    let input: ClassifyInput = serde_json::from_slice(&raw)?;
    let report = evaluate(config, input).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn evaluate(
    config: &RelayConfig,
    input: ClassifyInput,
) -> Result<ClassifyReport, Box<dyn Error + Send + Sync>> {
    let policy = HealthPolicy::new(config)?;
    let should_disable = policy.should_disable(input.channel_type, input.error.as_ref());
    let should_enable = policy.should_enable(input.error.as_ref(), input.status);

    let store = Arc::new(MemoryStatusStore::new());
    store.insert(input.channel.channel_id, input.status).await;
    let hub = NotifyHub::with_dedupe_window(8, DEFAULT_DEDUPE_WINDOW);
    let mut notifications = hub.subscribe();
    let health = ChannelHealth::new(policy, store.clone(), hub);

    let transition = health
        .observe(
            input.channel_type,
            &input.channel,
            input.status,
            input.error.as_ref(),
        )
        .await
        .map(|outcome| match outcome {
            TransitionOutcome::Applied => "applied",
            TransitionOutcome::AutoBanOff => "auto_ban_off",
            TransitionOutcome::PersistFailed => "persist_failed",
        });

    let terminal = TerminalNotificationSink::new();
    while let Ok(notification) = notifications.try_recv() {
        terminal.deliver(&notification).await;
    }

    let status = store
        .get(input.channel.channel_id)
        .await
        .map(|record| record.status);
    Ok(ClassifyReport {
        should_disable,
        should_enable,
        transition,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(raw: &str) -> ClassifyInput {
        serde_json::from_str(raw).unwrap()
    }

    #[tokio::test]
    async fn disables_gemini_on_forbidden() {
        let report = evaluate(
            &RelayConfig::default(),
            input(
                r#"{"channelType":"gemini","status":1,
                    "channel":{"channelId":4,"channelName":"g","autoBan":true},
                    "error":{"statusCode":403,"code":"","message":"PERMISSION_DENIED"}}"#,
            ),
        )
        .await
        .unwrap();
        assert!(report.should_disable);
        assert_eq!(report.transition, Some("applied"));
        assert_eq!(report.status, Some(ChannelStatus::AutoDisabled));
    }

    #[tokio::test]
    async fn success_restores_auto_disabled_channel() {
        let report = evaluate(
            &RelayConfig::default(),
            input(
                r#"{"channelType":"openai","status":3,
                    "channel":{"channelId":5,"channelName":"o","autoBan":false}}"#,
            ),
        )
        .await
        .unwrap();
        assert!(!report.should_disable);
        assert!(report.should_enable);
        assert_eq!(report.status, Some(ChannelStatus::Enabled));
    }
}
