use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use gemrelay_common::{RelayConfig, RelayConfigPatch};
use gemrelay_provider_core::channel::GEMINI_PERMANENT_QUOTA_MESSAGE;
use gemrelay_provider_core::{
    ChannelError, ChannelHealth, ChannelId, ChannelStatus, ChannelStatusStore, ChannelType,
    HealthPolicy, MemoryStatusStore, NotifyHub, RelayError, TransitionOutcome,
};

#[derive(Default)]
struct RecordingStore {
    accept: bool,
    calls: Mutex<Vec<(ChannelId, String, ChannelStatus, String)>>,
}

impl RecordingStore {
    fn accepting() -> Self {
        Self {
            accept: true,
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<(ChannelId, String, ChannelStatus, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChannelStatusStore for RecordingStore {
    async fn update_channel_status(
        &self,
        channel_id: ChannelId,
        using_key: &str,
        status: ChannelStatus,
        reason: &str,
    ) -> bool {
        self.calls.lock().unwrap().push((
            channel_id,
            using_key.to_string(),
            status,
            reason.to_string(),
        ));
        self.accept
    }
}

fn policy() -> HealthPolicy {
    HealthPolicy::new(&RelayConfig::default()).unwrap()
}

fn channel(auto_ban: bool) -> ChannelError {
    ChannelError {
        channel_id: 7,
        channel_name: "gemini-main".to_string(),
        using_key: "key-2".to_string(),
        auto_ban,
    }
}

#[test]
fn disables_on_unauthorized() {
    let err = RelayError::upstream(401, "", "API key not valid");
    assert!(policy().should_disable(ChannelType::OpenAi, Some(&err)));
}

#[test]
fn forbidden_only_disables_gemini() {
    let err = RelayError::upstream(403, "", "caller does not have permission");
    assert!(policy().should_disable(ChannelType::Gemini, Some(&err)));
    assert!(!policy().should_disable(ChannelType::OpenAi, Some(&err)));
}

#[test]
fn nothing_to_judge() {
    assert!(!policy().should_disable(ChannelType::Gemini, None));

    let config = RelayConfigPatch {
        automatic_disable_enabled: Some(false),
        ..Default::default()
    }
    .into_config();
    let off = HealthPolicy::new(&config).unwrap();
    let err = RelayError::upstream(401, "", "unauthorized");
    assert!(!off.should_disable(ChannelType::Gemini, Some(&err)));
}

#[test]
fn channel_error_beats_skip_retry() {
    let err = RelayError::upstream(400, "", "broken")
        .with_skip_retry()
        .with_channel_error();
    assert!(policy().should_disable(ChannelType::OpenAi, Some(&err)));

    let filtered = RelayError::content_filtered("SAFETY");
    assert!(!policy().should_disable(ChannelType::Gemini, Some(&filtered)));

    let skipped = RelayError::upstream(401, "", "unauthorized").with_skip_retry();
    assert!(!policy().should_disable(ChannelType::Gemini, Some(&skipped)));
}

#[test]
fn disabling_codes_and_types() {
    let by_code = RelayError::upstream(400, "billing_not_active", "billing");
    assert!(policy().should_disable(ChannelType::OpenAi, Some(&by_code)));

    let by_type = RelayError::upstream(429, "", "out of credits").with_error_type("insufficient_quota");
    assert!(policy().should_disable(ChannelType::OpenAi, Some(&by_type)));

    let neither = RelayError::upstream(500, "server_error", "boom").with_error_type("api_error");
    assert!(!policy().should_disable(ChannelType::OpenAi, Some(&neither)));
}

#[test]
fn gemini_quota_exact_match() {
    let permanent = RelayError::upstream(429, "", GEMINI_PERMANENT_QUOTA_MESSAGE);
    assert!(policy().should_disable(ChannelType::Gemini, Some(&permanent)));

    let transient = RelayError::upstream(
        429,
        "",
        format!(
            "{GEMINI_PERMANENT_QUOTA_MESSAGE}\n* Quota exceeded for metric: generativelanguage.googleapis.com/generate_content_free_tier_requests, limit: 10"
        ),
    );
    assert!(!policy().should_disable(ChannelType::Gemini, Some(&transient)));

    // Other providers never get the exact-match treatment.
    assert!(!policy().should_disable(ChannelType::OpenAi, Some(&permanent)));
}

#[test]
fn keyword_fallback_is_case_insensitive() {
    let err = RelayError::upstream(400, "", "Upstream: YOUR CREDIT BALANCE IS TOO LOW to continue");
    assert!(policy().should_disable(ChannelType::Anthropic, Some(&err)));
}

#[test]
fn enable_only_from_auto_disabled() {
    let policy = policy();
    assert!(policy.should_enable(None, ChannelStatus::AutoDisabled));
    assert!(!policy.should_enable(None, ChannelStatus::Enabled));
    assert!(!policy.should_enable(None, ChannelStatus::ManuallyDisabled));
    assert!(!policy.should_enable(None, ChannelStatus::Unknown));
    let err = RelayError::empty_stream();
    assert!(!policy.should_enable(Some(&err), ChannelStatus::AutoDisabled));
}

#[tokio::test]
async fn disable_without_auto_ban_has_no_effects() {
    let store = Arc::new(RecordingStore::accepting());
    let hub = NotifyHub::new(8);
    let mut notifications = hub.subscribe();
    let health = ChannelHealth::new(policy(), store.clone(), hub);

    let outcome = health.disable(&channel(false), "invalid key").await;

    assert_eq!(outcome, TransitionOutcome::AutoBanOff);
    assert!(store.calls().is_empty());
    assert!(notifications.try_recv().is_err());
}

#[tokio::test]
async fn disable_persists_then_notifies() {
    let store = Arc::new(RecordingStore::accepting());
    let hub = NotifyHub::new(8);
    let mut notifications = hub.subscribe();
    let health = ChannelHealth::new(policy(), store.clone(), hub);

    let outcome = health.disable(&channel(true), "invalid key").await;

    assert_eq!(outcome, TransitionOutcome::Applied);
    assert_eq!(
        store.calls(),
        vec![(
            7,
            "key-2".to_string(),
            ChannelStatus::AutoDisabled,
            "invalid key".to_string()
        )]
    );
    let notification = tokio::time::timeout(Duration::from_secs(1), notifications.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(notification.dedupe_key, "channel_update_7_3");
    assert!(notification.body.contains("invalid key"));
}

#[tokio::test]
async fn failed_persist_suppresses_notification() {
    let store = Arc::new(RecordingStore::default());
    let hub = NotifyHub::new(8);
    let mut notifications = hub.subscribe();
    let health = ChannelHealth::new(policy(), store.clone(), hub);

    assert_eq!(
        health.disable(&channel(true), "invalid key").await,
        TransitionOutcome::PersistFailed
    );
    assert_eq!(
        health.enable(7, "key-2", "gemini-main").await,
        TransitionOutcome::PersistFailed
    );
    assert_eq!(store.calls().len(), 2);
    assert!(notifications.try_recv().is_err());
}

#[tokio::test]
async fn observe_round_trip_with_memory_store() {
    let store = Arc::new(MemoryStatusStore::new());
    store.insert(7, ChannelStatus::Enabled).await;
    let hub = NotifyHub::new(8);
    let mut notifications = hub.subscribe();
    let health = ChannelHealth::new(policy(), store.clone(), hub);
    let channel = channel(true);

    let err = RelayError::upstream(401, "", "API key expired");
    let outcome = health
        .observe(ChannelType::Gemini, &channel, ChannelStatus::Enabled, Some(&err))
        .await;
    assert_eq!(outcome, Some(TransitionOutcome::Applied));
    let record = store.get(7).await.unwrap();
    assert_eq!(record.status, ChannelStatus::AutoDisabled);
    assert_eq!(record.reason, "API key expired");

    let outcome = health
        .observe(ChannelType::Gemini, &channel, record.status, None)
        .await;
    assert_eq!(outcome, Some(TransitionOutcome::Applied));
    assert_eq!(store.get(7).await.unwrap().status, ChannelStatus::Enabled);

    let first = notifications.recv().await.unwrap();
    let second = notifications.recv().await.unwrap();
    assert_eq!(first.dedupe_key, "channel_update_7_3");
    assert_eq!(second.dedupe_key, "channel_update_7_1");

    let outcome = health
        .observe(ChannelType::Gemini, &channel, ChannelStatus::Enabled, None)
        .await;
    assert_eq!(outcome, None);
}

#[tokio::test]
async fn memory_store_keeps_manual_disable() {
    let store = MemoryStatusStore::new();
    store.insert(3, ChannelStatus::ManuallyDisabled).await;
    assert!(
        !store
            .update_channel_status(3, "", ChannelStatus::Enabled, "")
            .await
    );
    assert!(
        !store
            .update_channel_status(99, "", ChannelStatus::Enabled, "")
            .await
    );
}
