use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock, broadcast};
use tracing::debug;

use super::types::Notification;

pub trait NotificationSink: Send + Sync {
    fn deliver<'a>(
        &'a self,
        notification: &'a Notification,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

/// Window used by gateways that want repeated channel updates collapsed.
pub const DEFAULT_DEDUPE_WINDOW: Duration = Duration::from_secs(10 * 60);

/// Fan-out point for operator notifications.
///
/// `notify` never waits on delivery: subscribers get the message over a
/// broadcast channel and every registered sink runs on its own task. With a
/// dedupe window set, a notification whose `dedupe_key` was already sent
/// inside the window is dropped.
#[derive(Clone)]
pub struct NotifyHub {
    inner: Arc<Inner>,
}

struct Inner {
    tx: broadcast::Sender<Notification>,
    sinks: RwLock<Vec<Arc<dyn NotificationSink>>>,
    dedupe_window: Option<Duration>,
    last_sent: Mutex<HashMap<String, Instant>>,
}

impl NotifyHub {
    pub fn new(buffer: usize) -> Self {
        Self::build(buffer, None)
    }

    pub fn with_dedupe_window(buffer: usize, window: Duration) -> Self {
        Self::build(buffer, Some(window))
    }

    fn build(buffer: usize, dedupe_window: Option<Duration>) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self {
            inner: Arc::new(Inner {
                tx,
                sinks: RwLock::new(Vec::new()),
                dedupe_window,
                last_sent: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.inner.tx.subscribe()
    }

    pub async fn add_sink(&self, sink: Arc<dyn NotificationSink>) {
        self.inner.sinks.write().await.push(sink);
    }

    /// Returns `false` when the notification was collapsed into an earlier
    /// one with the same key.
    pub async fn notify(&self, notification: Notification) -> bool {
        if !self.admit(&notification.dedupe_key).await {
            debug!(
                event = "notification_collapsed",
                dedupe_key = %notification.dedupe_key,
            );
            return false;
        }
        let _ = self.inner.tx.send(notification.clone());
        let sinks = self.inner.sinks.read().await.clone();
        for sink in sinks {
            let notification = notification.clone();
            tokio::spawn(async move {
                sink.deliver(&notification).await;
            });
        }
        true
    }

    async fn admit(&self, key: &str) -> bool {
        let Some(window) = self.inner.dedupe_window else {
            return true;
        };
        let now = Instant::now();
        let mut last_sent = self.inner.last_sent.lock().await;
        last_sent.retain(|_, sent| now.duration_since(*sent) < window);
        if last_sent.contains_key(key) {
            return false;
        }
        last_sent.insert(key.to_string(), now);
        true
    }
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    struct ForwardSink(mpsc::UnboundedSender<String>);

    impl NotificationSink for ForwardSink {
        fn deliver<'a>(
            &'a self,
            notification: &'a Notification,
        ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
            Box::pin(async move {
                let _ = self.0.send(notification.dedupe_key.clone());
            })
        }
    }

    #[tokio::test]
    async fn fans_out_to_subscribers_and_sinks() {
        let hub = NotifyHub::new(8);
        let mut sub = hub.subscribe();
        let (tx, mut rx) = mpsc::unbounded_channel();
        hub.add_sink(Arc::new(ForwardSink(tx))).await;

        assert!(
            hub.notify(Notification::new("channel_update_1_3", "s", "b"))
                .await
        );

        let seen = tokio::time::timeout(Duration::from_secs(1), sub.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(seen.dedupe_key, "channel_update_1_3");
        let delivered = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert_eq!(delivered.as_deref(), Some("channel_update_1_3"));
    }

    #[tokio::test]
    async fn repeated_key_collapses_inside_window() {
        let hub = NotifyHub::with_dedupe_window(8, Duration::from_secs(600));
        let mut sub = hub.subscribe();

        assert!(hub.notify(Notification::new("channel_update_4_3", "a", "a")).await);
        assert!(!hub.notify(Notification::new("channel_update_4_3", "b", "b")).await);
        assert!(hub.notify(Notification::new("channel_update_4_1", "c", "c")).await);

        assert_eq!(sub.recv().await.unwrap().subject, "a");
        assert_eq!(sub.recv().await.unwrap().subject, "c");
        assert!(sub.try_recv().is_err());
    }

    #[tokio::test]
    async fn expired_window_lets_key_through() {
        let hub = NotifyHub::with_dedupe_window(8, Duration::from_millis(20));
        assert!(hub.notify(Notification::new("channel_update_4_3", "a", "a")).await);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(hub.notify(Notification::new("channel_update_4_3", "b", "b")).await);
    }

    #[tokio::test]
    async fn no_window_sends_every_repeat() {
        let hub = NotifyHub::new(8);
        for _ in 0..3 {
            assert!(hub.notify(Notification::new("channel_update_4_3", "a", "a")).await);
        }
    }
}
