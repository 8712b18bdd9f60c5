use std::future::Future;
use std::pin::Pin;

use super::{Notification, NotificationSink};

/// Prints one JSON line per notification on stderr.
#[derive(Debug, Default)]
pub struct TerminalNotificationSink;

impl TerminalNotificationSink {
    pub fn new() -> Self {
        Self
    }
}

impl NotificationSink for TerminalNotificationSink {
    fn deliver<'a>(
        &'a self,
        notification: &'a Notification,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            match serde_json::to_string(notification) {
                Ok(line) => eprintln!("{line}"),
                Err(err) => {
                    tracing::warn!(event = "notification_serialize_error", error = %err);
                }
            }
        })
    }
}
