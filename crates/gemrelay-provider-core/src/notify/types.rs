use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Operator-facing message. Delivery channels may collapse messages that
/// share a `dedupe_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub dedupe_key: String,
    pub subject: String,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}

impl Notification {
    pub fn new(
        dedupe_key: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            dedupe_key: dedupe_key.into(),
            subject: subject.into(),
            body: body.into(),
            at: OffsetDateTime::now_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_is_rfc3339() {
        let mut notification = Notification::new("channel_update_7_3", "subject", "body");
        notification.at = OffsetDateTime::from_unix_timestamp(1_760_000_000).unwrap();
        let json = serde_json::to_string(&notification).unwrap();
        assert!(json.contains("\"at\":\"2025-10-09T08:53:20Z\""));
        let back: Notification = serde_json::from_str(&json).unwrap();
        assert_eq!(back, notification);
    }
}
