use std::fmt;

use serde::{Deserialize, Serialize};

pub type RelayResult<T> = Result<T, RelayError>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ErrorCode {
    BadResponseBody,
    ContentFiltered,
    EmptyResponse,
    /// Code reported by the upstream, e.g. `invalid_api_key`.
    Upstream(String),
}

impl ErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::BadResponseBody => "bad_response_body",
            ErrorCode::ContentFiltered => "content_filtered",
            ErrorCode::EmptyResponse => "empty_response",
            ErrorCode::Upstream(code) => code,
        }
    }
}

impl From<String> for ErrorCode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "bad_response_body" => ErrorCode::BadResponseBody,
            "content_filtered" => ErrorCode::ContentFiltered,
            "empty_response" => ErrorCode::EmptyResponse,
            _ => ErrorCode::Upstream(value),
        }
    }
}

impl From<ErrorCode> for String {
    fn from(value: ErrorCode) -> Self {
        match value {
            ErrorCode::Upstream(code) => code,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Client,
    Server,
}

/// A classified relay failure.
///
/// Translators produce these for malformed, blocked or empty upstream
/// answers; the gateway builds them for upstream error bodies. The same value
/// is what the channel health policy inspects.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct RelayError {
    #[serde(default = "unknown_code")]
    pub code: ErrorCode,
    #[serde(rename = "statusCode")]
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default)]
    pub message: String,
    /// The request must not be re-dispatched to another channel.
    #[serde(default)]
    pub skip_retry: bool,
    /// The failure is attributed to the channel itself.
    #[serde(default)]
    pub channel_error: bool,
}

fn unknown_code() -> ErrorCode {
    ErrorCode::Upstream(String::new())
}

impl RelayError {
    pub fn new(code: ErrorCode, status: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            status,
            error_type: None,
            message: message.into(),
            skip_retry: false,
            channel_error: false,
        }
    }

    /// The upstream body could not be read or decoded.
    pub fn bad_response_body(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::BadResponseBody, 500, err.to_string())
    }

    pub fn content_filtered(reason: &str) -> Self {
        Self::new(
            ErrorCode::ContentFiltered,
            400,
            format!("content blocked by Gemini safety filter: {reason}"),
        )
        .with_skip_retry()
    }

    /// A complete response that carries no generated output.
    pub fn empty_response() -> Self {
        Self::new(ErrorCode::EmptyResponse, 400, "no response from Gemini API").with_skip_retry()
    }

    /// A stream that ended without a single forwarded chunk.
    pub fn empty_stream() -> Self {
        Self::new(
            ErrorCode::EmptyResponse,
            500,
            "no response received from Gemini API",
        )
    }

    pub fn upstream(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Upstream(code.into()), status, message)
    }

    pub fn with_error_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = Some(error_type.into());
        self
    }

    pub fn with_skip_retry(mut self) -> Self {
        self.skip_retry = true;
        self
    }

    pub fn with_channel_error(mut self) -> Self {
        self.channel_error = true;
        self
    }

    pub fn class(&self) -> ErrorClass {
        if (400..500).contains(&self.status) {
            ErrorClass::Client
        } else {
            ErrorClass::Server
        }
    }

    pub fn is_retryable(&self) -> bool {
        if self.skip_retry {
            return false;
        }
        self.class() == ErrorClass::Server || self.status == 429
    }

    pub fn error_type(&self) -> &str {
        self.error_type.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy() {
        let bad = RelayError::bad_response_body("eof");
        assert_eq!(bad.status, 500);
        assert_eq!(bad.class(), ErrorClass::Server);
        assert!(bad.is_retryable());

        let filtered = RelayError::content_filtered("SAFETY");
        assert_eq!(filtered.status, 400);
        assert!(filtered.skip_retry);
        assert!(!filtered.is_retryable());
        assert_eq!(
            filtered.to_string(),
            "content blocked by Gemini safety filter: SAFETY"
        );

        assert_eq!(RelayError::empty_response().class(), ErrorClass::Client);
        assert!(!RelayError::empty_response().is_retryable());
        assert!(RelayError::empty_stream().is_retryable());
        assert_eq!(RelayError::empty_stream().code, ErrorCode::EmptyResponse);
    }

    #[test]
    fn rate_limit_is_retryable() {
        assert!(RelayError::upstream(429, "rate_limited", "slow down").is_retryable());
        assert!(!RelayError::upstream(400, "invalid_argument", "bad").is_retryable());
    }

    #[test]
    fn classified_error_json() {
        let err: RelayError = serde_json::from_str(
            r#"{"statusCode":403,"code":"invalid_api_key","errorType":"forbidden","message":"nope"}"#,
        )
        .unwrap();
        assert_eq!(err.code, ErrorCode::Upstream("invalid_api_key".to_string()));
        assert_eq!(err.error_type(), "forbidden");
        assert!(!err.skip_retry);

        let round: RelayError =
            serde_json::from_value(serde_json::to_value(RelayError::empty_stream()).unwrap())
                .unwrap();
        assert_eq!(round.code, ErrorCode::EmptyResponse);
    }
}
