//! Core relay abstractions: upstream/downstream plumbing, the error taxonomy,
//! normalized usage, and the channel health policy.
//!
//! This crate does not depend on any concrete HTTP stack. Translators receive
//! an `UpstreamHttpResponse` and write through a `DownstreamSink`; persistence
//! and operator delivery are reached through `ChannelStatusStore` and
//! `NotificationSink`.

pub mod channel;
pub mod downstream;
pub mod errors;
pub mod headers;
pub mod notify;
pub mod provider;
pub mod usage;

pub use channel::{
    ChannelError, ChannelHealth, ChannelId, ChannelStatus, ChannelStatusStore, ChannelType,
    GeminiQuotaMatcher, HealthPolicy, KeywordError, KeywordSet, MemoryStatusStore, QuotaMatcher,
    QuotaMatcherRegistry, QuotaVerdict, TransitionOutcome,
};
pub use downstream::{ChannelSink, DownstreamError, DownstreamFrame, DownstreamSink};
pub use errors::{ErrorClass, ErrorCode, RelayError, RelayResult};
pub use headers::{Headers, header_get, header_remove, header_set, set_event_stream_headers};
pub use notify::{
    DEFAULT_DEDUPE_WINDOW, Notification, NotificationSink, NotifyHub, TerminalNotificationSink,
};
pub use provider::{
    BodyReadError, ByteStream, RelayContext, UpstreamBody, UpstreamHttpResponse,
};
pub use usage::{CompletionDetails, PromptDetails, UsageRecord};
