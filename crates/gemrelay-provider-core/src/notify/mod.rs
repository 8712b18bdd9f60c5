mod hub;
mod terminal_sink;
mod types;

pub use hub::{DEFAULT_DEDUPE_WINDOW, NotificationSink, NotifyHub};
pub use terminal_sink::TerminalNotificationSink;
pub use types::Notification;
