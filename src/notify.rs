//! Fire-and-forget user notifications ("toasts"). The library only produces them; how
//! they are shown is up to the embedder.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

pub const DEFAULT_DURATION: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
    pub duration: Duration,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, severity: Severity, message: &str, duration: Duration);

    fn info(&self, message: &str) { self.notify(Severity::Info, message, DEFAULT_DURATION) }

    fn error(&self, message: &str) { self.notify(Severity::Error, message, DEFAULT_DURATION) }
}

/// Renders notifications as log lines; what the CLI uses.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, severity: Severity, message: &str, _duration: Duration) {
        match severity {
            Severity::Info => tracing::info!(target: "maxmovies::notify", "{message}"),
            Severity::Error => tracing::error!(target: "maxmovies::notify", "{message}"),
        }
    }
}

/// Forwards notifications over an unbounded channel to whatever UI loop holds the receiver.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, severity: Severity, message: &str, duration: Duration) {
        // A dropped receiver just means nobody is listening any more.
        let _ = self.tx.send(Notification { severity, message: message.to_string(), duration });
    }
}
