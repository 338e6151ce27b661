//! Notification delivery.
//!
//! The poller decides *when* to notify; a [`NotificationSink`] decides how
//! the user sees it.  The terminal front end uses [`ChannelSink`], which
//! forwards the text to the UI thread where it is shown as a banner.

use std::sync::mpsc;

use tracing::{debug, info};

/// Heading shown above every notification.
pub const NOTIFICATION_TITLE: &str = "New deals!";

/// Receives "the visible entries changed" events from the poller.
///
/// Called at most once per poll cycle, on the scheduler thread, and never
/// while notifications are disabled.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, summary: &str);
}

/// A notification on its way to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub body: String,
}

/// Forwards notifications to the UI thread over an [`mpsc`] channel.
pub struct ChannelSink {
    tx: mpsc::Sender<Notice>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::Receiver<Notice>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, summary: &str) {
        info!(summary, "notifying");
        let notice = Notice {
            title: NOTIFICATION_TITLE.to_string(),
            body: summary.to_string(),
        };
        // The UI may already be gone during shutdown.
        if self.tx.send(notice).is_err() {
            debug!("notification dropped, receiver closed");
        }
    }
}
