use std::sync::mpsc;

use relay_core::Notification;
use relay_logging::{relay_info, BACKGROUND};

/// Surfaces a notification to the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        relay_info!(
            target: BACKGROUND,
            "[notification] {}: {}",
            notification.title,
            notification.message
        );
    }
}

/// Forwards notifications to a channel, e.g. for a UI thread to display.
pub struct ChannelNotifier {
    tx: mpsc::Sender<Notification>,
}

impl ChannelNotifier {
    pub fn new(tx: mpsc::Sender<Notification>) -> Self {
        Self { tx }
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        let _ = self.tx.send(notification);
    }
}
