//! Notification collaborator for user-visible success and failure toasts.
//!
//! Fetch and save failures are never silently swallowed: every error class
//! is routed here so a renderer outside this engine can display it.

use futures_signals::signal::{Mutable, Signal, SignalExt};
use shared::WorkItem;
use tracing::{error, info};

use crate::error::EngineError;

/// Notification variant for styling different kinds of toasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Error,
    Info,
    Success,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub message: String,
    /// Raw technical error for logging; the message stays user-friendly.
    pub technical: String,
    pub kind: NotificationKind,
}

impl Notification {
    pub fn fetch_failed(what: &str, error: &EngineError) -> Self {
        Self {
            id: format!("fetch_error_{what}").replace(' ', "_"),
            title: "Loading failed".to_string(),
            message: format!("The {what} could not be loaded. Try again."),
            technical: error.to_string(),
            kind: NotificationKind::Error,
        }
    }

    pub fn save_failed(item: &WorkItem, error: &EngineError) -> Self {
        let details = match error {
            EngineError::Save { errors, .. } if !errors.messages.is_empty() => {
                errors.messages.join(", ")
            }
            other => other.to_string(),
        };
        Self {
            id: format!("save_error_{}", item.cache_id()),
            title: "Saving failed".to_string(),
            message: format!("'{}' could not be saved: {details}", item.subject),
            technical: error.to_string(),
            kind: NotificationKind::Error,
        }
    }

    pub fn schema_load_failed(href: &str, error: &EngineError) -> Self {
        Self {
            id: format!("schema_error_{}", href.replace('/', "_")),
            title: "Loading failed".to_string(),
            message: "Attribute metadata could not be loaded.".to_string(),
            technical: error.to_string(),
            kind: NotificationKind::Error,
        }
    }

    pub fn save_succeeded(item: &WorkItem) -> Self {
        Self {
            id: format!("save_success_{}", item.cache_id()),
            title: "Saved".to_string(),
            message: format!("'{}' was saved successfully.", item.subject),
            technical: String::new(),
            kind: NotificationKind::Success,
        }
    }
}

/// Holds the active notification list for renderers to subscribe to.
#[derive(Debug, Clone, Default)]
pub struct Notifications {
    entries: Mutable<Vec<Notification>>,
}

impl Notifications {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a notification, replacing an earlier one with the same id.
    pub fn push(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Error => {
                error!(id = %notification.id, technical = %notification.technical, "notification");
            }
            _ => info!(id = %notification.id, "notification"),
        }
        let mut entries = self.entries.lock_mut();
        entries.retain(|existing| existing.id != notification.id);
        entries.push(notification);
    }

    pub fn dismiss(&self, id: &str) {
        self.entries.lock_mut().retain(|existing| existing.id != id);
    }

    pub fn current(&self) -> Vec<Notification> {
        self.entries.get_cloned()
    }

    pub fn signal(&self) -> impl Signal<Item = Vec<Notification>> {
        self.entries.signal_cloned().dedupe_cloned()
    }
}
