//! Bounded, process-wide notification store.

use std::sync::Mutex;

use {
    chrono::{DateTime, Utc},
    serde::Serialize,
    tracing::debug,
    uuid::Uuid,
};

use liveboard_protocol::FeedEvent;

/// Entries beyond this cap are evicted oldest-first.
pub const MAX_NOTIFICATIONS: usize = 50;

/// One user-facing notification derived from a feed event.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    /// Store-local id, freshly generated per insertion, never the source
    /// event's id. The same underlying event may legitimately recur
    /// (e.g. an update after a delete), and each recurrence is its own
    /// notification.
    pub id: Uuid,
    /// The triggering feed event, opaque to the store.
    pub source: FeedEvent,
    #[serde(rename = "isRead")]
    pub is_read: bool,
    /// Set at insertion time, not at event origination time.
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Bounded notification collection, newest first.
///
/// Shared via `Arc` and read by arbitrarily many consumers; every mutation
/// goes through these methods. Misuse (an unknown id) is a no-op, never an
/// error; nothing in here can fail the host process.
#[derive(Debug, Default)]
pub struct NotificationStore {
    entries: Mutex<Vec<Notification>>,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an unread notification for `source` and return its id,
    /// evicting the oldest entries beyond [`MAX_NOTIFICATIONS`].
    pub fn add(&self, source: FeedEvent) -> Uuid {
        let id = Uuid::new_v4();
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(0, Notification {
                id,
                source,
                is_read: false,
                created_at: Utc::now(),
            });
            entries.truncate(MAX_NOTIFICATIONS);
            debug!(%id, total = entries.len(), "notification added");
        }
        id
    }

    pub fn mark_read(&self, id: Uuid) {
        if let Ok(mut entries) = self.entries.lock()
            && let Some(entry) = entries.iter_mut().find(|n| n.id == id)
        {
            entry.is_read = true;
        }
    }

    pub fn mark_all_read(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            for entry in entries.iter_mut() {
                entry.is_read = true;
            }
        }
    }

    pub fn remove(&self, id: Uuid) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|n| n.id != id);
        }
    }

    pub fn clear_all(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    pub fn unread_count(&self) -> usize {
        self.entries
            .lock()
            .map(|entries| entries.iter().filter(|n| !n.is_read).count())
            .unwrap_or(0)
    }

    /// Snapshot of all notifications, newest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
