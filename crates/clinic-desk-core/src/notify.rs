//! Single-slot transient notifications.
//!
//! At most one notification is visible. Posting replaces the current one, and each
//! notification dismisses itself after the configured lifetime unless it was superseded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

/// A visible notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Monotonic id, used to tell a notice from its replacement
    pub id: u64,
    pub kind: NotificationKind,
    pub message: String,
    pub posted_at: DateTime<Utc>,
}

struct Slot {
    current: watch::Sender<Option<Notification>>,
    next_id: AtomicU64,
    timer: Mutex<Option<JoinHandle<()>>>,
    lifetime: Duration,
}

impl Slot {
    /// Clear the slot only if `id` is still showing.
    fn expire(&self, id: u64) -> bool {
        self.current.send_if_modified(|current| {
            if current.as_ref().map(|n| n.id) == Some(id) {
                *current = None;
                true
            } else {
                false
            }
        })
    }

    fn replace_timer(&self, timer: Option<JoinHandle<()>>) {
        let mut guard = match self.timer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = std::mem::replace(&mut *guard, timer) {
            previous.abort();
        }
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        let timer = match self.timer.get_mut() {
            Ok(timer) => timer,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(handle) = timer.take() {
            handle.abort();
        }
    }
}

/// Handle to the desk's notification slot. Clones share the slot.
#[derive(Clone)]
pub struct NotificationQueue {
    slot: Arc<Slot>,
}

impl NotificationQueue {
    pub fn new(lifetime: Duration) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            slot: Arc::new(Slot {
                current,
                next_id: AtomicU64::new(1),
                timer: Mutex::new(None),
                lifetime,
            }),
        }
    }

    /// Show a notification, replacing any visible one. Returns its id.
    pub fn post(&self, kind: NotificationKind, message: impl Into<String>) -> u64 {
        let id = self.slot.next_id.fetch_add(1, Ordering::Relaxed);
        let notice = Notification {
            id,
            kind,
            message: message.into(),
            posted_at: Utc::now(),
        };

        match kind {
            NotificationKind::Success => tracing::info!(id, message = %notice.message, "notice"),
            NotificationKind::Error => tracing::warn!(id, message = %notice.message, "notice"),
        }

        self.slot.current.send_replace(Some(notice));
        self.slot.replace_timer(self.spawn_expiry(id));
        id
    }

    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.post(NotificationKind::Success, message)
    }

    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.post(NotificationKind::Error, message)
    }

    /// Hide the visible notification immediately.
    pub fn dismiss(&self) {
        self.slot.replace_timer(None);
        self.slot.current.send_replace(None);
    }

    /// The visible notification, if any.
    pub fn current(&self) -> Option<Notification> {
        self.slot.current.borrow().clone()
    }

    /// Observe changes to the slot.
    pub fn subscribe(&self) -> watch::Receiver<Option<Notification>> {
        self.slot.current.subscribe()
    }

    fn spawn_expiry(&self, id: u64) -> Option<JoinHandle<()>> {
        // Outside a runtime the notice simply stays until replaced or dismissed
        let runtime = tokio::runtime::Handle::try_current().ok()?;
        let slot: Weak<Slot> = Arc::downgrade(&self.slot);
        let lifetime = self.slot.lifetime;

        Some(runtime.spawn(async move {
            tokio::time::sleep(lifetime).await;
            if let Some(slot) = slot.upgrade() {
                if slot.expire(id) {
                    tracing::debug!(id, "notice expired");
                }
            }
        }))
    }
}

impl std::fmt::Debug for NotificationQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationQueue")
            .field("current", &self.current())
            .field("lifetime", &self.slot.lifetime)
            .finish()
    }
}
