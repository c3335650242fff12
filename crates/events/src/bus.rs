//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`DocumentEvent`]s. It is
//! shared via `Arc<EventBus>` between the write handlers (publishers) and
//! the background index sync (subscriber).

use chrono::{DateTime, Utc};
use portal_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// DocumentEvent
// ---------------------------------------------------------------------------

/// Which document changed, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id")]
pub enum DocumentChange {
    #[serde(rename = "job.written")]
    JobWritten(DbId),
    #[serde(rename = "job.deleted")]
    JobDeleted(DbId),
    #[serde(rename = "user.written")]
    UserWritten(DbId),
    #[serde(rename = "user.deleted")]
    UserDeleted(DbId),
}

impl DocumentChange {
    /// Dot-separated event name, e.g. `"job.written"`.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::JobWritten(_) => "job.written",
            Self::JobDeleted(_) => "job.deleted",
            Self::UserWritten(_) => "user.written",
            Self::UserDeleted(_) => "user.deleted",
        }
    }

    pub fn entity_id(&self) -> DbId {
        match self {
            Self::JobWritten(id)
            | Self::JobDeleted(id)
            | Self::UserWritten(id)
            | Self::UserDeleted(id) => *id,
        }
    }
}

/// A document change plus who caused it and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEvent {
    pub change: DocumentChange,
    /// Id of the user whose request produced the change, if any.
    pub actor_user_id: Option<DbId>,
    pub timestamp: DateTime<Utc>,
}

impl DocumentEvent {
    pub fn new(change: DocumentChange) -> Self {
        Self {
            change,
            actor_user_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn job_written(id: DbId) -> Self {
        Self::new(DocumentChange::JobWritten(id))
    }

    pub fn job_deleted(id: DbId) -> Self {
        Self::new(DocumentChange::JobDeleted(id))
    }

    pub fn user_written(id: DbId) -> Self {
        Self::new(DocumentChange::UserWritten(id))
    }

    pub fn user_deleted(id: DbId) -> Self {
        Self::new(DocumentChange::UserDeleted(id))
    }

    /// Attach the acting user to the event.
    pub fn with_actor(mut self, user_id: DbId) -> Self {
        self.actor_user_id = Some(user_id);
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use portal_events::bus::{DocumentEvent, EventBus};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(DocumentEvent::job_written(1));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<DocumentEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: DocumentEvent) {
        tracing::debug!(
            event_type = event.change.event_type(),
            entity_id = event.change.entity_id(),
            "Publishing document event",
        );
        // A SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<DocumentEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
