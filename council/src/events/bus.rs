//! Event bus for council runs
//!
//! Provides pub/sub messaging using Tokio broadcast channels with
//! optional persistence to RocksDB for event replay.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::types::CouncilEvent;
use crate::state::SharedRunStore;

/// Channel capacity for broadcast
const CHANNEL_CAPACITY: usize = 256;

/// Error type for event bus operations
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Failed to send event: {0}")]
    SendFailed(String),

    #[error("Failed to persist event: {0}")]
    PersistFailed(String),

    #[error("Channel closed")]
    ChannelClosed,
}

/// Result type for event bus operations
pub type EventBusResult<T> = Result<T, EventBusError>;

/// Shared reference to EventBus
pub type SharedEventBus = Arc<EventBus>;

/// Event bus with broadcast channels and optional persistence
pub struct EventBus {
    /// Broadcast sender for publishing events
    sender: broadcast::Sender<CouncilEvent>,

    /// Optional run store for event persistence
    store: Option<SharedRunStore>,

    /// Whether to persist events
    persist_events: bool,
}

impl EventBus {
    /// Create a new event bus without persistence
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            store: None,
            persist_events: false,
        }
    }

    /// Create an event bus with persistence enabled
    pub fn with_persistence(store: SharedRunStore) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            store: Some(store),
            persist_events: true,
        }
    }

    /// Create a shared reference to this event bus
    pub fn shared(self) -> SharedEventBus {
        Arc::new(self)
    }

    /// Enable or disable event persistence
    pub fn set_persist_events(&mut self, persist: bool) {
        self.persist_events = persist;
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: CouncilEvent) -> EventBusResult<()> {
        let event_type = event.event_type();
        let timestamp = event.timestamp();

        // Persist if enabled
        if self.persist_events {
            if let Some(store) = &self.store {
                let event_id = CouncilEvent::new_id();
                let timestamp_nanos = timestamp.timestamp_nanos_opt().unwrap_or(0);

                if let Err(e) = store.put_event(event.run_id(), timestamp_nanos, &event_id, &event)
                {
                    warn!(event_type, "Failed to persist event: {}", e);
                    return Err(EventBusError::PersistFailed(e.to_string()));
                }
                debug!(event_type, event_id, "Event persisted");
            }
        }

        // Broadcast to subscribers (ignore if no receivers)
        match self.sender.send(event) {
            Ok(count) => {
                debug!(event_type, receivers = count, "Event published");
                Ok(())
            }
            Err(_) => {
                // No receivers is OK - we still persisted
                debug!(event_type, "Event published (no receivers)");
                Ok(())
            }
        }
    }

    /// Subscribe to receive events
    pub fn subscribe(&self) -> broadcast::Receiver<CouncilEvent> {
        self.sender.subscribe()
    }

    /// Get the number of current subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Check if the bus has any subscribers
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
