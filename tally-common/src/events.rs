//! Event types for the tally event system
//!
//! Provides the central `ScoringEvent` enum and the `EventBus` used to
//! broadcast scoring activity to hosts (UI layers, SCORM adapters,
//! analytics). Events are emitted only for root sets; intersected clones
//! are query-time artifacts and never reach the bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Tally event types
///
/// Events are broadcast via EventBus and can be serialized for transport.
/// All per-set events carry the set id and set type so subscribers can
/// filter by either; the type field plays the role a per-type topic would
/// on a string-keyed bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ScoringEvent {
    /// A root set entered the registry
    ///
    /// Triggers:
    /// - Lifecycle controller: create a status vector, install triggers
    /// - Total set: membership may change on next read
    SetRegistered {
        /// Unique id of the registered set
        set_id: String,
        /// Set type (e.g. "model", "total", or a host-defined type)
        set_type: String,
        /// When the set registered
        timestamp: DateTime<Utc>,
    },

    /// A root set left the registry
    ///
    /// Triggers:
    /// - Lifecycle controller: drop the status vector
    SetDeregistered {
        /// Unique id of the removed set
        set_id: String,
        /// Set type
        set_type: String,
        /// When the set deregistered
        timestamp: DateTime<Utc>,
    },

    /// A set finished its restore callback
    SetRestored {
        /// Set id
        set_id: String,
        /// Set type
        set_type: String,
        /// Whether saved state was actually found and applied
        was_restored: bool,
        /// When restore completed
        timestamp: DateTime<Utc>,
    },

    /// A set requested (or completed) an update pass
    ///
    /// Triggers:
    /// - Lifecycle controller: enqueue intersecting sets into Update
    SetUpdated {
        /// Set id
        set_id: String,
        /// Set type
        set_type: String,
        /// When the update was requested
        timestamp: DateTime<Utc>,
    },

    /// A set requested a reset of its own state
    ///
    /// Triggers:
    /// - Lifecycle controller: enqueue same-model sets into Restart
    SetReset {
        /// Set id
        set_id: String,
        /// Set type
        set_type: String,
        /// When the reset was requested
        timestamp: DateTime<Utc>,
    },

    /// A scoring set transitioned to complete
    ///
    /// Triggers:
    /// - Objective writer: record score + completion status
    SetCompleted {
        /// Set id
        set_id: String,
        /// Set type
        set_type: String,
        /// Whether the set was passed at completion time
        passed: bool,
        /// When completion was detected
        timestamp: DateTime<Utc>,
    },

    /// A scoring set transitioned to passed
    SetPassed {
        /// Set id
        set_id: String,
        /// Set type
        set_type: String,
        /// When the pass was detected
        timestamp: DateTime<Utc>,
    },

    /// The scoring root finished restoring all sets at startup
    Restored {
        /// When the restore phase settled
        timestamp: DateTime<Utc>,
    },

    /// The scoring root ran a global update pass
    Updated {
        /// When the update was requested
        timestamp: DateTime<Utc>,
    },

    /// The scoring root reset every registered set
    ResetAll {
        /// When the reset was requested
        timestamp: DateTime<Utc>,
    },

    /// The total set transitioned to complete
    Completed {
        /// Whether the total was passed at completion time
        passed: bool,
        /// When completion was detected
        timestamp: DateTime<Utc>,
    },

    /// The total set transitioned to passed
    Passed {
        /// When the pass was detected
        timestamp: DateTime<Utc>,
    },
}

impl ScoringEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            ScoringEvent::SetRegistered { .. } => "SetRegistered",
            ScoringEvent::SetDeregistered { .. } => "SetDeregistered",
            ScoringEvent::SetRestored { .. } => "SetRestored",
            ScoringEvent::SetUpdated { .. } => "SetUpdated",
            ScoringEvent::SetReset { .. } => "SetReset",
            ScoringEvent::SetCompleted { .. } => "SetCompleted",
            ScoringEvent::SetPassed { .. } => "SetPassed",
            ScoringEvent::Restored { .. } => "Restored",
            ScoringEvent::Updated { .. } => "Updated",
            ScoringEvent::ResetAll { .. } => "ResetAll",
            ScoringEvent::Completed { .. } => "Completed",
            ScoringEvent::Passed { .. } => "Passed",
        }
    }

    /// Set id carried by per-set events, `None` for root-level events
    pub fn set_id(&self) -> Option<&str> {
        match self {
            ScoringEvent::SetRegistered { set_id, .. }
            | ScoringEvent::SetDeregistered { set_id, .. }
            | ScoringEvent::SetRestored { set_id, .. }
            | ScoringEvent::SetUpdated { set_id, .. }
            | ScoringEvent::SetReset { set_id, .. }
            | ScoringEvent::SetCompleted { set_id, .. }
            | ScoringEvent::SetPassed { set_id, .. } => Some(set_id),
            _ => None,
        }
    }
}

/// Central event distribution bus for scoring events
///
/// Uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ScoringEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ScoringEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ScoringEvent,
    ) -> std::result::Result<usize, broadcast::error::SendError<ScoringEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring whether anyone is listening
    pub fn emit_lossy(&self, event: ScoringEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registered(id: &str) -> ScoringEvent {
        ScoringEvent::SetRegistered {
            set_id: id.to_string(),
            set_type: "model".to_string(),
            timestamp: crate::time::now(),
        }
    }

    #[test]
    fn test_eventbus_emit_and_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(registered("a-05")).expect("emit should succeed");

        let received = rx.try_recv().expect("should receive event");
        assert_eq!(received.event_type(), "SetRegistered");
        assert_eq!(received.set_id(), Some("a-05"));
    }

    #[test]
    fn test_eventbus_multiple_subscribers() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.emit(registered("b-10")).expect("emit should succeed");

        assert_eq!(rx1.try_recv().unwrap().set_id(), Some("b-10"));
        assert_eq!(rx2.try_recv().unwrap().set_id(), Some("b-10"));
    }

    #[test]
    fn test_eventbus_emit_lossy_without_subscribers() {
        let bus = EventBus::new(4);
        // No subscribers - must not panic
        bus.emit_lossy(registered("c-15"));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_event_serialization_round_trip() {
        let event = ScoringEvent::SetCompleted {
            set_id: "performance".to_string(),
            set_type: "scoring".to_string(),
            passed: true,
            timestamp: crate::time::now(),
        };

        let json = serde_json::to_string(&event).expect("serialize");
        assert!(json.contains("\"type\":\"SetCompleted\""));
        assert!(json.contains("\"passed\":true"));

        let back: ScoringEvent = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.event_type(), "SetCompleted");
    }

    #[test]
    fn test_root_events_have_no_set_id() {
        let event = ScoringEvent::Passed {
            timestamp: crate::time::now(),
        };
        assert_eq!(event.set_id(), None);
    }
}
