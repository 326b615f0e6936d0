//! Event types for the biamp event system
//!
//! The sink uses the same hybrid communication pattern as the rest of the
//! codebase:
//! - **EventBus** (tokio::broadcast): one-to-many event broadcasting
//! - **Shared state** (Arc + locks/atomics): read-heavy access
//!
//! Events carry their own UTC timestamp so subscribers can order and log
//! them without re-stamping.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Playback state as tracked locally by the sink.
///
/// The remote source is authoritative; this mirrors the last status the
/// remote reported (or the sink's optimistic flip after sending play/pause).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
        }
    }
}

/// Biamp event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SinkEvent {
    /// Local volume value changed (encoder or remote absolute-volume write)
    VolumeChanged {
        volume: u8,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Party mode toggled (gain preset switch + indicator line)
    PartyModeChanged {
        enabled: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Locally cached playback state changed
    PlaybackStateChanged {
        state: PlaybackState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Audio session powered on (relay driven high, transport brought up)
    SessionStarted {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Audio session powered off
    SessionStopped {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Output sinks reconfigured for a negotiated stream format
    StreamConfigured {
        sample_rate: u32,
        channels: u16,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl SinkEvent {
    /// Event name for logging and serialized output
    pub fn event_type(&self) -> &'static str {
        match self {
            SinkEvent::VolumeChanged { .. } => "VolumeChanged",
            SinkEvent::PartyModeChanged { .. } => "PartyModeChanged",
            SinkEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
            SinkEvent::SessionStarted { .. } => "SessionStarted",
            SinkEvent::SessionStopped { .. } => "SessionStopped",
            SinkEvent::StreamConfigured { .. } => "StreamConfigured",
        }
    }
}

/// Broadcast bus for [`SinkEvent`]s.
///
/// Thin wrapper over `tokio::sync::broadcast` so emitters do not have to
/// care whether anyone is listening.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SinkEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity.
    ///
    /// Old events are dropped for lagging subscribers once the buffer is
    /// full; 100 is plenty for the event rates a single device produces.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<SinkEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers.
    ///
    /// Send errors (no receivers) are ignored; event emission must never
    /// fail the component doing the emitting.
    pub fn emit(&self, event: SinkEvent) {
        let _ = self.tx.send(event);
    }

    /// Configured channel capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_and_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(SinkEvent::VolumeChanged {
            volume: 64,
            timestamp: chrono::Utc::now(),
        });

        match rx.recv().await.unwrap() {
            SinkEvent::VolumeChanged { volume, .. } => assert_eq!(volume, 64),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_emit_without_subscribers_is_ok() {
        let bus = EventBus::new(16);
        // Must not panic or error
        bus.emit(SinkEvent::SessionStarted {
            timestamp: chrono::Utc::now(),
        });
    }

    #[test]
    fn test_event_serialization_tag() {
        let event = SinkEvent::PartyModeChanged {
            enabled: true,
            timestamp: chrono::Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"PartyModeChanged\""));
        assert!(json.contains("\"enabled\":true"));
    }

    #[test]
    fn test_playback_state_display() {
        assert_eq!(PlaybackState::Playing.to_string(), "playing");
        assert_eq!(PlaybackState::Paused.to_string(), "paused");
    }
}
