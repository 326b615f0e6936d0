//! Shared device state
//!
//! Thread-safe state shared between the audio pipeline, the control
//! pollers, and the remote-control entry points.
//!
//! Access discipline: `volume` is guarded by a mutex held only for the
//! duration of each access; no read-modify-write spans two acquisitions
//! (the encoder computes the new value from its locally cached read and
//! performs a single write). The boolean flags are atomics with a single
//! writer each: the button task owns `party_mode`, `is_playing` and
//! `session_on`; the remote notification handler owns `volume_notify`
//! arming.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use biamp_common::events::{EventBus, PlaybackState, SinkEvent};
use tracing::info;

/// Upper bound of the locally tracked volume scale
pub const VOLUME_MAX: u8 = 127;

/// Divisor mapping a stored volume value to the pipeline's [0,1] factor.
///
/// This is the controller's wider scale. Locally polled volume only ever
/// reaches 127, so the local control range tops out well below unity gain;
/// the mismatch between the two control paths is inherited behavior and is
/// deliberately not unified here (see DESIGN.md).
pub const CONTROLLER_VOLUME_SPAN: f32 = 500.0;

/// Volume value at startup
pub const DEFAULT_VOLUME: u8 = 100;

/// Shared state accessible by all components
pub struct SharedState {
    /// Local volume value, [0,127] for the encoder path; a remote
    /// absolute-volume command stores its raw value here unscaled
    volume: Mutex<u8>,

    /// One-shot arming flag for the remote volume-changed notification
    volume_notify: AtomicBool,

    /// Gain preset selector (false = quiet preset, true = party preset)
    party_mode: AtomicBool,

    /// Optimistically cached playback state
    is_playing: AtomicBool,

    /// Whether the audio session (transport + relay) is powered on
    session_on: AtomicBool,

    /// Event broadcaster
    event_bus: EventBus,
}

impl SharedState {
    /// Create new shared state with default values
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            volume: Mutex::new(DEFAULT_VOLUME),
            volume_notify: AtomicBool::new(false),
            party_mode: AtomicBool::new(false),
            is_playing: AtomicBool::new(false),
            session_on: AtomicBool::new(false),
            event_bus,
        }
    }

    /// Read the current volume value.
    pub fn volume(&self) -> u8 {
        *self.volume.lock().expect("volume lock poisoned")
    }

    /// Set the volume from the local host (encoder).
    ///
    /// Returns `true` if a remote volume-changed notification was armed;
    /// the arming is consumed, and the caller is responsible for invoking
    /// the notifier exactly once with the new value.
    pub fn set_volume_local(&self, volume: u8) -> bool {
        info!(
            "Volume is set locally to: {}%",
            volume as u32 * 100 / CONTROLLER_VOLUME_SPAN as u32
        );
        *self.volume.lock().expect("volume lock poisoned") = volume;

        self.event_bus.emit(SinkEvent::VolumeChanged {
            volume,
            timestamp: chrono::Utc::now(),
        });

        self.volume_notify.swap(false, Ordering::AcqRel)
    }

    /// Set the volume from the remote controller's absolute-volume command.
    ///
    /// The raw controller value is stored as received; the pipeline divides
    /// by [`CONTROLLER_VOLUME_SPAN`] either way.
    pub fn set_volume_remote(&self, volume: u8) {
        info!(
            "Volume is set by remote controller to: {}%",
            volume as u32 * 100 / CONTROLLER_VOLUME_SPAN as u32
        );
        *self.volume.lock().expect("volume lock poisoned") = volume;

        self.event_bus.emit(SinkEvent::VolumeChanged {
            volume,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Arm the one-shot volume-changed notification and return the current
    /// volume for the interim response.
    pub fn arm_volume_notification(&self) -> u8 {
        self.volume_notify.store(true, Ordering::Release);
        self.volume()
    }

    /// Current gain preset selector.
    pub fn party_mode(&self) -> bool {
        self.party_mode.load(Ordering::Relaxed)
    }

    /// Toggle party mode, returning the new value.
    pub fn toggle_party_mode(&self) -> bool {
        let enabled = !self.party_mode.load(Ordering::Relaxed);
        self.party_mode.store(enabled, Ordering::Relaxed);

        self.event_bus.emit(SinkEvent::PartyModeChanged {
            enabled,
            timestamp: chrono::Utc::now(),
        });
        enabled
    }

    /// Locally cached playback state.
    pub fn is_playing(&self) -> bool {
        self.is_playing.load(Ordering::Relaxed)
    }

    /// Update the cached playback state.
    ///
    /// Called optimistically after sending play/pause, and authoritatively
    /// when the remote reports a play-status change.
    pub fn set_playing(&self, playing: bool) {
        self.is_playing.store(playing, Ordering::Relaxed);

        let state = if playing {
            PlaybackState::Playing
        } else {
            PlaybackState::Paused
        };
        self.event_bus.emit(SinkEvent::PlaybackStateChanged {
            state,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Whether the audio session is powered on.
    pub fn session_on(&self) -> bool {
        self.session_on.load(Ordering::Relaxed)
    }

    pub(crate) fn set_session_on(&self, on: bool) {
        self.session_on.store(on, Ordering::Relaxed);
    }

    /// Event bus shared with subscribers.
    pub fn events(&self) -> &EventBus {
        &self.event_bus
    }
}
