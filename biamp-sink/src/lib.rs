//! # Biamp Sink Library (biamp-sink)
//!
//! Two-band Bluetooth audio sink: splits a decoded PCM stream into a
//! low-frequency ("bass") and a high-pass-complement ("mid") output, and
//! translates a rotary encoder plus a push-button into volume and playback
//! control.
//!
//! **Architecture:** Push-model audio pipeline fed by the transport's data
//! callback, two blocking output sinks, and fixed-cadence poller tasks for
//! the physical controls. All tasks share one `SharedState`.
//!
//! The Bluetooth transport itself (connection, codec negotiation, AVRCP
//! exchange) is an external collaborator reached through the traits in
//! [`remote`] and the entry points on [`session::Session`].

pub mod audio;
pub mod controls;
pub mod error;
pub mod remote;
pub mod session;
pub mod state;

pub use error::{Error, Result};
pub use state::SharedState;
