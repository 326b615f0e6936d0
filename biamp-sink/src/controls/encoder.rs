//! Quadrature rotary encoder decoder
//!
//! Polls the encoder's two lines at a fixed cadence and turns edges on
//! line A into volume steps. Step size is velocity-sensitive: the faster
//! consecutive edges arrive, the larger the step.
//!
//! Direction uses the single-edge two-line comparison (`B != A` after an
//! A-edge means increase, `B == A` means decrease) rather than full
//! four-state Gray decoding. That simplification is inherited device
//! behavior and must be preserved.
//!
//! The decoder itself is synchronous with an injected clock so the timing
//! table is unit-testable; [`run_encoder_task`] wraps it in the fixed-
//! cadence poll loop and applies results to the shared state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::controls::gpio::{InputLine, Level};
use crate::remote::RemoteControl;
use crate::state::{SharedState, VOLUME_MAX};
use crate::Result;

/// Edge-to-edge delay thresholds for the acceleration curve.
/// Strictly-less-than comparisons: an exact 50 ms delay is "medium".
const FAST_EDGE: Duration = Duration::from_millis(50);
const MEDIUM_EDGE: Duration = Duration::from_millis(120);
const SLOW_EDGE: Duration = Duration::from_millis(300);

/// Step size for a given delay between consecutive A-edges.
pub fn step_for_edge_delay(delta: Duration) -> u8 {
    if delta < FAST_EDGE {
        5
    } else if delta < MEDIUM_EDGE {
        3
    } else if delta < SLOW_EDGE {
        2
    } else {
        1
    }
}

/// Stateful edge decoder for one encoder.
pub struct EncoderDecoder<A: InputLine, B: InputLine> {
    line_a: A,
    line_b: B,
    last_a: Level,
    last_edge: Instant,
}

impl<A: InputLine, B: InputLine> EncoderDecoder<A, B> {
    /// Sample line A to establish the edge baseline and start the
    /// velocity clock at `now`.
    pub fn new(line_a: A, line_b: B, now: Instant) -> Result<Self> {
        let last_a = line_a.level()?;
        Ok(Self {
            line_a,
            line_b,
            last_a,
            last_edge: now,
        })
    }

    /// Run one poll iteration against the current volume value.
    ///
    /// Returns `Some(new_volume)` when an A-edge occurred; the value is
    /// written back by the caller in a single lock acquisition. An edge
    /// at a saturated bound still yields the (unchanged) value — the
    /// write itself is part of the observed behavior.
    pub fn poll(&mut self, current_volume: u8, now: Instant) -> Result<Option<u8>> {
        let a = self.line_a.level()?;
        let b = self.line_b.level()?;

        if a == self.last_a {
            return Ok(None);
        }

        let delta = now.duration_since(self.last_edge);
        self.last_edge = now;
        let step = step_for_edge_delay(delta);

        let mut volume = current_volume;
        if b != a && volume < VOLUME_MAX {
            // Saturating increase: snap to the bound instead of overshooting
            volume = if volume <= VOLUME_MAX - step {
                volume + step
            } else {
                VOLUME_MAX
            };
        } else if b == a && volume > 0 {
            volume = if volume >= step { volume - step } else { 0 };
        }

        debug!("Encoder edge: volume {} -> {} (step {})", current_volume, volume, step);
        self.last_a = a;
        Ok(Some(volume))
    }
}

/// Fixed-cadence poll loop applying encoder steps to the shared state.
///
/// Owns nothing but the decoder; between polls it only sleeps. Spawned on
/// transport connect and aborted on disconnect by the session manager.
pub async fn run_encoder_task<A, B>(
    mut decoder: EncoderDecoder<A, B>,
    state: Arc<SharedState>,
    remote: Arc<dyn RemoteControl>,
    poll_interval: Duration,
) where
    A: InputLine,
    B: InputLine,
{
    let mut interval = tokio::time::interval(poll_interval);
    debug!("Encoder poller started ({:?} interval)", poll_interval);

    loop {
        interval.tick().await;

        let current = state.volume();
        match decoder.poll(current, Instant::now()) {
            Ok(Some(volume)) => {
                let notify = state.set_volume_local(volume);
                if notify {
                    if let Err(e) = remote.notify_volume_changed(volume) {
                        warn!("Volume notification failed: {}", e);
                    }
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Encoder poll failed: {}", e),
        }
    }
}
