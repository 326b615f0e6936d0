//! Push-button click/hold gesture decoder
//!
//! Translates level transitions on a single idle-high, active-low line
//! plus elapsed time into discrete gestures: a multi-click burst or a
//! long press. Exactly one gesture is reported per qualifying input.
//!
//! The classifier is a synchronous state machine with an injected clock;
//! [`run_button_task`] polls it at the fixed control cadence and hands
//! gestures to the session for dispatch. After a long press fires, the
//! machine sits in `AwaitingRelease` — polled at the same cadence — until
//! the line returns to idle, so a 10-second hold still dispatches only
//! once.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::controls::gpio::{InputLine, Level};
use crate::session::Session;
use crate::Result;

/// Gesture classification thresholds.
#[derive(Debug, Clone, Copy)]
pub struct GestureTiming {
    /// Maximum gap between clicks of one burst; also the settle time
    /// before a burst is dispatched
    pub click_timeout: Duration,
    /// Hold duration that turns a press into the power toggle
    pub long_press: Duration,
}

impl Default for GestureTiming {
    fn default() -> Self {
        Self {
            click_timeout: Duration::from_millis(400),
            long_press: Duration::from_millis(3000),
        }
    }
}

/// A classified button gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// A settled burst of `n` clicks (n >= 1)
    Clicks(u8),
    /// Held past the long-press threshold
    LongPress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Pressed,
    /// Long press fired; ignore everything until the line idles again
    AwaitingRelease,
}

/// Stateful gesture classifier for one button line.
pub struct ButtonDecoder<L: InputLine> {
    line: L,
    timing: GestureTiming,
    phase: Phase,
    last_level: Level,
    click_count: u8,
    last_click: Option<Instant>,
    press_start: Instant,
}

impl<L: InputLine> ButtonDecoder<L> {
    pub fn new(line: L, timing: GestureTiming, now: Instant) -> Self {
        Self {
            line,
            timing,
            phase: Phase::Idle,
            last_level: Level::High,
            click_count: 0,
            last_click: None,
            press_start: now,
        }
    }

    /// Run one poll iteration; returns a gesture when one settles.
    pub fn poll(&mut self, now: Instant) -> Result<Option<Gesture>> {
        let level = self.line.level()?;
        let mut gesture = None;

        if self.phase == Phase::AwaitingRelease {
            if level.is_high() {
                self.phase = Phase::Idle;
            }
            self.last_level = level;
            return Ok(None);
        }

        // Falling edge: a click starts, or a hold begins
        if self.last_level.is_high() && level.is_low() {
            if let Some(last) = self.last_click {
                if now.duration_since(last) > self.timing.click_timeout {
                    self.click_count = 0;
                }
            }
            self.click_count += 1;
            self.last_click = Some(now);
            self.press_start = now;
            self.phase = Phase::Pressed;
        }

        // Rising edge: the click is pending until the burst settles
        if self.last_level.is_low() && level.is_high() {
            self.phase = Phase::Idle;
        }

        // Still held past the threshold: long press, dispatched once
        if self.phase == Phase::Pressed
            && now.duration_since(self.press_start) > self.timing.long_press
        {
            gesture = Some(Gesture::LongPress);
            self.click_count = 0;
            self.phase = Phase::AwaitingRelease;
        }

        // Burst settled with no further click and no active press
        if gesture.is_none()
            && self.click_count > 0
            && self.phase != Phase::Pressed
        {
            if let Some(last) = self.last_click {
                if now.duration_since(last) > self.timing.click_timeout {
                    gesture = Some(Gesture::Clicks(self.click_count));
                    self.click_count = 0;
                }
            }
        }

        self.last_level = level;
        Ok(gesture)
    }
}

/// Fixed-cadence poll loop feeding gestures to the session.
///
/// Runs for the lifetime of the process regardless of session state —
/// the button is what powers the session on and off in the first place.
pub async fn run_button_task<L: InputLine>(
    mut decoder: ButtonDecoder<L>,
    session: Arc<Session>,
    poll_interval: Duration,
) {
    let mut interval = tokio::time::interval(poll_interval);
    debug!("Button poller started ({:?} interval)", poll_interval);

    loop {
        interval.tick().await;

        match decoder.poll(Instant::now()) {
            Ok(Some(gesture)) => {
                if let Err(e) = session.handle_gesture(gesture).await {
                    warn!("Gesture dispatch failed: {}", e);
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Button poll failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::gpio::MemoryLine;

    const TICK: Duration = Duration::from_millis(10);

    struct Harness {
        decoder: ButtonDecoder<MemoryLine>,
        line: MemoryLine,
        now: Instant,
    }

    impl Harness {
        fn new() -> Self {
            let line = MemoryLine::new(Level::High);
            let now = Instant::now();
            Self {
                decoder: ButtonDecoder::new(line.clone(), GestureTiming::default(), now),
                line,
                now,
            }
        }

        /// Advance time in poll-cadence ticks, collecting any gestures.
        fn run_for(&mut self, duration: Duration) -> Vec<Gesture> {
            let mut gestures = Vec::new();
            let ticks = (duration.as_millis() / TICK.as_millis()) as u32;
            for _ in 0..ticks {
                self.now += TICK;
                if let Some(g) = self.decoder.poll(self.now).unwrap() {
                    gestures.push(g);
                }
            }
            gestures
        }

        fn press_for(&mut self, duration: Duration) -> Vec<Gesture> {
            self.line.drive(Level::Low);
            let mut gestures = self.run_for(duration);
            self.line.drive(Level::High);
            gestures.extend(self.run_for(TICK));
            gestures
        }

        /// A click burst with 100ms press and 100ms gap per click.
        fn click(&mut self, count: u8) -> Vec<Gesture> {
            let mut gestures = Vec::new();
            for _ in 0..count {
                gestures.extend(self.press_for(Duration::from_millis(100)));
                gestures.extend(self.run_for(Duration::from_millis(100)));
            }
            gestures
        }
    }

    #[test]
    fn test_single_click_dispatches_after_timeout() {
        let mut h = Harness::new();
        assert!(h.click(1).is_empty());

        // Not yet settled at 400ms (strictly-greater comparison)...
        assert!(h.run_for(Duration::from_millis(200)).is_empty());
        // ...but settled once the timeout has clearly elapsed
        let gestures = h.run_for(Duration::from_millis(300));
        assert_eq!(gestures, vec![Gesture::Clicks(1)]);
    }

    #[test]
    fn test_four_clicks_dispatch_once_as_one_burst() {
        let mut h = Harness::new();
        let mut gestures = h.click(4);
        gestures.extend(h.run_for(Duration::from_millis(500)));
        assert_eq!(gestures, vec![Gesture::Clicks(4)]);
    }

    #[test]
    fn test_fifth_click_within_window_keeps_counting() {
        let mut h = Harness::new();
        let mut gestures = h.click(5);
        gestures.extend(h.run_for(Duration::from_millis(500)));
        // The burst settles as five clicks; mapping them to no command
        // is the dispatcher's decision, not the classifier's
        assert_eq!(gestures, vec![Gesture::Clicks(5)]);
    }

    #[test]
    fn test_gap_longer_than_timeout_splits_bursts() {
        let mut h = Harness::new();
        let mut gestures = h.click(2);
        gestures.extend(h.run_for(Duration::from_millis(500)));
        gestures.extend(h.click(1));
        gestures.extend(h.run_for(Duration::from_millis(500)));

        assert_eq!(gestures, vec![Gesture::Clicks(2), Gesture::Clicks(1)]);
    }

    #[test]
    fn test_long_press_dispatches_exactly_once() {
        let mut h = Harness::new();
        // Held for 10 seconds: one gesture, nothing further while held
        let gestures = h.press_for(Duration::from_millis(10_000));
        assert_eq!(gestures, vec![Gesture::LongPress]);

        // And no click burst is dispatched afterwards either
        assert!(h.run_for(Duration::from_millis(600)).is_empty());
    }

    #[test]
    fn test_short_press_is_not_a_long_press() {
        let mut h = Harness::new();
        let mut gestures = h.press_for(Duration::from_millis(2900));
        gestures.extend(h.run_for(Duration::from_millis(500)));
        assert_eq!(gestures, vec![Gesture::Clicks(1)]);
    }

    #[test]
    fn test_clicks_before_long_press_are_discarded() {
        let mut h = Harness::new();
        let mut gestures = h.click(2);
        // Third press turns into a hold
        gestures.extend(h.press_for(Duration::from_millis(4000)));
        gestures.extend(h.run_for(Duration::from_millis(600)));

        assert_eq!(gestures, vec![Gesture::LongPress]);
    }

    #[test]
    fn test_release_after_long_press_rearms_the_machine() {
        let mut h = Harness::new();
        assert_eq!(
            h.press_for(Duration::from_millis(4000)),
            vec![Gesture::LongPress]
        );

        let mut gestures = h.click(1);
        gestures.extend(h.run_for(Duration::from_millis(500)));
        assert_eq!(gestures, vec![Gesture::Clicks(1)]);
    }
}
