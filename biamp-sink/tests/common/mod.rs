//! Shared test doubles for integration tests
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use biamp_sink::audio::output::PcmSink;
use biamp_sink::audio::types::AudioFormat;
use biamp_sink::remote::{KeyState, PassthroughCommand, RemoteControl};
use biamp_sink::Result;

/// Inspection handle for a [`CaptureSink`].
#[derive(Clone)]
pub struct SinkLog {
    frames: Arc<Mutex<Vec<Vec<i16>>>>,
    formats: Arc<Mutex<Vec<AudioFormat>>>,
}

impl SinkLog {
    pub fn frames(&self) -> Vec<Vec<i16>> {
        self.frames.lock().unwrap().clone()
    }

    pub fn formats(&self) -> Vec<AudioFormat> {
        self.formats.lock().unwrap().clone()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.lock().unwrap().len()
    }
}

/// Sink that records every write and configure call.
pub struct CaptureSink {
    log: SinkLog,
}

impl CaptureSink {
    pub fn new() -> (Self, SinkLog) {
        let log = SinkLog {
            frames: Arc::new(Mutex::new(Vec::new())),
            formats: Arc::new(Mutex::new(Vec::new())),
        };
        (Self { log: log.clone() }, log)
    }

    /// Sink appending to an existing log; lets a factory rebuild sinks
    /// across session installs while tests keep one inspection handle.
    pub fn with_log(log: SinkLog) -> Self {
        Self { log }
    }
}

impl PcmSink for CaptureSink {
    fn write(&mut self, samples: &[i16]) -> Result<()> {
        self.log.frames.lock().unwrap().push(samples.to_vec());
        Ok(())
    }

    fn configure(&mut self, format: AudioFormat) -> Result<()> {
        self.log.formats.lock().unwrap().push(format);
        Ok(())
    }
}

/// Remote that records passthrough traffic and volume notifications.
#[derive(Default)]
pub struct RecordingRemote {
    pub events: Mutex<Vec<(PassthroughCommand, KeyState)>>,
    pub notifications: Mutex<Vec<u8>>,
}

impl RecordingRemote {
    pub fn commands(&self) -> Vec<PassthroughCommand> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, state)| *state == KeyState::Pressed)
            .map(|(command, _)| *command)
            .collect()
    }

    pub fn notified(&self) -> Vec<u8> {
        self.notifications.lock().unwrap().clone()
    }
}

impl RemoteControl for RecordingRemote {
    fn passthrough(&self, command: PassthroughCommand, state: KeyState) -> Result<()> {
        self.events.lock().unwrap().push((command, state));
        Ok(())
    }

    fn notify_volume_changed(&self, volume: u8) -> Result<()> {
        self.notifications.lock().unwrap().push(volume);
        Ok(())
    }
}
