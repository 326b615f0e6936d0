//! Audio output sinks
//!
//! Defines the blocking sink interface the pipeline writes to, plus the
//! cpal-backed implementation used by the daemon. Each band gets its own
//! sink so the two outputs can be reconfigured independently.
//!
//! The cpal callback runs on a real-time audio thread and pulls samples
//! from a lock-free ring buffer; the pipeline side pushes into the same
//! ring and blocks while it is full. That blocking push is the sink's
//! backpressure: the pipeline cannot run ahead of the device, and a
//! stalled device stalls the pipeline rather than erroring out.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};
use tracing::{debug, info, warn};

use crate::audio::types::AudioFormat;
use crate::error::{Error, Result};

/// Pause between push attempts while the ring buffer is full
const FULL_RING_BACKOFF: Duration = Duration::from_millis(1);

/// Ring capacity in seconds of audio, per sink
const RING_SECONDS: f32 = 0.5;

/// Blocking PCM output accepting one band of the split stream.
///
/// `write` must not return until the sink accepted the entire frame;
/// there is deliberately no timeout and no cancellation path.
pub trait PcmSink: Send {
    /// Write a whole frame of 16-bit samples, blocking until accepted.
    fn write(&mut self, samples: &[i16]) -> Result<()>;

    /// Tear down and rebuild the sink for a newly negotiated format.
    fn configure(&mut self, format: AudioFormat) -> Result<()>;
}

/// cpal-backed sink for one output band.
pub struct CpalSink {
    /// Band label for logs ("bass" / "mid")
    label: String,
    device: Device,
    format: AudioFormat,
    producer: Option<HeapProd<i16>>,
    underruns: Arc<AtomicU64>,
    /// Output stream, kept alive while the sink is configured.
    /// Stream is not Send; it is only created, kept, and dropped here,
    /// never driven from another thread.
    stream: Option<Stream>,
}

// SAFETY: all fields except `stream` are Send. The stream is never
// accessed after creation apart from being dropped on reconfigure or
// teardown; the cpal callback thread owns its own consumer handle.
unsafe impl Send for CpalSink {}

impl CpalSink {
    /// Open an output device for one band.
    ///
    /// Falls back to the default output device when the requested name is
    /// not found; no stream is built until [`PcmSink::configure`] runs.
    pub fn new(device_name: Option<String>, label: impl Into<String>) -> Result<Self> {
        let label = label.into();
        let host = cpal::default_host();

        let device = if let Some(name) = device_name.as_ref() {
            let mut devices = host
                .output_devices()
                .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?;

            match devices.find(|d| d.name().ok().as_deref() == Some(name)) {
                Some(dev) => {
                    info!("[{}] Using requested audio device: {}", label, name);
                    dev
                }
                None => {
                    warn!(
                        "[{}] Device '{}' not found, falling back to default device",
                        label, name
                    );
                    host.default_output_device().ok_or_else(|| {
                        Error::AudioOutput(format!(
                            "Device '{}' not found and no default device available",
                            name
                        ))
                    })?
                }
            }
        } else {
            let dev = host
                .default_output_device()
                .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))?;
            info!(
                "[{}] Using default audio device: {}",
                label,
                dev.name().unwrap_or_else(|_| "Unknown".to_string())
            );
            dev
        };

        Ok(Self {
            label,
            device,
            format: AudioFormat::default(),
            producer: None,
            underruns: Arc::new(AtomicU64::new(0)),
            stream: None,
        })
    }

    /// Number of callback underruns since the sink was configured.
    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }

    /// Pick a supported stream config matching the requested format.
    fn pick_config(&self, format: AudioFormat) -> Result<(StreamConfig, SampleFormat)> {
        let mut supported = self
            .device
            .supported_output_configs()
            .map_err(|e| Error::AudioOutput(format!("Failed to get device configs: {}", e)))?;

        let matching = supported.find(|c| {
            c.channels() == format.channels
                && c.min_sample_rate().0 <= format.sample_rate
                && c.max_sample_rate().0 >= format.sample_rate
                && (c.sample_format() == SampleFormat::I16 || c.sample_format() == SampleFormat::F32)
        });

        if let Some(supported_config) = matching {
            let sample_format = supported_config.sample_format();
            let config = supported_config
                .with_sample_rate(cpal::SampleRate(format.sample_rate))
                .config();
            return Ok((config, sample_format));
        }

        // Fallback: device default, letting the backend resample
        let supported_config = self
            .device
            .default_output_config()
            .map_err(|e| Error::AudioOutput(format!("Failed to get default config: {}", e)))?;
        let sample_format = supported_config.sample_format();
        Ok((supported_config.config(), sample_format))
    }

    fn build_stream(&mut self, format: AudioFormat) -> Result<()> {
        let (config, sample_format) = self.pick_config(format)?;

        let ring_capacity =
            (format.sample_rate as f32 * format.channels as f32 * RING_SECONDS) as usize;
        let ring = HeapRb::<i16>::new(ring_capacity.max(1024));
        let (producer, consumer) = ring.split();

        debug!(
            "[{}] Stream config: sample_rate={}, channels={}, format={:?}, ring={} samples",
            self.label, config.sample_rate.0, config.channels, sample_format, ring_capacity
        );

        let underruns = Arc::clone(&self.underruns);
        let label = self.label.clone();
        let stream = match sample_format {
            SampleFormat::I16 => self.build_stream_i16(&config, consumer, underruns)?,
            SampleFormat::F32 => self.build_stream_f32(&config, consumer, underruns)?,
            other => {
                return Err(Error::AudioOutput(format!(
                    "[{}] Unsupported sample format: {:?}",
                    label, other
                )));
            }
        };

        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;

        self.producer = Some(producer);
        self.stream = Some(stream);
        self.format = format;
        info!("[{}] Output stream started: {}", self.label, format);
        Ok(())
    }

    fn build_stream_i16(
        &self,
        config: &StreamConfig,
        mut consumer: HeapCons<i16>,
        underruns: Arc<AtomicU64>,
    ) -> Result<Stream> {
        self.device
            .build_output_stream(
                config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    let popped = consumer.pop_slice(data);
                    if popped < data.len() {
                        // Underrun: pad with silence rather than glitching
                        data[popped..].fill(0);
                        underruns.fetch_add(1, Ordering::Relaxed);
                    }
                },
                |err| warn!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))
    }

    fn build_stream_f32(
        &self,
        config: &StreamConfig,
        mut consumer: HeapCons<i16>,
        underruns: Arc<AtomicU64>,
    ) -> Result<Stream> {
        self.device
            .build_output_stream(
                config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut popped = 0;
                    for slot in data.iter_mut() {
                        match consumer.try_pop() {
                            Some(s) => {
                                *slot = s as f32 / 32768.0;
                                popped += 1;
                            }
                            None => *slot = 0.0,
                        }
                    }
                    if popped < data.len() {
                        underruns.fetch_add(1, Ordering::Relaxed);
                    }
                },
                |err| warn!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))
    }

    fn teardown(&mut self) {
        if let Some(stream) = self.stream.take() {
            // Dropping the stream stops playback; pause first so the
            // callback is quiesced before the ring goes away.
            let _ = stream.pause();
        }
        self.producer = None;
    }
}

impl PcmSink for CpalSink {
    fn write(&mut self, samples: &[i16]) -> Result<()> {
        let producer = self.producer.as_mut().ok_or_else(|| {
            Error::AudioOutput(format!("[{}] Sink is not configured", self.label))
        })?;

        // Blocking push: spin-with-sleep until the device drained enough.
        // No timeout here — backpressure from a stalled device is the
        // documented behavior.
        let mut written = 0;
        while written < samples.len() {
            written += producer.push_slice(&samples[written..]);
            if written < samples.len() {
                std::thread::sleep(FULL_RING_BACKOFF);
            }
        }
        Ok(())
    }

    fn configure(&mut self, format: AudioFormat) -> Result<()> {
        self.teardown();
        self.build_stream(format)
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        self.teardown();
    }
}
