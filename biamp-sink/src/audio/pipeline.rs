//! Band-splitting audio pipeline
//!
//! Consumes decoded 16-bit PCM frames pushed by the transport's data
//! callback and produces two frequency-weighted frames of equal length:
//! a "bass" band and its high-pass complement ("mid"). Both are delivered
//! to their output sinks with blocking writes before the call returns, so
//! the pipeline can never run ahead of the output devices.
//!
//! Per sample `s`, with `vol` read once per frame:
//!
//! ```text
//! x    = s * min(1.0, vol / 500)
//! lp_y = alpha * x + (1 - alpha) * lp_y
//! bass = clip(x * gain_bass)            // raw signal, not lp_y
//! mid  = clip((x - lp_y) * gain_mid)
//! ```
//!
//! The bass branch intentionally scales the raw signal rather than the
//! smoothed one; the low-pass state only shapes the mid complement.
//!
//! A frame larger than [`MAX_FRAME_BYTES`] is dropped whole: no partial
//! processing, no sink writes, filter state untouched. This is defined
//! behavior toward the caller, not an error.

use std::sync::Arc;

use tracing::debug;

use crate::audio::filter::OnePoleLowPass;
use crate::audio::output::PcmSink;
use crate::audio::types::{AudioFormat, MAX_FRAME_BYTES, MAX_FRAME_SAMPLES};
use crate::state::{SharedState, CONTROLLER_VOLUME_SPAN};
use crate::Result;

/// Per-band gain factors, selected by the party-mode flag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandGains {
    pub bass: f32,
    pub mid: f32,
}

impl BandGains {
    /// Gain preset for the given party-mode flag.
    pub fn for_party_mode(enabled: bool) -> Self {
        if enabled {
            Self { bass: 1.0, mid: 1.0 }
        } else {
            Self { bass: 0.3, mid: 0.3 }
        }
    }
}

/// Clip to the 16-bit sample range before narrowing.
#[inline]
fn clip_to_i16(value: f32) -> i16 {
    value.clamp(-32768.0, 32767.0) as i16
}

/// Two-band splitter with blocking delivery to a pair of output sinks.
///
/// Owns the crossover filter state, the output sinks, and two working
/// buffers pre-sized to the maximum frame so the audio path never
/// allocates.
pub struct BandSplitter {
    state: Arc<SharedState>,
    bass_sink: Box<dyn PcmSink>,
    mid_sink: Box<dyn PcmSink>,
    filter: OnePoleLowPass,
    scratch_bass: Vec<i16>,
    scratch_mid: Vec<i16>,
}

impl BandSplitter {
    pub fn new(
        state: Arc<SharedState>,
        bass_sink: Box<dyn PcmSink>,
        mid_sink: Box<dyn PcmSink>,
    ) -> Self {
        Self {
            state,
            bass_sink,
            mid_sink,
            filter: OnePoleLowPass::default(),
            scratch_bass: Vec::with_capacity(MAX_FRAME_SAMPLES),
            scratch_mid: Vec::with_capacity(MAX_FRAME_SAMPLES),
        }
    }

    /// Push one frame as delivered by the transport: a byte buffer of
    /// little-endian 16-bit samples, valid only for this call.
    ///
    /// A zero-length frame is a no-op; an odd trailing byte is ignored.
    pub fn push_frame_bytes(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > MAX_FRAME_BYTES {
            debug!("Dropping oversized audio frame: {} bytes", data.len());
            return Ok(());
        }

        let (vol_factor, gains) = self.frame_factors();
        self.scratch_bass.clear();
        self.scratch_mid.clear();
        for pair in data.chunks_exact(2) {
            let s = i16::from_le_bytes([pair[0], pair[1]]);
            self.split_sample(s, vol_factor, gains);
        }
        self.write_bands()
    }

    /// Process one frame of already-deserialized samples.
    pub fn process_frame(&mut self, samples: &[i16]) -> Result<()> {
        if samples.len() > MAX_FRAME_SAMPLES {
            debug!("Dropping oversized audio frame: {} samples", samples.len());
            return Ok(());
        }

        let (vol_factor, gains) = self.frame_factors();
        self.scratch_bass.clear();
        self.scratch_mid.clear();
        for &s in samples {
            self.split_sample(s, vol_factor, gains);
        }
        self.write_bands()
    }

    /// Fill both bands with silence for one full-capacity frame.
    ///
    /// Used at session stop to drain the outputs to a known-silent level
    /// before the sinks are reconfigured or torn down.
    pub fn mute(&mut self) -> Result<()> {
        self.scratch_bass.clear();
        self.scratch_bass.resize(MAX_FRAME_SAMPLES, 0);
        self.scratch_mid.clear();
        self.scratch_mid.resize(MAX_FRAME_SAMPLES, 0);
        self.write_bands()
    }

    /// Reconfigure both output sinks for a newly negotiated format.
    pub fn configure(&mut self, format: AudioFormat) -> Result<()> {
        self.bass_sink.configure(format)?;
        self.mid_sink.configure(format)?;
        Ok(())
    }

    /// Current crossover accumulator value (diagnostic).
    pub fn filter_output(&self) -> f32 {
        self.filter.output()
    }

    /// Read volume and gain preset once per frame. The volume may be
    /// written concurrently by the encoder; staleness of at most one
    /// frame is expected and acceptable.
    fn frame_factors(&self) -> (f32, BandGains) {
        let vol_factor = (self.state.volume() as f32 / CONTROLLER_VOLUME_SPAN).min(1.0);
        let gains = BandGains::for_party_mode(self.state.party_mode());
        (vol_factor, gains)
    }

    #[inline]
    fn split_sample(&mut self, s: i16, vol_factor: f32, gains: BandGains) {
        let x = s as f32 * vol_factor;
        let lp_y = self.filter.process(x);

        self.scratch_bass.push(clip_to_i16(x * gains.bass));
        self.scratch_mid.push(clip_to_i16((x - lp_y) * gains.mid));
    }

    fn write_bands(&mut self) -> Result<()> {
        self.bass_sink.write(&self.scratch_bass)?;
        self.mid_sink.write(&self.scratch_mid)?;
        Ok(())
    }
}
