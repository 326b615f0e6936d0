//! Core audio data types and capacity constants

/// Maximum accepted frame size in bytes.
///
/// Frames larger than this are dropped whole; the working buffers are
/// sized so a maximum frame never reallocates on the audio path.
pub const MAX_FRAME_BYTES: usize = 8192;

/// Maximum accepted frame size in 16-bit samples
pub const MAX_FRAME_SAMPLES: usize = MAX_FRAME_BYTES / 2;

/// Stream format negotiated by the transport's codec layer.
///
/// The two output sinks are reconfigured independently whenever the
/// negotiated format changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    /// Samples per second per channel
    pub sample_rate: u32,
    /// Interleaved channel count
    pub channels: u16,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} Hz, {} ch", self.sample_rate, self.channels)
    }
}
