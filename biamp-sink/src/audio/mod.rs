//! Audio pipeline: band splitting, filtering, and output sinks

pub mod filter;
pub mod output;
pub mod pipeline;
pub mod types;

pub use filter::OnePoleLowPass;
pub use output::{CpalSink, PcmSink};
pub use pipeline::{BandGains, BandSplitter};
pub use types::{AudioFormat, MAX_FRAME_BYTES, MAX_FRAME_SAMPLES};
