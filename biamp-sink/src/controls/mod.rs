//! Physical controls: digital I/O lines, rotary encoder, push-button

pub mod button;
pub mod encoder;
pub mod gpio;

pub use button::{ButtonDecoder, Gesture, GestureTiming};
pub use encoder::EncoderDecoder;
pub use gpio::{InputLine, Level, MemoryLine, OutputLine};
