//! Integration tests for the band-splitting pipeline
//!
//! Exercises the splitter through its public byte-frame entry point, the
//! way the transport's data callback drives it.

mod common;

use std::sync::Arc;

use biamp_common::events::EventBus;
use biamp_sink::audio::pipeline::BandSplitter;
use biamp_sink::audio::types::{AudioFormat, MAX_FRAME_BYTES, MAX_FRAME_SAMPLES};
use biamp_sink::state::SharedState;
use common::{CaptureSink, SinkLog};

fn splitter() -> (BandSplitter, SinkLog, SinkLog, Arc<SharedState>) {
    let state = Arc::new(SharedState::new(EventBus::new(16)));
    let (bass, bass_log) = CaptureSink::new();
    let (mid, mid_log) = CaptureSink::new();
    let splitter = BandSplitter::new(Arc::clone(&state), Box::new(bass), Box::new(mid));
    (splitter, bass_log, mid_log, state)
}

/// Encode samples as the little-endian byte stream the transport delivers.
fn to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

#[test]
fn both_bands_always_get_equal_sample_counts() {
    let (mut splitter, bass, mid, _state) = splitter();

    for frame in [vec![100i16; 7], vec![-100i16; 512], vec![0i16; 1]] {
        splitter.push_frame_bytes(&to_bytes(&frame)).unwrap();
    }

    let bass_frames = bass.frames();
    let mid_frames = mid.frames();
    assert_eq!(bass_frames.len(), 3);
    for (b, m) in bass_frames.iter().zip(mid_frames.iter()) {
        assert_eq!(b.len(), m.len());
    }
    assert_eq!(bass_frames[0].len(), 7);
    assert_eq!(bass_frames[1].len(), 512);
}

#[test]
fn filter_converges_geometrically_on_constant_input() {
    let (mut splitter, _bass, _mid, state) = splitter();
    state.set_volume_remote(250); // factor 0.5

    // Constant stream of 8000 -> x = 4000 per sample
    let frame = vec![8000i16; 256];
    splitter.push_frame_bytes(&to_bytes(&frame)).unwrap();

    // lp_y after k samples from zero: x * (1 - (1 - alpha)^k)
    let x = 4000.0f32;
    let expected = x * (1.0 - 0.96f32.powi(256));
    let actual = splitter.filter_output();
    assert!(
        (actual - expected).abs() < 1.0,
        "lp_y {} expected {}",
        actual,
        expected
    );
}

#[test]
fn volume_is_sampled_once_per_frame() {
    let (mut splitter, bass, _mid, state) = splitter();

    state.set_volume_remote(250); // factor 0.5
    splitter.push_frame_bytes(&to_bytes(&[1000; 4])).unwrap();

    state.set_volume_remote(125); // factor 0.25
    splitter.push_frame_bytes(&to_bytes(&[1000; 4])).unwrap();

    let frames = bass.frames();
    // 1000 * 0.5 * 0.3 = 150 vs 1000 * 0.25 * 0.3 = 75
    assert!(frames[0].iter().all(|&s| s == 150));
    assert!(frames[1].iter().all(|&s| s == 75));
}

#[test]
fn oversized_byte_frame_produces_no_output_and_keeps_filter_state() {
    let (mut splitter, bass, mid, state) = splitter();
    state.set_volume_remote(250);

    splitter.push_frame_bytes(&to_bytes(&[8000; 128])).unwrap();
    let lp_before = splitter.filter_output();
    assert_eq!(bass.frame_count(), 1);

    splitter
        .push_frame_bytes(&vec![0x7f; MAX_FRAME_BYTES + 1])
        .unwrap();

    assert_eq!(bass.frame_count(), 1);
    assert_eq!(mid.frame_count(), 1);
    assert_eq!(splitter.filter_output(), lp_before);
}

#[test]
fn frame_at_exact_capacity_is_processed() {
    let (mut splitter, bass, _mid, _state) = splitter();

    splitter
        .push_frame_bytes(&vec![0u8; MAX_FRAME_BYTES])
        .unwrap();

    assert_eq!(bass.frame_count(), 1);
    assert_eq!(bass.frames()[0].len(), MAX_FRAME_SAMPLES);
}

#[test]
fn zero_length_frame_is_a_noop() {
    let (mut splitter, bass, mid, _state) = splitter();

    splitter.push_frame_bytes(&[]).unwrap();

    // An empty write reaches the sinks; nothing else happens
    assert_eq!(bass.frames()[0].len(), 0);
    assert_eq!(mid.frames()[0].len(), 0);
    assert_eq!(splitter.filter_output(), 0.0);
}

#[test]
fn mute_silences_both_bands_at_full_capacity() {
    let (mut splitter, bass, mid, state) = splitter();
    state.set_volume_remote(250);

    splitter.push_frame_bytes(&to_bytes(&[12000; 64])).unwrap();
    splitter.mute().unwrap();

    for log in [bass, mid] {
        let frames = log.frames();
        let silent = &frames[1];
        assert_eq!(silent.len(), MAX_FRAME_SAMPLES);
        assert!(silent.iter().all(|&s| s == 0));
    }
}

#[test]
fn configure_reaches_both_sinks_independently() {
    let (mut splitter, bass, mid, _state) = splitter();

    let format = AudioFormat {
        sample_rate: 48000,
        channels: 1,
    };
    splitter.configure(format).unwrap();

    assert_eq!(bass.formats(), vec![format]);
    assert_eq!(mid.formats(), vec![format]);
}

#[test]
fn volume_at_zero_silences_output_but_filter_keeps_running() {
    let (mut splitter, bass, mid, state) = splitter();

    state.set_volume_remote(0);
    splitter.push_frame_bytes(&to_bytes(&[20000; 32])).unwrap();

    assert!(bass.frames()[0].iter().all(|&s| s == 0));
    assert!(mid.frames()[0].iter().all(|&s| s == 0));
    // x is zero everywhere, so the accumulator stays at zero too
    assert_eq!(splitter.filter_output(), 0.0);
}
