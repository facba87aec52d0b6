//! Shared helpers for engine integration tests
//!
//! Engines under test run on a NullOutput driver, so tests pull frames
//! through the graph themselves and never need audio hardware. Track
//! fixtures are WAV files generated with hound.

#![allow(dead_code)]

use std::path::Path;

use tonedeck_engine::audio::output::NullOutput;
use tonedeck_engine::audio::types::AudioFrame;
use tonedeck_engine::events::EngineEvent;
use tonedeck_engine::{EngineConfig, PlaybackEngine};

/// Working sample rate for test engines
pub const TEST_RATE: u32 = 44100;

/// Engine on a null output at the standard test rate
pub fn test_engine() -> PlaybackEngine {
    test_engine_with_config(EngineConfig::default())
}

/// Engine on a null output with a caller-provided config
pub fn test_engine_with_config(config: EngineConfig) -> PlaybackEngine {
    PlaybackEngine::with_driver(config, Box::new(NullOutput::new(TEST_RATE)))
        .expect("engine construction on null output")
}

/// Write a stereo 16-bit WAV of `frames` frames of a quiet sine tone
pub fn write_sine_wav(path: &Path, frames: u32, sample_rate: u32) {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("create wav");
    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        let sample = ((2.0 * std::f32::consts::PI * 220.0 * t).sin() * 0.5 * i16::MAX as f32) as i16;
        writer.write_sample(sample).expect("write sample");
        writer.write_sample(sample).expect("write sample");
    }
    writer.finalize().expect("finalize wav");
}

/// In-memory WAV bytes, for serving over the test HTTP listener
pub fn sine_wav_bytes(frames: u32, sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("create wav writer");
        for i in 0..frames {
            let t = i as f32 / sample_rate as f32;
            let sample =
                ((2.0 * std::f32::consts::PI * 220.0 * t).sin() * 0.5 * i16::MAX as f32) as i16;
            writer.write_sample(sample).expect("write sample");
            writer.write_sample(sample).expect("write sample");
        }
        writer.finalize().expect("finalize wav");
    }
    cursor.into_inner()
}

/// Pull `frames` frames through the engine's graph
pub fn render(engine: &PlaybackEngine, frames: usize) -> Vec<AudioFrame> {
    let mut out = vec![AudioFrame::zero(); frames];
    engine.graph().render_block(&mut out);
    out
}

/// Drain all currently queued events from a receiver
pub fn drain_events(
    rx: &mut tokio::sync::broadcast::Receiver<EngineEvent>,
) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// True if every frame in the block is exactly silent
pub fn all_silent(frames: &[AudioFrame]) -> bool {
    frames.iter().all(|f| f.left == 0.0 && f.right == 0.0)
}
