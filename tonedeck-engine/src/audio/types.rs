//! Core audio data types
//!
//! Structures for decoded tracks and single frames used throughout the
//! playback path.
//!
//! **Format:**
//! - Samples are f32 (floating point -1.0 to 1.0)
//! - Stereo interleaved: [L, R, L, R, ...]
//! - Sample rate matches the audio graph's working rate after load

use std::path::PathBuf;

/// A fully decoded audio track held in RAM.
///
/// Keeping the whole track resident makes seeking a pure index computation
/// and lets the time/pitch stage read grains at arbitrary offsets.
#[derive(Debug, Clone)]
pub struct TrackBuffer {
    /// Path the track was decoded from
    pub path: PathBuf,

    /// PCM audio samples (interleaved stereo)
    /// Index pattern: 0=left, 1=right, 2=left, 3=right, etc.
    pub samples: Vec<f32>,

    /// Sample rate of `samples` (the graph's working rate)
    pub sample_rate: u32,

    /// Channel count (always 2 after decode)
    pub channel_count: u16,

    /// Number of stereo frames (samples.len() / 2)
    pub frame_count: u64,
}

impl TrackBuffer {
    /// Create a new TrackBuffer from interleaved stereo samples
    pub fn new(path: PathBuf, samples: Vec<f32>, sample_rate: u32) -> Self {
        let frame_count = (samples.len() / 2) as u64;
        Self {
            path,
            samples,
            sample_rate,
            channel_count: 2,
            frame_count,
        }
    }

    /// Track duration in seconds (frame count / sample rate)
    pub fn duration_seconds(&self) -> f32 {
        self.frame_count as f32 / self.sample_rate as f32
    }

    /// Audio frame at a specific frame index
    pub fn frame(&self, index: u64) -> Option<AudioFrame> {
        let sample_index = (index as usize).checked_mul(2)?;
        if sample_index + 1 < self.samples.len() {
            Some(AudioFrame {
                left: self.samples[sample_index],
                right: self.samples[sample_index + 1],
            })
        } else {
            None
        }
    }
}

/// A single stereo sample (one frame of audio).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioFrame {
    /// Left channel sample
    pub left: f32,

    /// Right channel sample
    pub right: f32,
}

impl AudioFrame {
    /// A silent frame (0.0, 0.0)
    pub fn zero() -> Self {
        AudioFrame {
            left: 0.0,
            right: 0.0,
        }
    }

    /// Frame from a mono sample (duplicated to both channels)
    pub fn from_mono(sample: f32) -> Self {
        AudioFrame {
            left: sample,
            right: sample,
        }
    }

    /// Frame from left and right samples
    pub fn from_stereo(left: f32, right: f32) -> Self {
        AudioFrame { left, right }
    }

    /// Apply volume scaling to both channels
    pub fn apply_volume(&mut self, volume: f32) {
        self.left *= volume;
        self.right *= volume;
    }

    /// Clamp samples to [-1.0, 1.0] to prevent clipping
    pub fn clamp(&mut self) {
        self.left = self.left.clamp(-1.0, 1.0);
        self.right = self.right.clamp(-1.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_track_buffer_creation() {
        let samples = vec![0.5, -0.5, 0.25, -0.25]; // 2 stereo frames
        let buffer = TrackBuffer::new(PathBuf::from("a.wav"), samples.clone(), 44100);

        assert_eq!(buffer.samples, samples);
        assert_eq!(buffer.sample_rate, 44100);
        assert_eq!(buffer.channel_count, 2);
        assert_eq!(buffer.frame_count, 2);
    }

    #[test]
    fn test_track_buffer_duration() {
        // 441000 frames at 44.1kHz must report exactly 10 seconds
        let samples = vec![0.0; 441000 * 2];
        let buffer = TrackBuffer::new(PathBuf::from("a.wav"), samples, 44100);

        assert_eq!(buffer.duration_seconds(), 10.0);
    }

    #[test]
    fn test_track_buffer_frame_access() {
        let samples = vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        let buffer = TrackBuffer::new(PathBuf::from("a.wav"), samples, 44100);

        let frame0 = buffer.frame(0).unwrap();
        assert_eq!(frame0.left, 0.1);
        assert_eq!(frame0.right, 0.2);

        let frame2 = buffer.frame(2).unwrap();
        assert_eq!(frame2.left, 0.5);
        assert_eq!(frame2.right, 0.6);

        // Out of bounds
        assert!(buffer.frame(3).is_none());
    }

    #[test]
    fn test_audio_frame_zero() {
        let frame = AudioFrame::zero();
        assert_eq!(frame.left, 0.0);
        assert_eq!(frame.right, 0.0);
    }

    #[test]
    fn test_audio_frame_from_mono() {
        let frame = AudioFrame::from_mono(0.5);
        assert_eq!(frame.left, 0.5);
        assert_eq!(frame.right, 0.5);
    }

    #[test]
    fn test_audio_frame_apply_volume() {
        let mut frame = AudioFrame::from_stereo(0.5, -0.5);
        frame.apply_volume(0.5);
        assert_eq!(frame.left, 0.25);
        assert_eq!(frame.right, -0.25);
    }

    #[test]
    fn test_audio_frame_clamp() {
        let mut frame = AudioFrame::from_stereo(1.5, -1.5);
        frame.clamp();
        assert_eq!(frame.left, 1.0);
        assert_eq!(frame.right, -1.0);
    }
}
