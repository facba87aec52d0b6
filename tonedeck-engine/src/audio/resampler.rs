//! Audio resampling using rubato
//!
//! Converts decoded audio to the graph's working sample rate once at load
//! time, keeping the real-time path free of rate conversion.

use rubato::{FastFixedIn, Resampler as RubatoResampler};
use tracing::debug;

use crate::error::{Error, Result};

/// Offline resampler for whole decoded tracks.
pub struct Resampler;

impl Resampler {
    /// Resample interleaved audio from `input_rate` to `output_rate`.
    ///
    /// # Arguments
    /// - `input`: Interleaved audio samples
    /// - `input_rate`: Input sample rate
    /// - `output_rate`: Target sample rate
    /// - `channels`: Number of channels (2 for the playback path)
    ///
    /// # Notes
    /// If input is already at the target rate, returns a copy without
    /// resampling.
    pub fn resample(
        input: &[f32],
        input_rate: u32,
        output_rate: u32,
        channels: u16,
    ) -> Result<Vec<f32>> {
        if input_rate == output_rate {
            debug!("Sample rate already at {}Hz, skipping resample", output_rate);
            return Ok(input.to_vec());
        }

        if input.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            "Resampling from {}Hz to {}Hz ({} channels)",
            input_rate, output_rate, channels
        );

        // rubato expects planar (per-channel) input
        let planar_input = Self::deinterleave(input, channels);
        let input_frames = planar_input[0].len();

        // FastFixedIn gives a good quality/performance tradeoff for a
        // one-shot conversion of a full track
        let mut resampler = FastFixedIn::<f32>::new(
            output_rate as f64 / input_rate as f64,
            1.0, // no runtime ratio changes
            rubato::PolynomialDegree::Septic,
            input_frames,
            channels as usize,
        )
        .map_err(|e| Error::Decode(format!("Failed to create resampler: {}", e)))?;

        let planar_output = resampler
            .process(&planar_input, None)
            .map_err(|e| Error::Decode(format!("Resampling failed: {}", e)))?;

        let interleaved = Self::interleave(planar_output);

        debug!(
            "Resampled {} input frames to {} output frames",
            input_frames,
            interleaved.len() / channels as usize
        );

        Ok(interleaved)
    }

    /// Convert interleaved samples to planar format.
    ///
    /// Input:  [L, R, L, R, ...]
    /// Output: [[L, L, ...], [R, R, ...]]
    fn deinterleave(samples: &[f32], channels: u16) -> Vec<Vec<f32>> {
        let num_channels = channels as usize;
        let num_frames = samples.len() / num_channels;

        let mut planar = vec![Vec::with_capacity(num_frames); num_channels];
        for frame_idx in 0..num_frames {
            for ch_idx in 0..num_channels {
                planar[ch_idx].push(samples[frame_idx * num_channels + ch_idx]);
            }
        }
        planar
    }

    /// Convert planar samples back to interleaved format.
    fn interleave(planar: Vec<Vec<f32>>) -> Vec<f32> {
        if planar.is_empty() {
            return Vec::new();
        }

        let num_channels = planar.len();
        let num_frames = planar[0].len();
        let mut interleaved = Vec::with_capacity(num_frames * num_channels);

        for frame_idx in 0..num_frames {
            for channel in planar.iter().take(num_channels) {
                interleaved.push(channel[frame_idx]);
            }
        }
        interleaved
    }
}
