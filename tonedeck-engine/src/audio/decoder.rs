//! Audio decoder using symphonia
//!
//! Decodes audio files (MP3, FLAC, AAC, Vorbis, WAV, ...) to interleaved
//! stereo f32 PCM, then normalizes the sample rate to the graph's working
//! rate so playback never resamples on the audio thread.

use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::audio::resampler::Resampler;
use crate::audio::types::TrackBuffer;
use crate::error::{Error, Result};

/// Whole-file audio decoder.
///
/// Decodes the entire track into RAM in one pass. The tracks this engine
/// targets are single songs, so a full in-memory buffer keeps scheduling
/// and seeking trivial.
pub struct TrackDecoder;

impl TrackDecoder {
    /// Decode a file and normalize it to `target_rate` stereo.
    ///
    /// # Errors
    /// - Unreadable path, unsupported format, or corrupt stream
    ///
    /// The returned buffer fully replaces any previous track; on error no
    /// partial buffer escapes.
    pub fn decode_track(path: &Path, target_rate: u32) -> Result<TrackBuffer> {
        let (samples, sample_rate, channels) = Self::decode_file(path)?;

        if samples.is_empty() {
            return Err(Error::Decode(format!(
                "No audio frames decoded from {}",
                path.display()
            )));
        }

        let stereo = Self::to_stereo(samples, channels);

        let normalized = if sample_rate != target_rate {
            Resampler::resample(&stereo, sample_rate, target_rate, 2)?
        } else {
            stereo
        };

        Ok(TrackBuffer::new(path.to_path_buf(), normalized, target_rate))
    }

    /// Decode an entire audio file to PCM samples.
    ///
    /// # Returns
    /// - `samples`: Interleaved f32 samples in the source channel layout
    /// - `sample_rate`: Source sample rate
    /// - `channels`: Source channel count
    pub fn decode_file(path: &Path) -> Result<(Vec<f32>, u32, u16)> {
        debug!("Decoding file: {}", path.display());

        let file = std::fs::File::open(path)
            .map_err(|e| Error::Decode(format!("Failed to open {}: {}", path.display(), e)))?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Hint the format registry with the file extension
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| Error::Decode(format!("Failed to probe format: {}", e)))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::Decode("No audio track found".to_string()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| Error::Decode("Sample rate not found".to_string()))?;

        let channels = codec_params
            .channels
            .map(|c| c.count() as u16)
            .ok_or_else(|| Error::Decode("Channel count not found".to_string()))?;

        debug!(
            "Source format: sample_rate={}, channels={}",
            sample_rate, channels
        );

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| Error::Decode(format!("Failed to create decoder: {}", e)))?;

        let mut samples = Vec::new();
        let mut sample_buf: Option<SampleBuffer<f32>> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(symphonia::core::errors::Error::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    debug!("Reached end of file");
                    break;
                }
                Err(e) => {
                    warn!("Error reading packet: {}", e);
                    break;
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    if sample_buf.is_none() {
                        let spec = *decoded.spec();
                        sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
                    }
                    let buf = sample_buf.as_mut().unwrap();
                    buf.copy_interleaved_ref(decoded);
                    samples.extend_from_slice(buf.samples());
                }
                Err(e) => {
                    // A corrupt packet does not abort the whole decode
                    warn!("Decode error: {}", e);
                    continue;
                }
            }
        }

        debug!(
            "Decoded {} samples ({} frames)",
            samples.len(),
            samples.len() / channels.max(1) as usize
        );

        Ok((samples, sample_rate, channels))
    }

    /// Convert interleaved samples of any channel count to stereo.
    ///
    /// Mono is duplicated, stereo passes through, wider layouts keep their
    /// first two channels.
    fn to_stereo(samples: Vec<f32>, channels: u16) -> Vec<f32> {
        match channels {
            2 => samples,
            0 | 1 => {
                let mut stereo = Vec::with_capacity(samples.len() * 2);
                for sample in samples {
                    stereo.push(sample);
                    stereo.push(sample);
                }
                stereo
            }
            n => {
                let n = n as usize;
                let frames = samples.len() / n;
                let mut stereo = Vec::with_capacity(frames * 2);
                for frame in 0..frames {
                    stereo.push(samples[frame * n]);
                    stereo.push(samples[frame * n + 1]);
                }
                stereo
            }
        }
    }
}
