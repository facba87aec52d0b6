//! Audio output drivers
//!
//! The graph hands each driver a render callback that fills a block of
//! [`AudioFrame`]s; the driver owns the pacing. [`CpalOutput`] drives a real
//! device through cpal, [`NullOutput`] accepts the callback and discards it
//! for headless hosts and tests (the embedder pulls frames manually).

use std::sync::mpsc;
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, StreamConfig};
use tracing::{debug, error, info, warn};

use crate::audio::types::AudioFrame;
use crate::error::{Error, Result};

/// Render callback filling one block of frames per invocation.
///
/// Invoked on the driver's audio thread; must not block.
pub type RenderFn = Box<dyn FnMut(&mut [AudioFrame]) + Send + 'static>;

/// Output stage of the audio graph.
pub trait OutputDriver: Send {
    /// Working sample rate the graph should render at
    fn sample_rate(&self) -> u32;

    /// Begin pulling audio through `render`.
    ///
    /// # Errors
    /// Device or stream initialization failure. This is fatal for the
    /// owning engine instance.
    fn start(&mut self, render: RenderFn) -> Result<()>;

    /// Stop pulling audio and release the device
    fn stop(&mut self) -> Result<()>;
}

/// Audio output using cpal.
///
/// Device and stream configuration are negotiated at construction so the
/// graph knows its working sample rate before any node is built. The cpal
/// stream itself is not `Send`, so `start` parks it on a dedicated output
/// thread that lives until `stop`.
pub struct CpalOutput {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    worker: Option<OutputWorker>,
}

struct OutputWorker {
    handle: JoinHandle<()>,
    shutdown_tx: mpsc::Sender<()>,
}

impl CpalOutput {
    /// Open an audio device for output.
    ///
    /// # Arguments
    /// - `device_name`: Optional device name (None = default device)
    /// - `buffer_size`: Optional buffer size in frames (None = device default)
    ///
    /// # Fallback Behavior
    /// If the requested device is not found, falls back to the default
    /// device rather than failing.
    pub fn new(device_name: Option<String>, buffer_size: Option<u32>) -> Result<Self> {
        let host = cpal::default_host();

        let device = if let Some(name) = device_name.as_ref() {
            let mut devices = host
                .output_devices()
                .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?;

            match devices.find(|d| d.name().ok().as_ref() == Some(name)) {
                Some(dev) => {
                    info!("Found requested audio device: {}", name);
                    dev
                }
                None => {
                    warn!(
                        "Requested device '{}' not found, falling back to default device",
                        name
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
            host.default_output_device()
                .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))?
        };

        info!(
            "Using audio device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let (mut config, sample_format) = Self::get_best_config(&device)?;

        if let Some(size) = buffer_size {
            config.buffer_size = cpal::BufferSize::Fixed(size);
            debug!("Using requested buffer size: {} frames", size);
        }

        debug!(
            "Audio config: sample_rate={}, channels={}, format={:?}, buffer_size={:?}",
            config.sample_rate.0, config.channels, sample_format, config.buffer_size
        );

        Ok(Self {
            device,
            config,
            sample_format,
            worker: None,
        })
    }

    /// Pick the best supported configuration for playback.
    ///
    /// Prefers 44.1kHz, stereo, f32 samples; falls back to the device
    /// default otherwise.
    fn get_best_config(device: &Device) -> Result<(StreamConfig, SampleFormat)> {
        let mut supported_configs = device
            .supported_output_configs()
            .map_err(|e| Error::AudioOutput(format!("Failed to get device configs: {}", e)))?;

        let preferred = supported_configs.find(|config| {
            config.channels() == 2
                && config.min_sample_rate().0 <= 44100
                && config.max_sample_rate().0 >= 44100
                && config.sample_format() == SampleFormat::F32
        });

        if let Some(supported_config) = preferred {
            let sample_format = supported_config.sample_format();
            let config = supported_config
                .with_sample_rate(cpal::SampleRate(44100))
                .config();
            return Ok((config, sample_format));
        }

        let supported_config = device
            .default_output_config()
            .map_err(|e| Error::AudioOutput(format!("Failed to get default config: {}", e)))?;

        let sample_format = supported_config.sample_format();
        Ok((supported_config.config(), sample_format))
    }

    fn build_and_run(
        device: Device,
        config: StreamConfig,
        sample_format: SampleFormat,
        mut render: RenderFn,
        ready_tx: mpsc::SyncSender<Result<()>>,
        shutdown_rx: mpsc::Receiver<()>,
    ) {
        let channels = config.channels as usize;
        let mut scratch: Vec<AudioFrame> = Vec::new();

        // One closure per sample format; each renders a block of frames
        // and converts into the device's native layout.
        let err_fn = |err| error!("Audio stream error: {}", err);

        let stream = match sample_format {
            SampleFormat::F32 => device.build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let frames = data.len() / channels;
                    scratch.resize(frames, AudioFrame::zero());
                    render(&mut scratch[..frames]);

                    for (out, frame) in data.chunks_mut(channels).zip(&scratch) {
                        out[0] = frame.left;
                        if channels > 1 {
                            out[1] = frame.right;
                        }
                    }
                },
                err_fn,
                None,
            ),
            SampleFormat::I16 => device.build_output_stream(
                &config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    let frames = data.len() / channels;
                    scratch.resize(frames, AudioFrame::zero());
                    render(&mut scratch[..frames]);

                    for (out, frame) in data.chunks_mut(channels).zip(&scratch) {
                        out[0] = (frame.left * i16::MAX as f32) as i16;
                        if channels > 1 {
                            out[1] = (frame.right * i16::MAX as f32) as i16;
                        }
                    }
                },
                err_fn,
                None,
            ),
            SampleFormat::U16 => device.build_output_stream(
                &config,
                move |data: &mut [u16], _: &cpal::OutputCallbackInfo| {
                    let frames = data.len() / channels;
                    scratch.resize(frames, AudioFrame::zero());
                    render(&mut scratch[..frames]);

                    for (out, frame) in data.chunks_mut(channels).zip(&scratch) {
                        // Map [-1.0, 1.0] to [0, 65535]
                        out[0] = ((frame.left + 1.0) * 32767.5) as u16;
                        if channels > 1 {
                            out[1] = ((frame.right + 1.0) * 32767.5) as u16;
                        }
                    }
                },
                err_fn,
                None,
            ),
            other => {
                let _ = ready_tx.send(Err(Error::AudioOutput(format!(
                    "Unsupported sample format: {:?}",
                    other
                ))));
                return;
            }
        };

        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                let _ = ready_tx.send(Err(Error::AudioOutput(format!(
                    "Failed to build stream: {}",
                    e
                ))));
                return;
            }
        };

        if let Err(e) = stream.play() {
            let _ = ready_tx.send(Err(Error::AudioOutput(format!(
                "Failed to start stream: {}",
                e
            ))));
            return;
        }

        let _ = ready_tx.send(Ok(()));

        // Park until stop; dropping the stream closes the device
        let _ = shutdown_rx.recv();
        drop(stream);
    }
}

impl OutputDriver for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn start(&mut self, render: RenderFn) -> Result<()> {
        if self.worker.is_some() {
            return Err(Error::AudioOutput("Output already started".to_string()));
        }

        info!("Starting audio stream");

        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let (shutdown_tx, shutdown_rx) = mpsc::channel();

        let device = self.device.clone();
        let config = self.config.clone();
        let sample_format = self.sample_format;

        let handle = std::thread::Builder::new()
            .name("tonedeck-output".to_string())
            .spawn(move || {
                Self::build_and_run(device, config, sample_format, render, ready_tx, shutdown_rx)
            })
            .map_err(|e| Error::AudioOutput(format!("Failed to spawn output thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.worker = Some(OutputWorker {
                    handle,
                    shutdown_tx,
                });
                info!("Audio stream started successfully");
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(Error::AudioOutput(
                    "Output thread exited before reporting readiness".to_string(),
                ))
            }
        }
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(worker) = self.worker.take() {
            info!("Stopping audio stream");
            let _ = worker.shutdown_tx.send(());
            if worker.handle.join().is_err() {
                warn!("Output thread panicked during shutdown");
            }
        }
        Ok(())
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Output driver that performs no device I/O.
///
/// For headless hosts and tests: the render callback is accepted and
/// dropped, and the embedder pulls frames through the graph directly.
pub struct NullOutput {
    sample_rate: u32,
}

impl NullOutput {
    /// Create a null output at the given working sample rate
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }
}

impl Default for NullOutput {
    fn default() -> Self {
        Self::new(44100)
    }
}

impl OutputDriver for NullOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn start(&mut self, _render: RenderFn) -> Result<()> {
        debug!("Null output started at {}Hz", self.sample_rate);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }
}
