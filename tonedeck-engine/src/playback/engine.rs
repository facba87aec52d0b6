//! Playback engine: transport, seek, effects, and load orchestration
//!
//! **Responsibilities:**
//! - Build and start the audio graph at construction
//! - Track acquisition (download-then-load) and local file loading
//! - Transport control (play/pause toggle, stop, relative/absolute seek)
//! - Live effect parameters (speed, pitch, reverb preset)
//! - Event emission for every observable state change
//!
//! All mutating operations run behind one control lock, so callers on any
//! task get serialized node-state transitions; effect setters only touch
//! the graph core's own lock and may interleave freely.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::audio::decoder::TrackDecoder;
use crate::audio::output::{CpalOutput, OutputDriver};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::events::{EngineEvent, PlaybackState};
use crate::fetch::AssetFetcher;
use crate::playback::graph::AudioGraph;
use crate::playback::reverb::ReverbPreset;
use crate::state::SharedState;

/// Observer message shown while a download blocks loading
const DOWNLOAD_WAIT_MESSAGE: &str = "Audio downloading, please wait...";

/// Wet/dry mix applied whenever a reverb preset is selected
const REVERB_WET_DRY_PERCENT: f32 = 50.0;

/// Seconds skipped by the forward/backward convenience controls
const SKIP_SECONDS: f64 = 10.0;

/// Real-time playback engine with live effects.
///
/// Owns the fixed player → time/pitch → reverb → output graph. The graph
/// starts at construction; a driver that cannot start makes construction
/// fail, so an existing engine always has a running graph.
pub struct PlaybackEngine {
    state: Arc<SharedState>,
    graph: AudioGraph,
    fetcher: AssetFetcher,
    /// Serializes transport and load operations
    control: Mutex<()>,
}

impl PlaybackEngine {
    /// Create an engine driving the default (or configured) audio device.
    ///
    /// # Errors
    /// Device enumeration or stream start failure. Fatal for the instance;
    /// there is no retry.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let driver = CpalOutput::new(config.device.clone(), config.buffer_size)?;
        Self::with_driver(config, Box::new(driver))
    }

    /// Create an engine on an explicit output driver.
    ///
    /// Headless hosts pass a [`NullOutput`] here and pull frames through
    /// [`PlaybackEngine::graph`] themselves.
    ///
    /// [`NullOutput`]: crate::audio::output::NullOutput
    pub fn with_driver(config: EngineConfig, driver: Box<dyn OutputDriver>) -> Result<Self> {
        let graph = AudioGraph::new(driver);
        graph.start()?;
        graph.with_core(|core| core.set_volume(config.volume));

        let state = Arc::new(SharedState::new(config.event_capacity));
        let fetcher = AssetFetcher::new(config.download_dir());

        info!(
            "Playback engine initialized ({}Hz working rate)",
            graph.sample_rate()
        );

        Ok(Self {
            state,
            graph,
            fetcher,
            control: Mutex::new(()),
        })
    }

    /// Shared state handle for embedders
    pub fn shared_state(&self) -> Arc<SharedState> {
        Arc::clone(&self.state)
    }

    /// Subscribe to the engine's event stream
    pub fn subscribe_events(&self) -> broadcast::Receiver<EngineEvent> {
        self.state.subscribe_events()
    }

    /// The audio graph this engine owns
    pub fn graph(&self) -> &AudioGraph {
        &self.graph
    }

    /// Current playback state
    pub async fn playback_state(&self) -> PlaybackState {
        self.state.get_playback_state().await
    }

    /// Duration of the loaded track in seconds, if any
    pub async fn track_duration(&self) -> Option<f32> {
        self.state.get_track_duration().await
    }

    /// Playback head position in seconds, whenever a schedule exists
    pub fn position_seconds(&self) -> Option<f64> {
        self.graph.with_core(|core| {
            let track = core.player.track()?;
            let head = core.player.head_frames()?;
            Some(head as f64 / track.sample_rate as f64)
        })
    }

    /// Download a remote track, then load it.
    ///
    /// Observers see a wait-started event with a display message before the
    /// transfer and a wait-ended event after it, in the success and the
    /// failure branch alike. On failure the previously loaded track (if
    /// any) stays active.
    pub async fn download_and_load(&self, url: &str) -> Result<()> {
        self.state.broadcast_event(EngineEvent::DownloadWaitChanged {
            message: DOWNLOAD_WAIT_MESSAGE.to_string(),
            waiting: true,
            timestamp: Utc::now(),
        });

        let fetched = self.fetcher.fetch(url).await;

        self.state.broadcast_event(EngineEvent::DownloadWaitChanged {
            message: String::new(),
            waiting: false,
            timestamp: Utc::now(),
        });

        match fetched {
            Ok(path) => self.load_track(&path).await,
            Err(e) => {
                warn!("Download failed: {}", e);
                Err(e)
            }
        }
    }

    /// Load a local audio file as the active track.
    ///
    /// On success the previous track and its schedule are fully replaced,
    /// the new duration is reported, and the whole file is scheduled from
    /// the start (the node stays stopped until commanded). On failure
    /// nothing changes: the replace is all-or-nothing.
    pub async fn load_track(&self, path: &Path) -> Result<()> {
        let _guard = self.control.lock().await;

        if !self.graph.is_running() {
            return Err(Error::Playback("audio graph is not running".to_string()));
        }

        let target_rate = self.graph.sample_rate();
        let decode_path = path.to_path_buf();

        // Decoding a full track is CPU-bound file work; keep it off the
        // async workers
        let track = tokio::task::spawn_blocking(move || {
            TrackDecoder::decode_track(&decode_path, target_rate)
        })
        .await
        .map_err(|e| Error::Playback(format!("decode task failed: {}", e)))?
        .map_err(|e| {
            warn!("Failed to load {}: {}", path.display(), e);
            e
        })?;

        let duration = track.duration_seconds();
        info!(
            "Loaded {} ({} frames, {:.1}s)",
            path.display(),
            track.frame_count,
            duration
        );

        self.state.set_track_duration(Some(duration)).await;
        self.state.broadcast_event(EngineEvent::TrackDurationChanged {
            seconds: duration,
            timestamp: Utc::now(),
        });

        let track = Arc::new(track);
        self.graph.with_core(|core| {
            core.player.set_track(track);
            core.player.stop();
            core.player.schedule_full();
        });

        Ok(())
    }

    /// Toggle between Playing and Paused.
    ///
    /// From Stopped the toggle lands on Playing. The state flips and is
    /// reported even when no track is loaded; the source node simply has
    /// nothing to render.
    pub async fn play_pause(&self) -> Result<()> {
        let _guard = self.control.lock().await;

        let old_state = self.state.get_playback_state().await;
        let new_state = if old_state == PlaybackState::Playing {
            PlaybackState::Paused
        } else {
            PlaybackState::Playing
        };

        self.graph.with_core(|core| {
            if new_state == PlaybackState::Playing {
                core.player.play();
            } else {
                core.player.pause();
            }
        });

        self.state.set_playback_state(new_state).await;
        self.state.broadcast_event(EngineEvent::PlaybackStateChanged {
            old_state,
            new_state,
            timestamp: Utc::now(),
        });

        info!("Playback state changed: {} -> {}", old_state, new_state);
        Ok(())
    }

    /// Halt playback and discard the source node's schedule.
    ///
    /// Unconditional: stopping an already stopped engine emits the state
    /// event again.
    pub async fn stop(&self) -> Result<()> {
        let _guard = self.control.lock().await;

        let old_state = self.state.get_playback_state().await;
        self.graph.with_core(|core| core.player.stop());
        self.state.set_playback_state(PlaybackState::Stopped).await;
        self.state.broadcast_event(EngineEvent::PlaybackStateChanged {
            old_state,
            new_state: PlaybackState::Stopped,
            timestamp: Utc::now(),
        });

        info!("Playback stopped");
        Ok(())
    }

    /// Seek relative to the current render position.
    ///
    /// A no-op until something has rendered since the last schedule change;
    /// the target clamps to the track bounds. Playback resumes only if the
    /// engine was Playing.
    pub async fn seek_by(&self, seconds: f64) -> Result<()> {
        let _guard = self.control.lock().await;
        let was_playing = self.state.get_playback_state().await.is_playing();

        self.graph.with_core(|core| {
            let Some(track) = core.player.track().cloned() else {
                debug!("Relative seek ignored: no track loaded");
                return;
            };
            let Some(position) = core.player.render_position() else {
                debug!("Relative seek ignored: nothing rendered yet");
                return;
            };

            let sample_rate = track.sample_rate as f64;
            let target = (position as f64 + seconds * sample_rate)
                .clamp(0.0, track.frame_count as f64) as u64;

            debug!(
                "Relative seek {:+.1}s: frame {} -> {}",
                seconds, position, target
            );

            core.player.stop();
            core.player.schedule_from(target);
            if was_playing {
                core.player.play();
            }
        });

        Ok(())
    }

    /// Seek to a normalized position in the track (0.0 = start, 1.0 = end).
    ///
    /// Out-of-range fractions clamp to the track bounds. Playback resumes
    /// only if the engine was Playing.
    pub async fn seek_to(&self, progress: f32) -> Result<()> {
        let _guard = self.control.lock().await;
        let was_playing = self.state.get_playback_state().await.is_playing();

        self.graph.with_core(|core| {
            let Some(track) = core.player.track().cloned() else {
                debug!("Absolute seek ignored: no track loaded");
                return;
            };

            let frames = track.frame_count as f64;
            let target = (progress as f64 * frames).clamp(0.0, frames) as u64;

            debug!("Absolute seek to {:.3}: frame {}", progress, target);

            core.player.stop();
            core.player.schedule_from(target);
            if was_playing {
                core.player.play();
            }
        });

        Ok(())
    }

    /// Skip forward ten seconds
    pub async fn skip_forward(&self) -> Result<()> {
        self.seek_by(SKIP_SECONDS).await
    }

    /// Skip backward ten seconds
    pub async fn skip_backward(&self) -> Result<()> {
        self.seek_by(-SKIP_SECONDS).await
    }

    /// Set the playback rate multiplier.
    ///
    /// Passed through without validation; the control surface owns range
    /// policy.
    pub fn set_playback_speed(&self, rate: f32) {
        self.graph.with_core(|core| core.time_pitch.set_rate(rate));
        debug!("Playback speed set to {}", rate);
    }

    /// Set the pitch offset in semitones.
    ///
    /// Passed through without validation.
    pub fn set_pitch(&self, semitones: f32) {
        self.graph
            .with_core(|core| core.time_pitch.set_pitch(semitones));
        debug!("Pitch set to {} semitones", semitones);
    }

    /// Select a reverb preset by name.
    ///
    /// Unknown names select the medium-room default. Selecting any preset
    /// fixes the wet/dry mix at 50%.
    pub fn set_reverb_effect(&self, name: &str) {
        let preset = ReverbPreset::from_name(name);
        self.graph.with_core(|core| {
            core.reverb.load_preset(preset);
            core.reverb.set_wet_dry_mix(REVERB_WET_DRY_PERCENT);
        });
        info!("Reverb preset set to {}", preset);
    }

    /// Set master output volume (clamped to 0.0..=1.0)
    pub fn set_volume(&self, volume: f32) {
        self.graph.with_core(|core| core.set_volume(volume));
        debug!("Volume set to {:.2}", volume.clamp(0.0, 1.0));
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        let _ = self.graph.stop();
    }
}
