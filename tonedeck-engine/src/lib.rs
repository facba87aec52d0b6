//! # Tonedeck Playback Engine
//!
//! Real-time audio playback with live effect controls.
//!
//! **Purpose:** Load audio tracks from local files or remote URLs, play them
//! through a fixed effect graph (player → time/pitch → reverb → output), and
//! expose transport controls (play/pause, stop, seek) plus live effect knobs
//! (speed, pitch, reverb preset) that apply mid-playback.
//!
//! **Architecture:** symphonia for decode, rubato for rate normalization,
//! cpal for device output. State changes are pushed to observers through a
//! broadcast [`events::EventBus`].

pub mod audio;
pub mod config;
pub mod error;
pub mod events;
pub mod fetch;
pub mod playback;
pub mod state;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use events::{EngineEvent, EventBus, PlaybackState};
pub use playback::engine::PlaybackEngine;
pub use state::SharedState;
