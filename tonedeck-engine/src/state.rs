//! Shared playback state
//!
//! Thread-safe shared state for coordination between the engine, its
//! observers, and an embedding application.

use tokio::sync::{broadcast, RwLock};

use crate::events::{EngineEvent, EventBus, PlaybackState};

/// Shared state accessible by all components
///
/// Uses RwLock for concurrent read access with rare writes.
pub struct SharedState {
    /// Current playback state
    playback_state: RwLock<PlaybackState>,

    /// Duration of the currently loaded track in seconds (None before any load)
    track_duration: RwLock<Option<f32>>,

    /// Event broadcaster for observers
    events: EventBus,
}

impl SharedState {
    /// Create new shared state with default values
    pub fn new(event_capacity: usize) -> Self {
        Self {
            playback_state: RwLock::new(PlaybackState::Stopped),
            track_duration: RwLock::new(None),
            events: EventBus::new(event_capacity),
        }
    }

    /// Get current playback state
    pub async fn get_playback_state(&self) -> PlaybackState {
        *self.playback_state.read().await
    }

    /// Set playback state
    pub async fn set_playback_state(&self, state: PlaybackState) {
        *self.playback_state.write().await = state;
    }

    /// Get loaded track duration in seconds
    pub async fn get_track_duration(&self) -> Option<f32> {
        *self.track_duration.read().await
    }

    /// Set loaded track duration
    pub async fn set_track_duration(&self, seconds: Option<f32>) {
        *self.track_duration.write().await = seconds;
    }

    /// Broadcast an event to all observers
    pub fn broadcast_event(&self, event: EngineEvent) {
        // No receivers is OK
        self.events.emit_lossy(event);
    }

    /// Subscribe to the event stream
    pub fn subscribe_events(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new(128)
    }
}
