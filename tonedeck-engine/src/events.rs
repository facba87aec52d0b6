//! Event system for the playback engine
//!
//! # Architecture
//!
//! The engine pushes state changes to observers through a single broadcast
//! channel carrying a tagged event type:
//! - **EventBus** (tokio::broadcast): one-to-many event fan-out
//! - Observers subscribe and consume events on their own task
//!
//! Events are serializable so a UI layer can forward them verbatim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Playback state enumeration
///
/// Exactly one state is active at a time. The engine reports every
/// transition to observers via [`EngineEvent::PlaybackStateChanged`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// Nothing playing, source node schedule discarded
    #[default]
    Stopped,
    /// Source node holding position
    Paused,
    /// Source node rendering
    Playing,
}

impl PlaybackState {
    /// True only for the Playing state
    pub fn is_playing(self) -> bool {
        self == PlaybackState::Playing
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Stopped => write!(f, "stopped"),
            PlaybackState::Paused => write!(f, "paused"),
            PlaybackState::Playing => write!(f, "playing"),
        }
    }
}

/// Engine event types
///
/// Events are broadcast via [`EventBus`] and can be serialized for
/// transmission to a remote observer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineEvent {
    /// Playback state changed (Stopped/Paused/Playing)
    PlaybackStateChanged {
        /// State before the transition
        old_state: PlaybackState,
        /// State after the transition
        new_state: PlaybackState,
        /// When the state changed
        timestamp: DateTime<Utc>,
    },

    /// A track finished loading and its duration is known
    ///
    /// Fired once per successful load, before the track is scheduled.
    TrackDurationChanged {
        /// Track duration in seconds (frame count / sample rate)
        seconds: f32,
        /// When the track was loaded
        timestamp: DateTime<Utc>,
    },

    /// A blocking download wait began or ended
    ///
    /// `waiting = true` carries a human-readable message for display;
    /// `waiting = false` always follows, in both the success and the
    /// failure branch of a download.
    DownloadWaitChanged {
        /// Display message (empty when the wait ends)
        message: String,
        /// Whether a download is currently in progress
        waiting: bool,
        /// When the wait state changed
        timestamp: DateTime<Utc>,
    },
}

impl EngineEvent {
    /// Event type name for logging and display
    pub fn event_type(&self) -> &'static str {
        match self {
            EngineEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
            EngineEvent::TrackDurationChanged { .. } => "TrackDurationChanged",
            EngineEvent::DownloadWaitChanged { .. } => "DownloadWaitChanged",
        }
    }
}

/// Broadcast bus for engine events
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the specified channel capacity
    ///
    /// Old events are dropped for lagging subscribers once the buffer fills.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` otherwise.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: EngineEvent,
    ) -> std::result::Result<usize, broadcast::error::SendError<EngineEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring whether anyone is listening
    pub fn emit_lossy(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
