//! Playback engine and the audio graph it owns

pub mod engine;
pub mod graph;
pub mod player;
pub mod reverb;
pub mod time_pitch;

pub use engine::PlaybackEngine;
pub use graph::{AudioGraph, GraphCore, NodeKind};
pub use player::PlayerNode;
pub use reverb::{ReverbNode, ReverbPreset};
pub use time_pitch::TimePitchNode;
