//! Source node: holds the loaded track and its scheduled segment
//!
//! The player owns one schedule at a time. Scheduling replaces whatever was
//! queued before, `stop` discards the schedule entirely, and `pause`/`play`
//! hold and release the head without touching the schedule. The head is
//! fractional so downstream effect stages can read between frames.

use std::sync::Arc;

use crate::audio::types::{AudioFrame, TrackBuffer};

/// One scheduled region of the loaded track, in track frames.
#[derive(Debug, Clone, Copy)]
struct Segment {
    start: u64,
    end: u64,
}

/// Scheduled-segment player node.
pub struct PlayerNode {
    track: Option<Arc<TrackBuffer>>,
    segment: Option<Segment>,
    /// Playback head, absolute track-frame position within the segment
    head: f64,
    playing: bool,
    /// Whether any frame has rendered since the last schedule change
    rendered: bool,
    /// Bumped on every schedule change so effect stages can reset
    generation: u64,
}

impl PlayerNode {
    pub fn new() -> Self {
        Self {
            track: None,
            segment: None,
            head: 0.0,
            playing: false,
            rendered: false,
            generation: 0,
        }
    }

    /// Replace the loaded track.
    ///
    /// Discards the previous track and any schedule derived from it.
    pub fn set_track(&mut self, track: Arc<TrackBuffer>) {
        self.track = Some(track);
        self.segment = None;
        self.head = 0.0;
        self.rendered = false;
        self.generation += 1;
    }

    /// Currently loaded track, if any
    pub fn track(&self) -> Option<&Arc<TrackBuffer>> {
        self.track.as_ref()
    }

    /// Schedule the whole track from frame 0
    pub fn schedule_full(&mut self) {
        if let Some(track) = &self.track {
            let end = track.frame_count;
            self.segment = Some(Segment { start: 0, end });
            self.head = 0.0;
            self.rendered = false;
            self.generation += 1;
        }
    }

    /// Schedule from `start_frame` to the end of the track.
    ///
    /// `start_frame` beyond the track clamps to its end (an empty segment
    /// that renders silence).
    pub fn schedule_from(&mut self, start_frame: u64) {
        if let Some(track) = &self.track {
            let end = track.frame_count;
            let start = start_frame.min(end);
            self.segment = Some(Segment { start, end });
            self.head = start as f64;
            self.rendered = false;
            self.generation += 1;
        }
    }

    /// Begin or resume rendering from the current head
    pub fn play(&mut self) {
        self.playing = true;
    }

    /// Hold the head in place
    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Halt and discard the schedule
    pub fn stop(&mut self) {
        self.playing = false;
        self.segment = None;
        self.head = 0.0;
        self.rendered = false;
        self.generation += 1;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// True when the node would produce audio if pulled
    pub fn is_rendering(&self) -> bool {
        self.playing && self.segment.is_some()
    }

    /// Schedule-change counter for effect-stage resets
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Playback head in track frames, whenever a schedule exists.
    ///
    /// This is the position a progress display wants.
    pub fn head_frames(&self) -> Option<u64> {
        self.segment.map(|_| self.head as u64)
    }

    /// Exact fractional head position
    pub(crate) fn head(&self) -> Option<f64> {
        self.segment.map(|_| self.head)
    }

    /// Render-derived playback position.
    ///
    /// None until at least one frame has rendered since the last schedule
    /// change; relative seeks are anchored here.
    pub fn render_position(&self) -> Option<u64> {
        if self.rendered {
            self.segment.map(|_| self.head as u64)
        } else {
            None
        }
    }

    /// Read a frame at an arbitrary fractional position within the
    /// scheduled segment, linearly interpolated. Positions outside the
    /// segment read as silence.
    pub fn sample_at(&self, position: f64) -> AudioFrame {
        let (Some(track), Some(segment)) = (&self.track, self.segment) else {
            return AudioFrame::zero();
        };

        if position < segment.start as f64 || position >= segment.end as f64 {
            return AudioFrame::zero();
        }

        let i0 = position as u64;
        let frac = (position - i0 as f64) as f32;

        let a = track.frame(i0).unwrap_or_else(AudioFrame::zero);
        let b = if i0 + 1 < segment.end {
            track.frame(i0 + 1).unwrap_or(a)
        } else {
            a
        };

        AudioFrame {
            left: a.left + (b.left - a.left) * frac,
            right: a.right + (b.right - a.right) * frac,
        }
    }

    /// Advance the head by `frames`, clamped to the end of the segment.
    ///
    /// Marks the node as having rendered; callers advance only while
    /// actually pulling audio.
    pub fn advance(&mut self, frames: f64) {
        if let Some(segment) = self.segment {
            self.head = (self.head + frames).min(segment.end as f64);
            self.rendered = true;
        }
    }
}

impl Default for PlayerNode {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_track(frames: usize) -> Arc<TrackBuffer> {
        let mut samples = Vec::with_capacity(frames * 2);
        for i in 0..frames {
            let v = (i % 100) as f32 / 100.0;
            samples.push(v);
            samples.push(-v);
        }
        Arc::new(TrackBuffer::new(PathBuf::from("t.wav"), samples, 44100))
    }

    #[test]
    fn test_initial_state() {
        let player = PlayerNode::new();
        assert!(!player.is_playing());
        assert!(!player.is_rendering());
        assert!(player.head_frames().is_none());
        assert!(player.render_position().is_none());
    }

    #[test]
    fn test_schedule_full_positions_at_start() {
        let mut player = PlayerNode::new();
        player.set_track(test_track(1000));
        player.schedule_full();

        assert_eq!(player.head_frames(), Some(0));
        // No render yet, so no render position
        assert!(player.render_position().is_none());
    }

    #[test]
    fn test_advance_clamps_to_segment_end() {
        let mut player = PlayerNode::new();
        player.set_track(test_track(100));
        player.schedule_from(90);
        player.play();

        player.advance(50.0);
        assert_eq!(player.head_frames(), Some(100));
        assert_eq!(player.render_position(), Some(100));
    }

    #[test]
    fn test_stop_discards_schedule() {
        let mut player = PlayerNode::new();
        player.set_track(test_track(100));
        player.schedule_full();
        player.play();
        player.advance(10.0);

        let generation = player.generation();
        player.stop();

        assert!(!player.is_playing());
        assert!(player.head_frames().is_none());
        assert!(player.render_position().is_none());
        assert!(player.generation() > generation);
    }

    #[test]
    fn test_pause_holds_position() {
        let mut player = PlayerNode::new();
        player.set_track(test_track(100));
        player.schedule_full();
        player.play();
        player.advance(10.0);

        player.pause();
        assert!(!player.is_playing());
        // Position survives pause
        assert_eq!(player.render_position(), Some(10));

        player.play();
        assert!(player.is_rendering());
    }

    #[test]
    fn test_schedule_from_clamps_start() {
        let mut player = PlayerNode::new();
        player.set_track(test_track(100));
        player.schedule_from(500);

        assert_eq!(player.head_frames(), Some(100));
    }

    #[test]
    fn test_sample_outside_segment_is_silent() {
        let mut player = PlayerNode::new();
        player.set_track(test_track(100));
        player.schedule_from(50);

        assert_eq!(player.sample_at(10.0), AudioFrame::zero());
        assert_eq!(player.sample_at(100.0), AudioFrame::zero());
        assert_ne!(player.sample_at(51.0), AudioFrame::zero());
    }

    #[test]
    fn test_sample_interpolates() {
        let mut player = PlayerNode::new();
        let track = Arc::new(TrackBuffer::new(
            PathBuf::from("t.wav"),
            vec![0.0, 0.0, 1.0, -1.0],
            44100,
        ));
        player.set_track(track);
        player.schedule_full();

        let mid = player.sample_at(0.5);
        assert!((mid.left - 0.5).abs() < 1e-6);
        assert!((mid.right + 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_set_track_replaces_schedule() {
        let mut player = PlayerNode::new();
        player.set_track(test_track(100));
        player.schedule_full();
        player.play();
        player.advance(10.0);

        player.set_track(test_track(200));
        // Old schedule is gone until the new track is scheduled
        assert!(player.head_frames().is_none());
        assert_eq!(player.track().unwrap().frame_count, 200);
    }
}
