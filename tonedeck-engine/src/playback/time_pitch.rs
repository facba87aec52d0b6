//! Time/pitch node: independent playback rate and pitch shift
//!
//! Granular overlap-add resynthesis. Hann-windowed grains at 50% overlap
//! satisfy the constant-overlap-add identity, so at rate 1.0 / pitch 0.0
//! the node passes the source through untouched (after the first grain's
//! fade-in). The source head advances by `rate` per output frame, which
//! sets playback speed; each grain reads its own samples with a step of
//! 2^(pitch/12), which sets pitch. The two knobs never interact.
//!
//! Parameter values are applied as given. Range policy lives with the
//! caller; out-of-nominal rates and pitches pass straight through to the
//! resynthesis math.

use crate::audio::types::AudioFrame;
use crate::playback::player::PlayerNode;

/// One active grain of source audio.
#[derive(Debug, Clone, Copy)]
struct Grain {
    /// Track-frame position the grain started reading from
    start: f64,
    /// Output frames rendered by this grain so far
    age: usize,
}

/// Time/pitch effect node.
pub struct TimePitchNode {
    /// Playback rate multiplier (1.0 = normal speed)
    rate: f32,
    /// Pitch offset in semitones (0.0 = unchanged)
    pitch: f32,
    /// Grain length in output frames (even, for exact 50% overlap)
    grain_len: usize,
    /// Frames until the next grain spawns
    spawn_countdown: usize,
    /// At 50% overlap at most two grains are alive at once
    grains: [Option<Grain>; 2],
    /// Player schedule generation the grain state belongs to
    tracked_generation: u64,
}

impl TimePitchNode {
    /// Create the node for a given working sample rate.
    ///
    /// Grain length is about 62ms, a middle ground between transient
    /// smearing (long grains) and amplitude modulation artifacts (short
    /// grains).
    pub fn new(sample_rate: u32) -> Self {
        let mut grain_len = (sample_rate / 16) as usize;
        grain_len &= !1; // keep it even
        Self {
            rate: 1.0,
            pitch: 0.0,
            grain_len: grain_len.max(2),
            spawn_countdown: 0,
            grains: [None, None],
            tracked_generation: 0,
        }
    }

    /// Set the playback rate multiplier
    pub fn set_rate(&mut self, rate: f32) {
        self.rate = rate;
    }

    /// Set the pitch offset in semitones
    pub fn set_pitch(&mut self, semitones: f32) {
        self.pitch = semitones;
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Grain read step derived from the pitch offset
    pub fn pitch_ratio(&self) -> f64 {
        2f64.powf(self.pitch as f64 / 12.0)
    }

    /// Pull one output frame, consuming source audio from the player.
    ///
    /// Advances the player head by `rate` frames per call while the
    /// player is rendering; outputs silence (and freezes grain state)
    /// while it is paused or has nothing scheduled.
    pub fn next_frame(&mut self, player: &mut PlayerNode) -> AudioFrame {
        if player.generation() != self.tracked_generation {
            self.reset(player.generation());
        }

        if !player.is_rendering() {
            return AudioFrame::zero();
        }

        if self.spawn_countdown == 0 {
            self.spawn(player);
            self.spawn_countdown = self.grain_len / 2;
        }
        self.spawn_countdown -= 1;

        let ratio = self.pitch_ratio();
        let mut left = 0.0f32;
        let mut right = 0.0f32;

        for slot in &mut self.grains {
            if let Some(grain) = slot {
                let window = hann(grain.age, self.grain_len);
                let source = player.sample_at(grain.start + grain.age as f64 * ratio);
                left += source.left * window;
                right += source.right * window;

                grain.age += 1;
                if grain.age >= self.grain_len {
                    *slot = None;
                }
            }
        }

        player.advance(self.rate as f64);

        AudioFrame::from_stereo(left, right)
    }

    /// Start a new grain at the player's current head
    fn spawn(&mut self, player: &PlayerNode) {
        let Some(head) = player.head() else { return };
        let grain = Grain { start: head, age: 0 };

        // Prefer a free slot; otherwise replace the oldest grain
        if let Some(slot) = self.grains.iter_mut().find(|s| s.is_none()) {
            *slot = Some(grain);
        } else if let Some(slot) = self
            .grains
            .iter_mut()
            .max_by_key(|s| s.as_ref().map(|g| g.age).unwrap_or(0))
        {
            *slot = Some(grain);
        }
    }

    fn reset(&mut self, generation: u64) {
        self.grains = [None, None];
        self.spawn_countdown = 0;
        self.tracked_generation = generation;
    }
}

/// Hann window value for position `n` of `len`.
///
/// With grains spawned every `len / 2` frames, overlapping window values
/// sum to exactly 1.0.
fn hann(n: usize, len: usize) -> f32 {
    let phase = 2.0 * std::f64::consts::PI * n as f64 / len as f64;
    (0.5 - 0.5 * phase.cos()) as f32
}
