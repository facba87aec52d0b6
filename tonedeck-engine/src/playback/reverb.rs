//! Reverb node: algorithmic reverb with named presets
//!
//! Schroeder topology in the Freeverb arrangement: eight damped feedback
//! comb filters in parallel feeding four series allpasses per channel, with
//! the right channel's delay lines offset for stereo spread. Presets select
//! a (room size, damping) pair; wet/dry is a percentage mix applied at the
//! output. Delay tunings are defined against a 44.1kHz reference and scaled
//! to the graph's working rate.

use crate::audio::types::AudioFrame;

/// Comb delay lengths at the 44.1kHz reference rate
const COMB_TUNINGS: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];

/// Allpass delay lengths at the 44.1kHz reference rate
const ALLPASS_TUNINGS: [usize; 4] = [556, 441, 341, 225];

/// Extra delay on the right channel's lines
const STEREO_SPREAD: usize = 23;

const REFERENCE_RATE: f64 = 44100.0;
const INPUT_GAIN: f32 = 0.015;
const WET_GAIN: f32 = 3.0;
const ALLPASS_FEEDBACK: f32 = 0.5;

/// Named reverb presets.
///
/// Closed set; unrecognized names resolve to [`ReverbPreset::MediumRoom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReverbPreset {
    SmallRoom,
    MediumRoom,
    LargeRoom,
    MediumHall,
    Plate,
    Cathedral,
}

impl ReverbPreset {
    /// Map a case-insensitive effect name to a preset.
    ///
    /// Unknown names fall back to MediumRoom rather than failing; the
    /// control surface treats every string as a valid request.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "hall" => ReverbPreset::MediumHall,
            "movie" => ReverbPreset::LargeRoom,
            "room" => ReverbPreset::MediumRoom,
            "plate" => ReverbPreset::Plate,
            "cathedral" => ReverbPreset::Cathedral,
            "small room" => ReverbPreset::SmallRoom,
            _ => ReverbPreset::MediumRoom,
        }
    }

    /// Room size parameter (0..1), larger is longer decay
    fn room_size(self) -> f32 {
        match self {
            ReverbPreset::SmallRoom => 0.45,
            ReverbPreset::MediumRoom => 0.55,
            ReverbPreset::LargeRoom => 0.70,
            ReverbPreset::MediumHall => 0.80,
            ReverbPreset::Plate => 0.85,
            ReverbPreset::Cathedral => 0.95,
        }
    }

    /// High-frequency damping parameter (0..1)
    fn damping(self) -> f32 {
        match self {
            ReverbPreset::SmallRoom => 0.60,
            ReverbPreset::MediumRoom => 0.50,
            ReverbPreset::LargeRoom => 0.45,
            ReverbPreset::MediumHall => 0.40,
            ReverbPreset::Plate => 0.20,
            ReverbPreset::Cathedral => 0.30,
        }
    }
}

impl std::fmt::Display for ReverbPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReverbPreset::SmallRoom => "small room",
            ReverbPreset::MediumRoom => "medium room",
            ReverbPreset::LargeRoom => "large room",
            ReverbPreset::MediumHall => "medium hall",
            ReverbPreset::Plate => "plate",
            ReverbPreset::Cathedral => "cathedral",
        };
        write!(f, "{}", name)
    }
}

/// Damped feedback comb filter.
struct Comb {
    buffer: Vec<f32>,
    index: usize,
    feedback: f32,
    damp: f32,
    filter_store: f32,
}

impl Comb {
    fn new(len: usize) -> Self {
        Self {
            buffer: vec![0.0; len.max(1)],
            index: 0,
            feedback: 0.5,
            damp: 0.5,
            filter_store: 0.0,
        }
    }

    fn process(&mut self, input: f32) -> f32 {
        let output = self.buffer[self.index];
        self.filter_store = output * (1.0 - self.damp) + self.filter_store * self.damp;
        self.buffer[self.index] = input + self.filter_store * self.feedback;
        self.index = (self.index + 1) % self.buffer.len();
        output
    }
}

/// Allpass diffusion filter.
struct Allpass {
    buffer: Vec<f32>,
    index: usize,
}

impl Allpass {
    fn new(len: usize) -> Self {
        Self {
            buffer: vec![0.0; len.max(1)],
            index: 0,
        }
    }

    fn process(&mut self, input: f32) -> f32 {
        let buffered = self.buffer[self.index];
        let output = buffered - input;
        self.buffer[self.index] = input + buffered * ALLPASS_FEEDBACK;
        self.index = (self.index + 1) % self.buffer.len();
        output
    }
}

/// Reverb effect node.
pub struct ReverbNode {
    combs_left: Vec<Comb>,
    combs_right: Vec<Comb>,
    allpasses_left: Vec<Allpass>,
    allpasses_right: Vec<Allpass>,
    preset: ReverbPreset,
    /// Wet/dry mix percentage (0 = fully dry, 100 = fully wet)
    wet_dry_mix: f32,
}

impl ReverbNode {
    /// Build the node for a given working sample rate.
    ///
    /// Starts fully dry with the MediumRoom preset loaded; the node is
    /// audible only once a caller raises the wet/dry mix.
    pub fn new(sample_rate: u32) -> Self {
        let scale = sample_rate as f64 / REFERENCE_RATE;
        let scaled = |len: usize| ((len as f64 * scale) as usize).max(1);

        let mut node = Self {
            combs_left: COMB_TUNINGS.iter().map(|&l| Comb::new(scaled(l))).collect(),
            combs_right: COMB_TUNINGS
                .iter()
                .map(|&l| Comb::new(scaled(l + STEREO_SPREAD)))
                .collect(),
            allpasses_left: ALLPASS_TUNINGS
                .iter()
                .map(|&l| Allpass::new(scaled(l)))
                .collect(),
            allpasses_right: ALLPASS_TUNINGS
                .iter()
                .map(|&l| Allpass::new(scaled(l + STEREO_SPREAD)))
                .collect(),
            preset: ReverbPreset::MediumRoom,
            wet_dry_mix: 0.0,
        };
        node.load_preset(ReverbPreset::MediumRoom);
        node
    }

    /// Load a preset's room parameters into the comb bank
    pub fn load_preset(&mut self, preset: ReverbPreset) {
        let feedback = preset.room_size() * 0.28 + 0.70;
        let damp = preset.damping() * 0.40;

        for comb in self.combs_left.iter_mut().chain(self.combs_right.iter_mut()) {
            comb.feedback = feedback;
            comb.damp = damp;
        }
        self.preset = preset;
    }

    /// Currently loaded preset
    pub fn preset(&self) -> ReverbPreset {
        self.preset
    }

    /// Set the wet/dry mix percentage, clamped to 0..100
    pub fn set_wet_dry_mix(&mut self, percent: f32) {
        self.wet_dry_mix = percent.clamp(0.0, 100.0);
    }

    /// Current wet/dry mix percentage
    pub fn wet_dry_mix(&self) -> f32 {
        self.wet_dry_mix
    }

    /// Process one frame.
    ///
    /// Always runs, so the tail keeps ringing over silence after the
    /// source stops.
    pub fn process(&mut self, input: AudioFrame) -> AudioFrame {
        let feed = (input.left + input.right) * INPUT_GAIN;

        let mut wet_left = 0.0f32;
        for comb in &mut self.combs_left {
            wet_left += comb.process(feed);
        }
        for allpass in &mut self.allpasses_left {
            wet_left = allpass.process(wet_left);
        }

        let mut wet_right = 0.0f32;
        for comb in &mut self.combs_right {
            wet_right += comb.process(feed);
        }
        for allpass in &mut self.allpasses_right {
            wet_right = allpass.process(wet_right);
        }

        let wet = self.wet_dry_mix / 100.0;
        let dry = 1.0 - wet;

        AudioFrame {
            left: input.left * dry + wet_left * WET_GAIN * wet,
            right: input.right * dry + wet_right * WET_GAIN * wet,
        }
    }
}
