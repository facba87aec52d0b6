//! Audio decode, resample, and device output

pub mod decoder;
pub mod output;
pub mod resampler;
pub mod types;

pub use decoder::TrackDecoder;
pub use output::{CpalOutput, NullOutput, OutputDriver};
pub use types::{AudioFrame, TrackBuffer};
