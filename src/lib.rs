//! Normal-path audio rendering for a NetEq-style jitter buffer.
//!
//! # Audio
//! - [`audio::AudioBuffer`] - multi-channel de-interleaved 16-bit samples
//! - [`audio::fixed_point`] - bit-exact Q14 helpers
//!
//! # NetEq
//! - [`neteq::Normal`] - stitches decoded frames onto concealment and comfort noise

pub mod audio;
pub mod neteq;
