//! Audio data types and fixed-point DSP helpers.
//!
//! # Data Types
//! - [`frame::AudioBuffer`] - A multi-channel buffer of de-interleaved 16-bit samples
//!
//! # Arithmetic
//! - [`fixed_point`] - Q14 gains, normalization shifts, energy and cross-fades

pub mod fixed_point;
pub mod frame;

pub use frame::AudioBuffer;
