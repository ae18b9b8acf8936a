//! The normal decode path of a NetEq-style jitter buffer.
//!
//! - [`Normal`] - blends decoded frames onto concealment or comfort noise
//! - [`Concealment`] / [`RepeatExpand`] - packet-loss concealment
//! - [`NoiseFloor`] / [`BackgroundNoise`] - background energy estimate
//! - [`ComfortNoiseDecoder`] / [`DecoderDatabase`] - comfort noise lookup

pub mod background_noise;
pub mod comfort_noise;
pub mod config;
pub mod expand;
pub mod mode;
pub mod normal;

pub use background_noise::{BackgroundNoise, NoiseFloor};
pub use comfort_noise::{CngDatabase, ComfortNoiseDecoder, DecoderDatabase, WhiteNoiseCng};
pub use config::NormalConfig;
pub use expand::{Concealment, RepeatExpand};
pub use mode::Mode;
pub use normal::{Normal, NormalContext, UNITY_MUTE_FACTOR};
