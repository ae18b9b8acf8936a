//! Comfort noise sources.
//!
//! The normal path only needs a way to look up the active comfort-noise
//! decoder ([`DecoderDatabase`]) and to ask it for a few samples
//! ([`ComfortNoiseDecoder`]).

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generates synthetic background noise.
pub trait ComfortNoiseDecoder: Send {
    /// Fill `output` with noise. `new_period` marks the start of a silence period.
    fn generate(&mut self, output: &mut [i16], new_period: bool) -> Result<()>;
}

/// Lookup of the decoders known to the jitter buffer.
pub trait DecoderDatabase {
    /// The comfort-noise decoder of the current stream, if any.
    fn active_cng_decoder(&mut self) -> Option<&mut dyn ComfortNoiseDecoder>;
}

/// Uniform white noise with a fixed peak amplitude.
pub struct WhiteNoiseCng {
    level: i16,
    rng: StdRng,
}

impl WhiteNoiseCng {
    /// `level` is the peak absolute sample value.
    pub fn new(level: i16, seed: u64) -> Self {
        Self {
            level: level.saturating_abs(),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl ComfortNoiseDecoder for WhiteNoiseCng {
    fn generate(&mut self, output: &mut [i16], _new_period: bool) -> Result<()> {
        let level = self.level;
        for sample in output.iter_mut() {
            *sample = self.rng.gen_range(-level..=level);
        }
        Ok(())
    }
}

/// A decoder database that holds at most one comfort-noise decoder.
#[derive(Default)]
pub struct CngDatabase {
    active: Option<Box<dyn ComfortNoiseDecoder>>,
}

impl CngDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_decoder(decoder: Box<dyn ComfortNoiseDecoder>) -> Self {
        Self {
            active: Some(decoder),
        }
    }

    pub fn set_active_cng_decoder(&mut self, decoder: Option<Box<dyn ComfortNoiseDecoder>>) {
        self.active = decoder;
    }
}

impl DecoderDatabase for CngDatabase {
    fn active_cng_decoder(&mut self) -> Option<&mut dyn ComfortNoiseDecoder> {
        self.active.as_deref_mut().map(|d| d as &mut dyn ComfortNoiseDecoder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_white_noise_stays_within_level() {
        let mut cng = WhiteNoiseCng::new(100, 7);
        let mut out = [0i16; 480];
        cng.generate(&mut out, true).unwrap();

        assert!(out.iter().all(|&s| (-100..=100).contains(&s)));
        assert!(out.iter().any(|&s| s != 0));
    }

    #[test]
    fn test_white_noise_is_reproducible() {
        let mut a = WhiteNoiseCng::new(500, 42);
        let mut b = WhiteNoiseCng::new(500, 42);
        let (mut out_a, mut out_b) = ([0i16; 48], [0i16; 48]);
        a.generate(&mut out_a, false).unwrap();
        b.generate(&mut out_b, false).unwrap();

        assert_eq!(out_a, out_b);
    }

    #[test]
    fn test_database_lookup() {
        let mut db = CngDatabase::new();
        assert!(db.active_cng_decoder().is_none());

        db.set_active_cng_decoder(Some(Box::new(WhiteNoiseCng::new(10, 1))));
        assert!(db.active_cng_decoder().is_some());

        db.set_active_cng_decoder(None);
        assert!(db.active_cng_decoder().is_none());
    }
}
