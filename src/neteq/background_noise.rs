//! Background noise energy tracking.

use crate::audio::frame::AudioBuffer;

/// Energy assumed before any audio has been observed.
pub const INITIAL_ENERGY: u32 = 2500;
/// Slow-rise step: the estimate may grow by `1 / 2^RISE_SHIFT` per update.
const RISE_SHIFT: u32 = 7;

/// A running estimate of the per-channel background energy.
pub trait NoiseFloor: Send + Sync {
    /// Mean energy per sample for `channel`.
    ///
    /// Channels the estimator does not track report a fixed default energy.
    fn energy(&self, channel: usize) -> u32;
}

/// Minimum-statistics noise floor: follows quieter frames immediately and
/// drifts upward slowly towards louder ones.
#[derive(Debug, Clone)]
pub struct BackgroundNoise {
    energies: Vec<u32>,
}

impl BackgroundNoise {
    pub fn new(channels: usize) -> Self {
        Self {
            energies: vec![INITIAL_ENERGY; channels],
        }
    }

    /// Feed a decoded frame into the estimate.
    pub fn update(&mut self, frame: &AudioBuffer) {
        if frame.is_empty() {
            return;
        }
        let channels = frame.channels();
        for (channel_ix, estimate) in self.energies.iter_mut().take(channels).enumerate() {
            let frame_energy = mean_energy(frame.channel(channel_ix));
            *estimate = if frame_energy <= *estimate {
                frame_energy
            } else {
                let step = (*estimate >> RISE_SHIFT).max(1);
                estimate.saturating_add(step).min(frame_energy)
            };
        }
    }

    pub fn reset(&mut self) {
        self.energies.fill(INITIAL_ENERGY);
    }
}

impl NoiseFloor for BackgroundNoise {
    fn energy(&self, channel: usize) -> u32 {
        self.energies.get(channel).copied().unwrap_or(INITIAL_ENERGY)
    }
}

fn mean_energy(samples: &[i16]) -> u32 {
    if samples.is_empty() {
        return 0;
    }
    let sum: u64 = samples.iter().map(|&s| (i64::from(s) * i64::from(s)) as u64).sum();
    (sum / samples.len() as u64).min(u64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_initial_energy() {
        let noise = BackgroundNoise::new(2);
        assert_eq!(noise.energy(0), INITIAL_ENERGY);
        assert_eq!(noise.energy(1), INITIAL_ENERGY);
    }

    #[test]
    fn test_falls_immediately_to_quieter_frames() {
        let mut noise = BackgroundNoise::new(1);
        noise.update(&AudioBuffer::from_interleaved(1, &[10; 80]).unwrap());
        assert_eq!(noise.energy(0), 100);
    }

    #[test]
    fn test_rises_slowly_towards_louder_frames() {
        let mut noise = BackgroundNoise::new(1);
        let loud = AudioBuffer::from_interleaved(1, &[1000; 80]).unwrap();

        noise.update(&loud);
        assert_eq!(noise.energy(0), INITIAL_ENERGY + (INITIAL_ENERGY >> 7));

        for _ in 0..10_000 {
            noise.update(&loud);
        }
        assert_eq!(noise.energy(0), 1_000_000);
    }

    #[test]
    fn test_untracked_channel_reports_initial_energy() {
        let mut noise = BackgroundNoise::new(1);
        noise.update(&AudioBuffer::from_interleaved(2, &[0; 160]).unwrap());
        assert_eq!(noise.energy(0), 0);
        assert_eq!(noise.energy(1), INITIAL_ENERGY);
        assert_eq!(noise.energy(7), INITIAL_ENERGY);
    }

    #[test]
    fn test_reset() {
        let mut noise = BackgroundNoise::new(1);
        noise.update(&AudioBuffer::from_interleaved(1, &[0; 80]).unwrap());
        assert_eq!(noise.energy(0), 0);

        noise.reset();
        assert_eq!(noise.energy(0), INITIAL_ENERGY);
    }
}
