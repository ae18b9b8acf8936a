//! Configuration for the normal-path renderer.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Output sample rates the renderer accepts.
pub const SUPPORTED_SAMPLE_RATES: [u32; 4] = [8000, 16000, 32000, 48000];

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NormalConfig {
    /// Output sample rate in Hz.
    pub sample_rate_hz: u32,
}

impl Default for NormalConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 16000,
        }
    }
}

impl NormalConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("Invalid renderer config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_sample_rate(self.sample_rate_hz)
    }
}

pub fn validate_sample_rate(sample_rate_hz: u32) -> Result<()> {
    anyhow::ensure!(
        SUPPORTED_SAMPLE_RATES.contains(&sample_rate_hz),
        "Unsupported sample rate {} Hz (expected one of {:?})",
        sample_rate_hz,
        SUPPORTED_SAMPLE_RATES
    );
    Ok(())
}
