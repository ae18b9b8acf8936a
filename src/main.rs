use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dasp_sample::Sample as DaspSample;
use serde::Deserialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use neteq_normal::audio::AudioBuffer;
use neteq_normal::audio::fixed_point::max_abs_value_w16;
use neteq_normal::neteq::{
    BackgroundNoise, CngDatabase, Concealment, DecoderDatabase, Mode, Normal, NormalConfig,
    NormalContext, RepeatExpand, UNITY_MUTE_FACTOR, WhiteNoiseCng,
};

const USAGE: &str = "usage: neteq-normal <input.wav> <output.wav> [simulation.json]";
/// Longest frame the simulation accepts.
const MAX_FRAME_MS: u32 = 1000;

/// Packet loss and silence simulation settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct SimulationConfig {
    /// Frame duration in milliseconds.
    frame_ms: u32,
    /// Every n-th frame is lost. 0 disables loss.
    loss_period: usize,
    /// Mono frames peaking below this are sent as comfort noise. 0 disables it.
    silence_threshold: i16,
    /// Peak level of the generated comfort noise.
    cng_level: i16,
    seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            frame_ms: 10,
            loss_period: 5,
            silence_threshold: 0,
            cng_level: 30,
            seed: 0,
        }
    }
}

impl SimulationConfig {
    fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            (1..=MAX_FRAME_MS).contains(&self.frame_ms),
            "frame_ms must be between 1 and {}, got {}",
            MAX_FRAME_MS,
            self.frame_ms
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct SimulationStats {
    normal: usize,
    concealed: usize,
    comfort_noise: usize,
    dropped: usize,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run() {
        error!("Application error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let input = PathBuf::from(args.next().context(USAGE)?);
    let output = PathBuf::from(args.next().context(USAGE)?);
    let config = match args.next() {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path))?;
            serde_json::from_str::<SimulationConfig>(&json)
                .with_context(|| format!("Invalid simulation config {}", path))?
        }
        None => SimulationConfig::default(),
    };
    config.validate()?;
    info!("Simulation config: {:?}", config);

    let (spec, samples) = read_wav(&input)?;
    let channels = spec.channels as usize;
    let normal = Normal::new(&NormalConfig {
        sample_rate_hz: spec.sample_rate,
    })?;
    info!(
        "Input {}: {} Hz, {} channel(s), {} samples",
        input.display(),
        spec.sample_rate,
        channels,
        samples.len()
    );

    let (rendered, stats) = simulate(&normal, channels, &samples, &config);
    write_wav(&output, spec.sample_rate, spec.channels, &rendered)?;

    info!(
        "Wrote {}: {} normal, {} concealed, {} comfort noise, {} dropped frames",
        output.display(),
        stats.normal,
        stats.concealed,
        stats.comfort_noise,
        stats.dropped
    );
    Ok(())
}

fn simulate(
    normal: &Normal,
    channels: usize,
    samples: &[i16],
    config: &SimulationConfig,
) -> (Vec<i16>, SimulationStats) {
    let samples_per_channel =
        (u64::from(normal.sample_rate_hz()) * u64::from(config.frame_ms) / 1000) as usize;
    let frame_len = samples_per_channel * channels;

    let mut expand = RepeatExpand::new(channels, samples_per_channel);
    let mut background_noise = BackgroundNoise::new(channels);
    let mut database = if config.silence_threshold > 0 && channels == 1 {
        CngDatabase::with_decoder(Box::new(WhiteNoiseCng::new(config.cng_level, config.seed)))
    } else {
        CngDatabase::new()
    };

    let mut mute_factors = vec![UNITY_MUTE_FACTOR; channels];
    let mut last_mode = Mode::Normal;
    let mut stats = SimulationStats::default();
    let mut rendered = AudioBuffer::new(channels);
    let mut out = Vec::with_capacity(samples.len());

    for (index, frame) in samples.chunks(frame_len).enumerate() {
        if config.loss_period > 0 && index > 0 && index % config.loss_period == 0 {
            let mut concealed = AudioBuffer::new(channels);
            expand.process(&mut concealed);
            out.extend(concealed.to_interleaved().into_iter().take(frame.len()));
            last_mode = Mode::Expand;
            stats.concealed += 1;
            continue;
        }

        if config.silence_threshold > 0 && max_abs_value_w16(frame) < config.silence_threshold {
            if let Some(cng) = database.active_cng_decoder() {
                let mut noise = vec![0i16; frame.len()];
                let new_period = last_mode != Mode::Rfc3389Cng;
                if cng.generate(&mut noise, new_period).is_ok() {
                    out.extend(noise);
                    last_mode = Mode::Rfc3389Cng;
                    stats.comfort_noise += 1;
                    continue;
                }
            }
        }

        let mut ctx = NormalContext {
            expand: &mut expand,
            background_noise: &background_noise,
            decoder_database: &mut database,
        };
        if normal.process(frame, last_mode, &mut mute_factors, &mut ctx, &mut rendered) == 0 {
            out.extend(std::iter::repeat_n(0, frame.len()));
            stats.dropped += 1;
        } else {
            background_noise.update(&rendered);
            expand.update_history(&rendered);
            out.extend(rendered.to_interleaved());
            stats.normal += 1;
        }
        last_mode = Mode::Normal;
    }

    (out, stats)
}

fn read_wav(path: &Path) -> Result<(hound::WavSpec, Vec<i16>)> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let spec = reader.spec();
    let samples = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to decode 16-bit samples")?,
        (hound::SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .map(|s| s.map(|v| v.to_sample::<i16>()))
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to decode float samples")?,
        (format, bits) => anyhow::bail!("Unsupported WAV format {:?} with {} bits", format, bits),
    };
    Ok((spec, samples))
}

fn write_wav(path: &Path, sample_rate: u32, channels: u16, samples: &[i16]) -> Result<()> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize().context("Failed to finalize WAV")?;
    Ok(())
}
