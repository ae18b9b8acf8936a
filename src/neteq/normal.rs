//! Normal-path rendering of decoded audio.
//!
//! [`Normal`] takes a freshly decoded frame and stitches it onto whatever the
//! previous frame was: concealment output gets cross-faded and un-muted,
//! comfort noise gets cross-faded, and a still-muted stream keeps ramping
//! its gain back to unity.
//!
//! All arithmetic is Q14 fixed point and bit-exact; see [`crate::audio::fixed_point`].

use anyhow::Result;
use tracing::{debug, trace, warn};

use super::background_noise::NoiseFloor;
use super::comfort_noise::DecoderDatabase;
use super::config::{NormalConfig, validate_sample_rate};
use super::expand::Concealment;
use super::mode::Mode;
use crate::audio::fixed_point::{
    Q14_ONE, Q14_SHIFT, apply_q14_gain, cross_fade_q14, div_w32_w16, dot_product_with_scale,
    max_abs_value_w16, norm_w32, shift_w32, sqrt_floor,
};
use crate::audio::frame::AudioBuffer;

/// Unity gain as a mute factor.
pub const UNITY_MUTE_FACTOR: i16 = Q14_ONE as i16;

/// Samples of comfort noise requested per call; enough for 1 ms at 48 kHz.
const CNG_LENGTH: usize = 48;
/// Samples per channel per `fs_mult` used for the energy estimate.
const ENERGY_WINDOW_PER_FS_MULT: usize = 64;
/// Mute factor step per sample at 8 kHz, in Q14.
const RAMP_STEP_NB: i32 = 64;
/// Headroom bits in the energy estimate.
const ENERGY_HEADROOM_BITS: i32 = 6;
/// Largest shortfall from unity a cross-fade ramp may end on.
const MAX_RAMP_SHORTFALL_Q14: i32 = 32;

/// The collaborators consulted while rendering one frame.
pub struct NormalContext<'a> {
    pub expand: &'a mut dyn Concealment,
    pub background_noise: &'a dyn NoiseFloor,
    pub decoder_database: &'a mut dyn DecoderDatabase,
}

/// Renders decoded frames on the normal (non-concealment) path.
#[derive(Debug, Clone)]
pub struct Normal {
    sample_rate_hz: u32,
    samples_per_ms: usize,
    default_win_slope_q14: i16,
}

impl Normal {
    pub fn new(config: &NormalConfig) -> Result<Self> {
        config.validate()?;
        let mut normal = Self {
            sample_rate_hz: 0,
            samples_per_ms: 0,
            default_win_slope_q14: 0,
        };
        normal.set_sample_rate(config.sample_rate_hz)?;
        Ok(normal)
    }

    /// Switch to a new output sample rate. On error the old rate is kept.
    pub fn set_sample_rate(&mut self, sample_rate_hz: u32) -> Result<()> {
        validate_sample_rate(sample_rate_hz)?;
        self.sample_rate_hz = sample_rate_hz;
        self.samples_per_ms = (sample_rate_hz / 1000) as usize;
        self.default_win_slope_q14 = (Q14_ONE / self.samples_per_ms as i32) as i16;
        debug!(
            "Normal: sample rate set to {} Hz (window={} samples, slope={})",
            sample_rate_hz, self.samples_per_ms, self.default_win_slope_q14
        );
        Ok(())
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    pub fn samples_per_ms(&self) -> usize {
        self.samples_per_ms
    }

    /// Render `input` (interleaved) into `output` and return the number of
    /// samples consumed.
    ///
    /// The channel count is taken from `output`. Empty input, or input whose
    /// length is not a multiple of the channel count, leaves `output` empty
    /// and consumes nothing. `mute_factors` holds one Q14 gain per channel and
    /// is ramped towards unity in place.
    pub fn process(
        &self,
        input: &[i16],
        last_mode: Mode,
        mute_factors: &mut [i16],
        ctx: &mut NormalContext<'_>,
        output: &mut AudioBuffer,
    ) -> usize {
        output.clear();
        if input.is_empty() {
            return 0;
        }

        let channels = output.channels();
        if input.len() % channels != 0 {
            warn!(
                "Normal: input length {} is not a multiple of {} channels, dropping frame",
                input.len(),
                channels
            );
            return 0;
        }
        if mute_factors.len() < channels {
            warn!(
                "Normal: {} mute factors for {} channels, dropping frame",
                mute_factors.len(),
                channels
            );
            return 0;
        }
        output.push_back_interleaved(input);

        let mute_factors = &mut mute_factors[..channels];
        for mute in mute_factors.iter_mut() {
            *mute = (*mute).clamp(0, UNITY_MUTE_FACTOR);
        }

        let fs_mult = (self.sample_rate_hz / 8000) as usize;
        debug_assert!(fs_mult > 0);
        // log2(fs_mult) rounded down, inexact for 48 kHz.
        let fs_shift = 30 - norm_w32(fs_mult as i32);

        if last_mode.is_concealment() {
            trace!("Normal: blending after concealment");
            self.blend_after_expand(fs_mult, fs_shift, mute_factors, ctx, output);
        } else if last_mode.is_comfort_noise() {
            trace!("Normal: blending after comfort noise");
            self.blend_after_cng(fs_mult, mute_factors, ctx.decoder_database, output);
        } else if mute_factors.iter().any(|&m| m < UNITY_MUTE_FACTOR) {
            trace!("Normal: ramping up from earlier muting");
            let increment = ramp_increment(fs_mult);
            for (channel_ix, mute) in mute_factors.iter_mut().enumerate() {
                ramp_gain(output.channel_mut(channel_ix), mute, increment);
            }
        }

        input.len()
    }

    fn blend_after_expand(
        &self,
        fs_mult: usize,
        fs_shift: i32,
        mute_factors: &mut [i16],
        ctx: &mut NormalContext<'_>,
        output: &mut AudioBuffer,
    ) {
        let channels = output.channels();

        ctx.expand.configure_for_normal_after_expand();
        let mut expanded = AudioBuffer::new(channels);
        ctx.expand.process(&mut expanded);
        ctx.expand.reset();

        let length_per_channel = output.samples_per_channel();
        let energy_length = (fs_mult * ENERGY_WINDOW_PER_FS_MULT).min(length_per_channel);
        let increment = ramp_increment(fs_mult);
        let (win_length, win_slope_q14) = self.window(length_per_channel);
        debug_assert!(
            expanded.samples_per_channel() >= win_length,
            "concealment produced {} samples, window needs {}",
            expanded.samples_per_channel(),
            win_length
        );

        for (channel_ix, mute) in mute_factors.iter_mut().enumerate() {
            let expand_mute = i32::from(ctx.expand.mute_factor(channel_ix));
            *mute = ((i32::from(*mute) * expand_mute) >> Q14_SHIFT) as i16;

            let energy = frame_energy(output.channel(channel_ix), energy_length, fs_shift);
            let ratchet = ratchet_mute_factor(energy, ctx.background_noise.energy(channel_ix));
            if ratchet > i32::from(*mute) {
                *mute = ratchet.min(Q14_ONE) as i16;
            }

            let signal = output.channel_mut(channel_ix);
            ramp_gain(signal, mute, increment);
            cross_fade_in(signal, expanded.channel(channel_ix), win_length, win_slope_q14);
        }
    }

    fn blend_after_cng(
        &self,
        fs_mult: usize,
        mute_factors: &mut [i16],
        decoder_database: &mut dyn DecoderDatabase,
        output: &mut AudioBuffer,
    ) {
        debug_assert_eq!(output.channels(), 1, "comfort noise blending is mono only");
        debug_assert!(8 * fs_mult <= CNG_LENGTH);

        // The silence period is over; start from full gain.
        mute_factors[0] = UNITY_MUTE_FACTOR;

        let mut cng_output = [0i16; CNG_LENGTH];
        match decoder_database.active_cng_decoder() {
            Some(decoder) => {
                if let Err(e) = decoder.generate(&mut cng_output, false) {
                    debug!("Normal: comfort noise generation failed: {:#}", e);
                    cng_output.fill(0);
                }
            }
            None => {
                // Interpolates the decoded signal with itself.
                let signal = output.channel(0);
                let len = (8 * fs_mult).min(signal.len()).min(CNG_LENGTH);
                cng_output[..len].copy_from_slice(&signal[..len]);
            }
        }

        let available = CNG_LENGTH.min(output.samples_per_channel());
        let (win_length, win_slope_q14) = self.window(available);
        cross_fade_in(output.channel_mut(0), &cng_output, win_length, win_slope_q14);
    }

    /// One millisecond cross-fade window, shortened to `available` samples.
    fn window(&self, available: usize) -> (usize, i16) {
        if self.samples_per_ms > available {
            debug_assert!(available > 0);
            (available, (Q14_ONE / available.max(1) as i32) as i16)
        } else {
            (self.samples_per_ms, self.default_win_slope_q14)
        }
    }
}

/// Per-sample mute factor increase: 0.64 per 20 ms at any sample rate.
fn ramp_increment(fs_mult: usize) -> i32 {
    RAMP_STEP_NB / fs_mult as i32
}

/// Apply `mute` to every sample while stepping it towards unity.
fn ramp_gain(signal: &mut [i16], mute: &mut i16, increment: i32) {
    for sample in signal.iter_mut() {
        *sample = apply_q14_gain(*sample, *mute);
        *mute = (i32::from(*mute) + increment).min(Q14_ONE) as i16;
    }
}

/// Mean energy of the first `energy_length` samples, scaled down far enough
/// that the sum stays within 32 bits.
fn frame_energy(signal: &[i16], energy_length: usize, fs_shift: i32) -> i32 {
    let decoded_max = i32::from(max_abs_value_w16(signal));
    let scaling = (ENERGY_HEADROOM_BITS + fs_shift - norm_w32(decoded_max * decoded_max)).max(0);
    let energy = dot_product_with_scale(signal, signal, energy_length, scaling as u32);
    let scaled_energy_length = (energy_length >> scaling) as i32;
    if scaled_energy_length > 0 {
        energy / scaled_energy_length
    } else {
        0
    }
}

/// Gain that brings a frame of `energy` down to the noise floor, in Q14.
///
/// Frames at or below the noise floor, or silent frames, are taken as full scale.
fn ratchet_mute_factor(energy: i32, background_energy: u32) -> i32 {
    if energy == 0 || i64::from(energy) <= i64::from(background_energy) {
        return Q14_ONE;
    }
    // Normalize the frame energy to 15 bits.
    let scaling = norm_w32(energy) - 16;
    let bgn_energy = shift_w32(background_energy as i32, scaling + Q14_SHIFT as i32);
    let energy_scaled = shift_w32(energy, scaling) as i16;
    let ratio = div_w32_w16(bgn_energy, energy_scaled);
    sqrt_floor(ratio << Q14_SHIFT)
}

/// Linearly fade from `outgoing` into `signal` over `win_length` samples.
///
/// Returns the blend weight reached on the last sample of the window.
fn cross_fade_in(
    signal: &mut [i16],
    outgoing: &[i16],
    win_length: usize,
    win_slope_q14: i16,
) -> i16 {
    debug_assert!(signal.len() >= win_length);
    let mut win_up_q14: i16 = 0;
    for (i, sample) in signal.iter_mut().take(win_length).enumerate() {
        win_up_q14 += win_slope_q14;
        let previous = outgoing.get(i).copied().unwrap_or(0);
        *sample = cross_fade_q14(*sample, previous, win_up_q14);
    }
    debug_assert!(
        win_length == 0 || i32::from(win_up_q14) > Q14_ONE - MAX_RAMP_SHORTFALL_Q14,
        "cross-fade ended at {} of {}",
        win_up_q14,
        Q14_ONE
    );
    win_up_q14
}
