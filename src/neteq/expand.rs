//! Packet-loss concealment.
//!
//! [`Concealment`] is what the normal path needs from a concealment generator.
//! [`RepeatExpand`] is a simple generator that replays the last good frame
//! with a decaying mute factor.

use tracing::{debug, trace};

use crate::audio::fixed_point::{Q14_ONE, Q14_SHIFT, apply_q14_gain};
use crate::audio::frame::AudioBuffer;

/// Per-call mute decay of [`RepeatExpand`] (0.9 in Q14).
const EXPAND_DECAY_Q14: i32 = 14746;

/// A generator of synthetic audio covering lost packets.
pub trait Concealment: Send {
    /// Prepare the next [`process`](Concealment::process) call to produce
    /// interpolation data for a normal frame that follows concealment.
    fn configure_for_normal_after_expand(&mut self);

    /// Append one concealment-length buffer to `output`.
    fn process(&mut self, output: &mut AudioBuffer);

    /// Forget the in-progress concealment episode. Mute factors are kept.
    fn reset(&mut self);

    /// The generator's own Q14 mute factor for `channel`.
    fn mute_factor(&self, channel: usize) -> i16;
}

/// Conceals loss by cycling through the last decoded frame.
///
/// Each concealment call attenuates the output by a further 0.9, except the
/// probe issued after
/// [`configure_for_normal_after_expand`](Concealment::configure_for_normal_after_expand).
///
/// Output channels beyond the ones the generator was built for are silent
/// and report unity gain.
#[derive(Debug, Clone)]
pub struct RepeatExpand {
    history: AudioBuffer,
    mute_factors: Vec<i16>,
    frame_samples: usize,
    position: usize,
    consecutive_expands: u32,
    normal_after_expand: bool,
}

impl RepeatExpand {
    /// `frame_samples` is the per-channel length of each concealment buffer.
    pub fn new(channels: usize, frame_samples: usize) -> Self {
        Self {
            history: AudioBuffer::new(channels),
            mute_factors: vec![Q14_ONE as i16; channels],
            frame_samples,
            position: 0,
            consecutive_expands: 0,
            normal_after_expand: false,
        }
    }

    /// Remember the most recent good frame and restore full gain.
    pub fn update_history(&mut self, frame: &AudioBuffer) {
        debug_assert_eq!(frame.channels(), self.history.channels());
        if frame.is_empty() {
            return;
        }
        self.history = frame.clone();
        self.mute_factors.fill(Q14_ONE as i16);
        self.position = 0;
    }

    pub fn consecutive_expands(&self) -> u32 {
        self.consecutive_expands
    }
}

impl Concealment for RepeatExpand {
    fn configure_for_normal_after_expand(&mut self) {
        self.normal_after_expand = true;
    }

    fn process(&mut self, output: &mut AudioBuffer) {
        let history_len = self.history.samples_per_channel();
        let tracked = self.history.channels();
        if output.channels() != tracked {
            debug!(
                "RepeatExpand: asked for {} channels, tracking {}",
                output.channels(),
                tracked
            );
        }

        let mut planes = Vec::with_capacity(output.channels());
        for channel_ix in 0..output.channels() {
            if channel_ix >= tracked || history_len == 0 {
                planes.push(vec![0; self.frame_samples]);
                continue;
            }
            let mute = self.mute_factors[channel_ix];
            let history = self.history.channel(channel_ix);
            planes.push(
                (0..self.frame_samples)
                    .map(|i| apply_q14_gain(history[(self.position + i) % history_len], mute))
                    .collect(),
            );
        }

        if !self.normal_after_expand {
            for mute in self.mute_factors.iter_mut() {
                *mute = ((i32::from(*mute) * EXPAND_DECAY_Q14) >> Q14_SHIFT) as i16;
            }
        }

        output.push_back_planar(&planes);

        if history_len > 0 {
            self.position = (self.position + self.frame_samples) % history_len;
        }
        if !self.normal_after_expand {
            self.consecutive_expands += 1;
        }
        trace!(
            "RepeatExpand: produced {} samples/channel (consecutive={})",
            self.frame_samples, self.consecutive_expands
        );
    }

    fn reset(&mut self) {
        self.consecutive_expands = 0;
        self.normal_after_expand = false;
        self.position = 0;
    }

    fn mute_factor(&self, channel: usize) -> i16 {
        self.mute_factors.get(channel).copied().unwrap_or(Q14_ONE as i16)
    }
}
