use anyhow::Result;

/// A multi-channel audio buffer storing each channel de-interleaved.
///
/// The channel count is fixed at construction; every channel always holds the
/// same number of samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    channels: Vec<Vec<i16>>,
}

impl AudioBuffer {
    /// Create an empty buffer with `channels` channels.
    pub fn new(channels: usize) -> Self {
        assert!(channels > 0, "AudioBuffer needs at least one channel");
        Self {
            channels: vec![Vec::new(); channels],
        }
    }

    /// Create a buffer from interleaved samples.
    ///
    /// Returns an error if the data length is not a multiple of the channel count.
    pub fn from_interleaved(channels: usize, data: &[i16]) -> Result<Self> {
        anyhow::ensure!(channels > 0, "Channel count must be positive");
        if data.len() % channels != 0 {
            anyhow::bail!(
                "Data length {} must be a multiple of channels {}",
                data.len(),
                channels
            );
        }
        let mut buffer = Self::new(channels);
        buffer.push_back_interleaved(data);
        Ok(buffer)
    }

    /// Append interleaved samples, splitting them across channels.
    ///
    /// A trailing partial frame is ignored.
    pub fn push_back_interleaved(&mut self, data: &[i16]) {
        let count = self.channels.len();
        debug_assert_eq!(data.len() % count, 0);
        for frame in data.chunks_exact(count) {
            for (channel, &sample) in self.channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
    }

    /// Append one equally sized block of samples per channel.
    pub fn push_back_planar(&mut self, planes: &[Vec<i16>]) {
        assert_eq!(planes.len(), self.channels.len(), "Plane count must match channels");
        debug_assert!(planes.windows(2).all(|w| w[0].len() == w[1].len()));
        for (channel, plane) in self.channels.iter_mut().zip(planes) {
            channel.extend_from_slice(plane);
        }
    }

    /// Remove all samples, keeping the channel count.
    pub fn clear(&mut self) {
        for channel in &mut self.channels {
            channel.clear();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples_per_channel() == 0
    }

    /// Returns the number of channels.
    pub fn channels(&self) -> usize {
        self.channels.len()
    }

    /// Returns the number of samples per channel.
    pub fn samples_per_channel(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn channel(&self, channel_idx: usize) -> &[i16] {
        assert!(
            channel_idx < self.channels.len(),
            "Channel index {} out of bounds (max {})",
            channel_idx,
            self.channels.len() - 1
        );
        &self.channels[channel_idx]
    }

    pub fn channel_mut(&mut self, channel_idx: usize) -> &mut [i16] {
        assert!(
            channel_idx < self.channels.len(),
            "Channel index {} out of bounds (max {})",
            channel_idx,
            self.channels.len() - 1
        );
        &mut self.channels[channel_idx]
    }

    /// Interleave all channels into a new vector.
    pub fn to_interleaved(&self) -> Vec<i16> {
        let len = self.samples_per_channel();
        let mut out = Vec::with_capacity(len * self.channels.len());
        for i in 0..len {
            for channel in &self.channels {
                out.push(channel[i]);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_buffer_deinterleaves() {
        let samples = vec![1, 10, 2, 20, 3, 30]; // L1, R1, L2, R2, L3, R3
        let buffer = AudioBuffer::from_interleaved(2, &samples).unwrap();

        assert_eq!(buffer.channels(), 2);
        assert_eq!(buffer.samples_per_channel(), 3);
        assert_eq!(buffer.channel(0), &[1, 2, 3]);
        assert_eq!(buffer.channel(1), &[10, 20, 30]);
        assert_eq!(buffer.to_interleaved(), samples);
    }

    #[test]
    fn test_audio_buffer_validation() {
        assert!(AudioBuffer::from_interleaved(2, &[0; 960]).is_ok());
        assert!(AudioBuffer::from_interleaved(2, &[0; 961]).is_err());
        assert!(AudioBuffer::from_interleaved(0, &[0; 4]).is_err());
        assert!(AudioBuffer::from_interleaved(3, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_push_back_planar() {
        let mut buffer = AudioBuffer::new(2);
        buffer.push_back_planar(&[vec![1, 2], vec![5, 6]]);
        buffer.push_back_planar(&[vec![3], vec![7]]);

        assert_eq!(buffer.samples_per_channel(), 3);
        assert_eq!(buffer.to_interleaved(), vec![1, 5, 2, 6, 3, 7]);
    }

    #[test]
    fn test_clear_keeps_channel_count() {
        let mut buffer = AudioBuffer::from_interleaved(2, &[1, 2, 3, 4]).unwrap();
        buffer.clear();

        assert!(buffer.is_empty());
        assert_eq!(buffer.channels(), 2);
    }
}
