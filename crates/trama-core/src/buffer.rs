//! Audio-rate and control-rate sample containers.
//!
//! An [`AudioBuffer`] is channel-major: one contiguous `f32` sequence per
//! channel, each `block_size` samples long. A [`ControlBuffer`] is a single
//! `block_size` sequence. Both resize in place on a configuration change,
//! preserving overlapping samples and zero-filling new positions — envelopes
//! read and write these buffers in place, so resizing must not scramble
//! previously written data.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use crate::config::AudioConfig;

/// Multi-channel audio-rate buffer, one `f32` sequence per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Creates a zeroed buffer sized by the given configuration.
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            channels: (0..config.channels)
                .map(|_| vec![0.0; config.block_size])
                .collect(),
        }
    }

    /// Returns the number of channels.
    pub fn channels(&self) -> usize {
        self.channels.len()
    }

    /// Returns the number of samples per channel.
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, |c| c.len())
    }

    /// Returns true if the buffer holds no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the samples of one channel.
    ///
    /// # Panics
    ///
    /// Panics if `index >= channels()`.
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    /// Returns the samples of one channel mutably.
    ///
    /// # Panics
    ///
    /// Panics if `index >= channels()`.
    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.channels[index]
    }

    /// Fills every channel with zeros.
    pub fn clear(&mut self) {
        for ch in &mut self.channels {
            ch.fill(0.0);
        }
    }

    /// Copies channel `source` into every other channel.
    ///
    /// Used by generator nodes that synthesize one channel and duplicate it —
    /// multi-channel duplication, not per-channel synthesis.
    pub fn replicate_channel(&mut self, source: usize) {
        if source >= self.channels.len() {
            return;
        }
        let (before, rest) = self.channels.split_at_mut(source);
        let (src, after) = rest.split_first_mut().expect("source channel exists");
        for ch in before.iter_mut().chain(after.iter_mut()) {
            ch.copy_from_slice(src);
        }
    }

    /// Copies the contents of another buffer of the same shape.
    ///
    /// Channels or samples beyond the other buffer's shape are left untouched.
    pub fn copy_from(&mut self, other: &AudioBuffer) {
        for (dst, src) in self.channels.iter_mut().zip(other.channels.iter()) {
            let n = dst.len().min(src.len());
            dst[..n].copy_from_slice(&src[..n]);
        }
    }

    /// Resizes to a new configuration, preserving overlapping samples and
    /// zero-filling new positions.
    pub fn resize(&mut self, config: &AudioConfig) {
        self.channels
            .resize_with(config.channels, || vec![0.0; config.block_size]);
        for ch in &mut self.channels {
            ch.resize(config.block_size, 0.0);
        }
    }
}

/// Single-channel control-rate buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlBuffer {
    data: Vec<f32>,
}

impl ControlBuffer {
    /// Creates a zeroed control buffer of the given block size.
    pub fn new(block_size: usize) -> Self {
        Self {
            data: vec![0.0; block_size],
        }
    }

    /// Returns the number of samples.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the buffer holds no samples.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the samples as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Returns the samples as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Sets every sample to `value`.
    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    /// Copies the contents of another control buffer.
    ///
    /// Samples beyond the other buffer's length are left untouched.
    pub fn copy_from(&mut self, other: &ControlBuffer) {
        let n = self.data.len().min(other.data.len());
        self.data[..n].copy_from_slice(&other.data[..n]);
    }

    /// Resizes to a new block size, preserving overlapping samples and
    /// zero-filling new positions.
    pub fn resize(&mut self, block_size: usize) {
        self.data.resize(block_size, 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(block_size: usize, channels: usize) -> AudioConfig {
        AudioConfig::new(48000.0, block_size, channels)
    }

    #[test]
    fn audio_buffer_shape() {
        let buf = AudioBuffer::new(&cfg(64, 2));
        assert_eq!(buf.channels(), 2);
        assert_eq!(buf.len(), 64);
        assert!(buf.channel(0).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn resize_preserves_overlap_and_zero_fills() {
        let mut buf = AudioBuffer::new(&cfg(4, 1));
        buf.channel_mut(0).copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);

        buf.resize(&cfg(6, 2));
        assert_eq!(buf.channel(0), &[1.0, 2.0, 3.0, 4.0, 0.0, 0.0]);
        assert!(buf.channel(1).iter().all(|&s| s == 0.0));

        buf.resize(&cfg(2, 1));
        assert_eq!(buf.channels(), 1);
        assert_eq!(buf.channel(0), &[1.0, 2.0]);
    }

    #[test]
    fn replicate_channel_duplicates_bitwise() {
        let mut buf = AudioBuffer::new(&cfg(3, 3));
        buf.channel_mut(1).copy_from_slice(&[0.5, -0.5, 0.25]);
        buf.replicate_channel(1);
        assert_eq!(buf.channel(0), buf.channel(1));
        assert_eq!(buf.channel(2), buf.channel(1));
    }

    #[test]
    fn control_buffer_resize() {
        let mut buf = ControlBuffer::new(3);
        buf.as_mut_slice().copy_from_slice(&[1.0, 2.0, 3.0]);
        buf.resize(5);
        assert_eq!(buf.as_slice(), &[1.0, 2.0, 3.0, 0.0, 0.0]);
        buf.resize(2);
        assert_eq!(buf.as_slice(), &[1.0, 2.0]);
    }
}
