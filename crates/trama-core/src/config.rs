//! Audio configuration shared by every node in a patch.

use crate::error::PatchError;

/// Immutable description of the active audio format.
///
/// One `AudioConfig` is shared by all nodes in a patch generation. Changing it
/// via [`Patch::configure`](crate::Patch::configure) makes every node resize
/// its buffers and recompute its envelope deltas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioConfig {
    /// Sample rate in Hz.
    pub sample_rate: f64,
    /// Number of samples processed per scheduling tick.
    pub block_size: usize,
    /// Number of audio channels per audio buffer.
    pub channels: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            block_size: 64,
            channels: 2,
        }
    }
}

impl AudioConfig {
    /// Creates a configuration from its three components.
    pub fn new(sample_rate: f64, block_size: usize, channels: usize) -> Self {
        Self {
            sample_rate,
            block_size,
            channels,
        }
    }

    /// Checks the configuration for use in a patch.
    ///
    /// The sample rate must be finite and positive; block size and channel
    /// count must be nonzero.
    pub fn validate(&self) -> Result<(), PatchError> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(PatchError::InvalidConfig("sample rate must be positive"));
        }
        if self.block_size == 0 {
            return Err(PatchError::InvalidConfig("block size must be nonzero"));
        }
        if self.channels == 0 {
            return Err(PatchError::InvalidConfig("channel count must be nonzero"));
        }
        Ok(())
    }
}
