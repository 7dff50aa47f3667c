//! Operator settings: the fixed construction parameters of every node.

#![forbid(unsafe_code)]

use crate::invariant_ppt::{assert_invariant, SETTINGS_VALID};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Errors produced when validating [`OperatorSettings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// Sample rate must be a positive integer.
    #[error("sample rate must be positive")]
    ZeroSampleRate,
    /// Block size must be a positive integer.
    #[error("block size must be positive")]
    ZeroBlockSize,
}

/// Sample rate and block size, fixed for the lifetime of a node instance.
///
/// A value of this type is always valid: both fields are non-zero, so nodes
/// divide by the sample rate without guarding each call.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawSettings", into = "RawSettings"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorSettings {
    sample_rate: u32,
    block_size: usize,
}

impl OperatorSettings {
    /// Validate and create settings.
    pub fn new(sample_rate: u32, block_size: usize) -> Result<Self, SettingsError> {
        if sample_rate == 0 {
            return Err(SettingsError::ZeroSampleRate);
        }
        if block_size == 0 {
            return Err(SettingsError::ZeroBlockSize);
        }
        assert_invariant(SETTINGS_VALID, true, "Settings validated", Some("OperatorSettings::new"));
        Ok(Self {
            sample_rate,
            block_size,
        })
    }

    /// Samples per second.
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples per processing block.
    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Duration of `samples` samples in seconds.
    #[inline]
    pub fn samples_to_seconds(&self, samples: u64) -> f64 {
        samples as f64 / self.sample_rate as f64
    }
}

impl Default for OperatorSettings {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            block_size: 256,
        }
    }
}

#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
struct RawSettings {
    sample_rate: u32,
    block_size: usize,
}

#[cfg(feature = "serde")]
impl TryFrom<RawSettings> for OperatorSettings {
    type Error = SettingsError;

    fn try_from(raw: RawSettings) -> Result<Self, Self::Error> {
        Self::new(raw.sample_rate, raw.block_size)
    }
}

#[cfg(feature = "serde")]
impl From<OperatorSettings> for RawSettings {
    fn from(settings: OperatorSettings) -> Self {
        Self {
            sample_rate: settings.sample_rate,
            block_size: settings.block_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_reject_zero_sample_rate() {
        assert_eq!(OperatorSettings::new(0, 64), Err(SettingsError::ZeroSampleRate));
    }

    #[test]
    fn settings_reject_zero_block_size() {
        assert_eq!(OperatorSettings::new(44_100, 0), Err(SettingsError::ZeroBlockSize));
    }

    #[test]
    fn settings_accessors() {
        let settings = OperatorSettings::new(44_100, 64).unwrap();
        assert_eq!(settings.sample_rate(), 44_100);
        assert_eq!(settings.block_size(), 64);
        assert_eq!(settings.samples_to_seconds(44_100), 1.0);
    }

    #[test]
    fn default_settings_are_valid() {
        let settings = OperatorSettings::default();
        assert_eq!(
            OperatorSettings::new(settings.sample_rate(), settings.block_size()),
            Ok(settings)
        );
    }
}
