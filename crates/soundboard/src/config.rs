//! Session configuration
//!
//! Timings default to what the chip firmware needs: a 15 ms reset pulse,
//! about a second to mount the card, and a 500 ms reply timeout.

use crate::volume::{ScaleError, VolumeConfig, VolumeScale};

/// Reply timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u32 = 500;
/// Low time of the reset pulse in milliseconds.
pub const RESET_PULSE_MS: u32 = 15;
/// Time the chip needs after reset before it prints its banner.
pub const BOOT_DELAY_MS: u32 = 1_000;
/// Pause between the banner line and the rest of the boot text.
pub const BANNER_SETTLE_MS: u32 = 250;
/// Text the chip prints on its banner line.
pub const BANNER_MARKER: &str = "FX Sound Board";

/// What to do when the banner line after a reset is not recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BannerPolicy {
    /// Log a warning and carry on. Third-party firmware prints other
    /// banners but speaks the same protocol.
    #[default]
    Ignore,
    /// Fail the reset with [`Error::UnrecognisedBanner`](crate::Error::UnrecognisedBanner).
    Require,
}

/// Settings applied by [`Soundboard::begin`](crate::Soundboard::begin).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SoundboardConfig {
    /// Reply timeout handed to the transport
    pub timeout_ms: u32,
    /// Reset pulse length
    pub reset_pulse_ms: u32,
    /// Wait after releasing reset
    pub boot_delay_ms: u32,
    /// Wait after the banner line
    pub banner_settle_ms: u32,
    /// Banner check after reset
    pub banner_policy: BannerPolicy,
    /// Raw volume and level limits
    pub volume: VolumeConfig,
}

impl SoundboardConfig {
    /// Chip defaults with the full volume range.
    pub const fn new() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            reset_pulse_ms: RESET_PULSE_MS,
            boot_delay_ms: BOOT_DELAY_MS,
            banner_settle_ms: BANNER_SETTLE_MS,
            banner_policy: BannerPolicy::Ignore,
            volume: VolumeConfig::new(),
        }
    }

    /// Replace the volume limits.
    #[must_use]
    pub const fn with_volume(mut self, volume: VolumeConfig) -> Self {
        self.volume = volume;
        self
    }

    /// Replace the reply timeout.
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Replace the banner policy.
    #[must_use]
    pub const fn with_banner_policy(mut self, policy: BannerPolicy) -> Self {
        self.banner_policy = policy;
        self
    }

    /// Check the configuration and build the volume mapping.
    pub fn validate(&self) -> Result<VolumeScale, ScaleError> {
        self.volume.scale()
    }
}

impl Default for SoundboardConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::LEGACY_CHIP_MAX_VOLUME;

    #[test]
    fn test_defaults_match_chip_timing() {
        let cfg = SoundboardConfig::default();
        assert_eq!(cfg.timeout_ms, 500);
        assert_eq!(cfg.reset_pulse_ms, 15);
        assert_eq!(cfg.boot_delay_ms, 1_000);
        assert_eq!(cfg.banner_settle_ms, 250);
        assert_eq!(cfg.banner_policy, BannerPolicy::Ignore);
        assert_eq!(cfg.volume, VolumeConfig::new());
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(SoundboardConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_volume_range() {
        let cfg = SoundboardConfig::new().with_volume(VolumeConfig::new().with_maximum_volume(0));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_builders() {
        let cfg = SoundboardConfig::new()
            .with_timeout_ms(50)
            .with_banner_policy(BannerPolicy::Require)
            .with_volume(VolumeConfig::new().with_maximum_volume(LEGACY_CHIP_MAX_VOLUME));
        assert_eq!(cfg.timeout_ms, 50);
        assert_eq!(cfg.banner_policy, BannerPolicy::Require);
        assert_eq!(cfg.volume.max_volume, 202);
    }
}
