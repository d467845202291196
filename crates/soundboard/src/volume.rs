//! Raw chip volume ↔ user volume level mapping
//!
//! The chip exposes a raw volume (0..=204 on current firmware) that it
//! nudges up or down by one step per command. Users think in a handful of
//! levels instead. [`VolumeScale`] maps between the two with a single
//! linear rule and rounds half away from zero in both directions, so every
//! level survives a round trip through its raw volume whenever the raw
//! range is at least as wide as the level range.
//!
//! All arithmetic is done on integers (rational `span_v / span_l`), so the
//! mapping is exact and identical on every target.

#![allow(clippy::arithmetic_side_effects)] // operands are u8 widened to i32; no overflow possible

use core::ops::RangeInclusive;

/// Lowest raw volume the chip accepts.
pub const CHIP_MIN_VOLUME: u8 = 0;
/// Highest raw volume of current chip firmware.
pub const CHIP_MAX_VOLUME: u8 = 204;
/// Highest raw volume reported by early chip firmware revisions.
pub const LEGACY_CHIP_MAX_VOLUME: u8 = 202;
/// Default lowest level (level 0 = mute).
pub const DEFAULT_MIN_LEVEL: u8 = 0;
/// Default highest level.
pub const DEFAULT_MAX_LEVEL: u8 = 10;
/// Raw volume change per nudge on current chip firmware.
pub const DEFAULT_VOLUME_STEP: u8 = 1;

/// Limits of the raw volume and of the level range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VolumeConfig {
    /// Lowest raw volume the driver will request.
    pub min_volume: u8,
    /// Highest raw volume the driver will request.
    pub max_volume: u8,
    /// Lowest user level.
    pub min_level: u8,
    /// Highest user level.
    pub max_level: u8,
    /// Raw volume change per `+`/`-` nudge, as far as it is known up front.
    /// The session refines it from the chip's replies.
    pub volume_step: u8,
}

impl VolumeConfig {
    /// Full chip range (0..=204) mapped onto levels 0..=10.
    pub const fn new() -> Self {
        Self {
            min_volume: CHIP_MIN_VOLUME,
            max_volume: CHIP_MAX_VOLUME,
            min_level: DEFAULT_MIN_LEVEL,
            max_level: DEFAULT_MAX_LEVEL,
            volume_step: DEFAULT_VOLUME_STEP,
        }
    }

    /// Cap the raw volume, e.g. to protect small speakers.
    #[must_use]
    pub const fn with_maximum_volume(mut self, max_volume: u8) -> Self {
        self.max_volume = max_volume;
        self
    }

    /// Raise the raw floor.
    #[must_use]
    pub const fn with_minimum_volume(mut self, min_volume: u8) -> Self {
        self.min_volume = min_volume;
        self
    }

    /// Start the level range at 1 instead of 0, so the lowest level is
    /// audible rather than muted.
    #[must_use]
    pub const fn use_lower_level_one(mut self, enabled: bool) -> Self {
        self.min_level = if enabled { 1 } else { 0 };
        self
    }

    /// Change the number of levels.
    #[must_use]
    pub const fn with_maximum_level(mut self, max_level: u8) -> Self {
        self.max_level = max_level;
        self
    }

    /// Raw volume change per nudge for chips that step coarser than 1.
    /// Zero is treated as 1.
    #[must_use]
    pub const fn with_volume_step(mut self, step: u8) -> Self {
        self.volume_step = if step == 0 { 1 } else { step };
        self
    }

    /// Validate the limits and build the mapping.
    pub fn scale(self) -> Result<VolumeScale, ScaleError> {
        VolumeScale::new(self)
    }
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Rejected [`VolumeConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScaleError {
    /// `min_volume` must be strictly below `max_volume`.
    #[error("raw volume range {min}..={max} is empty")]
    EmptyVolumeRange {
        /// Configured minimum
        min: u8,
        /// Configured maximum
        max: u8,
    },
    /// `min_level` must be strictly below `max_level`.
    #[error("level range {min}..={max} is empty")]
    EmptyLevelRange {
        /// Configured minimum
        min: u8,
        /// Configured maximum
        max: u8,
    },
}

/// Validated linear mapping between raw volume and level.
///
/// ```text
/// level  = min_level  + (volume - min_volume) · span_l / span_v
/// volume = min_volume + (level  - min_level)  · span_v / span_l
/// ```
///
/// Both directions round half away from zero and clamp to the configured
/// range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VolumeScale {
    config: VolumeConfig,
}

impl VolumeScale {
    /// Build a scale from `config`.
    pub fn new(config: VolumeConfig) -> Result<Self, ScaleError> {
        if config.min_volume >= config.max_volume {
            return Err(ScaleError::EmptyVolumeRange {
                min: config.min_volume,
                max: config.max_volume,
            });
        }
        if config.min_level >= config.max_level {
            return Err(ScaleError::EmptyLevelRange {
                min: config.min_level,
                max: config.max_level,
            });
        }
        Ok(Self { config })
    }

    /// The limits this scale was built from.
    pub fn config(&self) -> VolumeConfig {
        self.config
    }

    /// Valid levels, lowest first.
    pub fn levels(&self) -> RangeInclusive<u8> {
        self.config.min_level..=self.config.max_level
    }

    /// Valid raw volumes, lowest first.
    pub fn volumes(&self) -> RangeInclusive<u8> {
        self.config.min_volume..=self.config.max_volume
    }

    /// Raw volume per level, for display only.
    pub fn increment(&self) -> f32 {
        f32::from(self.volume_span()) / f32::from(self.level_span())
    }

    /// Clamp `level` into the level range.
    pub fn clamp_level(&self, level: u8) -> u8 {
        level.clamp(self.config.min_level, self.config.max_level)
    }

    /// Clamp `volume` into the raw range.
    pub fn clamp_volume(&self, volume: u8) -> u8 {
        volume.clamp(self.config.min_volume, self.config.max_volume)
    }

    /// Level nearest to raw `volume`.
    pub fn level_from_volume(&self, volume: u8) -> u8 {
        let offset = i32::from(volume) - i32::from(self.config.min_volume);
        let level = i32::from(self.config.min_level)
            + div_round(
                offset * i32::from(self.level_span()),
                i32::from(self.volume_span()),
            );
        let clamped = level.clamp(
            i32::from(self.config.min_level),
            i32::from(self.config.max_level),
        );
        u8::try_from(clamped).unwrap_or(self.config.max_level)
    }

    /// Raw volume for `level`. Out-of-range levels are clamped first.
    pub fn volume_from_level(&self, level: u8) -> u8 {
        let offset = i32::from(self.clamp_level(level)) - i32::from(self.config.min_level);
        let volume = i32::from(self.config.min_volume)
            + div_round(
                offset * i32::from(self.volume_span()),
                i32::from(self.level_span()),
            );
        let clamped = volume.clamp(
            i32::from(self.config.min_volume),
            i32::from(self.config.max_volume),
        );
        u8::try_from(clamped).unwrap_or(self.config.max_volume)
    }

    /// Level after `level` when cycling, wrapping from the top back to the
    /// bottom.
    pub fn next_level(&self, level: u8) -> u8 {
        let level = self.clamp_level(level);
        if level >= self.config.max_level {
            self.config.min_level
        } else {
            level + 1
        }
    }

    fn volume_span(&self) -> u8 {
        self.config.max_volume - self.config.min_volume
    }

    fn level_span(&self) -> u8 {
        self.config.max_level - self.config.min_level
    }
}

impl Default for VolumeScale {
    fn default() -> Self {
        Self {
            config: VolumeConfig::new(),
        }
    }
}

/// `numerator / denominator` rounded half away from zero. `denominator > 0`.
fn div_round(numerator: i32, denominator: i32) -> i32 {
    let biased = if numerator >= 0 {
        numerator * 2 + denominator
    } else {
        numerator * 2 - denominator
    };
    biased / (denominator * 2)
}
