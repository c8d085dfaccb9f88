//! Conversion configuration
//!
//! Loaded from an optional TOML file; every field falls back to its default
//! when absent.
//!
//! ```toml
//! resolution = 64
//! gap = 0.05
//! color_quantization = 16
//! padding_ratio = 0.05
//! ```

use crate::types::{Result, VoxelArtError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parameters of one mesh-to-voxel conversion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Number of voxels along the longest padded axis
    pub resolution: u32,
    /// Fractional shrink of each cube, in [0, 0.5)
    pub gap: f32,
    /// Channel banding divisor (1 = original colors)
    pub color_quantization: u32,
    /// Bounds padding as a fraction of the longest axis
    pub padding_ratio: f32,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            resolution: 64,
            gap: 0.0,
            color_quantization: 1,
            padding_ratio: 0.05,
        }
    }
}

impl ConvertConfig {
    pub fn new(resolution: u32) -> Self {
        Self {
            resolution,
            ..Default::default()
        }
    }

    /// Set the voxel count along the longest axis
    pub fn with_resolution(mut self, resolution: u32) -> Self {
        self.resolution = resolution;
        self
    }

    /// Set the cube shrink gap
    pub fn with_gap(mut self, gap: f32) -> Self {
        self.gap = gap;
        self
    }

    /// Set the color banding divisor
    pub fn with_color_quantization(mut self, level: u32) -> Self {
        self.color_quantization = level;
        self
    }

    /// Set the bounds padding ratio
    pub fn with_padding_ratio(mut self, ratio: f32) -> Self {
        self.padding_ratio = ratio;
        self
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: ConvertConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.resolution == 0 {
            return Err(VoxelArtError::InvalidConfig(
                "resolution must be at least 1".to_string(),
            ));
        }
        if !(0.0..0.5).contains(&self.gap) {
            return Err(VoxelArtError::InvalidConfig(format!(
                "gap must be in [0, 0.5), got {}",
                self.gap
            )));
        }
        if self.color_quantization == 0 {
            return Err(VoxelArtError::InvalidConfig(
                "color_quantization must be at least 1".to_string(),
            ));
        }
        if !(self.padding_ratio.is_finite() && self.padding_ratio >= 0.0) {
            return Err(VoxelArtError::InvalidConfig(format!(
                "padding_ratio must be a non-negative number, got {}",
                self.padding_ratio
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ConvertConfig::default();
        assert_eq!(config.resolution, 64);
        assert_eq!(config.gap, 0.0);
        assert_eq!(config.color_quantization, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = ConvertConfig::from_toml_str("resolution = 32\ngap = 0.05\n").unwrap();
        assert_eq!(config.resolution, 32);
        assert_eq!(config.gap, 0.05);
        assert_eq!(config.color_quantization, 1);
        assert_eq!(config.padding_ratio, 0.05);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(ConvertConfig::new(0).validate().is_err());
        assert!(ConvertConfig::new(8).with_gap(0.5).validate().is_err());
        assert!(ConvertConfig::new(8).with_gap(-0.1).validate().is_err());
        assert!(ConvertConfig::new(8).with_gap(f32::NAN).validate().is_err());
        assert!(ConvertConfig::new(8).with_color_quantization(0).validate().is_err());
        assert!(ConvertConfig::new(8).with_padding_ratio(-1.0).validate().is_err());
        assert!(ConvertConfig::new(8).with_gap(0.49).validate().is_ok());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(matches!(
            ConvertConfig::from_toml_str("resolution = \"high\""),
            Err(VoxelArtError::Toml(_))
        ));
        assert!(matches!(
            ConvertConfig::from_toml_str("resolution = 0"),
            Err(VoxelArtError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = ConvertConfig::new(48).with_color_quantization(8);
        let text = toml::to_string(&config).unwrap();
        assert_eq!(ConvertConfig::from_toml_str(&text).unwrap(), config);
    }
}
