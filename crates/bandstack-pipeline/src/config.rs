//! Pipeline configuration.

use serde::{Deserialize, Serialize};

use bandstack_models::{EncodingConfig, PART_DURATION_SECS, PORTRAIT_HEIGHT, PORTRAIT_WIDTH};

use crate::error::{PipelineError, PipelineResult};

/// Configuration for a reframing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Output width in pixels
    pub out_width: u32,
    /// Output height in pixels
    pub out_height: u32,
    /// Wall-clock length of each finalized part, in seconds
    pub part_duration_secs: f64,
    /// Encoder settings for silent parts and audio attachment
    pub encoding: EncodingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            out_width: PORTRAIT_WIDTH,
            out_height: PORTRAIT_HEIGHT,
            part_duration_secs: PART_DURATION_SECS,
            encoding: EncodingConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables, falling back to the
    /// portrait defaults.
    ///
    /// Recognized variables: `BANDSTACK_OUT_WIDTH`, `BANDSTACK_OUT_HEIGHT`,
    /// `BANDSTACK_PART_DURATION`, `BANDSTACK_CRF`, `BANDSTACK_PRESET`.
    pub fn from_env() -> PipelineResult<Self> {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("BANDSTACK_OUT_WIDTH") {
            config.out_width = v
                .parse()
                .map_err(|_| PipelineError::config(format!("invalid BANDSTACK_OUT_WIDTH: {}", v)))?;
        }
        if let Ok(v) = std::env::var("BANDSTACK_OUT_HEIGHT") {
            config.out_height = v.parse().map_err(|_| {
                PipelineError::config(format!("invalid BANDSTACK_OUT_HEIGHT: {}", v))
            })?;
        }
        if let Ok(v) = std::env::var("BANDSTACK_PART_DURATION") {
            config.part_duration_secs = v.parse().map_err(|_| {
                PipelineError::config(format!("invalid BANDSTACK_PART_DURATION: {}", v))
            })?;
        }
        if let Ok(v) = std::env::var("BANDSTACK_CRF") {
            config.encoding.crf = v
                .parse()
                .map_err(|_| PipelineError::config(format!("invalid BANDSTACK_CRF: {}", v)))?;
        }
        if let Ok(v) = std::env::var("BANDSTACK_PRESET") {
            config.encoding.preset = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the compositor cannot honor.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.out_width == 0 || self.out_height == 0 {
            return Err(PipelineError::config("output dimensions must be non-zero"));
        }
        if self.out_height < 2 {
            return Err(PipelineError::config(
                "output height must fit two bands of at least one row",
            ));
        }
        if !self.part_duration_secs.is_finite() || self.part_duration_secs <= 0.0 {
            return Err(PipelineError::config("part duration must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_portrait() {
        let config = PipelineConfig::default();
        assert_eq!(config.out_width, 1080);
        assert_eq!(config.out_height, 1920);
        assert_eq!(config.part_duration_secs, 180.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_dimensions() {
        let config = PipelineConfig {
            out_width: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_nonpositive_duration() {
        let config = PipelineConfig {
            part_duration_secs: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
