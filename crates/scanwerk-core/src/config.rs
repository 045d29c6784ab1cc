// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration.
//
// Settings are fixed when a session starts. Only `auto_capture_enabled` can be
// changed afterwards, through the running session.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanwerkError};
use crate::types::AspectRatio;

/// Fewest consecutive qualifying frames an auto-capture run may require.
pub const MIN_CONSECUTIVE_OK_FRAMES: u32 = 2;

/// Frames required at sensitivity 0.0.
pub const MAX_CONSECUTIVE_OK_FRAMES: u32 = 12;

/// Post-processing applied to the cropped document image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFilter {
    /// Keep the colour crop as is.
    #[default]
    None,
    /// Luma only.
    Grayscale,
    /// Adaptive (local mean) black-and-white.
    Binarized,
    /// Global Otsu black-and-white.
    Otsu,
    /// Contrast boost followed by adaptive binarization.
    Enhanced,
}

/// Construction-time settings for the detection, guidance and capture stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Accepted document proportions. Empty disables the aspect-ratio check.
    pub target_aspect_ratios: Vec<AspectRatio>,
    /// Relative tolerance when matching a target aspect ratio.
    pub aspect_ratio_tolerance: f64,
    /// Auto-capture sensitivity in 0..=1; lower values need more stable frames.
    pub sensitivity: f32,
    /// Explicit frame count, overriding the value derived from `sensitivity`.
    pub required_consecutive_ok_frames: Option<u32>,
    /// Let angle and aspect-ratio mismatches count as good frames.
    pub ignore_aspect_ratio_mismatch: bool,
    /// Minimum interval between two guidance updates.
    pub guidance_debounce_ms: u64,
    /// Minimum angle score (0..100) for a detection to count as good.
    pub accepted_angle_score: f32,
    /// Minimum size score (0..100) for a detection to count as good.
    pub accepted_size_score: f32,
    /// Largest accepted distance of the quad centroid from the frame centre.
    pub max_center_offset: f32,
    /// Mean luma below which a frame is too dark.
    pub min_brightness: f32,
    /// Edge-pixel fraction above which the background is too noisy.
    pub max_edge_density: f32,
    /// Frames are downscaled so their longest side fits this before analysis.
    pub analysis_max_dimension: u32,
    /// Per-frame analysis budget; slower analyses are logged.
    pub frame_budget_ms: u64,
    /// How long to wait for the frame source to deliver a capture.
    pub capture_timeout_ms: u64,
    /// Post-processing for captured documents.
    pub output_filter: OutputFilter,
    /// Whether auto-capture starts enabled. Guidance is shown only while it is.
    pub auto_capture_enabled: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_aspect_ratios: Vec::new(),
            aspect_ratio_tolerance: 0.15,
            sensitivity: 0.66,
            required_consecutive_ok_frames: None,
            ignore_aspect_ratio_mismatch: false,
            guidance_debounce_ms: 400,
            accepted_angle_score: 60.0,
            accepted_size_score: 50.0,
            max_center_offset: 0.15,
            min_brightness: 40.0,
            max_edge_density: 0.18,
            analysis_max_dimension: 480,
            frame_budget_ms: 100,
            capture_timeout_ms: 5_000,
            output_filter: OutputFilter::None,
            auto_capture_enabled: true,
        }
    }
}

impl PipelineConfig {
    /// Parse a JSON document. Missing keys take their default values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&data)
    }

    /// Write the config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Reject settings the pipeline cannot honour. Values are never clamped.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.sensitivity) {
            return Err(ScanwerkError::Misconfiguration(format!(
                "sensitivity must be within 0..=1, got {}",
                self.sensitivity
            )));
        }
        if let Some(frames) = self.required_consecutive_ok_frames {
            if frames < MIN_CONSECUTIVE_OK_FRAMES {
                return Err(ScanwerkError::Misconfiguration(format!(
                    "required_consecutive_ok_frames must be at least {MIN_CONSECUTIVE_OK_FRAMES}, got {frames}"
                )));
            }
        }
        if let Some(bad) = self.target_aspect_ratios.iter().find(|r| !r.is_valid()) {
            return Err(ScanwerkError::Misconfiguration(format!(
                "aspect ratio {}:{} must be positive and finite",
                bad.width, bad.height
            )));
        }
        if !(self.aspect_ratio_tolerance.is_finite() && self.aspect_ratio_tolerance >= 0.0) {
            return Err(ScanwerkError::Misconfiguration(
                "aspect_ratio_tolerance must be a non-negative number".into(),
            ));
        }
        for (name, score) in [
            ("accepted_angle_score", self.accepted_angle_score),
            ("accepted_size_score", self.accepted_size_score),
        ] {
            if !(0.0..=100.0).contains(&score) {
                return Err(ScanwerkError::Misconfiguration(format!(
                    "{name} must be within 0..=100, got {score}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.max_edge_density) {
            return Err(ScanwerkError::Misconfiguration(format!(
                "max_edge_density must be within 0..=1, got {}",
                self.max_edge_density
            )));
        }
        if !(self.max_center_offset.is_finite() && self.max_center_offset >= 0.0) {
            return Err(ScanwerkError::Misconfiguration(
                "max_center_offset must be a non-negative number".into(),
            ));
        }
        if !(0.0..=255.0).contains(&self.min_brightness) {
            return Err(ScanwerkError::Misconfiguration(format!(
                "min_brightness must be within 0..=255, got {}",
                self.min_brightness
            )));
        }
        if self.analysis_max_dimension == 0 {
            return Err(ScanwerkError::Misconfiguration(
                "analysis_max_dimension must be greater than zero".into(),
            ));
        }
        if self.frame_budget_ms == 0 || self.capture_timeout_ms == 0 {
            return Err(ScanwerkError::Misconfiguration(
                "frame_budget_ms and capture_timeout_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Consecutive good frames needed before auto-capture fires.
    ///
    /// Sensitivity 1.0 needs the minimum of two frames, 0.0 needs twelve.
    pub fn required_consecutive_ok_frames(&self) -> u32 {
        if let Some(frames) = self.required_consecutive_ok_frames {
            return frames;
        }
        let span = (MAX_CONSECUTIVE_OK_FRAMES - MIN_CONSECUTIVE_OK_FRAMES) as f32;
        let extra = ((1.0 - self.sensitivity.clamp(0.0, 1.0)) * span).round() as u32;
        MIN_CONSECUTIVE_OK_FRAMES + extra
    }

    pub fn guidance_debounce(&self) -> Duration {
        Duration::from_millis(self.guidance_debounce_ms)
    }

    pub fn frame_budget(&self) -> Duration {
        Duration::from_millis(self.frame_budget_ms)
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        config.validate().expect("default config must validate");
        assert_eq!(config.guidance_debounce(), Duration::from_millis(400));
        assert!(!config.ignore_aspect_ratio_mismatch);
    }

    #[test]
    fn sensitivity_maps_to_frame_count() {
        let mut config = PipelineConfig::default();
        assert_eq!(config.required_consecutive_ok_frames(), 5);

        config.sensitivity = 1.0;
        assert_eq!(config.required_consecutive_ok_frames(), 2);

        config.sensitivity = 0.0;
        assert_eq!(config.required_consecutive_ok_frames(), 12);

        config.sensitivity = 0.8;
        assert_eq!(config.required_consecutive_ok_frames(), 4);
    }

    #[test]
    fn lower_sensitivity_never_needs_fewer_frames() {
        let mut previous = 0;
        for step in (0..=10).rev() {
            let config = PipelineConfig {
                sensitivity: step as f32 / 10.0,
                ..Default::default()
            };
            let frames = config.required_consecutive_ok_frames();
            assert!(frames >= previous);
            previous = frames;
        }
    }

    #[test]
    fn explicit_frame_count_overrides_sensitivity() {
        let config = PipelineConfig {
            required_consecutive_ok_frames: Some(3),
            sensitivity: 0.0,
            ..Default::default()
        };
        assert_eq!(config.required_consecutive_ok_frames(), 3);
    }

    #[test]
    fn zero_required_frames_is_rejected() {
        let config = PipelineConfig {
            required_consecutive_ok_frames: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ScanwerkError::Misconfiguration(_))
        ));
    }

    #[test]
    fn single_required_frame_is_rejected() {
        let config = PipelineConfig {
            required_consecutive_ok_frames: Some(1),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_sensitivity_is_rejected() {
        for sensitivity in [-0.1, 1.5, f32::NAN] {
            let config = PipelineConfig {
                sensitivity,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "sensitivity {sensitivity}");
        }
    }

    #[test]
    fn degenerate_aspect_ratio_is_rejected() {
        let config = PipelineConfig {
            target_aspect_ratios: vec![AspectRatio::new(21.0, 0.0)],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config = PipelineConfig::from_json(
            r#"{ "sensitivity": 1.0, "target_aspect_ratios": [{ "width": 21.0, "height": 29.7 }],
                 "output_filter": "grayscale" }"#,
        )
        .expect("parse");
        assert_eq!(config.required_consecutive_ok_frames(), 2);
        assert_eq!(config.target_aspect_ratios, vec![AspectRatio::a4_portrait()]);
        assert_eq!(config.output_filter, OutputFilter::Grayscale);
        assert_eq!(config.guidance_debounce_ms, 400);
    }

    #[test]
    fn invalid_json_config_is_rejected() {
        let err = PipelineConfig::from_json(r#"{ "required_consecutive_ok_frames": 0 }"#);
        assert!(matches!(err, Err(ScanwerkError::Misconfiguration(_))));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pipeline.json");

        let config = PipelineConfig {
            ignore_aspect_ratio_mismatch: true,
            required_consecutive_ok_frames: Some(4),
            ..Default::default()
        };
        config.save(&path).expect("save");
        let loaded = PipelineConfig::load(&path).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = PipelineConfig::load("/definitely/not/here.json");
        assert!(matches!(err, Err(ScanwerkError::Io(_))));
    }
}
