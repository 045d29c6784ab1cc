// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Contour analyzer — classifies a single camera frame.
//
// ## Pipeline
//
// 1. Downscale to the analysis size, then convert to grayscale
// 2. Mean luma; below the floor the frame is `TooDark`
// 3. Gaussian blur (sigma 2.0) and Canny edge detection
// 4. Edge density; above the ceiling the frame is `TooNoisy`
// 5. Contour kernel locates four corners, or the frame is `NoDocument`
// 6. Size, angle, aspect-ratio and centring checks, in that order
//
// Analysis is a pure function of the frame and the settings.

use std::time::{Duration, Instant};

use image::GrayImage;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::{
    AspectRatio, Classification, DetectionMetrics, DetectionOutcome, Frame, Orientation,
    PipelineConfig, Quadrilateral,
};
use tracing::{debug, instrument, warn};

use crate::image::processor::ImageProcessor;
use crate::scan::kernel::{ContourKernel, HoughKernel};

const BLUR_SIGMA: f32 = 2.0;
const CANNY_LOW: f32 = 50.0;
const CANNY_HIGH: f32 = 150.0;

/// A quad covering this fraction of the frame earns a full size score.
const FULL_SIZE_AREA: f32 = 0.5;

/// Corner deviation from 90 degrees that drives the angle score to zero.
const MAX_CORNER_DEVIATION: f32 = 45.0;

/// Thresholds used by [`ContourAnalyzer`].
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionSettings {
    pub target_aspect_ratios: Vec<AspectRatio>,
    pub aspect_ratio_tolerance: f64,
    pub accepted_angle_score: f32,
    pub accepted_size_score: f32,
    pub max_center_offset: f32,
    pub min_brightness: f32,
    pub max_edge_density: f32,
    pub analysis_max_dimension: u32,
    pub frame_budget: Duration,
}

impl From<&PipelineConfig> for DetectionSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            target_aspect_ratios: config.target_aspect_ratios.clone(),
            aspect_ratio_tolerance: config.aspect_ratio_tolerance,
            accepted_angle_score: config.accepted_angle_score,
            accepted_size_score: config.accepted_size_score,
            max_center_offset: config.max_center_offset,
            min_brightness: config.min_brightness,
            max_edge_density: config.max_edge_density,
            analysis_max_dimension: config.analysis_max_dimension,
            frame_budget: config.frame_budget(),
        }
    }
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

/// Per-frame document boundary analyzer.
///
/// Safe to share between threads; analysis takes `&self` and keeps no state
/// between frames.
pub struct ContourAnalyzer {
    settings: DetectionSettings,
    kernel: Box<dyn ContourKernel>,
}

impl ContourAnalyzer {
    /// Analyzer with the default Hough kernel.
    pub fn new(settings: DetectionSettings) -> Self {
        Self::with_kernel(settings, Box::new(HoughKernel::default()))
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(DetectionSettings::from(config))
    }

    /// Analyzer with a custom contour kernel.
    pub fn with_kernel(settings: DetectionSettings, kernel: Box<dyn ContourKernel>) -> Self {
        Self { settings, kernel }
    }

    pub fn settings(&self) -> &DetectionSettings {
        &self.settings
    }

    pub fn kernel_name(&self) -> &'static str {
        self.kernel.name()
    }

    /// Analyze a frame, mapping any internal failure to an `AnalysisFailed`
    /// outcome. Never panics on malformed input.
    pub fn analyze(&self, frame: &Frame) -> DetectionOutcome {
        match self.try_analyze(frame) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(sequence = frame.sequence(), error = %err, "Frame analysis failed");
                DetectionOutcome::failed()
            }
        }
    }

    /// Analyze a frame, surfacing failures as errors.
    #[instrument(skip_all, fields(sequence = frame.sequence(), width = frame.width(), height = frame.height()))]
    pub fn try_analyze(&self, frame: &Frame) -> Result<DetectionOutcome> {
        if frame.is_empty() {
            return Err(ScanwerkError::InvalidFrame("frame has no pixels".into()));
        }
        let started = Instant::now();

        let gray = ImageProcessor::downscaled(frame.image(), self.settings.analysis_max_dimension)
            .grayscale()
            .into_dynamic()
            .into_luma8();

        let outcome = self.classify(&gray, frame.orientation());

        let elapsed = started.elapsed();
        if elapsed > self.settings.frame_budget {
            warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                budget_ms = self.settings.frame_budget.as_millis() as u64,
                "Frame analysis over budget"
            );
        }
        debug!(
            kernel = self.kernel.name(),
            classification = ?outcome.classification(),
            angle_score = outcome.metrics().angle_score,
            size_score = outcome.metrics().size_score,
            elapsed_us = elapsed.as_micros() as u64,
            "Frame analyzed"
        );
        Ok(outcome)
    }

    fn classify(&self, gray: &GrayImage, orientation: Orientation) -> DetectionOutcome {
        let s = &self.settings;
        let (w, h) = gray.dimensions();
        let pixel_count = (w as u64 * h as u64).max(1) as f32;

        let mut metrics = DetectionMetrics {
            brightness: gray.pixels().map(|p| p.0[0] as u64).sum::<u64>() as f32 / pixel_count,
            ..Default::default()
        };
        if metrics.brightness < s.min_brightness {
            return DetectionOutcome::new(Classification::TooDark, None).with_metrics(metrics);
        }

        let blurred = gaussian_blur_f32(gray, BLUR_SIGMA);
        let edges = canny(&blurred, CANNY_LOW, CANNY_HIGH);
        metrics.edge_density = edges.pixels().filter(|p| p.0[0] > 0).count() as f32 / pixel_count;
        if metrics.edge_density > s.max_edge_density {
            return DetectionOutcome::new(Classification::TooNoisy, None).with_metrics(metrics);
        }

        let Some(corners) = self.kernel.find_quad(&edges) else {
            return DetectionOutcome::no_document().with_metrics(metrics);
        };
        if corners.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return DetectionOutcome::no_document().with_metrics(metrics);
        }
        let quad = Quadrilateral::from_pixel_corners(corners, w, h);

        metrics.size_score = size_score(&quad);
        metrics.angle_score = angle_score(&quad, w, h);
        let centroid = quad.centroid();
        metrics.center_offset = (centroid.x - 0.5).hypot(centroid.y - 0.5);

        let classification = if metrics.size_score < s.accepted_size_score {
            Classification::OkButTooSmall
        } else if metrics.angle_score < s.accepted_angle_score {
            Classification::OkButBadAngles
        } else if !self.aspect_ratio_matches(&quad, w, h, orientation) {
            Classification::OkButBadAspectRatio
        } else if metrics.center_offset > s.max_center_offset {
            Classification::OkOffCenter
        } else {
            Classification::Ok
        };

        DetectionOutcome::new(classification, Some(quad)).with_metrics(metrics)
    }

    /// Compare against the targets as the user sees the document, so a
    /// sideways sensor frame has its ratio inverted first.
    fn aspect_ratio_matches(
        &self,
        quad: &Quadrilateral,
        width: u32,
        height: u32,
        orientation: Orientation,
    ) -> bool {
        let targets = &self.settings.target_aspect_ratios;
        if targets.is_empty() {
            return true;
        }
        let sensor = quad.aspect_ratio(width, height) as f64;
        if sensor <= 0.0 {
            return false;
        }
        let upright = if orientation.swaps_axes() { 1.0 / sensor } else { sensor };
        targets.iter().any(|target| {
            let expected = target.ratio();
            ((upright - expected) / expected).abs() <= self.settings.aspect_ratio_tolerance
        })
    }
}

impl Default for ContourAnalyzer {
    fn default() -> Self {
        Self::new(DetectionSettings::default())
    }
}

/// 0..100 from the covered fraction of the frame.
fn size_score(quad: &Quadrilateral) -> f32 {
    (quad.area() / FULL_SIZE_AREA * 100.0).min(100.0)
}

/// 0..100 from the worst corner's deviation from a right angle.
fn angle_score(quad: &Quadrilateral, width: u32, height: u32) -> f32 {
    let worst = quad
        .corner_angles(width, height)
        .iter()
        .map(|angle| (angle - 90.0).abs())
        .fold(0.0f32, f32::max);
    (100.0 - worst * 100.0 / MAX_CORNER_DEVIATION).clamp(0.0, 100.0)
}
