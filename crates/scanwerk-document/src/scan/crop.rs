// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture processor — turns a raw capture plus a normalized quadrilateral
// into an upright, perspective-corrected document image.
//
// ## Pipeline
//
// 1. Rotate the raw image clockwise by the capture orientation
// 2. Remap the quad into the rotated coordinate space
// 3. Crop: axis-aligned quads are cut out exactly; anything else goes
//    through a projective warp with bilinear sampling
// 4. Apply the configured output filter

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::{
    CaptureId, CapturedImage, DetectionOutcome, Frame, Orientation, OutputFilter, PipelineConfig,
    Quadrilateral,
};
use tracing::{debug, info, instrument};

use crate::image::processor::ImageProcessor;
use crate::scan::detect::ContourAnalyzer;
use crate::scan::enhance::ScanEnhancer;

/// Corners within this many pixels of a shared row or column count as
/// axis-aligned.
const AXIS_ALIGNED_TOLERANCE: f32 = 0.5;

/// Stateless post-processor for captured frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureProcessor {
    filter: OutputFilter,
}

impl CaptureProcessor {
    pub fn new(filter: OutputFilter) -> Self {
        Self { filter }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.output_filter)
    }

    pub fn filter(&self) -> OutputFilter {
        self.filter
    }

    /// Rotate and crop `raw` to the document outlined by `quad`.
    ///
    /// `quad` is in the raw image's (pre-rotation) normalized coordinates.
    /// Returns `Ok(None)` when there is no quad.
    pub fn process(
        &self,
        raw: &Frame,
        orientation_degrees: i32,
        quad: Option<&Quadrilateral>,
    ) -> Result<Option<CapturedImage>> {
        let orientation = Orientation::from_degrees(orientation_degrees)?;
        self.process_with_id(CaptureId::new(), raw, orientation, quad)
    }

    /// As [`process`](Self::process), using the frame's own orientation.
    pub fn process_frame(
        &self,
        raw: &Frame,
        quad: Option<&Quadrilateral>,
    ) -> Result<Option<CapturedImage>> {
        self.process_with_id(CaptureId::new(), raw, raw.orientation(), quad)
    }

    /// Process under an existing capture id (the one carried by the trigger).
    #[instrument(skip_all, fields(capture_id = %capture_id, degrees = orientation.degrees()))]
    pub fn process_with_id(
        &self,
        capture_id: CaptureId,
        raw: &Frame,
        orientation: Orientation,
        quad: Option<&Quadrilateral>,
    ) -> Result<Option<CapturedImage>> {
        let Some(quad) = quad else {
            debug!("No quadrilateral; nothing to crop");
            return Ok(None);
        };
        if raw.is_empty() {
            return Err(ScanwerkError::InvalidFrame("capture has no pixels".into()));
        }

        let upright = ImageProcessor::from_dynamic(raw.image().clone())
            .rotate(orientation)
            .into_dynamic();
        let corners = quad
            .rotated(orientation)
            .to_pixel_corners(upright.width(), upright.height());

        let cropped = perspective_crop(&upright, corners)?;
        let filtered = ScanEnhancer::from_dynamic(cropped).apply(self.filter).into_dynamic();

        info!(
            width = filtered.width(),
            height = filtered.height(),
            filter = ?self.filter,
            "Document cropped"
        );
        Ok(Some(CapturedImage::new(capture_id, filtered, *quad, orientation)))
    }

    /// Analyze a still image and crop whatever document it contains.
    pub fn detect_and_process(
        &self,
        analyzer: &ContourAnalyzer,
        frame: &Frame,
    ) -> Result<(DetectionOutcome, Option<CapturedImage>)> {
        let outcome = analyzer.try_analyze(frame)?;
        let captured = self.process_frame(frame, outcome.quadrilateral())?;
        Ok((outcome, captured))
    }
}

/// Cut the region bounded by `corners` (clockwise from top-left, pixel space)
/// out of `image` and map it onto an upright rectangle.
///
/// The output is as wide as the longer of the top and bottom edges and as tall
/// as the longer of the left and right edges.
pub fn perspective_crop(image: &DynamicImage, corners: [(f32, f32); 4]) -> Result<DynamicImage> {
    if corners.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
        return Err(ScanwerkError::ImageError("quadrilateral has non-finite corners".into()));
    }

    if let Some((x, y, w, h)) = axis_aligned_rect(&corners, image.width(), image.height()) {
        debug!(x, y, w, h, "Axis-aligned crop");
        return Ok(ImageProcessor::from_dynamic(image.clone())
            .crop(x, y, w, h)
            .into_dynamic());
    }

    let [tl, tr, br, bl] = corners;
    let len = |a: (f32, f32), b: (f32, f32)| (b.0 - a.0).hypot(b.1 - a.1);
    let out_w = len(tl, tr).max(len(bl, br)).round().max(1.0) as u32;
    let out_h = len(tl, bl).max(len(tr, br)).round().max(1.0) as u32;

    let dest = [
        (0.0, 0.0),
        (out_w as f32, 0.0),
        (out_w as f32, out_h as f32),
        (0.0, out_h as f32),
    ];
    let projection = Projection::from_control_points(corners, dest).ok_or_else(|| {
        ScanwerkError::ImageError("degenerate quadrilateral; no projective mapping".into())
    })?;

    debug!(out_w, out_h, "Projective warp");
    let warped = match image {
        DynamicImage::ImageLuma8(gray) => {
            let mut output = GrayImage::new(out_w, out_h);
            warp_into(gray, &projection, Interpolation::Bilinear, Luma([255u8]), &mut output);
            DynamicImage::ImageLuma8(output)
        }
        DynamicImage::ImageRgb8(rgb) => {
            let mut output = RgbImage::new(out_w, out_h);
            warp_into(rgb, &projection, Interpolation::Bilinear, Rgb([255u8; 3]), &mut output);
            DynamicImage::ImageRgb8(output)
        }
        other => {
            let rgba = other.to_rgba8();
            let mut output = RgbaImage::new(out_w, out_h);
            warp_into(&rgba, &projection, Interpolation::Bilinear, Rgba([255u8; 4]), &mut output);
            DynamicImage::ImageRgba8(output)
        }
    };
    Ok(warped)
}

/// Integer crop rectangle for quads whose edges follow pixel rows and columns.
fn axis_aligned_rect(
    corners: &[(f32, f32); 4],
    width: u32,
    height: u32,
) -> Option<(u32, u32, u32, u32)> {
    let [tl, tr, br, bl] = *corners;
    let aligned = (tl.1 - tr.1).abs() <= AXIS_ALIGNED_TOLERANCE
        && (bl.1 - br.1).abs() <= AXIS_ALIGNED_TOLERANCE
        && (tl.0 - bl.0).abs() <= AXIS_ALIGNED_TOLERANCE
        && (tr.0 - br.0).abs() <= AXIS_ALIGNED_TOLERANCE;
    if !aligned {
        return None;
    }

    let clamp_x = |v: f32| v.round().clamp(0.0, width as f32) as u32;
    let clamp_y = |v: f32| v.round().clamp(0.0, height as f32) as u32;
    let (x0, x1) = (clamp_x(tl.0), clamp_x(tr.0));
    let (y0, y1) = (clamp_y(tl.1), clamp_y(bl.1));
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some((x0, y0, x1 - x0, y1 - y0))
}
