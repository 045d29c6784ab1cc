// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Scanwerk capture pipeline.
//
// Quadrilateral coordinates are normalized to 0..1 of the frame they were
// detected in, so a quad found on a downscaled preview can be applied to the
// full-resolution capture without re-running detection.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use image::{DynamicImage, GrayImage, ImageBuffer, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{Result, ScanwerkError};

/// Unique identifier for one capture cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaptureId(pub Uuid);

impl CaptureId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CaptureId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CaptureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// Sensor-reported orientation of a frame. Rotation is clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Orientation {
    /// Parse an orientation from integer degrees.
    ///
    /// Values are normalized modulo 360, so `-90` is `Deg270` and `450` is
    /// `Deg90`. Anything that is not a quarter turn is rejected.
    pub fn from_degrees(degrees: i32) -> Result<Self> {
        match degrees.rem_euclid(360) {
            0 => Ok(Self::Deg0),
            90 => Ok(Self::Deg90),
            180 => Ok(Self::Deg180),
            270 => Ok(Self::Deg270),
            _ => Err(ScanwerkError::UnsupportedOrientation(degrees)),
        }
    }

    /// Clockwise rotation in degrees.
    pub fn degrees(&self) -> u32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// Whether applying this rotation swaps width and height.
    pub fn swaps_axes(&self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

/// Pixel layout of a frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Luma8,
    Rgb8,
    Rgba8,
    /// Any other layout the `image` crate can decode (16-bit, float, ...).
    Other,
}

impl PixelFormat {
    /// Bytes per pixel for the raw 8-bit layouts.
    pub fn bytes_per_pixel(&self) -> Option<usize> {
        match self {
            Self::Luma8 => Some(1),
            Self::Rgb8 => Some(3),
            Self::Rgba8 => Some(4),
            Self::Other => None,
        }
    }
}

/// An immutable camera frame.
///
/// The pixel buffer is shared, so cloning a frame is cheap and never copies
/// image data.
#[derive(Debug, Clone)]
pub struct Frame {
    sequence: u64,
    image: Arc<DynamicImage>,
    orientation: Orientation,
}

impl Frame {
    /// Wrap a decoded image.
    pub fn new(image: DynamicImage, orientation: Orientation) -> Self {
        Self {
            sequence: 0,
            image: Arc::new(image),
            orientation,
        }
    }

    /// Build a frame from a raw 8-bit pixel buffer.
    ///
    /// Fails with `InvalidFrame` if `data` does not hold exactly
    /// `width * height * bytes_per_pixel` bytes.
    pub fn from_raw(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Vec<u8>,
        orientation: Orientation,
    ) -> Result<Self> {
        let bpp = format.bytes_per_pixel().ok_or_else(|| {
            ScanwerkError::InvalidFrame("raw frames must be Luma8, Rgb8 or Rgba8".into())
        })?;
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|px| px.checked_mul(bpp))
            .ok_or_else(|| ScanwerkError::InvalidFrame("frame dimensions overflow".into()))?;
        if data.len() != expected {
            return Err(ScanwerkError::InvalidFrame(format!(
                "{width}x{height} {format:?} needs {expected} bytes, got {}",
                data.len()
            )));
        }

        let image = match format {
            PixelFormat::Luma8 => ImageBuffer::from_raw(width, height, data)
                .map(|buf: GrayImage| DynamicImage::ImageLuma8(buf)),
            PixelFormat::Rgb8 => ImageBuffer::from_raw(width, height, data)
                .map(|buf: RgbImage| DynamicImage::ImageRgb8(buf)),
            PixelFormat::Rgba8 => ImageBuffer::from_raw(width, height, data)
                .map(|buf: RgbaImage| DynamicImage::ImageRgba8(buf)),
            PixelFormat::Other => None,
        }
        .ok_or_else(|| ScanwerkError::InvalidFrame("pixel buffer rejected".into()))?;

        Ok(Self::new(image, orientation))
    }

    /// Attach a sequence number (assigned by the frame source).
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn pixel_format(&self) -> PixelFormat {
        match &*self.image {
            DynamicImage::ImageLuma8(_) => PixelFormat::Luma8,
            DynamicImage::ImageRgb8(_) => PixelFormat::Rgb8,
            DynamicImage::ImageRgba8(_) => PixelFormat::Rgba8,
            _ => PixelFormat::Other,
        }
    }

    /// Borrow the pixel buffer.
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// A frame with no pixels cannot be analyzed or captured.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A point in normalized frame coordinates (0..1 on both axes).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Four corners of a detected document boundary.
///
/// Points are always stored clockwise starting at the top-left corner,
/// regardless of the order they were supplied in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quadrilateral {
    points: [Point; 4],
}

impl Quadrilateral {
    /// Build a quadrilateral, reordering the points clockwise from top-left.
    pub fn new(points: [Point; 4]) -> Self {
        Self {
            points: order_clockwise(points),
        }
    }

    /// The quad covering the whole frame.
    pub fn full_frame() -> Self {
        Self {
            points: [
                Point::new(0.0, 0.0),
                Point::new(1.0, 0.0),
                Point::new(1.0, 1.0),
                Point::new(0.0, 1.0),
            ],
        }
    }

    /// Normalize pixel-space corners detected on a `width` x `height` image.
    pub fn from_pixel_corners(corners: [(f32, f32); 4], width: u32, height: u32) -> Self {
        let w = width.max(1) as f32;
        let h = height.max(1) as f32;
        Self::new(corners.map(|(x, y)| Point::new(x / w, y / h)))
    }

    /// Scale the normalized corners to a `width` x `height` image.
    pub fn to_pixel_corners(&self, width: u32, height: u32) -> [(f32, f32); 4] {
        let w = width as f32;
        let h = height as f32;
        self.points.map(|p| (p.x * w, p.y * h))
    }

    /// Corners in clockwise order: top-left, top-right, bottom-right, bottom-left.
    pub fn points(&self) -> &[Point; 4] {
        &self.points
    }

    /// Remap the quad into the coordinate space of a frame rotated clockwise
    /// by `orientation`.
    pub fn rotated(&self, orientation: Orientation) -> Self {
        let remap = |p: Point| match orientation {
            Orientation::Deg0 => p,
            Orientation::Deg90 => Point::new(1.0 - p.y, p.x),
            Orientation::Deg180 => Point::new(1.0 - p.x, 1.0 - p.y),
            Orientation::Deg270 => Point::new(p.y, 1.0 - p.x),
        };
        Self::new(self.points.map(remap))
    }

    /// Fraction of the frame covered by the quad (shoelace formula).
    pub fn area(&self) -> f32 {
        let mut twice_area = 0.0f32;
        for i in 0..4 {
            let a = self.points[i];
            let b = self.points[(i + 1) % 4];
            twice_area += a.x * b.y - b.x * a.y;
        }
        twice_area.abs() / 2.0
    }

    /// Vertex average.
    pub fn centroid(&self) -> Point {
        let sx: f32 = self.points.iter().map(|p| p.x).sum();
        let sy: f32 = self.points.iter().map(|p| p.y).sum();
        Point::new(sx / 4.0, sy / 4.0)
    }

    /// Interior corner angles in degrees, measured on a `width` x `height`
    /// image (normalization is anisotropic, so angles need real proportions).
    pub fn corner_angles(&self, width: u32, height: u32) -> [f32; 4] {
        let px = self.to_pixel_corners(width, height);
        let mut angles = [0.0f32; 4];
        for (i, angle) in angles.iter_mut().enumerate() {
            let prev = px[(i + 3) % 4];
            let cur = px[i];
            let next = px[(i + 1) % 4];
            let v1 = (prev.0 - cur.0, prev.1 - cur.1);
            let v2 = (next.0 - cur.0, next.1 - cur.1);
            let norm = (v1.0.hypot(v1.1)) * (v2.0.hypot(v2.1));
            *angle = if norm <= f32::EPSILON {
                0.0
            } else {
                ((v1.0 * v2.0 + v1.1 * v2.1) / norm)
                    .clamp(-1.0, 1.0)
                    .acos()
                    .to_degrees()
            };
        }
        angles
    }

    /// Width-to-height ratio from mean edge lengths on a `width` x `height`
    /// image.
    pub fn aspect_ratio(&self, width: u32, height: u32) -> f32 {
        let [tl, tr, br, bl] = self.to_pixel_corners(width, height);
        let len = |a: (f32, f32), b: (f32, f32)| (b.0 - a.0).hypot(b.1 - a.1);
        let horizontal = (len(tl, tr) + len(bl, br)) / 2.0;
        let vertical = (len(tl, bl) + len(tr, br)) / 2.0;
        if vertical <= f32::EPSILON {
            return 0.0;
        }
        horizontal / vertical
    }
}

/// Sort four points clockwise (in image coordinates, y pointing down) and
/// rotate the result so the top-left point comes first.
fn order_clockwise(points: [Point; 4]) -> [Point; 4] {
    let cx = points.iter().map(|p| p.x).sum::<f32>() / 4.0;
    let cy = points.iter().map(|p| p.y).sum::<f32>() / 4.0;

    let mut sorted = points;
    sorted.sort_by(|a, b| {
        let angle_a = (a.y - cy).atan2(a.x - cx);
        let angle_b = (b.y - cy).atan2(b.x - cx);
        angle_a.total_cmp(&angle_b)
    });

    let start = sorted
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (a.x + a.y).total_cmp(&(b.x + b.y)))
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    sorted.rotate_left(start);
    sorted
}

/// A target document aspect ratio expressed as width:height (e.g. 21:29.7).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AspectRatio {
    pub width: f64,
    pub height: f64,
}

impl AspectRatio {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// ISO A-series portrait page.
    pub fn a4_portrait() -> Self {
        Self::new(21.0, 29.7)
    }

    pub fn ratio(&self) -> f64 {
        self.width / self.height
    }

    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// Verdict of a single frame analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    /// A document was found and is good to capture.
    Ok,
    /// Document found but covers too little of the frame.
    OkButTooSmall,
    /// Document found but viewed at a steep angle.
    OkButBadAngles,
    /// Document found but its proportions match none of the target ratios.
    OkButBadAspectRatio,
    /// Document found but far from the frame centre.
    OkOffCenter,
    /// Nothing document-shaped in the frame.
    NoDocument,
    /// Too much background texture to isolate a document.
    TooNoisy,
    /// Scene too dark to analyze.
    TooDark,
    /// The frame could not be analyzed at all.
    AnalysisFailed,
}

impl Classification {
    /// Whether this verdict carries a detected boundary.
    pub fn has_document(&self) -> bool {
        matches!(
            self,
            Self::Ok
                | Self::OkButTooSmall
                | Self::OkButBadAngles
                | Self::OkButBadAspectRatio
                | Self::OkOffCenter
        )
    }
}

/// Raw scores behind a classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionMetrics {
    /// 0..100, 100 = all corners are right angles.
    pub angle_score: f32,
    /// 0..100, 100 = the document fills at least half the frame.
    pub size_score: f32,
    /// Mean luma, 0..255.
    pub brightness: f32,
    /// Fraction of edge pixels after Canny, 0..1.
    pub edge_density: f32,
    /// Distance of the quad centroid from the frame centre (normalized).
    pub center_offset: f32,
}

/// Result of analyzing one frame.
///
/// The constructor drops the quadrilateral for verdicts that cannot have one,
/// so `NoDocument` and `AnalysisFailed` outcomes never carry a quad.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionOutcome {
    quadrilateral: Option<Quadrilateral>,
    classification: Classification,
    metrics: DetectionMetrics,
}

impl DetectionOutcome {
    pub fn new(classification: Classification, quadrilateral: Option<Quadrilateral>) -> Self {
        let quadrilateral = match classification {
            Classification::NoDocument | Classification::AnalysisFailed => None,
            _ => quadrilateral,
        };
        Self {
            quadrilateral,
            classification,
            metrics: DetectionMetrics::default(),
        }
    }

    pub fn no_document() -> Self {
        Self::new(Classification::NoDocument, None)
    }

    pub fn failed() -> Self {
        Self::new(Classification::AnalysisFailed, None)
    }

    pub fn with_metrics(mut self, metrics: DetectionMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn quadrilateral(&self) -> Option<&Quadrilateral> {
        self.quadrilateral.as_ref()
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }

    pub fn metrics(&self) -> &DetectionMetrics {
        &self.metrics
    }
}

// ---------------------------------------------------------------------------
// Guidance and capture
// ---------------------------------------------------------------------------

/// The guidance currently surfaced to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct GuidanceState {
    pub classification: Classification,
    /// `None` hides the guidance hint.
    pub message: Option<&'static str>,
    pub emitted_at: Instant,
}

impl GuidanceState {
    pub fn is_visible(&self) -> bool {
        self.message.is_some()
    }
}

/// Emitted once per accumulation run when auto-capture fires.
///
/// The quad is a copy taken at trigger time; later analysis never changes it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureTrigger {
    pub capture_id: CaptureId,
    pub quadrilateral: Quadrilateral,
    /// Sequence number of the frame that completed the run.
    pub frame_sequence: u64,
}

/// The final artifact of a capture: a rotated, perspective-corrected crop.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    capture_id: CaptureId,
    image: DynamicImage,
    quadrilateral: Quadrilateral,
    orientation: Orientation,
    captured_at: DateTime<Utc>,
}

impl CapturedImage {
    pub fn new(
        capture_id: CaptureId,
        image: DynamicImage,
        quadrilateral: Quadrilateral,
        orientation: Orientation,
    ) -> Self {
        Self {
            capture_id,
            image,
            quadrilateral,
            orientation,
            captured_at: Utc::now(),
        }
    }

    pub fn capture_id(&self) -> CaptureId {
        self.capture_id
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_image(self) -> DynamicImage {
        self.image
    }

    /// The quad (in pre-rotation coordinates) the crop was taken from.
    pub fn quadrilateral(&self) -> &Quadrilateral {
        &self.quadrilateral
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// SHA-256 over the dimensions and raw pixel bytes, hex encoded.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.image.width().to_le_bytes());
        hasher.update(self.image.height().to_le_bytes());
        hasher.update(self.image.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Encode the image as PNG.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        self.image
            .write_to(&mut cursor, image::ImageFormat::Png)
            .map_err(|err| ScanwerkError::ImageError(format!("PNG encoding failed: {err}")))?;
        Ok(buffer)
    }

    /// Encode the image as JPEG with the given quality (1-100).
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
        self.image
            .to_rgb8()
            .write_with_encoder(encoder)
            .map_err(|err| ScanwerkError::ImageError(format!("JPEG encoding failed: {err}")))?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn orientation_normalizes_degrees() {
        assert_eq!(Orientation::from_degrees(0).unwrap(), Orientation::Deg0);
        assert_eq!(Orientation::from_degrees(450).unwrap(), Orientation::Deg90);
        assert_eq!(Orientation::from_degrees(-90).unwrap(), Orientation::Deg270);
        assert!(matches!(
            Orientation::from_degrees(45),
            Err(ScanwerkError::UnsupportedOrientation(45))
        ));
    }

    #[test]
    fn raw_frame_rejects_short_buffer() {
        let result = Frame::from_raw(4, 4, PixelFormat::Rgb8, vec![0u8; 10], Orientation::Deg0);
        assert!(matches!(result, Err(ScanwerkError::InvalidFrame(_))));
    }

    #[test]
    fn raw_frame_accepts_exact_buffer() {
        let frame = Frame::from_raw(4, 2, PixelFormat::Rgba8, vec![7u8; 32], Orientation::Deg90)
            .expect("valid frame");
        assert_eq!(frame.width(), 4);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.pixel_format(), PixelFormat::Rgba8);
        assert_eq!(frame.orientation(), Orientation::Deg90);
    }

    #[test]
    fn quadrilateral_orders_points_clockwise_from_top_left() {
        let quad = Quadrilateral::new([
            Point::new(0.8, 0.9),
            Point::new(0.1, 0.1),
            Point::new(0.2, 0.8),
            Point::new(0.9, 0.2),
        ]);
        let [tl, tr, br, bl] = *quad.points();
        assert_eq!(tl, Point::new(0.1, 0.1));
        assert_eq!(tr, Point::new(0.9, 0.2));
        assert_eq!(br, Point::new(0.8, 0.9));
        assert_eq!(bl, Point::new(0.2, 0.8));
    }

    #[test]
    fn full_frame_area_is_one() {
        assert!(approx(Quadrilateral::full_frame().area(), 1.0));
        let c = Quadrilateral::full_frame().centroid();
        assert!(approx(c.x, 0.5) && approx(c.y, 0.5));
    }

    #[test]
    fn rotation_by_90_moves_top_left_to_top_right() {
        // A small box hugging the top-left corner ends up hugging the
        // top-right corner after a clockwise quarter turn.
        let quad = Quadrilateral::new([
            Point::new(0.0, 0.0),
            Point::new(0.25, 0.0),
            Point::new(0.25, 0.5),
            Point::new(0.0, 0.5),
        ]);
        let rotated = quad.rotated(Orientation::Deg90);
        let [tl, tr, br, bl] = *rotated.points();
        assert_eq!(tl, Point::new(0.5, 0.0));
        assert_eq!(tr, Point::new(1.0, 0.0));
        assert_eq!(br, Point::new(1.0, 0.25));
        assert_eq!(bl, Point::new(0.5, 0.25));
    }

    #[test]
    fn four_quarter_turns_are_identity() {
        let quad = Quadrilateral::new([
            Point::new(0.1, 0.2),
            Point::new(0.7, 0.15),
            Point::new(0.8, 0.9),
            Point::new(0.2, 0.85),
        ]);
        let back = quad
            .rotated(Orientation::Deg90)
            .rotated(Orientation::Deg90)
            .rotated(Orientation::Deg180);
        for (a, b) in quad.points().iter().zip(back.points()) {
            assert!(approx(a.x, b.x) && approx(a.y, b.y));
        }
    }

    #[test]
    fn rectangle_has_right_angles_and_pixel_aspect() {
        let quad = Quadrilateral::full_frame();
        for angle in quad.corner_angles(300, 200) {
            assert!((angle - 90.0).abs() < 0.01, "angle {angle}");
        }
        assert!(approx(quad.aspect_ratio(300, 200), 1.5));
    }

    #[test]
    fn no_document_outcome_never_carries_a_quad() {
        let outcome =
            DetectionOutcome::new(Classification::NoDocument, Some(Quadrilateral::full_frame()));
        assert!(outcome.quadrilateral().is_none());
        let failed =
            DetectionOutcome::new(Classification::AnalysisFailed, Some(Quadrilateral::full_frame()));
        assert!(failed.quadrilateral().is_none());
        let ok = DetectionOutcome::new(Classification::Ok, Some(Quadrilateral::full_frame()));
        assert!(ok.quadrilateral().is_some());
    }

    #[test]
    fn digest_depends_on_pixels() {
        let a = CapturedImage::new(
            CaptureId::new(),
            DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, image::Luma([10u8]))),
            Quadrilateral::full_frame(),
            Orientation::Deg0,
        );
        let b = CapturedImage::new(
            CaptureId::new(),
            DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, image::Luma([11u8]))),
            Quadrilateral::full_frame(),
            Orientation::Deg0,
        );
        assert_eq!(a.digest().len(), 64);
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn captured_image_encodes_png_and_jpeg() {
        let captured = CapturedImage::new(
            CaptureId::new(),
            DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, image::Luma([128u8]))),
            Quadrilateral::full_frame(),
            Orientation::Deg0,
        );
        let png = captured.to_png_bytes().expect("png");
        assert_eq!(&png[1..4], b"PNG");
        let jpeg = captured.to_jpeg_bytes(85).expect("jpeg");
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }
}
