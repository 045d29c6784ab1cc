// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanwerk-document — Per-frame document analysis and capture post-processing.
//
// Provides image processing (downscale, quarter-turn rotation, crop, encode),
// the contour analyzer that classifies live frames, the Hough-transform
// contour kernel, and the capture processor that turns a raw capture plus a
// normalized quadrilateral into a perspective-corrected document image.

pub mod image;
pub mod scan;

// Re-export the primary structs so callers can use `scanwerk_document::ContourAnalyzer` etc.
pub use image::processor::ImageProcessor;
pub use scan::crop::CaptureProcessor;
pub use scan::detect::{ContourAnalyzer, DetectionSettings};
pub use scan::enhance::ScanEnhancer;
pub use scan::kernel::{ContourKernel, HoughKernel};
