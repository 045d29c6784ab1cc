// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning pipeline — live frame analysis, contour kernel, perspective crop
// and output filters.

pub mod crop;
pub mod detect;
pub mod enhance;
pub mod kernel;

pub use crop::CaptureProcessor;
pub use detect::ContourAnalyzer;
pub use enhance::ScanEnhancer;
pub use kernel::{ContourKernel, HoughKernel};
