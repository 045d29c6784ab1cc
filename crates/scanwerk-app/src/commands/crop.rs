// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `scanwerk crop` — detect, rotate and straighten the document in a still.

use std::path::Path;

use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::{CapturedImage, Frame, PipelineConfig, Quadrilateral};
use scanwerk_document::{CaptureProcessor, ContourAnalyzer};
use tracing::{info, warn};

/// Crop `frame` to its detected document, or to the whole frame when
/// `full_frame` is set and nothing was found.
pub fn crop_frame(config: &PipelineConfig, frame: &Frame, full_frame: bool) -> Result<CapturedImage> {
    let analyzer = ContourAnalyzer::from_config(config);
    let processor = CaptureProcessor::from_config(config);

    let (outcome, captured) = processor.detect_and_process(&analyzer, frame)?;
    info!(classification = ?outcome.classification(), "Still analyzed");
    if let Some(captured) = captured {
        return Ok(captured);
    }
    if !full_frame {
        return Err(ScanwerkError::CaptureFailed(format!(
            "no document outline found ({:?})",
            outcome.classification()
        )));
    }

    warn!("No document outline; keeping the whole frame");
    processor
        .process_frame(frame, Some(&Quadrilateral::full_frame()))?
        .ok_or_else(|| ScanwerkError::CaptureFailed("full-frame crop produced no image".into()))
}

pub fn run(
    config: &PipelineConfig,
    image: &Path,
    output: &Path,
    rotation: i32,
    full_frame: bool,
) -> Result<()> {
    let frame = super::load_frame(image, rotation)?;
    let captured = crop_frame(config, &frame, full_frame)?;
    super::write_captured(&captured, output)?;
    println!("{}", output.display());
    Ok(())
}
