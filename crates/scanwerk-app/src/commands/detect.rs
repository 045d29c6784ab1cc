// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `scanwerk detect` — one-shot analysis of a still image.

use std::path::Path;

use scanwerk_core::error::Result;
use scanwerk_core::{DetectionOutcome, Frame, PipelineConfig};
use scanwerk_document::ContourAnalyzer;
use scanwerk_session::GuidanceClassifier;
use serde::Serialize;

/// What `detect` prints.
#[derive(Debug, Serialize)]
pub struct DetectReport {
    pub width: u32,
    pub height: u32,
    pub rotation: u32,
    pub guidance: Option<&'static str>,
    #[serde(flatten)]
    pub outcome: DetectionOutcome,
}

pub fn analyze(config: &PipelineConfig, frame: &Frame) -> Result<DetectReport> {
    let analyzer = ContourAnalyzer::from_config(config);
    let guidance = GuidanceClassifier::from_config(config);
    let outcome = analyzer.try_analyze(frame)?;
    Ok(DetectReport {
        width: frame.width(),
        height: frame.height(),
        rotation: frame.orientation().degrees(),
        guidance: guidance.message_for(outcome.classification()),
        outcome,
    })
}

pub fn run(config: &PipelineConfig, image: &Path, rotation: i32) -> Result<()> {
    let frame = super::load_frame(image, rotation)?;
    let report = analyze(config, &frame)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
