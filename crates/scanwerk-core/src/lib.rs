// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanwerk — Core types, configuration and error definitions shared across all
// crates of the capture pipeline.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod types;

pub use config::{OutputFilter, PipelineConfig};
pub use error::ScanwerkError;
pub use types::*;
