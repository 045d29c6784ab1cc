// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanwerk — Live capture session.
//
// Pulls preview frames from a `FrameSource`, analyzes them one at a time,
// turns the results into debounced guidance and fires auto-capture once
// enough consecutive frames qualify.

pub mod autocapture;
pub mod guidance;
pub mod session;

pub use autocapture::{AutoCaptureController, AutoCaptureState};
pub use guidance::GuidanceClassifier;
pub use session::{PipelineEvent, ScanSession, SessionStats};
