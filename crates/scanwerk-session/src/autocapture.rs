// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Auto-capture state machine.
//
//   Idle --qualifying--> Accumulating(1)
//   Accumulating(n) --qualifying--> Accumulating(n+1), or Triggered at n+1 >= required
//   Accumulating(n) --anything else--> Idle
//   Triggered --consume/reset--> Idle
//
// Outcomes observed while Triggered are ignored. A run triggers at most once.

use scanwerk_core::config::MIN_CONSECUTIVE_OK_FRAMES;
use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::{
    CaptureId, CaptureTrigger, Classification, DetectionOutcome, PipelineConfig, Quadrilateral,
};
use tracing::{debug, info};

/// Current controller state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AutoCaptureState {
    Idle,
    Accumulating {
        count: u32,
        /// Most recent quad of the run.
        quad: Quadrilateral,
        /// Whether `quad` came from a genuine `Ok` outcome.
        from_ok: bool,
    },
    Triggered(CaptureTrigger),
}

/// Decides when a run of good frames is long enough to capture.
#[derive(Debug, Clone)]
pub struct AutoCaptureController {
    required: u32,
    ignore_aspect_ratio_mismatch: bool,
    enabled: bool,
    state: AutoCaptureState,
}

impl AutoCaptureController {
    /// Rejects `required` below two: a single frame is never enough.
    pub fn new(required: u32, ignore_aspect_ratio_mismatch: bool) -> Result<Self> {
        if required < MIN_CONSECUTIVE_OK_FRAMES {
            return Err(ScanwerkError::Misconfiguration(format!(
                "auto-capture needs at least {MIN_CONSECUTIVE_OK_FRAMES} consecutive frames, got {required}"
            )));
        }
        Ok(Self {
            required,
            ignore_aspect_ratio_mismatch,
            enabled: true,
            state: AutoCaptureState::Idle,
        })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        let mut controller = Self::new(
            config.required_consecutive_ok_frames(),
            config.ignore_aspect_ratio_mismatch,
        )?;
        controller.enabled = config.auto_capture_enabled;
        Ok(controller)
    }

    pub fn required(&self) -> u32 {
        self.required
    }

    pub fn state(&self) -> AutoCaptureState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Turn auto-capture on or off. Turning it off drops any run in progress.
    pub fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.reset();
        }
        self.enabled = enabled;
    }

    /// Whether `classification` advances the counter.
    fn qualifies(&self, classification: Classification) -> bool {
        match classification {
            Classification::Ok => true,
            Classification::OkButBadAngles | Classification::OkButBadAspectRatio => {
                self.ignore_aspect_ratio_mismatch
            }
            _ => false,
        }
    }

    /// Feed one outcome. Returns the trigger when this outcome completes a run.
    pub fn observe(&mut self, outcome: &DetectionOutcome, sequence: u64) -> Option<CaptureTrigger> {
        if !self.enabled || matches!(self.state, AutoCaptureState::Triggered(_)) {
            return None;
        }

        let classification = outcome.classification();
        let quad = match outcome.quadrilateral() {
            Some(quad) if self.qualifies(classification) => *quad,
            _ => {
                if let AutoCaptureState::Accumulating { count, .. } = self.state {
                    debug!(count, ?classification, "Auto-capture run broken");
                }
                self.state = AutoCaptureState::Idle;
                return None;
            }
        };
        let is_ok = classification == Classification::Ok;

        let (count, quad, from_ok) = match self.state {
            AutoCaptureState::Accumulating {
                count,
                quad: kept,
                from_ok,
            } => {
                // A fallback outcome never displaces a quad from a genuine Ok.
                if from_ok && !is_ok {
                    (count + 1, kept, true)
                } else {
                    (count + 1, quad, is_ok)
                }
            }
            _ => (1, quad, is_ok),
        };

        if count >= self.required {
            let trigger = CaptureTrigger {
                capture_id: CaptureId::new(),
                quadrilateral: quad,
                frame_sequence: sequence,
            };
            info!(
                capture_id = %trigger.capture_id,
                frames = count,
                sequence,
                "Auto-capture triggered"
            );
            self.state = AutoCaptureState::Triggered(trigger);
            return Some(trigger);
        }

        self.state = AutoCaptureState::Accumulating {
            count,
            quad,
            from_ok,
        };
        None
    }

    /// Take the pending trigger, returning the controller to `Idle`.
    pub fn consume(&mut self) -> Option<CaptureTrigger> {
        match self.state {
            AutoCaptureState::Triggered(trigger) => {
                self.state = AutoCaptureState::Idle;
                Some(trigger)
            }
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.state = AutoCaptureState::Idle;
    }
}
