// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Guidance — turns detection outcomes into debounced user-facing hints.
//
// The per-frame classification flickers; the hint shown to the user changes at
// most once per debounce interval.

use std::time::{Duration, Instant};

use scanwerk_core::{Classification, DetectionOutcome, GuidanceState, PipelineConfig};
use tracing::trace;

pub const HOLD_STEADY: &str = "Hold steady";
pub const WRONG_ASPECT_RATIO: &str = "Wrong aspect ratio, rotate your device";

/// Fixed classification → hint table. Classifications missing here hide the
/// hint.
pub const GUIDANCE_TABLE: &[(Classification, &str)] = &[
    (Classification::Ok, HOLD_STEADY),
    (Classification::OkButTooSmall, "Move closer"),
    (Classification::OkButBadAngles, "Fix perspective"),
    (Classification::OkButBadAspectRatio, WRONG_ASPECT_RATIO),
    (Classification::OkOffCenter, "Center the document"),
    (Classification::NoDocument, "No document"),
    (Classification::TooNoisy, "Background too noisy"),
    (Classification::TooDark, "Low light"),
];

/// Debounced mapping from [`DetectionOutcome`] to [`GuidanceState`].
#[derive(Debug, Clone)]
pub struct GuidanceClassifier {
    debounce: Duration,
    ignore_aspect_ratio_mismatch: bool,
    last_emitted: Option<GuidanceState>,
}

impl GuidanceClassifier {
    pub fn new(debounce: Duration, ignore_aspect_ratio_mismatch: bool) -> Self {
        Self {
            debounce,
            ignore_aspect_ratio_mismatch,
            last_emitted: None,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.guidance_debounce(), config.ignore_aspect_ratio_mismatch)
    }

    /// Map `outcome` to a new guidance state, or `None` when the previous
    /// state was emitted less than one debounce interval before `now`.
    /// The first call always emits.
    pub fn classify(&mut self, outcome: &DetectionOutcome, now: Instant) -> Option<GuidanceState> {
        if let Some(last) = &self.last_emitted {
            let since = now.saturating_duration_since(last.emitted_at);
            if since < self.debounce {
                trace!(since_ms = since.as_millis() as u64, "Guidance debounced");
                return None;
            }
        }

        let classification = outcome.classification();
        let state = GuidanceState {
            classification,
            message: self.message_for(classification),
            emitted_at: now,
        };
        self.last_emitted = Some(state.clone());
        Some(state)
    }

    /// The hint for a classification, honouring the aspect-ratio flag.
    pub fn message_for(&self, classification: Classification) -> Option<&'static str> {
        if classification == Classification::OkButBadAspectRatio && self.ignore_aspect_ratio_mismatch
        {
            return Some(HOLD_STEADY);
        }
        GUIDANCE_TABLE
            .iter()
            .find(|(c, _)| *c == classification)
            .map(|(_, message)| *message)
    }

    pub fn last_emitted(&self) -> Option<&GuidanceState> {
        self.last_emitted.as_ref()
    }

    /// Forget the last emission; the next call emits immediately.
    pub fn reset(&mut self) {
        self.last_emitted = None;
    }

    /// A state with no message, for when guidance is switched off. Resets the
    /// debounce so the next hint after switching back on shows at once.
    pub fn hide(&mut self, now: Instant) -> GuidanceState {
        let classification = self
            .last_emitted
            .take()
            .map_or(Classification::NoDocument, |state| state.classification);
        trace!(?classification, "Guidance hidden");
        GuidanceState {
            classification,
            message: None,
            emitted_at: now,
        }
    }
}
