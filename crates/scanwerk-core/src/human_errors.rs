// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for people holding a phone over a document.
//
// Every technical error is mapped to plain English with a clear suggestion.
// The severity drives how the host presents it.

use crate::error::ScanwerkError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Camera busy, timeout — trying again usually works.
    Transient,
    /// The user must change something (permissions, settings file).
    ActionRequired,
    /// Cannot be fixed by retrying.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether offering a "try again" button makes sense.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `ScanwerkError` into a `HumanError`.
pub fn humanize_error(err: &ScanwerkError) -> HumanError {
    match err {
        ScanwerkError::InvalidFrame(_) => HumanError {
            message: "The camera picture could not be read.".into(),
            suggestion: "Hold the device still for a moment; scanning continues automatically."
                .into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanwerkError::UnsupportedOrientation(degrees) => HumanError {
            message: "The camera reported an unusual rotation.".into(),
            suggestion: format!(
                "Turn the device upright and capture again. (Reported rotation: {degrees}°)"
            ),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanwerkError::ImageError(detail) => HumanError {
            message: "The captured picture could not be processed.".into(),
            suggestion: format!("Try capturing the document again. ({detail})"),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanwerkError::CaptureFailed(detail) => {
            let lower = detail.to_ascii_lowercase();
            if lower.contains("busy") || lower.contains("in use") {
                HumanError {
                    message: "The camera is busy.".into(),
                    suggestion: "Close other apps that use the camera, then try again.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            } else {
                HumanError {
                    message: "The picture could not be taken.".into(),
                    suggestion: format!("Try again. ({detail})"),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        ScanwerkError::CaptureTimeout { .. } => HumanError {
            message: "The camera took too long to take the picture.".into(),
            suggestion: "Hold the device steady and try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanwerkError::CaptureInProgress => HumanError {
            message: "A picture is already being taken.".into(),
            suggestion: "Wait a moment for it to finish.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanwerkError::Misconfiguration(detail) => HumanError {
            message: "The scanner settings are not valid.".into(),
            suggestion: format!("Fix the settings and start the scanner again. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanwerkError::Source(detail) => HumanError {
            message: "The camera stopped sending pictures.".into(),
            suggestion: format!(
                "Check that the camera is connected and that the app may use it. ({detail})"
            ),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        ScanwerkError::SessionStopped => HumanError {
            message: "The scanner is not running.".into(),
            suggestion: "Open the scanner again to continue.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanwerkError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError {
                message: "A file could not be found.".into(),
                suggestion: "Check the file name and try again.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            std::io::ErrorKind::PermissionDenied => HumanError {
                message: "The app is not allowed to open that file.".into(),
                suggestion: "Check the file permissions and try again.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            _ => HumanError {
                message: "Reading or writing a file failed.".into(),
                suggestion: format!("Try again. ({io_err})"),
                retriable: true,
                severity: Severity::Transient,
            },
        },

        ScanwerkError::Serialization(detail) => HumanError {
            message: "A settings file is damaged.".into(),
            suggestion: format!("Fix or delete the settings file. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanwerkError::PlatformUnavailable => HumanError {
            message: "No camera is available on this device.".into(),
            suggestion: "Use a device with a camera, or load pictures from files instead.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}
