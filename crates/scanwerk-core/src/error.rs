// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Scanwerk.

use thiserror::Error;

/// Top-level error type for all Scanwerk operations.
#[derive(Debug, Error)]
pub enum ScanwerkError {
    // -- Frame / analysis errors --
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error("unsupported orientation: {0} degrees (must be a multiple of 90)")]
    UnsupportedOrientation(i32),

    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Capture errors --
    #[error("capture failed: {0}")]
    CaptureFailed(String),

    #[error("capture timed out after {timeout_ms} ms")]
    CaptureTimeout { timeout_ms: u64 },

    #[error("a capture is already in progress")]
    CaptureInProgress,

    // -- Pipeline lifecycle --
    #[error("invalid configuration: {0}")]
    Misconfiguration(String),

    #[error("frame source error: {0}")]
    Source(String),

    #[error("scan session is stopped")]
    SessionStopped,

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Platform bridge --
    #[error("feature not available on this platform")]
    PlatformUnavailable,
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScanwerkError>;
