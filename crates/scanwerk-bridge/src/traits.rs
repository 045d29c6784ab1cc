// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic frame source abstraction.

use std::future::Future;
use std::pin::Pin;

use scanwerk_core::Frame;
use scanwerk_core::error::Result;

/// Boxed future returned by [`FrameSource`] methods, keeping the trait object
/// safe.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// A camera, or anything that behaves like one.
///
/// Preview frames and captures are requested independently: a session keeps
/// pulling preview frames while a capture is in flight.
pub trait FrameSource: Send + Sync {
    /// Human-readable source name (e.g. "Back camera", "replay: ./frames").
    fn source_name(&self) -> &str;

    /// Wait for the next preview frame. `Ok(None)` means the source has ended.
    fn next_frame(&self) -> SourceFuture<'_, Option<Frame>>;

    /// Take a full-resolution capture.
    fn capture(&self) -> SourceFuture<'_, Frame>;
}
