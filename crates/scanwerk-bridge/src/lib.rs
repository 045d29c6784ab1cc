// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanwerk — Camera frame sources.
//
// The capture pipeline never talks to a camera directly; it pulls preview
// frames and full-resolution captures through the `FrameSource` trait.
// Native camera bindings live with the host application. This crate ships a
// stub for hosts without one and a replay source that feeds recorded frames.

pub mod replay;
pub mod stub;
pub mod traits;

pub use replay::ReplayFrameSource;
pub use stub::StubFrameSource;
pub use traits::{FrameSource, SourceFuture};

/// The default source for the current build target.
///
/// No native camera binding is compiled into this crate, so this is always
/// the stub, which reports `PlatformUnavailable`.
pub fn platform_source() -> Box<dyn FrameSource> {
    Box::new(stub::StubFrameSource)
}
