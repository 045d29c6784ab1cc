// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub source for desktop/CI builds where no camera binding is available.
//
// Every method returns `PlatformUnavailable`.

use scanwerk_core::Frame;
use scanwerk_core::error::ScanwerkError;

use crate::traits::{FrameSource, SourceFuture};

/// No-op source returned when no camera is available.
pub struct StubFrameSource;

impl FrameSource for StubFrameSource {
    fn source_name(&self) -> &str {
        "Desktop (stub)"
    }

    fn next_frame(&self) -> SourceFuture<'_, Option<Frame>> {
        tracing::warn!("FrameSource::next_frame called on stub source");
        Box::pin(async { Err(ScanwerkError::PlatformUnavailable) })
    }

    fn capture(&self) -> SourceFuture<'_, Frame> {
        tracing::warn!("FrameSource::capture called on stub source");
        Box::pin(async { Err(ScanwerkError::PlatformUnavailable) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_reports_platform_unavailable() {
        let source = crate::platform_source();
        assert!(matches!(
            source.next_frame().await,
            Err(ScanwerkError::PlatformUnavailable)
        ));
        assert!(matches!(
            source.capture().await,
            Err(ScanwerkError::PlatformUnavailable)
        ));
        assert_eq!(source.source_name(), "Desktop (stub)");
    }
}
