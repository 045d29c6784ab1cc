// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `scanwerk replay` — runs recorded frames through a live session, logging
// guidance as it changes and saving every captured document.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use scanwerk_bridge::ReplayFrameSource;
use scanwerk_core::error::Result;
use scanwerk_core::{Orientation, PipelineConfig};
use scanwerk_document::ContourAnalyzer;
use scanwerk_session::{PipelineEvent, ScanSession};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ReplayOptions {
    pub frames: PathBuf,
    pub out_dir: PathBuf,
    pub rotation: i32,
    pub interval_ms: u64,
    pub max_captures: u32,
    pub looping: bool,
    pub manual: bool,
}

/// Totals reported when the replay ends.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplaySummary {
    pub saved: Vec<PathBuf>,
    pub empty_captures: u32,
    pub failed_captures: u32,
}

pub async fn run(mut config: PipelineConfig, options: ReplayOptions) -> Result<()> {
    let orientation = Orientation::from_degrees(options.rotation)?;
    let source = ReplayFrameSource::from_dir(&options.frames, orientation)?
        .with_frame_interval(Duration::from_millis(options.interval_ms))
        .looping(options.looping);
    std::fs::create_dir_all(&options.out_dir)?;

    if options.manual {
        config.auto_capture_enabled = false;
    }
    let analyzer = ContourAnalyzer::from_config(&config);
    let summary = replay(&config, analyzer, Arc::new(source), &options).await?;

    info!(
        saved = summary.saved.len(),
        empty = summary.empty_captures,
        failed = summary.failed_captures,
        "Replay finished"
    );
    for path in &summary.saved {
        println!("{}", path.display());
    }
    Ok(())
}

/// Drive one session over `source` until enough captures are saved or the
/// frames run out. In manual mode a single capture is requested once the
/// frames run out.
pub async fn replay(
    config: &PipelineConfig,
    analyzer: ContourAnalyzer,
    source: Arc<ReplayFrameSource>,
    options: &ReplayOptions,
) -> Result<ReplaySummary> {
    config.validate()?;
    let (session, mut events) = ScanSession::start_with_analyzer(config, source, analyzer)?;
    let mut summary = ReplaySummary::default();
    let mut capturing = false;
    let mut source_ended = false;

    let result = loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break Ok(());
            }
        };
        let Some(event) = event else {
            break Ok(());
        };

        match event {
            PipelineEvent::GuidanceChanged(state) => {
                if let Some(message) = state.message {
                    info!(classification = ?state.classification, "{message}");
                }
            }
            PipelineEvent::FrameAnalyzed { sequence, outcome } => {
                debug!(sequence, classification = ?outcome.classification(), "Frame analyzed");
            }
            PipelineEvent::CaptureTriggered(trigger) => {
                capturing = true;
                info!(
                    capture_id = %trigger.capture_id,
                    frame = trigger.frame_sequence,
                    "Auto-capture triggered"
                );
            }
            PipelineEvent::CaptureCompleted { capture_id, image } => {
                capturing = false;
                match image {
                    Some(captured) => {
                        let path = options.out_dir.join(format!("{capture_id}.png"));
                        if let Err(err) = super::write_captured(&captured, &path) {
                            break Err(err);
                        }
                        summary.saved.push(path);
                    }
                    None => {
                        warn!(%capture_id, "Capture had no document outline");
                        summary.empty_captures += 1;
                    }
                }
            }
            PipelineEvent::CaptureFailed { capture_id, error } => {
                capturing = false;
                warn!(%capture_id, error = %error, "Capture failed");
                summary.failed_captures += 1;
            }
            PipelineEvent::SourceEnded => {
                source_ended = true;
                if options.manual {
                    if let Err(err) = session.request_capture() {
                        break Err(err);
                    }
                    capturing = true;
                }
            }
            PipelineEvent::SourceFailed(err) => break Err(err),
        }

        if summary.saved.len() as u32 >= options.max_captures {
            break Ok(());
        }
        if source_ended && !capturing {
            break Ok(());
        }
    };

    session.stop().await?;
    result.map(|()| summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::page_on_desk;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use image::GrayImage;
    use scanwerk_core::Frame;
    use scanwerk_document::{ContourKernel, DetectionSettings};

    /// Finds a centred document, taking its time on every frame after the first.
    struct SlowAfterFirst {
        calls: AtomicUsize,
        delay: Duration,
    }

    impl ContourKernel for SlowAfterFirst {
        fn find_quad(&self, edges: &GrayImage) -> Option<[(f32, f32); 4]> {
            if self.calls.fetch_add(1, Ordering::SeqCst) > 0 {
                std::thread::sleep(self.delay);
            }
            let (w, h) = (edges.width() as f32, edges.height() as f32);
            Some([
                (w * 0.1, h * 0.1),
                (w * 0.9, h * 0.1),
                (w * 0.9, h * 0.9),
                (w * 0.1, h * 0.9),
            ])
        }
    }

    fn options(out_dir: PathBuf, manual: bool) -> ReplayOptions {
        ReplayOptions {
            frames: PathBuf::new(),
            out_dir,
            rotation: 0,
            interval_ms: 1,
            max_captures: 1,
            looping: false,
            manual,
        }
    }

    fn pages(count: usize) -> Arc<ReplayFrameSource> {
        let frames = (0..count)
            .map(|_| Frame::new(page_on_desk(), Orientation::Deg0))
            .collect();
        Arc::new(
            ReplayFrameSource::new(frames)
                .with_frame_interval(Duration::from_millis(5)),
        )
    }

    #[tokio::test]
    async fn auto_capture_saves_a_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = PipelineConfig {
            required_consecutive_ok_frames: Some(2),
            ..Default::default()
        };
        let summary = replay(&config, ContourAnalyzer::from_config(&config), pages(40), &options(dir.path().into(), false))
            .await
            .expect("replay");
        assert_eq!(summary.saved.len(), 1);
        assert!(summary.saved[0].exists());
    }

    #[tokio::test]
    async fn manual_mode_captures_once_frames_run_out() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = PipelineConfig {
            auto_capture_enabled: false,
            ..Default::default()
        };
        let summary = replay(&config, ContourAnalyzer::from_config(&config), pages(3), &options(dir.path().into(), true))
            .await
            .expect("replay");
        assert_eq!(summary.saved.len(), 1);
        assert_eq!(summary.empty_captures, 0);
    }

    #[tokio::test]
    async fn trigger_on_the_last_frame_is_not_lost() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = PipelineConfig {
            required_consecutive_ok_frames: Some(2),
            ..Default::default()
        };
        let analyzer = ContourAnalyzer::with_kernel(
            DetectionSettings::from(&config),
            Box::new(SlowAfterFirst {
                calls: AtomicUsize::new(0),
                delay: Duration::from_millis(400),
            }),
        );
        // The source runs dry while the second (triggering) frame is still
        // being analyzed.
        let frames = (0..2)
            .map(|_| Frame::new(page_on_desk(), Orientation::Deg0))
            .collect();
        let source = Arc::new(
            ReplayFrameSource::new(frames).with_frame_interval(Duration::from_millis(150)),
        );

        let summary = replay(&config, analyzer, source, &options(dir.path().into(), false))
            .await
            .expect("replay");
        assert_eq!(summary.saved.len(), 1);
        assert!(summary.saved[0].exists());
    }

    #[tokio::test]
    async fn run_rejects_empty_frame_directory() {
        let frames = tempfile::tempdir().expect("tempdir");
        let out = tempfile::tempdir().expect("tempdir");
        let mut opts = options(out.path().into(), false);
        opts.frames = frames.path().into();
        assert!(matches!(
            run(PipelineConfig::default(), opts).await,
            Err(scanwerk_core::ScanwerkError::Source(_))
        ));
    }
}
