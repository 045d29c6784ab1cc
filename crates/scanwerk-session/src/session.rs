// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Live scan session — wires a frame source through analysis, guidance and
// auto-capture, and runs captures in the background.
//
// # Task layout
//
//   - Reader task: pulls preview frames from the source until it ends or the
//     session stops.
//   - Analysis: at most one frame at a time on the blocking pool. A frame that
//     arrives while analysis is busy is dropped, never queued.
//   - Capture: one at a time. Takes a snapshot of the quad when it starts, so
//     analysis can keep running (and replacing the live quad) meanwhile.
//
// Events are published on an unbounded channel as plain data. Nothing is
// published once `stop()` has been called.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use scanwerk_bridge::FrameSource;
use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::{
    CaptureId, CaptureTrigger, CapturedImage, Classification, DetectionOutcome, Frame,
    GuidanceState, PipelineConfig, Quadrilateral,
};
use scanwerk_document::{CaptureProcessor, ContourAnalyzer};
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::autocapture::AutoCaptureController;
use crate::guidance::GuidanceClassifier;

/// Everything a session reports to its host.
#[derive(Debug)]
pub enum PipelineEvent {
    /// A new (debounced) guidance hint.
    GuidanceChanged(GuidanceState),
    /// Result of analyzing one frame, for drawing the live outline.
    FrameAnalyzed {
        sequence: u64,
        outcome: DetectionOutcome,
    },
    /// Auto-capture fired; a capture is now in progress.
    CaptureTriggered(CaptureTrigger),
    /// A capture finished. `image` is `None` when there was no document
    /// outline to crop to.
    CaptureCompleted {
        capture_id: CaptureId,
        image: Option<CapturedImage>,
    },
    /// A capture could not be taken or processed. Auto-capture starts over.
    CaptureFailed {
        capture_id: CaptureId,
        error: ScanwerkError,
    },
    /// The source delivered its last frame.
    SourceEnded,
    /// The source failed; no further frames will be analyzed.
    SourceFailed(ScanwerkError),
}

/// Point-in-time copy of the session counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames_received: u64,
    pub frames_analyzed: u64,
    pub frames_dropped: u64,
    pub analyses_failed: u64,
    pub captures_completed: u64,
    pub captures_empty: u64,
    pub captures_failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    frames_received: AtomicU64,
    frames_analyzed: AtomicU64,
    frames_dropped: AtomicU64,
    analyses_failed: AtomicU64,
    captures_completed: AtomicU64,
    captures_empty: AtomicU64,
    captures_failed: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> SessionStats {
        SessionStats {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_analyzed: self.frames_analyzed.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            analyses_failed: self.analyses_failed.load(Ordering::Relaxed),
            captures_completed: self.captures_completed.load(Ordering::Relaxed),
            captures_empty: self.captures_empty.load(Ordering::Relaxed),
            captures_failed: self.captures_failed.load(Ordering::Relaxed),
        }
    }
}

/// State shared between the session handle and its tasks.
struct Shared {
    source: Arc<dyn FrameSource>,
    analyzer: Arc<ContourAnalyzer>,
    processor: CaptureProcessor,
    guidance: Mutex<GuidanceClassifier>,
    controller: Mutex<AutoCaptureController>,
    /// Quad of the latest outcome that found a document; used by manual
    /// captures.
    last_quad: Mutex<Option<Quadrilateral>>,
    /// Taken on stop, which also closes the receiver.
    events: Mutex<Option<mpsc::UnboundedSender<PipelineEvent>>>,
    shutdown: watch::Receiver<bool>,
    analysis_in_flight: AtomicBool,
    /// Woken each time an analysis finishes.
    analysis_idle: Notify,
    capture_in_flight: AtomicBool,
    capture_task: Mutex<Option<JoinHandle<()>>>,
    capture_timeout: Duration,
    counters: Counters,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn is_stopped(&self) -> bool {
        *self.shutdown.borrow()
    }

    fn publish(&self, event: PipelineEvent) {
        let events = lock(&self.events);
        let Some(tx) = events.as_ref() else {
            return;
        };
        if tx.send(event).is_err() {
            debug!("Event receiver dropped");
        }
    }

    /// Hand a frame to the analyzer unless it is still busy with another.
    fn dispatch(self: &Arc<Self>, frame: Frame) {
        Counters::bump(&self.counters.frames_received);
        let sequence = frame.sequence();

        if self
            .analysis_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            Counters::bump(&self.counters.frames_dropped);
            debug!(sequence, "Analysis busy; frame dropped");
            return;
        }

        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let analyzer = Arc::clone(&shared.analyzer);
            let outcome = match tokio::task::spawn_blocking(move || analyzer.analyze(&frame)).await
            {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!(sequence, error = %err, "Analysis task panicked");
                    DetectionOutcome::failed()
                }
            };
            shared.handle_outcome(sequence, outcome);
            shared.analysis_in_flight.store(false, Ordering::Release);
            shared.analysis_idle.notify_waiters();
        });
    }

    /// Wait until no frame is under analysis, or the session stops.
    async fn analysis_settled(&self, shutdown: &mut watch::Receiver<bool>) {
        loop {
            // Registered before the flag is read so a wake-up in between is kept.
            let idle = self.analysis_idle.notified();
            if !self.analysis_in_flight.load(Ordering::Acquire) {
                return;
            }
            tokio::select! {
                _ = idle => {}
                _ = shutdown.changed() => return,
            }
        }
    }

    /// Guidance first, then auto-capture, then publish.
    ///
    /// Guidance is only produced while auto-capture is enabled. The controller
    /// lock is held while publishing so a hint never lands after the one that
    /// hides it on disable.
    fn handle_outcome(self: &Arc<Self>, sequence: u64, outcome: DetectionOutcome) {
        if self.is_stopped() {
            debug!(sequence, "Session stopped; analysis result discarded");
            return;
        }
        Counters::bump(&self.counters.frames_analyzed);

        match outcome.classification() {
            Classification::AnalysisFailed => Counters::bump(&self.counters.analyses_failed),
            Classification::NoDocument => *lock(&self.last_quad) = None,
            _ => {
                if let Some(quad) = outcome.quadrilateral() {
                    *lock(&self.last_quad) = Some(*quad);
                }
            }
        }

        let trigger = {
            let mut controller = lock(&self.controller);
            let guidance = if controller.is_enabled() {
                lock(&self.guidance).classify(&outcome, Instant::now())
            } else {
                None
            };
            let trigger = if self.capture_in_flight.load(Ordering::Acquire) {
                None
            } else {
                controller.observe(&outcome, sequence)
            };

            self.publish(PipelineEvent::FrameAnalyzed { sequence, outcome });
            if let Some(state) = guidance {
                self.publish(PipelineEvent::GuidanceChanged(state));
            }
            trigger
        };
        if let Some(trigger) = trigger {
            let quad = Some(trigger.quadrilateral);
            if let Err(err) = self.begin_capture(trigger.capture_id, quad, Some(trigger)) {
                debug!(error = %err, "Auto-capture trigger discarded");
                lock(&self.controller).reset();
            }
        }
    }

    /// Start a capture task for `quad`. Only one capture runs at a time.
    fn begin_capture(
        self: &Arc<Self>,
        capture_id: CaptureId,
        quad: Option<Quadrilateral>,
        trigger: Option<CaptureTrigger>,
    ) -> Result<()> {
        if self
            .capture_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ScanwerkError::CaptureInProgress);
        }
        if let Some(trigger) = trigger {
            self.publish(PipelineEvent::CaptureTriggered(trigger));
        }

        let shared = Arc::clone(self);
        let handle = tokio::spawn(async move {
            shared.run_capture(capture_id, quad).await;
        });
        *lock(&self.capture_task) = Some(handle);
        Ok(())
    }

    async fn run_capture(&self, capture_id: CaptureId, quad: Option<Quadrilateral>) {
        info!(%capture_id, has_quad = quad.is_some(), "Capture started");

        let raw = match tokio::time::timeout(self.capture_timeout, self.source.capture()).await {
            Ok(result) => result,
            Err(_) => Err(ScanwerkError::CaptureTimeout {
                timeout_ms: self.capture_timeout.as_millis() as u64,
            }),
        };

        let processed = match raw {
            Ok(frame) => {
                let processor = self.processor;
                tokio::task::spawn_blocking(move || {
                    processor.process_with_id(capture_id, &frame, frame.orientation(), quad.as_ref())
                })
                .await
                .unwrap_or_else(|err| {
                    Err(ScanwerkError::CaptureFailed(format!("capture processing panicked: {err}")))
                })
            }
            Err(err) => Err(err),
        };

        if self.is_stopped() {
            debug!(%capture_id, "Session stopped; capture result discarded");
            return;
        }

        match processed {
            Ok(image) => {
                if image.is_some() {
                    Counters::bump(&self.counters.captures_completed);
                } else {
                    Counters::bump(&self.counters.captures_empty);
                }
                info!(%capture_id, cropped = image.is_some(), "Capture completed");
                self.publish(PipelineEvent::CaptureCompleted { capture_id, image });
            }
            Err(error) => {
                Counters::bump(&self.counters.captures_failed);
                warn!(%capture_id, error = %error, "Capture failed");
                self.publish(PipelineEvent::CaptureFailed { capture_id, error });
            }
        }

        lock(&self.controller).reset();
        self.capture_in_flight.store(false, Ordering::Release);
    }
}

/// A running capture pipeline.
///
/// Dropping the session stops it; call [`stop`](Self::stop) to also wait for
/// the reader task to finish.
pub struct ScanSession {
    shared: Arc<Shared>,
    shutdown_tx: watch::Sender<bool>,
    reader: Option<JoinHandle<()>>,
}

impl ScanSession {
    /// Start a session with the default analyzer.
    ///
    /// Must be called from within a Tokio runtime. Fails with
    /// `Misconfiguration` if `config` does not validate.
    pub fn start(
        config: &PipelineConfig,
        source: Arc<dyn FrameSource>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<PipelineEvent>)> {
        config.validate()?;
        Self::start_with_analyzer(config, source, ContourAnalyzer::from_config(config))
    }

    /// Start a session with a custom analyzer (e.g. a different contour
    /// kernel).
    pub fn start_with_analyzer(
        config: &PipelineConfig,
        source: Arc<dyn FrameSource>,
        analyzer: ContourAnalyzer,
    ) -> Result<(Self, mpsc::UnboundedReceiver<PipelineEvent>)> {
        let controller = AutoCaptureController::from_config(config)?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            ScanwerkError::Misconfiguration("a scan session needs a running Tokio runtime".into())
        })?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let shared = Arc::new(Shared {
            source,
            analyzer: Arc::new(analyzer),
            processor: CaptureProcessor::from_config(config),
            guidance: Mutex::new(GuidanceClassifier::from_config(config)),
            controller: Mutex::new(controller),
            last_quad: Mutex::new(None),
            events: Mutex::new(Some(events_tx)),
            shutdown: shutdown_rx.clone(),
            analysis_in_flight: AtomicBool::new(false),
            analysis_idle: Notify::new(),
            capture_in_flight: AtomicBool::new(false),
            capture_task: Mutex::new(None),
            capture_timeout: config.capture_timeout(),
            counters: Counters::default(),
        });

        info!(
            source = shared.source.source_name(),
            required_frames = config.required_consecutive_ok_frames(),
            auto_capture = config.auto_capture_enabled,
            "Scan session started"
        );

        let reader_shared = Arc::clone(&shared);
        let reader = runtime.spawn(async move {
            Self::frame_loop(reader_shared, shutdown_rx).await;
        });

        Ok((
            Self {
                shared,
                shutdown_tx,
                reader: Some(reader),
            },
            events_rx,
        ))
    }

    /// Pull frames until the source ends, fails, or the session stops.
    async fn frame_loop(shared: Arc<Shared>, mut shutdown: watch::Receiver<bool>) {
        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    debug!("Frame loop received shutdown signal");
                    break;
                }
                next = shared.source.next_frame() => next,
            };

            match next {
                Ok(Some(frame)) => shared.dispatch(frame),
                Ok(None) => {
                    info!(source = shared.source.source_name(), "Frame source ended");
                    // The last frame's outcome (and any trigger) comes first.
                    shared.analysis_settled(&mut shutdown).await;
                    shared.publish(PipelineEvent::SourceEnded);
                    break;
                }
                Err(err) => {
                    error!(source = shared.source.source_name(), error = %err, "Frame source failed");
                    shared.publish(PipelineEvent::SourceFailed(err));
                    break;
                }
            }
        }
    }

    /// Capture now using the most recent document outline.
    ///
    /// The result arrives as a `CaptureCompleted` (image `None` if no outline
    /// was known) or `CaptureFailed` event.
    pub fn request_capture(&self) -> Result<CaptureId> {
        if self.shared.is_stopped() {
            return Err(ScanwerkError::SessionStopped);
        }
        let quad = *lock(&self.shared.last_quad);
        let capture_id = CaptureId::new();
        self.shared.begin_capture(capture_id, quad, None)?;
        info!(%capture_id, "Manual capture requested");
        Ok(capture_id)
    }

    /// Turn auto-capture on or off while the session runs.
    ///
    /// Disabling also hides the guidance hint: a `GuidanceChanged` without a
    /// message is published and no further hints follow until re-enabled.
    pub fn set_auto_capture(&self, enabled: bool) {
        let mut controller = lock(&self.shared.controller);
        let was_enabled = controller.is_enabled();
        controller.set_enabled(enabled);
        if was_enabled && !enabled {
            let hidden = lock(&self.shared.guidance).hide(Instant::now());
            self.shared.publish(PipelineEvent::GuidanceChanged(hidden));
        }
        info!(enabled, "Auto-capture toggled");
    }

    pub fn auto_capture_enabled(&self) -> bool {
        lock(&self.shared.controller).is_enabled()
    }

    pub fn last_quad(&self) -> Option<Quadrilateral> {
        *lock(&self.shared.last_quad)
    }

    pub fn stats(&self) -> SessionStats {
        self.shared.counters.snapshot()
    }

    pub fn is_running(&self) -> bool {
        !self.shared.is_stopped()
    }

    /// Stop the session. In-flight analysis and capture results are
    /// discarded; no event is published after this returns.
    pub async fn stop(mut self) -> Result<()> {
        self.signal_shutdown();

        if let Some(capture) = lock(&self.shared.capture_task).take() {
            capture.abort();
        }
        if let Some(reader) = self.reader.take() {
            if let Err(err) = reader.await {
                if !err.is_cancelled() {
                    return Err(ScanwerkError::Source(format!("frame loop join: {err}")));
                }
            }
        }

        let stats = self.stats();
        info!(
            received = stats.frames_received,
            analyzed = stats.frames_analyzed,
            dropped = stats.frames_dropped,
            "Scan session stopped"
        );
        Ok(())
    }

    fn signal_shutdown(&self) {
        // send_replace never fails, even with no receivers left.
        self.shutdown_tx.send_replace(true);
        lock(&self.shared.events).take();
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        self.signal_shutdown();
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use image::{DynamicImage, GrayImage, Luma};
    use scanwerk_bridge::ReplayFrameSource;
    use scanwerk_core::Orientation;
    use scanwerk_document::{ContourKernel, DetectionSettings};

    const WAIT: Duration = Duration::from_secs(10);

    fn bright_frame() -> Frame {
        Frame::new(
            DynamicImage::ImageLuma8(GrayImage::from_pixel(320, 240, Luma([200u8]))),
            Orientation::Deg0,
        )
    }

    /// Reports a centred document on every frame, optionally after a delay,
    /// and records how many analyses ran at once.
    #[derive(Default)]
    struct RecordingKernel {
        delay: Duration,
        active: AtomicUsize,
        max_active: AtomicUsize,
        calls: AtomicUsize,
    }

    impl ContourKernel for RecordingKernel {
        fn find_quad(&self, edges: &GrayImage) -> Option<[(f32, f32); 4]> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                std::thread::sleep(self.delay);
            }
            self.active.fetch_sub(1, Ordering::SeqCst);

            let (w, h) = (edges.width() as f32, edges.height() as f32);
            Some([
                (w * 0.1, h * 0.1),
                (w * 0.9, h * 0.1),
                (w * 0.9, h * 0.9),
                (w * 0.1, h * 0.9),
            ])
        }
    }

    /// Delegates to a shared recording kernel so the test can inspect it afterwards.
    struct SharedKernel(Arc<RecordingKernel>);

    impl ContourKernel for SharedKernel {
        fn find_quad(&self, edges: &GrayImage) -> Option<[(f32, f32); 4]> {
            self.0.find_quad(edges)
        }
    }

    /// Reports a centred quad that shifts right a little on every call.
    #[derive(Default)]
    struct DriftingKernel {
        calls: AtomicUsize,
    }

    impl ContourKernel for DriftingKernel {
        fn find_quad(&self, edges: &GrayImage) -> Option<[(f32, f32); 4]> {
            let shift = self.calls.fetch_add(1, Ordering::SeqCst) as f32 * 0.05;
            let (w, h) = (edges.width() as f32, edges.height() as f32);
            Some([
                (w * 0.1 + shift, h * 0.1),
                (w * 0.9 + shift, h * 0.1),
                (w * 0.9 + shift, h * 0.9),
                (w * 0.1 + shift, h * 0.9),
            ])
        }
    }

    fn recording_analyzer(kernel: &Arc<RecordingKernel>) -> ContourAnalyzer {
        ContourAnalyzer::with_kernel(
            DetectionSettings::default(),
            Box::new(SharedKernel(Arc::clone(kernel))),
        )
    }

    fn config(required: u32) -> PipelineConfig {
        PipelineConfig {
            required_consecutive_ok_frames: Some(required),
            ..Default::default()
        }
    }

    fn replay(interval_ms: u64) -> Arc<ReplayFrameSource> {
        Arc::new(
            ReplayFrameSource::new(vec![bright_frame()])
                .looping(true)
                .with_frame_interval(Duration::from_millis(interval_ms)),
        )
    }

    /// Receive events until `stop` matches one, returning everything seen.
    async fn collect_until(
        events: &mut mpsc::UnboundedReceiver<PipelineEvent>,
        stop: impl Fn(&PipelineEvent) -> bool,
    ) -> Vec<PipelineEvent> {
        let mut seen = Vec::new();
        let result = tokio::time::timeout(WAIT, async {
            while let Some(event) = events.recv().await {
                let done = stop(&event);
                seen.push(event);
                if done {
                    return;
                }
            }
        })
        .await;
        assert!(result.is_ok(), "timed out; events so far: {seen:?}");
        seen
    }

    #[tokio::test]
    async fn auto_capture_triggers_and_completes() {
        let kernel = Arc::new(RecordingKernel::default());
        let source = replay(2);
        let (session, mut events) =
            ScanSession::start_with_analyzer(&config(3), source.clone(), recording_analyzer(&kernel))
                .expect("start");

        let seen = collect_until(&mut events, |e| {
            matches!(e, PipelineEvent::CaptureCompleted { .. })
        })
        .await;

        let trigger_at = seen
            .iter()
            .position(|e| matches!(e, PipelineEvent::CaptureTriggered(_)))
            .expect("trigger event");
        let analyzed_before = seen[..trigger_at]
            .iter()
            .filter(|e| matches!(e, PipelineEvent::FrameAnalyzed { .. }))
            .count();
        assert!(analyzed_before >= 3);
        assert!(seen.iter().any(|e| matches!(e, PipelineEvent::GuidanceChanged(_))));

        let Some(PipelineEvent::CaptureCompleted { image, .. }) = seen.last() else {
            panic!("last event must be the completion");
        };
        let image = image.as_ref().expect("cropped document");
        assert_eq!((image.width(), image.height()), (256, 192));
        assert!(source.captures_taken() >= 1);

        session.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn frames_are_dropped_never_processed_concurrently() {
        let kernel = Arc::new(RecordingKernel {
            delay: Duration::from_millis(25),
            ..Default::default()
        });
        let config = PipelineConfig {
            auto_capture_enabled: false,
            ..Default::default()
        };
        let (session, _events) =
            ScanSession::start_with_analyzer(&config, replay(1), recording_analyzer(&kernel))
                .expect("start");

        tokio::time::sleep(Duration::from_millis(400)).await;
        let stats = session.stats();
        session.stop().await.expect("stop");

        assert_eq!(kernel.max_active.load(Ordering::SeqCst), 1);
        assert!(stats.frames_dropped > 0, "{stats:?}");
        assert!(stats.frames_analyzed > 0, "{stats:?}");
    }

    #[tokio::test]
    async fn capture_failure_resets_and_recovers() {
        let kernel = Arc::new(RecordingKernel::default());
        let source = replay(2);
        source.fail_next_captures(1);
        let (session, mut events) =
            ScanSession::start_with_analyzer(&config(2), source.clone(), recording_analyzer(&kernel))
                .expect("start");

        let seen = collect_until(&mut events, |e| {
            matches!(e, PipelineEvent::CaptureCompleted { .. })
        })
        .await;

        let failed_at = seen
            .iter()
            .position(|e| matches!(e, PipelineEvent::CaptureFailed { .. }))
            .expect("first capture fails");
        let triggers: Vec<_> = seen
            .iter()
            .enumerate()
            .filter(|(_, e)| matches!(e, PipelineEvent::CaptureTriggered(_)))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(triggers.len(), 2);
        assert!(triggers[0] < failed_at && failed_at < triggers[1]);
        assert_eq!(session.stats().captures_failed, 1);

        session.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn capture_uses_the_quad_from_trigger_time() {
        let analyzer = ContourAnalyzer::with_kernel(
            DetectionSettings::default(),
            Box::new(DriftingKernel::default()),
        );
        let source = Arc::new(
            ReplayFrameSource::new(vec![bright_frame()])
                .looping(true)
                .with_frame_interval(Duration::from_millis(2))
                .with_capture_delay(Duration::from_millis(200)),
        );
        let (session, mut events) =
            ScanSession::start_with_analyzer(&config(2), source, analyzer).expect("start");

        let seen = collect_until(&mut events, |e| {
            matches!(e, PipelineEvent::CaptureCompleted { .. })
        })
        .await;

        let (trigger_at, trigger) = seen
            .iter()
            .enumerate()
            .find_map(|(i, e)| match e {
                PipelineEvent::CaptureTriggered(trigger) => Some((i, *trigger)),
                _ => None,
            })
            .expect("trigger event");
        let analyzed_during_capture = seen[trigger_at..]
            .iter()
            .filter(|e| matches!(e, PipelineEvent::FrameAnalyzed { .. }))
            .count();
        assert!(analyzed_during_capture > 0, "analysis paused during capture");

        let Some(PipelineEvent::CaptureCompleted { capture_id, image }) = seen.last() else {
            panic!("last event must be the completion");
        };
        assert_eq!(*capture_id, trigger.capture_id);
        let image = image.as_ref().expect("cropped document");
        assert_eq!(*image.quadrilateral(), trigger.quadrilateral);
        assert_ne!(session.last_quad(), Some(trigger.quadrilateral));

        session.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn source_end_follows_the_last_analysis() {
        let kernel = Arc::new(RecordingKernel {
            delay: Duration::from_millis(150),
            ..Default::default()
        });
        let source = Arc::new(ReplayFrameSource::new(vec![bright_frame()]));
        let (session, mut events) =
            ScanSession::start_with_analyzer(&config(2), source, recording_analyzer(&kernel))
                .expect("start");

        let seen = collect_until(&mut events, |e| matches!(e, PipelineEvent::SourceEnded)).await;
        assert!(
            seen.iter().any(|e| matches!(e, PipelineEvent::FrameAnalyzed { sequence: 0, .. })),
            "source ended before its last frame was analyzed: {seen:?}"
        );
        assert!(session.last_quad().is_some());
        session.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn disabling_auto_capture_hides_guidance() {
        let kernel = Arc::new(RecordingKernel::default());
        let (session, mut events) =
            ScanSession::start_with_analyzer(&config(12), replay(20), recording_analyzer(&kernel))
                .expect("start");

        collect_until(&mut events, |e| {
            matches!(e, PipelineEvent::GuidanceChanged(state) if state.is_visible())
        })
        .await;
        session.set_auto_capture(false);
        collect_until(&mut events, |e| {
            matches!(e, PipelineEvent::GuidanceChanged(state) if !state.is_visible())
        })
        .await;

        // Well past the debounce interval; frames keep being analyzed.
        tokio::time::sleep(Duration::from_millis(600)).await;
        let mut analyzed = 0;
        while let Ok(event) = events.try_recv() {
            match event {
                PipelineEvent::GuidanceChanged(state) => {
                    panic!("guidance shown while auto-capture is off: {state:?}")
                }
                PipelineEvent::FrameAnalyzed { .. } => analyzed += 1,
                _ => {}
            }
        }
        assert!(analyzed > 0);
        session.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn capture_timeout_is_reported() {
        let kernel = Arc::new(RecordingKernel::default());
        let source = Arc::new(
            ReplayFrameSource::new(vec![bright_frame()])
                .looping(true)
                .with_frame_interval(Duration::from_millis(2))
                .with_capture_delay(Duration::from_secs(5)),
        );
        let config = PipelineConfig {
            required_consecutive_ok_frames: Some(2),
            capture_timeout_ms: 50,
            ..Default::default()
        };
        let (session, mut events) =
            ScanSession::start_with_analyzer(&config, source, recording_analyzer(&kernel))
                .expect("start");

        let seen = collect_until(&mut events, |e| matches!(e, PipelineEvent::CaptureFailed { .. }))
            .await;
        assert!(matches!(
            seen.last(),
            Some(PipelineEvent::CaptureFailed {
                error: ScanwerkError::CaptureTimeout { timeout_ms: 50 },
                ..
            })
        ));
        session.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn manual_capture_without_document_is_empty() {
        let config = PipelineConfig {
            auto_capture_enabled: false,
            ..Default::default()
        };
        // The default kernel finds nothing on a featureless frame.
        let (session, mut events) = ScanSession::start(&config, replay(2)).expect("start");

        collect_until(&mut events, |e| matches!(e, PipelineEvent::FrameAnalyzed { .. })).await;
        assert!(session.last_quad().is_none());

        let capture_id = session.request_capture().expect("request");
        let seen = collect_until(&mut events, |e| {
            matches!(e, PipelineEvent::CaptureCompleted { .. })
        })
        .await;
        match seen.last() {
            Some(PipelineEvent::CaptureCompleted { capture_id: id, image }) => {
                assert_eq!(*id, capture_id);
                assert!(image.is_none());
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(session.stats().captures_empty, 1);
        session.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn second_capture_request_is_rejected_while_busy() {
        let source = Arc::new(
            ReplayFrameSource::new(vec![bright_frame()])
                .looping(true)
                .with_frame_interval(Duration::from_millis(5))
                .with_capture_delay(Duration::from_millis(300)),
        );
        let config = PipelineConfig {
            auto_capture_enabled: false,
            ..Default::default()
        };
        let (session, _events) = ScanSession::start(&config, source).expect("start");

        session.request_capture().expect("first request");
        assert!(matches!(
            session.request_capture(),
            Err(ScanwerkError::CaptureInProgress)
        ));
        session.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn finite_source_reports_end() {
        let source = Arc::new(ReplayFrameSource::new(vec![bright_frame(), bright_frame()]));
        let config = PipelineConfig {
            auto_capture_enabled: false,
            ..Default::default()
        };
        let (session, mut events) = ScanSession::start(&config, source).expect("start");
        collect_until(&mut events, |e| matches!(e, PipelineEvent::SourceEnded)).await;
        session.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn unavailable_platform_is_reported_as_source_failure() {
        let source: Arc<dyn FrameSource> = Arc::new(scanwerk_bridge::StubFrameSource);
        let (session, mut events) =
            ScanSession::start(&PipelineConfig::default(), source).expect("start");
        let seen = collect_until(&mut events, |e| matches!(e, PipelineEvent::SourceFailed(_))).await;
        assert!(matches!(
            seen.last(),
            Some(PipelineEvent::SourceFailed(ScanwerkError::PlatformUnavailable))
        ));
        session.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn nothing_is_published_after_stop() {
        let kernel = Arc::new(RecordingKernel {
            delay: Duration::from_millis(150),
            ..Default::default()
        });
        let (session, mut events) =
            ScanSession::start_with_analyzer(&config(2), replay(1), recording_analyzer(&kernel))
                .expect("start");

        // Wait until the first analysis is under way, then stop mid-flight.
        tokio::time::timeout(WAIT, async {
            while kernel.calls.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("analysis started");
        session.stop().await.expect("stop");

        // Stopping closes the channel; the late analysis result never shows up.
        let next = tokio::time::timeout(WAIT, events.recv()).await.expect("channel closed");
        assert!(next.is_none(), "event published after stop: {next:?}");
    }

    #[tokio::test]
    async fn toggling_auto_capture_is_visible() {
        let (session, _events) =
            ScanSession::start(&PipelineConfig::default(), replay(5)).expect("start");
        assert!(session.auto_capture_enabled());
        session.set_auto_capture(false);
        assert!(!session.auto_capture_enabled());
        session.stop().await.expect("stop");
    }

    #[tokio::test]
    async fn invalid_config_fails_to_start() {
        let result = ScanSession::start(&config(1), replay(5));
        assert!(matches!(result, Err(ScanwerkError::Misconfiguration(_))));
    }
}
