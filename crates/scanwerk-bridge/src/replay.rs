// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Replay source — feeds recorded frames through the pipeline as if they came
// from a live camera. Used by the CLI and by session tests.

use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::{Frame, Orientation};
use tracing::{debug, info, instrument};

use crate::traits::{FrameSource, SourceFuture};

/// Plays back a fixed list of frames at a steady interval.
///
/// Frames are stamped with increasing sequence numbers as they are delivered.
/// A capture returns the configured capture frame, or else the most recently
/// delivered preview frame.
pub struct ReplayFrameSource {
    name: String,
    frames: Vec<Frame>,
    cursor: AtomicUsize,
    next_sequence: AtomicU64,
    frame_interval: Duration,
    looping: bool,
    capture_frame: Option<Frame>,
    capture_delay: Duration,
    failing_captures: AtomicU32,
    captures_taken: AtomicU32,
    last_delivered: Mutex<Option<Frame>>,
}

impl ReplayFrameSource {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            name: "replay".into(),
            frames,
            cursor: AtomicUsize::new(0),
            next_sequence: AtomicU64::new(0),
            frame_interval: Duration::ZERO,
            looping: false,
            capture_frame: None,
            capture_delay: Duration::ZERO,
            failing_captures: AtomicU32::new(0),
            captures_taken: AtomicU32::new(0),
            last_delivered: Mutex::new(None),
        }
    }

    /// Load every decodable image in `dir`, in file-name order.
    #[instrument(skip_all, fields(dir = %dir.as_ref().display()))]
    pub fn from_dir(dir: impl AsRef<Path>, orientation: Orientation) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && image::ImageFormat::from_path(path).is_ok())
            .collect();
        paths.sort();

        let mut frames = Vec::with_capacity(paths.len());
        for path in &paths {
            let image = image::open(path).map_err(|err| {
                ScanwerkError::ImageError(format!("failed to open {}: {}", path.display(), err))
            })?;
            frames.push(Frame::new(image, orientation));
        }
        if frames.is_empty() {
            return Err(ScanwerkError::Source(format!(
                "no images found in {}",
                dir.display()
            )));
        }

        info!(frames = frames.len(), "Replay frames loaded");
        Ok(Self::new(frames).with_name(format!("replay: {}", dir.display())))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Pause before each preview frame, emulating the camera frame rate.
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Start over from the first frame instead of ending.
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Frame returned by every capture (e.g. a higher-resolution still).
    pub fn with_capture_frame(mut self, frame: Frame) -> Self {
        self.capture_frame = Some(frame);
        self
    }

    /// How long a capture takes.
    pub fn with_capture_delay(mut self, delay: Duration) -> Self {
        self.capture_delay = delay;
        self
    }

    /// Make the next `count` captures fail.
    pub fn fail_next_captures(&self, count: u32) {
        self.failing_captures.store(count, Ordering::SeqCst);
    }

    /// Number of captures requested so far, successful or not.
    pub fn captures_taken(&self) -> u32 {
        self.captures_taken.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    fn advance(&self) -> Option<Frame> {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        let index = if index < self.frames.len() {
            index
        } else if self.looping && !self.frames.is_empty() {
            index % self.frames.len()
        } else {
            return None;
        };

        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        let frame = self.frames[index].clone().with_sequence(sequence);
        if let Ok(mut last) = self.last_delivered.lock() {
            *last = Some(frame.clone());
        }
        Some(frame)
    }

    fn take_capture(&self) -> Result<Frame> {
        self.captures_taken.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .failing_captures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ScanwerkError::CaptureFailed("simulated capture failure".into()));
        }

        if let Some(frame) = &self.capture_frame {
            return Ok(frame.clone());
        }
        let last = self
            .last_delivered
            .lock()
            .map_err(|_| ScanwerkError::Source("replay state poisoned".into()))?
            .clone();
        last.or_else(|| self.frames.first().cloned())
            .ok_or_else(|| ScanwerkError::CaptureFailed("no frame available to capture".into()))
    }
}

impl FrameSource for ReplayFrameSource {
    fn source_name(&self) -> &str {
        &self.name
    }

    fn next_frame(&self) -> SourceFuture<'_, Option<Frame>> {
        Box::pin(async move {
            if !self.frame_interval.is_zero() {
                tokio::time::sleep(self.frame_interval).await;
            }
            let frame = self.advance();
            if frame.is_none() {
                debug!(source = %self.name, "Replay exhausted");
            }
            Ok(frame)
        })
    }

    fn capture(&self) -> SourceFuture<'_, Frame> {
        Box::pin(async move {
            if !self.capture_delay.is_zero() {
                tokio::time::sleep(self.capture_delay).await;
            }
            self.take_capture()
        })
    }
}
