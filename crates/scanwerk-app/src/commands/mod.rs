// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Subcommands and the file helpers they share.

pub mod crop;
pub mod detect;
pub mod replay;

use std::path::Path;

use scanwerk_core::error::Result;
use scanwerk_core::{CapturedImage, Frame, Orientation};
use scanwerk_document::ImageProcessor;
use tracing::info;

const JPEG_QUALITY: u8 = 90;

/// Decode a still image as a frame with the given upright rotation.
pub fn load_frame(path: &Path, rotation: i32) -> Result<Frame> {
    let orientation = Orientation::from_degrees(rotation)?;
    let image = ImageProcessor::open(path)?.into_dynamic();
    Ok(Frame::new(image, orientation))
}

/// Write a captured document, choosing the encoding from the extension.
pub fn write_captured(captured: &CapturedImage, path: &Path) -> Result<()> {
    let jpeg = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"));
    let bytes = if jpeg {
        captured.to_jpeg_bytes(JPEG_QUALITY)?
    } else {
        captured.to_png_bytes()?
    };
    std::fs::write(path, &bytes)?;
    info!(
        path = %path.display(),
        width = captured.width(),
        height = captured.height(),
        digest = %captured.digest(),
        "Document written"
    );
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use image::{DynamicImage, GrayImage, Luma};

    /// Bright 200x160 page on a dark 320x240 background.
    pub fn page_on_desk() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(320, 240, |x, y| {
            if (60..260).contains(&x) && (40..200).contains(&y) {
                Luma([230u8])
            } else {
                Luma([30u8])
            }
        }))
    }
}
