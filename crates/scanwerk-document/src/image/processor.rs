// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — analysis downscale, quarter-turn rotation, crop,
// grayscale and contrast adjustment. Operates on in-memory images using the
// `image` crate.

use image::{DynamicImage, ImageFormat};
use scanwerk_core::error::ScanwerkError;
use scanwerk_core::Orientation;
use tracing::{debug, info, instrument};

/// Image processing pipeline operating on a single in-memory image.
///
/// Each method consumes `self` and returns a new `ImageProcessor` wrapping the
/// transformed image, enabling method chaining.
///
/// ```ignore
/// let upright = ImageProcessor::open("capture.jpg")?
///     .rotate(Orientation::Deg90)
///     .crop(10, 20, 300, 400)
///     .grayscale()
///     .to_png_bytes()?;
/// ```
pub struct ImageProcessor {
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Load an image from a file path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, ScanwerkError> {
        let img = image::open(path.as_ref()).map_err(|err| {
            ScanwerkError::ImageError(format!(
                "failed to open {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        info!(width = img.width(), height = img.height(), "Image loaded");
        Ok(Self { image: img })
    }

    /// Create a processor from raw encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, ScanwerkError> {
        let img = image::load_from_memory(data)
            .map_err(|err| ScanwerkError::ImageError(format!("failed to decode image: {}", err)))?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Borrow the underlying `DynamicImage`.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    /// Consume the processor and return the underlying `DynamicImage`.
    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Shrink the image so its longest side is at most `max_dimension`,
    /// preserving aspect ratio. Images that already fit are returned as is;
    /// this never upscales.
    ///
    /// Uses a triangle filter: analysis frames are small and need speed more
    /// than Lanczos quality.
    #[instrument(skip(self), fields(max_dimension))]
    pub fn downscale_to_fit(self, max_dimension: u32) -> Self {
        if !needs_downscale(&self.image, max_dimension) {
            return self;
        }
        Self {
            image: resize_to_fit(&self.image, max_dimension),
        }
    }

    /// As [`downscale_to_fit`](Self::downscale_to_fit), reading from a
    /// borrowed image. Only the pixels of the result are allocated, so a
    /// full-resolution frame is never copied before it is shrunk.
    #[instrument(skip(image), fields(max_dimension))]
    pub fn downscaled(image: &DynamicImage, max_dimension: u32) -> Self {
        let image = if needs_downscale(image, max_dimension) {
            resize_to_fit(image, max_dimension)
        } else {
            image.clone()
        };
        Self { image }
    }

    /// Rotate the image clockwise by a quarter-turn orientation. Lossless.
    #[instrument(skip(self), fields(degrees = orientation.degrees()))]
    pub fn rotate(self, orientation: Orientation) -> Self {
        let image = match orientation {
            Orientation::Deg0 => return self,
            Orientation::Deg90 => self.image.rotate90(),
            Orientation::Deg180 => self.image.rotate180(),
            Orientation::Deg270 => self.image.rotate270(),
        };
        debug!(
            new_w = image.width(),
            new_h = image.height(),
            "Rotation applied"
        );
        Self { image }
    }

    /// Crop a rectangular region from the image.
    ///
    /// `x` and `y` are the top-left corner; `width` and `height` define the
    /// size of the crop rectangle. Values are clamped to image bounds.
    #[instrument(skip(self), fields(x, y, width, height))]
    pub fn crop(self, x: u32, y: u32, width: u32, height: u32) -> Self {
        let img_w = self.image.width();
        let img_h = self.image.height();

        let safe_x = x.min(img_w.saturating_sub(1));
        let safe_y = y.min(img_h.saturating_sub(1));
        let safe_w = width.min(img_w.saturating_sub(safe_x));
        let safe_h = height.min(img_h.saturating_sub(safe_y));

        debug!(safe_x, safe_y, safe_w, safe_h, "Cropping image");

        let cropped = self.image.crop_imm(safe_x, safe_y, safe_w, safe_h);
        Self { image: cropped }
    }

    /// Convert the image to grayscale (luma).
    pub fn grayscale(self) -> Self {
        Self {
            image: DynamicImage::ImageLuma8(self.image.to_luma8()),
        }
    }

    /// Adjust contrast by a factor around mid-gray. Values > 1.0 increase
    /// contrast; 1.0 is a no-op. Grayscale input stays grayscale.
    #[instrument(skip(self), fields(factor))]
    pub fn adjust_contrast(self, factor: f32) -> Self {
        let adjust = |channel: u8| -> u8 {
            let val = factor * (channel as f32 - 128.0) + 128.0;
            val.clamp(0.0, 255.0) as u8
        };

        let image = match self.image {
            DynamicImage::ImageLuma8(mut gray) => {
                for pixel in gray.pixels_mut() {
                    pixel.0[0] = adjust(pixel.0[0]);
                }
                DynamicImage::ImageLuma8(gray)
            }
            other => {
                let mut rgba = other.to_rgba8();
                for pixel in rgba.pixels_mut() {
                    let image::Rgba([r, g, b, a]) = *pixel;
                    *pixel = image::Rgba([adjust(r), adjust(g), adjust(b), a]);
                }
                DynamicImage::ImageRgba8(rgba)
            }
        };
        Self { image }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, ScanwerkError> {
        encode_to_format(&self.image, ImageFormat::Png)
    }

    /// Encode the current image as JPEG bytes with the given quality (1-100).
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>, ScanwerkError> {
        let mut buffer = Vec::new();
        let rgb = self.image.to_rgb8();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
        rgb.write_with_encoder(encoder)
            .map_err(|err| ScanwerkError::ImageError(format!("JPEG encoding failed: {}", err)))?;
        Ok(buffer)
    }

}

fn needs_downscale(image: &DynamicImage, max_dimension: u32) -> bool {
    max_dimension > 0 && image.width().max(image.height()) > max_dimension
}

fn resize_to_fit(source: &DynamicImage, max_dimension: u32) -> DynamicImage {
    let resized = source.resize(max_dimension, max_dimension, image::imageops::FilterType::Triangle);
    debug!(
        from_w = source.width(),
        from_h = source.height(),
        new_w = resized.width(),
        new_h = resized.height(),
        "Downscaled for analysis"
    );
    resized
}

fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, ScanwerkError> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, format)
        .map_err(|err| ScanwerkError::ImageError(format!("image encoding failed: {}", err)))?;
    Ok(buffer)
}
