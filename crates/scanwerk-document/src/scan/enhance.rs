// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output filters for cropped documents — grayscale, adaptive and Otsu
// binarization, and a contrast-then-binarize enhancement pass.

use image::{DynamicImage, GrayImage, Luma};
use scanwerk_core::OutputFilter;
use tracing::{debug, instrument};

use crate::image::processor::ImageProcessor;

/// Neighbourhood radius for adaptive binarization.
const BLOCK_RADIUS: u32 = 15;
/// Offset subtracted from the local mean before thresholding.
const THRESHOLD_OFFSET: i32 = 10;
const ENHANCE_CONTRAST: f32 = 1.4;

/// Cleans up a cropped document image.
pub struct ScanEnhancer {
    image: DynamicImage,
}

impl ScanEnhancer {
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    /// Apply a configured output filter.
    pub fn apply(self, filter: OutputFilter) -> Self {
        match filter {
            OutputFilter::None => self,
            OutputFilter::Grayscale => Self {
                image: ImageProcessor::from_dynamic(self.image).grayscale().into_dynamic(),
            },
            OutputFilter::Binarized => self.binarize(BLOCK_RADIUS, THRESHOLD_OFFSET),
            OutputFilter::Otsu => self.binarize_otsu(),
            OutputFilter::Enhanced => self.enhance_scan(),
        }
    }

    /// Adaptive thresholding to black and white.
    ///
    /// For each pixel, the threshold is the mean intensity within a
    /// `block_radius` neighbourhood minus `c`. Darker pixels become black.
    #[instrument(skip(self), fields(block_radius, c))]
    pub fn binarize(self, block_radius: u32, c: i32) -> Self {
        let gray = self.image.to_luma8();
        let (width, height) = gray.dimensions();
        let integral = compute_integral_image(&gray);

        let output = GrayImage::from_fn(width, height, |x, y| {
            let local_mean = region_mean(&integral, width, height, x, y, block_radius);
            let threshold = (local_mean as i32 - c).clamp(0, 255) as u8;
            let binary = if gray.get_pixel(x, y).0[0] < threshold { 0u8 } else { 255u8 };
            Luma([binary])
        });

        debug!(width, height, "Adaptive binarization complete");
        Self {
            image: DynamicImage::ImageLuma8(output),
        }
    }

    /// Global binarization at the Otsu threshold. Pixels at or below the
    /// threshold become black.
    #[instrument(skip(self))]
    pub fn binarize_otsu(self) -> Self {
        let gray = self.image.to_luma8();
        let threshold = otsu_threshold(&gray);
        debug!(threshold, "Otsu threshold computed");

        let output = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            let binary = if gray.get_pixel(x, y).0[0] <= threshold { 0u8 } else { 255u8 };
            Luma([binary])
        });

        Self {
            image: DynamicImage::ImageLuma8(output),
        }
    }

    /// Grayscale, contrast boost, then adaptive binarization.
    pub fn enhance_scan(self) -> Self {
        let boosted = ImageProcessor::from_dynamic(self.image)
            .grayscale()
            .adjust_contrast(ENHANCE_CONTRAST)
            .into_dynamic();
        Self { image: boosted }.binarize(BLOCK_RADIUS, THRESHOLD_OFFSET)
    }
}

// -- Integral image helpers ---------------------------------------------------

/// Summed-area table with a zero-padded border, `(width+1) x (height+1)`.
fn compute_integral_image(gray: &GrayImage) -> Vec<u64> {
    let (w, h) = gray.dimensions();
    let stride = (w + 1) as usize;
    let mut table = vec![0u64; stride * (h + 1) as usize];

    for y in 0..h {
        let mut row_sum: u64 = 0;
        for x in 0..w {
            row_sum += gray.get_pixel(x, y).0[0] as u64;
            let idx = (y + 1) as usize * stride + (x + 1) as usize;
            let above = y as usize * stride + (x + 1) as usize;
            table[idx] = row_sum + table[above];
        }
    }

    table
}

/// Mean pixel value in the square of `radius` around (cx, cy).
fn region_mean(
    integral: &[u64],
    img_width: u32,
    img_height: u32,
    cx: u32,
    cy: u32,
    radius: u32,
) -> f64 {
    let stride = (img_width + 1) as usize;

    let x1 = cx.saturating_sub(radius) as usize;
    let y1 = cy.saturating_sub(radius) as usize;
    let x2 = (cx as usize + radius as usize + 1).min(img_width as usize);
    let y2 = (cy as usize + radius as usize + 1).min(img_height as usize);

    let area = ((x2 - x1) * (y2 - y1)) as f64;
    if area == 0.0 {
        return 128.0;
    }

    let sum = integral[y2 * stride + x2] as f64
        - integral[y1 * stride + x2] as f64
        - integral[y2 * stride + x1] as f64
        + integral[y1 * stride + x1] as f64;

    sum / area
}

/// Threshold maximising the between-class variance of the histogram.
fn otsu_threshold(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total_pixels = gray.width() as u64 * gray.height() as u64;
    if total_pixels == 0 {
        return 128;
    }

    let sum_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum();

    let mut sum_background: f64 = 0.0;
    let mut weight_background: u64 = 0;
    let mut max_variance: f64 = 0.0;
    let mut best_threshold: u8 = 0;

    for (t, &count) in histogram.iter().enumerate() {
        weight_background += count;
        if weight_background == 0 {
            continue;
        }
        let weight_foreground = total_pixels - weight_background;
        if weight_foreground == 0 {
            break;
        }

        sum_background += t as f64 * count as f64;
        let mean_background = sum_background / weight_background as f64;
        let mean_foreground = (sum_total - sum_background) / weight_foreground as f64;

        let between_variance = weight_background as f64
            * weight_foreground as f64
            * (mean_background - mean_foreground).powi(2);

        if between_variance > max_variance {
            max_variance = between_variance;
            best_threshold = t as u8;
        }
    }

    best_threshold
}
