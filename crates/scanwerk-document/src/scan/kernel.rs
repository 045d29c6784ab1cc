// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Contour kernel — finds the four document edges on a binary edge map.
//
// The default kernel runs a Hough line transform, keeps roughly horizontal
// and roughly vertical lines, picks the outermost pair of each, and
// intersects them into corner points. Alternative detectors can be plugged
// into `ContourAnalyzer` through the `ContourKernel` trait.

use image::GrayImage;
use imageproc::hough::{LineDetectionOptions, PolarLine, detect_lines};
use tracing::{debug, trace};

/// Locates a document quadrilateral on an edge map.
///
/// Implementations receive the Canny output of the (downscaled, grayscale)
/// analysis frame and return pixel-space corners in that image, in any order,
/// or `None` when nothing document-shaped is present. They must be pure:
/// the same edge map always yields the same corners.
pub trait ContourKernel: Send + Sync {
    fn find_quad(&self, edges: &GrayImage) -> Option<[(f32, f32); 4]>;

    /// Short identifier for logs.
    fn name(&self) -> &'static str {
        "custom"
    }
}

/// Hough-transform contour kernel.
#[derive(Debug, Clone)]
pub struct HoughKernel {
    /// Vote threshold as a fraction of the shorter image side.
    pub vote_fraction: f32,
    /// Floor for the vote threshold on tiny images.
    pub min_votes: u32,
    /// Non-maximum suppression radius in the (r, angle) accumulator.
    pub suppression_radius: u32,
    /// Quads covering less than this fraction of the image are discarded.
    pub min_area_fraction: f32,
    /// How far (as a fraction of the image size) corners may fall outside the
    /// image before the quad is rejected.
    pub max_overhang: f32,
}

impl Default for HoughKernel {
    fn default() -> Self {
        Self {
            vote_fraction: 0.15,
            min_votes: 20,
            suppression_radius: 8,
            min_area_fraction: 0.01,
            max_overhang: 0.05,
        }
    }
}

impl ContourKernel for HoughKernel {
    fn find_quad(&self, edges: &GrayImage) -> Option<[(f32, f32); 4]> {
        let (w, h) = edges.dimensions();
        if w < 8 || h < 8 {
            return None;
        }

        let vote_threshold = ((w.min(h) as f32 * self.vote_fraction) as u32).max(self.min_votes);
        let lines = detect_lines(
            edges,
            LineDetectionOptions {
                vote_threshold,
                suppression_radius: self.suppression_radius,
            },
        );
        trace!(line_count = lines.len(), vote_threshold, "Hough lines detected");
        if lines.len() < 4 {
            return None;
        }

        let (horizontal, vertical) = classify_lines(&lines);
        if horizontal.len() < 2 || vertical.len() < 2 {
            trace!(
                horizontal = horizontal.len(),
                vertical = vertical.len(),
                "Insufficient horizontal/vertical lines"
            );
            return None;
        }

        let mid_x = w as f32 / 2.0;
        let mid_y = h as f32 / 2.0;
        let (top, bottom) = extreme_lines(&horizontal, |line| y_at(line, mid_x))?;
        let (left, right) = extreme_lines(&vertical, |line| x_at(line, mid_y))?;

        let corners = compute_quad_corners(&top, &bottom, &left, &right)?;

        let slack_x = w as f32 * self.max_overhang;
        let slack_y = h as f32 * self.max_overhang;
        let inside = corners.iter().all(|&(x, y)| {
            x >= -slack_x && x <= w as f32 + slack_x && y >= -slack_y && y <= h as f32 + slack_y
        });
        if !inside {
            trace!(?corners, "Corners fall outside the frame");
            return None;
        }

        let area = shoelace_area(&corners);
        let min_area = w as f32 * h as f32 * self.min_area_fraction;
        if area < min_area {
            trace!(area, min_area, "Quadrilateral too small");
            return None;
        }

        debug!(
            top_left = ?corners[0],
            top_right = ?corners[1],
            bottom_right = ?corners[2],
            bottom_left = ?corners[3],
            "Quadrilateral corners computed"
        );
        Some(corners)
    }

    fn name(&self) -> &'static str {
        "hough"
    }
}

/// Split Hough lines into roughly horizontal and roughly vertical sets.
///
/// `angle_in_degrees` is the direction of the line's normal: a horizontal
/// line has its normal at ~90, a vertical line at ~0 or ~180. Lines more than
/// 30 degrees away from either axis are discarded.
fn classify_lines(lines: &[PolarLine]) -> (Vec<PolarLine>, Vec<PolarLine>) {
    let mut horizontal = Vec::new();
    let mut vertical = Vec::new();

    for line in lines {
        let angle = line.angle_in_degrees;
        if (60..=120).contains(&angle) {
            horizontal.push(*line);
        } else if angle <= 30 || angle >= 150 {
            vertical.push(*line);
        }
    }

    (horizontal, vertical)
}

/// y coordinate where a near-horizontal line crosses `x`.
fn y_at(line: &PolarLine, x: f32) -> f32 {
    let theta = (line.angle_in_degrees as f32).to_radians();
    (line.r - x * theta.cos()) / theta.sin()
}

/// x coordinate where a near-vertical line crosses `y`.
fn x_at(line: &PolarLine, y: f32) -> f32 {
    let theta = (line.angle_in_degrees as f32).to_radians();
    (line.r - y * theta.sin()) / theta.cos()
}

/// The lines with the smallest and largest intercept. Ordering by intercept
/// at the image mid-line, not by `r`, keeps lines whose normals point in
/// opposite directions comparable.
fn extreme_lines(
    lines: &[PolarLine],
    intercept: impl Fn(&PolarLine) -> f32,
) -> Option<(PolarLine, PolarLine)> {
    let first = lines
        .iter()
        .min_by(|a, b| intercept(a).total_cmp(&intercept(b)))?;
    let last = lines
        .iter()
        .max_by(|a, b| intercept(a).total_cmp(&intercept(b)))?;
    if (intercept(last) - intercept(first)).abs() < 1.0 {
        return None;
    }
    Some((*first, *last))
}

/// Intersect top/bottom with left/right.
///
/// Returns `[top_left, top_right, bottom_right, bottom_left]`, or `None` if
/// any pair is (nearly) parallel.
fn compute_quad_corners(
    top: &PolarLine,
    bottom: &PolarLine,
    left: &PolarLine,
    right: &PolarLine,
) -> Option<[(f32, f32); 4]> {
    let top_left = intersect_polar_lines(top, left)?;
    let top_right = intersect_polar_lines(top, right)?;
    let bottom_right = intersect_polar_lines(bottom, right)?;
    let bottom_left = intersect_polar_lines(bottom, left)?;
    Some([top_left, top_right, bottom_right, bottom_left])
}

/// Intersection of two lines in Hough form `x * cos(theta) + y * sin(theta) = r`.
fn intersect_polar_lines(a: &PolarLine, b: &PolarLine) -> Option<(f32, f32)> {
    let theta_a = (a.angle_in_degrees as f64).to_radians();
    let theta_b = (b.angle_in_degrees as f64).to_radians();

    let (sin_a, cos_a) = theta_a.sin_cos();
    let (sin_b, cos_b) = theta_b.sin_cos();

    let denom = cos_a * sin_b - sin_a * cos_b;
    if denom.abs() < 1e-6 {
        return None;
    }

    let r_a = a.r as f64;
    let r_b = b.r as f64;

    let x = (r_a * sin_b - r_b * sin_a) / denom;
    let y = (r_b * cos_a - r_a * cos_b) / denom;

    Some((x as f32, y as f32))
}

/// Shoelace area of four ordered vertices.
fn shoelace_area(corners: &[(f32, f32); 4]) -> f32 {
    let mut area = 0.0f32;
    for i in 0..4 {
        let j = (i + 1) % 4;
        area += corners[i].0 * corners[j].1;
        area -= corners[j].0 * corners[i].1;
    }
    area.abs() / 2.0
}
