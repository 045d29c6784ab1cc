// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the scanwerk-document crate: per-frame analysis
// at preview resolution (the hot path, run on every live frame) and the
// one-off perspective crop of a capture.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};

use scanwerk_core::{Frame, Orientation, Point, Quadrilateral};
use scanwerk_document::{CaptureProcessor, ContourAnalyzer};

/// Dark background with a bright sheet covering the middle of the frame.
fn document_frame(width: u32, height: u32) -> Frame {
    let img = GrayImage::from_fn(width, height, |x, y| {
        let inside = x > width / 5 && x < width * 4 / 5 && y > height / 8 && y < height * 7 / 8;
        Luma([if inside { 235u8 } else { 35u8 }])
    });
    Frame::new(DynamicImage::ImageLuma8(img), Orientation::Deg0)
}

fn bench_analysis(c: &mut Criterion) {
    let analyzer = ContourAnalyzer::default();
    let preview = document_frame(640, 480);

    c.bench_function("analyze (640x480 preview)", |b| {
        b.iter(|| black_box(analyzer.analyze(black_box(&preview))));
    });
}

fn bench_capture_crop(c: &mut Criterion) {
    let raw = Frame::new(
        DynamicImage::ImageRgb8(RgbImage::from_fn(1600, 1200, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        })),
        Orientation::Deg90,
    );
    let quad = Quadrilateral::new([
        Point::new(0.18, 0.12),
        Point::new(0.83, 0.1),
        Point::new(0.86, 0.9),
        Point::new(0.15, 0.88),
    ]);
    let processor = CaptureProcessor::default();

    c.bench_function("perspective crop (1600x1200, 90 deg)", |b| {
        b.iter(|| black_box(processor.process_frame(black_box(&raw), Some(&quad))));
    });
}

criterion_group!(benches, bench_analysis, bench_capture_crop);
criterion_main!(benches);
