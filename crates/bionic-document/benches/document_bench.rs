// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the bionic-document crate: word emphasis over a
// paragraph of prose, and normalisation of an oversized image.

use std::io::Cursor;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use bionic_core::{BoldRatio, ImageRef, ImageSettings};
use bionic_document::{ImageNormalizer, emphasize};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Emphasis over roughly a page of text.
fn bench_emphasis(c: &mut Criterion) {
    let text = "Reading is faster when the eye can anchor on the start of each word. "
        .repeat(40);
    let ratio = BoldRatio::default();

    c.bench_function("emphasize (page of prose)", |b| {
        b.iter(|| black_box(emphasize(black_box(&text), ratio)));
    });
}

/// Downscale and JPEG-encode a 2400x1600 gradient.
fn bench_normalize(c: &mut Criterion) {
    let img = RgbImage::from_fn(2400, 1600, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
    let mut png = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut png, ImageFormat::Png)
        .unwrap();
    let png = png.into_inner();
    let normalizer = ImageNormalizer::new(ImageSettings::default());
    let id = ImageRef::new("bench");

    c.bench_function("normalize (2400x1600 -> 1200 wide)", |b| {
        b.iter(|| black_box(normalizer.normalize(&id, black_box(&png)).unwrap()));
    });
}

criterion_group!(benches, bench_emphasis, bench_normalize);
criterion_main!(benches);
