// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image normaliser: decode, bound the width, and re-encode as PNG (when the
// source carries transparency) or JPEG (everything else). Operates on
// in-memory images using the `image` crate.

use std::io::Cursor;

use bionic_core::{BionicError, ImageKind, ImageRef, ImageSettings, NormalizedImage, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use tracing::{debug, instrument};

/// Turns raw embedded image bytes into a bounded-size, web-safe payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageNormalizer {
    settings: ImageSettings,
}

impl ImageNormalizer {
    pub fn new(settings: ImageSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> ImageSettings {
        self.settings
    }

    /// Normalise one image.
    ///
    /// Fails with [`BionicError::ImageDecode`] when the bytes are not a
    /// decodable image or re-encoding fails.
    #[instrument(skip(self, data), fields(id = %id, data_len = data.len()))]
    pub fn normalize(&self, id: &ImageRef, data: &[u8]) -> Result<NormalizedImage> {
        let image = image::load_from_memory(data).map_err(|err| decode_error(id, err))?;
        let kind = target_kind(&image, image::guess_format(data).ok());
        debug!(
            width = image.width(),
            height = image.height(),
            color = ?image.color(),
            ?kind,
            "Image decoded"
        );

        let image = downscale(image, self.settings.max_width);
        let bytes = match kind {
            ImageKind::Png => encode_png(&image),
            ImageKind::Jpeg => encode_jpeg(&image, self.settings.jpeg_quality),
        }
        .map_err(|err| decode_error(id, err))?;

        debug!(
            width = image.width(),
            height = image.height(),
            output_bytes = bytes.len(),
            "Image normalised"
        );

        Ok(NormalizedImage {
            bytes,
            kind,
            width: image.width(),
            height: image.height(),
        })
    }
}

/// Transparent sources stay PNG; everything else becomes an opaque JPEG.
///
/// Palette formats always decode to RGBA, so for those only a pixel that is
/// not fully opaque counts as transparency.
fn target_kind(image: &DynamicImage, format: Option<ImageFormat>) -> ImageKind {
    let transparent = match format {
        Some(ImageFormat::Gif | ImageFormat::Ico) => {
            image.color().has_alpha() && image.to_rgba8().pixels().any(|p| p.0[3] < u8::MAX)
        }
        _ => image.color().has_alpha(),
    };
    if transparent {
        ImageKind::Png
    } else {
        ImageKind::Jpeg
    }
}

/// Scale down to `max_width` preserving aspect ratio with Lanczos3. Never
/// upscales.
fn downscale(image: DynamicImage, max_width: u32) -> DynamicImage {
    let (width, height) = (image.width(), image.height());
    if width <= max_width {
        return image;
    }
    let new_height = ((u64::from(height) * u64::from(max_width)) / u64::from(width)).max(1) as u32;
    debug!(
        from_w = width,
        from_h = height,
        to_w = max_width,
        to_h = new_height,
        "Downscaling image"
    );
    image.resize_exact(max_width, new_height, FilterType::Lanczos3)
}

fn encode_png(image: &DynamicImage) -> std::result::Result<Vec<u8>, image::ImageError> {
    let mut buffer = Vec::new();
    let encoder = PngEncoder::new_with_quality(
        Cursor::new(&mut buffer),
        CompressionType::Best,
        PngFilter::Adaptive,
    );
    image.to_rgba8().write_with_encoder(encoder)?;
    Ok(buffer)
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> std::result::Result<Vec<u8>, image::ImageError> {
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    image.to_rgb8().write_with_encoder(encoder)?;
    Ok(buffer)
}

fn decode_error(id: &ImageRef, err: image::ImageError) -> BionicError {
    BionicError::ImageDecode {
        id: id.to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn encoded(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buffer = Vec::new();
        image.write_to(&mut Cursor::new(&mut buffer), format).unwrap();
        buffer
    }

    pub(crate) fn png_bytes(image: DynamicImage) -> Vec<u8> {
        encoded(image, ImageFormat::Png)
    }

    pub(crate) fn opaque_png(width: u32, height: u32) -> Vec<u8> {
        png_bytes(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            Rgb([200, 40, 40]),
        )))
    }

    fn transparent_png(width: u32, height: u32) -> Vec<u8> {
        png_bytes(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([0, 120, 255, 128]),
        )))
    }

    fn id() -> ImageRef {
        ImageRef::new("rId1")
    }

    #[test]
    fn opaque_source_becomes_jpeg() {
        let out = ImageNormalizer::default()
            .normalize(&id(), &opaque_png(64, 32))
            .unwrap();
        assert_eq!(out.kind, ImageKind::Jpeg);
        assert_eq!((out.width, out.height), (64, 32));
        assert_eq!(&out.bytes[..2], &[0xFFu8, 0xD8]);
    }

    #[test]
    fn transparent_source_stays_png() {
        let out = ImageNormalizer::default()
            .normalize(&id(), &transparent_png(40, 40))
            .unwrap();
        assert_eq!(out.kind, ImageKind::Png);
        assert_eq!(&out.bytes[1..4], b"PNG");
    }

    #[test]
    fn opaque_gif_becomes_jpeg() {
        let gif = encoded(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([30, 90, 160]))),
            ImageFormat::Gif,
        );
        assert_eq!(image::guess_format(&gif).unwrap(), ImageFormat::Gif);
        let out = ImageNormalizer::default().normalize(&id(), &gif).unwrap();
        assert_eq!(out.kind, ImageKind::Jpeg);
        assert_eq!((out.width, out.height), (8, 8));
    }

    #[test]
    fn gif_with_transparent_pixels_stays_png() {
        let mut frame = RgbaImage::from_pixel(8, 8, Rgba([30, 90, 160, 255]));
        for x in 0..8 {
            frame.put_pixel(x, 0, Rgba([0, 0, 0, 0]));
        }
        let gif = encoded(DynamicImage::ImageRgba8(frame), ImageFormat::Gif);
        let out = ImageNormalizer::default().normalize(&id(), &gif).unwrap();
        assert_eq!(out.kind, ImageKind::Png);
    }

    #[test]
    fn wide_image_is_scaled_to_max_width() {
        let out = ImageNormalizer::default()
            .normalize(&id(), &opaque_png(2400, 600))
            .unwrap();
        assert_eq!(out.width, 1200);
        assert_eq!(out.height, 300);

        let odd = ImageNormalizer::default()
            .normalize(&id(), &opaque_png(1999, 1000))
            .unwrap();
        assert_eq!(odd.width, 1200);
        let expected = 1000.0 * 1200.0 / 1999.0;
        assert!((f64::from(odd.height) - expected).abs() <= 1.0);
    }

    #[test]
    fn small_image_is_never_upscaled() {
        let out = ImageNormalizer::default()
            .normalize(&id(), &opaque_png(1200, 50))
            .unwrap();
        assert_eq!((out.width, out.height), (1200, 50));

        let tiny = ImageNormalizer::default()
            .normalize(&id(), &opaque_png(3, 2))
            .unwrap();
        assert_eq!((tiny.width, tiny.height), (3, 2));
    }

    #[test]
    fn renormalising_is_stable() {
        let normalizer = ImageNormalizer::default();
        let first = normalizer.normalize(&id(), &opaque_png(900, 450)).unwrap();
        let second = normalizer.normalize(&id(), &first.bytes).unwrap();
        assert_eq!(second.kind, ImageKind::Jpeg);
        assert_eq!((second.width, second.height), (first.width, first.height));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = ImageNormalizer::default()
            .normalize(&id(), b"definitely not an image")
            .unwrap_err();
        match err {
            BionicError::ImageDecode { id, .. } => assert_eq!(id, "rId1"),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn custom_width_limit() {
        let normalizer = ImageNormalizer::new(ImageSettings {
            max_width: 100,
            jpeg_quality: 90,
        });
        let out = normalizer.normalize(&id(), &opaque_png(400, 200)).unwrap();
        assert_eq!((out.width, out.height), (100, 50));
    }
}
