//! Fixture builders shared by the decode tests.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat as EncodeFormat, Rgb, RgbImage, Rgba, RgbaImage};

/// An opaque RGB gradient with distinct values per column and row.
pub(crate) fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7) as u8, (y * 11) as u8, ((x + y) * 3) as u8])
    })
}

/// An RGBA gradient with varying, never fully transparent, alpha.
pub(crate) fn rgba_gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 13) as u8, (y * 5) as u8, 90, 128 + ((x + y) % 128) as u8])
    })
}

/// Solid opaque image.
pub(crate) fn flat(width: u32, height: u32, rgb: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb(rgb))
}

fn encode<I>(image: &I, format: EncodeFormat) -> Vec<u8>
where
    I: Clone + Into<DynamicImage>,
{
    let dynamic: DynamicImage = image.clone().into();
    let mut out = Cursor::new(Vec::new());
    dynamic.write_to(&mut out, format).expect("fixture encode");
    out.into_inner()
}

pub(crate) fn encode_png<I: Clone + Into<DynamicImage>>(image: &I) -> Vec<u8> {
    encode(image, EncodeFormat::Png)
}

pub(crate) fn encode_jpeg(image: &RgbImage) -> Vec<u8> {
    encode(image, EncodeFormat::Jpeg)
}

/// Lossless WebP.
pub(crate) fn encode_webp<I: Clone + Into<DynamicImage>>(image: &I) -> Vec<u8> {
    encode(image, EncodeFormat::WebP)
}

/// Bare JPEG XL codestream, 32x16 lossless RGB in four solid quadrants:
/// top-left `QUADRANT_COLORS[0]`, top-right `[1]`, bottom-left `[2]`,
/// bottom-right `[3]`.
pub(crate) const QUADRANTS_JXL: &[u8] = &[
    0xff, 0x0a, 0x03, 0x06, 0x88, 0x04, 0x08, 0x02, 0x01, 0x00, 0xac, 0x00,
    0x89, 0x92, 0x6b, 0x00, 0x80, 0xd2, 0xe8, 0xa4, 0x21, 0x56, 0x93, 0x6b,
    0x3b, 0x4c, 0x6a, 0x76, 0x69, 0x6e, 0x9e, 0x7d, 0x76, 0x00, 0x44, 0x63,
    0x5c, 0xc4, 0x9b, 0x9b, 0x9b, 0x9b, 0x19, 0x97, 0xd1, 0x10, 0x07, 0xce,
    0xe0, 0x08, 0x01, 0x62, 0x48, 0x09, 0x00,
];

/// The same coded frame tagged with orientation 6 (rotate 90 degrees
/// clockwise), so it displays as 16x32 with the coded top-left quadrant at
/// the displayed top-right.
pub(crate) const QUADRANTS_ROTATED_JXL: &[u8] = &[
    0xff, 0x0a, 0x03, 0x86, 0x05, 0x62, 0x02, 0x08, 0x02, 0x01, 0x00, 0xac,
    0x00, 0x89, 0x92, 0x6b, 0x00, 0x80, 0xd2, 0xe8, 0xa4, 0x21, 0x56, 0x93,
    0x6b, 0x3b, 0x4c, 0x6a, 0x76, 0x69, 0x6e, 0x9e, 0x7d, 0x76, 0x00, 0x44,
    0x63, 0x5c, 0xc4, 0x9b, 0x9b, 0x9b, 0x9b, 0x19, 0x97, 0xd1, 0x10, 0x07,
    0xce, 0xe0, 0x08, 0x01, 0x62, 0x48, 0x09, 0x00,
];

pub(crate) const QUADRANT_COLORS: [[u8; 4]; 4] = [
    [200, 30, 60, 255],
    [40, 180, 90, 255],
    [20, 60, 220, 255],
    [240, 220, 16, 255],
];

/// Assert every channel of two RGBA pixels is within `tolerance`.
pub(crate) fn assert_close(actual: [u8; 4], expected: [u8; 4], tolerance: u8) {
    for (a, e) in actual.iter().zip(expected) {
        assert!(
            a.abs_diff(e) <= tolerance,
            "pixel {actual:?} not within {tolerance} of {expected:?}"
        );
    }
}
