//! Uniform border detection for scanned pages.
//!
//! A small preview is decoded, converted to luma (ITU-R BT.709), and scanned
//! inward from each edge. Rows and columns that match the border color
//! almost everywhere are trimmed. The content rectangle is then mapped back
//! to full-resolution coordinates, rounding outward.

use image::RgbaImage;
use tracing::{debug, warn};

use super::backend::CodecBackend;
use super::{plan, resample, DecodeError, PixelRect, Region};

/// Longest preview edge used for detection.
const PREVIEW_MAX_EDGE: u32 = 1024;

/// Luma at or above this counts as white.
const WHITE_THRESHOLD: u8 = 0xAA;
/// Luma at or below this counts as black.
const BLACK_THRESHOLD: u8 = 0x33;

/// A line is border when at least this share (in 1/10000) of it matches.
const LINE_MATCH_PER_10K: u64 = 9925;

const LUMA_R: f32 = 0.2126;
const LUMA_G: f32 = 0.7152;
const LUMA_B: f32 = 0.0722;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BorderColor {
    White,
    Black,
}

impl BorderColor {
    fn of(luma: u8) -> Option<Self> {
        if luma >= WHITE_THRESHOLD {
            Some(BorderColor::White)
        } else if luma <= BLACK_THRESHOLD {
            Some(BorderColor::Black)
        } else {
            None
        }
    }

    fn matches(self, luma: u8) -> bool {
        match self {
            BorderColor::White => luma >= WHITE_THRESHOLD,
            BorderColor::Black => luma <= BLACK_THRESHOLD,
        }
    }
}

#[inline]
fn luma(px: &image::Rgba<u8>) -> u8 {
    let [r, g, b, _] = px.0;
    let l = LUMA_R * f32::from(r) + LUMA_G * f32::from(g) + LUMA_B * f32::from(b);
    l.clamp(0.0, 255.0).round() as u8
}

/// Detect the content rectangle of the image behind `backend`.
///
/// Returns the full image when no uniform border is found, when the whole
/// image is border, or when the preview would exceed `max_pixels`
/// (0 = unlimited).
pub(crate) fn detect(backend: &dyn CodecBackend, max_pixels: u64) -> Result<PixelRect, DecodeError> {
    let (width, height) = backend.dimensions();
    let full = PixelRect::full(width, height);

    let longest = width.max(height);
    let mut sample_size = 1;
    while longest.div_ceil(sample_size) > PREVIEW_MAX_EDGE {
        sample_size *= 2;
    }

    let plan = plan::plan(
        full,
        Region::full(width, height),
        sample_size,
        backend.native_divisors(),
    )?;
    let needed = backend.decoded_pixels(&plan);
    if max_pixels > 0 && needed > max_pixels {
        warn!(needed, max_pixels, "skipping border detection, preview exceeds pixel budget");
        return Ok(full);
    }
    let native = backend.decode_native(&plan)?;
    let preview = resample::box_downsample(&native, plan.residual_factor());

    let content = match find_content(&preview) {
        Some(rect) => map_to_full(rect, preview.dimensions(), (width, height)),
        None => full,
    };
    debug!(?content, width, height, sample_size, "border detection");
    Ok(content)
}

/// Find the content rectangle inside uniform borders of `image`.
///
/// Returns `None` when the corner is neither white nor black, when there is
/// no border to trim, or when every line is border.
pub fn find_content(image: &RgbaImage) -> Option<PixelRect> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return None;
    }
    let color = BorderColor::of(luma(image.get_pixel(0, 0)))?;

    let row_is_border = |y: u32, x0: u32, x1: u32| {
        is_border_line((x0..x1).map(|x| luma(image.get_pixel(x, y))), color)
    };
    let col_is_border = |x: u32, y0: u32, y1: u32| {
        is_border_line((y0..y1).map(|y| luma(image.get_pixel(x, y))), color)
    };

    let top = (0..height).find(|&y| !row_is_border(y, 0, width))?;
    let bottom = (top..height)
        .rev()
        .find(|&y| !row_is_border(y, 0, width))
        .map_or(height, |y| y + 1);
    let left = (0..width)
        .find(|&x| !col_is_border(x, top, bottom))
        .unwrap_or(0);
    let right = (left..width)
        .rev()
        .find(|&x| !col_is_border(x, top, bottom))
        .map_or(width, |x| x + 1);

    let rect = PixelRect::new(left, top, right - left, bottom - top);
    (rect != PixelRect::full(width, height)).then_some(rect)
}

fn is_border_line(lumas: impl ExactSizeIterator<Item = u8>, color: BorderColor) -> bool {
    let len = lumas.len() as u64;
    let matching = lumas.filter(|&l| color.matches(l)).count() as u64;
    matching * 10_000 >= len * LINE_MATCH_PER_10K
}

/// Scale a rectangle found in a `preview`-sized image up to `full` size.
fn map_to_full(rect: PixelRect, preview: (u32, u32), full: (u32, u32)) -> PixelRect {
    let span = |start: u32, end: u32, preview: u32, full: u32| {
        let (p, f) = (u64::from(preview.max(1)), u64::from(full));
        let lo = (u64::from(start) * f / p) as u32;
        let hi = ((u64::from(end) * f).div_ceil(p) as u32).min(full);
        (lo, hi.max(lo + 1))
    };
    let (x0, x1) = span(rect.x, rect.right(), preview.0, full.0);
    let (y0, y1) = span(rect.y, rect.bottom(), preview.1, full.1);
    PixelRect::new(x0, y0, x1 - x0, y1 - y0)
}
