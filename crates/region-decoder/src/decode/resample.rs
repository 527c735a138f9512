//! Software scaling that completes a plan after native decoding.
//!
//! Backends return the planned region at their native divisor. Whatever
//! scaling remains is done here:
//!
//! - exact integer residuals use box averaging (partial edge blocks average
//!   over the pixels they actually cover)
//! - anything else (e.g. a native crop rounded outward) is resized to the
//!   exact output size with the configured filter
//!
//! All functions return new images without modifying the input.

use image::RgbaImage;
use tracing::trace;

use super::{DecodeError, FilterType, PixelBuffer, RegionPlan};

/// Scale natively decoded pixels to the planned output and pack them.
///
/// # Arguments
///
/// * `native` - The planned source region at the backend's native divisor
/// * `plan` - The plan the backend decoded
/// * `filter` - Filter for non-integral residual resizes
/// * `row_alignment` - Row alignment of the returned buffer
pub fn finish(
    native: RgbaImage,
    plan: &RegionPlan,
    filter: FilterType,
    row_alignment: usize,
) -> Result<PixelBuffer, DecodeError> {
    let scaled = scale_to(native, plan, filter)?;
    PixelBuffer::from_rgba_image(&scaled, row_alignment)
}

fn scale_to(
    native: RgbaImage,
    plan: &RegionPlan,
    filter: FilterType,
) -> Result<RgbaImage, DecodeError> {
    let target = (plan.output_width, plan.output_height);
    let (width, height) = native.dimensions();

    // Fast path: backend already produced the output size
    if (width, height) == target {
        return Ok(native);
    }

    let factor = plan.residual_factor();
    if factor > 1 && (width.div_ceil(factor), height.div_ceil(factor)) == target {
        trace!(factor, width, height, "box downsample");
        return Ok(box_downsample(&native, factor));
    }

    trace!(?filter, width, height, ?target, "filtered resize");
    resize(&native, target.0, target.1, filter)
}

/// Resize an image to exact dimensions.
///
/// # Errors
///
/// Returns `DecodeError::InvalidArgument` if either target dimension is zero.
pub fn resize(
    image: &RgbaImage,
    width: u32,
    height: u32,
    filter: FilterType,
) -> Result<RgbaImage, DecodeError> {
    if width == 0 || height == 0 {
        return Err(DecodeError::InvalidArgument(format!(
            "cannot resize to {width}x{height}"
        )));
    }

    if image.dimensions() == (width, height) {
        return Ok(image.clone());
    }

    Ok(image::imageops::resize(
        image,
        width,
        height,
        filter.to_image_filter(),
    ))
}

/// Average each `factor` x `factor` block into one pixel.
///
/// The output is `ceil(width / factor)` x `ceil(height / factor)`; blocks on
/// the right and bottom edges may be partial.
pub fn box_downsample(image: &RgbaImage, factor: u32) -> RgbaImage {
    if factor <= 1 {
        return image.clone();
    }

    let (src_width, src_height) = image.dimensions();
    let out_width = src_width.div_ceil(factor);
    let out_height = src_height.div_ceil(factor);
    let raw = image.as_raw();
    let row_len = src_width as usize * 4;

    let mut output = Vec::with_capacity(out_width as usize * out_height as usize * 4);
    for by in 0..out_height {
        let y0 = by * factor;
        let y1 = (y0 + factor).min(src_height);

        for bx in 0..out_width {
            let x0 = bx * factor;
            let x1 = (x0 + factor).min(src_width);

            let mut acc = [0u64; 4];
            for y in y0..y1 {
                let row = &raw[y as usize * row_len..(y as usize + 1) * row_len];
                for px in row[x0 as usize * 4..x1 as usize * 4].chunks_exact(4) {
                    for (sum, &v) in acc.iter_mut().zip(px) {
                        *sum += u64::from(v);
                    }
                }
            }

            let count = block_area(x1 - x0, y1 - y0);
            for sum in acc {
                output.push(((sum + count / 2) / count) as u8);
            }
        }
    }

    RgbaImage::from_raw(out_width, out_height, output)
        .unwrap_or_else(|| RgbaImage::new(out_width, out_height))
}

/// Pixel count of a `width` x `height` block, which may exceed `u32`.
#[inline]
fn block_area(width: u32, height: u32) -> u64 {
    u64::from(width) * u64::from(height)
}
