//! Region and scale planning.
//!
//! Turns a caller request (region + sample size) into the work a backend
//! actually performs:
//!
//! - the clipped source rectangle, in intrinsic image coordinates
//! - the divisor the backend applies natively (e.g. JPEG DCT scaling)
//! - the residual factor left for the software resample pass
//! - the final output dimensions
//!
//! # Clipping policy
//!
//! - Edges past the image are clipped; negative origins clip to 0.
//! - An origin beyond the far edge, or inverted bounds, is an
//!   [`DecodeError::InvalidArgument`].
//! - A region that is empty after clipping decodes as 1x1 at its origin.
//!
//! # Sample size policy
//!
//! A sample size of 0 is treated as 1. The native divisor is the largest
//! divisor advertised by the backend that is `<= sample_size` and divides it
//! exactly, so the residual is always an integer. It is chosen from the
//! requested size before that size is lowered to fit the region, so a small
//! region at a large sample size still decodes at the coarsest native scale.
//! Output dimensions are always `ceil(region / sample_size)`.

use tracing::debug;

use super::{DecodeError, PixelRect, Region};

/// The resolved work for one decode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionPlan {
    /// Clipped source rectangle in intrinsic image coordinates.
    pub source: PixelRect,
    /// Effective sample size after coercion.
    pub sample_size: u32,
    /// Divisor applied by the backend itself.
    pub native_divisor: u32,
    pub output_width: u32,
    pub output_height: u32,
}

impl RegionPlan {
    /// Downscale left for the software pass after native decoding.
    #[inline]
    pub fn residual_factor(&self) -> u32 {
        self.sample_size / self.native_divisor
    }

    /// Map the source rectangle into a natively scaled image.
    ///
    /// `full` is the intrinsic size, `native` the size the backend actually
    /// produced. Edges are rounded outward so no source pixel is lost, and
    /// the result is never empty.
    pub fn native_rect(&self, full: (u32, u32), native: (u32, u32)) -> PixelRect {
        if full == native {
            return self.source;
        }
        let (x0, x1) = scale_span(self.source.x, self.source.right(), full.0, native.0);
        let (y0, y1) = scale_span(self.source.y, self.source.bottom(), full.1, native.1);
        PixelRect::new(x0, y0, x1 - x0, y1 - y0)
    }
}

/// Plan a decode of `region` within `bounds`, an area of the intrinsic image.
///
/// `region` is relative to the origin of `bounds`; the returned source
/// rectangle is in intrinsic coordinates. Without border cropping `bounds`
/// covers the whole image.
pub fn plan(
    bounds: PixelRect,
    region: Region,
    sample_size: u32,
    native_divisors: &[u32],
) -> Result<RegionPlan, DecodeError> {
    let clipped = clip_region(bounds.width, bounds.height, region)?;
    let source = PixelRect::new(
        bounds.x + clipped.x,
        bounds.y + clipped.y,
        clipped.width,
        clipped.height,
    );

    let requested = sample_size.max(1);
    let native_divisor = native_divisor(requested, native_divisors);
    let sample_size = effective_sample_size(requested, native_divisor, &source);

    let plan = RegionPlan {
        source,
        sample_size,
        native_divisor,
        output_width: source.width.div_ceil(sample_size),
        output_height: source.height.div_ceil(sample_size),
    };
    debug!(
        ?region,
        ?source,
        sample_size,
        native_divisor,
        output_width = plan.output_width,
        output_height = plan.output_height,
        "planned region decode"
    );
    Ok(plan)
}

/// Clip a region to a `width` x `height` image.
pub fn clip_region(width: u32, height: u32, region: Region) -> Result<PixelRect, DecodeError> {
    if width == 0 || height == 0 {
        return Err(DecodeError::InvalidArgument(
            "image has no pixels".to_string(),
        ));
    }
    if region.right < region.left || region.bottom < region.top {
        return Err(DecodeError::InvalidArgument(format!(
            "inverted region bounds {region:?}"
        )));
    }

    let (w, h) = (i64::from(width), i64::from(height));
    let left = i64::from(region.left).max(0);
    let top = i64::from(region.top).max(0);
    if left >= w || top >= h {
        return Err(DecodeError::InvalidArgument(format!(
            "region {region:?} lies outside {width}x{height} image"
        )));
    }

    let right = i64::from(region.right).min(w);
    let bottom = i64::from(region.bottom).min(h);
    // Empty after clipping: still decode one pixel at the origin.
    let clipped_w = (right - left).max(1);
    let clipped_h = (bottom - top).max(1);

    Ok(PixelRect::new(
        left as u32,
        top as u32,
        clipped_w as u32,
        clipped_h as u32,
    ))
}

/// Coerce the sample size to `1..=max(region side)`.
///
/// Anything larger than the longest side already yields a 1x1 output.
/// Lower `sample_size` to the region's longest side, rounded up to a
/// multiple of `divisor` so the residual stays integral.
fn effective_sample_size(sample_size: u32, divisor: u32, source: &PixelRect) -> u32 {
    let longest = source.width.max(source.height).max(1);
    let cap = longest.div_ceil(divisor).saturating_mul(divisor);
    sample_size.min(cap)
}

/// Largest supported divisor that is `<= sample_size` and divides it exactly.
pub fn native_divisor(sample_size: u32, supported: &[u32]) -> u32 {
    supported
        .iter()
        .copied()
        .filter(|&d| d >= 1 && d <= sample_size && sample_size % d == 0)
        .max()
        .unwrap_or(1)
}

/// Map `[start, end)` from a `full` axis onto a `native` axis, rounding outward.
fn scale_span(start: u32, end: u32, full: u32, native: u32) -> (u32, u32) {
    let full = u64::from(full.max(1));
    let native_u = u64::from(native);
    let lo = (u64::from(start) * native_u / full) as u32;
    let hi = (u64::from(end) * native_u).div_ceil(full) as u32;

    let hi = hi.min(native).max(1);
    let lo = lo.min(hi - 1);
    (lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    const JPEG_DIVISORS: &[u32] = &[1, 2, 4, 8];

    fn full(width: u32, height: u32) -> PixelRect {
        PixelRect::full(width, height)
    }

    #[test]
    fn test_plan_inside_bounds_unscaled() {
        let plan = plan(full(100, 80), Region::new(10, 20, 60, 50), 1, &[1]).unwrap();
        assert_eq!(plan.source, PixelRect::new(10, 20, 50, 30));
        assert_eq!((plan.output_width, plan.output_height), (50, 30));
        assert_eq!(plan.native_divisor, 1);
        assert_eq!(plan.residual_factor(), 1);
    }

    #[test]
    fn test_plan_output_rounds_up() {
        let plan = plan(full(100, 80), Region::new(0, 0, 33, 17), 4, &[1]).unwrap();
        assert_eq!((plan.output_width, plan.output_height), (9, 5));
    }

    #[test]
    fn test_clip_right_and_bottom() {
        let rect = clip_region(100, 80, Region::new(90, 70, 150, 120)).unwrap();
        assert_eq!(rect, PixelRect::new(90, 70, 10, 10));
    }

    #[test]
    fn test_clip_negative_origin() {
        let rect = clip_region(100, 80, Region::new(-10, -5, 20, 10)).unwrap();
        assert_eq!(rect, PixelRect::new(0, 0, 20, 10));
    }

    #[test]
    fn test_degenerate_region_is_one_pixel() {
        let rect = clip_region(100, 80, Region::new(40, 30, 40, 30)).unwrap();
        assert_eq!(rect, PixelRect::new(40, 30, 1, 1));

        let rect = clip_region(100, 80, Region::new(0, 0, 0, 0)).unwrap();
        assert_eq!(rect, PixelRect::new(0, 0, 1, 1));
    }

    #[test]
    fn test_region_before_near_edge_is_one_pixel() {
        let rect = clip_region(100, 80, Region::new(-20, -20, -10, -10)).unwrap();
        assert_eq!(rect, PixelRect::new(0, 0, 1, 1));
    }

    #[test]
    fn test_origin_outside_is_invalid() {
        assert!(matches!(
            clip_region(100, 80, Region::new(100, 0, 120, 10)),
            Err(DecodeError::InvalidArgument(_))
        ));
        assert!(matches!(
            clip_region(100, 80, Region::new(0, 80, 10, 90)),
            Err(DecodeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_inverted_region_is_invalid() {
        assert!(matches!(
            clip_region(100, 80, Region::new(50, 10, 40, 20)),
            Err(DecodeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_zero_sample_size_is_one() {
        let plan = plan(full(10, 10), Region::new(0, 0, 10, 10), 0, &[1]).unwrap();
        assert_eq!(plan.sample_size, 1);
        assert_eq!((plan.output_width, plan.output_height), (10, 10));
    }

    #[test]
    fn test_huge_sample_size_is_one_pixel() {
        let plan = plan(full(10, 6), Region::new(0, 0, 10, 6), 1 << 20, &[1]).unwrap();
        assert_eq!(plan.sample_size, 10);
        assert_eq!((plan.output_width, plan.output_height), (1, 1));
    }

    #[test]
    fn test_small_region_keeps_coarsest_native_divisor() {
        let plan = plan(full(100, 100), Region::new(10, 10, 16, 14), 8, JPEG_DIVISORS).unwrap();
        assert_eq!(plan.native_divisor, 8);
        assert_eq!(plan.sample_size, 8);
        assert_eq!((plan.output_width, plan.output_height), (1, 1));

        let plan = super::plan(full(10, 6), Region::new(0, 0, 10, 6), 1 << 20, JPEG_DIVISORS).unwrap();
        assert_eq!(plan.native_divisor, 8);
        assert_eq!(plan.sample_size, 16);
        assert_eq!(plan.residual_factor(), 2);
        assert_eq!((plan.output_width, plan.output_height), (1, 1));
    }

    #[test]
    fn test_native_divisor_rounds_down_to_exact_divisor() {
        assert_eq!(native_divisor(1, JPEG_DIVISORS), 1);
        assert_eq!(native_divisor(2, JPEG_DIVISORS), 2);
        assert_eq!(native_divisor(3, JPEG_DIVISORS), 1);
        assert_eq!(native_divisor(6, JPEG_DIVISORS), 2);
        assert_eq!(native_divisor(8, JPEG_DIVISORS), 8);
        assert_eq!(native_divisor(12, JPEG_DIVISORS), 4);
        assert_eq!(native_divisor(16, JPEG_DIVISORS), 8);
        assert_eq!(native_divisor(16, &[1]), 1);
        assert_eq!(native_divisor(16, &[]), 1);
    }

    #[test]
    fn test_plan_residual_factor() {
        let plan = plan(full(4000, 3000), Region::new(0, 0, 4000, 3000), 32, JPEG_DIVISORS).unwrap();
        assert_eq!(plan.native_divisor, 8);
        assert_eq!(plan.residual_factor(), 4);
        assert_eq!((plan.output_width, plan.output_height), (125, 94));
    }

    #[test]
    fn test_plan_inside_cropped_bounds() {
        let bounds = PixelRect::new(10, 20, 50, 40);
        let plan = plan(bounds, Region::new(5, 5, 100, 100), 1, &[1]).unwrap();
        assert_eq!(plan.source, PixelRect::new(15, 25, 45, 35));
    }

    #[test]
    fn test_native_rect_identity() {
        let plan = plan(full(100, 100), Region::new(10, 10, 20, 20), 1, &[1]).unwrap();
        assert_eq!(plan.native_rect((100, 100), (100, 100)), plan.source);
    }

    #[test]
    fn test_native_rect_half_scale_rounds_outward() {
        let plan = plan(full(101, 100), Region::new(3, 4, 10, 9), 2, JPEG_DIVISORS).unwrap();
        let rect = plan.native_rect((101, 100), (51, 50));
        assert_eq!(rect, PixelRect::new(1, 2, 5, 3));
    }

    #[test]
    fn test_native_rect_never_empty() {
        let plan = plan(full(100, 100), Region::new(99, 99, 100, 100), 8, JPEG_DIVISORS).unwrap();
        let rect = plan.native_rect((100, 100), (13, 13));
        assert!(rect.width >= 1 && rect.height >= 1);
        assert!(rect.right() <= 13 && rect.bottom() <= 13);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================
