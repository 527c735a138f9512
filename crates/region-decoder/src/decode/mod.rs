//! Region decoding pipeline.
//!
//! This module provides functionality for:
//! - Detecting the image format from leading bytes
//! - Planning a region decode (clipping, sample size, native divisor)
//! - Decoding PNG, JPEG, WEBP, JPEG-XL, AVIF and HEIF regions
//! - Scaling natively decoded pixels to the requested output
//! - Detecting uniform page borders
//!
//! # Architecture
//!
//! A decode call flows through three stages:
//!
//! 1. [`plan::plan`] turns the caller's region and sample size into a
//!    [`RegionPlan`]: the clipped source rectangle, the divisor the backend
//!    applies natively, and the output dimensions.
//! 2. The format backend decodes the planned rectangle at its native
//!    divisor. JPEG scales in the DCT domain, PNG stops reading after the
//!    region's last row, JPEG-XL renders only the cropped region.
//! 3. [`resample`] applies whatever scaling is left and packs the result
//!    into a [`PixelBuffer`].
//!
//! All operations are synchronous; backends keep no decode state between
//! calls.
//!
//! # Performance Strategy
//!
//! Prefer power-of-two sample sizes on JPEG input: 2, 4 and 8 are handled
//! entirely by the decoder, larger powers leave an integer residual that is
//! box-averaged.

pub(crate) mod backend;
pub(crate) mod borders;
mod buffer;
mod jpeg;
mod jxl;
pub mod plan;
mod png;
pub mod resample;
pub mod sniff;
mod types;
mod webp;

#[cfg(feature = "avif")]
mod avif;
#[cfg(feature = "heif")]
mod heif;

#[cfg(test)]
pub(crate) mod test_support;

pub use borders::find_content;
pub use buffer::{PixelBuffer, PixelFormat};
pub use plan::RegionPlan;
pub use sniff::{detect, find_type, SNIFF_PREFIX_LEN};
pub use types::{DecodeError, FilterType, ImageFormat, ImageType, PixelRect, Region};
