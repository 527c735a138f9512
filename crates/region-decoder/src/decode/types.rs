//! Core types for region decoding.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for image decoding operations.
///
/// Backend-specific errors (png, jpeg-decoder, jxl-oxide, ...) are translated
/// into these variants before they leave the crate.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The format was not recognized, or its backend is not compiled in.
    #[error("Invalid or unsupported image format")]
    UnsupportedFormat,

    /// The stream is structurally invalid or truncated.
    #[error("Corrupted or incomplete image data: {0}")]
    CorruptData(String),

    /// The stream is valid but uses a feature this decoder cannot handle.
    #[error("Unsupported image feature: {0}")]
    UnsupportedFeature(String),

    /// Out of memory during decoding, or the configured pixel budget was exceeded.
    #[error("Out of memory during decoding")]
    OutOfMemory,

    /// The caller passed arguments that cannot be salvaged by clipping.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O error while reading the encoded stream.
    #[error("I/O error: {0}")]
    Io(String),
}

impl DecodeError {
    pub(crate) fn corrupt(err: impl fmt::Display) -> Self {
        DecodeError::CorruptData(err.to_string())
    }

    pub(crate) fn unsupported(err: impl fmt::Display) -> Self {
        DecodeError::UnsupportedFeature(err.to_string())
    }
}

impl From<image::ImageError> for DecodeError {
    fn from(err: image::ImageError) -> Self {
        use image::ImageError;

        match err {
            ImageError::Unsupported(e) => DecodeError::UnsupportedFeature(e.to_string()),
            ImageError::Limits(_) => DecodeError::OutOfMemory,
            ImageError::IoError(e) => DecodeError::CorruptData(e.to_string()),
            other => DecodeError::CorruptData(other.to_string()),
        }
    }
}

/// Filter type for the residual software resize.
///
/// Only used when the residual scale is not an exact integer box; integer
/// residuals always use box averaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterType {
    /// Nearest neighbor interpolation (fastest, lowest quality).
    Nearest,
    /// Bilinear interpolation (fast, acceptable quality).
    #[default]
    Bilinear,
    /// Lanczos3 interpolation (slower, highest quality).
    Lanczos3,
}

impl FilterType {
    /// Convert to the image crate's FilterType.
    pub fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            FilterType::Nearest => image::imageops::FilterType::Nearest,
            FilterType::Bilinear => image::imageops::FilterType::Triangle,
            FilterType::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

/// Encoded image formats understood by the sniffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Heif,
    Avif,
    Jxl,
    Webp,
}

impl ImageFormat {
    /// Short lowercase name, as used in file extensions.
    pub fn name(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Heif => "heif",
            ImageFormat::Avif => "avif",
            ImageFormat::Jxl => "jxl",
            ImageFormat::Webp => "webp",
        }
    }

    /// Whether a backend for this format is compiled into the crate.
    pub fn is_enabled(self) -> bool {
        match self {
            ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Jxl | ImageFormat::Webp => true,
            ImageFormat::Avif => cfg!(feature = "avif"),
            ImageFormat::Heif => cfg!(feature = "heif"),
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of probing an encoded stream without opening it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageType {
    pub format: ImageFormat,
    /// Hint from the container header; animation itself is never decoded.
    pub is_animated: bool,
}

/// A caller-requested rectangle in source coordinates.
///
/// Edges are exclusive on the right/bottom side. Coordinates are signed so
/// that out-of-range requests can be expressed and clipped rather than
/// rejected at the type level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Region {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Region {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Create a region from an origin and a size.
    pub fn with_size(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self::new(
            left,
            top,
            left.saturating_add(width),
            top.saturating_add(height),
        )
    }

    /// Region covering a whole `width` x `height` image.
    pub fn full(width: u32, height: u32) -> Self {
        let clamp = |v: u32| i32::try_from(v).unwrap_or(i32::MAX);
        Self::new(0, 0, clamp(width), clamp(height))
    }

    pub fn width(&self) -> i64 {
        i64::from(self.right) - i64::from(self.left)
    }

    pub fn height(&self) -> i64 {
        i64::from(self.bottom) - i64::from(self.top)
    }
}

/// A validated, non-empty pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle covering a whole image.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    #[inline]
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Total number of pixels covered.
    #[inline]
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}
