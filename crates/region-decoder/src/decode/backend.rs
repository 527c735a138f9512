//! Codec backend interface and session dispatch.
//!
//! Every supported format implements [`CodecBackend`]. A [`Session`] is the
//! tagged variant selected once at open time; it never changes format
//! afterwards.
//!
//! Sessions hold only the shared encoded bytes and header information. Native
//! decode contexts are created inside each decode call and dropped before it
//! returns, so a session is immutable and safe to share between threads.

use std::sync::Arc;

use image::RgbaImage;
use tracing::debug;

#[cfg(feature = "avif")]
use super::avif::AvifSession;
#[cfg(feature = "heif")]
use super::heif::HeifSession;
use super::jpeg::JpegSession;
use super::jxl::JxlSession;
use super::png::PngSession;
use super::resample;
use super::webp::WebpSession;
use super::{DecodeError, ImageFormat, PixelBuffer, PixelRect, RegionPlan};
use crate::options::DecoderOptions;

/// Capability set shared by all format backends.
pub(crate) trait CodecBackend {
    /// Parse the header of `bytes`. Must not decode pixel data.
    fn open(bytes: Arc<[u8]>) -> Result<Self, DecodeError>
    where
        Self: Sized;

    /// Intrinsic image dimensions.
    fn dimensions(&self) -> (u32, u32);

    /// Divisors the backend can apply while decoding. Must contain 1.
    fn native_divisors(&self) -> &'static [u32] {
        &[1]
    }

    /// Number of pixels materialized to satisfy `plan`.
    ///
    /// Defaults to the whole image at the native divisor.
    fn decoded_pixels(&self, plan: &RegionPlan) -> u64 {
        let (width, height) = self.dimensions();
        let d = plan.native_divisor;
        u64::from(width.div_ceil(d)) * u64::from(height.div_ceil(d))
    }

    /// Decode the planned source rectangle at the planned native divisor.
    fn decode_native(&self, plan: &RegionPlan) -> Result<RgbaImage, DecodeError>;

    /// Decode a planned region and scale it to the planned output.
    fn decode_region(
        &self,
        plan: &RegionPlan,
        options: &DecoderOptions,
    ) -> Result<PixelBuffer, DecodeError> {
        let budget = options.max_pixels;
        let needed = self.decoded_pixels(plan);
        if budget > 0 && needed > budget {
            debug!(needed, budget, "decode exceeds pixel budget");
            return Err(DecodeError::OutOfMemory);
        }

        let native = self.decode_native(plan)?;
        resample::finish(native, plan, options.resize_filter, options.row_alignment)
    }
}

/// An open backend, one variant per format.
pub(crate) enum Session {
    Png(PngSession),
    Jpeg(JpegSession),
    Webp(WebpSession),
    Jxl(JxlSession),
    #[cfg(feature = "avif")]
    Avif(AvifSession),
    #[cfg(feature = "heif")]
    Heif(HeifSession),
}

impl Session {
    /// Open the backend for `format`.
    ///
    /// Formats whose backend is not compiled in fail with
    /// [`DecodeError::UnsupportedFormat`].
    pub(crate) fn open(format: ImageFormat, bytes: Arc<[u8]>) -> Result<Self, DecodeError> {
        match format {
            ImageFormat::Png => PngSession::open(bytes).map(Session::Png),
            ImageFormat::Jpeg => JpegSession::open(bytes).map(Session::Jpeg),
            ImageFormat::Webp => WebpSession::open(bytes).map(Session::Webp),
            ImageFormat::Jxl => JxlSession::open(bytes).map(Session::Jxl),
            #[cfg(feature = "avif")]
            ImageFormat::Avif => AvifSession::open(bytes).map(Session::Avif),
            #[cfg(feature = "heif")]
            ImageFormat::Heif => HeifSession::open(bytes).map(Session::Heif),
            #[allow(unreachable_patterns)]
            _ => Err(DecodeError::UnsupportedFormat),
        }
    }

    pub(crate) fn backend(&self) -> &dyn CodecBackend {
        match self {
            Session::Png(s) => s,
            Session::Jpeg(s) => s,
            Session::Webp(s) => s,
            Session::Jxl(s) => s,
            #[cfg(feature = "avif")]
            Session::Avif(s) => s,
            #[cfg(feature = "heif")]
            Session::Heif(s) => s,
        }
    }
}

/// Copy `rect` out of a decoded image, avoiding the copy for a full-frame rect.
pub(crate) fn crop(image: RgbaImage, rect: PixelRect) -> RgbaImage {
    if rect == PixelRect::full(image.width(), image.height()) {
        return image;
    }
    image::imageops::crop_imm(&image, rect.x, rect.y, rect.width, rect.height).to_image()
}

/// Append 8-bit gray / gray+alpha / RGB / RGBA samples as RGBA.
pub(crate) fn push_rgba(channels: usize, src: &[u8], out: &mut Vec<u8>) -> Result<(), DecodeError> {
    match channels {
        1 => src.iter().for_each(|&l| out.extend_from_slice(&[l, l, l, 255])),
        2 => src
            .chunks_exact(2)
            .for_each(|la| out.extend_from_slice(&[la[0], la[0], la[0], la[1]])),
        3 => src
            .chunks_exact(3)
            .for_each(|rgb| out.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255])),
        4 => out.extend_from_slice(src),
        n => {
            return Err(DecodeError::UnsupportedFeature(format!(
                "{n} channels per pixel"
            )))
        }
    }
    Ok(())
}

/// Build an RGBA image, failing if the buffer does not match the dimensions.
pub(crate) fn rgba_image(width: u32, height: u32, data: Vec<u8>) -> Result<RgbaImage, DecodeError> {
    RgbaImage::from_raw(width, height, data).ok_or_else(|| {
        DecodeError::CorruptData(format!("pixel data does not match {width}x{height}"))
    })
}

/// Reserve room for `pixels` RGBA pixels, reporting allocation failure.
pub(crate) fn rgba_vec(pixels: u64) -> Result<Vec<u8>, DecodeError> {
    let len = usize::try_from(pixels.saturating_mul(4)).map_err(|_| DecodeError::OutOfMemory)?;
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| DecodeError::OutOfMemory)?;
    Ok(data)
}

/// A zero-filled byte buffer of `len`, reporting allocation failure.
pub(crate) fn zeroed_vec(len: usize) -> Result<Vec<u8>, DecodeError> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| DecodeError::OutOfMemory)?;
    data.resize(len, 0);
    Ok(data)
}
