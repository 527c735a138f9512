//! The `ImageDecoder` handle.

use std::fmt;
use std::io::Read;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::decode::backend::Session;
use crate::decode::{
    borders, find_type, plan, sniff, DecodeError, ImageFormat, ImageType, PixelBuffer, PixelRect,
    Region,
};
use crate::options::DecoderOptions;

/// Encoded input owned by a decoder, tagged with its sniffed format.
struct EncodedImage {
    bytes: Arc<[u8]>,
    format: ImageFormat,
}

/// An open image that can decode any region at any sample size.
///
/// Opening parses only the header (plus a small preview when border
/// cropping is enabled). Every [`decode_region`](Self::decode_region) call
/// creates its own native decoder, so calls are independent, idempotent and
/// may run concurrently from several threads.
///
/// Dropping the decoder (or calling [`close`](Self::close)) releases the
/// encoded bytes; buffers it returned stay valid.
pub struct ImageDecoder {
    image: EncodedImage,
    session: Session,
    bounds: PixelRect,
    options: DecoderOptions,
}

impl ImageDecoder {
    /// Open an encoded image with default options.
    ///
    /// # Errors
    ///
    /// - `UnsupportedFormat` if the format is unknown or its backend is not
    ///   compiled in
    /// - `CorruptData` if the header is truncated or invalid
    /// - `UnsupportedFeature` if the stream uses features the backend lacks
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Result<Self, DecodeError> {
        Self::with_options(bytes, DecoderOptions::default())
    }

    /// Open an encoded image.
    pub fn with_options(
        bytes: impl Into<Arc<[u8]>>,
        options: DecoderOptions,
    ) -> Result<Self, DecodeError> {
        options.validate()?;
        let bytes = bytes.into();

        let format = match sniff::detect(&bytes) {
            Some(format) => format,
            None if sniff::is_truncated_signature(&bytes) => {
                return Err(DecodeError::CorruptData(
                    "truncated image signature".to_string(),
                ))
            }
            None => return Err(DecodeError::UnsupportedFormat),
        };

        let session = Session::open(format, bytes.clone())?;
        let (width, height) = session.backend().dimensions();
        if width == 0 || height == 0 {
            return Err(DecodeError::CorruptData(format!(
                "{format} header declares {width}x{height} image"
            )));
        }

        let bounds = if options.crop_borders {
            borders::detect(session.backend(), options.max_pixels)?
        } else {
            PixelRect::full(width, height)
        };
        debug!(%format, width, height, ?bounds, "opened image");

        Ok(Self {
            image: EncodedImage { bytes, format },
            session,
            bounds,
            options,
        })
    }

    /// Read `reader` to the end and open the result.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::Io` if reading fails, otherwise as
    /// [`with_options`](Self::with_options).
    pub fn from_reader<R: Read>(mut reader: R, options: DecoderOptions) -> Result<Self, DecodeError> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| DecodeError::Io(e.to_string()))?;
        Self::with_options(bytes, options)
    }

    /// Width of the decodable image (inside borders when cropping).
    pub fn width(&self) -> u32 {
        self.bounds.width
    }

    /// Height of the decodable image (inside borders when cropping).
    pub fn height(&self) -> u32 {
        self.bounds.height
    }

    pub fn format(&self) -> ImageFormat {
        self.image.format
    }

    /// Format and animation hint of the underlying stream.
    pub fn image_type(&self) -> ImageType {
        find_type(&self.image.bytes).unwrap_or(ImageType {
            format: self.image.format,
            is_animated: false,
        })
    }

    /// The decodable area in intrinsic image coordinates.
    ///
    /// Covers the whole image unless border cropping found a border.
    pub fn bounds(&self) -> PixelRect {
        self.bounds
    }

    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    /// Decode `region` downscaled by `sample_size`.
    ///
    /// The region is clipped to the image; see [`plan::plan`] for the
    /// clipping and sample size rules. The output is
    /// `ceil(region / sample_size)` in each dimension.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for inverted regions or an origin past the far edge
    /// - `CorruptData` if the stream turns out to be damaged
    /// - `OutOfMemory` if allocation fails or `max_pixels` would be exceeded
    pub fn decode_region(&self, region: Region, sample_size: u32) -> Result<PixelBuffer, DecodeError> {
        let backend = self.session.backend();
        let plan = plan::plan(self.bounds, region, sample_size, backend.native_divisors())?;
        backend.decode_region(&plan, &self.options)
    }

    /// Decode the whole image downscaled by `sample_size`.
    pub fn decode(&self, sample_size: u32) -> Result<PixelBuffer, DecodeError> {
        self.decode_region(Region::full(self.width(), self.height()), sample_size)
    }

    /// Release the decoder. Equivalent to dropping it.
    pub fn close(self) {
        trace!(format = %self.image.format, "closing image");
    }
}

impl fmt::Debug for ImageDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageDecoder")
            .field("format", &self.image.format)
            .field("len", &self.image.bytes.len())
            .field("bounds", &self.bounds)
            .field("options", &self.options)
            .finish()
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
