//! WebP backend using the `image` crate's decoder.
//!
//! VP8 and VP8L have no partial decode, so the frame is decoded whole and
//! the region cropped from it. Animated files yield their first frame.

use std::io::Cursor;
use std::sync::Arc;

use image::codecs::webp::WebPDecoder;
use image::{DynamicImage, ImageDecoder as _, RgbaImage};

use super::backend::{self, CodecBackend};
use super::{DecodeError, RegionPlan};

pub(crate) struct WebpSession {
    bytes: Arc<[u8]>,
    width: u32,
    height: u32,
}

impl WebpSession {
    fn decoder(&self) -> Result<WebPDecoder<Cursor<&[u8]>>, DecodeError> {
        Ok(WebPDecoder::new(Cursor::new(&self.bytes[..]))?)
    }
}

impl CodecBackend for WebpSession {
    fn open(bytes: Arc<[u8]>) -> Result<Self, DecodeError> {
        let (width, height) = WebPDecoder::new(Cursor::new(&bytes[..]))?.dimensions();
        Ok(Self {
            bytes,
            width,
            height,
        })
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn decode_native(&self, plan: &RegionPlan) -> Result<RgbaImage, DecodeError> {
        let frame = DynamicImage::from_decoder(self.decoder()?)?.into_rgba8();
        if frame.dimensions() != (self.width, self.height) {
            return Err(DecodeError::CorruptData(format!(
                "WebP frame is {:?}, header says {}x{}",
                frame.dimensions(),
                self.width,
                self.height
            )));
        }
        Ok(backend::crop(frame, plan.source))
    }
}
