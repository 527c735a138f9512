//! AVIF backend: `avif-parse` for the container, `avif-decode` (libaom) for
//! pixels.
//!
//! AV1 has no region decode here; the primary item is decoded in full and
//! the region cropped from it.

use std::io::Cursor;
use std::sync::Arc;

use avif_decode::{Decoder as AvifDecoder, Image as AvifImage};
use avif_parse::AvifData;
use image::RgbaImage;

use super::backend::{self, CodecBackend};
use super::{DecodeError, RegionPlan};

pub(crate) struct AvifSession {
    bytes: Arc<[u8]>,
    width: u32,
    height: u32,
}

impl CodecBackend for AvifSession {
    fn open(bytes: Arc<[u8]>) -> Result<Self, DecodeError> {
        let (width, height) = {
            let mut cursor = Cursor::new(&bytes[..]);
            let data = AvifData::from_reader(&mut cursor).map_err(DecodeError::corrupt)?;
            let meta = data.primary_item_metadata().map_err(DecodeError::corrupt)?;
            (meta.max_frame_width.get(), meta.max_frame_height.get())
        };

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
        let decoder = AvifDecoder::from_avif(&self.bytes).map_err(DecodeError::corrupt)?;
        let frame = to_rgba(decoder.to_image().map_err(DecodeError::corrupt)?)?;
        Ok(backend::crop(frame, plan.source))
    }
}

fn to_rgba(image: AvifImage) -> Result<RgbaImage, DecodeError> {
    let dims = |w: usize, h: usize| -> Result<(u32, u32), DecodeError> {
        let conv = |v: usize| u32::try_from(v).map_err(|_| DecodeError::OutOfMemory);
        Ok((conv(w)?, conv(h)?))
    };
    // 16-bit samples keep their high byte
    let hi = |v: u16| (v >> 8) as u8;

    let (width, height, data) = match image {
        AvifImage::Rgb8(img) => {
            let (w, h) = dims(img.width(), img.height())?;
            let mut data = backend::rgba_vec(u64::from(w) * u64::from(h))?;
            img.buf()
                .iter()
                .for_each(|px| data.extend_from_slice(&[px.r, px.g, px.b, 255]));
            (w, h, data)
        }
        AvifImage::Rgb16(img) => {
            let (w, h) = dims(img.width(), img.height())?;
            let mut data = backend::rgba_vec(u64::from(w) * u64::from(h))?;
            img.buf()
                .iter()
                .for_each(|px| data.extend_from_slice(&[hi(px.r), hi(px.g), hi(px.b), 255]));
            (w, h, data)
        }
        AvifImage::Rgba8(img) => {
            let (w, h) = dims(img.width(), img.height())?;
            let mut data = backend::rgba_vec(u64::from(w) * u64::from(h))?;
            img.buf()
                .iter()
                .for_each(|px| data.extend_from_slice(&[px.r, px.g, px.b, px.a]));
            (w, h, data)
        }
        AvifImage::Rgba16(img) => {
            let (w, h) = dims(img.width(), img.height())?;
            let mut data = backend::rgba_vec(u64::from(w) * u64::from(h))?;
            img.buf().iter().for_each(|px| {
                data.extend_from_slice(&[hi(px.r), hi(px.g), hi(px.b), hi(px.a)])
            });
            (w, h, data)
        }
        AvifImage::Gray8(img) => {
            let (w, h) = dims(img.width(), img.height())?;
            let mut data = backend::rgba_vec(u64::from(w) * u64::from(h))?;
            img.buf().iter().for_each(|px| {
                let l = px.value();
                data.extend_from_slice(&[l, l, l, 255]);
            });
            (w, h, data)
        }
        AvifImage::Gray16(img) => {
            let (w, h) = dims(img.width(), img.height())?;
            let mut data = backend::rgba_vec(u64::from(w) * u64::from(h))?;
            img.buf().iter().for_each(|px| {
                let l = hi(px.value());
                data.extend_from_slice(&[l, l, l, 255]);
            });
            (w, h, data)
        }
    };

    backend::rgba_image(width, height, data)
}
