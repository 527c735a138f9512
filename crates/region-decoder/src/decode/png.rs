//! PNG backend built on the `png` crate.
//!
//! Non-interlaced images are decoded row by row: rows above the region are
//! inflated and discarded, rows below it are never read. Interlaced (Adam7)
//! images need every pass, so they are decoded in full and cropped.

use std::io::Cursor;
use std::sync::Arc;

use image::RgbaImage;
use png::{BitDepth, ColorType, Transformations};
use tracing::warn;

use super::backend::{self, CodecBackend};
use super::{DecodeError, RegionPlan};

pub(crate) struct PngSession {
    bytes: Arc<[u8]>,
    width: u32,
    height: u32,
    interlaced: bool,
}

impl PngSession {
    fn reader(&self) -> Result<png::Reader<Cursor<&[u8]>>, DecodeError> {
        let mut decoder = png::Decoder::new(Cursor::new(&self.bytes[..]));
        // Palette, low bit depth and tRNS expand to 8-bit gray/RGB(A)
        decoder.set_transformations(Transformations::EXPAND | Transformations::STRIP_16);
        decoder.read_info().map_err(map_png_error)
    }
}

impl CodecBackend for PngSession {
    fn open(bytes: Arc<[u8]>) -> Result<Self, DecodeError> {
        let (width, height, interlaced) = {
            let decoder = png::Decoder::new(Cursor::new(&bytes[..]));
            let reader = decoder.read_info().map_err(map_png_error)?;
            let info = reader.info();
            (info.width, info.height, info.interlaced)
        };

        Ok(Self {
            bytes,
            width,
            height,
            interlaced,
        })
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn decoded_pixels(&self, plan: &RegionPlan) -> u64 {
        if self.interlaced {
            u64::from(self.width) * u64::from(self.height)
        } else {
            plan.source.area()
        }
    }

    fn decode_native(&self, plan: &RegionPlan) -> Result<RgbaImage, DecodeError> {
        let mut reader = self.reader()?;
        let channels = output_channels(reader.output_color_type())?;
        let rect = plan.source;
        let (x0, x1) = (rect.x as usize * channels, rect.right() as usize * channels);

        let mut data = backend::rgba_vec(rect.area())?;

        if self.interlaced {
            warn!("interlaced PNG, decoding full frame for region");
            let mut frame = backend::zeroed_vec(reader.output_buffer_size())?;
            let info = reader.next_frame(&mut frame).map_err(map_png_error)?;
            for row in frame
                .chunks_exact(info.line_size)
                .skip(rect.y as usize)
                .take(rect.height as usize)
            {
                backend::push_rgba(channels, &row[x0..x1], &mut data)?;
            }
        } else {
            for y in 0..rect.bottom() {
                let row = reader
                    .next_row()
                    .map_err(map_png_error)?
                    .ok_or_else(|| DecodeError::CorruptData("image data ended early".into()))?;
                if y < rect.y {
                    continue;
                }
                let row = row
                    .data()
                    .get(x0..x1)
                    .ok_or_else(|| DecodeError::CorruptData("short PNG row".into()))?;
                backend::push_rgba(channels, row, &mut data)?;
            }
        }

        backend::rgba_image(rect.width, rect.height, data)
    }
}

fn output_channels((color, depth): (ColorType, BitDepth)) -> Result<usize, DecodeError> {
    if depth != BitDepth::Eight {
        return Err(DecodeError::unsupported(format_args!(
            "PNG output bit depth {depth:?}"
        )));
    }
    match color {
        ColorType::Grayscale => Ok(1),
        ColorType::GrayscaleAlpha => Ok(2),
        ColorType::Rgb => Ok(3),
        ColorType::Rgba => Ok(4),
        ColorType::Indexed => Err(DecodeError::UnsupportedFeature(
            "unexpanded PNG palette".to_string(),
        )),
    }
}

fn map_png_error(err: png::DecodingError) -> DecodeError {
    match err {
        png::DecodingError::LimitsExceeded => DecodeError::OutOfMemory,
        other => DecodeError::corrupt(other),
    }
}
