//! JPEG XL backend built on `jxl-oxide`.
//!
//! jxl-oxide renders a cropped region directly, touching only the groups
//! that intersect it. Crop coordinates are in the coded frame, so images
//! with a non-identity orientation are rendered whole and cropped after the
//! orientation is applied.

use std::io::Cursor;
use std::sync::Arc;

use image::RgbaImage;
use jxl_oxide::{CropInfo, JxlImage, RenderResult};
use tracing::warn;

use super::backend::{self, CodecBackend};
use super::{DecodeError, PixelRect, RegionPlan};

pub(crate) struct JxlSession {
    bytes: Arc<[u8]>,
    width: u32,
    height: u32,
    orientation: u32,
}

impl JxlSession {
    fn image(&self) -> Result<JxlImage<Cursor<Arc<[u8]>>>, DecodeError> {
        JxlImage::from_reader(Cursor::new(self.bytes.clone())).map_err(DecodeError::corrupt)
    }

    fn crop_info(&self, rect: PixelRect) -> Option<CropInfo> {
        (self.orientation == 1).then_some(CropInfo {
            width: rect.width,
            height: rect.height,
            left: rect.x,
            top: rect.y,
        })
    }
}

impl CodecBackend for JxlSession {
    fn open(bytes: Arc<[u8]>) -> Result<Self, DecodeError> {
        let image = JxlImage::from_reader(Cursor::new(bytes.clone())).map_err(DecodeError::corrupt)?;
        if image.pixel_format().has_black() {
            return Err(DecodeError::UnsupportedFeature("CMYK JPEG XL".to_string()));
        }
        let (width, height) = (image.width(), image.height());
        let orientation = image.image_header().metadata.orientation;

        Ok(Self {
            bytes,
            width,
            height,
            orientation,
        })
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn decoded_pixels(&self, plan: &RegionPlan) -> u64 {
        match self.crop_info(plan.source) {
            Some(_) => plan.source.area(),
            None => u64::from(self.width) * u64::from(self.height),
        }
    }

    fn decode_native(&self, plan: &RegionPlan) -> Result<RgbaImage, DecodeError> {
        let rect = plan.source;
        let mut image = self.image()?;
        let crop = self.crop_info(rect);

        let render = match image
            .render_next_frame_cropped(crop)
            .map_err(DecodeError::corrupt)?
        {
            RenderResult::Done(render) => render,
            RenderResult::NeedMoreData => {
                return Err(DecodeError::CorruptData("JPEG XL stream ended early".into()))
            }
            RenderResult::NoMoreFrames => {
                return Err(DecodeError::CorruptData("JPEG XL stream has no frames".into()))
            }
        };

        let fb = render.image();
        let (width, height) = (fb.width() as u32, fb.height() as u32);
        let mut data = backend::rgba_vec(u64::from(width) * u64::from(height))?;
        backend::push_rgba(fb.channels(), &quantize(fb.buf()), &mut data)?;
        let frame = backend::rgba_image(width, height, data)?;

        if crop.is_some() && (width, height) == (rect.width, rect.height) {
            return Ok(frame);
        }
        if (width, height) != (self.width, self.height) {
            return Err(DecodeError::CorruptData(format!(
                "JPEG XL render is {width}x{height}, expected {}x{}",
                self.width, self.height
            )));
        }
        if crop.is_some() {
            warn!(?rect, "cropped JPEG XL render returned full frame");
        }
        Ok(backend::crop(frame, rect))
    }
}

/// Map `[0.0, 1.0]` samples to 8 bits, clamping out-of-gamut values.
fn quantize(samples: &[f32]) -> Vec<u8> {
    samples
        .iter()
        .map(|&v| (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8)
        .collect()
}
