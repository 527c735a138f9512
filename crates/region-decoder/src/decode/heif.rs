//! HEIF/HEIC backend through `libheif-rs`.
//!
//! libheif decodes the primary image whole (tiles included), with the
//! container's rotation and mirroring already applied. The region is cropped
//! from the interleaved RGBA plane.

use std::sync::Arc;

use image::RgbaImage;
use libheif_rs::{ColorSpace, HeifContext, HeifError, HeifErrorCode, LibHeif, RgbChroma};

use super::backend::{self, CodecBackend};
use super::{DecodeError, RegionPlan};

pub(crate) struct HeifSession {
    bytes: Arc<[u8]>,
    width: u32,
    height: u32,
}

impl CodecBackend for HeifSession {
    fn open(bytes: Arc<[u8]>) -> Result<Self, DecodeError> {
        let (width, height) = {
            let ctx = HeifContext::read_from_bytes(&bytes).map_err(map_heif_error)?;
            let handle = ctx.primary_image_handle().map_err(map_heif_error)?;
            (handle.width(), handle.height())
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
        let lib = LibHeif::new();
        let ctx = HeifContext::read_from_bytes(&self.bytes).map_err(map_heif_error)?;
        let handle = ctx.primary_image_handle().map_err(map_heif_error)?;
        let image = lib
            .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgba), None)
            .map_err(map_heif_error)?;

        let planes = image.planes();
        let plane = planes
            .interleaved
            .ok_or_else(|| DecodeError::CorruptData("HEIF image has no interleaved plane".into()))?;

        let row_bytes = plane.width as usize * 4;
        let mut data = backend::rgba_vec(u64::from(plane.width) * u64::from(plane.height))?;
        for row in plane.data.chunks(plane.stride).take(plane.height as usize) {
            let row = row
                .get(..row_bytes)
                .ok_or_else(|| DecodeError::CorruptData("short HEIF row".into()))?;
            data.extend_from_slice(row);
        }

        let frame = backend::rgba_image(plane.width, plane.height, data)?;
        Ok(backend::crop(frame, plan.source))
    }
}

fn map_heif_error(err: HeifError) -> DecodeError {
    match err.code {
        HeifErrorCode::MemoryAllocationError => DecodeError::OutOfMemory,
        HeifErrorCode::UnsupportedFeature | HeifErrorCode::UnsupportedFiletype => {
            DecodeError::unsupported(err.message)
        }
        _ => DecodeError::corrupt(err.message),
    }
}
