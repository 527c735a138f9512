//! JPEG backend built on `jpeg-decoder`.
//!
//! The decoder can scale in the DCT domain by 1/2, 1/4 and 1/8, which is
//! much cheaper than decoding at full size and resampling. The planned
//! region is cropped from the natively scaled frame.

use std::io::Cursor;
use std::sync::Arc;

use image::RgbaImage;
use jpeg_decoder::{Decoder, PixelFormat};

use super::backend::{self, CodecBackend};
use super::{DecodeError, RegionPlan};

const DCT_DIVISORS: &[u32] = &[1, 2, 4, 8];

pub(crate) struct JpegSession {
    bytes: Arc<[u8]>,
    width: u32,
    height: u32,
    /// Bits per sample from the frame header; 16-bit output holds samples
    /// at this precision, not scaled to the full `u16` range.
    precision: u8,
}

impl CodecBackend for JpegSession {
    fn open(bytes: Arc<[u8]>) -> Result<Self, DecodeError> {
        let (width, height) = {
            let mut decoder = Decoder::new(Cursor::new(&bytes[..]));
            decoder.read_info().map_err(map_jpeg_error)?;
            let info = decoder
                .info()
                .ok_or_else(|| DecodeError::CorruptData("missing JPEG frame header".into()))?;
            (u32::from(info.width), u32::from(info.height))
        };
        let precision = sample_precision(&bytes)
            .ok_or_else(|| DecodeError::CorruptData("missing JPEG frame header".into()))?;

        Ok(Self {
            bytes,
            width,
            height,
            precision,
        })
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn native_divisors(&self) -> &'static [u32] {
        DCT_DIVISORS
    }

    fn decode_native(&self, plan: &RegionPlan) -> Result<RgbaImage, DecodeError> {
        let mut decoder = Decoder::new(Cursor::new(&self.bytes[..]));
        decoder.read_info().map_err(map_jpeg_error)?;

        let d = plan.native_divisor;
        let (width, height) = if d > 1 {
            let requested = (
                self.width.div_ceil(d) as u16,
                self.height.div_ceil(d) as u16,
            );
            let (w, h) = decoder
                .scale(requested.0, requested.1)
                .map_err(map_jpeg_error)?;
            (u32::from(w), u32::from(h))
        } else {
            (self.width, self.height)
        };

        let pixels = decoder.decode().map_err(map_jpeg_error)?;
        let format = decoder
            .info()
            .map(|info| info.pixel_format)
            .ok_or_else(|| DecodeError::CorruptData("missing JPEG frame header".into()))?;

        let rgba = to_rgba(format, &pixels, width, height, self.precision)?;
        let frame = backend::rgba_image(width, height, rgba)?;
        let rect = plan.native_rect((self.width, self.height), (width, height));
        Ok(backend::crop(frame, rect))
    }
}

/// Sample precision from the first SOFn segment, scanning markers up to SOS.
fn sample_precision(bytes: &[u8]) -> Option<u8> {
    let mut pos = 2;
    loop {
        if *bytes.get(pos)? != 0xFF {
            return None;
        }
        let marker = *bytes.get(pos + 1)?;
        match marker {
            // fill byte
            0xFF => pos += 1,
            0x01 | 0xD0..=0xD7 => pos += 2,
            0xD8 | 0xD9 | 0xDA => return None,
            _ => {
                let len = usize::from(u16::from_be_bytes([*bytes.get(pos + 2)?, *bytes.get(pos + 3)?]));
                if matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC) {
                    return bytes.get(pos + 4).copied();
                }
                pos += 2 + len;
            }
        }
    }
}

fn to_rgba(
    format: PixelFormat,
    pixels: &[u8],
    width: u32,
    height: u32,
    precision: u8,
) -> Result<Vec<u8>, DecodeError> {
    let mut out = backend::rgba_vec(u64::from(width) * u64::from(height))?;
    match format {
        PixelFormat::L8 => backend::push_rgba(1, pixels, &mut out)?,
        PixelFormat::RGB24 => backend::push_rgba(3, pixels, &mut out)?,
        PixelFormat::L16 => {
            let max = (1u32 << precision.clamp(1, 16)) - 1;
            for sample in pixels.chunks_exact(2) {
                let v = u32::from(u16::from_ne_bytes([sample[0], sample[1]])).min(max);
                let l = ((v * 255 + max / 2) / max) as u8;
                out.extend_from_slice(&[l, l, l, 255]);
            }
        }
        PixelFormat::CMYK32 => {
            for cmyk in pixels.chunks_exact(4) {
                let k = u32::from(255 - cmyk[3]);
                let ink = |v: u8| (u32::from(255 - v) * k / 255) as u8;
                out.extend_from_slice(&[ink(cmyk[0]), ink(cmyk[1]), ink(cmyk[2]), 255]);
            }
        }
    }
    Ok(out)
}

fn map_jpeg_error(err: jpeg_decoder::Error) -> DecodeError {
    match err {
        jpeg_decoder::Error::Unsupported(feature) => {
            DecodeError::unsupported(format_args!("JPEG {feature:?}"))
        }
        other => DecodeError::corrupt(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::test_support::{assert_close, encode_jpeg, flat, gradient};
    use crate::decode::{plan, PixelRect, Region};

    // Minimal valid JPEG bytes (1x1 red pixel)
    // This is a valid JPEG file created with minimal headers
    const MINIMAL_JPEG: &[u8] = &[
        0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01, 0x01, 0x00, 0x00,
        0x01, 0x00, 0x01, 0x00, 0x00, 0xFF, 0xDB, 0x00, 0x43, 0x00, 0x08, 0x06, 0x06, 0x07, 0x06,
        0x05, 0x08, 0x07, 0x07, 0x07, 0x09, 0x09, 0x08, 0x0A, 0x0C, 0x14, 0x0D, 0x0C, 0x0B, 0x0B,
        0x0C, 0x19, 0x12, 0x13, 0x0F, 0x14, 0x1D, 0x1A, 0x1F, 0x1E, 0x1D, 0x1A, 0x1C, 0x1C, 0x20,
        0x24, 0x2E, 0x27, 0x20, 0x22, 0x2C, 0x23, 0x1C, 0x1C, 0x28, 0x37, 0x29, 0x2C, 0x30, 0x31,
        0x34, 0x34, 0x34, 0x1F, 0x27, 0x39, 0x3D, 0x38, 0x32, 0x3C, 0x2E, 0x33, 0x34, 0x32, 0xFF,
        0xC0, 0x00, 0x0B, 0x08, 0x00, 0x01, 0x00, 0x01, 0x01, 0x01, 0x11, 0x00, 0xFF, 0xC4, 0x00,
        0x1F, 0x00, 0x00, 0x01, 0x05, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B,
        0xFF, 0xC4, 0x00, 0xB5, 0x10, 0x00, 0x02, 0x01, 0x03, 0x03, 0x02, 0x04, 0x03, 0x05, 0x05,
        0x04, 0x04, 0x00, 0x00, 0x01, 0x7D, 0x01, 0x02, 0x03, 0x00, 0x04, 0x11, 0x05, 0x12, 0x21,
        0x31, 0x41, 0x06, 0x13, 0x51, 0x61, 0x07, 0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xA1, 0x08,
        0x23, 0x42, 0xB1, 0xC1, 0x15, 0x52, 0xD1, 0xF0, 0x24, 0x33, 0x62, 0x72, 0x82, 0x09, 0x0A,
        0x16, 0x17, 0x18, 0x19, 0x1A, 0x25, 0x26, 0x27, 0x28, 0x29, 0x2A, 0x34, 0x35, 0x36, 0x37,
        0x38, 0x39, 0x3A, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49, 0x4A, 0x53, 0x54, 0x55, 0x56,
        0x57, 0x58, 0x59, 0x5A, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69, 0x6A, 0x73, 0x74, 0x75,
        0x76, 0x77, 0x78, 0x79, 0x7A, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89, 0x8A, 0x92, 0x93,
        0x94, 0x95, 0x96, 0x97, 0x98, 0x99, 0x9A, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7, 0xA8, 0xA9,
        0xAA, 0xB2, 0xB3, 0xB4, 0xB5, 0xB6, 0xB7, 0xB8, 0xB9, 0xBA, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6,
        0xC7, 0xC8, 0xC9, 0xCA, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6, 0xD7, 0xD8, 0xD9, 0xDA, 0xE1, 0xE2,
        0xE3, 0xE4, 0xE5, 0xE6, 0xE7, 0xE8, 0xE9, 0xEA, 0xF1, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7,
        0xF8, 0xF9, 0xFA, 0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00, 0xFB, 0xD5,
        0xDB, 0x20, 0xA8, 0xF1, 0x7E, 0xFF, 0xD9,
    ];

    fn open(bytes: Vec<u8>) -> JpegSession {
        JpegSession::open(Arc::from(bytes)).unwrap()
    }

    fn plan_region(session: &JpegSession, region: Region, sample_size: u32) -> RegionPlan {
        let (w, h) = session.dimensions();
        plan::plan(
            PixelRect::full(w, h),
            region,
            sample_size,
            session.native_divisors(),
        )
        .unwrap()
    }

    #[test]
    fn test_decode_minimal_jpeg() {
        let session = open(MINIMAL_JPEG.to_vec());
        assert_eq!(session.dimensions(), (1, 1));

        let plan = plan_region(&session, Region::new(0, 0, 1, 1), 1);
        let out = session.decode_native(&plan).unwrap();
        assert_eq!(out.dimensions(), (1, 1));
        assert_eq!(out.get_pixel(0, 0).0[3], 255);
    }

    #[test]
    fn test_open_reads_dimensions() {
        let session = open(encode_jpeg(&gradient(120, 90)));
        assert_eq!(session.dimensions(), (120, 90));
    }

    #[test]
    fn test_native_scale_dimensions() {
        let session = open(encode_jpeg(&gradient(123, 77)));
        for (sample_size, expected) in [(2, (62, 39)), (4, (31, 20)), (8, (16, 10))] {
            let plan = plan_region(&session, Region::new(0, 0, 123, 77), sample_size);
            assert_eq!(plan.native_divisor, sample_size);
            let out = session.decode_native(&plan).unwrap();
            assert_eq!(out.dimensions(), expected, "sample size {sample_size}");
        }
    }

    #[test]
    fn test_region_is_cropped_from_scaled_frame() {
        let session = open(encode_jpeg(&gradient(128, 128)));
        let plan = plan_region(&session, Region::new(32, 16, 96, 80), 4);
        let out = session.decode_native(&plan).unwrap();
        assert_eq!(out.dimensions(), (16, 16));
    }

    #[test]
    fn test_flat_color_survives_scaling() {
        let session = open(encode_jpeg(&flat(64, 64, [200, 40, 90])));
        let plan = plan_region(&session, Region::new(0, 0, 64, 64), 8);
        let out = session.decode_native(&plan).unwrap();
        for px in out.pixels() {
            assert_close(px.0, [200, 40, 90, 255], 6);
        }
    }

    #[test]
    fn test_open_rejects_garbage() {
        let result = JpegSession::open(Arc::from(&[0xFF, 0xD8, 0xFF, 0x00, 0x01][..]));
        assert!(matches!(result, Err(DecodeError::CorruptData(_))));
    }

    #[test]
    fn test_cmyk_conversion() {
        let out = to_rgba(PixelFormat::CMYK32, &[0, 255, 0, 0, 0, 0, 0, 255], 2, 1, 8).unwrap();
        assert_eq!(out, vec![255, 0, 255, 255, 0, 0, 0, 255]);
    }

    #[test]
    fn test_gray_conversion() {
        let out = to_rgba(PixelFormat::L8, &[10, 20], 2, 1, 8).unwrap();
        assert_eq!(out, vec![10, 10, 10, 255, 20, 20, 20, 255]);
    }

    #[test]
    fn test_gray16_scales_from_frame_precision() {
        let pixels: Vec<u8> = [0u16, 2048, 4095]
            .iter()
            .flat_map(|v| v.to_ne_bytes())
            .collect();
        let out = to_rgba(PixelFormat::L16, &pixels, 3, 1, 12).unwrap();
        assert_eq!(
            out,
            vec![0, 0, 0, 255, 128, 128, 128, 255, 255, 255, 255, 255]
        );

        let full: Vec<u8> = [65535u16, 257].iter().flat_map(|v| v.to_ne_bytes()).collect();
        let out = to_rgba(PixelFormat::L16, &full, 2, 1, 16).unwrap();
        assert_eq!(out, vec![255, 255, 255, 255, 1, 1, 1, 255]);
    }

    #[test]
    fn test_sample_precision() {
        assert_eq!(sample_precision(MINIMAL_JPEG), Some(8));

        // SOI, APP0 stub, lossless SOF3 with 12-bit samples
        let lossless = [
            0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00, 0xFF, 0xC3, 0x00, 0x0B, 0x0C, 0x00,
            0x01, 0x00, 0x01, 0x01, 0x01, 0x11, 0x00,
        ];
        assert_eq!(sample_precision(&lossless), Some(12));

        // DHT is not a frame header; SOS ends the search
        let no_frame = [0xFF, 0xD8, 0xFF, 0xC4, 0x00, 0x02, 0xFF, 0xDA, 0x00, 0x02];
        assert_eq!(sample_precision(&no_frame), None);
    }
}
