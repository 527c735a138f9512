//! The uniform pixel output of every decode call.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use super::DecodeError;

/// Pixel layout of a [`PixelBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8 bits per channel, R, G, B, A byte order, straight alpha.
    #[default]
    Rgba8888,
}

impl PixelFormat {
    #[inline]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8888 => 4,
        }
    }
}

/// A decoded region with RGBA pixel data.
///
/// Rows are stored top to bottom. Each row starts `stride` bytes after the
/// previous one; `stride` may exceed `width * 4` when a row alignment was
/// requested, so never index the data assuming tight packing.
///
/// A buffer owns its storage and holds no reference to the decoder that
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Bytes between the starts of consecutive rows.
    pub stride: usize,
    pub format: PixelFormat,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Copy an RGBA image into a new buffer with rows aligned to `row_alignment` bytes.
    ///
    /// `row_alignment` must be a power of two; 0 and 1 both mean tightly packed.
    pub fn from_rgba_image(image: &RgbaImage, row_alignment: usize) -> Result<Self, DecodeError> {
        let (width, height) = image.dimensions();
        let format = PixelFormat::Rgba8888;
        let row_bytes = width as usize * format.bytes_per_pixel();
        let stride = align_up(row_bytes, row_alignment).ok_or(DecodeError::OutOfMemory)?;

        let raw = image.as_raw();
        if stride == row_bytes {
            let mut data = Vec::new();
            data.try_reserve_exact(raw.len())
                .map_err(|_| DecodeError::OutOfMemory)?;
            data.extend_from_slice(raw);
            return Ok(Self {
                width,
                height,
                stride,
                format,
                data,
            });
        }

        let total = stride
            .checked_mul(height as usize)
            .ok_or(DecodeError::OutOfMemory)?;
        let mut data = Vec::new();
        data.try_reserve_exact(total)
            .map_err(|_| DecodeError::OutOfMemory)?;
        for row in raw.chunks_exact(row_bytes.max(1)).take(height as usize) {
            data.extend_from_slice(row);
            data.resize(data.len() + (stride - row_bytes), 0);
        }

        Ok(Self {
            width,
            height,
            stride,
            format,
            data,
        })
    }

    /// The whole backing store, `stride * height` bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume the buffer and return its backing store.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// The visible bytes of row `y` (padding excluded).
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let start = y as usize * self.stride;
        let len = self.width as usize * self.format.bytes_per_pixel();
        self.data.get(start..start + len)
    }

    /// The RGBA value at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width {
            return None;
        }
        let bpp = self.format.bytes_per_pixel();
        let row = self.row(y)?;
        let px = &row[x as usize * bpp..x as usize * bpp + bpp];
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Get the total number of pixels.
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Get the size of the backing store in bytes.
    pub fn byte_size(&self) -> usize {
        self.data.len()
    }

    /// Check if this is an empty/invalid buffer.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    /// Repack into a tightly packed `image::RgbaImage`.
    pub fn to_rgba_image(&self) -> Option<RgbaImage> {
        let mut packed = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for y in 0..self.height {
            packed.extend_from_slice(self.row(y)?);
        }
        RgbaImage::from_raw(self.width, self.height, packed)
    }
}

fn align_up(value: usize, alignment: usize) -> Option<usize> {
    if alignment <= 1 {
        return Some(value);
    }
    let mask = alignment - 1;
    value.checked_add(mask).map(|v| v & !mask)
}
