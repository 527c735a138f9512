//! Decoder configuration.

use serde::{Deserialize, Serialize};

use crate::decode::{DecodeError, FilterType};

/// Options fixed when an [`ImageDecoder`](crate::ImageDecoder) is opened.
///
/// Missing fields take their defaults when deserializing, so a partial
/// config such as `{"crop_borders": true}` is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderOptions {
    /// Detect uniform white/black borders at open and decode only the
    /// content inside them.
    pub crop_borders: bool,
    /// Row alignment of returned buffers in bytes. Must be a power of two.
    pub row_alignment: usize,
    /// Filter for residual resizes that are not an exact integer box.
    pub resize_filter: FilterType,
    /// Upper bound on pixels a single native decode may materialize
    /// (0 = unlimited).
    pub max_pixels: u64,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            crop_borders: false,
            row_alignment: 1,
            resize_filter: FilterType::Bilinear,
            max_pixels: 0,
        }
    }
}

impl DecoderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn crop_borders(mut self, crop_borders: bool) -> Self {
        self.crop_borders = crop_borders;
        self
    }

    pub fn row_alignment(mut self, row_alignment: usize) -> Self {
        self.row_alignment = row_alignment;
        self
    }

    pub fn resize_filter(mut self, resize_filter: FilterType) -> Self {
        self.resize_filter = resize_filter;
        self
    }

    pub fn max_pixels(mut self, max_pixels: u64) -> Self {
        self.max_pixels = max_pixels;
        self
    }

    /// Check the options before they are used to open a decoder.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::InvalidArgument` if `row_alignment` is not a
    /// power of two.
    pub fn validate(&self) -> Result<(), DecodeError> {
        if !self.row_alignment.is_power_of_two() {
            return Err(DecodeError::InvalidArgument(format!(
                "row alignment {} is not a power of two",
                self.row_alignment
            )));
        }
        Ok(())
    }
}
