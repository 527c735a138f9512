//! Region Decoder - Region-of-interest image decoding
//!
//! Opens an encoded image from memory, reports its dimensions, and decodes
//! any rectangular region of it downscaled by an integer sample size into an
//! RGBA pixel buffer, decoding as little of the stream as the format allows.
//!
//! ```ignore
//! use region_decoder::{ImageDecoder, Region};
//!
//! let decoder = ImageDecoder::new(std::fs::read("page.jpg")?)?;
//! let tile = decoder.decode_region(Region::new(0, 0, 512, 512), 4)?;
//! assert_eq!((tile.width, tile.height), (128, 128));
//! ```

pub mod decode;
mod decoder;
mod options;

pub use decode::{
    detect, find_type, DecodeError, FilterType, ImageFormat, ImageType, PixelBuffer, PixelFormat,
    PixelRect, Region,
};
pub use decoder::ImageDecoder;
pub use options::DecoderOptions;
