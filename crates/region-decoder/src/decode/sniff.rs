//! Format detection from magic bytes and container signatures.
//!
//! Only a bounded prefix of the stream is ever examined, so sniffing is cheap
//! even for very large inputs and never fails: unrecognized data yields `None`.

use super::{ImageFormat, ImageType};

/// Maximum number of leading bytes inspected by [`detect`].
pub const SNIFF_PREFIX_LEN: usize = 64;

/// Maximum number of bytes scanned by [`find_type`] when looking for an
/// animation marker (PNG `acTL` may follow large ancillary chunks).
const TYPE_SCAN_LEN: usize = 4096;

const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];
const JXL_CODESTREAM_MAGIC: [u8; 2] = [0xFF, 0x0A];
const JXL_CONTAINER_MAGIC: [u8; 12] = [
    0x00, 0x00, 0x00, 0x0C, b'J', b'X', b'L', b' ', 0x0D, 0x0A, 0x87, 0x0A,
];

const AVIF_BRANDS: [&[u8; 4]; 2] = [b"avif", b"avis"];
const HEIF_BRANDS: [&[u8; 4]; 10] = [
    b"heic", b"heix", b"hevc", b"hevx", b"heim", b"heis", b"hevm", b"hevs", b"mif1", b"msf1",
];
const HEIF_SEQUENCE_BRANDS: [&[u8; 4]; 3] = [b"msf1", b"hevc", b"hevs"];

/// Detect the image format from the leading bytes of a stream.
pub fn detect(bytes: &[u8]) -> Option<ImageFormat> {
    let data = &bytes[..bytes.len().min(SNIFF_PREFIX_LEN)];

    if data.starts_with(&PNG_MAGIC) {
        return Some(ImageFormat::Png);
    }
    if data.starts_with(&JPEG_MAGIC) {
        return Some(ImageFormat::Jpeg);
    }
    if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        return Some(ImageFormat::Webp);
    }
    if data.starts_with(&JXL_CONTAINER_MAGIC) || data.starts_with(&JXL_CODESTREAM_MAGIC) {
        return Some(ImageFormat::Jxl);
    }

    let brands = ftyp_brands(data)?;
    // AVIF first: `mif1` files that also list `avif` are AV1 payloads.
    if brands.iter().any(|b| AVIF_BRANDS.contains(b)) {
        return Some(ImageFormat::Avif);
    }
    if brands.iter().any(|b| HEIF_BRANDS.contains(b)) {
        return Some(ImageFormat::Heif);
    }
    None
}

/// Detect format plus an animation hint.
///
/// Animation is reported from container-level markers only; frames are never
/// parsed.
pub fn find_type(bytes: &[u8]) -> Option<ImageType> {
    let format = detect(bytes)?;
    let is_animated = match format {
        ImageFormat::Png => png_has_actl(bytes),
        ImageFormat::Webp => webp_has_animation_flag(bytes),
        ImageFormat::Avif => ftyp_brands(bytes)
            .map(|brands| brands.iter().any(|b| *b == b"avis"))
            .unwrap_or(false),
        ImageFormat::Heif => ftyp_brands(bytes)
            .map(|brands| brands.iter().any(|b| HEIF_SEQUENCE_BRANDS.contains(b)))
            .unwrap_or(false),
        ImageFormat::Jpeg | ImageFormat::Jxl => false,
    };
    Some(ImageType {
        format,
        is_animated,
    })
}

/// Whether `bytes` is a non-empty, strict prefix of a known signature.
///
/// Such input was clearly meant to be an image but was cut short, which is
/// reported as corrupt data rather than an unknown format.
pub fn is_truncated_signature(bytes: &[u8]) -> bool {
    if bytes.is_empty() {
        return false;
    }
    let signatures: [&[u8]; 3] = [&PNG_MAGIC, &JPEG_MAGIC, &JXL_CONTAINER_MAGIC];
    signatures
        .iter()
        .any(|sig| bytes.len() < sig.len() && sig.starts_with(bytes))
        || is_truncated_webp(bytes)
}

/// A cut-short `RIFF....WEBP` header; the four size bytes match anything.
fn is_truncated_webp(bytes: &[u8]) -> bool {
    bytes.len() < 12
        && b"RIFF".starts_with(&bytes[..bytes.len().min(4)])
        && (bytes.len() <= 8 || b"WEBP".starts_with(&bytes[8..]))
}

/// Major and compatible brands of a leading ISO-BMFF `ftyp` box.
fn ftyp_brands(data: &[u8]) -> Option<Vec<&[u8; 4]>> {
    if data.len() < 12 || &data[4..8] != b"ftyp" {
        return None;
    }
    let box_size = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    let end = box_size.clamp(12, data.len().min(SNIFF_PREFIX_LEN));

    let mut brands = vec![brand_at(data, 8)?];
    // Skip minor_version (12..16); compatible brands follow.
    let mut offset = 16;
    while offset + 4 <= end {
        brands.push(brand_at(data, offset)?);
        offset += 4;
    }
    Some(brands)
}

fn brand_at(data: &[u8], offset: usize) -> Option<&[u8; 4]> {
    data.get(offset..offset + 4)?.try_into().ok()
}

/// Scan PNG chunks for `acTL` ahead of the first `IDAT`.
fn png_has_actl(bytes: &[u8]) -> bool {
    let data = &bytes[..bytes.len().min(TYPE_SCAN_LEN)];
    let mut offset = PNG_MAGIC.len();
    while offset + 8 <= data.len() {
        let len = u32::from_be_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ]) as usize;
        match &data[offset + 4..offset + 8] {
            b"acTL" => return true,
            b"IDAT" | b"IEND" => return false,
            _ => {}
        }
        // length + type + data + crc
        offset = match offset.checked_add(12).and_then(|o| o.checked_add(len)) {
            Some(next) => next,
            None => return false,
        };
    }
    false
}

/// VP8X extended header: animation flag is bit 1 of the flags byte.
fn webp_has_animation_flag(bytes: &[u8]) -> bool {
    bytes.len() >= 21 && &bytes[12..16] == b"VP8X" && bytes[20] & 0x02 != 0
}
