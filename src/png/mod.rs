//! Holds the PNG format knowledge shared by the decoder and the encoder.
//!
//! * [Portable Network Graphics Specification (Second Edition)][png-spec]
//!
//! [png-spec]: https://www.w3.org/TR/2003/REC-PNG-20031110/
//!
//! The general format of a PNG is that the information is stored in "chunks".
//! After the 8 byte signature, each chunk is:
//!
//! * a big-endian `u32` data length,
//! * a 4 byte ASCII chunk type,
//! * the data itself,
//! * a big-endian `u32` CRC of the type and data.
//!
//! There's four "critical" chunk types:
//! * **Header** (`IHDR`) - the dimensions, pixel format, and if the image is
//!   interlaced or not. It must be the very first chunk.
//! * **Palette** (`PLTE`) - if an image uses indexed color it will have a
//!   palette of what index values map to what `RGB8` values.
//! * **Image Data** (`IDAT`) - one or more chunks of compressed data. All of
//!   the compressed data forms a single zlib data stream.
//! * **End** (`IEND`) - the last chunk, lets you know you had the full PNG and
//!   your data wasn't truncated accidentally.
//!
//! When storing the PNG, the raw pixel values are first "filtered" (to try and
//! make them more compression-friendly), and then compressed into a zlib data
//! stream. Decoding reverses the operations, first decompressing and then
//! unfiltering, a scanline at a time.

mod chunk;
pub use chunk::*;

mod crc32;
pub use crc32::*;

mod header;
pub use header::*;

mod interlace;
pub(crate) use interlace::*;

mod inflate;
pub(crate) use inflate::*;

mod unfilter;
pub(crate) use unfilter::*;

mod filter;
pub use filter::FilterChoice;
pub(crate) use filter::filter_scanline;


/// The first eight bytes of a PNG datastream should match these bytes.
pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// The only bit depth the encoder writes, and the depth of decoded output.
pub const RGBA8_BIT_DEPTH: u8 = 8;

/// Truecolor with alpha.
pub const RGBA_COLOR_TYPE: u8 = PngColorType::RGBA as u8;

/// Default cap on each class of chunk data accepted by the decoder: 64 MiB.
pub const DEFAULT_CHUNK_LIMIT: usize = 64 * 1024 * 1024;

/// Largest width, height, or chunk length PNG allows.
pub const PNG_MAX_U31: u32 = (1 << 31) - 1;

/// Checks if the PNG's initial 8 bytes are correct.
///
/// * If this is the case, the rest of the bytes are very likely PNG data.
/// * If this is *not* the case, the rest of the bytes are very likely *not* PNG
///   data.
#[inline]
#[must_use]
pub const fn is_png_header_correct(bytes: &[u8]) -> bool {
  matches!(bytes, [137, 80, 78, 71, 13, 10, 26, 10, ..])
}
