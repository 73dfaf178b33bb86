#![forbid(unsafe_code)]
#![cfg_attr(docs_rs, feature(doc_cfg))]

//! A PNG codec boundary for RGBA8 images.
//!
//! * [`decode`] turns PNG bytes into an owned [`Raster`] of RGBA8 pixels.
//!   Every legal PNG pixel format is converted to RGBA8 along the way.
//! * [`encode`] writes a raster's pixels out as an 8-bit RGBA PNG file.
//! * [`release`] gives a decoded pixel buffer back.
//!
//! Each call is its own session with its own configuration, there's no global
//! state. Decoding never does I/O, encoding does blocking file I/O on the
//! calling thread.
//!
//! ```
//! let pixels = [255, 0, 0, 255, 0, 255, 0, 255];
//! let png = pngio::encode_to_vec(&pixels, 2, 1).unwrap();
//! let raster = pngio::decode(&png).unwrap();
//! assert_eq!((raster.width(), raster.height()), (2, 1));
//! assert_eq!(raster.as_bytes(), &pixels[..]);
//! let (_, _, buffer) = raster.into_parts();
//! pngio::release(buffer);
//! ```
//!
//! ## Untrusted Input
//! The decoder checks every declared chunk length against [`ChunkLimits`]
//! before the chunk is used (64 MiB per class of chunk by default), and all
//! size math is checked. By default chunk CRCs and the zlib Adler-32 are *not*
//! verified, pick [`CrcPolicy::Verify`] in [`DecodeOptions`] if you want them.

extern crate alloc;

#[cfg(target_pointer_width = "16")]
compile_error!("this crate assumes 32-bit or bigger pointers!");

mod error;
pub use error::*;

mod pixels;
pub use pixels::*;

mod raster;
pub use raster::*;

pub mod png;

mod decode;
pub use decode::*;

mod encode;
pub use encode::*;

/// Releases a pixel buffer returned by [`decode`].
///
/// ## Caller Obligation
/// Call this exactly once per buffer, after the last use of the bytes. A
/// [`PixelBuffer`] can't be cloned and this consumes it, so within Rust a
/// double release can't be written. Code that hands the bytes to some other
/// memory domain (for example through [`PixelBuffer::into_vec`] and a raw
/// pointer) takes over the obligation, and releasing twice or releasing bytes
/// that `decode` never produced is then undefined behavior of *that* code.
#[inline]
pub fn release(pixels: PixelBuffer) {
  pixels.release()
}
