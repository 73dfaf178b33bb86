//! Provides the owned RGBA8 raster that crosses the codec boundary.

use alloc::vec::Vec;
use core::fmt::Debug;

use crate::{pixels::RGBA8, PngError};

/// Converts an `(x,y)` position within a given `width` 2D space into a linear
/// pixel index.
#[inline]
#[must_use]
pub const fn xy_width_to_index(x: u32, y: u32, width: u32) -> usize {
  (y as usize) * (width as usize) + (x as usize)
}

/// The bytes of a decoded image, exclusively owned.
///
/// There's no `Clone` and no way to get at the bytes other than by borrowing
/// this value, so a buffer handed out by [`decode`](crate::decode) has exactly
/// one owner until it's consumed by [`release`](PixelBuffer::release) or
/// [`into_vec`](PixelBuffer::into_vec).
///
/// ## Caller Obligation
/// Call `release` once, after the last use of the bytes. Ownership makes a
/// second release (or a release of a buffer that `decode` never produced)
/// impossible to express; code that moves the bytes out into some other
/// memory domain takes over this obligation.
#[derive(PartialEq, Eq, Hash)]
pub struct PixelBuffer(Vec<u8>);
impl PixelBuffer {
  #[inline]
  pub(crate) fn from_vec(bytes: Vec<u8>) -> Self {
    Self(bytes)
  }

  /// The number of bytes.
  #[inline]
  #[must_use]
  pub fn len(&self) -> usize {
    self.0.len()
  }

  /// If there are no bytes.
  #[inline]
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Borrows the bytes.
  #[inline]
  #[must_use]
  pub fn as_bytes(&self) -> &[u8] {
    &self.0
  }

  /// Mutably borrows the bytes. The length can't change.
  #[inline]
  #[must_use]
  pub fn as_bytes_mut(&mut self) -> &mut [u8] {
    &mut self.0
  }

  /// Gives the bytes back to the allocator.
  #[inline]
  pub fn release(self) {
    drop(self)
  }

  /// Converts into a plain `Vec<u8>`, handing over the release obligation.
  #[inline]
  #[must_use]
  pub fn into_vec(self) -> Vec<u8> {
    self.0
  }
}
impl Debug for PixelBuffer {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    // currently prints no more than 16 bytes
    f.debug_tuple("PixelBuffer").field(&&self.0[..self.0.len().min(16)]).field(&self.0.len()).finish()
  }
}

/// An uncompressed image: `width * height` pixels of RGBA8.
///
/// Rows are top to bottom, pixels left to right, four bytes per pixel in
/// `r, g, b, a` order, and no padding between rows. The byte length is always
/// exactly `width * height * 4`, which the constructors enforce.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Raster {
  width: u32,
  height: u32,
  pixels: PixelBuffer,
}
impl Raster {
  /// Makes a raster out of caller provided bytes.
  ///
  /// ## Failure
  /// * `width` or `height` is 0.
  /// * `pixels.len()` isn't exactly `width * height * 4`.
  pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, PngError> {
    if width == 0 || height == 0 {
      return Err(PngError::ZeroDimension);
    }
    let expected = rgba8_len(width, height).ok_or(PngError::SizeOverflow)?;
    if pixels.len() != expected {
      return Err(PngError::BufferSizeMismatch);
    }
    Ok(Self { width, height, pixels: PixelBuffer(pixels) })
  }

  /// Used by the decoder, which sized the buffer from the same header.
  #[inline]
  pub(crate) fn from_parts(width: u32, height: u32, pixels: PixelBuffer) -> Self {
    debug_assert_eq!(rgba8_len(width, height), Some(pixels.len()));
    Self { width, height, pixels }
  }

  /// Width in pixels.
  #[inline]
  #[must_use]
  pub const fn width(&self) -> u32 {
    self.width
  }

  /// Height in pixels.
  #[inline]
  #[must_use]
  pub const fn height(&self) -> u32 {
    self.height
  }

  /// Bytes per row, `width * 4`.
  #[inline]
  #[must_use]
  pub const fn stride(&self) -> usize {
    (self.width as usize) * 4
  }

  /// The raw RGBA8 bytes.
  #[inline]
  #[must_use]
  pub fn as_bytes(&self) -> &[u8] {
    self.pixels.as_bytes()
  }

  /// The bytes viewed as pixels.
  #[inline]
  #[must_use]
  pub fn pixels(&self) -> &[RGBA8] {
    bytemuck::cast_slice(self.pixels.as_bytes())
  }

  /// Gets the pixel at the position, or `None` if the position is out of
  /// bounds.
  #[inline]
  #[must_use]
  pub fn get(&self, x: u32, y: u32) -> Option<RGBA8> {
    if x < self.width && y < self.height {
      self.pixels().get(xy_width_to_index(x, y, self.width)).copied()
    } else {
      None
    }
  }

  /// Iterates the rows, top to bottom.
  #[inline]
  pub fn rows(&self) -> impl Iterator<Item = &[u8]> + '_ {
    self.as_bytes().chunks_exact(self.stride())
  }

  /// Splits into `(width, height, pixels)`.
  #[inline]
  #[must_use]
  pub fn into_parts(self) -> (u32, u32, PixelBuffer) {
    (self.width, self.height, self.pixels)
  }

  /// Releases the pixel buffer. Same as [`PixelBuffer::release`].
  #[inline]
  pub fn release(self) {
    self.pixels.release()
  }
}

/// `width * height * 4`, if that fits in `usize`.
#[inline]
#[must_use]
pub(crate) fn rgba8_len(width: u32, height: u32) -> Option<usize> {
  (width as usize).checked_mul(height as usize)?.checked_mul(4)
}
