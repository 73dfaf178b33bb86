use super::*;
use crate::PngError;

/// The types of color that PNG supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum PngColorType {
  /// Greyscale
  Y = 0,
  /// Red, Green, Blue
  RGB = 2,
  /// Index into a palette.
  ///
  /// The palette will have RGB8 data. There may optionally be a transparency
  /// chunk.
  Index = 3,
  /// Greyscale + Alpha
  YA = 4,
  /// Red, Green, Blue, Alpha
  RGBA = 6,
}
impl PngColorType {
  /// The number of channels in this type of color.
  #[inline]
  #[must_use]
  pub const fn channel_count(self) -> usize {
    match self {
      Self::Y => 1,
      Self::RGB => 3,
      Self::Index => 1,
      Self::YA => 2,
      Self::RGBA => 4,
    }
  }

  /// If `bit_depth` is allowed with this color type.
  #[inline]
  #[must_use]
  pub const fn allows_bit_depth(self, bit_depth: u8) -> bool {
    match self {
      Self::Y => matches!(bit_depth, 1 | 2 | 4 | 8 | 16),
      Self::Index => matches!(bit_depth, 1 | 2 | 4 | 8),
      Self::RGB | Self::YA | Self::RGBA => matches!(bit_depth, 8 | 16),
    }
  }
}
impl TryFrom<u8> for PngColorType {
  type Error = PngError;
  #[inline]
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Ok(match value {
      0 => PngColorType::Y,
      2 => PngColorType::RGB,
      3 => PngColorType::Index,
      4 => PngColorType::YA,
      6 => PngColorType::RGBA,
      _ => return Err(PngError::IhdrIllegalData),
    })
  }
}

/// How the image data is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum PngInterlaceMethod {
  /// Scanlines top to bottom.
  NoInterlace = 0,
  /// Seven reduced images, see [Adam7](https://www.w3.org/TR/png/#8Interlace).
  ///
  /// Please don't make new interlaced images, they're terrible.
  Adam7 = 1,
}

/// Image Header (`IHDR`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PngHeader {
  /// width in pixels
  pub width: u32,
  /// height in pixels
  pub height: u32,
  /// bits per channel (per index for indexed color)
  pub bit_depth: u8,
  /// pixel color type
  pub color_type: PngColorType,
  /// must be 0 (deflate)
  pub compression_method: u8,
  /// must be 0 (adaptive filtering with five basic filter types)
  pub filter_method: u8,
  /// if the image data is stored interlaced.
  pub interlace_method: PngInterlaceMethod,
}
impl PngHeader {
  /// The header the encoder writes: 8-bit RGBA, not interlaced.
  #[inline]
  #[must_use]
  pub const fn rgba8(width: u32, height: u32) -> Self {
    Self {
      width,
      height,
      bit_depth: RGBA8_BIT_DEPTH,
      color_type: PngColorType::RGBA,
      compression_method: 0,
      filter_method: 0,
      interlace_method: PngInterlaceMethod::NoInterlace,
    }
  }

  /// Parses the 13 data bytes of an `IHDR` chunk.
  pub fn from_ihdr_data(data: &[u8]) -> Result<Self, PngError> {
    match *data {
      [w0, w1, w2, w3, h0, h1, h2, h3, bit_depth, color_type, compression_method, filter_method, interlace_method] =>
      {
        let header = Self {
          width: u32::from_be_bytes([w0, w1, w2, w3]),
          height: u32::from_be_bytes([h0, h1, h2, h3]),
          bit_depth,
          color_type: PngColorType::try_from(color_type)?,
          compression_method,
          filter_method,
          interlace_method: match interlace_method {
            0 => PngInterlaceMethod::NoInterlace,
            1 => PngInterlaceMethod::Adam7,
            _ => return Err(PngError::IhdrIllegalData),
          },
        };
        header.validate()?;
        Ok(header)
      }
      _ => Err(PngError::IhdrIllegalData),
    }
  }

  /// Checks the rules every PNG header follows.
  pub fn validate(&self) -> Result<(), PngError> {
    if self.width == 0 || self.height == 0 {
      return Err(PngError::ZeroDimension);
    }
    if self.width > PNG_MAX_U31 || self.height > PNG_MAX_U31 {
      return Err(PngError::DimensionTooLarge);
    }
    if !self.color_type.allows_bit_depth(self.bit_depth)
      || self.compression_method != 0
      || self.filter_method != 0
    {
      return Err(PngError::IhdrIllegalData);
    }
    Ok(())
  }

  /// The 13 data bytes of the `IHDR` chunk for this header.
  #[must_use]
  pub fn to_ihdr_data(&self) -> [u8; 13] {
    let [w0, w1, w2, w3] = self.width.to_be_bytes();
    let [h0, h1, h2, h3] = self.height.to_be_bytes();
    [
      w0,
      w1,
      w2,
      w3,
      h0,
      h1,
      h2,
      h3,
      self.bit_depth,
      self.color_type as u8,
      self.compression_method,
      self.filter_method,
      self.interlace_method as u8,
    ]
  }

  #[inline]
  #[must_use]
  pub const fn is_interlaced(&self) -> bool {
    matches!(self.interlace_method, PngInterlaceMethod::Adam7)
  }

  /// Bits used by one pixel of the stored data.
  #[inline]
  #[must_use]
  pub const fn bits_per_pixel(&self) -> usize {
    (self.bit_depth as usize) * self.color_type.channel_count()
  }

  /// Filtering is per byte within a pixel when pixels are more than 1 byte
  /// each, and per byte when pixels are 1 byte or less.
  #[inline]
  #[must_use]
  pub const fn filter_chunk_size(&self) -> usize {
    let bytes = self.bits_per_pixel() / 8;
    if bytes == 0 {
      1
    } else {
      bytes
    }
  }

  /// Each line is a filter byte (1) + pixel data. When pixels are less than 8
  /// bits it's possible to end up with partial bytes on the end, so we must
  /// round up.
  #[inline]
  #[must_use]
  pub fn bytes_per_filterline(&self, width: u32) -> Option<usize> {
    let bits_per_line = self.bits_per_pixel().checked_mul(width as usize)?;
    (bits_per_line / 8 + usize::from(bits_per_line % 8 != 0)).checked_add(1)
  }

  /// Gets the buffer size required to hold the decompressed (filtered) data.
  ///
  /// Interlaced images add up the sizes of all 7 reduced images.
  #[must_use]
  pub fn filtered_data_size(&self) -> Option<usize> {
    let level_sizes = reduced_image_dimensions(self.width, self.height);
    let levels = if self.is_interlaced() { &level_sizes[1..] } else { &level_sizes[..1] };
    let mut total = 0_usize;
    for &(w, h) in levels {
      if w == 0 || h == 0 {
        continue;
      }
      total = total.checked_add(self.bytes_per_filterline(w)?.checked_mul(h as usize)?)?;
    }
    Some(total)
  }

  /// Bytes needed to hold this image as RGBA8.
  #[inline]
  #[must_use]
  pub fn rgba8_image_size(&self) -> Option<usize> {
    crate::raster::rgba8_len(self.width, self.height)
  }

  /// Bytes in one RGBA8 row, `width * 4`.
  #[inline]
  #[must_use]
  pub fn rgba8_row_size(&self) -> Option<usize> {
    (self.width as usize).checked_mul(4)
  }
}
