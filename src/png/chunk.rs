use core::fmt::{Debug, Write as _};
use std::io::Write;

use super::*;
use crate::PngError;

/// A 4 byte chunk type.
///
/// Bit 5 of each byte is a property flag. The one that matters for decoding is
/// on the first byte: when it's clear the chunk is "critical" and a decoder
/// that doesn't know the chunk can't safely continue.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PngChunkTy(pub [u8; 4]);
#[allow(nonstandard_style)]
impl PngChunkTy {
  pub const IHDR: Self = Self(*b"IHDR");
  pub const PLTE: Self = Self(*b"PLTE");
  pub const IDAT: Self = Self(*b"IDAT");
  pub const IEND: Self = Self(*b"IEND");
  pub const tRNS: Self = Self(*b"tRNS");
  pub const cHRM: Self = Self(*b"cHRM");
  pub const gAMA: Self = Self(*b"gAMA");
  pub const iCCP: Self = Self(*b"iCCP");
  pub const sBIT: Self = Self(*b"sBIT");
  pub const sRGB: Self = Self(*b"sRGB");
  pub const cICP: Self = Self(*b"cICP");
  pub const tEXt: Self = Self(*b"tEXt");
  pub const zTXt: Self = Self(*b"zTXt");
  pub const iTXt: Self = Self(*b"iTXt");
  pub const bKGD: Self = Self(*b"bKGD");
  pub const hIST: Self = Self(*b"hIST");
  pub const pHYs: Self = Self(*b"pHYs");
  pub const sPLT: Self = Self(*b"sPLT");
  pub const eXIf: Self = Self(*b"eXIf");
  pub const tIME: Self = Self(*b"tIME");

  const STANDARD: [Self; 20] = [
    Self::IHDR,
    Self::PLTE,
    Self::IDAT,
    Self::IEND,
    Self::tRNS,
    Self::cHRM,
    Self::gAMA,
    Self::iCCP,
    Self::sBIT,
    Self::sRGB,
    Self::cICP,
    Self::tEXt,
    Self::zTXt,
    Self::iTXt,
    Self::bKGD,
    Self::hIST,
    Self::pHYs,
    Self::sPLT,
    Self::eXIf,
    Self::tIME,
  ];

  /// If this is one of the chunk types defined by the PNG standard.
  #[inline]
  #[must_use]
  pub fn is_standard(self) -> bool {
    Self::STANDARD.contains(&self)
  }

  /// If a decoder must understand this chunk to decode the image.
  #[inline]
  #[must_use]
  pub const fn is_critical(self) -> bool {
    (self.0[0] & 0b0010_0000) == 0
  }

  /// Chunk types are restricted to ASCII letters.
  #[inline]
  #[must_use]
  pub fn is_well_formed(self) -> bool {
    self.0.iter().all(u8::is_ascii_alphabetic)
  }
}
impl Debug for PngChunkTy {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    for b in self.0 {
      f.write_char(b as char)?;
    }
    Ok(())
  }
}

/// An unparsed chunk from a PNG.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RawPngChunk<'b> {
  pub chunk_ty: PngChunkTy,
  pub data: &'b [u8],
  pub declared_crc: u32,
}
impl RawPngChunk<'_> {
  /// Computes the CRC this chunk *should* have.
  #[inline]
  #[must_use]
  pub fn compute_actual_crc(&self) -> u32 {
    chunk_crc(self.chunk_ty.0, self.data)
  }
}
impl Debug for RawPngChunk<'_> {
  #[inline]
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("RawPngChunk")
      .field("chunk_ty", &self.chunk_ty)
      .field("data", &(&self.data[..self.data.len().min(12)], self.data.len()))
      .field("declared_crc", &self.declared_crc)
      .finish()
  }
}

/// What the decoder does with chunk CRCs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CrcPolicy {
  /// Don't compute or compare any checksums, neither chunk CRCs nor the zlib
  /// Adler-32. Structural checks still catch most corruption.
  #[default]
  Ignore,
  /// Compare every chunk CRC and the zlib Adler-32, failing on mismatch.
  Verify,
}

/// Caps on how much chunk data the decoder accepts.
///
/// Every chunk's declared length is checked against these before the chunk
/// data is used:
/// * `IDAT` data is streamed into the decompressor and never kept, so each
///   `IDAT` chunk only has to fit within `standard` on its own.
/// * All other standard chunk types add up against `standard`.
/// * Unrecognized (ancillary) chunk types add up against `unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkLimits {
  pub standard: usize,
  pub unknown: usize,
}
impl ChunkLimits {
  /// Sets both limits to the same value.
  #[inline]
  #[must_use]
  pub const fn both(limit: usize) -> Self {
    Self { standard: limit, unknown: limit }
  }
}
impl Default for ChunkLimits {
  #[inline]
  fn default() -> Self {
    Self::both(DEFAULT_CHUNK_LIMIT)
  }
}

/// Walks the chunks of PNG bytes, enforcing [`ChunkLimits`] and [`CrcPolicy`].
///
/// After the first error the iterator is fused and only returns `None`.
#[derive(Debug, Clone)]
pub struct ChunkReader<'b> {
  spare: &'b [u8],
  limits: ChunkLimits,
  crc: CrcPolicy,
  standard_used: usize,
  unknown_used: usize,
}
impl<'b> ChunkReader<'b> {
  /// Makes a reader over a PNG's chunks.
  ///
  /// ## Failure
  /// * If the slice doesn't start with the PNG signature.
  pub fn new(png: &'b [u8], limits: ChunkLimits, crc: CrcPolicy) -> Result<Self, PngError> {
    match png {
      [137, 80, 78, 71, 13, 10, 26, 10, spare @ ..] => {
        Ok(Self { spare, limits, crc, standard_used: 0, unknown_used: 0 })
      }
      _ => Err(PngError::BytesAreNotPng),
    }
  }

  /// The bytes that haven't been walked yet.
  #[inline]
  #[must_use]
  pub fn remaining(&self) -> &'b [u8] {
    self.spare
  }

  fn charge(&mut self, chunk_ty: PngChunkTy, len: usize) -> Result<(), PngError> {
    if chunk_ty == PngChunkTy::IDAT {
      if len > self.limits.standard {
        return Err(PngError::ChunkLimitExceeded);
      }
    } else if chunk_ty.is_standard() {
      self.standard_used = self
        .standard_used
        .checked_add(len)
        .filter(|total| *total <= self.limits.standard)
        .ok_or(PngError::ChunkLimitExceeded)?;
    } else {
      self.unknown_used = self
        .unknown_used
        .checked_add(len)
        .filter(|total| *total <= self.limits.unknown)
        .ok_or(PngError::ChunkLimitExceeded)?;
    }
    Ok(())
  }

  fn read_chunk(&mut self) -> Result<RawPngChunk<'b>, PngError> {
    let (len_bytes, rest) = split_off_array::<4>(self.spare).ok_or(PngError::ChunkTruncated)?;
    let len = u32::from_be_bytes(len_bytes);
    let (ty_bytes, rest) = split_off_array::<4>(rest).ok_or(PngError::ChunkTruncated)?;
    let chunk_ty = PngChunkTy(ty_bytes);
    if len > PNG_MAX_U31 {
      return Err(PngError::ChunkTooLong);
    }
    if !chunk_ty.is_well_formed() {
      return Err(PngError::IllegalChunkType);
    }
    let len = usize::try_from(len).map_err(|_| PngError::ChunkTooLong)?;
    // this must come before the data slice is taken.
    self.charge(chunk_ty, len)?;
    if rest.len() < len {
      return Err(PngError::ChunkTruncated);
    }
    let (data, rest) = rest.split_at(len);
    let (crc_bytes, rest) = split_off_array::<4>(rest).ok_or(PngError::ChunkTruncated)?;
    let chunk = RawPngChunk { chunk_ty, data, declared_crc: u32::from_be_bytes(crc_bytes) };
    if self.crc == CrcPolicy::Verify && chunk.compute_actual_crc() != chunk.declared_crc {
      return Err(PngError::CrcMismatch);
    }
    self.spare = rest;
    Ok(chunk)
  }
}
impl<'b> Iterator for ChunkReader<'b> {
  type Item = Result<RawPngChunk<'b>, PngError>;
  #[inline]
  fn next(&mut self) -> Option<Self::Item> {
    if self.spare.is_empty() {
      return None;
    }
    let out = self.read_chunk();
    if out.is_err() {
      self.spare = &[];
    }
    Some(out)
  }
}

fn split_off_array<const N: usize>(bytes: &[u8]) -> Option<([u8; N], &[u8])> {
  if bytes.len() >= N {
    let (head, tail) = bytes.split_at(N);
    Some((head.try_into().ok()?, tail))
  } else {
    None
  }
}

/// Writes one complete chunk: length, type, data, and CRC.
pub fn write_chunk<W: Write>(
  w: &mut W, chunk_ty: PngChunkTy, data: &[u8],
) -> Result<(), PngError> {
  let len = u32::try_from(data.len())
    .ok()
    .filter(|len| *len <= PNG_MAX_U31)
    .ok_or(PngError::ChunkTooLong)?;
  w.write_all(&len.to_be_bytes())?;
  w.write_all(&chunk_ty.0)?;
  w.write_all(data)?;
  w.write_all(&chunk_crc(chunk_ty.0, data).to_be_bytes())?;
  Ok(())
}
