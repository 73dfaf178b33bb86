//! Error types.
//!
//! [`PngError`] is the codec level diagnostic. The boundary operations wrap
//! it in [`DecodeError`] or [`EncodeError`] according to the phase of the call
//! that failed, so the caller can tell *where* things went wrong as well as
//! *what* went wrong.

use core::fmt;

/// A diagnostic from the PNG codec layer.
///
/// The `Display` output of each variant is the message surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum PngError {
  /// The first 8 bytes are not the PNG signature.
  BytesAreNotPng,
  /// The first chunk is missing or isn't `IHDR`.
  MissingIhdr,
  /// The `IHDR` chunk has the wrong length or illegal field values.
  IhdrIllegalData,
  /// A chunk's length, type, data, or CRC runs past the end of the input.
  ChunkTruncated,
  /// A chunk's declared length is over `2^31-1`.
  ChunkTooLong,
  /// Accepting a chunk would go over the configured chunk limits.
  ChunkLimitExceeded,
  /// A chunk type contains bytes that aren't ASCII letters.
  IllegalChunkType,
  /// A chunk's declared CRC doesn't match the computed CRC.
  CrcMismatch,
  /// The zlib stream's Adler-32 doesn't match the decompressed data.
  Adler32Mismatch,
  /// A critical chunk type that this decoder doesn't know.
  UnrecognizedCriticalChunk,
  /// There's no `IDAT` chunk.
  IdatNotFound,
  /// The zlib stream inside the `IDAT` chunks is corrupt.
  IdatDecompressionFailed,
  /// The image data ended before all scanlines were filled.
  ImageDataTruncated,
  /// The image data decompressed to more bytes than the image needs.
  ImageDataOverflow,
  /// A scanline uses a filter type other than 0 through 4.
  IllegalFilterType,
  /// An indexed color image has no `PLTE` chunk.
  MissingPalette,
  /// The `PLTE` chunk length isn't a multiple of 3, or it's too long.
  IllegalPalette,
  /// A pixel uses an index past the end of the palette.
  PaletteIndexOutOfRange,
  /// The input ended without an `IEND` chunk.
  MissingIend,
  /// Width or height is 0.
  ZeroDimension,
  /// Width or height is over `2^31-1`.
  DimensionTooLarge,
  /// The bit depth / color type pair can't be used here.
  UnsupportedFormat,
  /// Interlaced output can't be generated.
  InterlaceNotSupported,
  /// Computing a buffer size overflowed `usize`.
  SizeOverflow,
  /// The allocator couldn't give us enough space.
  AllocationFailed,
  /// A caller provided buffer is not the required size.
  BufferSizeMismatch,
  /// A scanline given to the encoder is not `width * 4` bytes.
  ScanlineLengthMismatch,
  /// All scanlines were already written.
  ScanlinesExhausted,
  /// An encoder option was set at the wrong point in the session.
  InvalidSessionState,
  /// The encoder session has no header yet.
  HeaderNotSet,
  /// The encoder session has no sink yet.
  SinkNotSet,
  /// The deflate compressor reported a failure.
  DeflateFailed,
  /// A write to the sink failed.
  Io(std::io::ErrorKind),
  /// The encoder stopped with a status other than end-of-image.
  UnexpectedStatus,
}
impl fmt::Display for PngError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let msg = match self {
      Self::BytesAreNotPng => "missing PNG signature",
      Self::MissingIhdr => "first chunk is not IHDR",
      Self::IhdrIllegalData => "invalid IHDR chunk",
      Self::ChunkTruncated => "chunk runs past the end of the data",
      Self::ChunkTooLong => "chunk length exceeds 2^31-1",
      Self::ChunkLimitExceeded => "chunk size limit exceeded",
      Self::IllegalChunkType => "invalid chunk type",
      Self::CrcMismatch => "chunk CRC mismatch",
      Self::Adler32Mismatch => "zlib Adler-32 mismatch",
      Self::UnrecognizedCriticalChunk => "unknown critical chunk",
      Self::IdatNotFound => "no IDAT chunk",
      Self::IdatDecompressionFailed => "IDAT stream error",
      Self::ImageDataTruncated => "image data ended early",
      Self::ImageDataOverflow => "too much image data",
      Self::IllegalFilterType => "invalid scanline filter type",
      Self::MissingPalette => "indexed image without PLTE",
      Self::IllegalPalette => "invalid PLTE chunk",
      Self::PaletteIndexOutOfRange => "palette index out of range",
      Self::MissingIend => "no IEND chunk",
      Self::ZeroDimension => "width or height is zero",
      Self::DimensionTooLarge => "width or height exceeds 2^31-1",
      Self::UnsupportedFormat => "unsupported bit depth / color type",
      Self::InterlaceNotSupported => "interlaced encoding is not supported",
      Self::SizeOverflow => "image size overflows usize",
      Self::AllocationFailed => "allocation failed",
      Self::BufferSizeMismatch => "buffer size mismatch",
      Self::ScanlineLengthMismatch => "scanline length mismatch",
      Self::ScanlinesExhausted => "all scanlines already encoded",
      Self::InvalidSessionState => "invalid session state",
      Self::HeaderNotSet => "header not set",
      Self::SinkNotSet => "no output sink",
      Self::DeflateFailed => "deflate error",
      Self::Io(kind) => return write!(f, "write error: {kind}"),
      Self::UnexpectedStatus => "unexpected status",
    };
    f.write_str(msg)
  }
}
impl std::error::Error for PngError {}
impl From<std::io::Error> for PngError {
  #[inline]
  fn from(e: std::io::Error) -> Self {
    Self::Io(e.kind())
  }
}
impl From<std::collections::TryReserveError> for PngError {
  #[inline]
  fn from(_: std::collections::TryReserveError) -> Self {
    Self::AllocationFailed
  }
}

/// Failure of [`decode`](crate::decode), by phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
  /// The decoding session couldn't be created.
  Session,
  /// The header couldn't be read.
  HeaderParse(PngError),
  /// The output buffer size couldn't be computed.
  SizeComputation,
  /// The output buffer couldn't be allocated.
  Allocation {
    /// Requested size of the output buffer.
    bytes: usize,
  },
  /// The image body couldn't be decoded.
  Decode(PngError),
}
impl fmt::Display for DecodeError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Session => f.write_str("failed to create decoding session"),
      Self::HeaderParse(e) => write!(f, "failed to read header: {e}"),
      Self::SizeComputation => f.write_str("failed to compute decoded image size"),
      Self::Allocation { bytes } => write!(f, "failed to allocate {bytes} bytes"),
      Self::Decode(e) => write!(f, "{e}"),
    }
  }
}
impl std::error::Error for DecodeError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::HeaderParse(e) | Self::Decode(e) => Some(e),
      _ => None,
    }
  }
}

/// Failure of [`encode`](crate::encode), by phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
  /// The output file couldn't be opened for writing.
  SinkOpen(std::io::ErrorKind),
  /// The encoding session couldn't be created.
  Session,
  /// The header was rejected.
  HeaderWrite(PngError),
  /// The filter configuration was rejected.
  EncoderConfig(PngError),
  /// The sink couldn't be bound to the session.
  SinkBind(PngError),
  /// The image encode couldn't begin.
  EncodeStart(PngError),
  /// The scanlines didn't finish with end-of-image.
  IncompleteEncode(PngError),
}
impl fmt::Display for EncodeError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::SinkOpen(kind) => write!(f, "can not open the output: {kind}"),
      Self::Session => f.write_str("failed to create encoding session"),
      Self::HeaderWrite(e) => write!(f, "header rejected: {e}"),
      Self::EncoderConfig(e) => write!(f, "encoder option rejected: {e}"),
      Self::SinkBind(e) => write!(f, "failed to bind output: {e}"),
      Self::EncodeStart(e) => write!(f, "failed to start encode: {e}"),
      Self::IncompleteEncode(e) => write!(f, "{e}"),
    }
  }
}
impl std::error::Error for EncodeError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::HeaderWrite(e)
      | Self::EncoderConfig(e)
      | Self::SinkBind(e)
      | Self::EncodeStart(e)
      | Self::IncompleteEncode(e) => Some(e),
      _ => None,
    }
  }
}
