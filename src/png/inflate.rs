use alloc::{boxed::Box, vec::Vec};
use core::slice;

use miniz_oxide::inflate::{
  core::{
    decompress,
    inflate_flags::{
      TINFL_FLAG_HAS_MORE_INPUT, TINFL_FLAG_IGNORE_ADLER32, TINFL_FLAG_PARSE_ZLIB_HEADER,
      TINFL_FLAG_USING_NON_WRAPPING_OUTPUT_BUF,
    },
    DecompressorOxide,
  },
  TINFLStatus,
};

use super::*;
use crate::PngError;

/// How far back a deflate match can reach.
const WINDOW_SIZE: usize = 32 * 1024;

/// Free space guaranteed to the decompressor on each call.
const OUT_CHUNK: usize = 32 * 1024;

/// The zlib stream that's spread over the `IDAT` chunks, inflated only as far
/// as the scanlines asked for so far.
///
/// The output buffer holds the bytes not handed out yet plus the last
/// [`WINDOW_SIZE`] bytes before them, so it stays small no matter what the
/// image dimensions claim.
pub(crate) struct IdatInflater<'b> {
  state: Box<DecompressorOxide>,
  idats: slice::Iter<'b, &'b [u8]>,
  input: &'b [u8],
  flags: u32,
  out: Vec<u8>,
  /// End of the inflated bytes in `out`.
  out_pos: usize,
  /// Bytes before this were already handed out.
  read_pos: usize,
  done: bool,
}
impl<'b> IdatInflater<'b> {
  pub(crate) fn new(idats: &'b [&'b [u8]], crc: CrcPolicy) -> Self {
    let flags = TINFL_FLAG_PARSE_ZLIB_HEADER
      | TINFL_FLAG_USING_NON_WRAPPING_OUTPUT_BUF
      | match crc {
        CrcPolicy::Ignore => TINFL_FLAG_IGNORE_ADLER32,
        CrcPolicy::Verify => 0,
      };
    Self {
      state: Box::default(),
      idats: idats.iter(),
      input: &[],
      flags,
      out: Vec::new(),
      out_pos: 0,
      read_pos: 0,
      done: false,
    }
  }

  /// Replaces the contents of `line` with the next `len` inflated bytes.
  ///
  /// ## Failure
  /// * The stream ends (or the `IDAT` data runs out) before `len` bytes.
  /// * Any error from the zlib stream itself.
  pub(crate) fn read_exact(&mut self, line: &mut Vec<u8>, len: usize) -> Result<(), PngError> {
    line.clear();
    while line.len() < len {
      if self.read_pos == self.out_pos {
        if self.done {
          return Err(PngError::ImageDataTruncated);
        }
        self.inflate_more()?;
        continue;
      }
      let n = (self.out_pos - self.read_pos).min(len - line.len());
      line.extend_from_slice(&self.out[self.read_pos..self.read_pos + n]);
      self.read_pos += n;
    }
    Ok(())
  }

  /// Runs the stream to its end once all scanlines are out.
  ///
  /// The end of block and the Adler-32 can sit in a later `IDAT` than the last
  /// scanline byte, so this keeps feeding input until the stream says it's
  /// done.
  ///
  /// ## Failure
  /// * The stream makes bytes past the end of the image.
  /// * The stream never finishes.
  pub(crate) fn finish(mut self) -> Result<(), PngError> {
    loop {
      if self.out_pos > self.read_pos {
        return Err(PngError::ImageDataOverflow);
      }
      if self.done {
        return Ok(());
      }
      self.inflate_more()?;
    }
  }

  /// Makes sure there's [`OUT_CHUNK`] free bytes past `out_pos`, dropping
  /// bytes that are both handed out and outside the match window.
  fn make_room(&mut self) -> Result<(), PngError> {
    if self.out.len() - self.out_pos >= OUT_CHUNK {
      return Ok(());
    }
    let keep_from = self.out_pos.saturating_sub(WINDOW_SIZE).min(self.read_pos);
    if keep_from > 0 {
      self.out.drain(..keep_from);
      self.out_pos -= keep_from;
      self.read_pos -= keep_from;
    }
    let needed = self.out_pos + OUT_CHUNK;
    if self.out.len() < needed {
      self.out.try_reserve_exact(needed - self.out.len())?;
      self.out.resize(needed, 0);
    }
    Ok(())
  }

  /// Inflates until some new bytes come out or the stream ends.
  fn inflate_more(&mut self) -> Result<(), PngError> {
    self.make_room()?;
    loop {
      if self.input.is_empty() {
        if let Some(idat) = self.idats.next() {
          self.input = idat;
          continue;
        }
        // out of IDAT data: without the more-input flag the decompressor
        // reports how the stream really ends.
      }
      let has_more = self.idats.len() > 0;
      let (status, in_read, written) = decompress(
        &mut self.state,
        self.input,
        &mut self.out,
        self.out_pos,
        self.flags | if has_more { TINFL_FLAG_HAS_MORE_INPUT } else { 0 },
      );
      self.input = self.input.get(in_read..).unwrap_or(&[]);
      self.out_pos += written;
      match status {
        TINFLStatus::Done => {
          self.done = true;
          let extra = self.input.len() + self.idats.by_ref().map(|idat| idat.len()).sum::<usize>();
          if extra > 0 {
            log::warn!("ignoring {extra} bytes after the end of the zlib stream");
          }
          return Ok(());
        }
        TINFLStatus::NeedsMoreInput => {
          if !self.input.is_empty() && in_read == 0 && written == 0 {
            return Err(PngError::IdatDecompressionFailed);
          }
          if self.input.is_empty() && !has_more {
            return Err(PngError::ImageDataTruncated);
          }
          if written > 0 {
            return Ok(());
          }
        }
        // the free space is used up, the caller takes bytes and comes back.
        TINFLStatus::HasMoreOutput => {
          if written == 0 && in_read == 0 {
            return Err(PngError::IdatDecompressionFailed);
          }
          return Ok(());
        }
        TINFLStatus::FailedCannotMakeProgress => return Err(PngError::ImageDataTruncated),
        TINFLStatus::Adler32Mismatch => return Err(PngError::Adler32Mismatch),
        TINFLStatus::Failed | TINFLStatus::BadParam => {
          return Err(PngError::IdatDecompressionFailed)
        }
      }
    }
  }
}
