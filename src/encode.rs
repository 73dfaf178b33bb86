//! RGBA8 pixels to PNG.
//!
//! The output is always 8-bit RGBA, not interlaced, with one filter type for
//! every line. Rows go in one at a time through an [`EncodeSession`], and the
//! compressed data goes out to the sink as `IDAT` chunks while the rows are
//! still coming in.

use std::{
  fs::File,
  io::{BufWriter, Write},
  path::Path,
};

use miniz_oxide::deflate::core::{
  compress, create_comp_flags_from_zip_params, CompressionStrategy, CompressorOxide, TDEFLFlush,
  TDEFLStatus,
};

use crate::{png::*, raster::Raster, EncodeError, PngError};

pub use crate::png::FilterChoice;

/// Payload size of every `IDAT` chunk except the last one.
pub const IDAT_PAYLOAD: usize = 32 * 1024;

/// Highest `compression_level` the deflate compressor knows.
pub const MAX_COMPRESSION_LEVEL: u8 = 10;

/// Per-call encoder configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncodeOptions {
  /// 0 (store only) through 10 (slowest), default 6.
  pub compression_level: u8,
}
impl Default for EncodeOptions {
  #[inline]
  fn default() -> Self {
    Self { compression_level: 6 }
  }
}

/// What an encoder session wants next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodeStatus {
  /// Send another scanline.
  NeedsMoreRows,
  /// The last scanline went in and the PNG is complete.
  EndOfImage,
}

/// The compressor side of a started session.
struct Stream {
  compressor: Box<CompressorOxide>,
  row_size: usize,
  rows_left: u32,
  prev_row: Vec<u8>,
  filtered: Vec<u8>,
}

enum Phase {
  Setup,
  Streaming(Stream),
  Finished,
  Failed,
}

/// A progressive PNG encode.
///
/// Configure with [`set_header`](Self::set_header),
/// [`set_filter_choice`](Self::set_filter_choice), and
/// [`set_sink`](Self::set_sink), then call [`start`](Self::start) and give
/// [`encode_scanline`](Self::encode_scanline) each row from top to bottom.
/// After an error the session can't be used any more.
pub struct EncodeSession<W: Write> {
  level: u8,
  header: Option<PngHeader>,
  filter: FilterChoice,
  sink: Option<W>,
  /// `IDAT` payload waiting to be written, `staged` bytes are in use.
  idat: Vec<u8>,
  staged: usize,
  phase: Phase,
}
impl<W: Write> EncodeSession<W> {
  /// ## Failure
  /// * The compression level is over [`MAX_COMPRESSION_LEVEL`].
  /// * The `IDAT` staging buffer can't be allocated.
  pub fn new(options: EncodeOptions) -> Result<Self, EncodeError> {
    if options.compression_level > MAX_COMPRESSION_LEVEL {
      return Err(EncodeError::Session);
    }
    let mut idat: Vec<u8> = Vec::new();
    idat.try_reserve_exact(IDAT_PAYLOAD).map_err(|_| EncodeError::Session)?;
    idat.resize(IDAT_PAYLOAD, 0);
    Ok(Self {
      level: options.compression_level,
      header: None,
      filter: FilterChoice::None,
      sink: None,
      idat,
      staged: 0,
      phase: Phase::Setup,
    })
  }

  fn check_setup(&self) -> Result<(), PngError> {
    match self.phase {
      Phase::Setup => Ok(()),
      _ => Err(PngError::InvalidSessionState),
    }
  }

  /// Sets the header that the image will have.
  ///
  /// ## Failure
  /// * Illegal header values, such as a zero width or height.
  /// * Anything other than 8-bit RGBA.
  /// * Interlacing.
  /// * The session was already started.
  pub fn set_header(&mut self, header: PngHeader) -> Result<(), PngError> {
    self.check_setup()?;
    header.validate()?;
    if header.bit_depth != RGBA8_BIT_DEPTH || header.color_type as u8 != RGBA_COLOR_TYPE {
      return Err(PngError::UnsupportedFormat);
    }
    if header.is_interlaced() {
      return Err(PngError::InterlaceNotSupported);
    }
    header.rgba8_image_size().ok_or(PngError::SizeOverflow)?;
    header.filtered_data_size().ok_or(PngError::SizeOverflow)?;
    self.header = Some(header);
    Ok(())
  }

  /// Sets the filter for all lines. The default is [`FilterChoice::None`].
  pub fn set_filter_choice(&mut self, choice: FilterChoice) -> Result<(), PngError> {
    self.check_setup()?;
    self.filter = choice;
    Ok(())
  }

  /// Binds the output. A sink can only be bound once.
  pub fn set_sink(&mut self, sink: W) -> Result<(), PngError> {
    self.check_setup()?;
    if self.sink.is_some() {
      return Err(PngError::InvalidSessionState);
    }
    self.sink = Some(sink);
    Ok(())
  }

  /// Writes the signature and `IHDR`, and gets ready for scanlines.
  pub fn start(&mut self) -> Result<(), PngError> {
    self.check_setup()?;
    let header = self.header.ok_or(PngError::HeaderNotSet)?;
    let sink = self.sink.as_mut().ok_or(PngError::SinkNotSet)?;
    let row_size = header.rgba8_row_size().ok_or(PngError::SizeOverflow)?;
    log::debug!(
      "encoding {}x{} RGBA8 PNG, level {}, {:?} filter",
      header.width,
      header.height,
      self.level,
      self.filter
    );
    let result = (|| -> Result<Stream, PngError> {
      sink.write_all(&PNG_SIGNATURE)?;
      write_chunk(sink, PngChunkTy::IHDR, &header.to_ihdr_data())?;
      let mut prev_row: Vec<u8> = Vec::new();
      prev_row.try_reserve_exact(row_size)?;
      let mut filtered: Vec<u8> = Vec::new();
      filtered.try_reserve_exact(row_size + 1)?;
      let flags = create_comp_flags_from_zip_params(
        i32::from(self.level),
        15,
        CompressionStrategy::Default as i32,
      );
      Ok(Stream {
        compressor: Box::new(CompressorOxide::new(flags)),
        row_size,
        rows_left: header.height,
        prev_row,
        filtered,
      })
    })();
    match result {
      Ok(stream) => {
        self.phase = Phase::Streaming(stream);
        Ok(())
      }
      Err(e) => {
        self.phase = Phase::Failed;
        Err(e)
      }
    }
  }

  /// Encodes the next scanline, which must be exactly `width * 4` bytes.
  ///
  /// The last scanline finishes the zlib stream, writes `IEND`, and flushes
  /// the sink, then the status is [`EncodeStatus::EndOfImage`].
  pub fn encode_scanline(&mut self, row: &[u8]) -> Result<EncodeStatus, PngError> {
    let stream = match &mut self.phase {
      Phase::Streaming(stream) => stream,
      Phase::Finished => return Err(PngError::ScanlinesExhausted),
      _ => return Err(PngError::InvalidSessionState),
    };
    if row.len() != stream.row_size {
      // a bad row isn't written, so the session can still continue.
      return Err(PngError::ScanlineLengthMismatch);
    }
    let sink = self.sink.as_mut().ok_or(PngError::SinkNotSet)?;
    let mut out = IdatWriter { sink, idat: &mut self.idat, staged: &mut self.staged };
    match out.push_row(stream, self.filter, row) {
      Ok(EncodeStatus::EndOfImage) => {
        self.phase = Phase::Finished;
        log::debug!("PNG encode complete");
        Ok(EncodeStatus::EndOfImage)
      }
      Ok(status) => Ok(status),
      Err(e) => {
        self.phase = Phase::Failed;
        Err(e)
      }
    }
  }

  /// Ends the session, giving back the sink (if one was bound).
  #[inline]
  pub fn into_sink(self) -> Option<W> {
    self.sink
  }
}

/// Turns compressed bytes into `IDAT` chunks.
struct IdatWriter<'s, W: Write> {
  sink: &'s mut W,
  idat: &'s mut [u8],
  staged: &'s mut usize,
}
impl<W: Write> IdatWriter<'_, W> {
  fn push_row(
    &mut self, stream: &mut Stream, filter: FilterChoice, row: &[u8],
  ) -> Result<EncodeStatus, PngError> {
    stream.filtered.clear();
    let prev = if stream.prev_row.is_empty() { None } else { Some(stream.prev_row.as_slice()) };
    filter_scanline(filter, 4, row, prev, &mut stream.filtered);
    stream.rows_left -= 1;
    let last_row = stream.rows_left == 0;
    let flush = if last_row { TDEFLFlush::Finish } else { TDEFLFlush::None };
    self.deflate(&mut stream.compressor, &stream.filtered, flush)?;
    if !last_row {
      stream.prev_row.clear();
      stream.prev_row.extend_from_slice(row);
      return Ok(EncodeStatus::NeedsMoreRows);
    }
    self.write_staged()?;
    write_chunk(self.sink, PngChunkTy::IEND, &[])?;
    self.sink.flush()?;
    Ok(EncodeStatus::EndOfImage)
  }

  fn deflate(
    &mut self, compressor: &mut CompressorOxide, mut input: &[u8], flush: TDEFLFlush,
  ) -> Result<(), PngError> {
    let finishing = matches!(flush, TDEFLFlush::Finish);
    loop {
      let (status, consumed, written) =
        compress(compressor, input, &mut self.idat[*self.staged..], flush);
      *self.staged += written;
      input = input.get(consumed..).unwrap_or(&[]);
      let done = match status {
        TDEFLStatus::Done => true,
        TDEFLStatus::Okay => false,
        TDEFLStatus::BadParam | TDEFLStatus::PutBufFailed => {
          return Err(PngError::DeflateFailed)
        }
      };
      if done {
        // the compressor refuses any call after this.
        return Ok(());
      }
      if *self.staged == self.idat.len() {
        self.write_staged()?;
        continue;
      }
      if !finishing && input.is_empty() {
        return Ok(());
      }
      if consumed == 0 && written == 0 {
        return Err(PngError::DeflateFailed);
      }
    }
  }

  fn write_staged(&mut self) -> Result<(), PngError> {
    if *self.staged > 0 {
      write_chunk(self.sink, PngChunkTy::IDAT, &self.idat[..*self.staged])?;
      log::trace!("wrote IDAT, {} bytes", *self.staged);
      *self.staged = 0;
    }
    Ok(())
  }
}

/// Encodes an RGBA8 image to any [`Write`] sink, giving the sink back after
/// the PNG is complete.
///
/// Row `i` is `pixels[i * width * 4 .. (i + 1) * width * 4]`.
///
/// ## Failure
/// Each phase of the encode has its own [`EncodeError`] variant. A `pixels`
/// slice too short for the image is an [`EncodeError::IncompleteEncode`].
pub fn encode_with<W: Write>(
  sink: W, pixels: &[u8], width: u32, height: u32, options: EncodeOptions,
) -> Result<W, EncodeError> {
  let mut session = EncodeSession::new(options)?;
  let header = PngHeader::rgba8(width, height);
  session.set_header(header).map_err(EncodeError::HeaderWrite)?;
  session.set_filter_choice(FilterChoice::None).map_err(EncodeError::EncoderConfig)?;
  session.set_sink(sink).map_err(EncodeError::SinkBind)?;
  session.start().map_err(EncodeError::EncodeStart)?;

  // set_header checked that this fits.
  let stride = header.rgba8_row_size().ok_or(EncodeError::HeaderWrite(PngError::SizeOverflow))?;
  let mut status = Ok(EncodeStatus::NeedsMoreRows);
  for row in pixels.chunks_exact(stride).take(height as usize) {
    status = session.encode_scanline(row);
    if status.is_err() {
      break;
    }
  }
  match status {
    Ok(EncodeStatus::EndOfImage) => {
      session.into_sink().ok_or(EncodeError::IncompleteEncode(PngError::SinkNotSet))
    }
    Ok(EncodeStatus::NeedsMoreRows) => Err(EncodeError::IncompleteEncode(PngError::UnexpectedStatus)),
    Err(e) => Err(EncodeError::IncompleteEncode(e)),
  }
}

/// Encodes an RGBA8 image into a new `Vec<u8>`.
#[inline]
pub fn encode_to_vec(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>, EncodeError> {
  encode_with(Vec::new(), pixels, width, height, EncodeOptions::default())
}

/// Encodes an RGBA8 image to a file, creating or truncating it.
///
/// `pixels` must be `width * height * 4` bytes, rows top to bottom. If the
/// encode fails after the file was opened, the file is removed.
pub fn encode<P: AsRef<Path>>(
  path: P, pixels: &[u8], width: u32, height: u32,
) -> Result<(), EncodeError> {
  let path = path.as_ref();
  let file = File::create(path).map_err(|e| EncodeError::SinkOpen(e.kind()))?;
  let result = encode_with(BufWriter::new(file), pixels, width, height, EncodeOptions::default())
    .and_then(|sink| {
      sink.into_inner().map(drop).map_err(|e| EncodeError::IncompleteEncode(PngError::Io(e.error().kind())))
    });
  if result.is_err() {
    if let Err(e) = std::fs::remove_file(path) {
      log::warn!("couldn't remove {} after a failed encode: {e}", path.display());
    }
  }
  result
}

/// Encodes a [`Raster`] to a file. See [`encode`].
#[inline]
pub fn encode_raster<P: AsRef<Path>>(path: P, raster: &Raster) -> Result<(), EncodeError> {
  encode(path, raster.as_bytes(), raster.width(), raster.height())
}
