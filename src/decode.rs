//! PNG bytes to an RGBA8 [`Raster`].

use alloc::vec::Vec;

use bitfrob::u8_replicate_bits;

use crate::{
  pixels::{RGB8, RGBA8},
  png::*,
  raster::{xy_width_to_index, PixelBuffer, Raster},
  DecodeError, PngError,
};

pub use crate::png::{ChunkLimits, CrcPolicy};

/// Per-call decoder configuration.
///
/// The default ignores checksums and caps both chunk classes at 64 MiB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DecodeOptions {
  pub crc: CrcPolicy,
  pub chunk_limits: ChunkLimits,
}

/// One decode of one PNG.
///
/// The intended call order is [`set_source`](Self::set_source),
/// [`read_header`](Self::read_header),
/// [`decoded_image_size`](Self::decoded_image_size), then
/// [`decode_image`](Self::decode_image). [`decode_with`] does exactly that.
#[derive(Debug, Clone)]
pub struct DecodeSession<'b> {
  options: DecodeOptions,
  source: Option<&'b [u8]>,
  header: Option<PngHeader>,
}
impl<'b> DecodeSession<'b> {
  /// ## Failure
  /// * Either chunk limit is 0.
  pub fn new(options: DecodeOptions) -> Result<Self, DecodeError> {
    if options.chunk_limits.standard == 0 || options.chunk_limits.unknown == 0 {
      return Err(DecodeError::Session);
    }
    Ok(Self { options, source: None, header: None })
  }

  /// Binds the PNG bytes. Any header read from a previous source is dropped.
  #[inline]
  pub fn set_source(&mut self, bytes: &'b [u8]) {
    self.source = Some(bytes);
    self.header = None;
  }

  fn chunks(&self) -> Result<ChunkReader<'b>, PngError> {
    let source = self.source.ok_or(PngError::InvalidSessionState)?;
    ChunkReader::new(source, self.options.chunk_limits, self.options.crc)
  }

  /// Reads the signature and the `IHDR` chunk.
  pub fn read_header(&mut self) -> Result<PngHeader, PngError> {
    let header = match self.chunks()?.next() {
      Some(Ok(chunk)) if chunk.chunk_ty == PngChunkTy::IHDR => {
        PngHeader::from_ihdr_data(chunk.data)?
      }
      Some(Err(e)) => return Err(e),
      _ => return Err(PngError::MissingIhdr),
    };
    log::debug!(
      "PNG header: {}x{}, {:?} at {} bits, {:?}",
      header.width,
      header.height,
      header.color_type,
      header.bit_depth,
      header.interlace_method
    );
    self.header = Some(header);
    Ok(header)
  }

  /// The header from the last [`read_header`](Self::read_header), if any.
  #[inline]
  #[must_use]
  pub fn header(&self) -> Option<PngHeader> {
    self.header
  }

  /// Bytes of RGBA8 output the image needs, `width * height * 4`.
  ///
  /// This is `None` before the header is read, or if the size of the output
  /// or of the filtered data stream would overflow `usize`.
  #[must_use]
  pub fn decoded_image_size(&self) -> Option<usize> {
    let header = self.header?;
    header.filtered_data_size()?;
    header.rgba8_image_size()
  }

  /// Decodes the full image into `out` as RGBA8.
  ///
  /// `out` must be exactly [`decoded_image_size`](Self::decoded_image_size)
  /// bytes. On error the contents of `out` are unspecified.
  pub fn decode_image(&mut self, out: &mut [u8]) -> Result<(), PngError> {
    let header = self.header.ok_or(PngError::InvalidSessionState)?;
    let expected = header.rgba8_image_size().ok_or(PngError::SizeOverflow)?;
    if out.len() != expected {
      return Err(PngError::BufferSizeMismatch);
    }
    let image: &mut [RGBA8] = bytemuck::cast_slice_mut(out);
    self.decode_into(image)
  }

  /// Inflates, unfilters, and converts the image a scanline at a time,
  /// handing every pixel to `image`.
  fn decode_into<S: PixelSink + ?Sized>(&self, image: &mut S) -> Result<(), PngError> {
    let header = self.header.ok_or(PngError::InvalidSessionState)?;
    let body = self.walk_body()?;
    let palette = match (header.color_type, body.palette) {
      (PngColorType::Index, None) => return Err(PngError::MissingPalette),
      (_, palette) => palette.unwrap_or(&[]),
    };
    let transparency = Transparency::new(&header, body.trns, palette.len());

    let mut idat = IdatInflater::new(&body.idats, self.options.crc);
    let mut bad_index = false;
    unfilter_scanlines(
      &header,
      |line, len| idat.read_exact(line, len),
      |x, y, data| match to_rgba8(&header, palette, &transparency, data) {
        Some(rgba) => image.put(xy_width_to_index(x, y, header.width), rgba),
        None => bad_index = true,
      },
    )?;
    idat.finish()?;
    if bad_index {
      return Err(PngError::PaletteIndexOutOfRange);
    }
    log::debug!("decoded {}x{} PNG", header.width, header.height);
    Ok(())
  }

  /// Walks every chunk after `IHDR` up to `IEND`, collecting the ones that
  /// matter for pixels.
  fn walk_body(&self) -> Result<Body<'b>, PngError> {
    let mut body = Body { palette: None, trns: None, idats: Vec::new() };
    let mut chunks = self.chunks()?.skip(1);
    loop {
      let chunk = match chunks.next() {
        Some(chunk) => chunk?,
        None => return Err(PngError::MissingIend),
      };
      log::trace!("chunk {:?}, {} bytes", chunk.chunk_ty, chunk.data.len());
      match chunk.chunk_ty {
        PngChunkTy::IEND => break,
        PngChunkTy::IDAT => body.idats.push(chunk.data),
        PngChunkTy::PLTE => {
          if chunk.data.is_empty() || chunk.data.len() > 256 * 3 {
            return Err(PngError::IllegalPalette);
          }
          let entries: &[RGB8] =
            bytemuck::try_cast_slice(chunk.data).map_err(|_| PngError::IllegalPalette)?;
          body.palette = Some(entries);
        }
        PngChunkTy::tRNS => body.trns = Some(chunk.data),
        PngChunkTy::IHDR => return Err(PngError::IhdrIllegalData),
        ty if ty.is_critical() && !ty.is_standard() => {
          return Err(PngError::UnrecognizedCriticalChunk)
        }
        _ => (),
      }
    }
    if body.idats.is_empty() {
      return Err(PngError::IdatNotFound);
    }
    Ok(body)
  }
}

/// The parts of a PNG body needed to build pixels.
struct Body<'b> {
  palette: Option<&'b [RGB8]>,
  trns: Option<&'b [u8]>,
  idats: Vec<&'b [u8]>,
}

/// Where decoded pixels land.
trait PixelSink {
  /// Stores the pixel at `index`, counted in pixels from the top left.
  fn put(&mut self, index: usize, rgba: RGBA8);
}
impl PixelSink for [RGBA8] {
  #[inline]
  fn put(&mut self, index: usize, rgba: RGBA8) {
    if let Some(p) = self.get_mut(index) {
      *p = rgba;
    }
  }
}

/// Output bytes that only get initialized as their rows get pixels.
///
/// The full capacity is reserved up front, but the memory of a row isn't
/// written until a pixel in it is decoded. A header that claims a huge image
/// with hardly any data behind it stays cheap.
struct LazyRows {
  bytes: Vec<u8>,
  row_size: usize,
  total: usize,
}
impl PixelSink for LazyRows {
  #[inline]
  fn put(&mut self, index: usize, rgba: RGBA8) {
    let start = index * 4;
    if start >= self.bytes.len() {
      let row_end = (start / self.row_size + 1) * self.row_size;
      // within the reserved capacity, so this never reallocates.
      self.bytes.resize(row_end.min(self.total), 0);
    }
    if let Some(p) = self.bytes.get_mut(start..start + 4) {
      p.copy_from_slice(bytemuck::bytes_of(&rgba));
    }
  }
}

/// How `tRNS` applies to the image.
enum Transparency<'b> {
  None,
  /// Gray sample (at full precision) that's fully transparent.
  GrayKey(u16),
  /// RGB sample (at full precision) that's fully transparent.
  RgbKey([u16; 3]),
  /// Alpha for each palette entry, entries past the end are opaque.
  PaletteAlphas(&'b [u8]),
}
impl<'b> Transparency<'b> {
  fn new(header: &PngHeader, trns: Option<&'b [u8]>, palette_len: usize) -> Self {
    let Some(data) = trns else { return Self::None };
    match (header.color_type, data) {
      (PngColorType::Y, &[y0, y1]) => Self::GrayKey(u16::from_be_bytes([y0, y1])),
      (PngColorType::RGB, &[r0, r1, g0, g1, b0, b1]) => Self::RgbKey([
        u16::from_be_bytes([r0, r1]),
        u16::from_be_bytes([g0, g1]),
        u16::from_be_bytes([b0, b1]),
      ]),
      (PngColorType::Index, alphas) if alphas.len() <= palette_len => Self::PaletteAlphas(alphas),
      (color_type, _) => {
        log::warn!("ignoring a tRNS chunk of {} bytes for {color_type:?}", data.len());
        Self::None
      }
    }
  }
}

/// Converts one unfiltered pixel to RGBA8.
///
/// Returns `None` only for a palette index past the end of the palette.
#[inline]
fn to_rgba8(
  header: &PngHeader, palette: &[RGB8], transparency: &Transparency<'_>, data: &[u8],
) -> Option<RGBA8> {
  let wide = header.bit_depth == 16;
  // the full precision value of channel `i`
  let sample = |i: usize| {
    if wide {
      u16::from_be_bytes([data[i * 2], data[i * 2 + 1]])
    } else {
      u16::from(data[i])
    }
  };
  // the 8-bit value of channel `i`
  let channel = |i: usize| if wide { data[i * 2] } else { data[i] };
  Some(match header.color_type {
    PngColorType::Y => {
      let y = if header.bit_depth < 8 {
        u8_replicate_bits(u32::from(header.bit_depth), data[0])
      } else {
        channel(0)
      };
      let a = match transparency {
        Transparency::GrayKey(key) if *key == sample(0) => 0,
        _ => 255,
      };
      RGBA8 { r: y, g: y, b: y, a }
    }
    PngColorType::RGB => {
      let a = match transparency {
        Transparency::RgbKey(key) if *key == [sample(0), sample(1), sample(2)] => 0,
        _ => 255,
      };
      RGBA8 { r: channel(0), g: channel(1), b: channel(2), a }
    }
    PngColorType::Index => {
      let i = usize::from(data[0]);
      let RGB8 { r, g, b } = *palette.get(i)?;
      let a = match transparency {
        Transparency::PaletteAlphas(alphas) => alphas.get(i).copied().unwrap_or(255),
        _ => 255,
      };
      RGBA8 { r, g, b, a }
    }
    PngColorType::YA => {
      let y = channel(0);
      RGBA8 { r: y, g: y, b: y, a: channel(1) }
    }
    PngColorType::RGBA => RGBA8 { r: channel(0), g: channel(1), b: channel(2), a: channel(3) },
  })
}

/// Decodes PNG bytes with the default [`DecodeOptions`].
///
/// Checksums are not verified. Use [`decode_with`] and [`CrcPolicy::Verify`]
/// to verify them.
#[inline]
pub fn decode(bytes: &[u8]) -> Result<Raster, DecodeError> {
  decode_with(bytes, DecodeOptions::default())
}

/// Decodes PNG bytes into a new RGBA8 raster.
///
/// Any legal PNG is converted to RGBA8: palettes are expanded, grayscale is
/// spread to all three color channels, low bit depths are scaled up, 16-bit
/// channels keep their high byte, and alpha comes from the alpha channel or
/// `tRNS` (opaque otherwise).
///
/// The returned raster owns its pixels. Release them with
/// [`release`](crate::release) once you're done.
///
/// ## Failure
/// Each phase of the decode has its own [`DecodeError`] variant. Nothing
/// partial is ever returned.
pub fn decode_with(bytes: &[u8], options: DecodeOptions) -> Result<Raster, DecodeError> {
  let mut session = DecodeSession::new(options)?;
  session.set_source(bytes);
  let header = session.read_header().map_err(DecodeError::HeaderParse)?;
  let size = session.decoded_image_size().ok_or(DecodeError::SizeComputation)?;
  let row_size = header.rgba8_row_size().ok_or(DecodeError::SizeComputation)?;
  let mut out: Vec<u8> = Vec::new();
  out.try_reserve_exact(size).map_err(|_| DecodeError::Allocation { bytes: size })?;
  let mut image = LazyRows { bytes: out, row_size, total: size };
  session.decode_into(&mut image).map_err(DecodeError::Decode)?;
  let mut out = image.bytes;
  // every row gets at least one pixel, this is only a guard.
  out.resize(size, 0);
  let pixels = PixelBuffer::from_vec(out);
  Ok(Raster::from_parts(header.width, header.height, pixels))
}
