use alloc::vec::Vec;

use super::*;
use crate::PngError;

#[inline]
#[must_use]
pub(crate) const fn paeth_predict(a: u8, b: u8, c: u8) -> u8 {
  let a_ = a as i32;
  let b_ = b as i32;
  let c_ = c as i32;
  let p: i32 = a_ + b_ - c_;
  let pa = (p - a_).abs();
  let pb = (p - b_).abs();
  let pc = (p - c_).abs();
  // The PNG spec fixes the order of evaluation of these tests, don't touch it.
  if pa <= pb && pa <= pc {
    a
  } else if pb <= pc {
    b
  } else {
    c
  }
}

/// Unfilters one line in place.
///
/// `prev` is the already unfiltered line above, or `None` on the first line of
/// an image (where the line above is an implied line of zeros).
pub(crate) fn unfilter_line(
  filter: u8, bpp: usize, line: &mut [u8], prev: Option<&[u8]>,
) -> Result<(), PngError> {
  let b_at = |i: usize| prev.and_then(|b_line| b_line.get(i)).copied().unwrap_or(0);
  match filter {
    0 => (),
    1 => {
      // Sub
      for i in bpp..line.len() {
        line[i] = line[i].wrapping_add(line[i - bpp]);
      }
    }
    2 => {
      // Up
      if let Some(b_line) = prev {
        line.iter_mut().zip(b_line.iter().copied()).for_each(|(x, b)| *x = x.wrapping_add(b));
      }
    }
    3 => {
      // Average
      for i in 0..line.len() {
        let a = if i >= bpp { line[i - bpp] } else { 0 };
        let b = b_at(i);
        line[i] = line[i].wrapping_add(((u16::from(a) + u16::from(b)) / 2) as u8);
      }
    }
    4 => {
      // Paeth
      for i in 0..line.len() {
        let (a, c) = if i >= bpp { (line[i - bpp], b_at(i - bpp)) } else { (0, 0) };
        let b = b_at(i);
        line[i] = line[i].wrapping_add(paeth_predict(a, b, c));
      }
    }
    _ => return Err(PngError::IllegalFilterType),
  }
  Ok(())
}

fn send_out_pixel<F: FnMut(u32, u32, &[u8])>(
  header: &PngHeader, image_level: usize, reduced_width: u32, reduced_x: u32, reduced_y: u32,
  data: &[u8], op: &mut F,
) {
  match header.bit_depth {
    depth @ (1 | 2 | 4) => {
      let full_data: u8 = data[0];
      let per_byte = 8 / u32::from(depth);
      let mask = (1_u8 << depth) - 1;
      for plus_x in 0..per_byte {
        let sample_x = reduced_x * per_byte + plus_x;
        if sample_x >= reduced_width {
          // past the edge of the image we're looking at padding bits, and we
          // cancel the rest of the outputs for this byte.
          return;
        }
        let down_shift = 8 - u32::from(depth) * (plus_x + 1);
        let (image_x, image_y) = interlaced_pos_to_full_pos(image_level, sample_x, reduced_y);
        op(image_x, image_y, &[(full_data >> down_shift) & mask]);
      }
    }
    _ => {
      let (image_x, image_y) = interlaced_pos_to_full_pos(image_level, reduced_x, reduced_y);
      op(image_x, image_y, data);
    }
  }
}

/// Unfilters the image one filterline at a time, passing each pixel to `op`
/// as the unfiltering occurs.
///
/// `read_line(line, len)` must replace the contents of `line` with the next
/// `len` bytes of filtered data. Only the current line and the line above it
/// are ever held, so memory use follows the width, not the whole image.
///
/// Each call to the `op` gets `|x, y, data|` as arguments, where `x` and `y`
/// are the position of the pixel (relative to the top left of the full image),
/// and `data` is the unfiltered pixel value at that location:
/// * Bit depths 1, 2, and 4 have the value in the low bits of a single byte.
/// * Bit depth 8 has one byte per channel.
/// * Bit depth 16 has two big-endian bytes per channel.
///
/// ## Failure
/// * Any error from `read_line`. Some of the pixels might have gone to `op`
///   already.
/// * A line uses an unknown filter type.
/// * The line buffers can't be allocated.
pub(crate) fn unfilter_scanlines<R, F>(
  header: &PngHeader, mut read_line: R, mut op: F,
) -> Result<(), PngError>
where
  R: FnMut(&mut Vec<u8>, usize) -> Result<(), PngError>,
  F: FnMut(u32, u32, &[u8]),
{
  if header.width == 0 || header.height == 0 {
    return Err(PngError::ZeroDimension);
  }
  let filter_chunk_size = header.filter_chunk_size();

  // Interlaced data is reduced images 1 through 7, otherwise it's just the
  // full image at level 0.
  let levels = reduced_image_dimensions(header.width, header.height);
  let level_range = if header.is_interlaced() { 1..8 } else { 0..1 };
  // one pair of line buffers serves every level.
  let widest = levels[level_range.clone()]
    .iter()
    .filter_map(|(w, h)| if *h == 0 { None } else { header.bytes_per_filterline(*w) })
    .max()
    .ok_or(PngError::SizeOverflow)?;
  let mut line: Vec<u8> = Vec::new();
  line.try_reserve_exact(widest)?;
  let mut prev: Vec<u8> = Vec::new();
  prev.try_reserve_exact(widest)?;

  for image_level in level_range {
    let (reduced_width, reduced_height) = levels[image_level];
    if reduced_width == 0 || reduced_height == 0 {
      // the full image is never empty, but a reduced image can be.
      continue;
    }
    let bytes_per_filterline =
      header.bytes_per_filterline(reduced_width).ok_or(PngError::SizeOverflow)?;

    for reduced_y in 0..reduced_height {
      read_line(&mut line, bytes_per_filterline)?;
      let (f, pixels) = line.split_first_mut().ok_or(PngError::ImageDataTruncated)?;
      // each reduced image starts over with an implied line of zeros above.
      let above = if reduced_y == 0 { None } else { prev.get(1..) };
      unfilter_line(*f, filter_chunk_size, pixels, above)?;
      for (reduced_x, pixel) in pixels.chunks_exact(filter_chunk_size).enumerate() {
        send_out_pixel(
          header,
          image_level,
          reduced_width,
          reduced_x as u32,
          reduced_y,
          pixel,
          &mut op,
        );
      }
      core::mem::swap(&mut line, &mut prev);
    }
  }

  Ok(())
}
