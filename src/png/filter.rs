use super::*;

/// The filter type applied to every scanline the encoder writes.
///
/// Adaptive (per line) selection isn't done, each line gets the same filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FilterChoice {
  /// Bytes are stored as-is.
  #[default]
  None = 0,
  /// Difference from the byte one pixel to the left.
  Sub = 1,
  /// Difference from the byte one line up.
  Up = 2,
  /// Difference from the average of left and up.
  Average = 3,
  /// Difference from the Paeth predictor of left, up, and up-left.
  Paeth = 4,
}

/// Appends the filtered form of `row` to `out`, starting with the filter type
/// byte.
///
/// * `bpp` is the filter chunk size (bytes per complete pixel, minimum 1).
/// * `prev` is the unfiltered row above, or `None` on the first row.
pub(crate) fn filter_scanline(
  choice: FilterChoice, bpp: usize, row: &[u8], prev: Option<&[u8]>, out: &mut Vec<u8>,
) {
  let a_at = |i: usize| if i >= bpp { row[i - bpp] } else { 0 };
  let b_at = |i: usize| prev.and_then(|b_row| b_row.get(i)).copied().unwrap_or(0);
  out.push(choice as u8);
  match choice {
    FilterChoice::None => out.extend_from_slice(row),
    FilterChoice::Sub => {
      out.extend(row.iter().enumerate().map(|(i, x)| x.wrapping_sub(a_at(i))));
    }
    FilterChoice::Up => {
      out.extend(row.iter().enumerate().map(|(i, x)| x.wrapping_sub(b_at(i))));
    }
    FilterChoice::Average => out.extend(row.iter().enumerate().map(|(i, x)| {
      let avg = ((u16::from(a_at(i)) + u16::from(b_at(i))) / 2) as u8;
      x.wrapping_sub(avg)
    })),
    FilterChoice::Paeth => out.extend(row.iter().enumerate().map(|(i, x)| {
      let c = if i >= bpp { b_at(i - bpp) } else { 0 };
      x.wrapping_sub(paeth_predict(a_at(i), b_at(i), c))
    })),
  }
}
