//! Adam7 geometry.
//!
//! ```text
//! 1 6 4 6 2 6 4 6
//! 7 7 7 7 7 7 7 7
//! 5 6 5 6 5 6 5 6
//! 7 7 7 7 7 7 7 7
//! 3 6 4 6 3 6 4 6
//! 7 7 7 7 7 7 7 7
//! 5 6 5 6 5 6 5 6
//! 7 7 7 7 7 7 7 7
//! ```
//!
//! Throughout this module "image level" 0 is the full image, and levels 1
//! through 7 are the reduced images of an interlaced PNG. Treating a plain
//! image as level 0 lets the unfilter code handle both cases the same way.

/// `(x_start, y_start, x_step, y_step)` for each image level.
const ADAM7: [(u32, u32, u32, u32); 8] = [
  (0, 0, 1, 1),
  (0, 0, 8, 8),
  (4, 0, 8, 8),
  (0, 4, 4, 8),
  (2, 0, 4, 4),
  (0, 2, 2, 4),
  (1, 0, 2, 2),
  (0, 1, 1, 2),
];

/// How many of `full` positions land on a level with this `start` and `step`.
#[inline]
#[must_use]
const fn reduced_len(full: u32, start: u32, step: u32) -> u32 {
  if full <= start {
    0
  } else {
    let span = full - start;
    span / step + (span % step != 0) as u32
  }
}

/// Given the dimensions of the full PNG image, computes the size of each
/// reduced image.
///
/// The output uses index 0 as the base image size, and indexes 1 through 7 for
/// the size of reduced images 1 through 7.
#[inline]
#[must_use]
pub(crate) const fn reduced_image_dimensions(full_width: u32, full_height: u32) -> [(u32, u32); 8] {
  let mut out = [(0, 0); 8];
  let mut level = 0;
  while level < 8 {
    let (x_start, y_start, x_step, y_step) = ADAM7[level];
    out[level] =
      (reduced_len(full_width, x_start, x_step), reduced_len(full_height, y_start, y_step));
    level += 1;
  }
  out
}

/// Converts a reduced image location into the full image location.
///
/// When giving an `image_level` of 0 the output will be the same as the input.
///
/// ## Panics
/// * If the image level given exceeds 7.
#[inline]
#[must_use]
pub(crate) const fn interlaced_pos_to_full_pos(
  image_level: usize, reduced_x: u32, reduced_y: u32,
) -> (u32, u32) {
  let (x_start, y_start, x_step, y_step) = ADAM7[image_level];
  (reduced_x * x_step + x_start, reduced_y * y_step + y_start)
}
