//! Gap geometry: bounded-run scanning over a 3x3 alpha neighborhood.
//!
//! A gap is a run of fillable pixels (score > 0) bounded on both ends by
//! unfillable pixels, no longer than the configured gap limit. Runs are
//! searched along rows and columns; because a run may start or end up to
//! `max_gap` pixels beyond the center tile, scanning works over the full
//! 3x3 alpha neighborhood. Diagonal lines are deliberately not scanned:
//! two perpendicular walls meeting at an ordinary region corner would
//! bound a short diagonal run, and seep retraction would then eat the
//! corners out of every rectangular fill.

use crate::coords::TILE_SIZE;
use crate::tile::{AlphaTile, TileBuf};

/// 3x3 neighborhood of alpha tiles, in `nine_grid` order (center, N, E, S,
/// W, NE, SE, SW, NW).
pub struct AlphaGrid<'a> {
  tiles: [&'a AlphaTile; 9],
}

impl<'a> AlphaGrid<'a> {
  pub fn new(tiles: [&'a AlphaTile; 9]) -> Self {
    Self { tiles }
  }

  /// Alpha at a position relative to the center tile's origin.
  ///
  /// Valid for coordinates within one tile of the center; anything farther
  /// reads as unfillable.
  #[inline]
  pub fn alpha(&self, x: i32, y: i32) -> u16 {
    let n = TILE_SIZE as i32;
    let index = match (x.div_euclid(n), y.div_euclid(n)) {
      (0, 0) => 0,
      (0, -1) => 1,
      (1, 0) => 2,
      (0, 1) => 3,
      (-1, 0) => 4,
      (1, -1) => 5,
      (1, 1) => 6,
      (-1, 1) => 7,
      (-1, -1) => 8,
      _ => return 0,
    };
    self.tiles[index].get(x.rem_euclid(n) as usize, y.rem_euclid(n) as usize)
  }

  #[inline]
  fn fillable(&self, x: i32, y: i32) -> bool {
    self.alpha(x, y) > 0
  }

  /// True when every tile of the neighborhood is fully opaque.
  pub fn all_full(&self) -> bool {
    self.tiles.iter().all(|t| t.is_full())
  }

  /// The center tile.
  pub fn center(&self) -> &AlphaTile {
    self.tiles[0]
  }
}

/// Scratch state for scanning one line of pixels for bounded runs.
pub struct DistanceBucket {
  max_gap: i32,
  last_wall: Option<i32>,
}

impl DistanceBucket {
  pub fn new(max_gap: usize) -> Self {
    Self {
      max_gap: max_gap as i32,
      last_wall: None,
    }
  }

  /// The configured gap limit.
  pub fn max_gap(&self) -> usize {
    self.max_gap as usize
  }

  fn start_line(&mut self) {
    self.last_wall = None;
  }

  /// Records a wall (unfillable pixel) at `index` along the current line.
  ///
  /// Returns the bounded run it closes as `(first, last, length)` when one
  /// exists and fits the gap limit.
  fn close_run(&mut self, index: i32) -> Option<(i32, i32, u16)> {
    let run = self.last_wall.map(|wall| (wall + 1, index - 1));
    self.last_wall = Some(index);
    let (first, last) = run?;
    let len = last - first + 1;
    (len >= 1 && len <= self.max_gap).then_some((first, last, len as u16))
  }
}

/// Fills `dist` with the minimum bounded-run length covering each center
/// tile pixel, leaving the no-gap value where no run applies.
///
/// The caller provides `dist` pre-filled with [`crate::tile::GAPLESS`].
pub fn find_gaps(bucket: &mut DistanceBucket, dist: &mut TileBuf, grid: &AlphaGrid<'_>) {
  let n = TILE_SIZE as i32;
  let lo = -bucket.max_gap;
  let hi = n - 1 + bucket.max_gap;

  // Rows. Only rows of the center tile can contain marked pixels.
  for y in 0..n {
    scan_line(bucket, dist, grid, lo, hi, |t| (t, y));
  }
  // Columns.
  for x in 0..n {
    scan_line(bucket, dist, grid, lo, hi, |t| (x, t));
  }
}

/// Scans one line for bounded runs and marks the covered center pixels.
fn scan_line(
  bucket: &mut DistanceBucket,
  dist: &mut TileBuf,
  grid: &AlphaGrid<'_>,
  first: i32,
  last: i32,
  pos: impl Fn(i32) -> (i32, i32),
) {
  let n = TILE_SIZE as i32;
  bucket.start_line();
  for t in first..=last {
    let (x, y) = pos(t);
    if grid.fillable(x, y) {
      continue;
    }
    let Some((run_first, run_last, len)) = bucket.close_run(t) else {
      continue;
    };
    for u in run_first..=run_last {
      let (ux, uy) = pos(u);
      if (0..n).contains(&ux) && (0..n).contains(&uy) {
        let (ux, uy) = (ux as usize, uy as usize);
        if len < dist.get(ux, uy) {
          dist.set(ux, uy, len);
        }
      }
    }
  }
}

/// True when no bounded run can cross a corner of a fully fillable center
/// tile: the four orthogonal neighbors have no unfillable pixel within
/// `max_gap` of the corners they share with the center.
pub fn no_corner_gaps(
  max_gap: usize,
  north: &AlphaTile,
  east: &AlphaTile,
  south: &AlphaTile,
  west: &AlphaTile,
) -> bool {
  let n = TILE_SIZE;
  let g = max_gap.min(n);
  corner_clear(north, 0..g, n - g..n)
    && corner_clear(north, n - g..n, n - g..n)
    && corner_clear(south, 0..g, 0..g)
    && corner_clear(south, n - g..n, 0..g)
    && corner_clear(east, 0..g, 0..g)
    && corner_clear(east, 0..g, n - g..n)
    && corner_clear(west, n - g..n, 0..g)
    && corner_clear(west, n - g..n, n - g..n)
}

/// True when the block contains no unfillable pixel.
fn corner_clear(
  tile: &AlphaTile,
  xs: std::ops::Range<usize>,
  ys: std::ops::Range<usize>,
) -> bool {
  if let Some(alpha) = tile.uniform_value() {
    return alpha > 0;
  }
  ys.clone()
    .all(|y| xs.clone().all(|x| tile.get(x, y) > 0))
}
