//! Tolerance scoring and the per-tile fill kernel.

use std::collections::VecDeque;

use crate::bounds::PixelBounds;
use crate::coords::{Edge, OPAQUE, TILE_SIZE};
use crate::queue::{Overflows, SeedList, SeedRange};
use crate::surface::{Rgba, SourceTile};
use crate::tile::TileBuf;

/// Seeds entering one tile of the scanline fill.
#[derive(Clone, Debug)]
pub enum FillSeeds {
  /// The initial seed pixel, in in-tile coordinates.
  Point(usize, usize),
  /// Inclusive pixel ranges along the edge the seeds arrived through.
  Ranges(Vec<SeedRange>),
}

impl SeedList for FillSeeds {
  fn is_empty(&self) -> bool {
    match self {
      Self::Point(..) => false,
      Self::Ranges(ranges) => ranges.is_empty(),
    }
  }
}

/// Scores pixels against a target color and fills tiles one at a time.
///
/// The score of a pixel is the fix15 alpha the fill assigns it: [`OPAQUE`]
/// for an exact match, fading linearly to zero as the color distance
/// approaches the tolerance, and zero beyond it.
pub struct Filler {
  target: Rgba,
  tolerance: f32,
}

impl Filler {
  /// Creates a filler for the given target color.
  ///
  /// A fully transparent target has its RGB forced to black, so seeding on
  /// empty canvas behaves identically regardless of stale color channels.
  pub fn new(target: Rgba, tolerance: f32) -> Self {
    let target = if target.a == 0 {
      Rgba::TRANSPARENT
    } else {
      target
    };
    Self {
      target,
      tolerance: tolerance.clamp(0.0, 1.0),
    }
  }

  /// Tolerance score of one pixel, as a fix15 alpha.
  pub fn pixel_alpha(&self, p: Rgba) -> u16 {
    let dist = channel_distance(p, self.target);
    if dist == 0.0 {
      OPAQUE
    } else if dist <= self.tolerance {
      // Soft edge: scores inside the tolerance stay nonzero.
      let alpha = (f32::from(OPAQUE) * (1.0 - dist / self.tolerance)) as u16;
      alpha.max(1)
    } else {
      0
    }
  }

  /// Returns the alpha the fill would assign to every pixel of the tile,
  /// when the tile is color-uniform; `None` otherwise.
  pub fn tile_uniformity(&self, src: SourceTile<'_>) -> Option<u16> {
    match src {
      SourceTile::Empty => Some(self.pixel_alpha(Rgba::TRANSPARENT)),
      SourceTile::Pixels(tile) => {
        let pixels = tile.as_slice();
        let first = pixels[0];
        pixels
          .iter()
          .all(|&p| p == first)
          .then(|| self.pixel_alpha(first))
      }
    }
  }

  /// Fills within `bounds` from `seeds`, writing scored alphas into `out`.
  ///
  /// Returns per-edge overflow ranges covering only pixels newly filled by
  /// this call, so repeated calls into the same tile terminate: a seed
  /// landing on an already-filled pixel contributes nothing.
  pub fn fill(
    &self,
    src: SourceTile<'_>,
    out: &mut TileBuf,
    seeds: &FillSeeds,
    from: Edge,
    bounds: PixelBounds,
  ) -> Overflows {
    let mut queue: VecDeque<(usize, usize)> = VecDeque::new();
    push_seeds(&mut queue, seeds, from);

    let mut edge_masks = [[false; TILE_SIZE]; 4];
    while let Some((x, y)) = queue.pop_front() {
      if !bounds.contains(x, y) {
        continue;
      }
      if out.get(x, y) != 0 {
        continue;
      }
      let alpha = self.pixel_alpha(src.get(x, y));
      if alpha == 0 {
        continue;
      }
      out.set(x, y, alpha);
      if y == 0 {
        edge_masks[0][x] = true;
      }
      if x == TILE_SIZE - 1 {
        edge_masks[1][y] = true;
      }
      if y == TILE_SIZE - 1 {
        edge_masks[2][x] = true;
      }
      if x == 0 {
        edge_masks[3][y] = true;
      }
      if y > 0 {
        queue.push_back((x, y - 1));
      }
      if x < TILE_SIZE - 1 {
        queue.push_back((x + 1, y));
      }
      if y < TILE_SIZE - 1 {
        queue.push_back((x, y + 1));
      }
      if x > 0 {
        queue.push_back((x - 1, y));
      }
    }
    edge_masks.map(|mask| ranges_from_mask(&mask))
  }

  /// Scores the whole tile unconditionally into `out`.
  pub fn flood(&self, src: SourceTile<'_>, out: &mut TileBuf) {
    for y in 0..TILE_SIZE {
      for x in 0..TILE_SIZE {
        out.set(x, y, self.pixel_alpha(src.get(x, y)));
      }
    }
  }
}

/// Maximum normalized channel deviation between two pixels.
fn channel_distance(a: Rgba, b: Rgba) -> f32 {
  let dr = a.r.abs_diff(b.r);
  let dg = a.g.abs_diff(b.g);
  let db = a.b.abs_diff(b.b);
  let da = a.a.abs_diff(b.a);
  f32::from(dr.max(dg).max(db).max(da)) / 255.0
}

/// Expands seed records into in-tile queue entries.
fn push_seeds(queue: &mut VecDeque<(usize, usize)>, seeds: &FillSeeds, from: Edge) {
  match seeds {
    FillSeeds::Point(x, y) => queue.push_back((*x, *y)),
    FillSeeds::Ranges(ranges) => {
      for &(start, end) in ranges {
        for i in start as usize..=end as usize {
          let (x, y) = match from {
            Edge::North => (i, 0),
            Edge::East => (TILE_SIZE - 1, i),
            Edge::South => (i, TILE_SIZE - 1),
            Edge::West => (0, i),
            // Range seeds always arrive through an edge.
            Edge::None => return,
          };
          queue.push_back((x, y));
        }
      }
    }
  }
}

/// Compresses an edge occupancy mask into inclusive ranges.
fn ranges_from_mask(mask: &[bool; TILE_SIZE]) -> Vec<SeedRange> {
  let mut ranges = Vec::new();
  let mut start = None;
  for (i, &set) in mask.iter().enumerate() {
    match (set, start) {
      (true, None) => start = Some(i),
      (false, Some(s)) => {
        ranges.push((s as u8, (i - 1) as u8));
        start = None;
      }
      _ => {}
    }
  }
  if let Some(s) = start {
    ranges.push((s as u8, (TILE_SIZE - 1) as u8));
  }
  ranges
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::surface::RgbaTile;

  #[test]
  fn exact_match_scores_opaque() {
    let filler = Filler::new(Rgba::rgb(10, 20, 30), 0.0);
    assert_eq!(filler.pixel_alpha(Rgba::rgb(10, 20, 30)), OPAQUE);
    assert_eq!(filler.pixel_alpha(Rgba::rgb(10, 20, 31)), 0);
  }

  #[test]
  fn tolerance_gives_soft_edge() {
    let filler = Filler::new(Rgba::rgb(0, 0, 0), 0.5);
    let near = filler.pixel_alpha(Rgba::rgb(25, 0, 0));
    let far = filler.pixel_alpha(Rgba::rgb(120, 0, 0));
    assert!(near > far);
    assert!(far > 0);
    assert_eq!(filler.pixel_alpha(Rgba::rgb(200, 0, 0)), 0);
  }

  #[test]
  fn transparent_target_ignores_rgb() {
    let filler = Filler::new(Rgba::new(90, 12, 200, 0), 0.0);
    assert_eq!(filler.pixel_alpha(Rgba::TRANSPARENT), OPAQUE);
  }

  #[test]
  fn uniformity_of_empty_and_mixed_tiles() {
    let filler = Filler::new(Rgba::TRANSPARENT, 0.0);
    let empty = filler.tile_uniformity(SourceTile::Empty);
    assert_eq!(empty, Some(OPAQUE));

    let mut tile = RgbaTile::new();
    tile.set(5, 5, Rgba::rgb(0, 0, 0));
    assert_eq!(filler.tile_uniformity(SourceTile::Pixels(&tile)), None);

    let black = RgbaTile::filled(Rgba::rgb(0, 0, 0));
    assert_eq!(filler.tile_uniformity(SourceTile::Pixels(&black)), Some(0));
  }

  #[test]
  fn fill_stops_at_walls_and_reports_new_overflows() {
    // A vertical wall at x = 10 splits the tile; the seed is on the left.
    let mut tile = RgbaTile::new();
    for y in 0..TILE_SIZE {
      tile.set(10, y, Rgba::rgb(0, 0, 0));
    }
    let filler = Filler::new(Rgba::TRANSPARENT, 0.0);
    let mut out = TileBuf::zeroed();
    let overflows = filler.fill(
      SourceTile::Pixels(&tile),
      &mut out,
      &FillSeeds::Point(2, 2),
      Edge::None,
      PixelBounds::FULL,
    );
    assert_eq!(out.get(2, 2), OPAQUE);
    assert_eq!(out.get(10, 5), 0);
    assert_eq!(out.get(11, 5), 0);
    // North and south overflows stop at the wall; the east edge is dry.
    assert_eq!(overflows[0], vec![(0, 9)]);
    assert_eq!(overflows[2], vec![(0, 9)]);
    assert!(overflows[1].is_empty());
    assert_eq!(overflows[3], vec![(0, 63)]);

    // Refilling with the same seeds adds nothing.
    let again = filler.fill(
      SourceTile::Pixels(&tile),
      &mut out,
      &FillSeeds::Point(2, 2),
      Edge::None,
      PixelBounds::FULL,
    );
    assert!(again.iter().all(Vec::is_empty));
  }

  #[test]
  fn range_seeds_enter_through_the_tagged_edge() {
    let filler = Filler::new(Rgba::TRANSPARENT, 0.0);
    let mut out = TileBuf::zeroed();
    let overflows = filler.fill(
      SourceTile::Empty,
      &mut out,
      &FillSeeds::Ranges(vec![(0, 63)]),
      Edge::South,
      PixelBounds::FULL,
    );
    assert_eq!(out.get(0, TILE_SIZE - 1), OPAQUE);
    assert_eq!(out.get(31, 0), OPAQUE);
    assert_eq!(overflows[0], vec![(0, 63)]);
  }

  #[test]
  fn fill_respects_clip_bounds() {
    let filler = Filler::new(Rgba::TRANSPARENT, 0.0);
    let mut out = TileBuf::zeroed();
    let bounds = PixelBounds {
      min_x: 16,
      min_y: 16,
      max_x: 47,
      max_y: 47,
    };
    let overflows = filler.fill(
      SourceTile::Empty,
      &mut out,
      &FillSeeds::Point(20, 20),
      Edge::None,
      bounds,
    );
    assert_eq!(out.get(16, 16), OPAQUE);
    assert_eq!(out.get(15, 16), 0);
    assert_eq!(out.get(48, 20), 0);
    assert!(overflows.iter().all(Vec::is_empty));
  }

  #[test]
  fn mask_compression() {
    let mut mask = [false; TILE_SIZE];
    mask[0] = true;
    mask[1] = true;
    mask[5] = true;
    mask[63] = true;
    assert_eq!(ranges_from_mask(&mask), vec![(0, 1), (5, 5), (63, 63)]);
  }
}
