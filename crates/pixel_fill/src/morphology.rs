//! Mask post-processing: grow/shrink and feather.
//!
//! These passes run on the filled tile map after the fill completes and
//! before compositing. Each output tile depends only on its 3x3 input
//! neighborhood (offsets and feather radii are clamped to one tile), so
//! tiles are processed in parallel.

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;

use crate::coords::{TILE_SIZE, TileCoord, nine_grid};
use crate::gaps::AlphaGrid;
use crate::tile::{AlphaTile, TileBuf};

static EMPTY: AlphaTile = AlphaTile::Empty;

/// Grows (`offset > 0`) or shrinks (`offset < 0`) the fill mask by
/// `|offset|` pixels, as a separable max/min filter.
///
/// Tiles in `full_opaque` whose whole neighborhood is fully opaque are
/// passed through untouched; growing may materialize tiles that were
/// absent from the input.
pub fn morph(
  offset: i32,
  filled: HashMap<TileCoord, AlphaTile>,
  full_opaque: &HashSet<TileCoord>,
) -> HashMap<TileCoord, AlphaTile> {
  let radius = (offset.unsigned_abs() as usize).min(TILE_SIZE);
  if radius == 0 {
    return filled;
  }
  let grow = offset > 0;
  let targets = output_tiles(&filled, grow);
  targets
    .into_par_iter()
    .filter_map(|tc| {
      if nine_grid(tc).iter().all(|ntc| full_opaque.contains(ntc)) {
        return Some((tc, AlphaTile::Full));
      }
      let grid = neighborhood(&filled, tc);
      let out = if grow {
        filter_tile(&grid, radius, 0, u16::max)
      } else {
        filter_tile(&grid, radius, u16::MAX, u16::min)
      };
      let tile = AlphaTile::Owned(out).normalized();
      (!tile.is_empty()).then_some((tc, tile))
    })
    .collect()
}

/// Feathers the mask with repeated box blurs approximating a gaussian.
pub fn blur(feather: i32, filled: HashMap<TileCoord, AlphaTile>) -> HashMap<TileCoord, AlphaTile> {
  let feather = (feather.max(0) as usize).min(TILE_SIZE);
  let base = feather / 3;
  let rem = feather % 3;
  let mut result = filled;
  for pass in 0..3 {
    let radius = base + usize::from(pass < rem);
    if radius == 0 {
      continue;
    }
    result = blur_pass(result, radius);
  }
  result
}

fn blur_pass(
  filled: HashMap<TileCoord, AlphaTile>,
  radius: usize,
) -> HashMap<TileCoord, AlphaTile> {
  let targets = output_tiles(&filled, true);
  targets
    .into_par_iter()
    .filter_map(|tc| {
      let grid = neighborhood(&filled, tc);
      let tile = AlphaTile::Owned(box_blur_tile(&grid, radius)).normalized();
      (!tile.is_empty()).then_some((tc, tile))
    })
    .collect()
}

/// Tiles the pass writes: the input tiles, plus every neighbor of a
/// non-empty tile when the operation can spread outward.
fn output_tiles(filled: &HashMap<TileCoord, AlphaTile>, spreads: bool) -> Vec<TileCoord> {
  let mut targets: HashSet<TileCoord> = filled.keys().copied().collect();
  if spreads {
    for (tc, tile) in filled {
      if !tile.is_empty() {
        targets.extend(nine_grid(*tc));
      }
    }
  }
  targets.into_iter().collect()
}

fn neighborhood<'a>(
  filled: &'a HashMap<TileCoord, AlphaTile>,
  tc: TileCoord,
) -> AlphaGrid<'a> {
  AlphaGrid::new(nine_grid(tc).map(|ntc| filled.get(&ntc).unwrap_or(&EMPTY)))
}

/// Separable sliding-window filter (max for dilation, min for erosion).
fn filter_tile(
  grid: &AlphaGrid<'_>,
  radius: usize,
  identity: u16,
  pick: impl Fn(u16, u16) -> u16,
) -> TileBuf {
  let n = TILE_SIZE as i32;
  let r = radius as i32;
  // Horizontal pass over all rows the vertical pass will read.
  let rows = (n + 2 * r) as usize;
  let mut temp = vec![identity; rows * TILE_SIZE];
  for row in 0..rows {
    let y = row as i32 - r;
    for x in 0..n {
      let mut acc = identity;
      for dx in -r..=r {
        acc = pick(acc, grid.alpha(x + dx, y));
      }
      temp[row * TILE_SIZE + x as usize] = acc;
    }
  }
  let mut out = TileBuf::zeroed();
  for y in 0..TILE_SIZE {
    for x in 0..TILE_SIZE {
      let mut acc = identity;
      for row in y..=y + 2 * radius {
        acc = pick(acc, temp[row * TILE_SIZE + x]);
      }
      out.set(x, y, acc);
    }
  }
  out
}

/// Separable box mean with rounding.
fn box_blur_tile(grid: &AlphaGrid<'_>, radius: usize) -> TileBuf {
  let n = TILE_SIZE as i32;
  let r = radius as i32;
  let count = (2 * radius + 1) as u32;
  let rows = (n + 2 * r) as usize;
  let mut temp = vec![0u16; rows * TILE_SIZE];
  for row in 0..rows {
    let y = row as i32 - r;
    for x in 0..n {
      let mut sum = 0u32;
      for dx in -r..=r {
        sum += u32::from(grid.alpha(x + dx, y));
      }
      temp[row * TILE_SIZE + x as usize] = ((sum + count / 2) / count) as u16;
    }
  }
  let mut out = TileBuf::zeroed();
  for y in 0..TILE_SIZE {
    for x in 0..TILE_SIZE {
      let mut sum = 0u32;
      for row in y..=y + 2 * radius {
        sum += u32::from(temp[row * TILE_SIZE + x]);
      }
      out.set(x, y, ((sum + count / 2) / count) as u16);
    }
  }
  out
}
