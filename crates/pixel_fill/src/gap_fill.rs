//! Gap-closing fill: constrained propagation and seep retraction.
//!
//! The driver mirrors the scanline driver's tile queue, with three
//! additions. Before a tile is filled, alpha tiles for its full 3x3
//! neighborhood are materialized and a per-tile gap distance field is
//! computed. The fill itself tracks the smallest gap distance seen along
//! each propagation path and refuses to step from gap-marked pixels back
//! into open area. After the main queue drains, a second queue retracts
//! the fill out of the gaps it seeped into, rolling everything back when
//! retraction would erase the entire fill.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::bounds::{PixelBounds, TileBoundingBox};
use crate::coords::{TILE_SIZE, TileCoord, nine_grid};
use crate::filler::Filler;
use crate::gaps::{AlphaGrid, DistanceBucket, find_gaps, no_corner_gaps};
use crate::queue::{SeedList, enqueue_overflows};
use crate::surface::{SourceSurface, SurfaceError};
use crate::tile::{AlphaTile, DistanceTile, GAPLESS, TileBuf};

/// Parameters for gap closing fill operations, kept as one container so
/// the call chain survives parameter set changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapClosingOptions {
  /// Largest pixel gap the fill treats as closed, clamped to
  /// `1..=TILE_SIZE`.
  pub max_gap_size: usize,
  /// Whether fill that seeped into gaps is retracted afterwards.
  pub retract_seeps: bool,
}

/// A fill seed carrying the gap distance tracked along its path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GapSeed {
  pub x: u8,
  pub y: u8,
  pub dist: u16,
}

/// Seeds entering one tile of the gap-closing fill.
enum GcSeeds {
  /// The initial seed pixel; its distance is attached once the tile's
  /// distance field exists.
  Point(usize, usize),
  Seeds(Vec<GapSeed>),
}

impl SeedList for GcSeeds {
  fn is_empty(&self) -> bool {
    match self {
      Self::Point(..) => false,
      Self::Seeds(seeds) => seeds.is_empty(),
    }
  }
}

/// Result of one constrained tile fill.
pub struct GapFillResult {
  /// Per-edge overflow seeds, in neighbor coordinates.
  pub overflows: [Vec<GapSeed>; 4],
  /// Gap-marked pixels the seep retraction starts from.
  pub seep_points: Vec<(u8, u8)>,
  /// Pixels newly filled by this call.
  pub pixels_filled: u64,
}

/// Performs constrained fills and seep retraction over distance data.
pub struct GapClosingFiller {
  max_gap_size: usize,
  retract_seeps: bool,
}

impl GapClosingFiller {
  pub fn new(max_gap_size: usize, retract_seeps: bool) -> Self {
    Self {
      max_gap_size,
      retract_seeps,
    }
  }

  /// True for distances produced by gap detection, as opposed to the
  /// no-gap value.
  #[inline]
  fn gap_marked(&self, dist: u16) -> bool {
    dist as usize <= self.max_gap_size
  }

  /// Fills within `bounds` from `seeds`, writing scored alphas into `out`.
  ///
  /// Each propagation path tracks the minimum gap distance it has passed
  /// through. Stepping from a gap-marked pixel into open (gapless) area is
  /// refused; when seeps are retracted, the refusing pixel is recorded so
  /// the retraction pass knows where the fill leaked.
  pub fn fill(
    &self,
    alphas: &AlphaTile,
    distances: &DistanceTile,
    out: &mut TileBuf,
    seeds: Vec<GapSeed>,
    bounds: PixelBounds,
  ) -> GapFillResult {
    let mut queue: VecDeque<(usize, usize, u16)> = VecDeque::new();
    let mut seep_points = Vec::new();
    for seed in seeds {
      let (x, y) = (seed.x as usize, seed.y as usize);
      queue.push_back((x, y, seed.dist));
      // A seed already inside a gap is itself a retraction start.
      if self.retract_seeps
        && self.gap_marked(distances.get(x, y))
        && bounds.contains(x, y)
        && alphas.get(x, y) > 0
      {
        seep_points.push((seed.x, seed.y));
      }
    }

    let mut overflows: [Vec<GapSeed>; 4] = [vec![], vec![], vec![], vec![]];
    let mut pixels_filled = 0u64;
    while let Some((x, y, entry_dist)) = queue.pop_front() {
      if !bounds.contains(x, y) {
        continue;
      }
      if out.get(x, y) != 0 {
        continue;
      }
      let alpha = alphas.get(x, y);
      if alpha == 0 {
        continue;
      }
      let dist = distances.get(x, y);
      // A cross-tile seed may ask to exit a gap; refuse it here.
      if !self.gap_marked(dist) && self.gap_marked(entry_dist) {
        continue;
      }
      out.set(x, y, alpha);
      pixels_filled += 1;
      let path_dist = entry_dist.min(dist);
      let in_gap = self.gap_marked(path_dist);

      let mut expand = |nx: i32, ny: i32, queue: &mut VecDeque<(usize, usize, u16)>| {
        let n = TILE_SIZE as i32;
        if (0..n).contains(&nx) && (0..n).contains(&ny) {
          if in_gap && !self.gap_marked(distances.get(nx as usize, ny as usize)) {
            // Seeping out of the gap: stop here and remember the leak.
            if self.retract_seeps {
              seep_points.push((x as u8, y as u8));
            }
            return;
          }
          queue.push_back((nx as usize, ny as usize, path_dist));
        } else {
          // Crossing into a neighbor tile; wrap to its coordinates.
          let seed = GapSeed {
            x: nx.rem_euclid(n) as u8,
            y: ny.rem_euclid(n) as u8,
            dist: path_dist,
          };
          let edge = if ny < 0 {
            0
          } else if nx >= n {
            1
          } else if ny >= n {
            2
          } else {
            3
          };
          overflows[edge].push(seed);
          if in_gap && self.retract_seeps {
            seep_points.push((x as u8, y as u8));
          }
        }
      };
      expand(x as i32, y as i32 - 1, &mut queue);
      expand(x as i32 + 1, y as i32, &mut queue);
      expand(x as i32, y as i32 + 1, &mut queue);
      expand(x as i32 - 1, y as i32, &mut queue);
    }
    GapFillResult {
      overflows,
      seep_points,
      pixels_filled,
    }
  }

  /// Erases seeped fill starting from `seeds`, returning per-edge
  /// overflow positions (in neighbor coordinates) and the erased pixel
  /// count.
  ///
  /// Initial seeds (recorded seep points) erase unconditionally; the wave
  /// then backs off only through filled gap-marked pixels, so it never
  /// eats into legitimately filled open area and never creates tiles.
  pub fn unseep(
    &self,
    distances: &DistanceTile,
    out: &mut TileBuf,
    seeds: &[(u8, u8)],
    is_initial: bool,
  ) -> ([Vec<(u8, u8)>; 4], u64) {
    let n = TILE_SIZE as i32;
    let mut queue: VecDeque<(usize, usize, bool)> = seeds
      .iter()
      .map(|&(x, y)| (x as usize, y as usize, is_initial))
      .collect();
    let mut overflows: [Vec<(u8, u8)>; 4] = [vec![], vec![], vec![], vec![]];
    let mut erased = 0u64;
    while let Some((x, y, unconditional)) = queue.pop_front() {
      if out.get(x, y) == 0 {
        continue;
      }
      if !unconditional && !self.gap_marked(distances.get(x, y)) {
        continue;
      }
      out.set(x, y, 0);
      erased += 1;
      for (nx, ny) in [
        (x as i32, y as i32 - 1),
        (x as i32 + 1, y as i32),
        (x as i32, y as i32 + 1),
        (x as i32 - 1, y as i32),
      ] {
        if (0..n).contains(&nx) && (0..n).contains(&ny) {
          queue.push_back((nx as usize, ny as usize, false));
        } else {
          let pos = (nx.rem_euclid(n) as u8, ny.rem_euclid(n) as u8);
          let edge = if ny < 0 {
            0
          } else if nx >= n {
            1
          } else if ny >= n {
            2
          } else {
            3
          };
          overflows[edge].push(pos);
        }
      }
    }
    (overflows, erased)
  }
}

/// Runs the gap-closing fill from the initial seed and returns the filled
/// tile map.
pub fn gap_closing_fill<S: SourceSurface>(
  src: &S,
  init: (TileCoord, (usize, usize)),
  bbox: &TileBoundingBox,
  filler: &Filler,
  options: GapClosingOptions,
) -> Result<HashMap<TileCoord, AlphaTile>, SurfaceError> {
  #[cfg(feature = "tracy")]
  let _span = tracing::info_span!("gap_closing_fill").entered();

  let max_gap = options.max_gap_size.clamp(1, TILE_SIZE);
  let gc_filler = GapClosingFiller::new(max_gap, options.retract_seeps);
  let mut bucket = DistanceBucket::new(max_gap);

  let mut full_alphas: HashMap<TileCoord, AlphaTile> = HashMap::new();
  let mut distances: HashMap<TileCoord, DistanceTile> = HashMap::new();
  let mut filled: HashMap<TileCoord, TileBuf> = HashMap::new();
  let mut unseep_q: VecDeque<(TileCoord, Vec<(u8, u8)>, bool)> = VecDeque::new();

  let (init_tc, (init_px, init_py)) = init;
  let mut queue: VecDeque<(TileCoord, GcSeeds, ())> = VecDeque::new();
  queue.push_back((init_tc, GcSeeds::Point(init_px, init_py), ()));

  let mut total_px: i64 = 0;

  while let Some((tc, seeds, ())) = queue.pop_front() {
    let px_bounds = bbox.tile_bounds(tc);
    if !distances.contains_key(&tc) {
      prep_alphas(tc, &mut full_alphas, src, filler)?;
      let grid = AlphaGrid::new(nine_grid(tc).map(|ntc| &full_alphas[&ntc]));
      // Skip the full gap distance search when provably gap free.
      let gap_free = grid.all_full()
        || (grid.center().is_full()
          && no_corner_gaps(
            max_gap,
            &full_alphas[&nine_grid(tc)[1]],
            &full_alphas[&nine_grid(tc)[2]],
            &full_alphas[&nine_grid(tc)[3]],
            &full_alphas[&nine_grid(tc)[4]],
          ));
      if gap_free {
        distances.insert(tc, DistanceTile::Gapless);
      } else {
        let mut dist_data = TileBuf::filled(GAPLESS);
        find_gaps(&mut bucket, &mut dist_data, &grid);
        distances.insert(tc, DistanceTile::Data(dist_data));
      }
      filled.insert(tc, TileBuf::zeroed());
    }
    let dist_tile = &distances[&tc];
    // The initial seed picks up its distance once the field exists.
    let seeds = match seeds {
      GcSeeds::Point(x, y) => vec![GapSeed {
        x: x as u8,
        y: y as u8,
        dist: dist_tile.get(x, y),
      }],
      GcSeeds::Seeds(seeds) => seeds,
    };
    let Some(out) = filled.get_mut(&tc) else {
      continue;
    };
    let result = gc_filler.fill(&full_alphas[&tc], dist_tile, out, seeds, px_bounds);
    enqueue_overflows(
      &mut queue,
      tc,
      result.overflows.map(GcSeeds::Seeds),
      bbox,
      [(), (), (), ()],
    );
    total_px += result.pixels_filled as i64;
    if !result.seep_points.is_empty() {
      unseep_q.push_back((tc, result.seep_points, true));
    }
  }

  // Seep retraction backs off only into the existing fill, so it needs no
  // new tiles, only snapshots for the rollback case.
  let mut backup: HashMap<TileCoord, TileBuf> = HashMap::new();
  while let Some((tc, seeds, is_initial)) = unseep_q.pop_front() {
    let Some(dist_tile) = distances.get(&tc) else {
      continue;
    };
    let Some(out) = filled.get_mut(&tc) else {
      continue;
    };
    backup.entry(tc).or_insert_with(|| out.clone());
    let (overflows, erased) = gc_filler.unseep(dist_tile, out, &seeds, is_initial);
    total_px -= erased as i64;
    enqueue_overflows(&mut unseep_q, tc, overflows, bbox, [false; 4]);
  }

  if total_px <= 0 {
    // Starting on a gap-marked pixel in a small area can retract the
    // entire fill; restore the tiles the retraction touched.
    for (tc, tile) in backup {
      filled.insert(tc, tile);
    }
  }

  Ok(
    filled
      .into_iter()
      .map(|(tc, buf)| (tc, AlphaTile::Owned(buf).normalized()))
      .collect(),
  )
}

/// Ensures alpha tiles exist for the tile and all eight of its neighbors.
fn prep_alphas<S: SourceSurface>(
  tc: TileCoord,
  full_alphas: &mut HashMap<TileCoord, AlphaTile>,
  src: &S,
  filler: &Filler,
) -> Result<(), SurfaceError> {
  for ntc in nine_grid(tc) {
    if full_alphas.contains_key(&ntc) {
      continue;
    }
    let tile = src.with_tile(ntc, |src_tile| {
      match filler.tile_uniformity(src_tile) {
        Some(alpha) => AlphaTile::uniform(alpha),
        None => {
          let mut buf = TileBuf::zeroed();
          filler.flood(src_tile, &mut buf);
          AlphaTile::Owned(buf)
        }
      }
    })?;
    full_alphas.insert(ntc, tile);
  }
  Ok(())
}
