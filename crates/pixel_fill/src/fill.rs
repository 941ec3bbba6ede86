//! Fill entry point, the scanline driver, and the uniform-tile skipper.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Instant;

use log::info;

use crate::blend::BlendMode;
use crate::bounds::TileBoundingBox;
use crate::composite::composite;
use crate::coords::{Edge, INV_EDGES, OPAQUE, PixelRect, TILE_SIZE, TileCoord};
use crate::filler::{FillSeeds, Filler};
use crate::gap_fill::{GapClosingOptions, gap_closing_fill};
use crate::morphology::{blur, morph};
use crate::queue::{Overflows, enqueue_overflows};
use crate::surface::{DestinationSurface, SourceSurface, SourceTile, SurfaceError};
use crate::tile::{AlphaTile, TileBuf};

/// A flood fill request.
#[derive(Clone, Debug)]
pub struct FillRequest {
  /// Seed pixel X coordinate.
  pub x: i32,
  /// Seed pixel Y coordinate.
  pub y: i32,
  /// Fill color.
  pub color: [u8; 3],
  /// How much filled pixels may deviate from the sampled target color,
  /// clamped to `0.0..=1.0`.
  pub tolerance: f32,
  /// Post-fill grow (positive) or shrink (negative) radius in pixels,
  /// clamped to one tile.
  pub offset: i32,
  /// Post-fill feather radius in pixels, clamped to one tile.
  pub feather: i32,
  /// Gap closing parameters, or `None` for the plain scanline fill.
  pub gap_closing: Option<GapClosingOptions>,
  /// How the fill combines with the destination.
  pub mode: BlendMode,
  /// Whether a document frame is active; a framed grow or feather keeps
  /// the result trimmed to the bounding box.
  pub framed: bool,
  /// Pixel rectangle limiting the fill. Degenerate rectangles make the
  /// whole call a no-op.
  pub bbox: PixelRect,
}

impl Default for FillRequest {
  fn default() -> Self {
    Self {
      x: 0,
      y: 0,
      color: [0, 0, 0],
      tolerance: 0.0,
      offset: 0,
      feather: 0,
      gap_closing: None,
      mode: BlendMode::Normal,
      framed: false,
      bbox: PixelRect::EMPTY,
    }
  }
}

/// Fill failure.
#[derive(Debug)]
pub enum FillError {
  Surface(SurfaceError),
}

impl std::fmt::Display for FillError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Surface(e) => write!(f, "surface access failed: {}", e),
    }
  }
}

impl std::error::Error for FillError {}

impl From<SurfaceError> for FillError {
  fn from(e: SurfaceError) -> Self {
    Self::Surface(e)
  }
}

/// Flood-fills the connected region around the seed and composites it into
/// the destination.
///
/// The target color is sampled from the source under the seed; the region
/// is every pixel within `tolerance` of it that is 4-connected to the
/// seed, limited to `bbox`. The resulting mask optionally grows/shrinks
/// and feathers before compositing under the requested blend mode.
pub fn flood_fill<S: SourceSurface, D: DestinationSurface>(
  src: &S,
  dst: &mut D,
  req: &FillRequest,
) -> Result<(), FillError> {
  let Some(bbox) = TileBoundingBox::new(req.bbox) else {
    return Ok(());
  };
  let tolerance = req.tolerance.clamp(0.0, 1.0);
  let offset = req.offset.clamp(-(TILE_SIZE as i32), TILE_SIZE as i32);
  let feather = req.feather.clamp(0, TILE_SIZE as i32);

  let (init_tc, (init_px, init_py)) = TileCoord::from_pixel(req.x, req.y);
  if bbox.outside(init_tc) {
    return Ok(());
  }

  // Sample the target color under the seed.
  let target = src.with_tile(init_tc, |tile| tile.get(init_px, init_py))?;
  let filler = Filler::new(target, tolerance);

  let t0 = Instant::now();
  let (mut filled, full_opaque) = match req.gap_closing {
    Some(options) => (
      gap_closing_fill(src, (init_tc, (init_px, init_py)), &bbox, &filler, options)?,
      HashSet::new(),
    ),
    None => scanline_fill(src, (init_tc, (init_px, init_py)), &bbox, &filler)?,
  };
  info!(
    "{:.3}s to fill {} tiles",
    t0.elapsed().as_secs_f64(),
    filled.len()
  );

  if offset != 0 {
    filled = morph(offset, filled, &full_opaque);
  }
  if feather != 0 {
    filled = blur(feather, filled);
  }

  // Dilated or blurred fills only respect the bounding box when it comes
  // from an active frame.
  let trim_result = req.framed && (offset > 0 || feather != 0);
  composite(req.mode, req.color, trim_result, &filled, &bbox, dst)?;
  info!("total fill time: {:.3}s", t0.elapsed().as_secs_f64());
  Ok(())
}

/// Runs the scanline fill from the initial seed.
///
/// Returns the filled tile map and the set of fully opaque uniform tiles
/// (used to short-circuit morphology over solid areas).
pub fn scanline_fill<S: SourceSurface>(
  src: &S,
  init: (TileCoord, (usize, usize)),
  bbox: &TileBoundingBox,
  filler: &Filler,
) -> Result<(HashMap<TileCoord, AlphaTile>, HashSet<TileCoord>), SurfaceError> {
  #[cfg(feature = "tracy")]
  let _span = tracing::info_span!("scanline_fill").entered();

  let mut filled: HashMap<TileCoord, AlphaTile> = HashMap::new();
  let mut skipper = TileFillSkipper::new();

  let (init_tc, (init_px, init_py)) = init;
  let mut queue: VecDeque<(TileCoord, FillSeeds, Edge)> = VecDeque::new();
  queue.push_back((init_tc, FillSeeds::Point(init_px, init_py), Edge::None));

  while let Some((tc, seeds, from)) = queue.pop_front() {
    // Fully processed tiles are never revisited.
    if skipper.final_tiles.contains(&tc) {
      continue;
    }
    let overflows = src.with_tile(tc, |src_tile| {
      match skipper.check(tc, src_tile, &mut filled, from, bbox, filler) {
        Some(overflows) => overflows,
        None => {
          let entry = filled
            .entry(tc)
            .or_insert_with(|| AlphaTile::Owned(TileBuf::zeroed()));
          match entry {
            AlphaTile::Owned(buf) => {
              filler.fill(src_tile, buf, &seeds, from, bbox.tile_bounds(tc))
            }
            // Non-owned entries are always final, so this is unreachable;
            // produce no seeds rather than panic.
            _ => Overflows::default(),
          }
        }
      }
    })?;
    enqueue_overflows(
      &mut queue,
      tc,
      overflows.map(FillSeeds::Ranges),
      bbox,
      INV_EDGES,
    );
  }
  // Collapse owned buffers that ended up uniform, so downstream passes and
  // the compositor see canonical tiles.
  let filled = filled
    .into_iter()
    .map(|(tc, tile)| (tc, tile.normalized()))
    .collect();
  Ok((filled, skipper.full_opaque))
}

/// Detects uniform tiles and resolves them without running the pixel fill.
struct TileFillSkipper {
  final_tiles: HashSet<TileCoord>,
  full_opaque: HashSet<TileCoord>,
}

impl TileFillSkipper {
  fn new() -> Self {
    Self {
      final_tiles: HashSet::new(),
      full_opaque: HashSet::new(),
    }
  }

  /// Resolves the tile when it is uniform, returning its overflows.
  ///
  /// Returns `None` to send the tile down the normal fill path: always for
  /// non-uniform tiles, for tiles that already have fill data, and for
  /// tiles the bounding box clips (uniformity cannot express a partial
  /// pixel rectangle).
  fn check(
    &mut self,
    tc: TileCoord,
    src_tile: SourceTile<'_>,
    filled: &mut HashMap<TileCoord, AlphaTile>,
    from: Edge,
    bbox: &TileBoundingBox,
    filler: &Filler,
  ) -> Option<Overflows> {
    if filled.contains_key(&tc) || bbox.clips(tc) {
      return None;
    }
    let alpha = filler.tile_uniformity(src_tile)?;
    // Uniform: the tile never needs the fill loop again.
    self.final_tiles.insert(tc);
    if alpha == 0 {
      filled.insert(tc, AlphaTile::Empty);
      return Some(Overflows::default());
    }
    if alpha == OPAQUE {
      filled.insert(tc, AlphaTile::Full);
      self.full_opaque.insert(tc);
    } else {
      filled.insert(tc, AlphaTile::Uniform(alpha));
    }
    Some(full_overflows(from))
  }
}

/// Overflows of a uniformly filled tile: the full edge range in every
/// direction except back toward the origin edge.
fn full_overflows(from: Edge) -> Overflows {
  let full = vec![(0u8, (TILE_SIZE - 1) as u8)];
  let mut overflows = [full.clone(), full.clone(), full.clone(), full];
  if let Some(index) = from.index() {
    overflows[index] = Vec::new();
  }
  overflows
}
