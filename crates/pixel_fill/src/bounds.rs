//! The fill bounding box, in tile and in-tile pixel terms.
//!
//! A [`TileBoundingBox`] is derived from the pixel rectangle limiting a fill
//! operation. It answers which tiles are reachable at all, which tiles the
//! rectangle cuts through, and what the per-tile pixel clip is.

use crate::coords::{PixelRect, TILE_SIZE, TileCoord};

/// In-tile pixel clip bounds, inclusive on all four sides.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelBounds {
  pub min_x: usize,
  pub min_y: usize,
  pub max_x: usize,
  pub max_y: usize,
}

impl PixelBounds {
  /// Bounds covering an entire tile.
  pub const FULL: Self = Self {
    min_x: 0,
    min_y: 0,
    max_x: TILE_SIZE - 1,
    max_y: TILE_SIZE - 1,
  };

  /// Returns true when the position lies within the bounds.
  #[inline]
  pub fn contains(&self, x: usize, y: usize) -> bool {
    x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
  }
}

/// Tile-grid view of a fill's pixel bounding box.
#[derive(Clone, Debug)]
pub struct TileBoundingBox {
  min_tx: i32,
  min_ty: i32,
  max_tx: i32,
  max_ty: i32,
  min_px: usize,
  min_py: usize,
  max_px: usize,
  max_py: usize,
}

impl TileBoundingBox {
  /// Derives tile bounds from a pixel rectangle.
  ///
  /// Returns `None` when the rectangle is degenerate (width or height of
  /// zero or less), in which case the whole fill is a no-op.
  pub fn new(rect: PixelRect) -> Option<Self> {
    if rect.is_empty() {
      return None;
    }
    let n = TILE_SIZE as i32;
    let right = rect.x + rect.width - 1;
    let bottom = rect.y + rect.height - 1;
    Some(Self {
      min_tx: rect.x.div_euclid(n),
      min_ty: rect.y.div_euclid(n),
      max_tx: right.div_euclid(n),
      max_ty: bottom.div_euclid(n),
      min_px: rect.x.rem_euclid(n) as usize,
      min_py: rect.y.rem_euclid(n) as usize,
      max_px: right.rem_euclid(n) as usize,
      max_py: bottom.rem_euclid(n) as usize,
    })
  }

  /// True when the tile lies strictly beyond the tile bounds.
  #[inline]
  pub fn outside(&self, tc: TileCoord) -> bool {
    tc.x < self.min_tx || tc.x > self.max_tx || tc.y < self.min_ty || tc.y > self.max_ty
  }

  /// True when the tile sits on the edge of the tile bounds.
  #[inline]
  pub fn crossing(&self, tc: TileCoord) -> bool {
    tc.x == self.min_tx || tc.x == self.max_tx || tc.y == self.min_ty || tc.y == self.max_ty
  }

  /// True when the pixel rectangle cuts through the tile, leaving a proper
  /// sub-rectangle as its clip. Tiles the rectangle covers entirely are not
  /// clipped even when they sit on the bbox edge.
  #[inline]
  pub fn clips(&self, tc: TileCoord) -> bool {
    self.tile_bounds(tc) != PixelBounds::FULL
  }

  /// In-tile pixel clip for the tile.
  ///
  /// Covers the entire tile unless the tile is located on the edge of the
  /// bounding box.
  pub fn tile_bounds(&self, tc: TileCoord) -> PixelBounds {
    PixelBounds {
      min_x: if tc.x == self.min_tx { self.min_px } else { 0 },
      min_y: if tc.y == self.min_ty { self.min_py } else { 0 },
      max_x: if tc.x == self.max_tx {
        self.max_px
      } else {
        TILE_SIZE - 1
      },
      max_y: if tc.y == self.max_ty {
        self.max_py
      } else {
        TILE_SIZE - 1
      },
    }
  }
}
