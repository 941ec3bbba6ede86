//! Compositing filled tiles into the destination surface.

use std::collections::HashMap;

use crate::blend::{BlendMode, combine, fill_rgba};
use crate::bounds::{PixelBounds, TileBoundingBox};
use crate::coords::{PixelRect, TileCoord};
use crate::surface::{DestinationSurface, RgbaTile, SurfaceError};
use crate::tile::AlphaTile;

/// Writes the filled tiles into the destination under `mode`.
///
/// With `trim_result` set (frame active and the mask was grown or
/// feathered), tiles outside the bounding box are dropped and edge tiles
/// are clipped to their in-tile bounds. Observers are notified once, with
/// the pixel rectangle covering exactly the tiles written.
pub fn composite<D: DestinationSurface>(
  mode: BlendMode,
  color: [u8; 3],
  trim_result: bool,
  filled: &HashMap<TileCoord, AlphaTile>,
  bbox: &TileBoundingBox,
  dst: &mut D,
) -> Result<(), SurfaceError> {
  // Opaque color tile backing the full-tile fast path.
  let full_rgba = fill_rgba(&AlphaTile::Full, color, PixelBounds::FULL);

  let mut changed = PixelRect::EMPTY;
  for (&tc, src_tile) in filled {
    // Tiles outside the bbox can only come from dilation or blur.
    if trim_result && bbox.outside(tc) {
      continue;
    }
    if src_tile.is_empty() {
      continue;
    }
    // Erasing or recoloring nothing: skip absent destination tiles.
    if mode.needs_destination() && !dst.has_tile(tc) {
      continue;
    }
    let cut_off = trim_result && bbox.clips(tc);
    dst.with_tile_mut(tc, |dst_tile| {
      if src_tile.is_full() && !cut_off {
        match mode {
          BlendMode::Normal => {
            *dst_tile = full_rgba.clone();
            return;
          }
          BlendMode::Erase => {
            *dst_tile = RgbaTile::new();
            return;
          }
          BlendMode::SourceAtop => {}
        }
      }
      let bounds = if trim_result {
        bbox.tile_bounds(tc)
      } else {
        PixelBounds::FULL
      };
      let src_rgba = fill_rgba(src_tile, color, bounds);
      combine(mode, &src_rgba, dst_tile);
    })?;
    dst.mark_mipmap_dirty(tc);
    changed = changed.union(tc.pixel_rect());
  }
  if !changed.is_empty() {
    dst.notify_observers(changed);
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::coords::{OPAQUE, PixelRect, TILE_SIZE};
  use crate::surface::{CanvasSurface, Rgba};
  use crate::tile::TileBuf;

  fn bbox(rect: PixelRect) -> TileBoundingBox {
    TileBoundingBox::new(rect).unwrap()
  }

  #[test]
  fn full_tiles_take_the_copy_fast_path() {
    let filled = HashMap::from([(TileCoord::new(0, 0), AlphaTile::Full)]);
    let mut dst = CanvasSurface::new();
    composite(
      BlendMode::Normal,
      [0, 255, 0],
      false,
      &filled,
      &bbox(PixelRect::new(0, 0, 64, 64)),
      &mut dst,
    )
    .unwrap();
    assert_eq!(dst.get_pixel(0, 0), Rgba::rgb(0, 255, 0));
    assert_eq!(dst.get_pixel(63, 63), Rgba::rgb(0, 255, 0));
    assert_eq!(dst.notifications(), &[PixelRect::new(0, 0, 64, 64)]);
    assert!(dst.mipmap_dirty().contains(&TileCoord::new(0, 0)));
  }

  #[test]
  fn empty_tiles_are_skipped() {
    let filled = HashMap::from([(TileCoord::new(0, 0), AlphaTile::Empty)]);
    let mut dst = CanvasSurface::new();
    composite(
      BlendMode::Normal,
      [0, 255, 0],
      false,
      &filled,
      &bbox(PixelRect::new(0, 0, 64, 64)),
      &mut dst,
    )
    .unwrap();
    assert!(dst.tiles().is_empty());
    assert!(dst.notifications().is_empty());
  }

  #[test]
  fn erase_skips_absent_destination_tiles() {
    let filled = HashMap::from([(TileCoord::new(0, 0), AlphaTile::Full)]);
    let mut dst = CanvasSurface::new();
    composite(
      BlendMode::Erase,
      [0, 0, 0],
      false,
      &filled,
      &bbox(PixelRect::new(0, 0, 64, 64)),
      &mut dst,
    )
    .unwrap();
    assert!(dst.tiles().is_empty());
  }

  #[test]
  fn trim_clips_edge_tiles_and_drops_outside_tiles() {
    let mut mask = TileBuf::zeroed();
    for y in 0..TILE_SIZE {
      for x in 0..TILE_SIZE {
        mask.set(x, y, OPAQUE);
      }
    }
    let filled = HashMap::from([
      (TileCoord::new(0, 0), AlphaTile::Owned(mask)),
      (TileCoord::new(1, 0), AlphaTile::Full),
    ]);
    let mut dst = CanvasSurface::new();
    composite(
      BlendMode::Normal,
      [255, 0, 0],
      true,
      &filled,
      &bbox(PixelRect::new(8, 8, 48, 48)),
      &mut dst,
    )
    .unwrap();
    // Tile (1, 0) is outside the single-tile bbox.
    assert!(!dst.has_tile(TileCoord::new(1, 0)));
    assert_eq!(dst.get_pixel(8, 8), Rgba::rgb(255, 0, 0));
    assert_eq!(dst.get_pixel(7, 8), Rgba::TRANSPARENT);
    assert_eq!(dst.get_pixel(56, 8), Rgba::TRANSPARENT);
  }
}
