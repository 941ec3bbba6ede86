//! Blend modes and RGBA tile math for compositing fills.

use serde::{Deserialize, Serialize};

use crate::bounds::PixelBounds;
use crate::coords::{OPAQUE, TILE_SIZE};
use crate::surface::{Rgba, RgbaTile};
use crate::tile::AlphaTile;

/// How fill results combine with destination pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlendMode {
  /// Source-over: paint the fill color onto the destination.
  Normal,
  /// Destination-out: erase destination coverage under the fill.
  Erase,
  /// Source-atop: recolor existing destination coverage, preserving its
  /// alpha (the alpha-locked fill).
  SourceAtop,
}

impl BlendMode {
  /// Modes that only ever modify existing destination content.
  #[inline]
  pub fn needs_destination(self) -> bool {
    matches!(self, Self::Erase | Self::SourceAtop)
  }
}

/// Converts a fix15 fill alpha to 8-bit coverage.
#[inline]
fn alpha_to_u8(alpha: u16) -> u8 {
  ((u32::from(alpha) * 255 + u32::from(OPAQUE) / 2) / u32::from(OPAQUE)) as u8
}

/// Builds an RGBA tile from an alpha mask and fill color over `bounds`;
/// pixels outside the bounds stay transparent.
pub fn fill_rgba(mask: &AlphaTile, color: [u8; 3], bounds: PixelBounds) -> RgbaTile {
  let [r, g, b] = color;
  if let (Some(alpha), true) = (mask.uniform_value(), bounds == PixelBounds::FULL) {
    return RgbaTile::filled(Rgba::new(r, g, b, alpha_to_u8(alpha)));
  }
  let mut tile = RgbaTile::new();
  for y in bounds.min_y..=bounds.max_y {
    for x in bounds.min_x..=bounds.max_x {
      let alpha = mask.get(x, y);
      if alpha > 0 {
        tile.set(x, y, Rgba::new(r, g, b, alpha_to_u8(alpha)));
      }
    }
  }
  tile
}

/// Blends `src` into `dst` under `mode`.
pub fn combine(mode: BlendMode, src: &RgbaTile, dst: &mut RgbaTile) {
  let dst_pixels = dst.as_slice_mut();
  for (s, d) in src.as_slice().iter().zip(dst_pixels) {
    blend_pixel(mode, *s, d);
  }
}

#[inline]
fn blend_pixel(mode: BlendMode, s: Rgba, d: &mut Rgba) {
  let sa = u32::from(s.a);
  if sa == 0 {
    return;
  }
  let da = u32::from(d.a);
  match mode {
    BlendMode::Normal => {
      let ws = sa * 255;
      let wd = da * (255 - sa);
      let total = ws + wd;
      if total == 0 {
        *d = Rgba::TRANSPARENT;
        return;
      }
      let mix = |sc: u8, dc: u8| -> u8 {
        ((u32::from(sc) * ws + u32::from(dc) * wd + total / 2) / total) as u8
      };
      *d = Rgba::new(
        mix(s.r, d.r),
        mix(s.g, d.g),
        mix(s.b, d.b),
        ((total + 127) / 255) as u8,
      );
    }
    BlendMode::Erase => {
      let a = (da * (255 - sa) + 127) / 255;
      if a == 0 {
        *d = Rgba::TRANSPARENT;
      } else {
        d.a = a as u8;
      }
    }
    BlendMode::SourceAtop => {
      if da == 0 {
        return;
      }
      let mix =
        |sc: u8, dc: u8| -> u8 { ((u32::from(sc) * sa + u32::from(dc) * (255 - sa)) / 255) as u8 };
      d.r = mix(s.r, d.r);
      d.g = mix(s.g, d.g);
      d.b = mix(s.b, d.b);
    }
  }
}
