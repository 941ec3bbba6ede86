//! Cross-tile seed bookkeeping.
//!
//! Every fill driver runs a FIFO queue of (tile, seeds, tag) records.
//! [`enqueue_overflows`] is the single place where a tile's per-edge
//! overflow output turns into neighbor records, so the (north, east,
//! south, west) ordering and the bounding-box filter are applied uniformly.

use std::collections::VecDeque;

use crate::bounds::TileBoundingBox;
use crate::coords::{TileCoord, orthogonal};

/// Inclusive pixel interval along one tile edge.
pub type SeedRange = (u8, u8);

/// Per-edge overflow seed lists, in (north, east, south, west) order.
pub type Overflows = [Vec<SeedRange>; 4];

/// Queue payloads that may be empty; empty payloads are never enqueued.
pub trait SeedList {
  fn is_empty(&self) -> bool;
}

impl<T> SeedList for Vec<T> {
  fn is_empty(&self) -> bool {
    Vec::is_empty(self)
  }
}

/// Conditionally enqueues one record per orthogonal neighbor.
///
/// Zips the neighbors of `tc` (in fixed north, east, south, west order)
/// with `overflows` and `extras`. A record is enqueued iff its seed list
/// is non-empty and the neighbor is not outside `bbox`.
pub fn enqueue_overflows<S: SeedList, X>(
  queue: &mut VecDeque<(TileCoord, S, X)>,
  tc: TileCoord,
  overflows: [S; 4],
  bbox: &TileBoundingBox,
  extras: [X; 4],
) {
  for ((ntc, seeds), extra) in orthogonal(tc).into_iter().zip(overflows).zip(extras) {
    if !seeds.is_empty() && !bbox.outside(ntc) {
      queue.push_back((ntc, seeds, extra));
    }
  }
}
