//! Tile-based raster flood fill for painting applications.
//!
//! Given a tiled source surface, a seed pixel and a color tolerance, the
//! engine computes the alpha mask of the connected region and composites
//! it onto a destination surface under a blend mode. Work propagates tile
//! by tile through FIFO queues of per-edge seed ranges; uniform tiles are
//! resolved without touching their pixels.
//!
//! The gap-closing variant additionally detects narrow openings bounded by
//! unfillable pixels and keeps the fill from leaking through them,
//! retracting whatever seeped in.
//!
//! The crate is a pure library: no I/O, no logger installation, no global
//! state. [`flood_fill`] is the entry point; the lower-level drivers
//! ([`scanline_fill`], [`gap_closing_fill`]) are exposed for callers that
//! want the mask without compositing.

pub mod blend;
pub mod bounds;
pub mod composite;
pub mod coords;
pub mod fill;
pub mod filler;
pub mod gap_fill;
pub mod gaps;
pub mod morphology;
pub mod queue;
pub mod surface;
pub mod tile;

pub use blend::BlendMode;
pub use bounds::{PixelBounds, TileBoundingBox};
pub use composite::composite;
pub use coords::{Edge, OPAQUE, PixelRect, TILE_SIZE, TileCoord};
pub use fill::{FillError, FillRequest, flood_fill, scanline_fill};
pub use filler::{FillSeeds, Filler};
pub use gap_fill::{GapClosingFiller, GapClosingOptions, GapSeed, gap_closing_fill};
pub use gaps::{AlphaGrid, DistanceBucket, find_gaps, no_corner_gaps};
pub use morphology::{blur, morph};
pub use surface::{
  CanvasSurface, DestinationSurface, Rgba, RgbaTile, SourceSurface, SourceTile, SurfaceError,
};
pub use tile::{AlphaTile, DistanceTile, GAPLESS, TileBuf};
