//! Tile-side data the line renderer consumes.
//!
//! Loading, tessellation and atlas packing happen elsewhere; these types
//! describe the results: per-layer line buckets, the image (pattern) and line
//! (dash) atlases of a tile, and the source the tiles are fetched from.

mod atlas;
mod bucket;
mod id;
mod tile;

pub use atlas::{AtlasRect, DashKey, ImageAtlas, LineAtlas};
pub use bucket::{BucketGeneration, GeometryId, LineBucket, LineClip, PatternPositions, ProgramConfiguration, Segment};
pub use id::{CanonicalTileId, TileId};
pub use tile::{Tile, TileAtlases, TileCache, TileSource};

/// Tile-local coordinate units per tile edge.
pub const EXTENT: f32 = 8192.0;

/// Logical pixel size of a tile displayed at its own zoom.
pub const TILE_SIZE: f32 = 512.0;
