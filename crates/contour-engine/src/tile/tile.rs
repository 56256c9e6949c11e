use std::collections::HashMap;

use crate::render::TextureId;
use crate::style::LayerId;

use super::atlas::{ImageAtlas, LineAtlas};
use super::bucket::LineBucket;
use super::id::TileId;

/// Atlas textures of a tile, borrowed alongside a mutable bucket.
#[derive(Debug, Copy, Clone)]
pub struct TileAtlases<'a> {
    pub image_atlas: Option<&'a ImageAtlas>,
    pub image_atlas_texture: Option<TextureId>,
    pub line_atlas: Option<&'a LineAtlas>,
    pub line_atlas_texture: Option<TextureId>,
}

/// A loaded tile: per-layer line buckets plus the atlases their styles reference.
///
/// Tiles belong to the tile cache; the renderer only borrows them for a frame.
#[derive(Debug, Clone)]
pub struct Tile {
    pub id: TileId,
    buckets: HashMap<LayerId, LineBucket>,
    pub image_atlas: Option<ImageAtlas>,
    pub image_atlas_texture: Option<TextureId>,
    pub line_atlas: Option<LineAtlas>,
    pub line_atlas_texture: Option<TextureId>,
    patterns_loaded: bool,
}

impl Tile {
    pub fn new(id: TileId) -> Self {
        Self {
            id,
            buckets: HashMap::new(),
            image_atlas: None,
            image_atlas_texture: None,
            line_atlas: None,
            line_atlas_texture: None,
            patterns_loaded: true,
        }
    }

    pub fn insert_bucket(&mut self, layer: LayerId, bucket: LineBucket) {
        self.buckets.insert(layer, bucket);
    }

    #[inline]
    pub fn bucket(&self, layer: &LayerId) -> Option<&LineBucket> {
        self.buckets.get(layer)
    }

    #[inline]
    pub fn bucket_mut(&mut self, layer: &LayerId) -> Option<&mut LineBucket> {
        self.buckets.get_mut(layer)
    }

    /// Mutable bucket for `layer` together with the tile's atlases.
    pub fn bucket_with_atlases(
        &mut self,
        layer: &LayerId,
    ) -> Option<(&mut LineBucket, TileAtlases<'_>)> {
        let bucket = self.buckets.get_mut(layer)?;
        let atlases = TileAtlases {
            image_atlas: self.image_atlas.as_ref(),
            image_atlas_texture: self.image_atlas_texture,
            line_atlas: self.line_atlas.as_ref(),
            line_atlas_texture: self.line_atlas_texture,
        };
        Some((bucket, atlases))
    }

    /// Whether every pattern image referenced by this tile's features is in the image atlas.
    #[inline]
    pub fn patterns_loaded(&self) -> bool {
        self.patterns_loaded
    }

    pub fn set_patterns_loaded(&mut self, loaded: bool) {
        self.patterns_loaded = loaded;
    }
}

/// Read/write access to the tiles of one source.
pub trait TileSource {
    fn tile_mut(&mut self, id: &TileId) -> Option<&mut Tile>;

    /// Highest zoom the source provides data for; deeper tiles are overscaled.
    fn max_zoom(&self) -> u8;

    /// Ids of tiles evicted since the last call. Renderers release the
    /// per-tile state they keep for them.
    fn take_evicted(&mut self) -> Vec<TileId> {
        Vec::new()
    }
}

/// Minimal in-memory tile source.
#[derive(Debug, Clone, Default)]
pub struct TileCache {
    tiles: HashMap<TileId, Tile>,
    max_zoom: u8,
    evicted: Vec<TileId>,
}

impl TileCache {
    pub fn new(max_zoom: u8) -> Self {
        Self { tiles: HashMap::new(), max_zoom, evicted: Vec::new() }
    }

    pub fn insert(&mut self, tile: Tile) {
        self.tiles.insert(tile.id, tile);
    }

    pub fn remove(&mut self, id: &TileId) -> Option<Tile> {
        let tile = self.tiles.remove(id)?;
        self.evicted.push(*id);
        Some(tile)
    }

    #[inline]
    pub fn get(&self, id: &TileId) -> Option<&Tile> {
        self.tiles.get(id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

impl TileSource for TileCache {
    fn tile_mut(&mut self, id: &TileId) -> Option<&mut Tile> {
        self.tiles.get_mut(id)
    }

    fn max_zoom(&self) -> u8 {
        self.max_zoom
    }

    fn take_evicted(&mut self) -> Vec<TileId> {
        std::mem::take(&mut self.evicted)
    }
}
