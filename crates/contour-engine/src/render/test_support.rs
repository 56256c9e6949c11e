//! Fakes shared by the render tests.

use std::collections::HashMap;

use crate::style::LayerId;
use crate::tile::{GeometryId, LineBucket, Segment, Tile, TileId};

use super::frame::Painter;
use super::state::{CompareFunction, StencilFunc, StencilMode, StencilOp};

/// Painter that hands out one clip reference per tile, starting at 1.
///
/// Clip masks count as drawn from the first request for a tile until the next reset.
#[derive(Debug, Default)]
pub(crate) struct FakePainter {
    refs: HashMap<TileId, u8>,
    zero_refs: bool,
    pub resets: usize,
    pub masks_drawn: usize,
}

impl FakePainter {
    /// Hands out reference 0 for every tile, as terrain without overlap masks does.
    pub fn with_zero_refs() -> Self {
        Self { zero_refs: true, ..Self::default() }
    }

    /// True when no clip masks are drawn, i.e. the next request starts from a clean stencil.
    pub fn masks_fresh(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn clip_mode(reference: u8) -> StencilMode {
        StencilMode::new(
            StencilFunc { compare: CompareFunction::Equal, mask: 0xFF },
            reference,
            0x00,
            StencilOp::Keep,
            StencilOp::Keep,
            StencilOp::Replace,
        )
    }
}

impl Painter for FakePainter {
    fn stencil_mode_for_clipping(&mut self, tile: &TileId) -> StencilMode {
        let next = if self.zero_refs { 0 } else { self.refs.len() as u8 + 1 };
        let reference = match self.refs.get(tile) {
            Some(r) => *r,
            None => {
                self.masks_drawn += 1;
                self.refs.insert(*tile, next);
                next
            }
        };
        Self::clip_mode(reference)
    }

    fn reset_stencil_clipping_masks(&mut self) {
        self.refs.clear();
        self.resets += 1;
    }

    fn projection_matrix(&self, tile: &TileId) -> [f32; 16] {
        let s = 1.0 / (1u32 << tile.canonical.z.min(31)) as f32;
        [
            s, 0.0, 0.0, 0.0, //
            0.0, s, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ]
    }
}

/// A tile carrying one single-segment bucket for `layer`.
pub(crate) fn tile_with_bucket(id: TileId, layer: &str, geometry: u64) -> Tile {
    let mut tile = Tile::new(id);
    let segment = Segment { vertex_offset: 0, index_offset: 0, index_count: 6 };
    tile.insert_bucket(LayerId::from(layer), LineBucket::new(GeometryId(geometry), vec![segment]));
    tile
}
