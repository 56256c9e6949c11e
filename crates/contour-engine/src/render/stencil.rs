//! Seam-free drawing of overlapping tiles.
//!
//! Neighboring tiles both carry the anti-aliased fringe of lines crossing their
//! shared edge. Drawn naively, that fringe is blended twice and shows up as a
//! seam on translucent lines. The double-pass strategy stamps each pixel once:
//!
//! 1. Draw with alpha discard at 0.8 and stencil op INVERT: the solid interior
//!    of the line flips the tile's clip reference, so no other tile (and no
//!    later pass) can match it again.
//! 2. Draw the full anti-aliased line with threshold 0.0 and stencil op KEEP:
//!    only pixels still carrying this tile's reference receive color.
//!
//! Stamps are left behind in the stencil buffer, so once a layer is done the
//! tile clip masks have to be rebuilt before anything else relies on them.

use crate::tile::TileId;

use super::command::{CommandList, LineCommand};
use super::frame::{Painter, TerrainState};
use super::program::{Defines, LineDefine};
use super::state::{CompareFunction, StencilFunc, StencilMode, StencilOp};

/// Alpha-discard threshold of the stamping pass.
pub const STAMP_ALPHA_THRESHOLD: f32 = 0.8;

/// Alpha-discard threshold of the anti-aliased color pass.
pub const BLEND_ALPHA_THRESHOLD: f32 = 0.0;

/// How a layer's tiles are drawn against the stencil buffer. Chosen once per layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StencilStrategy {
    /// One draw per tile with the tile-clipping stencil mode.
    SinglePass,
    /// Stamp then blend, see the module docs.
    DoublePass,
}

impl StencilStrategy {
    /// Double pass needs the alpha-discard program; terrain clip/mask overlap
    /// already keeps tile stencil regions apart and would be corrupted by it.
    pub fn decide(defines: Defines, terrain: Option<&TerrainState>) -> Self {
        let alpha_discard = defines.contains(LineDefine::RenderLineAlphaDiscard);
        let terrain_separates = terrain.is_some_and(TerrainState::clip_or_mask_overlap_stencil_type);
        if alpha_discard && !terrain_separates {
            StencilStrategy::DoublePass
        } else {
            StencilStrategy::SinglePass
        }
    }
}

/// Executes per-tile draws according to a [`StencilStrategy`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StencilClipController {
    strategy: StencilStrategy,
    terrain: bool,
}

impl StencilClipController {
    pub fn new(defines: Defines, terrain: Option<&TerrainState>) -> Self {
        Self { strategy: StencilStrategy::decide(defines, terrain), terrain: terrain.is_some() }
    }

    #[inline]
    pub fn strategy(&self) -> StencilStrategy {
        self.strategy
    }

    /// Pass modes for the stamping and blending passes of a tile with clip reference `reference`.
    pub fn double_pass_modes(reference: u8) -> [(StencilMode, f32); 2] {
        let func = StencilFunc { compare: CompareFunction::Equal, mask: 0xFF };
        let stamp = StencilMode::new(func, reference, 0xFF, StencilOp::Keep, StencilOp::Keep, StencilOp::Invert);
        let blend = StencilMode::new(func, reference, 0xFF, StencilOp::Keep, StencilOp::Keep, StencilOp::Keep);
        [(stamp, STAMP_ALPHA_THRESHOLD), (blend, BLEND_ALPHA_THRESHOLD)]
    }

    /// Issues the draw(s) of one tile.
    ///
    /// `clip` is the tile-clipping stencil mode; `draw` records one draw with
    /// the given stencil mode and alpha-discard threshold.
    pub fn execute_draw<F>(&self, clip: StencilMode, commands: &mut CommandList, mut draw: F)
    where
        F: FnMut(&mut CommandList, StencilMode, f32),
    {
        match self.strategy {
            StencilStrategy::SinglePass => draw(commands, clip, BLEND_ALPHA_THRESHOLD),
            StencilStrategy::DoublePass => {
                // A zero reference is indistinguishable from unclaimed pixels
                // unless the buffer really is zero; terrain may have left other values.
                if clip.reference == 0 && self.terrain {
                    commands.push(LineCommand::ClearStencil { value: 0 });
                }
                for (mode, threshold) in Self::double_pass_modes(clip.reference) {
                    draw(commands, mode, threshold);
                }
            }
        }
    }

    /// Restores tile clipping after a double-pass layer. No-op for single pass.
    pub fn cleanup(&self, painter: &mut dyn Painter, commands: &mut CommandList) {
        if self.strategy != StencilStrategy::DoublePass {
            return;
        }
        painter.reset_stencil_clipping_masks();
        commands.push(LineCommand::ResetClippingMasks);
        if self.terrain {
            commands.push(LineCommand::ClearStencil { value: 0 });
        }
    }
}

/// Records the tiles of one layer strictly in order and guarantees stencil cleanup.
///
/// Tiles are drawn through [`DrawSequence::draw_tile`], which holds the only
/// mutable access to the command list for the layer, so stamps of tile N are
/// always recorded before tile N+1 tests against them. Cleanup runs in
/// [`DrawSequence::finish`] or, if the sequence is abandoned early, on drop.
pub struct DrawSequence<'a> {
    controller: StencilClipController,
    painter: &'a mut dyn Painter,
    commands: &'a mut CommandList,
    tiles_drawn: usize,
    finished: bool,
}

impl<'a> DrawSequence<'a> {
    pub fn begin(
        controller: StencilClipController,
        painter: &'a mut dyn Painter,
        commands: &'a mut CommandList,
    ) -> Self {
        Self { controller, painter, commands, tiles_drawn: 0, finished: false }
    }

    #[inline]
    pub fn strategy(&self) -> StencilStrategy {
        self.controller.strategy()
    }

    /// Command list for per-tile state (programs, textures) ahead of the draw.
    #[inline]
    pub fn commands(&mut self) -> &mut CommandList {
        self.commands
    }

    #[inline]
    pub fn painter(&self) -> &dyn Painter {
        &*self.painter
    }

    /// Draws `tile` with its clip stencil according to the layer's strategy.
    pub fn draw_tile<F>(&mut self, tile: &TileId, draw: F)
    where
        F: FnMut(&mut CommandList, StencilMode, f32),
    {
        let clip = self.painter.stencil_mode_for_clipping(tile);
        self.controller.execute_draw(clip, self.commands, draw);
        self.tiles_drawn += 1;
    }

    #[inline]
    pub fn tiles_drawn(&self) -> usize {
        self.tiles_drawn
    }

    /// Ends the layer, restoring tile clipping state. Returns the number of tiles drawn.
    pub fn finish(mut self) -> usize {
        self.run_cleanup();
        self.tiles_drawn
    }

    fn run_cleanup(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.controller.cleanup(&mut *self.painter, self.commands);
    }
}

impl Drop for DrawSequence<'_> {
    fn drop(&mut self) {
        if !self.finished {
            log::debug!("line draw sequence dropped early; restoring stencil clipping");
        }
        self.run_cleanup();
    }
}
