use std::sync::Arc;

use crate::style::LayerId;
use crate::tile::{GeometryId, Segment, TileId};

use super::program::{Defines, ProgramVariant};
use super::state::{
    ColorMode, CullFaceMode, DepthMode, StencilMode, TextureFilter, TextureUnit, TextureWrap,
};
use super::texture::{RgbaImage, TextureId};
use super::uniforms::LineUniforms;

/// One indexed triangle-list draw over a bucket's geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub tile: TileId,
    pub layer: LayerId,
    pub geometry: GeometryId,
    pub segments: Vec<Segment>,
    pub depth: DepthMode,
    pub stencil: StencilMode,
    pub color: ColorMode,
    pub cull: CullFaceMode,
    pub uniforms: LineUniforms,
}

/// A single recorded GPU instruction.
///
/// Bindings (`UseProgram`, `BindTexture`) are sticky: they stay in effect for
/// every following `Draw` until replaced.
#[derive(Debug, Clone, PartialEq)]
pub enum LineCommand {
    /// Per-tile setup hook of the painter (terrain draping, debug overlays).
    PrepareDrawTile { tile: TileId },
    UseProgram { variant: ProgramVariant, defines: Defines },
    CreateTexture { texture: TextureId, image: Arc<RgbaImage> },
    /// Re-uploads `image` into an existing texture, resizing it if needed.
    UpdateTexture { texture: TextureId, image: Arc<RgbaImage> },
    DestroyTexture { texture: TextureId },
    BindTexture { unit: TextureUnit, texture: TextureId, filter: TextureFilter, wrap: TextureWrap },
    ClearStencil { value: u8 },
    Draw(DrawCall),
    /// Tile clip masks were disturbed; the next layer redraws them.
    ResetClippingMasks,
}

/// Recorded command stream for a frame.
///
/// Commands are kept in issue order; the GPU layer replays them verbatim.
/// Keeps allocated capacity across frames when cleared.
#[derive(Debug, Default)]
pub struct CommandList {
    commands: Vec<LineCommand>,
}

impl CommandList {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push(&mut self, command: LineCommand) {
        self.commands.push(command);
    }

    #[inline]
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    #[inline]
    pub fn commands(&self) -> &[LineCommand] {
        &self.commands
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LineCommand> {
        self.commands.iter()
    }

    /// Iterates recorded draws in issue order.
    pub fn draw_calls(&self) -> impl Iterator<Item = &DrawCall> {
        self.commands.iter().filter_map(|c| match c {
            LineCommand::Draw(draw) => Some(draw),
            _ => None,
        })
    }

    pub fn draw_count(&self) -> usize {
        self.draw_calls().count()
    }

    /// Number of texture uploads (creations and updates).
    pub fn upload_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| {
                matches!(c, LineCommand::CreateTexture { .. } | LineCommand::UpdateTexture { .. })
            })
            .count()
    }
}

impl<'a> IntoIterator for &'a CommandList {
    type Item = &'a LineCommand;
    type IntoIter = std::slice::Iter<'a, LineCommand>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}
