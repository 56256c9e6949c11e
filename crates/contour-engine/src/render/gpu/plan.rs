//! Resolves a recorded command stream into render passes.
//!
//! Sticky state (`UseProgram`, `BindTexture`) is folded into every draw so
//! the executor never tracks it. `ClearStencil` starts a new pass whose
//! stencil attachment is cleared on load. Texture destruction is deferred
//! until every draw of the submission has been encoded.

use anyhow::{Context, Result};

use crate::render::command::{CommandList, DrawCall, LineCommand};
use crate::render::state::{TextureFilter, TextureUnit, TextureWrap};
use crate::render::texture::{RgbaImage, TextureId};

use super::common::PipelineKey;

/// A texture as bound to one texture unit.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(super) struct TextureBinding {
    pub texture: TextureId,
    pub filter: TextureFilter,
    pub wrap: TextureWrap,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct PlannedDraw<'c> {
    pub key: PipelineKey,
    pub atlas: Option<TextureBinding>,
    pub ramp: Option<TextureBinding>,
    pub draw: &'c DrawCall,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub(super) struct PlannedPass<'c> {
    /// Stencil clear value applied when the pass begins; `None` keeps the buffer.
    pub clear_stencil: Option<u8>,
    pub draws: Vec<PlannedDraw<'c>>,
}

#[derive(Debug, Default)]
pub(super) struct FramePlan<'c> {
    /// Creations and updates, in issue order.
    pub uploads: Vec<(TextureId, &'c RgbaImage)>,
    pub destroys: Vec<TextureId>,
    pub passes: Vec<PlannedPass<'c>>,
}

impl FramePlan<'_> {
    pub fn draw_count(&self) -> usize {
        self.passes.iter().map(|p| p.draws.len()).sum()
    }
}

pub(super) fn plan(commands: &CommandList) -> Result<FramePlan<'_>> {
    let mut out = FramePlan { passes: vec![PlannedPass::default()], ..FramePlan::default() };
    let mut program = None;
    let mut atlas = None;
    let mut ramp = None;

    for (index, command) in commands.iter().enumerate() {
        match command {
            // Painter-side hooks; the stencil buffer already reflects them.
            LineCommand::PrepareDrawTile { .. } | LineCommand::ResetClippingMasks => {}
            LineCommand::UseProgram { variant, defines } => program = Some((*variant, *defines)),
            LineCommand::CreateTexture { texture, image }
            | LineCommand::UpdateTexture { texture, image } => {
                out.uploads.push((*texture, image.as_ref()));
            }
            LineCommand::DestroyTexture { texture } => out.destroys.push(*texture),
            LineCommand::BindTexture { unit, texture, filter, wrap } => {
                let binding = Some(TextureBinding { texture: *texture, filter: *filter, wrap: *wrap });
                match unit {
                    TextureUnit::Atlas => atlas = binding,
                    TextureUnit::Ramp => ramp = binding,
                }
            }
            LineCommand::ClearStencil { value } => {
                out.passes.push(PlannedPass { clear_stencil: Some(*value), draws: Vec::new() });
            }
            LineCommand::Draw(draw) => {
                let (variant, defines) =
                    program.with_context(|| format!("draw #{index} recorded before any program"))?;
                let planned = PlannedDraw {
                    key: PipelineKey::from_draw(variant, defines, draw),
                    atlas,
                    ramp,
                    draw,
                };
                if let Some(pass) = out.passes.last_mut() {
                    pass.draws.push(planned);
                }
            }
        }
    }

    // A trailing pass with nothing to draw or clear is dropped.
    out.passes.retain(|p| p.clear_stencil.is_some() || !p.draws.is_empty());
    Ok(out)
}
