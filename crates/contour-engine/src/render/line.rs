use crate::style::{LayerId, LineLayerConfig};
use crate::tile::{TileId, TileSource};

use super::atlas_binder::AtlasBinder;
use super::command::{CommandList, DrawCall, LineCommand};
use super::frame::{FrameState, Painter, RenderPass};
use super::gradient::{GradientRampCache, RampRequest, TileMetrics};
use super::program::{Defines, ProgramVariant};
use super::state::{CullFaceMode, DepthMask};
use super::stencil::{DrawSequence, StencilClipController};
use super::uniforms::{UniformInputs, line_pattern_uniform_values, line_uniform_values};

/// Draws line layers, one layer per [`LineRenderer::render_layer`] call.
///
/// Owns the gradient ramps of every layer it has drawn; the style owner
/// calls [`LineRenderer::remove_layer`] when a layer goes away.
#[derive(Debug, Default)]
pub struct LineRenderer {
    ramps: GradientRampCache,
}

impl LineRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn ramps(&self) -> &GradientRampCache {
        &self.ramps
    }

    /// Records the draws of `layer` over `coords` into `commands`.
    ///
    /// Only runs in the translucent pass, and not at all for layers with a
    /// constant zero opacity or width. Tiles missing from `source`, lacking a
    /// bucket for the layer, or still waiting for pattern images are skipped.
    pub fn render_layer(
        &mut self,
        frame: &FrameState,
        painter: &mut dyn Painter,
        source: &mut dyn TileSource,
        layer: &LineLayerConfig,
        coords: &[TileId],
        commands: &mut CommandList,
    ) {
        if frame.render_pass != RenderPass::Translucent || layer.is_invisible() {
            return;
        }

        for evicted in source.take_evicted() {
            self.ramps.evict_tile(&evicted, commands);
        }

        let depth = frame.depth_mode_for_sublayer(0, DepthMask::ReadOnly);
        let color = frame.color_mode_for_render_pass();
        let variant = ProgramVariant::for_layer(layer);
        let defines = Defines::for_layer(layer);
        let controller = StencilClipController::new(defines, frame.terrain.as_ref());
        let source_max_zoom = source.max_zoom();

        log::debug!(
            "line layer `{}`: {} {:?} over {} tiles, {:?}",
            layer.id,
            variant.name(),
            defines,
            coords.len(),
            controller.strategy()
        );

        let mut seq = DrawSequence::begin(controller, painter, commands);

        for coord in coords {
            let Some(tile) = source.tile_mut(coord) else {
                log::trace!("line layer `{}`: tile {} not in source", layer.id, coord);
                continue;
            };
            if layer.has_pattern() && !tile.patterns_loaded() {
                log::trace!("line layer `{}`: tile {} waiting for patterns", layer.id, coord);
                continue;
            }
            let Some((bucket, atlases)) = tile.bucket_with_atlases(&layer.id) else {
                continue;
            };

            let cmds = seq.commands();
            cmds.push(LineCommand::PrepareDrawTile { tile: *coord });
            cmds.push(LineCommand::UseProgram { variant, defines });

            AtlasBinder::bind_pattern_or_dash(
                &atlases,
                layer,
                layer.crossfade,
                &mut bucket.program_configuration,
                cmds,
            );

            let inputs = UniformInputs {
                frame,
                tile: coord,
                layer,
                crossfade: layer.crossfade,
                matrix: seq.painter().projection_matrix(coord),
                constant_positions: bucket.program_configuration.constant_pattern_positions(),
            };
            let uniforms = match variant {
                ProgramVariant::LinePattern => {
                    line_pattern_uniform_values(&inputs, atlases.image_atlas.map(|a| a.size))
                }
                ProgramVariant::Line => line_uniform_values(
                    &inputs,
                    atlases.line_atlas.map(|a| a.size),
                    bucket.line_clips.len(),
                ),
            };

            if let Some(gradient) = &layer.gradient {
                let req = RampRequest {
                    layer: &layer.id,
                    gradient,
                    gradient_version: layer.gradient_version,
                    tile: coord,
                    bucket: bucket.generation(),
                    clips: &bucket.line_clips,
                    metrics: TileMetrics {
                        max_line_length: bucket.max_line_length,
                        tile_zoom: coord.canonical.z,
                        source_max_zoom,
                        renderer_max_zoom: frame.max_zoom,
                        max_texture_size: frame.max_texture_size,
                    },
                };
                self.ramps.ensure_ramp(&req, seq.commands());
            }

            let geometry = bucket.geometry;
            let segments = &bucket.segments;
            seq.draw_tile(coord, |cmds, stencil, threshold| {
                let mut uniforms = uniforms;
                uniforms.alpha_discard_threshold = threshold;
                cmds.push(LineCommand::Draw(DrawCall {
                    tile: *coord,
                    layer: layer.id.clone(),
                    geometry,
                    segments: segments.clone(),
                    depth,
                    stencil,
                    color,
                    cull: CullFaceMode::Disabled,
                    uniforms,
                }));
            });
        }

        let drawn = seq.finish();
        log::trace!("line layer `{}`: drew {} of {} tiles", layer.id, drawn, coords.len());
    }

    /// Releases the ramps of a removed layer.
    pub fn remove_layer(&mut self, layer: &LayerId, commands: &mut CommandList) {
        self.ramps.remove_layer(layer, commands);
    }

    /// Releases the ramps of every layer not in `live`.
    pub fn retain_layers(&mut self, live: &[LayerId], commands: &mut CommandList) {
        self.ramps.retain_layers(|id| live.contains(id), commands);
    }

    /// Releases the ramps of an evicted tile.
    ///
    /// Tiles removed from a [`TileSource`] are released on the next
    /// [`LineRenderer::render_layer`]; this is for sources that do not report evictions.
    pub fn evict_tile(&mut self, tile: &TileId, commands: &mut CommandList) {
        self.ramps.evict_tile(tile, commands);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use test_log::test;

    use super::*;
    use crate::paint::Color;
    use crate::render::frame::{OverlapStencilType, TerrainState};
    use crate::render::state::{ColorMode, StencilOp, TextureFilter, TextureUnit, TextureWrap};
    use crate::render::test_support::{FakePainter, tile_with_bucket};
    use crate::style::{CrossFaded, ImageId, LineGradient, PaintValue, StopRamp};
    use crate::tile::{AtlasRect, EXTENT, GeometryId, ImageAtlas, LineBucket, LineClip, Segment, TileCache};

    const LAYER: &str = "roads";

    fn source(coords: &[TileId]) -> TileCache {
        let mut cache = TileCache::new(14);
        for (i, id) in coords.iter().enumerate() {
            cache.insert(tile_with_bucket(*id, LAYER, i as u64));
        }
        cache
    }

    fn translucent(layer: &str, opacity: f32) -> LineLayerConfig {
        let mut config = LineLayerConfig::new(layer);
        config.opacity = PaintValue::Constant(opacity);
        config
    }

    fn gradient_layer(version: u64) -> LineLayerConfig {
        let mut config = LineLayerConfig::new(LAYER);
        let ramp = StopRamp::interpolated([
            (0.0, Color::from_premul(1.0, 0.0, 0.0, 1.0)),
            (1.0, Color::from_premul(0.0, 1.0, 0.0, 1.0)),
        ]);
        config.gradient = Some(LineGradient { ramp: Arc::new(ramp), step_interpolant: false });
        config.gradient_version = version;
        config
    }

    fn stepped_gradient_layer(version: u64) -> LineLayerConfig {
        let mut config = LineLayerConfig::new(LAYER);
        let ramp = StopRamp::stepped([
            (0.0, Color::from_premul(1.0, 0.0, 0.0, 1.0)),
            (0.5, Color::from_premul(0.0, 1.0, 0.0, 1.0)),
        ]);
        config.gradient = Some(LineGradient { ramp: Arc::new(ramp), step_interpolant: true });
        config.gradient_version = version;
        config
    }

    fn bucket_with_clips(geometry: u64, clips: Vec<LineClip>) -> LineBucket {
        let segment = Segment { vertex_offset: 0, index_offset: 0, index_count: 6 };
        LineBucket::new(GeometryId(geometry), vec![segment]).with_line_clips(clips)
    }

    fn ramp_uploads(cmds: &CommandList) -> Vec<(u32, u32)> {
        cmds.iter()
            .filter_map(|c| match c {
                LineCommand::CreateTexture { image, .. } | LineCommand::UpdateTexture { image, .. } => {
                    Some((image.width(), image.height()))
                }
                _ => None,
            })
            .collect()
    }

    fn render(
        renderer: &mut LineRenderer,
        painter: &mut FakePainter,
        source: &mut TileCache,
        layer: &LineLayerConfig,
        coords: &[TileId],
    ) -> CommandList {
        let mut cmds = CommandList::new();
        renderer.render_layer(&FrameState::default(), painter, source, layer, coords, &mut cmds);
        cmds
    }

    fn thresholds(cmds: &CommandList) -> Vec<f32> {
        cmds.draw_calls().map(|d| d.uniforms.alpha_discard_threshold).collect()
    }

    // ── early exits ───────────────────────────────────────────────────────

    #[test]
    fn invisible_layers_draw_nothing() {
        let coords = [TileId::new(3, 1, 1)];
        let mut src = source(&coords);
        let mut painter = FakePainter::default();
        let mut renderer = LineRenderer::new();

        let cmds = render(&mut renderer, &mut painter, &mut src, &translucent(LAYER, 0.0), &coords);
        assert!(cmds.is_empty());

        let mut zero_width = LineLayerConfig::new(LAYER);
        zero_width.width = PaintValue::Constant(0.0);
        let cmds = render(&mut renderer, &mut painter, &mut src, &zero_width, &coords);
        assert!(cmds.is_empty());
        assert_eq!(painter.masks_drawn, 0);
    }

    #[test]
    fn data_driven_zero_is_not_skipped() {
        let coords = [TileId::new(3, 1, 1)];
        let mut src = source(&coords);
        let mut layer = LineLayerConfig::new(LAYER);
        layer.opacity = PaintValue::DataDriven;
        let cmds = render(&mut LineRenderer::new(), &mut FakePainter::default(), &mut src, &layer, &coords);
        assert!(cmds.draw_count() > 0);
    }

    #[test]
    fn only_translucent_pass_draws() {
        let coords = [TileId::new(3, 1, 1)];
        let mut src = source(&coords);
        let mut cmds = CommandList::new();
        for pass in [RenderPass::Opaque, RenderPass::Offscreen] {
            let frame = FrameState { render_pass: pass, ..FrameState::default() };
            LineRenderer::new().render_layer(
                &frame,
                &mut FakePainter::default(),
                &mut src,
                &LineLayerConfig::new(LAYER),
                &coords,
                &mut cmds,
            );
        }
        assert!(cmds.is_empty());
    }

    // ── per tile ──────────────────────────────────────────────────────────

    #[test]
    fn opaque_plain_tile_single_draw() {
        let coord = TileId::new(5, 3, 7);
        let mut src = source(&[coord]);
        let mut painter = FakePainter::default();
        let frame = FrameState::default();

        let cmds = render(&mut LineRenderer::new(), &mut painter, &mut src, &LineLayerConfig::new(LAYER), &[coord]);

        match cmds.commands() {
            [
                LineCommand::PrepareDrawTile { tile },
                LineCommand::UseProgram { variant: ProgramVariant::Line, defines },
                LineCommand::Draw(draw),
            ] => {
                assert_eq!(*tile, coord);
                assert!(defines.is_empty());
                assert_eq!(draw.stencil, FakePainter::clip_mode(1));
                assert_eq!(draw.uniforms.alpha_discard_threshold, 0.0);
                assert_eq!(draw.depth, frame.depth_mode_for_sublayer(0, DepthMask::ReadOnly));
                assert_eq!(draw.color, ColorMode::AlphaBlended);
                assert_eq!(draw.cull, CullFaceMode::Disabled);
                assert_eq!(draw.uniforms.matrix, painter.projection_matrix(&coord));
            }
            other => panic!("unexpected commands: {other:?}"),
        }
        assert_eq!(painter.resets, 0);
    }

    #[test]
    fn skips_tiles_without_bucket_or_source_entry() {
        let with_bucket = TileId::new(4, 0, 0);
        let without_bucket = TileId::new(4, 1, 0);
        let absent = TileId::new(4, 2, 0);
        let mut src = source(&[with_bucket]);
        src.insert(crate::tile::Tile::new(without_bucket));

        let cmds = render(
            &mut LineRenderer::new(),
            &mut FakePainter::default(),
            &mut src,
            &LineLayerConfig::new(LAYER),
            &[with_bucket, without_bucket, absent],
        );
        let tiles: Vec<_> = cmds.draw_calls().map(|d| d.tile).collect();
        assert_eq!(tiles, vec![with_bucket]);
    }

    #[test]
    fn pattern_waits_for_images() {
        let ready = TileId::new(6, 0, 0);
        let pending = TileId::new(6, 1, 0);
        let mut src = source(&[ready, pending]);
        for id in [ready, pending] {
            let tile = src.tile_mut(&id).unwrap();
            let mut atlas = ImageAtlas::new([64, 64]);
            atlas.insert_pattern("dots", AtlasRect::new([0, 0], [8, 8]));
            tile.image_atlas = Some(atlas);
            tile.image_atlas_texture = Some(crate::render::TextureId::allocate());
        }
        src.tile_mut(&pending).unwrap().set_patterns_loaded(false);

        let mut layer = LineLayerConfig::new(LAYER);
        layer.pattern = Some(PaintValue::Constant(CrossFaded::settled(ImageId::from("dots"))));

        let cmds = render(&mut LineRenderer::new(), &mut FakePainter::default(), &mut src, &layer, &[ready, pending]);

        assert_eq!(cmds.draw_count(), 1);
        assert!(cmds.iter().any(|c| matches!(
            c,
            LineCommand::UseProgram { variant: ProgramVariant::LinePattern, .. }
        )));
        assert!(cmds.iter().any(|c| matches!(c, LineCommand::BindTexture { unit: TextureUnit::Atlas, .. })));
        let draw = cmds.draw_calls().next().unwrap();
        assert_eq!(draw.tile, ready);
        assert_eq!(draw.uniforms.pattern_to, [0.0, 0.0, 8.0, 8.0]);
        assert_eq!(draw.uniforms.texsize, [64.0, 64.0]);
    }

    #[test]
    fn clip_count_reaches_uniforms() {
        let coord = TileId::new(8, 0, 0);
        let mut src = source(&[coord]);
        let tile = src.tile_mut(&coord).unwrap();
        let bucket = tile.bucket_mut(&LayerId::from(LAYER)).unwrap();
        bucket.line_clips = vec![LineClip { start: 0.0, end: 0.5 }, LineClip { start: 0.6, end: 1.0 }];

        let cmds = render(&mut LineRenderer::new(), &mut FakePainter::default(), &mut src, &gradient_layer(0), &[coord]);
        assert_eq!(cmds.draw_calls().next().unwrap().uniforms.image_height, 2.0);
    }

    // ── stencil ───────────────────────────────────────────────────────────

    #[test]
    fn translucent_layer_stamps_each_tile_in_order() {
        let coords = [TileId::new(4, 0, 0), TileId::new(4, 1, 0)];
        let mut src = source(&coords);
        let mut painter = FakePainter::default();

        let cmds = render(&mut LineRenderer::new(), &mut painter, &mut src, &translucent(LAYER, 0.5), &coords);

        assert_eq!(thresholds(&cmds), vec![0.8, 0.0, 0.8, 0.0]);
        let refs: Vec<_> = cmds.draw_calls().map(|d| (d.tile, d.stencil.reference, d.stencil.pass)).collect();
        assert_eq!(
            refs,
            vec![
                (coords[0], 1, StencilOp::Invert),
                (coords[0], 1, StencilOp::Keep),
                (coords[1], 2, StencilOp::Invert),
                (coords[1], 2, StencilOp::Keep),
            ]
        );
        assert_eq!(cmds.commands().last(), Some(&LineCommand::ResetClippingMasks));
        assert_eq!(painter.resets, 1);
    }

    #[test]
    fn next_layer_sees_fresh_clip_masks() {
        let coords = [TileId::new(4, 0, 0), TileId::new(4, 1, 0)];
        let mut src = source(&coords);
        let mut painter = FakePainter::default();
        let mut renderer = LineRenderer::new();

        render(&mut renderer, &mut painter, &mut src, &translucent(LAYER, 0.5), &coords);
        assert!(painter.masks_fresh());

        let cmds = render(&mut renderer, &mut painter, &mut src, &LineLayerConfig::new(LAYER), &coords);
        // Masks are redrawn for the second layer, starting again at reference 1.
        assert_eq!(painter.masks_drawn, 4);
        assert_eq!(cmds.draw_calls().next().unwrap().stencil, FakePainter::clip_mode(1));
    }

    #[test]
    fn terrain_overlap_keeps_single_pass() {
        let coords = [TileId::new(4, 0, 0)];
        let mut src = source(&coords);
        let mut painter = FakePainter::default();
        let frame = FrameState {
            terrain: Some(TerrainState { overlap_stencil: OverlapStencilType::Clip }),
            ..FrameState::default()
        };
        let mut cmds = CommandList::new();
        LineRenderer::new().render_layer(&frame, &mut painter, &mut src, &translucent(LAYER, 0.5), &coords, &mut cmds);

        assert_eq!(thresholds(&cmds), vec![0.0]);
        assert_eq!(painter.resets, 0);
    }

    #[test]
    fn terrain_zero_reference_clears_around_layer() {
        let coords = [TileId::new(4, 0, 0)];
        let mut src = source(&coords);
        let mut painter = FakePainter::with_zero_refs();
        let frame = FrameState { terrain: Some(TerrainState::default()), ..FrameState::default() };
        let mut cmds = CommandList::new();
        LineRenderer::new().render_layer(&frame, &mut painter, &mut src, &translucent(LAYER, 0.5), &coords, &mut cmds);

        let clears: Vec<_> = cmds
            .iter()
            .enumerate()
            .filter(|(_, c)| matches!(c, LineCommand::ClearStencil { value: 0 }))
            .map(|(i, _)| i)
            .collect();
        let first_draw = cmds.iter().position(|c| matches!(c, LineCommand::Draw(_))).unwrap();
        assert_eq!(clears.len(), 2);
        assert!(clears[0] < first_draw);
        assert_eq!(clears[1], cmds.len() - 1);
    }

    // ── gradients ─────────────────────────────────────────────────────────

    #[test]
    fn gradient_uploads_only_on_version_change() {
        let coord = TileId::new(14, 5, 5);
        let mut src = source(&[coord]);
        let mut painter = FakePainter::default();
        let mut renderer = LineRenderer::new();

        let first = render(&mut renderer, &mut painter, &mut src, &gradient_layer(1), &[coord]);
        assert_eq!(first.upload_count(), 1);

        let same = render(&mut renderer, &mut painter, &mut src, &gradient_layer(1), &[coord]);
        assert_eq!(same.upload_count(), 0);
        assert!(same.iter().any(|c| matches!(c, LineCommand::BindTexture { unit: TextureUnit::Ramp, .. })));

        let bumped = render(&mut renderer, &mut painter, &mut src, &gradient_layer(2), &[coord]);
        let update = bumped
            .iter()
            .position(|c| matches!(c, LineCommand::UpdateTexture { .. }))
            .unwrap();
        let draw = bumped.iter().position(|c| matches!(c, LineCommand::Draw(_))).unwrap();
        assert_eq!(bumped.upload_count(), 1);
        assert!(update < draw);
    }

    #[test]
    fn rebuilt_bucket_gets_matching_ramp_rows() {
        let coord = TileId::new(14, 5, 5);
        let layer_id = LayerId::from(LAYER);
        let mut src = TileCache::new(14);
        let mut tile = crate::tile::Tile::new(coord);
        tile.insert_bucket(layer_id.clone(), bucket_with_clips(1, vec![LineClip { start: 0.0, end: 1.0 }]));
        src.insert(tile);
        let mut painter = FakePainter::default();
        let mut renderer = LineRenderer::new();

        let first = render(&mut renderer, &mut painter, &mut src, &gradient_layer(1), &[coord]);
        assert_eq!(ramp_uploads(&first), vec![(256, 1)]);

        let clips = vec![
            LineClip { start: 0.0, end: 0.2 },
            LineClip { start: 0.4, end: 0.6 },
            LineClip { start: 0.8, end: 1.0 },
        ];
        src.tile_mut(&coord).unwrap().insert_bucket(layer_id, bucket_with_clips(2, clips));

        let second = render(&mut renderer, &mut painter, &mut src, &gradient_layer(1), &[coord]);
        assert_eq!(ramp_uploads(&second), vec![(256, 3)]);
        assert!(second.iter().any(|c| matches!(c, LineCommand::UpdateTexture { .. })));
        assert_eq!(second.draw_calls().next().unwrap().uniforms.image_height, 3.0);
    }

    #[test]
    fn evicted_tiles_release_ramps_on_next_layer() {
        let kept = TileId::new(14, 5, 5);
        let evicted = TileId::new(14, 6, 5);
        let mut src = source(&[kept, evicted]);
        let mut renderer = LineRenderer::new();
        let first = render(&mut renderer, &mut FakePainter::default(), &mut src, &gradient_layer(0), &[kept, evicted]);
        let evicted_ramp = first
            .iter()
            .filter_map(|c| match c {
                LineCommand::CreateTexture { texture, .. } => Some(*texture),
                _ => None,
            })
            .nth(1)
            .unwrap();

        src.remove(&evicted);
        let cmds = render(&mut renderer, &mut FakePainter::default(), &mut src, &gradient_layer(0), &[kept]);

        assert_eq!(cmds.commands().first(), Some(&LineCommand::DestroyTexture { texture: evicted_ramp }));
        assert!(renderer.ramps().state(&LayerId::from(LAYER), &evicted).is_none());
        assert!(renderer.ramps().state(&LayerId::from(LAYER), &kept).is_some());
    }

    #[test]
    fn stepped_ramp_sized_from_tile_and_frame() {
        let coord = TileId::new(14, 2, 3);
        for (max_texture_size, width) in [(1 << 20, 65536), (8192, 8192)] {
            let mut src = TileCache::new(14);
            let mut tile = crate::tile::Tile::new(coord);
            tile.insert_bucket(
                LayerId::from(LAYER),
                bucket_with_clips(1, Vec::new()).with_max_line_length(10.0 * EXTENT),
            );
            src.insert(tile);
            let frame = FrameState { max_zoom: 16, max_texture_size, ..FrameState::default() };

            let mut cmds = CommandList::new();
            LineRenderer::new().render_layer(
                &frame,
                &mut FakePainter::default(),
                &mut src,
                &stepped_gradient_layer(0),
                &[coord],
                &mut cmds,
            );

            assert_eq!(ramp_uploads(&cmds), vec![(width, 1)]);
            let bind = cmds.iter().find_map(|c| match c {
                LineCommand::BindTexture { unit: TextureUnit::Ramp, filter, wrap, .. } => Some((*filter, *wrap)),
                _ => None,
            });
            assert_eq!(bind, Some((TextureFilter::Nearest, TextureWrap::ClampToEdge)));
        }
    }

    #[test]
    fn removing_layer_releases_ramps() {
        let coord = TileId::new(14, 5, 5);
        let mut src = source(&[coord]);
        let mut renderer = LineRenderer::new();
        render(&mut renderer, &mut FakePainter::default(), &mut src, &gradient_layer(0), &[coord]);

        let mut cmds = CommandList::new();
        renderer.retain_layers(&[LayerId::from("other")], &mut cmds);
        assert!(matches!(cmds.commands(), [LineCommand::DestroyTexture { .. }]));
        assert_eq!(renderer.ramps().layer_count(), 0);
    }
}
