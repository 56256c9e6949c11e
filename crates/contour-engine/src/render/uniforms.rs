use bytemuck::{Pod, Zeroable};

use crate::style::{Crossfade, LineLayerConfig};
use crate::tile::{EXTENT, PatternPositions, TILE_SIZE, TileId};

use super::frame::FrameState;

/// Paint values below zero tell the shader to read the per-vertex attribute instead.
pub const DATA_DRIVEN: f32 = -1.0;

/// Uniform block shared by the `line` and `linePattern` programs (176 bytes).
///
///  offset   0  matrix                   mat4x4<f32>
///  offset  64  color                    vec4<f32>
///  offset  80  pattern_from             vec4<f32>  atlas rect tl.xy, br.xy
///  offset  96  pattern_to               vec4<f32>
///  offset 112  units_to_pixels          vec2<f32>
///  offset 120  texsize                  vec2<f32>
///  offset 128  scale                    vec4<f32>  tile ratio, from scale, to scale, -
///  offset 144  ratio, device_pixel_ratio, mix, alpha_discard_threshold
///  offset 160  image_height, opacity, width, blur
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct LineUniforms {
    pub matrix: [f32; 16],
    pub color: [f32; 4],
    pub pattern_from: [f32; 4],
    pub pattern_to: [f32; 4],
    pub units_to_pixels: [f32; 2],
    pub texsize: [f32; 2],
    pub scale: [f32; 4],
    pub ratio: f32,
    pub device_pixel_ratio: f32,
    pub mix: f32,
    pub alpha_discard_threshold: f32,
    /// Number of gradient rows (one per line clip).
    pub image_height: f32,
    pub opacity: f32,
    pub width: f32,
    pub blur: f32,
}

/// `1 / pixels_to_tile_units(tile, 1, zoom)`: screen pixels per tile unit.
pub fn tile_ratio(tile: &TileId, zoom: f32) -> f32 {
    let scale = 2f32.powf(zoom - tile.overscaled_z as f32);
    TILE_SIZE * scale / EXTENT
}

/// Inputs shared by both uniform builders.
#[derive(Debug, Copy, Clone)]
pub struct UniformInputs<'a> {
    pub frame: &'a FrameState,
    pub tile: &'a TileId,
    pub layer: &'a LineLayerConfig,
    pub crossfade: Crossfade,
    pub matrix: [f32; 16],
    pub constant_positions: Option<PatternPositions>,
}

fn base_uniforms(inputs: &UniformInputs<'_>) -> LineUniforms {
    let layer = inputs.layer;
    let (from, to) = inputs
        .constant_positions
        .map(|p| (p.from.to_f32x4(), p.to.to_f32x4()))
        .unwrap_or(([0.0; 4], [0.0; 4]));

    LineUniforms {
        matrix: inputs.matrix,
        color: layer.color.constant().map_or([DATA_DRIVEN; 4], |c| c.to_array()),
        pattern_from: from,
        pattern_to: to,
        units_to_pixels: inputs.frame.units_to_pixels(),
        texsize: [0.0, 0.0],
        scale: [0.0; 4],
        ratio: tile_ratio(inputs.tile, inputs.frame.zoom),
        device_pixel_ratio: inputs.frame.pixel_ratio,
        mix: inputs.crossfade.t,
        alpha_discard_threshold: 0.0,
        image_height: 0.0,
        opacity: layer.opacity.constant_or(DATA_DRIVEN),
        width: layer.width.constant_or(DATA_DRIVEN),
        blur: layer.blur.constant_or(DATA_DRIVEN),
    }
}

/// Uniforms for the `line` program.
///
/// `line_atlas_size` is the dash atlas size when a dash array is active.
pub fn line_uniform_values(
    inputs: &UniformInputs<'_>,
    line_atlas_size: Option<[u32; 2]>,
    line_clips: usize,
) -> LineUniforms {
    let mut u = base_uniforms(inputs);
    if inputs.layer.has_dash() {
        if let Some([w, h]) = line_atlas_size {
            u.texsize = [w as f32, h as f32];
        }
        let tile_zoom = inputs.frame.zoom.floor();
        u.scale = [
            tile_ratio(inputs.tile, tile_zoom),
            inputs.crossfade.from_scale,
            inputs.crossfade.to_scale,
            0.0,
        ];
    }
    u.image_height = line_clips as f32;
    u
}

/// Uniforms for the `linePattern` program.
pub fn line_pattern_uniform_values(
    inputs: &UniformInputs<'_>,
    image_atlas_size: Option<[u32; 2]>,
) -> LineUniforms {
    let mut u = base_uniforms(inputs);
    if let Some([w, h]) = image_atlas_size {
        u.texsize = [w as f32, h as f32];
    }
    let tile_zoom = inputs.frame.zoom.floor();
    u.scale = [
        tile_ratio(inputs.tile, tile_zoom),
        inputs.crossfade.from_scale,
        inputs.crossfade.to_scale,
        0.0,
    ];
    u
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::PaintValue;

    fn inputs<'a>(frame: &'a FrameState, tile: &'a TileId, layer: &'a LineLayerConfig) -> UniformInputs<'a> {
        UniformInputs {
            frame,
            tile,
            layer,
            crossfade: Crossfade { from_scale: 2.0, to_scale: 1.0, t: 0.25 },
            matrix: [0.0; 16],
            constant_positions: None,
        }
    }

    #[test]
    fn block_size_matches_shader_layout() {
        assert_eq!(std::mem::size_of::<LineUniforms>(), 176);
    }

    #[test]
    fn ratio_at_native_zoom() {
        let tile = TileId::new(10, 0, 0);
        assert_eq!(tile_ratio(&tile, 10.0), TILE_SIZE / EXTENT);
        assert_eq!(tile_ratio(&tile, 11.0), 2.0 * TILE_SIZE / EXTENT);
    }

    #[test]
    fn clip_count_becomes_image_height() {
        let frame = FrameState { zoom: 10.0, ..FrameState::default() };
        let tile = TileId::new(10, 0, 0);
        let layer = LineLayerConfig::new("roads");
        let u = line_uniform_values(&inputs(&frame, &tile, &layer), None, 3);
        assert_eq!(u.image_height, 3.0);
        assert_eq!(u.alpha_discard_threshold, 0.0);
        assert_eq!(u.texsize, [0.0, 0.0]);
    }

    #[test]
    fn data_driven_values_use_sentinel() {
        let frame = FrameState::default();
        let tile = TileId::new(0, 0, 0);
        let mut layer = LineLayerConfig::new("roads");
        layer.width = PaintValue::DataDriven;
        layer.color = PaintValue::DataDriven;
        let u = line_uniform_values(&inputs(&frame, &tile, &layer), None, 0);
        assert_eq!(u.width, DATA_DRIVEN);
        assert_eq!(u.color, [DATA_DRIVEN; 4]);
        assert_eq!(u.opacity, 1.0);
    }

    #[test]
    fn pattern_uniforms_carry_crossfade() {
        let frame = FrameState { zoom: 10.5, ..FrameState::default() };
        let tile = TileId::new(10, 0, 0);
        let layer = LineLayerConfig::new("trails");
        let u = line_pattern_uniform_values(&inputs(&frame, &tile, &layer), Some([64, 32]));
        assert_eq!(u.texsize, [64.0, 32.0]);
        assert_eq!(u.scale[1..3], [2.0, 1.0]);
        assert_eq!(u.mix, 0.25);
    }
}
