use crate::style::{Crossfade, LineLayerConfig, PaintValue};
use crate::tile::{ProgramConfiguration, TileAtlases};

use super::command::{CommandList, LineCommand};
use super::state::{TextureFilter, TextureUnit, TextureWrap};

/// Resolves and binds the dash or pattern atlas of a tile for one layer.
///
/// Pattern wins over dash: a layer with both draws the pattern only.
/// The caller skips tiles whose pattern images are not loaded yet, so the
/// atlases seen here are complete; lookups that still miss leave the
/// per-vertex default positions in place.
#[derive(Debug, Default, Copy, Clone)]
pub struct AtlasBinder;

impl AtlasBinder {
    /// Pushes constant atlas positions into `config` and binds the atlas texture.
    pub fn bind_pattern_or_dash(
        atlases: &TileAtlases<'_>,
        layer: &LineLayerConfig,
        crossfade: Crossfade,
        config: &mut ProgramConfiguration,
        commands: &mut CommandList,
    ) {
        Self::set_constant_positions(atlases, layer, config);
        Self::bind_textures(atlases, layer, crossfade, config, commands);
    }

    /// Looks up constant `{from, to}` entries. Both must hit for positions to be set.
    pub fn set_constant_positions(
        atlases: &TileAtlases<'_>,
        layer: &LineLayerConfig,
        config: &mut ProgramConfiguration,
    ) {
        if let (Some(PaintValue::Constant(pattern)), Some(atlas)) = (&layer.pattern, atlases.image_atlas) {
            let to = atlas.pattern_position(&pattern.to);
            let from = atlas.pattern_position(&pattern.from);
            if let (Some(to), Some(from)) = (to, from) {
                config.set_constant_pattern_positions(to, from);
            }
        }

        if layer.has_pattern() {
            return;
        }
        let Some(PaintValue::Constant(dash)) = &layer.dasharray else { return };
        let Some(cap) = layer.cap.constant().copied() else { return };
        let Some(atlas) = atlases.line_atlas else { return };

        let to = atlas.get_dash(&dash.to, cap);
        let from = atlas.get_dash(&dash.from, cap);
        if let (Some(to), Some(from)) = (to, from) {
            config.set_constant_pattern_positions(to, from);
        }
    }

    /// Binds the dash (repeating along the line) or pattern atlas to the atlas
    /// unit and refreshes crossfade attributes.
    pub fn bind_textures(
        atlases: &TileAtlases<'_>,
        layer: &LineLayerConfig,
        crossfade: Crossfade,
        config: &mut ProgramConfiguration,
        commands: &mut CommandList,
    ) {
        let (texture, wrap) = if layer.has_pattern() {
            (atlases.image_atlas_texture, TextureWrap::ClampToEdge)
        } else if layer.has_dash() {
            (atlases.line_atlas_texture, TextureWrap::Repeat)
        } else {
            return;
        };

        let Some(texture) = texture else {
            log::trace!("line layer `{}`: atlas texture not uploaded; using defaults", layer.id);
            return;
        };

        commands.push(LineCommand::BindTexture {
            unit: TextureUnit::Atlas,
            texture,
            filter: TextureFilter::Linear,
            wrap,
        });
        config.update_paint_buffers(crossfade);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::TextureId;
    use crate::style::{CrossFaded, DashArray, ImageId, LineCap};
    use crate::tile::{AtlasRect, ImageAtlas, LineAtlas, PatternPositions};

    const A: AtlasRect = AtlasRect::new([0, 0], [8, 8]);
    const B: AtlasRect = AtlasRect::new([8, 0], [16, 8]);

    fn pattern_layer(from: &str, to: &str) -> LineLayerConfig {
        let mut layer = LineLayerConfig::new("trails");
        layer.pattern = Some(PaintValue::Constant(CrossFaded::new(ImageId::from(from), ImageId::from(to))));
        layer
    }

    fn dash_layer(cap: LineCap) -> LineLayerConfig {
        let mut layer = LineLayerConfig::new("borders");
        layer.dasharray = Some(PaintValue::Constant(CrossFaded::new(
            DashArray::new(vec![1.0, 1.0]),
            DashArray::new(vec![2.0, 1.0]),
        )));
        layer.cap = PaintValue::Constant(cap);
        layer
    }

    fn image_atlas() -> ImageAtlas {
        let mut atlas = ImageAtlas::new([16, 8]);
        atlas.insert_pattern("a", A);
        atlas.insert_pattern("b", B);
        atlas
    }

    fn line_atlas(cap: LineCap) -> LineAtlas {
        let mut atlas = LineAtlas::new([512, 16]);
        atlas.insert_dash(&DashArray::new(vec![1.0, 1.0]), cap, A);
        atlas.insert_dash(&DashArray::new(vec![2.0, 1.0]), cap, B);
        atlas
    }

    fn atlases<'a>(image: Option<&'a ImageAtlas>, line: Option<&'a LineAtlas>) -> TileAtlases<'a> {
        TileAtlases {
            image_atlas: image,
            image_atlas_texture: image.map(|_| TextureId::allocate()),
            line_atlas: line,
            line_atlas_texture: line.map(|_| TextureId::allocate()),
        }
    }

    #[test]
    fn constant_pattern_positions_resolved() {
        let atlas = image_atlas();
        let mut config = ProgramConfiguration::new();
        AtlasBinder::set_constant_positions(&atlases(Some(&atlas), None), &pattern_layer("a", "b"), &mut config);
        assert_eq!(config.constant_pattern_positions(), Some(PatternPositions { from: A, to: B }));
    }

    #[test]
    fn partial_pattern_miss_sets_nothing() {
        let atlas = image_atlas();
        let mut config = ProgramConfiguration::new();
        AtlasBinder::set_constant_positions(&atlases(Some(&atlas), None), &pattern_layer("a", "missing"), &mut config);
        assert_eq!(config.constant_pattern_positions(), None);
    }

    #[test]
    fn dash_positions_keyed_by_cap() {
        let atlas = line_atlas(LineCap::Round);
        let mut config = ProgramConfiguration::new();
        AtlasBinder::set_constant_positions(&atlases(None, Some(&atlas)), &dash_layer(LineCap::Butt), &mut config);
        assert_eq!(config.constant_pattern_positions(), None);

        AtlasBinder::set_constant_positions(&atlases(None, Some(&atlas)), &dash_layer(LineCap::Round), &mut config);
        assert_eq!(config.constant_pattern_positions(), Some(PatternPositions { from: A, to: B }));
    }

    #[test]
    fn dash_binds_repeating_atlas() {
        let atlas = line_atlas(LineCap::Butt);
        let tile_atlases = atlases(None, Some(&atlas));
        let mut config = ProgramConfiguration::new();
        let mut cmds = CommandList::new();
        let crossfade = Crossfade { from_scale: 1.0, to_scale: 2.0, t: 0.5 };

        AtlasBinder::bind_pattern_or_dash(&tile_atlases, &dash_layer(LineCap::Butt), crossfade, &mut config, &mut cmds);

        assert_eq!(
            cmds.commands(),
            &[LineCommand::BindTexture {
                unit: TextureUnit::Atlas,
                texture: tile_atlases.line_atlas_texture.unwrap(),
                filter: TextureFilter::Linear,
                wrap: TextureWrap::Repeat,
            }]
        );
        assert_eq!(config.crossfade(), Some(crossfade));
    }

    #[test]
    fn pattern_binds_clamped_atlas_and_ignores_dash() {
        let image = image_atlas();
        let line = line_atlas(LineCap::Butt);
        let tile_atlases = atlases(Some(&image), Some(&line));
        let mut layer = pattern_layer("a", "b");
        layer.dasharray = dash_layer(LineCap::Butt).dasharray;
        let mut config = ProgramConfiguration::new();
        let mut cmds = CommandList::new();

        AtlasBinder::bind_pattern_or_dash(&tile_atlases, &layer, Crossfade::default(), &mut config, &mut cmds);

        assert_eq!(cmds.len(), 1);
        assert!(matches!(
            cmds.commands()[0],
            LineCommand::BindTexture { wrap: TextureWrap::ClampToEdge, texture, .. }
                if Some(texture) == tile_atlases.image_atlas_texture
        ));
        assert_eq!(config.paint_buffer_updates(), 1);
    }

    #[test]
    fn plain_layer_binds_nothing() {
        let mut config = ProgramConfiguration::new();
        let mut cmds = CommandList::new();
        let layer = LineLayerConfig::new("roads");
        AtlasBinder::bind_pattern_or_dash(&atlases(None, None), &layer, Crossfade::default(), &mut config, &mut cmds);
        assert!(cmds.is_empty());
        assert_eq!(config, ProgramConfiguration::new());
    }
}
