use std::collections::HashMap;

use crate::style::{DashArray, ImageId, LineCap};

/// Rectangle of an atlas entry in texels: top-left and bottom-right corners.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct AtlasRect {
    pub tl: [u16; 2],
    pub br: [u16; 2],
}

impl AtlasRect {
    pub const fn new(tl: [u16; 2], br: [u16; 2]) -> Self {
        Self { tl, br }
    }

    /// `[tl.x, tl.y, br.x, br.y]` as floats, the layout shaders expect.
    #[inline]
    pub fn to_f32x4(self) -> [f32; 4] {
        [self.tl[0] as f32, self.tl[1] as f32, self.br[0] as f32, self.br[1] as f32]
    }
}

/// Packed pattern images of one tile, addressed by image id.
#[derive(Debug, Clone, Default)]
pub struct ImageAtlas {
    pub size: [u32; 2],
    pattern_positions: HashMap<ImageId, AtlasRect>,
}

impl ImageAtlas {
    pub fn new(size: [u32; 2]) -> Self {
        Self { size, pattern_positions: HashMap::new() }
    }

    pub fn insert_pattern(&mut self, id: impl Into<ImageId>, rect: AtlasRect) {
        self.pattern_positions.insert(id.into(), rect);
    }

    #[inline]
    pub fn pattern_position(&self, id: &ImageId) -> Option<AtlasRect> {
        self.pattern_positions.get(id).copied()
    }
}

/// Lookup key for a rasterized dash: exact dash lengths plus whether caps are round.
///
/// Butt and square caps rasterize identically, so they share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DashKey {
    lengths: Vec<u32>,
    round: bool,
}

impl DashKey {
    pub fn new(dash: &DashArray, cap: LineCap) -> Self {
        Self {
            lengths: dash.lengths().iter().map(|l| l.to_bits()).collect(),
            round: cap == LineCap::Round,
        }
    }
}

/// Rasterized dash patterns of one tile, one row range per dash.
#[derive(Debug, Clone, Default)]
pub struct LineAtlas {
    pub size: [u32; 2],
    dashes: HashMap<DashKey, AtlasRect>,
}

impl LineAtlas {
    pub fn new(size: [u32; 2]) -> Self {
        Self { size, dashes: HashMap::new() }
    }

    pub fn insert_dash(&mut self, dash: &DashArray, cap: LineCap, rect: AtlasRect) {
        self.dashes.insert(DashKey::new(dash, cap), rect);
    }

    #[inline]
    pub fn get_dash(&self, dash: &DashArray, cap: LineCap) -> Option<AtlasRect> {
        self.dashes.get(&DashKey::new(dash, cap)).copied()
    }
}
