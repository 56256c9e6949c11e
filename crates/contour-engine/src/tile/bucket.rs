use std::sync::atomic::{AtomicU64, Ordering};

use crate::style::Crossfade;

use super::atlas::AtlasRect;

/// Handle of a vertex/index buffer pair uploaded to the GPU layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryId(pub u64);

/// Identity of one built bucket.
///
/// Every [`LineBucket::new`] draws a fresh value, so a tile reloaded under the
/// same id carries buckets that never compare equal to the ones they replace.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketGeneration(u64);

static NEXT_BUCKET_GENERATION: AtomicU64 = AtomicU64::new(1);

impl BucketGeneration {
    fn allocate() -> Self {
        Self(NEXT_BUCKET_GENERATION.fetch_add(1, Ordering::Relaxed))
    }
}

/// A contiguous run of indexed triangles sharing one vertex base.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Segment {
    pub vertex_offset: u32,
    pub index_offset: u32,
    pub index_count: u32,
}

/// Sub-range of line progress covered by one disconnected line run.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LineClip {
    pub start: f32,
    pub end: f32,
}

/// Constant atlas positions pushed for a whole draw instead of per-vertex data.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PatternPositions {
    pub from: AtlasRect,
    pub to: AtlasRect,
}

/// Per-layer program state owned by a bucket.
///
/// Holds the values the renderer pushes ahead of a draw: constant
/// pattern/dash atlas positions and the crossfade used for per-vertex
/// pattern attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgramConfiguration {
    constant_positions: Option<PatternPositions>,
    crossfade: Option<Crossfade>,
    paint_buffer_updates: u64,
}

impl ProgramConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_constant_pattern_positions(&mut self, to: AtlasRect, from: AtlasRect) {
        self.constant_positions = Some(PatternPositions { from, to });
    }

    #[inline]
    pub fn constant_pattern_positions(&self) -> Option<PatternPositions> {
        self.constant_positions
    }

    /// Refreshes per-vertex crossfade attributes for the current crossfade.
    pub fn update_paint_buffers(&mut self, crossfade: Crossfade) {
        self.crossfade = Some(crossfade);
        self.paint_buffer_updates = self.paint_buffer_updates.wrapping_add(1);
    }

    #[inline]
    pub fn crossfade(&self) -> Option<Crossfade> {
        self.crossfade
    }

    /// Number of paint buffer refreshes so far.
    #[inline]
    pub fn paint_buffer_updates(&self) -> u64 {
        self.paint_buffer_updates
    }
}

/// GPU-ready line geometry of one layer on one tile.
///
/// Buckets are rebuilt, not edited, when tile data changes: state derived from
/// a bucket (gradient ramps) is keyed on [`LineBucket::generation`].
#[derive(Debug, Clone)]
pub struct LineBucket {
    generation: BucketGeneration,
    pub geometry: GeometryId,
    pub segments: Vec<Segment>,
    /// Progress sub-ranges of disconnected line runs; one gradient row each.
    pub line_clips: Vec<LineClip>,
    /// Longest line in tile units (`EXTENT` per tile edge).
    pub max_line_length: f32,
    pub program_configuration: ProgramConfiguration,
}

impl LineBucket {
    pub fn new(geometry: GeometryId, segments: Vec<Segment>) -> Self {
        Self {
            generation: BucketGeneration::allocate(),
            geometry,
            segments,
            line_clips: Vec::new(),
            max_line_length: 0.0,
            program_configuration: ProgramConfiguration::new(),
        }
    }

    pub fn with_line_clips(mut self, clips: Vec<LineClip>) -> Self {
        self.line_clips = clips;
        self
    }

    pub fn with_max_line_length(mut self, length: f32) -> Self {
        self.max_line_length = length;
        self
    }

    #[inline]
    pub fn generation(&self) -> BucketGeneration {
        self.generation
    }

    /// Total number of indices over all segments.
    pub fn index_count(&self) -> u32 {
        self.segments.iter().map(|s| s.index_count).sum()
    }
}
