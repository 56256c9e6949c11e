use std::fmt;

/// Tile address in the source's own zoom pyramid.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalTileId {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

/// A tile as placed on screen: canonical address plus the zoom it is displayed
/// at (`overscaled_z >= canonical.z` when the tile is stretched past the
/// source's max zoom) and its world copy (`wrap`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId {
    pub overscaled_z: u8,
    pub wrap: i32,
    pub canonical: CanonicalTileId,
}

impl TileId {
    /// A tile displayed at its native zoom in the primary world copy.
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { overscaled_z: z, wrap: 0, canonical: CanonicalTileId { z, x, y } }
    }

    /// Same canonical tile displayed at `overscaled_z`.
    pub fn overscaled(self, overscaled_z: u8) -> Self {
        Self { overscaled_z: overscaled_z.max(self.canonical.z), ..self }
    }

    #[inline]
    pub fn is_overscaled(&self) -> bool {
        self.overscaled_z > self.canonical.z
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.canonical;
        write!(f, "{}/{}/{}", c.z, c.x, c.y)?;
        if self.is_overscaled() {
            write!(f, "@{}", self.overscaled_z)?;
        }
        if self.wrap != 0 {
            write!(f, "~{}", self.wrap)?;
        }
        Ok(())
    }
}
