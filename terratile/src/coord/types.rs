//! Tile key and tiling profile definitions

use std::fmt;

use thiserror::Error;

/// Deepest level of detail a key may address.
///
/// Bounded so that `base_tiles << level` never overflows a `u32`.
pub const MAX_LEVEL: u32 = 30;

/// Geographic bounding rectangle in profile units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Extent {
    /// Creates a new extent from its corner coordinates.
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Width of the extent in profile units.
    #[inline]
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    /// Height of the extent in profile units.
    #[inline]
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }
}

/// Tiling scheme the quadtree is built over.
///
/// A closed set of schemes; each defines the world extent and the tile
/// grid dimensions at level 0. Every deeper level doubles both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TilingProfile {
    /// Equirectangular lat/lon, 2×1 tiles at level 0.
    GlobalGeodetic,
    /// Spherical Mercator, 1×1 tiles at level 0.
    GlobalMercator,
}

/// Half the Web Mercator world width in meters.
const MERCATOR_MAX: f64 = 20_037_508.342_789_244;

impl TilingProfile {
    /// The full world extent covered by this profile.
    pub fn extent(&self) -> Extent {
        match self {
            TilingProfile::GlobalGeodetic => Extent::new(-180.0, -90.0, 180.0, 90.0),
            TilingProfile::GlobalMercator => {
                Extent::new(-MERCATOR_MAX, -MERCATOR_MAX, MERCATOR_MAX, MERCATOR_MAX)
            }
        }
    }

    /// Tile grid dimensions at level 0.
    pub fn base_tiles(&self) -> (u32, u32) {
        match self {
            TilingProfile::GlobalGeodetic => (2, 1),
            TilingProfile::GlobalMercator => (1, 1),
        }
    }

    /// Tile grid dimensions at the given level.
    pub fn num_tiles(&self, level: u32) -> (u32, u32) {
        let (bx, by) = self.base_tiles();
        (bx << level, by << level)
    }
}

/// Errors that can occur constructing or deriving tile keys.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// Tile coordinates outside the grid for the requested level
    #[error("tile ({x}, {y}) out of range at level {level}")]
    OutOfRange { level: u32, x: u32, y: u32 },

    /// Level deeper than the supported maximum
    #[error("level {0} exceeds maximum of {MAX_LEVEL}")]
    LevelTooDeep(u32),
}

/// Quadtree tile address: level of detail plus grid coordinates.
///
/// `x` runs west to east, `y` runs north to south (row 0 at the north
/// edge). Immutable value type; derive parents, children, and neighbors
/// rather than mutating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileKey {
    level: u32,
    x: u32,
    y: u32,
    profile: TilingProfile,
}

impl TileKey {
    /// Creates a key, validating the coordinates against the profile grid.
    pub fn new(level: u32, x: u32, y: u32, profile: TilingProfile) -> Result<Self, KeyError> {
        if level > MAX_LEVEL {
            return Err(KeyError::LevelTooDeep(level));
        }
        let (tiles_x, tiles_y) = profile.num_tiles(level);
        if x >= tiles_x || y >= tiles_y {
            return Err(KeyError::OutOfRange { level, x, y });
        }
        Ok(Self {
            level,
            x,
            y,
            profile,
        })
    }

    /// Level of detail.
    #[inline]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Column, west to east.
    #[inline]
    pub fn x(&self) -> u32 {
        self.x
    }

    /// Row, north to south.
    #[inline]
    pub fn y(&self) -> u32 {
        self.y
    }

    /// The tiling profile this key belongs to.
    #[inline]
    pub fn profile(&self) -> TilingProfile {
        self.profile
    }

    /// Geographic extent of this tile.
    pub fn extent(&self) -> Extent {
        let world = self.profile.extent();
        let (tiles_x, tiles_y) = self.profile.num_tiles(self.level);
        let tile_w = world.width() / tiles_x as f64;
        let tile_h = world.height() / tiles_y as f64;
        let xmin = world.xmin + self.x as f64 * tile_w;
        // Row 0 hugs the north edge.
        let ymax = world.ymax - self.y as f64 * tile_h;
        Extent::new(xmin, ymax - tile_h, xmin + tile_w, ymax)
    }

    /// The coarser-level tile spatially containing this one.
    ///
    /// Returns `None` at level 0.
    pub fn parent(&self) -> Option<TileKey> {
        if self.level == 0 {
            return None;
        }
        Some(TileKey {
            level: self.level - 1,
            x: self.x / 2,
            y: self.y / 2,
            profile: self.profile,
        })
    }

    /// The child tile one level deeper, at quadrant offset `(i, j)`.
    ///
    /// `i` and `j` must each be 0 or 1.
    pub fn child(&self, i: u32, j: u32) -> Result<TileKey, KeyError> {
        debug_assert!(i < 2 && j < 2, "child offsets must be 0 or 1");
        TileKey::new(
            self.level + 1,
            self.x * 2 + i,
            self.y * 2 + j,
            self.profile,
        )
    }

    /// The tile offset by `(dx, dy)` grid steps at the same level.
    ///
    /// The x axis wraps around the antimeridian; stepping past the
    /// north or south edge yields `None`.
    pub fn neighbor(&self, dx: i64, dy: i64) -> Option<TileKey> {
        let (tiles_x, tiles_y) = self.profile.num_tiles(self.level);
        let x = (self.x as i64 + dx).rem_euclid(tiles_x as i64) as u32;
        let y = self.y as i64 + dy;
        if y < 0 || y >= tiles_y as i64 {
            return None;
        }
        Some(TileKey {
            level: self.level,
            x,
            y: y as u32,
            profile: self.profile,
        })
    }

    /// Lazy chain of this key followed by each successive ancestor.
    ///
    /// Finite and restartable; consumers walk it until a source yields
    /// data or the chain ends at the root.
    pub fn ancestors(&self) -> Ancestors {
        Ancestors { next: Some(*self) }
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.level, self.x, self.y)
    }
}

/// Iterator from a key up through its ancestor chain to the root.
#[derive(Debug, Clone)]
pub struct Ancestors {
    next: Option<TileKey>,
}

impl Iterator for Ancestors {
    type Item = TileKey;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent();
        Some(current)
    }
}
