//! Pyramid levels and viewer levels of detail.
//!
//! Every per-level constant lives in one static table keyed by [`Level`], so
//! call sites ask the level for its geometry instead of branching on it.

use crate::filename::FilenameCodec;
use crate::geo;
use crate::{DemError, Result};
use std::fmt;
use std::str::FromStr;

/// One tier of the elevation pyramid, finest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Level {
    /// Raw 3 arc-second SRTM input, 1 degree tiles.
    Srtm,
    /// 3.75 degree tiles read by viewer LODs 9-13.
    Fine,
    /// 15 degree tiles read by viewer LODs 4-8.
    Medium,
    /// 60 degree tiles read by viewer LODs 0-3.
    Coarse,
}

/// Constants describing one level.
#[derive(Debug)]
pub struct LevelSpec {
    /// Short name used on the command line and in logs.
    pub label: &'static str,
    /// Angular span of one tile, in degrees.
    pub cell_size_deg: f64,
    /// Samples per tile side.
    pub tile_pixels: usize,
    /// File naming scheme.
    pub codec: FilenameCodec,
    /// Level this one is built from (`None` for input data).
    pub built_from: Option<Level>,
}

const LEVELS: [LevelSpec; 4] = [
    LevelSpec {
        label: "srtm",
        cell_size_deg: 1.0,
        tile_pixels: 1201,
        codec: FilenameCodec::RawSource,
        built_from: None,
    },
    LevelSpec {
        label: "l09-l13",
        cell_size_deg: 3.75,
        tile_pixels: 4097,
        codec: FilenameCodec::Pyramid,
        built_from: Some(Level::Srtm),
    },
    LevelSpec {
        label: "l04-l08",
        cell_size_deg: 15.0,
        tile_pixels: 513,
        codec: FilenameCodec::Pyramid,
        built_from: Some(Level::Fine),
    },
    LevelSpec {
        label: "l00-l03",
        cell_size_deg: 60.0,
        tile_pixels: 65,
        codec: FilenameCodec::Pyramid,
        built_from: Some(Level::Medium),
    },
];

impl Level {
    /// All levels, finest first.
    pub const ALL: [Level; 4] = [Level::Srtm, Level::Fine, Level::Medium, Level::Coarse];

    /// Constants for this level.
    pub fn spec(self) -> &'static LevelSpec {
        &LEVELS[self as usize]
    }

    /// Short name, e.g. `l09-l13`.
    pub fn label(self) -> &'static str {
        self.spec().label
    }

    /// Tile span in degrees.
    pub fn cell_size(self) -> f64 {
        self.spec().cell_size_deg
    }

    /// Samples per tile side.
    pub fn tile_pixels(self) -> usize {
        self.spec().tile_pixels
    }

    /// File naming scheme for this level.
    pub fn codec(self) -> FilenameCodec {
        self.spec().codec
    }

    /// Level this one is derived from.
    pub fn built_from(self) -> Option<Level> {
        self.spec().built_from
    }

    /// Number of tile columns around the globe.
    pub fn grid_width(self) -> usize {
        geo::grid_width(self.cell_size())
    }

    /// Number of tile rows from pole to pole.
    pub fn grid_height(self) -> usize {
        geo::grid_height(self.cell_size())
    }

    /// Total number of grid slots.
    pub fn grid_len(self) -> usize {
        self.grid_width() * self.grid_height()
    }

    /// Size in bytes of a well-formed tile file (big-endian `i16` samples).
    pub fn expected_file_bytes(self) -> u64 {
        let px = self.tile_pixels() as u64;
        px * px * 2
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Level {
    type Err = DemError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        match lower.as_str() {
            "srtm" => Ok(Level::Srtm),
            "fine" | "l09-l13" => Ok(Level::Fine),
            "medium" | "l04-l08" => Ok(Level::Medium),
            "coarse" | "l00-l03" => Ok(Level::Coarse),
            _ => Err(DemError::UnknownLevel(s.to_string())),
        }
    }
}

/// A tile address: level plus row-major grid index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileKey {
    /// Pyramid level.
    pub level: Level,
    /// Row-major index on the level grid.
    pub index: usize,
}

impl TileKey {
    /// Create a key, checking the index against the level grid.
    pub fn new(level: Level, index: usize) -> Option<Self> {
        (index < level.grid_len()).then_some(Self { level, index })
    }

    /// Key of the tile enclosing a coordinate.
    pub fn containing(level: Level, lon: f64, lat: f64) -> Result<Self> {
        let cell = level.cell_size();
        // The south pole is the lower edge of the last row
        let row_lat = if lat == -90.0 { lat + cell / 2.0 } else { lat };
        let (tl_lon, tl_lat) = geo::top_left_corner(lon, row_lat, cell);
        geo::corner_to_index(tl_lon, tl_lat, cell)
            .map(|index| Self { level, index })
            .ok_or(DemError::OutOfGrid { lon, lat })
    }

    /// Geographic top-left corner of the tile.
    pub fn corner(&self) -> (f64, f64) {
        geo::index_to_corner(self.index, self.level.cell_size())
    }

    /// Neighbouring tile on the same level, if it exists.
    pub fn neighbor(&self, dx: i64, dy: i64) -> Option<Self> {
        geo::neighbor_index(self.index, self.level.cell_size(), dx, dy).map(|index| Self {
            level: self.level,
            index,
        })
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.level, self.index)
    }
}

/// Highest viewer level of detail.
pub const MAX_LOD: u8 = 13;

/// A viewer level of detail (0 = whole-Earth overview, 13 = finest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lod(u8);

/// Where a point is found for a given level of detail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LodLocation {
    /// Tile holding the point.
    pub key: TileKey,
    /// Column inside the tile.
    pub x: usize,
    /// Row inside the tile.
    pub y: usize,
    /// Sample stride the viewer uses inside the tile at this LOD.
    pub skip: usize,
}

impl Lod {
    /// Create a level of detail, rejecting values above [`MAX_LOD`].
    pub fn new(lod: u8) -> Result<Self> {
        if lod > MAX_LOD {
            return Err(DemError::InvalidLod(lod));
        }
        Ok(Self(lod))
    }

    /// Numeric value.
    pub fn value(self) -> u8 {
        self.0
    }

    /// Grid cell size at this LOD: 60 degrees halved per step.
    pub fn degree_size(self) -> f64 {
        60.0 / f64::from(1u32 << self.0)
    }

    /// Pyramid level holding the samples for this LOD.
    pub fn source_level(self) -> Level {
        match self.0 {
            0..=3 => Level::Coarse,
            4..=8 => Level::Medium,
            _ => Level::Fine,
        }
    }

    /// Sample stride inside the source tile.
    pub fn skip(self) -> usize {
        let top = match self.source_level() {
            Level::Coarse => 3,
            Level::Medium => 8,
            _ => MAX_LOD,
        };
        1 << (top - self.0)
    }

    /// Find the source tile and pixel offset of a point at this LOD.
    pub fn locate(self, lon: f64, lat: f64) -> Result<LodLocation> {
        let level = self.source_level();
        let key = TileKey::containing(level, lon, lat)?;
        let snapped = geo::top_left_corner(lon, lat, self.degree_size());
        let (x, y) = geo::pixel_offset_within_tile(
            key.corner(),
            snapped,
            level.cell_size(),
            level.tile_pixels(),
        );
        Ok(LodLocation {
            key,
            x,
            y,
            skip: self.skip(),
        })
    }
}
