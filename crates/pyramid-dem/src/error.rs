//! Error types for the pyramid crate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while indexing, building or reconciling tiles.
///
/// Missing coverage is not an error: a tile without any contributing source
/// is reported as `None` by the builders, and unrecognized files in a level
/// directory are skipped while indexing.
#[derive(Debug, Error)]
pub enum DemError {
    /// I/O error while reading or writing a tile file.
    #[error("I/O error on {path}: {source}")]
    TileIo {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A level directory could not be listed.
    #[error("Cannot read level directory {path}: {source}")]
    DirectoryUnreadable {
        /// Directory that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A raster file does not hold a square grid of the expected size.
    #[error("Raster {path} has {actual} bytes, expected {expected} for a {size}x{size} grid")]
    RasterSize {
        /// Offending file.
        path: PathBuf,
        /// Pixels per side the caller expected.
        size: usize,
        /// Expected byte length.
        expected: u64,
        /// Actual byte length.
        actual: u64,
    },

    /// Two rasters that must share a size do not.
    #[error("Raster size mismatch: expected {expected}x{expected}, got {actual}x{actual}")]
    SizeMismatch {
        /// Expected pixels per side.
        expected: usize,
        /// Actual pixels per side.
        actual: usize,
    },

    /// Invalid tile filename - cannot parse coordinates.
    #[error("Invalid tile filename: {0}")]
    InvalidFilename(String),

    /// Unknown level label.
    #[error("Unknown level '{0}' (expected srtm, l09-l13, l04-l08 or l00-l03)")]
    UnknownLevel(String),

    /// The requested operation is not defined for this level.
    #[error("Operation not supported for level {level}: {reason}")]
    UnsupportedLevel {
        /// Level label.
        level: String,
        /// Why the level was rejected.
        reason: String,
    },

    /// Level of detail outside 0-13.
    #[error("Invalid level of detail {0} (must be 0-13)")]
    InvalidLod(u8),

    /// Coordinate does not fall on the tile grid.
    #[error("Coordinate ({lon}, {lat}) is outside the tile grid")]
    OutOfGrid {
        /// Requested longitude.
        lon: f64,
        /// Requested latitude.
        lat: f64,
    },

    /// The build worker pool could not be created.
    #[error("Worker pool error: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl DemError {
    /// Attach a file path to an I/O error.
    pub(crate) fn tile_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DemError::TileIo {
            path: path.into(),
            source,
        }
    }
}
