//! # pyramid-dem
//!
//! Builds a multi-resolution pyramid of HGT elevation tiles covering the
//! whole Earth from 3 arc-second SRTM tiles, and keeps neighbouring tiles
//! seamless at their shared borders.
//!
//! ## Overview
//!
//! The pyramid has three built levels on top of the raw source:
//!
//! | Level    | Tile span | Samples | Read by viewer LODs |
//! |----------|-----------|---------|---------------------|
//! | `srtm`   | 1°        | 1201    | (input)             |
//! | `l09-l13`| 3.75°     | 4097    | 9-13                |
//! | `l04-l08`| 15°       | 513     | 4-8                 |
//! | `l00-l03`| 60°       | 65      | 0-3                 |
//!
//! Tiles are addressed by a row-major index on a per-level grid anchored at
//! (0°E, 90°N). Adjacent tiles overlap by one sample row or column.
//!
//! - `l09-l13` tiles are assembled from 15x15 quarter-degree blocks of SRTM
//!   tiles and resampled bicubically from 4501 to 4097 samples.
//! - `l04-l08` and `l00-l03` tiles take every 32nd sample of the 4x4 finer
//!   tiles they cover.
//! - After a level is built, shared corners and edges are averaged across
//!   neighbours. Only border samples are read and rewritten, in place.
//!
//! ## Example
//!
//! ```no_run
//! use pyramid_dem::{Level, Pipeline, PipelineOptions, StoreLayout, Target, TileStore};
//!
//! let store = TileStore::open(&StoreLayout::new("/data/pyramid"))?;
//! let mut pipeline = Pipeline::new(store, PipelineOptions::default())?;
//!
//! pipeline.build_from_source(Target::WholeEarth)?;
//! pipeline.reconcile(Level::Fine, Target::WholeEarth)?;
//! pipeline.build_from_finer(Level::Medium, Target::Tile { lon: 11.5, lat: 47.2 })?;
//! # Ok::<(), pyramid_dem::DemError>(())
//! ```

mod availability;
mod border;
mod builder;
mod error;
mod filename;
pub mod geo;
mod level;
mod pipeline;
mod raster;
mod reconcile;
mod resample;
mod store;

pub use availability::{list_directory, AvailabilityTable, ListingEntry};
pub use border::{Side, TileBorder};
pub use builder::{
    build_tile, compose_from_finer, compose_from_source, finer_slots, source_anchor,
    ASSEMBLED_PIXELS,
};
pub use error::DemError;
pub use filename::{FilenameCodec, TILE_EXTENSION};
pub use level::{Level, LevelSpec, Lod, LodLocation, TileKey, MAX_LOD};
pub use pipeline::{Pipeline, PipelineOptions, SweepSummary, Target, DEFAULT_FINE_IN_FLIGHT};
pub use raster::{Raster, VoidPolicy, SRTM_NO_DATA};
pub use reconcile::{
    facing_sides, reconcile_tile, CornerAveraging, Neighborhood, ReconcilePolicy,
    ReconcileStats,
};
pub use resample::resample;
pub use store::{default_directory, StoreLayout, TileStore};

/// Result type for pyramid operations.
pub type Result<T> = std::result::Result<T, DemError>;
