//! Level sweeps: build or reconcile one tile or every tile of a level.

use crate::builder::build_tile;
use crate::level::{Level, TileKey};
use crate::raster::VoidPolicy;
use crate::reconcile::{reconcile_tile, ReconcilePolicy};
use crate::store::TileStore;
use crate::{DemError, Result};
use rayon::prelude::*;
use std::fmt;
use std::time::Instant;
use tracing::info;

/// Which tiles of a level a sweep visits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target {
    /// Every grid index of the level.
    WholeEarth,
    /// The single tile enclosing a coordinate.
    Tile {
        /// Longitude in degrees.
        lon: f64,
        /// Latitude in degrees.
        lat: f64,
    },
}

impl Target {
    /// Grid indices of `level` covered by this target, ascending.
    pub fn indices(&self, level: Level) -> Result<Vec<usize>> {
        match *self {
            Target::WholeEarth => Ok((0..level.grid_len()).collect()),
            Target::Tile { lon, lat } => Ok(vec![TileKey::containing(level, lon, lat)?.index]),
        }
    }
}

/// Counts reported by a sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Grid indices looked at.
    pub visited: usize,
    /// Tile files written.
    pub written: usize,
    /// Indices with nothing to do.
    pub skipped: usize,
}

impl fmt::Display for SweepSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} visited, {} written, {} skipped",
            self.visited, self.written, self.skipped
        )
    }
}

/// Knobs for a [`Pipeline`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineOptions {
    /// Void handling during resampling.
    pub void: VoidPolicy,
    /// Edge reconciliation settings.
    pub reconcile: ReconcilePolicy,
    /// Build worker threads, 0 for the rayon default.
    pub workers: usize,
    /// Fine tiles built at the same time, 0 for no limit.
    ///
    /// A fine build holds about 350 MB at its peak (the assembled raster
    /// and two intermediate resampling grids). Each tile's resampling is
    /// itself spread over the pool, so a small limit still keeps every
    /// worker busy.
    pub fine_in_flight: usize,
}

/// Default for [`PipelineOptions::fine_in_flight`].
pub const DEFAULT_FINE_IN_FLIGHT: usize = 4;

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            void: VoidPolicy::default(),
            reconcile: ReconcilePolicy::default(),
            workers: 0,
            fine_in_flight: DEFAULT_FINE_IN_FLIGHT,
        }
    }
}

/// Runs build and reconcile sweeps over a [`TileStore`].
///
/// Builds run tile-parallel on a dedicated rayon pool. The availability
/// tables are only read during a build; written tiles are recorded once
/// the sweep is over. Reconciliation is sequential in ascending index
/// order because each visit rewrites neighbouring tiles.
pub struct Pipeline {
    store: TileStore,
    options: PipelineOptions,
    pool: rayon::ThreadPool,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("store", &self.store)
            .field("options", &self.options)
            .field("threads", &self.pool.current_num_threads())
            .finish()
    }
}

impl Pipeline {
    /// Create a pipeline over an opened store.
    pub fn new(store: TileStore, options: PipelineOptions) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.workers)
            .thread_name(|i| format!("pyramid-build-{}", i))
            .build()?;
        Ok(Self {
            store,
            options,
            pool,
        })
    }

    /// The underlying store.
    pub fn store(&self) -> &TileStore {
        &self.store
    }

    /// Consume the pipeline and return its store.
    pub fn into_store(self) -> TileStore {
        self.store
    }

    /// Build fine tiles from the raw source tiles.
    pub fn build_from_source(&mut self, target: Target) -> Result<SweepSummary> {
        self.build_level(Level::Fine, target)
    }

    /// Build medium or coarse tiles from the next finer level.
    pub fn build_from_finer(&mut self, level: Level, target: Target) -> Result<SweepSummary> {
        if !matches!(level, Level::Medium | Level::Coarse) {
            return Err(DemError::UnsupportedLevel {
                level: level.to_string(),
                reason: "only medium and coarse tiles are built from a finer level".to_string(),
            });
        }
        self.build_level(level, target)
    }

    fn build_level(&mut self, level: Level, target: Target) -> Result<SweepSummary> {
        let indices = target.indices(level)?;
        let start = Instant::now();
        info!(
            "Building {} tiles of {} on {} threads",
            indices.len(),
            level,
            self.pool.current_num_threads()
        );

        let batch = batch_size(level, self.options.fine_in_flight, indices.len());
        let store = &self.store;
        let void = self.options.void;
        let mut written: Vec<(TileKey, String)> = Vec::new();
        for chunk in indices.chunks(batch) {
            let done = self.pool.install(|| {
                chunk
                    .par_iter()
                    .filter_map(|&index| {
                        let key = TileKey { level, index };
                        match build_tile(store, key, &void) {
                            Ok(Some(raster)) => {
                                Some(store.write_tile(key, &raster).map(|n| (key, n)))
                            }
                            Ok(None) => None,
                            Err(e) => Some(Err(e)),
                        }
                    })
                    .collect::<Result<Vec<_>>>()
            })?;
            written.extend(done);
        }

        let summary = SweepSummary {
            visited: indices.len(),
            written: written.len(),
            skipped: indices.len() - written.len(),
        };
        for (key, name) in written {
            info!("{}: wrote {}", key, name);
            self.store.mark_available(key, name);
        }
        info!("Built {}: {} in {:.1?}", level, summary, start.elapsed());
        Ok(summary)
    }

    /// Reconcile shared borders of a built level.
    pub fn reconcile(&mut self, level: Level, target: Target) -> Result<SweepSummary> {
        if level.built_from().is_none() {
            return Err(DemError::UnsupportedLevel {
                level: level.to_string(),
                reason: "raw source tiles are never reconciled".to_string(),
            });
        }
        let indices = target.indices(level)?;
        let start = Instant::now();
        let policy = self.options.reconcile;

        let mut summary = SweepSummary::default();
        let mut adjusted = 0usize;
        let mut worst = 0i32;
        for index in indices {
            summary.visited += 1;
            let key = TileKey { level, index };
            match reconcile_tile(&self.store, key, &policy)? {
                Some(stats) => {
                    summary.written += stats.tiles_changed;
                    adjusted += stats.adjusted;
                    worst = worst.max(stats.max_disagreement);
                }
                None => summary.skipped += 1,
            }
        }

        info!(
            "Reconciled {}: {}; {} samples adjusted, largest disagreement {} m, in {:.1?}",
            level,
            summary,
            adjusted,
            worst,
            start.elapsed()
        );
        Ok(summary)
    }
}

/// Tiles handed to the pool at once.
fn batch_size(level: Level, fine_in_flight: usize, total: usize) -> usize {
    match (level, fine_in_flight) {
        (Level::Fine, n) if n > 0 => n,
        _ => total.max(1),
    }
}
