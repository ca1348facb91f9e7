//! Tile composition from a finer pyramid level or from raw source tiles.
//!
//! Both builders return `Ok(None)` when no contributing tile exists, which
//! callers treat as "nothing to write" rather than as an error. Missing
//! contributors inside a partially covered tile become sea level (0).

use crate::geo;
use crate::level::{Level, TileKey};
use crate::raster::{Raster, VoidPolicy};
use crate::resample::resample;
use crate::store::TileStore;
use crate::{DemError, Result};
use tracing::{debug, info};

/// Finer tiles per coarser tile side.
const FINER_PER_SIDE: usize = 4;

/// Raw source sub-blocks per degree, per side.
const SOURCE_SUBDIVISIONS: usize = 4;

/// Pixels between the starts of consecutive raw source sub-blocks.
const SOURCE_BLOCK_STRIDE: usize = 300;

/// Raw source sub-blocks per fine tile side (3.75 degrees in quarter degrees).
const SOURCE_BLOCKS_PER_TILE: usize = 15;

/// Raw source tiles searched per side around the anchor.
const SOURCE_SEARCH: usize = 5;

/// Side of the raster assembled from raw source tiles before resampling.
pub const ASSEMBLED_PIXELS: usize = SOURCE_BLOCKS_PER_TILE * SOURCE_BLOCK_STRIDE + 1;

/// Build the tile for `key` from the level it is derived from.
///
/// Fine tiles are assembled from raw source tiles and resampled; Medium
/// and Coarse tiles are composed from the next finer level.
pub fn build_tile(
    store: &TileStore,
    key: TileKey,
    void: &VoidPolicy,
) -> Result<Option<Raster>> {
    match key.level.built_from() {
        Some(Level::Srtm) => {
            let assembled = compose_from_source(store, key.index)?;
            Ok(assembled.map(|raster| resample(&raster, key.level.tile_pixels(), void)))
        }
        Some(_) => compose_from_finer(store, key.level, key.index),
        None => Err(DemError::UnsupportedLevel {
            level: key.level.to_string(),
            reason: "raw source tiles cannot be built".to_string(),
        }),
    }
}

/// Finer-level slots that make up a tile, row-major, 4 by 4.
///
/// Slots past a pole are `None`. Longitude wraps.
pub fn finer_slots(level: Level, index: usize) -> Result<[Option<TileKey>; 16]> {
    let finer = finer_level(level)?;
    let (tl_lon, tl_lat) = geo::index_to_corner(index, level.cell_size());
    let anchor = geo::corner_to_index(tl_lon, tl_lat, finer.cell_size())
        .and_then(|i| TileKey::new(finer, i))
        .ok_or(DemError::OutOfGrid {
            lon: tl_lon,
            lat: tl_lat,
        })?;

    let mut slots = [None; FINER_PER_SIDE * FINER_PER_SIDE];
    for (i, slot) in slots.iter_mut().enumerate() {
        let dx = (i % FINER_PER_SIDE) as i64;
        let dy = (i / FINER_PER_SIDE) as i64;
        *slot = anchor.neighbor(dx, dy);
    }
    Ok(slots)
}

/// Compose a Medium or Coarse tile from the 16 finer tiles it covers.
///
/// Each finer tile contributes a `(px - 1) / 4 + 1` sample block taken
/// every `skip` pixels, where `px` is the target tile size. Blocks are
/// pasted at a stride one less than their size, so adjacent blocks share a
/// row or column and later blocks (row-major) overwrite the shared samples.
pub fn compose_from_finer(
    store: &TileStore,
    level: Level,
    index: usize,
) -> Result<Option<Raster>> {
    let finer = finer_level(level)?;
    let slots = finer_slots(level, index)?;
    let present = slots
        .iter()
        .filter(|s| s.is_some_and(|key| store.is_available(key)))
        .count();
    if present == 0 {
        info!("{}#{}: no {} tiles, skipping", level, index, finer);
        return Ok(None);
    }

    let px = level.tile_pixels();
    let block_len = (px - 1) / FINER_PER_SIDE + 1;
    let stride = block_len - 1;
    let skip = (finer.tile_pixels() - 1) / stride;

    let mut out = Raster::new(px);
    for (i, slot) in slots.iter().enumerate() {
        let x0 = (i % FINER_PER_SIDE) * stride;
        let y0 = (i / FINER_PER_SIDE) * stride;
        let block = match slot {
            Some(key) => match store.read_tile(*key)? {
                Some(tile) => tile.block(0, 0, block_len, skip),
                None => Raster::new(block_len),
            },
            None => Raster::new(block_len),
        };
        out.put_block(&block, x0, y0);
    }

    info!(
        "{}#{}: composed from {}/16 {} tiles",
        level, index, present, finer
    );
    Ok(Some(out))
}

/// Raw source tile and quarter-degree offsets a fine tile starts at.
///
/// Returns the index of the raw source tile holding the fine tile's corner
/// and the number of quarter degrees east and south of that tile's own
/// corner.
pub fn source_anchor(fine_index: usize) -> Result<(usize, usize, usize)> {
    let source_cell = Level::Srtm.cell_size();
    let (tl_lon, tl_lat) = geo::index_to_corner(fine_index, Level::Fine.cell_size());
    let (src_lon, src_lat) = geo::top_left_corner(tl_lon, tl_lat, source_cell);
    let anchor = geo::corner_to_index(src_lon, src_lat, source_cell).ok_or(DemError::OutOfGrid {
        lon: tl_lon,
        lat: tl_lat,
    })?;

    let quarters = |delta: f64| (delta.abs() * SOURCE_SUBDIVISIONS as f64).round() as usize;
    let offset_lon = quarters(geo::normalize_longitude(tl_lon - src_lon));
    let offset_lat = quarters(src_lat - tl_lat);
    Ok((anchor, offset_lon, offset_lat))
}

/// Assemble the raw source samples under a fine tile.
///
/// The result is [`ASSEMBLED_PIXELS`] per side and still has to be
/// resampled to the fine tile size. Void samples are copied unchanged.
pub fn compose_from_source(store: &TileStore, fine_index: usize) -> Result<Option<Raster>> {
    let (anchor, offset_lon, offset_lat) = source_anchor(fine_index)?;
    let source_cell = Level::Srtm.cell_size();

    let mut search = [None; SOURCE_SEARCH * SOURCE_SEARCH];
    for (i, slot) in search.iter_mut().enumerate() {
        let dx = (i % SOURCE_SEARCH) as i64;
        let dy = (i / SOURCE_SEARCH) as i64;
        *slot = geo::neighbor_index(anchor, source_cell, dx, dy)
            .and_then(|index| TileKey::new(Level::Srtm, index))
            .filter(|key| store.is_available(*key));
    }
    if search.iter().all(Option::is_none) {
        info!("{}#{}: no source tiles, skipping", Level::Fine, fine_index);
        return Ok(None);
    }

    let block_len = SOURCE_BLOCK_STRIDE + 1;
    let mut out = Raster::new(ASSEMBLED_PIXELS);
    let mut loaded: Option<(&str, Raster)> = None;
    let mut used = 0usize;

    for y in 0..SOURCE_BLOCKS_PER_TILE {
        for x in 0..SOURCE_BLOCKS_PER_TILE {
            let gx = x + offset_lon;
            let gy = y + offset_lat;
            let file_x = gx / SOURCE_SUBDIVISIONS;
            let file_y = gy / SOURCE_SUBDIVISIONS;
            let sx = (gx % SOURCE_SUBDIVISIONS) * SOURCE_BLOCK_STRIDE;
            let sy = (gy % SOURCE_SUBDIVISIONS) * SOURCE_BLOCK_STRIDE;

            let mut block = None;
            if let Some(key) = search[file_y * SOURCE_SEARCH + file_x] {
                if let Some(name) = store.file_name(key) {
                    if loaded.as_ref().map(|(n, _)| *n) != Some(name) {
                        loaded = match store.read_tile(key)? {
                            Some(tile) => {
                                debug!("Loaded {} for {}#{}", name, Level::Fine, fine_index);
                                used += 1;
                                Some((name, tile))
                            }
                            None => None,
                        };
                    }
                    block = loaded
                        .as_ref()
                        .map(|(_, tile)| tile.block(sx, sy, block_len, 1));
                }
            }

            // Missing sources paste sea level over the shared border too
            let block = block.unwrap_or_else(|| Raster::new(block_len));
            out.put_block(&block, x * SOURCE_BLOCK_STRIDE, y * SOURCE_BLOCK_STRIDE);
        }
    }

    info!(
        "{}#{}: assembled from source ({} file loads)",
        Level::Fine,
        fine_index,
        used
    );
    Ok(Some(out))
}

fn finer_level(level: Level) -> Result<Level> {
    match level.built_from() {
        Some(finer) if finer.built_from().is_some() => Ok(finer),
        _ => Err(DemError::UnsupportedLevel {
            level: level.to_string(),
            reason: "only medium and coarse tiles are composed from a finer level".to_string(),
        }),
    }
}
