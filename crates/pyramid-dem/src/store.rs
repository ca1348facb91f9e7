//! On-disk tile store for all pyramid levels.

use crate::availability::{list_directory, AvailabilityTable};
use crate::border::{Side, TileBorder};
use crate::level::{Level, TileKey};
use crate::raster::Raster;
use crate::{DemError, Result};
use std::path::PathBuf;
use tracing::{debug, info};

/// Where each level's tiles live on disk.
#[derive(Debug, Clone)]
pub struct StoreLayout {
    /// Directory the level directories are resolved against.
    pub base_dir: PathBuf,
    /// Level directory names, indexed like [`Level::ALL`].
    directories: [PathBuf; 4],
}

impl StoreLayout {
    /// Layout with the default directory name for every level.
    pub fn new<P: Into<PathBuf>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.into(),
            directories: Level::ALL.map(|l| PathBuf::from(default_directory(l))),
        }
    }

    /// Override the directory of one level. Relative paths are resolved
    /// against the base directory.
    pub fn with_directory<P: Into<PathBuf>>(mut self, level: Level, dir: P) -> Self {
        self.directories[level as usize] = dir.into();
        self
    }

    /// Full path of a level's directory.
    pub fn level_dir(&self, level: Level) -> PathBuf {
        self.base_dir.join(&self.directories[level as usize])
    }
}

/// Directory name used when the layout does not override it.
pub fn default_directory(level: Level) -> &'static str {
    match level {
        Level::Srtm => "NASA_SRTM",
        Level::Fine => "L09-L13",
        Level::Medium => "L04-L08",
        Level::Coarse => "L00-L03",
    }
}

/// Tile files of every level plus their availability tables.
///
/// The store is the single owner of the tables. Builders borrow it
/// immutably during a sweep; newly written tiles are recorded with
/// [`TileStore::mark_available`] once the sweep is over.
///
/// # Example
///
/// ```no_run
/// use pyramid_dem::{Level, StoreLayout, TileKey, TileStore};
///
/// let store = TileStore::open(&StoreLayout::new("/data/pyramid"))?;
/// println!("{} fine tiles", store.table(Level::Fine).count());
///
/// let key = TileKey::containing(Level::Medium, 11.5, 47.2)?;
/// if let Some(tile) = store.read_tile(key)? {
///     println!("{} is {}x{}", key, tile.size(), tile.size());
/// }
/// # Ok::<(), pyramid_dem::DemError>(())
/// ```
#[derive(Debug)]
pub struct TileStore {
    layout: StoreLayout,
    tables: Vec<AvailabilityTable>,
}

impl TileStore {
    /// Scan every level directory and build the availability tables.
    ///
    /// The raw source directory must exist. Missing built-level
    /// directories are created empty.
    pub fn open(layout: &StoreLayout) -> Result<Self> {
        let mut tables = Vec::with_capacity(Level::ALL.len());
        for level in Level::ALL {
            let dir = layout.level_dir(level);
            if level.built_from().is_some() && !dir.exists() {
                std::fs::create_dir_all(&dir).map_err(|e| DemError::tile_io(&dir, e))?;
                debug!("Created {}", dir.display());
            }
            let table = AvailabilityTable::build(level, list_directory(&dir)?);
            info!("Indexed {} tiles for {} in {}", table.count(), level, dir.display());
            tables.push(table);
        }

        Ok(Self {
            layout: layout.clone(),
            tables,
        })
    }

    /// Directory layout the store was opened with.
    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Availability table of a level.
    pub fn table(&self, level: Level) -> &AvailabilityTable {
        &self.tables[level as usize]
    }

    /// Whether a tile file exists for `key`.
    pub fn is_available(&self, key: TileKey) -> bool {
        self.table(key.level).is_available(key.index)
    }

    /// File name backing `key`, if any.
    pub fn file_name(&self, key: TileKey) -> Option<&str> {
        self.table(key.level).file_name(key.index)
    }

    /// Path of the file backing `key`, if any.
    pub fn tile_path(&self, key: TileKey) -> Option<PathBuf> {
        self.file_name(key)
            .map(|name| self.layout.level_dir(key.level).join(name))
    }

    /// Load the tile for `key`, or `None` if the slot is empty.
    pub fn read_tile(&self, key: TileKey) -> Result<Option<Raster>> {
        match self.tile_path(key) {
            Some(path) => Raster::read_hgt(&path, key.level.tile_pixels()).map(Some),
            None => Ok(None),
        }
    }

    /// Write the tile for `key` under its canonical name and return that
    /// name. The availability table is not touched.
    pub fn write_tile(&self, key: TileKey, raster: &Raster) -> Result<String> {
        if key.level.built_from().is_none() {
            return Err(DemError::UnsupportedLevel {
                level: key.level.to_string(),
                reason: "raw source tiles are read-only".to_string(),
            });
        }
        let expected = key.level.tile_pixels();
        if raster.size() != expected {
            return Err(DemError::SizeMismatch {
                expected,
                actual: raster.size(),
            });
        }

        let name = self.canonical_name(key);
        let path = self.layout.level_dir(key.level).join(&name);
        raster.write_hgt(&path)?;
        debug!("Wrote {} to {}", key, path.display());
        Ok(name)
    }

    /// Load the given border lines of the tile for `key`, or `None` if the
    /// slot is empty.
    pub fn read_border(&self, key: TileKey, sides: &[Side]) -> Result<Option<TileBorder>> {
        match self.tile_path(key) {
            Some(path) => TileBorder::read_hgt(&path, key.level.tile_pixels(), sides).map(Some),
            None => Ok(None),
        }
    }

    /// Write the changed border lines of an existing tile back in place.
    pub fn write_border(&self, key: TileKey, border: &TileBorder) -> Result<()> {
        let path = self.tile_path(key).ok_or_else(|| DemError::UnsupportedLevel {
            level: key.level.to_string(),
            reason: format!("tile {} is not available", key),
        })?;
        let expected = key.level.tile_pixels();
        if border.size() != expected {
            return Err(DemError::SizeMismatch {
                expected,
                actual: border.size(),
            });
        }
        if border.write_hgt(&path)? {
            debug!("Updated border of {} in {}", key, path.display());
        }
        Ok(())
    }

    /// Record that `key` is now backed by `name`.
    pub fn mark_available(&mut self, key: TileKey, name: String) {
        self.tables[key.level as usize].set(key, name);
    }

    /// Name a tile would be written under.
    pub fn canonical_name(&self, key: TileKey) -> String {
        let (lon, lat) = key.corner();
        key.level.codec().encode(lon, lat)
    }

    /// Path of a level directory.
    pub fn level_dir(&self, level: Level) -> PathBuf {
        self.layout.level_dir(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn layout_with_source() -> (TempDir, StoreLayout) {
        let dir = TempDir::new().unwrap();
        let layout = StoreLayout::new(dir.path());
        std::fs::create_dir_all(layout.level_dir(Level::Srtm)).unwrap();
        (dir, layout)
    }

    #[test]
    fn test_open_requires_source_dir() {
        let dir = TempDir::new().unwrap();
        let result = TileStore::open(&StoreLayout::new(dir.path()));
        assert!(matches!(result, Err(DemError::DirectoryUnreadable { .. })));
    }

    #[test]
    fn test_open_creates_level_dirs() {
        let (_dir, layout) = layout_with_source();
        let store = TileStore::open(&layout).unwrap();
        for level in [Level::Fine, Level::Medium, Level::Coarse] {
            assert!(layout.level_dir(level).is_dir());
            assert_eq!(store.table(level).count(), 0);
        }
    }

    #[test]
    fn test_write_then_mark() {
        let (_dir, layout) = layout_with_source();
        let mut store = TileStore::open(&layout).unwrap();
        let key = TileKey::new(Level::Coarse, 7).unwrap();

        let name = store.write_tile(key, &Raster::filled(65, 42)).unwrap();
        assert_eq!(name, "N30,00_E060,00.hgt");
        assert!(!store.is_available(key));

        store.mark_available(key, name);
        let tile = store.read_tile(key).unwrap().unwrap();
        assert_eq!(tile.get(64, 64), 42);

        // A fresh scan finds the same file
        let reopened = TileStore::open(&layout).unwrap();
        assert_eq!(reopened.file_name(key), Some("N30,00_E060,00.hgt"));
    }

    #[test]
    fn test_write_rejects_wrong_size_and_source_level() {
        let (_dir, layout) = layout_with_source();
        let store = TileStore::open(&layout).unwrap();
        let coarse = TileKey::new(Level::Coarse, 0).unwrap();
        assert!(matches!(
            store.write_tile(coarse, &Raster::new(64)),
            Err(DemError::SizeMismatch { expected: 65, actual: 64 })
        ));
        let srtm = TileKey::new(Level::Srtm, 0).unwrap();
        assert!(store.write_tile(srtm, &Raster::new(1201)).is_err());
    }

    #[test]
    fn test_border_round_trip_in_place() {
        let (_dir, layout) = layout_with_source();
        let mut store = TileStore::open(&layout).unwrap();
        let key = TileKey::new(Level::Coarse, 3).unwrap();
        let name = store.write_tile(key, &Raster::filled(65, 5)).unwrap();

        let mut border = TileBorder::from_raster(&Raster::filled(65, 5), &[Side::West]);
        border.set(0, 10, 9);
        // Not marked yet, so there is no file to update
        assert!(store.write_border(key, &border).is_err());

        store.mark_available(key, name);
        store.write_border(key, &border).unwrap();
        let back = store.read_border(key, &[Side::West]).unwrap().unwrap();
        assert_eq!(back.get(0, 10), Some(9));
        let tile = store.read_tile(key).unwrap().unwrap();
        assert_eq!(tile.get(0, 10), 9);
        assert_eq!(tile.get(1, 10), 5);

        let wrong = TileBorder::from_raster(&Raster::new(64), &[Side::West]);
        assert!(matches!(
            store.write_border(key, &wrong),
            Err(DemError::SizeMismatch { expected: 65, actual: 64 })
        ));
        let empty = TileKey::new(Level::Coarse, 4).unwrap();
        assert!(store.read_border(empty, &Side::ALL).unwrap().is_none());
    }

    #[test]
    fn test_custom_directory() {
        let (dir, layout) = layout_with_source();
        let layout = layout.with_directory(Level::Coarse, "overview");
        TileStore::open(&layout).unwrap();
        assert!(dir.path().join("overview").is_dir());
    }
}
