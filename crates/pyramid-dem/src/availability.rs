//! Per-level record of which grid slots have a backing tile file.

use crate::filename::TILE_EXTENSION;
use crate::geo;
use crate::level::{Level, TileKey};
use crate::{DemError, Result};
use std::path::Path;
use tracing::debug;

/// A directory listing entry: file name and size in bytes.
pub type ListingEntry = (String, u64);

/// Which slots of one level's grid are backed by a file, and by which file.
#[derive(Debug, Clone)]
pub struct AvailabilityTable {
    level: Level,
    /// One slot per grid index.
    slots: Vec<Option<String>>,
}

impl AvailabilityTable {
    /// Table with every slot empty.
    pub fn empty(level: Level) -> Self {
        Self {
            level,
            slots: vec![None; level.grid_len()],
        }
    }

    /// Build a table from a directory listing.
    ///
    /// An entry is accepted when its size equals the level's expected file
    /// size, its extension is `.hgt`, and its name decodes with the level's
    /// codec to a corner on the grid. Everything else is ignored. When two
    /// entries land on the same slot the later one wins.
    pub fn build<I>(level: Level, entries: I) -> Self
    where
        I: IntoIterator<Item = ListingEntry>,
    {
        let mut table = Self::empty(level);
        let expected = level.expected_file_bytes();
        let codec = level.codec();
        let cell = level.cell_size();

        for (name, size) in entries {
            if size != expected || !has_tile_extension(&name) {
                continue;
            }
            let Ok((lon, lat)) = codec.decode(&name) else {
                debug!("Ignoring {}: name does not decode for {}", name, level);
                continue;
            };
            let (tl_lon, tl_lat) = geo::top_left_corner(lon, lat, cell);
            match geo::corner_to_index(tl_lon, tl_lat, cell) {
                Some(index) => {
                    if let Some(previous) = &table.slots[index] {
                        debug!("{} replaces {} at {}#{}", name, previous, level, index);
                    }
                    table.slots[index] = Some(name);
                }
                None => debug!("Ignoring {}: corner outside the {} grid", name, level),
            }
        }
        table
    }

    /// Level this table describes.
    pub fn level(&self) -> Level {
        self.level
    }

    /// Whether the slot at `index` has a file.
    pub fn is_available(&self, index: usize) -> bool {
        self.file_name(index).is_some()
    }

    /// File backing the slot at `index`.
    pub fn file_name(&self, index: usize) -> Option<&str> {
        self.slots.get(index).and_then(|s| s.as_deref())
    }

    /// Record a file for a slot.
    pub fn set(&mut self, key: TileKey, name: String) {
        debug_assert_eq!(key.level, self.level);
        self.slots[key.index] = Some(name);
    }

    /// Number of occupied slots.
    pub fn count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Occupied slot indices in ascending order.
    pub fn available_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|_| i))
    }
}

fn has_tile_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext == TILE_EXTENSION)
}

/// List the regular files of a directory as `(name, size)`, sorted by name.
///
/// Sorting makes the collision rule of [`AvailabilityTable::build`]
/// independent of the order the filesystem returns entries in.
pub fn list_directory<P: AsRef<Path>>(dir: P) -> Result<Vec<ListingEntry>> {
    let dir = dir.as_ref();
    let unreadable = |source| DemError::DirectoryUnreadable {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(unreadable)? {
        let entry = entry.map_err(unreadable)?;
        let metadata = entry.metadata().map_err(unreadable)?;
        if !metadata.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            entries.push((name.to_string(), metadata.len()));
        }
    }
    entries.sort();
    Ok(entries)
}
