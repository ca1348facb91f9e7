//! Border samples of a tile, read and written in place.
//!
//! Reconciliation only ever touches the outermost rows and columns of a
//! tile. A [`TileBorder`] holds the requested subset of those four lines
//! and writes back the ones that changed by seeking into the existing HGT
//! file, so interior samples are never read and the file is never
//! truncated.

use crate::raster::Raster;
use crate::{DemError, Result};
use byteorder::{BigEndian, ByteOrder, ReadBytesExt, WriteBytesExt};
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

/// One of the four outer lines of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Row 0.
    North,
    /// Last row.
    South,
    /// Column 0.
    West,
    /// Last column.
    East,
}

impl Side {
    /// All four sides.
    pub const ALL: [Side; 4] = [Side::North, Side::South, Side::West, Side::East];

    /// Sample position of the `k`-th sample along this side.
    fn position(self, k: usize, last: usize) -> (usize, usize) {
        match self {
            Side::North => (k, 0),
            Side::South => (k, last),
            Side::West => (0, k),
            Side::East => (last, k),
        }
    }

    /// Offset along this side of `(x, y)`, if the sample lies on it.
    fn offset(self, x: usize, y: usize, last: usize) -> Option<usize> {
        match self {
            Side::North if y == 0 => Some(x),
            Side::South if y == last => Some(x),
            Side::West if x == 0 => Some(y),
            Side::East if x == last => Some(y),
            _ => None,
        }
    }

    fn is_row(self) -> bool {
        matches!(self, Side::North | Side::South)
    }
}

/// Loaded border lines of a `size x size` tile.
///
/// Corner samples belong to two lines; both copies are kept in step when
/// both are loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileBorder {
    size: usize,
    lines: [Option<Vec<i16>>; 4],
    dirty: [bool; 4],
}

impl TileBorder {
    /// Take the given sides from an in-memory raster.
    pub fn from_raster(raster: &Raster, sides: &[Side]) -> Self {
        let size = raster.size();
        let last = size - 1;
        let mut lines: [Option<Vec<i16>>; 4] = Default::default();
        for &side in sides {
            let line = (0..size)
                .map(|k| {
                    let (x, y) = side.position(k, last);
                    raster.get(x, y)
                })
                .collect();
            lines[side as usize] = Some(line);
        }
        Self {
            size,
            lines,
            dirty: [false; 4],
        }
    }

    /// Read the given sides of a `size x size` HGT file.
    pub fn read_hgt<P: AsRef<Path>>(path: P, size: usize, sides: &[Side]) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| DemError::tile_io(path, e))?;
        let actual = file
            .metadata()
            .map_err(|e| DemError::tile_io(path, e))?
            .len();
        let expected = (size * size * 2) as u64;
        if actual != expected {
            return Err(DemError::RasterSize {
                path: path.to_path_buf(),
                size,
                expected,
                actual,
            });
        }

        let last = size - 1;
        let mut lines: [Option<Vec<i16>>; 4] = Default::default();
        for &side in sides {
            let mut line = vec![0i16; size];
            if side.is_row() {
                let (_, y) = side.position(0, last);
                seek_sample(&mut file, size, 0, y).map_err(|e| DemError::tile_io(path, e))?;
                file.read_i16_into::<BigEndian>(&mut line)
                    .map_err(|e| DemError::tile_io(path, e))?;
            } else {
                for (k, sample) in line.iter_mut().enumerate() {
                    let (x, y) = side.position(k, last);
                    seek_sample(&mut file, size, x, y).map_err(|e| DemError::tile_io(path, e))?;
                    *sample = file
                        .read_i16::<BigEndian>()
                        .map_err(|e| DemError::tile_io(path, e))?;
                }
            }
            lines[side as usize] = Some(line);
        }
        Ok(Self {
            size,
            lines,
            dirty: [false; 4],
        })
    }

    /// Write the changed lines back into an existing HGT file.
    ///
    /// Returns whether anything was written.
    pub fn write_hgt<P: AsRef<Path>>(&self, path: P) -> Result<bool> {
        if !self.is_dirty() {
            return Ok(false);
        }
        let path = path.as_ref();
        let mut file = OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|e| DemError::tile_io(path, e))?;

        let last = self.size - 1;
        for side in Side::ALL {
            let Some(line) = self.line(side).filter(|_| self.dirty[side as usize]) else {
                continue;
            };
            if side.is_row() {
                let (_, y) = side.position(0, last);
                let mut bytes = vec![0u8; line.len() * 2];
                BigEndian::write_i16_into(line, &mut bytes);
                seek_sample(&mut file, self.size, 0, y).map_err(|e| DemError::tile_io(path, e))?;
                file.write_all(&bytes)
                    .map_err(|e| DemError::tile_io(path, e))?;
            } else {
                for (k, &sample) in line.iter().enumerate() {
                    let (x, y) = side.position(k, last);
                    seek_sample(&mut file, self.size, x, y)
                        .map_err(|e| DemError::tile_io(path, e))?;
                    file.write_i16::<BigEndian>(sample)
                        .map_err(|e| DemError::tile_io(path, e))?;
                }
            }
        }
        file.flush().map_err(|e| DemError::tile_io(path, e))?;
        Ok(true)
    }

    /// Samples per side of the tile.
    pub fn size(&self) -> usize {
        self.size
    }

    /// A loaded line, west to east or north to south.
    pub fn line(&self, side: Side) -> Option<&[i16]> {
        self.lines[side as usize].as_deref()
    }

    /// Sample at `(x, y)`, if it lies on a loaded line.
    pub fn get(&self, x: usize, y: usize) -> Option<i16> {
        let last = self.size - 1;
        Side::ALL.into_iter().find_map(|side| {
            let k = side.offset(x, y, last)?;
            self.line(side).map(|line| line[k])
        })
    }

    /// Set the sample at `(x, y)` on every loaded line holding it.
    ///
    /// Returns whether the stored value changed.
    pub fn set(&mut self, x: usize, y: usize, value: i16) -> bool {
        let last = self.size - 1;
        let mut changed = false;
        for side in Side::ALL {
            let Some(k) = side.offset(x, y, last) else {
                continue;
            };
            if let Some(line) = self.lines[side as usize].as_mut() {
                if line[k] != value {
                    line[k] = value;
                    self.dirty[side as usize] = true;
                    changed = true;
                }
            }
        }
        changed
    }

    /// Whether any line changed since it was loaded.
    pub fn is_dirty(&self) -> bool {
        self.dirty.iter().any(|d| *d)
    }
}

fn seek_sample(file: &mut File, size: usize, x: usize, y: usize) -> std::io::Result<u64> {
    file.seek(SeekFrom::Start(((y * size + x) * 2) as u64))
}
