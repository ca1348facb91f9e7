//! Square elevation rasters and the headerless HGT file format.
//!
//! An HGT file is `size * size` signed 16-bit big-endian samples, row-major,
//! north row first, west column first. There is no header; the grid size is
//! implied by the file length and must be known by the caller.

use crate::{DemError, Result};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Sample value SRTM uses for missing data.
pub const SRTM_NO_DATA: i16 = i16::MIN;

/// A square grid of elevation samples in meters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    /// Samples per side.
    size: usize,
    /// Row-major samples, north to south, west to east.
    data: Vec<i16>,
}

impl Raster {
    /// Zero-filled raster.
    pub fn new(size: usize) -> Self {
        Self::filled(size, 0)
    }

    /// Raster with every sample set to `value`.
    pub fn filled(size: usize, value: i16) -> Self {
        Self {
            size,
            data: vec![value; size * size],
        }
    }

    /// Wrap existing samples. `data.len()` must be `size * size`.
    pub fn from_vec(size: usize, data: Vec<i16>) -> Result<Self> {
        if data.len() != size * size {
            return Err(DemError::SizeMismatch {
                expected: size,
                actual: (data.len() as f64).sqrt() as usize,
            });
        }
        Ok(Self { size, data })
    }

    /// Samples per side.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Sample at column `x`, row `y`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> i16 {
        self.data[y * self.size + x]
    }

    /// Overwrite the sample at column `x`, row `y`.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: i16) {
        self.data[y * self.size + x] = value;
    }

    /// All samples, row-major.
    pub fn samples(&self) -> &[i16] {
        &self.data
    }

    /// Mutable access to all samples, row-major.
    pub fn samples_mut(&mut self) -> &mut [i16] {
        &mut self.data
    }

    /// Copy a `len x len` block starting at `(x0, y0)` taking every
    /// `skip`-th sample in both directions.
    ///
    /// The source extent is `(len - 1) * skip + 1` samples per side and must
    /// fit inside the raster.
    pub fn block(&self, x0: usize, y0: usize, len: usize, skip: usize) -> Raster {
        let mut out = Raster::new(len);
        for j in 0..len {
            let row = (y0 + j * skip) * self.size;
            for i in 0..len {
                out.data[j * len + i] = self.data[row + x0 + i * skip];
            }
        }
        out
    }

    /// Paste `block` with its top-left sample at `(x0, y0)`.
    pub fn put_block(&mut self, block: &Raster, x0: usize, y0: usize) {
        let len = block.size;
        for j in 0..len {
            let dst = (y0 + j) * self.size + x0;
            self.data[dst..dst + len].copy_from_slice(&block.data[j * len..(j + 1) * len]);
        }
    }

    /// Read an HGT file holding a `size x size` grid.
    ///
    /// Fails with [`DemError::RasterSize`] when the file length does not
    /// match the expected grid.
    pub fn read_hgt<P: AsRef<Path>>(path: P, size: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| DemError::tile_io(path, e))?;
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

        let mut data = vec![0i16; size * size];
        BufReader::new(file)
            .read_i16_into::<BigEndian>(&mut data)
            .map_err(|e| DemError::tile_io(path, e))?;
        Ok(Self { size, data })
    }

    /// Write the raster as an HGT file, replacing any existing file.
    pub fn write_hgt<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| DemError::tile_io(path, e))?;
        let mut writer = BufWriter::new(file);
        for &sample in &self.data {
            writer
                .write_i16::<BigEndian>(sample)
                .map_err(|e| DemError::tile_io(path, e))?;
        }
        writer.flush().map_err(|e| DemError::tile_io(path, e))?;
        Ok(())
    }
}

/// How missing samples are recognized and replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoidPolicy {
    /// Samples above this value are treated as missing.
    pub threshold: i16,
    /// Replacement value for missing samples.
    pub fill: i16,
}

impl Default for VoidPolicy {
    fn default() -> Self {
        Self {
            threshold: 9000,
            fill: 10,
        }
    }
}

impl VoidPolicy {
    /// Whether a sample counts as missing data.
    #[inline]
    pub fn is_void(&self, sample: i16) -> bool {
        sample > self.threshold || sample == SRTM_NO_DATA
    }

    /// Sample with voids replaced by the fill value.
    #[inline]
    pub fn apply(&self, sample: i16) -> i16 {
        if self.is_void(sample) {
            self.fill
        } else {
            sample
        }
    }
}
