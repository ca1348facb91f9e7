//! Tile filename codecs.
//!
//! Two naming schemes are in use:
//!
//! - **Raw source** (SRTM): `N45E006.hgt`. Integer degrees, the latitude is
//!   the tile's *lower*-left corner as published by NASA. Decoding adds one
//!   degree so every coordinate in this crate is a top-left corner; encoding
//!   subtracts it again.
//! - **Pyramid**: `N48,75_E011,25.hgt`. Two-decimal degrees of the top-left
//!   corner, zero padded to fixed width, with a comma as decimal separator.
//!
//! In both schemes western longitudes are stored as `360 - lon`.

use crate::{DemError, Result};

/// Extension of every tile file.
pub const TILE_EXTENSION: &str = "hgt";

/// Naming scheme used by a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilenameCodec {
    /// `{N|S}{lat:02}{E|W}{lon:03}.hgt`, lower-left latitude.
    RawSource,
    /// `{N|S}{lat:05.2}_{E|W}{lon:06.2}.hgt` with `,` as decimal point.
    Pyramid,
}

impl FilenameCodec {
    /// Build the filename of the tile whose top-left corner is `(lon, lat)`.
    ///
    /// `lon` is expected in `[0, 360)`.
    pub fn encode(self, lon: f64, lat: f64) -> String {
        match self {
            FilenameCodec::RawSource => encode_raw(lon, lat),
            FilenameCodec::Pyramid => encode_pyramid(lon, lat),
        }
    }

    /// Recover the top-left corner `(lon, lat)` from a filename.
    ///
    /// Leading characters before the coordinate field are ignored, so
    /// prefixed names like `SRTM_N45E006.hgt` still decode.
    pub fn decode(self, name: &str) -> Result<(f64, f64)> {
        match self {
            FilenameCodec::RawSource => decode_raw(name),
            FilenameCodec::Pyramid => decode_pyramid(name),
        }
    }

    /// Length of the coordinate field, excluding the extension.
    fn field_len(self) -> usize {
        match self {
            FilenameCodec::RawSource => 7,
            FilenameCodec::Pyramid => 14,
        }
    }

    /// Extract the coordinate field that precedes `.hgt`.
    fn field(self, name: &str) -> Result<&str> {
        let invalid = || DemError::InvalidFilename(name.to_string());
        let stem = name
            .strip_suffix(TILE_EXTENSION)
            .and_then(|s| s.strip_suffix('.'))
            .ok_or_else(invalid)?;
        let len = self.field_len();
        if !stem.is_ascii() || stem.len() < len {
            return Err(invalid());
        }
        Ok(&stem[stem.len() - len..])
    }
}

fn split_longitude(lon: f64) -> (char, f64) {
    if lon >= 180.0 {
        ('W', 360.0 - lon)
    } else {
        ('E', lon)
    }
}

fn join_longitude(side: char, value: f64) -> Option<f64> {
    match side {
        'E' => Some(value),
        'W' => Some(360.0 - value),
        _ => None,
    }
}

fn join_latitude(side: char, value: f64) -> Option<f64> {
    match side {
        'N' => Some(value),
        'S' => Some(-value),
        _ => None,
    }
}

fn encode_raw(lon: f64, lat: f64) -> String {
    let (lon_side, lon_value) = split_longitude(lon);
    let lower_lat = lat - 1.0;
    let (lat_side, lat_value) = if lower_lat >= 0.0 {
        ('N', lower_lat)
    } else {
        ('S', -lower_lat)
    };
    format!(
        "{}{:02.0}{}{:03.0}.{}",
        lat_side, lat_value, lon_side, lon_value, TILE_EXTENSION
    )
}

fn decode_raw(name: &str) -> Result<(f64, f64)> {
    let invalid = || DemError::InvalidFilename(name.to_string());
    let field = FilenameCodec::RawSource.field(name)?;
    let bytes = field.as_bytes();

    let lat: u32 = field[1..3].parse().map_err(|_| invalid())?;
    let lon: u32 = field[4..7].parse().map_err(|_| invalid())?;
    let lat = join_latitude(bytes[0] as char, f64::from(lat)).ok_or_else(invalid)?;
    let lon = join_longitude(bytes[3] as char, f64::from(lon)).ok_or_else(invalid)?;

    Ok((lon, lat + 1.0))
}

fn encode_pyramid(lon: f64, lat: f64) -> String {
    let (lon_side, lon_value) = split_longitude(lon);
    let (lat_side, lat_value) = if lat >= 0.0 { ('N', lat) } else { ('S', -lat) };
    let lat_field = format!("{:05.2}", lat_value).replace('.', ",");
    let lon_field = format!("{:06.2}", lon_value).replace('.', ",");
    format!(
        "{}{}_{}{}.{}",
        lat_side, lat_field, lon_side, lon_field, TILE_EXTENSION
    )
}

fn decode_pyramid(name: &str) -> Result<(f64, f64)> {
    let invalid = || DemError::InvalidFilename(name.to_string());
    let field = FilenameCodec::Pyramid.field(name)?;
    let bytes = field.as_bytes();
    if bytes[6] != b'_' {
        return Err(invalid());
    }

    let parse = |s: &str| s.replace(',', ".").parse::<f64>().map_err(|_| invalid());
    let lat = parse(&field[1..6])?;
    let lon = parse(&field[8..14])?;
    let lat = join_latitude(bytes[0] as char, lat).ok_or_else(invalid)?;
    let lon = join_longitude(bytes[7] as char, lon).ok_or_else(invalid)?;

    Ok((lon, lat))
}
