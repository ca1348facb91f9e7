//! Coordinate math for the global tile grid.
//!
//! Tiles are addressed by their top-left (north-west) corner. Internally the
//! globe is flattened to a Cartesian plane where `x` is the longitude
//! normalized to `[0, 360)` and `y = 90 - lat`, so `y` grows southward from
//! the north pole. A level with cell size `c` has `360 / c` columns and
//! `180 / c` rows, indexed row-major from the north-west corner.
//!
//! Longitude wraps around the date line; latitude does not wrap, the poles
//! are hard boundaries of the grid.

/// Normalize a longitude to `[0, 360)`.
pub fn normalize_longitude(lon: f64) -> f64 {
    let lon = lon.rem_euclid(360.0);
    // rem_euclid can round tiny negatives up to exactly 360.0
    if lon >= 360.0 {
        0.0
    } else {
        lon
    }
}

fn to_cartesian(lon: f64, lat: f64) -> (f64, f64) {
    (lon, 90.0 - lat)
}

fn from_cartesian(x: f64, y: f64) -> (f64, f64) {
    (x, 90.0 - y)
}

/// Number of grid columns for a cell size.
pub fn grid_width(cell_size: f64) -> usize {
    (360.0 / cell_size + 0.5) as usize
}

/// Number of grid rows for a cell size.
pub fn grid_height(cell_size: f64) -> usize {
    (180.0 / cell_size + 0.5) as usize
}

/// Top-left corner of the grid cell enclosing `(lon, lat)`.
pub fn top_left_corner(lon: f64, lat: f64, cell_size: f64) -> (f64, f64) {
    let (x, y) = to_cartesian(normalize_longitude(lon), lat);
    let x = (x / cell_size).floor() * cell_size;
    let y = (y / cell_size).floor() * cell_size;
    from_cartesian(x, y)
}

/// Grid index of a tile given its top-left corner.
///
/// Cell coordinates are rounded to the nearest integer, which absorbs
/// floating error from [`index_to_corner`]. Returns `None` for corners that
/// fall outside the grid (south of the last row).
pub fn corner_to_index(tl_lon: f64, tl_lat: f64, cell_size: f64) -> Option<usize> {
    let (x, y) = to_cartesian(normalize_longitude(tl_lon), tl_lat);
    let cx = (x / cell_size + 0.5).floor();
    let cy = (y / cell_size + 0.5).floor();
    if cy < 0.0 {
        return None;
    }

    let width = grid_width(cell_size);
    // Rounding can push a longitude just below 360 onto column `width`.
    let cx = cx as usize % width;
    let cy = cy as usize;
    if cy >= grid_height(cell_size) {
        return None;
    }
    Some(cy * width + cx)
}

/// Top-left corner of the tile at `index`.
pub fn index_to_corner(index: usize, cell_size: f64) -> (f64, f64) {
    let width = grid_width(cell_size);
    let x = (index % width) as f64 * cell_size;
    let y = (index / width) as f64 * cell_size;
    from_cartesian(x, y)
}

/// Index of the tile `dx` columns east and `dy` rows south of `base`.
///
/// Columns wrap around the globe. Rows do not: stepping past either pole
/// yields `None`.
pub fn neighbor_index(base: usize, cell_size: f64, dx: i64, dy: i64) -> Option<usize> {
    let width = grid_width(cell_size) as i64;
    let height = grid_height(cell_size) as i64;
    let base = base as i64;

    let x = (base % width + dx).rem_euclid(width);
    let y = base / width + dy;
    if y < 0 || y >= height {
        return None;
    }
    Some((y * width + x) as usize)
}

/// Pixel offset of a point inside a tile.
///
/// `tile_corner` is the tile's top-left corner, `cell_size` its span in
/// degrees and `tile_pixels` its samples per side. The offset is the
/// proportional position scaled by `tile_pixels - 1`, truncated.
pub fn pixel_offset_within_tile(
    tile_corner: (f64, f64),
    point: (f64, f64),
    cell_size: f64,
    tile_pixels: usize,
) -> (usize, usize) {
    let (tl_lon, tl_lat) = tile_corner;
    let (lon, lat) = point;
    let delta_lon = normalize_longitude(lon - tl_lon);
    let delta_lat = (tl_lat - lat).max(0.0);
    let span = (tile_pixels - 1) as f64;

    let x = (delta_lon / cell_size * span) as usize;
    let y = (delta_lat / cell_size * span) as usize;
    (x.min(tile_pixels - 1), y.min(tile_pixels - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const CELL_SIZES: [f64; 6] = [1.0, 3.75, 15.0, 60.0, 0.25, 7.5];

    #[test]
    fn test_normalize_longitude() {
        assert_eq!(normalize_longitude(0.0), 0.0);
        assert_eq!(normalize_longitude(360.0), 0.0);
        assert_eq!(normalize_longitude(-10.0), 350.0);
        assert_eq!(normalize_longitude(370.0), 10.0);
        assert_eq!(normalize_longitude(-1e-18), 0.0);
    }

    #[test]
    fn test_top_left_corner() {
        assert_eq!(top_left_corner(0.5, 0.5, 1.0), (0.0, 1.0));
        assert_eq!(top_left_corner(-0.5, -0.5, 1.0), (359.0, 0.0));
        assert_eq!(top_left_corner(20.0, 46.0, 15.0), (15.0, 60.0));
        assert_eq!(top_left_corner(360.0, 90.0, 60.0), (0.0, 90.0));
    }

    #[test]
    fn test_top_left_corner_idempotent() {
        let points = [
            (0.0, 90.0),
            (12.34, -56.78),
            (-122.33, 47.6),
            (179.99, -89.99),
            (359.999, 0.001),
            (190.0, -5.0),
        ];
        for cell in CELL_SIZES {
            for (lon, lat) in points {
                let once = top_left_corner(lon, lat, cell);
                let twice = top_left_corner(once.0, once.1, cell);
                assert_eq!(once, twice, "cell {cell} point ({lon}, {lat})");
            }
        }
    }

    #[test]
    fn test_index_roundtrip_all_indices() {
        for cell in CELL_SIZES {
            let len = grid_width(cell) * grid_height(cell);
            for i in 0..len {
                let (lon, lat) = index_to_corner(i, cell);
                assert_eq!(corner_to_index(lon, lat, cell), Some(i), "cell {cell} index {i}");
            }
        }
    }

    #[test]
    fn test_corner_to_index() {
        assert_eq!(corner_to_index(0.0, 90.0, 15.0), Some(0));
        assert_eq!(corner_to_index(345.0, 90.0, 15.0), Some(23));
        assert_eq!(corner_to_index(0.0, 75.0, 15.0), Some(24));
        // 360 is the same meridian as 0
        assert_eq!(corner_to_index(360.0, 90.0, 15.0), Some(0));
        // Tolerates float noise from the inverse transform
        assert_eq!(corner_to_index(15.0 - 1e-9, 75.0 + 1e-9, 15.0), Some(25));
        // The south pole is a boundary, not a row
        assert_eq!(corner_to_index(0.0, -90.0, 15.0), None);
    }

    #[test]
    fn test_index_to_corner() {
        let (lon, lat) = index_to_corner(97, 3.75);
        assert_relative_eq!(lon, 3.75);
        assert_relative_eq!(lat, 86.25);
    }

    #[test]
    fn test_neighbor_wraps_longitude() {
        assert_eq!(neighbor_index(0, 15.0, -1, 0), Some(23));
        assert_eq!(neighbor_index(23, 15.0, 1, 0), Some(0));
        assert_eq!(neighbor_index(24, 15.0, -1, -1), Some(23));
        assert_eq!(neighbor_index(0, 15.0, 3, 2), Some(51));
    }

    #[test]
    fn test_neighbor_stops_at_poles() {
        assert_eq!(neighbor_index(0, 15.0, 0, -1), None);
        assert_eq!(neighbor_index(5, 15.0, 1, -1), None);
        let last_row = 11 * 24;
        assert_eq!(neighbor_index(last_row, 15.0, 0, 1), None);
        assert_eq!(neighbor_index(last_row, 15.0, 0, -1), Some(last_row - 24));
    }

    #[test]
    fn test_pixel_offset_within_tile() {
        assert_eq!(pixel_offset_within_tile((0.0, 90.0), (0.0, 90.0), 15.0, 513), (0, 0));
        assert_eq!(
            pixel_offset_within_tile((0.0, 90.0), (7.5, 86.25), 15.0, 513),
            (256, 128)
        );
        // Point given with a negative longitude
        assert_eq!(
            pixel_offset_within_tile((345.0, 15.0), (-7.5, 0.0), 15.0, 513),
            (256, 512)
        );
    }
}
