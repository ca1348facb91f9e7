//! Edge reconciliation between neighbouring tiles.
//!
//! Adjacent tiles overlap by one sample: the last column of a tile is the
//! same meridian as the first column of its eastern neighbour, and likewise
//! for rows. Builds produce slightly different values for those shared
//! samples, so after a level is built every tile is visited once and its
//! shared corners and edges are replaced by the average of the tiles that
//! hold them.
//!
//! Visiting a tile rewrites samples of its neighbours too, so a later visit
//! can move samples an earlier one already settled. The sweep order is
//! therefore fixed (ascending grid index) and the result depends on it.

use crate::border::{Side, TileBorder};
use crate::level::TileKey;
use crate::store::TileStore;
use crate::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// How the shared corner sample is averaged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CornerAveraging {
    /// Sum of the present tiles divided by 4, whatever their number.
    /// Only the divisor follows existing datasets: corners where the base
    /// tile is alone are still left untouched.
    #[default]
    FixedFour,
    /// Sum of the present tiles divided by their number.
    PresentTiles,
}

/// Reconciliation settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconcilePolicy {
    /// Corner divisor rule.
    pub corners: CornerAveraging,
    /// Disagreements above this many metres are logged as warnings.
    pub disagreement_warn: i32,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            corners: CornerAveraging::FixedFour,
            disagreement_warn: 100,
        }
    }
}

/// What one reconciliation visit changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Samples rewritten across all tiles of the neighbourhood.
    pub adjusted: usize,
    /// Largest spread between values that should have been equal.
    pub max_disagreement: i32,
    /// Tiles whose samples changed.
    pub tiles_changed: usize,
}

/// Offsets of the nine neighbourhood slots, row-major from north-west.
pub const OFFSETS: [(i64, i64); 9] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (0, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

const CENTER: usize = 4;

fn slot(dx: i64, dy: i64) -> usize {
    ((dy + 1) * 3 + dx + 1) as usize
}

/// Border lines a tile at `(dx, dy)` from the base shares with it.
///
/// The base needs all four; a neighbour only needs the line facing the
/// base, which also holds any corner it shares.
pub fn facing_sides(dx: i64, dy: i64) -> &'static [Side] {
    match (dx, dy) {
        (0, 0) => &Side::ALL,
        (_, -1) => &[Side::South],
        (_, 1) => &[Side::North],
        (-1, _) => &[Side::East],
        _ => &[Side::West],
    }
}

/// The borders of a tile and its eight neighbours, each present or not.
#[derive(Debug, Clone)]
pub struct Neighborhood {
    tiles: [Option<TileBorder>; 9],
}

impl Neighborhood {
    /// Neighbourhood around `base` with no neighbours loaded.
    pub fn new(base: TileBorder) -> Self {
        let mut tiles: [Option<TileBorder>; 9] = Default::default();
        tiles[CENTER] = Some(base);
        Self { tiles }
    }

    /// Place the neighbour `dx` columns east and `dy` rows south.
    ///
    /// All tiles must have the base tile's size.
    pub fn insert(&mut self, dx: i64, dy: i64, tile: TileBorder) {
        debug_assert!((dx, dy) != (0, 0));
        self.tiles[slot(dx, dy)] = Some(tile);
    }

    /// Tile at an offset, if present.
    pub fn get(&self, dx: i64, dy: i64) -> Option<&TileBorder> {
        self.tiles[slot(dx, dy)].as_ref()
    }

    /// The base tile.
    pub fn base(&self) -> &TileBorder {
        match &self.tiles[CENTER] {
            Some(tile) => tile,
            None => unreachable!("neighbourhood always holds its base tile"),
        }
    }

    /// Whether the tile at an offset was modified.
    pub fn is_dirty(&self, dx: i64, dy: i64) -> bool {
        self.get(dx, dy).is_some_and(TileBorder::is_dirty)
    }

    /// Consume the neighbourhood, yielding `(dx, dy, tile)` for every
    /// present tile.
    pub fn into_tiles(self) -> impl Iterator<Item = (i64, i64, TileBorder)> {
        self.tiles
            .into_iter()
            .zip(OFFSETS)
            .filter_map(|(tile, (dx, dy))| tile.map(|t| (dx, dy, t)))
    }

    fn size(&self) -> usize {
        self.base().size()
    }

    fn sample(&self, s: usize, x: usize, y: usize) -> Option<i16> {
        self.tiles[s].as_ref().and_then(|t| t.get(x, y))
    }

    fn write(&mut self, s: usize, x: usize, y: usize, value: i16, stats: &mut ReconcileStats) {
        if let Some(tile) = self.tiles[s].as_mut() {
            if tile.set(x, y, value) {
                stats.adjusted += 1;
            }
        }
    }

    /// Average the shared corners and edges of the base tile.
    ///
    /// Corners are visited NW, NE, SW, SE, then edges N, S, W, E. A corner
    /// is only touched when at least one other tile meets there; an edge
    /// only when the neighbour across it is present.
    pub fn reconcile(&mut self, corners: CornerAveraging) -> ReconcileStats {
        let mut stats = ReconcileStats::default();
        let last = self.size() - 1;

        for (cdx, cdy) in [(-1, -1), (1, -1), (-1, 1), (1, 1)] {
            self.reconcile_corner(cdx, cdy, last, corners, &mut stats);
        }
        for (dx, dy) in [(0, -1), (0, 1), (-1, 0), (1, 0)] {
            self.reconcile_edge(dx, dy, last, &mut stats);
        }

        stats.tiles_changed = self.tiles.iter().flatten().filter(|t| t.is_dirty()).count();
        stats
    }

    fn reconcile_corner(
        &mut self,
        cdx: i64,
        cdy: i64,
        last: usize,
        mode: CornerAveraging,
        stats: &mut ReconcileStats,
    ) {
        // The corner in base pixel coordinates, then in each member tile.
        let cx = if cdx < 0 { 0 } else { last as i64 };
        let cy = if cdy < 0 { 0 } else { last as i64 };
        let members = [(0, 0), (cdx, 0), (0, cdy), (cdx, cdy)].map(|(ox, oy)| {
            let x = (cx - ox * last as i64) as usize;
            let y = (cy - oy * last as i64) as usize;
            (slot(ox, oy), x, y)
        });

        let values: Vec<i16> = members
            .iter()
            .filter_map(|&(s, x, y)| self.sample(s, x, y))
            .collect();
        if values.len() < 2 {
            return;
        }

        let sum: f64 = values.iter().map(|&v| f64::from(v)).sum();
        let divisor = match mode {
            CornerAveraging::FixedFour => 4.0,
            CornerAveraging::PresentTiles => values.len() as f64,
        };
        let value = round_half_up(sum / divisor);
        note_disagreement(&values, stats);
        debug!("Corner ({}, {}): {:?} -> {}", cdx, cdy, values, value);

        for (s, x, y) in members {
            self.write(s, x, y, value, stats);
        }
    }

    fn reconcile_edge(&mut self, dx: i64, dy: i64, last: usize, stats: &mut ReconcileStats) {
        let neighbor = slot(dx, dy);
        if self.tiles[neighbor].is_none() {
            return;
        }

        // (base x, base y, neighbour x, neighbour y) for the k-th sample
        let position = |k: usize| match (dx, dy) {
            (0, -1) => (k, 0, k, last),
            (0, 1) => (k, last, k, 0),
            (-1, 0) => (0, k, last, k),
            _ => (last, k, 0, k),
        };

        let mut spread = 0i32;
        for k in 1..last {
            let (bx, by, nx, ny) = position(k);
            let (Some(a), Some(b)) = (self.sample(CENTER, bx, by), self.sample(neighbor, nx, ny))
            else {
                continue;
            };
            spread = spread.max((i32::from(a) - i32::from(b)).abs());
            let value = round_half_up((f64::from(a) + f64::from(b)) / 2.0);
            self.write(CENTER, bx, by, value, stats);
            self.write(neighbor, nx, ny, value, stats);
        }
        stats.max_disagreement = stats.max_disagreement.max(spread);
    }
}

fn round_half_up(v: f64) -> i16 {
    (v + 0.5)
        .floor()
        .clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
}

fn note_disagreement(values: &[i16], stats: &mut ReconcileStats) {
    let (min, max) = values
        .iter()
        .fold((i16::MAX, i16::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    stats.max_disagreement = stats
        .max_disagreement
        .max(i32::from(max) - i32::from(min));
}

/// Reconcile one tile of the store against its available neighbours and
/// write back every border that changed.
///
/// Only border lines are read and written. Returns `Ok(None)` when the
/// tile itself is not available.
pub fn reconcile_tile(
    store: &TileStore,
    key: TileKey,
    policy: &ReconcilePolicy,
) -> Result<Option<ReconcileStats>> {
    let Some(base) = store.read_border(key, facing_sides(0, 0))? else {
        return Ok(None);
    };

    let mut hood = Neighborhood::new(base);
    for (dx, dy) in OFFSETS {
        if (dx, dy) == (0, 0) {
            continue;
        }
        let Some(neighbor) = key.neighbor(dx, dy) else {
            continue;
        };
        if let Some(tile) = store.read_border(neighbor, facing_sides(dx, dy))? {
            hood.insert(dx, dy, tile);
        }
    }

    let stats = hood.reconcile(policy.corners);
    if stats.max_disagreement > policy.disagreement_warn {
        warn!(
            "{}: neighbours disagree by {} m at shared samples",
            key, stats.max_disagreement
        );
    }

    for (dx, dy, tile) in hood.into_tiles() {
        if !tile.is_dirty() {
            continue;
        }
        // Offsets with a present tile always resolve to a key
        if let Some(target) = key.neighbor(dx, dy) {
            store.write_border(target, &tile)?;
        }
    }
    debug!(
        "{}: adjusted {} samples in {} tiles",
        key, stats.adjusted, stats.tiles_changed
    );
    Ok(Some(stats))
}
