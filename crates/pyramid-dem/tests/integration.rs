//! Integration tests for pyramid-dem on synthetic level directories.
//!
//! Every test builds its own store in a temporary directory, so nothing
//! outside the test is read or written.

use pyramid_dem::{
    compose_from_source, CornerAveraging, Level, Pipeline, PipelineOptions, Raster,
    ReconcilePolicy, StoreLayout, Target, TileKey, TileStore,
};
use tempfile::TempDir;

fn new_layout() -> (TempDir, StoreLayout) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let layout = StoreLayout::new(dir.path());
    std::fs::create_dir_all(layout.level_dir(Level::Srtm)).expect("Failed to create source dir");
    (dir, layout)
}

/// Write a tile under its canonical name, bypassing the store.
fn put_tile(layout: &StoreLayout, key: TileKey, raster: &Raster) {
    let (lon, lat) = key.corner();
    let dir = layout.level_dir(key.level);
    std::fs::create_dir_all(&dir).unwrap();
    let name = key.level.codec().encode(lon, lat);
    raster.write_hgt(dir.join(name)).expect("Failed to write tile");
}

fn pipeline(layout: &StoreLayout, options: PipelineOptions) -> Pipeline {
    let store = TileStore::open(layout).expect("Failed to open store");
    Pipeline::new(store, options).expect("Failed to create pipeline")
}

fn key(level: Level, index: usize) -> TileKey {
    TileKey::new(level, index).unwrap()
}

#[test]
fn test_coarse_from_uniform_medium() {
    let (_dir, layout) = new_layout();
    // Coarse tile 0 covers Medium columns 0-3 of rows 0-3
    for row in 0..4 {
        for col in 0..4 {
            put_tile(&layout, key(Level::Medium, row * 24 + col), &Raster::filled(513, 250));
        }
    }

    let mut pipeline = pipeline(&layout, PipelineOptions::default());
    let summary = pipeline
        .build_from_finer(Level::Coarse, Target::Tile { lon: 1.0, lat: 89.0 })
        .unwrap();
    assert_eq!(summary.visited, 1);
    assert_eq!(summary.written, 1);

    let coarse = key(Level::Coarse, 0);
    assert_eq!(pipeline.store().file_name(coarse), Some("N90,00_E000,00.hgt"));
    let tile = pipeline.store().read_tile(coarse).unwrap().unwrap();
    assert_eq!(tile.size(), 65);
    assert!(tile.samples().iter().all(|&s| s == 250));
}

#[test]
fn test_no_finer_tiles_writes_nothing() {
    let (_dir, layout) = new_layout();
    // A Medium tile far away from Coarse tile 1
    put_tile(&layout, key(Level::Medium, 200), &Raster::filled(513, 7));

    let mut pipeline = pipeline(&layout, PipelineOptions::default());
    let summary = pipeline
        .build_from_finer(Level::Coarse, Target::Tile { lon: 70.0, lat: 80.0 })
        .unwrap();
    assert_eq!(summary.written, 0);
    assert_eq!(summary.skipped, 1);

    assert!(!pipeline.store().is_available(key(Level::Coarse, 1)));
    let files = std::fs::read_dir(layout.level_dir(Level::Coarse)).unwrap().count();
    assert_eq!(files, 0);
}

#[test]
fn test_partial_coverage_is_sea_level() {
    let (_dir, layout) = new_layout();
    put_tile(&layout, key(Level::Medium, 0), &Raster::filled(513, 250));

    let mut pipeline = pipeline(&layout, PipelineOptions::default());
    pipeline
        .build_from_finer(Level::Coarse, Target::WholeEarth)
        .unwrap();

    let tile = pipeline
        .store()
        .read_tile(key(Level::Coarse, 0))
        .unwrap()
        .unwrap();
    assert_eq!(tile.get(0, 0), 250);
    assert_eq!(tile.get(15, 15), 250);
    // The shared column is overwritten by the next (empty) block
    assert_eq!(tile.get(16, 0), 0);
    assert_eq!(tile.get(40, 40), 0);
}

#[test]
fn test_whole_earth_counts() {
    let (_dir, layout) = new_layout();
    put_tile(&layout, key(Level::Medium, 0), &Raster::filled(513, 1));
    // Medium column 23 belongs to Coarse column 5
    put_tile(&layout, key(Level::Medium, 23), &Raster::filled(513, 1));

    let mut pipeline = pipeline(&layout, PipelineOptions::default());
    let summary = pipeline
        .build_from_finer(Level::Coarse, Target::WholeEarth)
        .unwrap();
    assert_eq!(summary.visited, 18);
    assert_eq!(summary.written, 2);
    assert_eq!(summary.skipped, 16);

    // A fresh scan sees the written tiles
    let reopened = TileStore::open(&layout).unwrap();
    assert_eq!(reopened.table(Level::Coarse).count(), 2);
    assert!(reopened.is_available(key(Level::Coarse, 5)));
}

#[test]
fn test_fine_from_single_source_tile() {
    let (_dir, layout) = new_layout();
    // Raw tile whose top-left corner is (0, 90), named by its lower-left corner
    let source = key(Level::Srtm, 0);
    put_tile(&layout, source, &Raster::filled(1201, 500));
    assert!(layout.level_dir(Level::Srtm).join("N89E000.hgt").exists());

    let options = PipelineOptions {
        workers: 2,
        fine_in_flight: 1,
        ..Default::default()
    };
    let mut pipeline = pipeline(&layout, options);
    let summary = pipeline
        .build_from_source(Target::Tile { lon: 0.5, lat: 89.5 })
        .unwrap();
    assert_eq!(summary.written, 1);

    let fine = pipeline
        .store()
        .read_tile(key(Level::Fine, 0))
        .unwrap()
        .unwrap();
    assert_eq!(fine.size(), 4097);
    // One degree of 3.75 is a little over a quarter of the tile
    assert_eq!(fine.get(0, 0), 500);
    assert_eq!(fine.get(300, 300), 500);
    assert_eq!(fine.get(4000, 4000), 0);
    assert_eq!(fine.get(4096, 0), 0);
}

#[test]
fn test_missing_source_block_clears_shared_border() {
    let (_dir, layout) = new_layout();
    put_tile(&layout, key(Level::Srtm, 0), &Raster::filled(1201, 500));
    let store = TileStore::open(&layout).unwrap();

    let assembled = compose_from_source(&store, 0).unwrap().unwrap();
    assert_eq!(assembled.size(), 4501);
    assert_eq!(assembled.get(1199, 0), 500);
    assert_eq!(assembled.get(1199, 1199), 500);
    // Blocks from the absent neighbours are pasted after the last present one
    assert_eq!(assembled.get(1200, 0), 0);
    assert_eq!(assembled.get(0, 1200), 0);
    assert_eq!(assembled.get(1201, 0), 0);
}

#[test]
fn test_source_assembly_across_files_with_offset() {
    let (_dir, layout) = new_layout();
    put_tile(&layout, key(Level::Srtm, 3), &Raster::filled(1201, 3));
    put_tile(&layout, key(Level::Srtm, 4), &Raster::filled(1201, 4));
    put_tile(&layout, key(Level::Srtm, 363), &Raster::filled(1201, 7));
    let store = TileStore::open(&layout).unwrap();

    // Fine#1 starts three quarter degrees into Srtm#3
    let assembled = compose_from_source(&store, 1).unwrap().unwrap();
    assert_eq!(assembled.get(150, 150), 3);
    assert_eq!(assembled.get(300, 150), 4);
    assert_eq!(assembled.get(600, 150), 4);
    assert_eq!(assembled.get(1450, 150), 4);
    assert_eq!(assembled.get(1500, 150), 0);
    // Every block row switches between files and back again
    assert_eq!(assembled.get(150, 1199), 3);
    assert_eq!(assembled.get(600, 1199), 4);
    for y in [1200, 1300, 2399] {
        assert_eq!(assembled.get(150, y), 7);
        assert_eq!(assembled.get(600, y), 0);
    }
}

#[test]
fn test_source_voids_become_fill_value() {
    let (_dir, layout) = new_layout();
    put_tile(&layout, key(Level::Srtm, 0), &Raster::filled(1201, pyramid_dem::SRTM_NO_DATA));

    let mut pipeline = pipeline(&layout, PipelineOptions::default());
    pipeline
        .build_from_source(Target::Tile { lon: 0.5, lat: 89.5 })
        .unwrap();

    let fine = pipeline
        .store()
        .read_tile(key(Level::Fine, 0))
        .unwrap()
        .unwrap();
    assert_eq!(fine.get(100, 100), 10);
    assert!(fine.samples().iter().all(|&s| s > -1000 && s < 9000));
}

#[test]
fn test_reconcile_present_tiles() {
    let (_dir, layout) = new_layout();
    put_tile(&layout, key(Level::Coarse, 0), &Raster::filled(65, 100));
    put_tile(&layout, key(Level::Coarse, 1), &Raster::filled(65, 300));

    let options = PipelineOptions {
        reconcile: ReconcilePolicy {
            corners: CornerAveraging::PresentTiles,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut pipeline = pipeline(&layout, options);
    let summary = pipeline.reconcile(Level::Coarse, Target::WholeEarth).unwrap();
    assert_eq!(summary.visited, 18);
    assert_eq!(summary.skipped, 16);
    assert_eq!(summary.written, 2);

    let west = pipeline.store().read_tile(key(Level::Coarse, 0)).unwrap().unwrap();
    let east = pipeline.store().read_tile(key(Level::Coarse, 1)).unwrap().unwrap();
    for y in 0..65 {
        assert_eq!(west.get(64, y), 200, "row {y}");
        assert_eq!(east.get(0, y), 200, "row {y}");
    }
    assert_eq!(west.get(63, 10), 100);
    assert_eq!(east.get(1, 10), 300);

    // Already consistent: nothing left to write
    let again = pipeline.reconcile(Level::Coarse, Target::WholeEarth).unwrap();
    assert_eq!(again.written, 0);
}

#[test]
fn test_reconcile_rewrites_only_borders() {
    let (_dir, layout) = new_layout();
    let data = (0..65 * 65).map(|v| (v % 997) as i16).collect();
    let west = Raster::from_vec(65, data).unwrap();
    put_tile(&layout, key(Level::Coarse, 0), &west);
    put_tile(&layout, key(Level::Coarse, 1), &Raster::filled(65, 2000));

    let options = PipelineOptions {
        reconcile: ReconcilePolicy {
            corners: CornerAveraging::PresentTiles,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut pipeline = pipeline(&layout, options);
    pipeline
        .reconcile(Level::Coarse, Target::Tile { lon: 1.0, lat: 89.0 })
        .unwrap();

    let path = pipeline.store().tile_path(key(Level::Coarse, 0)).unwrap();
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 65 * 65 * 2);
    let after = pipeline.store().read_tile(key(Level::Coarse, 0)).unwrap().unwrap();
    for y in 0..65 {
        for x in 0..64 {
            assert_eq!(after.get(x, y), west.get(x, y), "({x}, {y})");
        }
        let shared = (i32::from(west.get(64, y)) + 2000 + 1) / 2;
        assert_eq!(i32::from(after.get(64, y)), shared, "row {y}");
    }
}

#[test]
fn test_reconcile_fixed_four_is_order_dependent() {
    let (_dir, layout) = new_layout();
    put_tile(&layout, key(Level::Coarse, 0), &Raster::filled(65, 100));
    put_tile(&layout, key(Level::Coarse, 1), &Raster::filled(65, 300));

    let mut pipeline = pipeline(&layout, PipelineOptions::default());
    pipeline.reconcile(Level::Coarse, Target::WholeEarth).unwrap();

    let west = pipeline.store().read_tile(key(Level::Coarse, 0)).unwrap().unwrap();
    let east = pipeline.store().read_tile(key(Level::Coarse, 1)).unwrap().unwrap();
    // Tile 0 sets the corner to (100 + 300) / 4 = 100, then tile 1 sees
    // two 100s and sets (100 + 100) / 4 = 50.
    assert_eq!(west.get(64, 0), 50);
    assert_eq!(east.get(0, 0), 50);
    assert_eq!(east.get(0, 64), 50);
    assert_eq!(west.get(64, 32), 200);
}

#[test]
fn test_reconcile_single_tile_target() {
    let (_dir, layout) = new_layout();
    put_tile(&layout, key(Level::Coarse, 0), &Raster::filled(65, 10));
    put_tile(&layout, key(Level::Coarse, 6), &Raster::filled(65, 30));

    let mut pipeline = pipeline(&layout, PipelineOptions::default());
    let summary = pipeline
        .reconcile(Level::Coarse, Target::Tile { lon: 30.0, lat: 10.0 })
        .unwrap();
    assert_eq!(summary.visited, 1);

    // Tile 6 is directly south of tile 0
    let north = pipeline.store().read_tile(key(Level::Coarse, 0)).unwrap().unwrap();
    let south = pipeline.store().read_tile(key(Level::Coarse, 6)).unwrap().unwrap();
    assert_eq!(north.get(20, 64), 20);
    assert_eq!(south.get(20, 0), 20);
}

#[test]
fn test_unsupported_levels() {
    let (_dir, layout) = new_layout();
    let mut pipeline = pipeline(&layout, PipelineOptions::default());
    assert!(pipeline
        .build_from_finer(Level::Fine, Target::WholeEarth)
        .is_err());
    assert!(pipeline.reconcile(Level::Srtm, Target::WholeEarth).is_err());
}
