//! Command execution.

use crate::cli::{Cli, Command};
use crate::config::PipelineConfig;
use crate::error::Result;
use pyramid_dem::{Level, Lod, Pipeline, SweepSummary, TileStore};
use tracing::info;

/// Resolve the configuration: file (or defaults), then command-line
/// overrides.
pub fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(base_dir) = &cli.base_dir {
        config.base_dir = base_dir.clone();
    }
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    if let Some(fine_in_flight) = cli.fine_in_flight {
        config.fine_in_flight = fine_in_flight;
    }
    Ok(config)
}

/// Run the selected command to completion.
pub fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;

    if let Command::Locate { lod, lon, lat } = cli.command {
        return locate(lod, lon, lat);
    }

    let store = TileStore::open(&config.layout())?;
    if let Command::Status = cli.command {
        status(&store);
        return Ok(());
    }

    let mut pipeline = Pipeline::new(store, config.options())?;
    let summary: SweepSummary = match &cli.command {
        Command::BuildFromSource { area } => pipeline.build_from_source(area.target())?,
        Command::BuildFromFiner { level, area } => {
            pipeline.build_from_finer((*level).into(), area.target())?
        }
        Command::Reconcile { level, area } => pipeline.reconcile((*level).into(), area.target())?,
        Command::Locate { .. } | Command::Status => return Ok(()),
    };
    info!("Done: {}", summary);
    Ok(())
}

fn locate(lod: u8, lon: f64, lat: f64) -> Result<()> {
    let location = Lod::new(lod)?.locate(lon, lat)?;
    let (tl_lon, tl_lat) = location.key.corner();
    let name = location.key.level.codec().encode(tl_lon, tl_lat);
    println!("tile:   {} ({})", location.key, name);
    println!("pixel:  x={} y={}", location.x, location.y);
    println!("skip:   {}", location.skip);
    Ok(())
}

fn status(store: &TileStore) {
    for level in Level::ALL {
        let table = store.table(level);
        println!(
            "{:<8} {:>6} / {:<6} {}",
            level.label(),
            table.count(),
            level.grid_len(),
            store.level_dir(level).display()
        );
    }
}
