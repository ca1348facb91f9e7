//! Command-line interface definition.

use clap::{Args, Parser, Subcommand, ValueEnum};
use pyramid_dem::{Level, Target};
use std::path::PathBuf;

/// Build and maintain an HGT elevation pyramid.
#[derive(Parser, Debug)]
#[command(name = "hgt-pyramid", version, about)]
pub struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the level directories (overrides the config file)
    #[arg(long, global = true)]
    pub base_dir: Option<PathBuf>,

    /// Build worker threads, 0 for one per core (overrides the config file)
    #[arg(short = 'j', long, global = true)]
    pub workers: Option<usize>,

    /// Fine tiles built at once, about 350 MB each; 0 for no limit
    #[arg(long, global = true)]
    pub fine_in_flight: Option<usize>,

    /// Verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build l09-l13 tiles from the raw SRTM tiles
    BuildFromSource {
        #[command(flatten)]
        area: AreaArgs,
    },

    /// Build l04-l08 or l00-l03 tiles from the next finer level
    BuildFromFiner {
        /// Level to build
        #[arg(short, long, value_enum)]
        level: FinerLevel,

        #[command(flatten)]
        area: AreaArgs,
    },

    /// Average shared tile borders of a built level
    Reconcile {
        /// Level to reconcile
        #[arg(short, long, value_enum, default_value_t = BuiltLevel::Fine)]
        level: BuiltLevel,

        #[command(flatten)]
        area: AreaArgs,
    },

    /// Show which tile and pixel a viewer LOD reads for a coordinate
    Locate {
        /// Level of detail, 0-13
        #[arg(long)]
        lod: u8,

        /// Longitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Latitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
    },

    /// Count available tiles per level
    Status,
}

/// A single tile by coordinate, or the whole Earth when omitted.
#[derive(Args, Debug, Clone, Copy, PartialEq)]
pub struct AreaArgs {
    /// Longitude inside the tile to process
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lon: Option<f64>,

    /// Latitude inside the tile to process
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    pub lat: Option<f64>,
}

impl AreaArgs {
    /// Sweep target selected by the flags.
    pub fn target(&self) -> Target {
        match (self.lon, self.lat) {
            (Some(lon), Some(lat)) => Target::Tile { lon, lat },
            _ => Target::WholeEarth,
        }
    }
}

/// Levels built from a finer pyramid level.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinerLevel {
    /// l04-l08, 15 degree tiles
    Medium,
    /// l00-l03, 60 degree tiles
    Coarse,
}

impl From<FinerLevel> for Level {
    fn from(level: FinerLevel) -> Self {
        match level {
            FinerLevel::Medium => Level::Medium,
            FinerLevel::Coarse => Level::Coarse,
        }
    }
}

/// Levels that can be reconciled.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltLevel {
    /// l09-l13, 3.75 degree tiles
    Fine,
    /// l04-l08, 15 degree tiles
    Medium,
    /// l00-l03, 60 degree tiles
    Coarse,
}

impl From<BuiltLevel> for Level {
    fn from(level: BuiltLevel) -> Self {
        match level {
            BuiltLevel::Fine => Level::Fine,
            BuiltLevel::Medium => Level::Medium,
            BuiltLevel::Coarse => Level::Coarse,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_build_from_finer() {
        let cli = Cli::try_parse_from([
            "hgt-pyramid",
            "build-from-finer",
            "--level",
            "coarse",
            "--lon",
            "-122.3",
            "--lat",
            "47.6",
        ])
        .unwrap();
        match cli.command {
            Command::BuildFromFiner { level, area } => {
                assert_eq!(level, FinerLevel::Coarse);
                assert_eq!(area.target(), Target::Tile { lon: -122.3, lat: 47.6 });
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_whole_earth_and_globals() {
        let cli = Cli::try_parse_from([
            "hgt-pyramid",
            "reconcile",
            "--base-dir",
            "/data",
            "-j",
            "4",
            "--fine-in-flight",
            "2",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.base_dir, Some(PathBuf::from("/data")));
        assert_eq!(cli.workers, Some(4));
        assert_eq!(cli.fine_in_flight, Some(2));
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Reconcile { level, area } => {
                assert_eq!(level, BuiltLevel::Fine);
                assert_eq!(area.target(), Target::WholeEarth);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_lon_requires_lat() {
        assert!(Cli::try_parse_from(["hgt-pyramid", "build-from-source", "--lon", "5"]).is_err());
    }

    #[test]
    fn test_fine_is_not_built_from_finer() {
        assert!(
            Cli::try_parse_from(["hgt-pyramid", "build-from-finer", "--level", "fine"]).is_err()
        );
    }
}
