//! # pyramid-runner
//!
//! Command-line runner for the elevation pyramid. Parses arguments with
//! clap, loads an optional YAML configuration and drives the
//! [`pyramid_dem::Pipeline`].

pub mod cli;
pub mod commands;
pub mod config;
mod error;

pub use cli::{Cli, Command};
pub use commands::{load_config, run};
pub use config::{Directories, PipelineConfig};
pub use error::{Result, RunnerError};
