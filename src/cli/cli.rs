use std::path::PathBuf;

use clap::Parser;

use crate::application::data::LogLevel;

/// Runs a scripted conformance scenario against a directory watcher.
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Cli {
    /// The test definition (YAML or JSON)
    pub test_definition: PathBuf,
    #[clap(long, short, default_value = "info", value_enum)]
    pub log_level: LogLevel,

    /// Write logs to this file instead of stderr
    #[clap(long)]
    pub log_file: Option<PathBuf>,

    /// Seed for the random choices, overriding the test definition
    #[clap(long)]
    pub seed: Option<u64>,
}
