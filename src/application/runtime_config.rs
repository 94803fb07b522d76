use std::path::PathBuf;

use crate::cli::Cli;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub test_definition: PathBuf,
    pub seed: Option<u64>,
}

impl From<Cli> for RuntimeConfig {
    fn from(cli: Cli) -> Self {
        Self {
            test_definition: cli.test_definition,
            seed: cli.seed,
        }
    }
}
