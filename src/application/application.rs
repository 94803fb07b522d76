use std::path::PathBuf;

use rand::SeedableRng;
use rand::rngs::StdRng;
use snafu::Snafu;
use snafu::prelude::*;
use tracing::{error, info};

use crate::application::RuntimeConfig;
use crate::config::{DefinitionError, TestDefinition};
use crate::ext::PathReportExt;
use crate::notifications::DebounceBarrier;
use crate::watcher::{WatcherError, WatcherProcess};

use super::fixtures::{FixtureError, prepare_fixtures};
use super::scenario_runner::{ScenarioError, ScenarioRunner};

pub struct Application;

impl Application {
    pub async fn run(runtime_config: impl Into<RuntimeConfig>) -> Result<(), ApplicationError> {
        let runtime_config: RuntimeConfig = runtime_config.into();
        let definition = TestDefinition::read(&runtime_config.test_definition)
            .await
            .context(DefinitionSnafu)?;

        let seed = runtime_config
            .seed
            .or(definition.seed)
            .unwrap_or_else(rand::random);
        info!("Using random seed {}", seed);
        let mut rng = StdRng::seed_from_u64(seed);

        let fixtures = prepare_fixtures(&definition, &mut rng).context(FixtureSnafu)?;
        let barrier = DebounceBarrier::new(
            fixtures.layout.notify_dir.clone(),
            definition.settle.clone(),
        );

        let mut watcher = WatcherProcess::start(&definition.executable_path, &fixtures.layout)
            .context(WatcherStartSnafu)?;
        println!();
        println!("dir watcher process is {}", watcher.pid());

        let mut runner = ScenarioRunner::new(fixtures, rng, barrier, definition.verbose);
        let outcome = runner.run_all(&definition.tests, &mut watcher).await;

        // The watcher is stopped whether or not the scenario passed.
        let stopped = watcher.stop().await;
        match &stopped {
            Ok(code) => println!("dir watcher terminated code {:?}", code),
            Err(err) if outcome.is_err() => error!("Failed to stop watcher: {}", err),
            Err(_) => {}
        }

        outcome.context(ScenarioSnafu)?;
        stopped.context(WatcherStopSnafu)?;
        info!("Program terminates normally");
        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered while loading the test definition"))]
    DefinitionError { source: DefinitionError },
    #[snafu(display("Critical failure encountered while preparing fixtures"))]
    FixtureError { source: FixtureError },
    #[snafu(display("Critical failure encountered while starting the watcher"))]
    WatcherStartError { source: WatcherError },
    #[snafu(display("Scenario failed"))]
    ScenarioError { source: ScenarioError },
    #[snafu(display("Critical failure encountered while stopping the watcher"))]
    WatcherStopError { source: WatcherError },
    #[snafu(display("Cannot open log file {}", path.report_display()))]
    #[snafu(visibility(pub))]
    LogFileError {
        path: PathBuf,
        source: std::io::Error,
    },
}
