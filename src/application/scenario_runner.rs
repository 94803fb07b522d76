use rand::rngs::StdRng;
use snafu::{ResultExt, Snafu};
use tracing::{error, info};

use crate::filesystem::HarnessLayout;
use crate::notifications::{NotificationError, NotificationReader, Quiescence, QuiescenceError};
use crate::operators::{MutationContext, Operation, OperatorError};
use crate::state::TestState;
use crate::verifier::{Comparison, VerificationError, print_comparison};
use crate::watcher::{WatcherError, WatcherProcess};

use super::fixtures::Fixtures;

pub struct ScenarioRunner<Q> {
    layout: HarnessLayout,
    state: TestState,
    rng: StdRng,
    reader: NotificationReader,
    barrier: Q,
    verbose: bool,
}

impl<Q: Quiescence> ScenarioRunner<Q> {
    pub fn new(fixtures: Fixtures, rng: StdRng, barrier: Q, verbose: bool) -> Self {
        Self {
            reader: NotificationReader::new(fixtures.layout.notify_dir.clone()),
            layout: fixtures.layout,
            state: fixtures.state,
            rng,
            barrier,
            verbose,
        }
    }

    pub async fn run_all(
        &mut self,
        operations: &[Operation],
        watcher: &mut WatcherProcess,
    ) -> Result<(), ScenarioError> {
        for operation in operations {
            self.run_step(operation, watcher).await?;
        }
        info!("All {} operations verified", operations.len());
        Ok(())
    }

    async fn run_step(
        &mut self,
        operation: &Operation,
        watcher: &mut WatcherProcess,
    ) -> Result<(), ScenarioError> {
        let name = operation.to_string();
        info!("Starting {}", name);
        watcher
            .ensure_alive()
            .context(WatcherSnafu { operation: &name })?;

        let mut ctx = MutationContext {
            state: &mut self.state,
            layout: &self.layout,
            rng: &mut self.rng,
        };
        let expected = operation
            .apply(&mut ctx)
            .context(MutationSnafu { operation: &name })?;

        self.barrier.settle().await.context(SettleSnafu)?;
        watcher
            .ensure_alive()
            .context(WatcherSnafu { operation: &name })?;
        let actual = self.reader.collect().context(CollectSnafu)?;

        let comparison = Comparison::new(&expected, &actual);
        println!();
        println!("{name}");
        print_comparison(&comparison, self.verbose);
        let matches = comparison
            .verify()
            .inspect_err(|err| error!("{} failed after {} matches", name, err.matches()))
            .context(VerificationSnafu { operation: &name })?;

        info!("Finished {} with {} matching notifications", name, matches);
        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum ScenarioError {
    #[snafu(display("Watcher is gone during '{}'", operation))]
    WatcherError {
        operation: String,
        source: WatcherError,
    },
    #[snafu(display("Failed to apply '{}'", operation))]
    MutationError {
        operation: String,
        source: OperatorError,
    },
    #[snafu(display("Failed waiting for the watcher to settle"))]
    SettleError { source: QuiescenceError },
    #[snafu(display("Failed to collect notifications"))]
    CollectError { source: NotificationError },
    #[snafu(display("Notifications for '{}' do not match", operation))]
    VerificationError {
        operation: String,
        source: VerificationError,
    },
}
