#![allow(clippy::enum_variant_names)]

use std::fs::File;
use std::sync::Mutex;

use clap::Parser as _;
use snafu::ResultExt;
use tracing::debug;

use crate::{
    application::{Application, ApplicationError, LogFileSnafu},
    cli::Cli,
};

mod application;
mod cli;
mod config;
mod ext;
mod filesystem;
mod naming;
mod notifications;
mod operators;
mod state;
mod verifier;
mod watcher;

#[compio::main]
#[snafu::report]
async fn main() -> Result<(), ApplicationError> {
    let cli_args = Cli::parse();
    setup_tracing(&cli_args)?;
    colored::control::set_override(supports_color::on(supports_color::Stream::Stdout).is_some());
    debug!("Parsed CLI arguments: {cli_args:?}");

    Application::run(cli_args).await?;

    Ok(())
}

fn setup_tracing(cli_args: &Cli) -> Result<(), ApplicationError> {
    let Some(level) = cli_args.log_level.to_tracing_level() else {
        return Ok(());
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .without_time()
        .compact();
    match &cli_args.log_file {
        Some(path) => {
            let file = File::create(path).context(LogFileSnafu { path })?;
            subscriber
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => subscriber.with_writer(std::io::stderr).init(),
    }
    Ok(())
}
