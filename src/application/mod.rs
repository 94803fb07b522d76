mod application;
pub mod data;
mod fixtures;
mod runtime_config;
mod scenario_runner;

pub use application::{Application, ApplicationError, LogFileSnafu};
pub use runtime_config::RuntimeConfig;
