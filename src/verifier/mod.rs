//! Reconciles the directories a mutation should have caused to be reported
//! with what the watcher reported.

mod comparison;
mod report;

pub use comparison::{Comparison, VerificationError};
pub use report::print_comparison;
