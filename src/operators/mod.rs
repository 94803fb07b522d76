//! The mutations applied to the watched forest. Each one reports the set of
//! directories the watcher should notify about.

mod directory_ops;
mod file_ops;
mod operation;
mod tree_ops;

pub use operation::{MutationContext, Operation, OperatorError};
