//! On-disk fixtures: the harness's scratch layout and the synthetic
//! directory trees the watcher observes.

mod layout;
mod tree_builder;

pub use layout::{CONTROL_DIR_NAME, HarnessLayout, LayoutError};
pub use tree_builder::{TreeBuildError, build_tree, expected_tree_size};
