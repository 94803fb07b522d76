mod test_state;

pub use test_state::{DirectorySet, NamedTree, StateError, TestState};
