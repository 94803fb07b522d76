mod test_definition;

pub use test_definition::{DefinitionError, ExcludeEntry, TestDefinition, TopLevelDirectory};
