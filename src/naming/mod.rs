//! Sequenced entry names (`file00000001_xxx`, `dir00000001_xxx`) used for
//! every file and directory the operators create.

mod sequenced_name;

pub use sequenced_name::{EntryKind, SequencedName, next_sequenced_name};
