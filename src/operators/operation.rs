use std::path::{Path, PathBuf};

use derive_more::Display;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use snafu::{OptionExt, Snafu};

use crate::ext::PathReportExt;
use crate::filesystem::{HarnessLayout, TreeBuildError};
use crate::state::{DirectorySet, StateError, TestState};

use super::{directory_ops, file_ops, tree_ops};

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum Operation {
    #[display("add_file")]
    AddFile,
    #[display("delete_file")]
    DeleteFile,
    #[display("move_file")]
    MoveFile,
    #[display("add_directory")]
    AddDirectory,
    #[display("delete_directory")]
    DeleteDirectory,
    #[display("add_tree({tree_name})")]
    AddTree {
        tree_name: String,
        height: usize,
        width: usize,
    },
    #[display("remove_tree({tree_name})")]
    RemoveTree { tree_name: String },
    #[display("move_tree({tree_name})")]
    MoveTree { tree_name: String },
}

pub struct MutationContext<'a> {
    pub state: &'a mut TestState,
    pub layout: &'a HarnessLayout,
    pub rng: &'a mut StdRng,
}

impl Operation {
    /// Performs the mutation and returns the directories the watcher is
    /// expected to report for it.
    pub fn apply(&self, ctx: &mut MutationContext<'_>) -> Result<DirectorySet, OperatorError> {
        match self {
            Operation::AddFile => file_ops::add_file(ctx),
            Operation::DeleteFile => file_ops::delete_file(ctx),
            Operation::MoveFile => file_ops::move_file(ctx),
            Operation::AddDirectory => directory_ops::add_directory(ctx),
            Operation::DeleteDirectory => directory_ops::delete_directory(ctx),
            Operation::AddTree {
                tree_name,
                height,
                width,
            } => tree_ops::add_tree(ctx, tree_name, *height, *width),
            Operation::RemoveTree { tree_name } => tree_ops::remove_tree(ctx, tree_name),
            Operation::MoveTree { tree_name } => tree_ops::move_tree(ctx, tree_name),
        }
    }
}

/// Uniform choice among `candidates`; an empty list is a precondition failure.
pub(super) fn choose<'c, T>(
    candidates: &'c [T],
    rng: &mut StdRng,
    what: &'static str,
) -> Result<&'c T, OperatorError> {
    candidates.choose(rng).context(NoCandidateSnafu { what })
}

pub(super) fn parent_of(path: &Path) -> Result<PathBuf, OperatorError> {
    path.parent()
        .map(Path::to_path_buf)
        .context(NoParentSnafu { path })
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)))]
pub enum OperatorError {
    #[snafu(display("Failed to list {}", path.report_display()))]
    ScanError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to walk {}", path.report_display()))]
    WalkError {
        path: PathBuf,
        source: walkdir::Error,
    },
    #[snafu(display("Failed to create file {}", path.report_display()))]
    CreateFileError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to remove file {}", path.report_display()))]
    RemoveFileError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to create directory {}", path.report_display()))]
    CreateDirError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to remove directory {}", path.report_display()))]
    RemoveDirError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "Failed to move {} to {}",
        from.report_display(),
        to.report_display()
    ))]
    RenameError {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to build tree"))]
    TreeError { source: TreeBuildError },
    #[snafu(display("Inconsistent test state"))]
    InconsistentState { source: StateError },
    #[snafu(display("No {} to choose from", what))]
    NoCandidate { what: &'static str },
    #[snafu(display("{} has no parent directory", path.display()))]
    NoParent { path: PathBuf },
}

#[cfg(test)]
pub(super) mod test_support {
    use std::fs;

    use rand::SeedableRng;
    use tempfile::TempDir;

    use super::*;
    use crate::filesystem::build_tree;

    pub struct Fixture {
        pub _temp_dir: TempDir,
        pub layout: HarnessLayout,
        pub state: TestState,
        pub rng: StdRng,
    }

    impl Fixture {
        pub fn new(height: usize, width: usize) -> Self {
            let temp_dir = TempDir::new().expect("Failed to create temp directory");
            let layout = HarnessLayout::new(&temp_dir.path().join("run")).unwrap();
            layout.create().expect("Failed to create layout");

            let top = layout.top_level_path("top");
            fs::create_dir(&top).unwrap();
            let mut state = TestState::new();
            state.register_original(build_tree(&top, "top", height, width).unwrap());
            state.register_top_level(top);

            Self {
                _temp_dir: temp_dir,
                layout,
                state,
                rng: StdRng::seed_from_u64(1234),
            }
        }

        pub fn apply(&mut self, operation: &Operation) -> Result<DirectorySet, OperatorError> {
            let mut ctx = MutationContext {
                state: &mut self.state,
                layout: &self.layout,
                rng: &mut self.rng,
            };
            operation.apply(&mut ctx)
        }
    }

    pub fn count_files(dir: &Path) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().unwrap().is_file())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_operation_display_names() {
        assert_eq!(Operation::AddFile.to_string(), "add_file");
        assert_eq!(
            Operation::MoveTree {
                tree_name: "forest".into()
            }
            .to_string(),
            "move_tree(forest)"
        );
    }

    #[test]
    fn test_choose_from_empty_list_fails() {
        let mut rng = StdRng::seed_from_u64(0);
        let empty: Vec<PathBuf> = Vec::new();

        let result = choose(&empty, &mut rng, "original directory");

        assert!(matches!(result, Err(OperatorError::NoCandidate { .. })));
    }

    #[test]
    fn test_parent_of_root_fails() {
        assert!(matches!(
            parent_of(Path::new("/")),
            Err(OperatorError::NoParent { .. })
        ));
        assert_eq!(parent_of(Path::new("/w/a")).unwrap(), PathBuf::from("/w"));
    }
}
