use std::fs;
use std::path::PathBuf;

use snafu::ResultExt;
use tracing::debug;
use walkdir::WalkDir;

use crate::naming::{EntryKind, SequencedName, next_sequenced_name};
use crate::state::DirectorySet;

use super::operation::{
    CreateDirSnafu, MutationContext, OperatorError, RemoveDirSnafu, ScanSnafu, WalkSnafu,
    parent_of,
};

/// Creates one new sequenced directory in every tracked directory. The new
/// directories become tracked; their parents are what the watcher reports.
pub fn add_directory(ctx: &mut MutationContext<'_>) -> Result<DirectorySet, OperatorError> {
    let mut expected = DirectorySet::new();
    let mut created = Vec::new();

    for dir in ctx.state.tracked_directories() {
        let name = next_sequenced_name(&dir, EntryKind::Directory)
            .context(ScanSnafu { path: dir.clone() })?;
        let path = dir.join(name.render_random(ctx.rng));
        fs::create_dir(&path).context(CreateDirSnafu { path: path.clone() })?;
        created.push(path);
        expected.insert(dir);
    }

    debug!("Created {} new directories", created.len());
    ctx.state.register_new(created);
    Ok(expected)
}

/// Removes every sequenced directory below the top-level directories. The
/// removal of a directory is reported on its parent.
pub fn delete_directory(ctx: &mut MutationContext<'_>) -> Result<DirectorySet, OperatorError> {
    let targets = collect_sequenced_directories(ctx.state.top_level_directories())?;
    let mut expected = DirectorySet::new();

    // Post-order: nested targets go before the directories containing them.
    for target in &targets {
        fs::remove_dir_all(target).context(RemoveDirSnafu {
            path: target.clone(),
        })?;
        expected.insert(parent_of(target)?);
        ctx.state.unregister_new(target);
    }

    debug!("Removed {} directories", targets.len());
    Ok(expected)
}

fn collect_sequenced_directories(roots: &[PathBuf]) -> Result<Vec<PathBuf>, OperatorError> {
    let mut found = Vec::new();

    for root in roots {
        let walker = WalkDir::new(root)
            .min_depth(1)
            .contents_first(true)
            .sort_by_file_name();
        for entry in walker {
            let entry = entry.context(WalkSnafu { path: root.clone() })?;
            if entry.file_type().is_dir()
                && SequencedName::matches(EntryKind::Directory, &entry.file_name().to_string_lossy())
            {
                found.push(entry.into_path());
            }
        }
    }

    Ok(found)
}
