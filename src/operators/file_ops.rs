use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use snafu::ResultExt;
use tracing::debug;

use crate::naming::{EntryKind, SequencedName, next_sequenced_name};
use crate::state::DirectorySet;

use super::operation::{
    CreateFileSnafu, MutationContext, OperatorError, RemoveFileSnafu, RenameSnafu, ScanSnafu,
    choose,
};

/// Creates one new sequenced file in every tracked directory.
pub fn add_file(ctx: &mut MutationContext<'_>) -> Result<DirectorySet, OperatorError> {
    let mut expected = DirectorySet::new();

    for dir in ctx.state.tracked_directories() {
        let name =
            next_sequenced_name(&dir, EntryKind::File).context(ScanSnafu { path: dir.clone() })?;
        let path = dir.join(name.render_random(ctx.rng));
        fs::File::create(&path).context(CreateFileSnafu { path })?;
        expected.insert(dir);
    }

    debug!("Added a file to {} directories", expected.len());
    Ok(expected)
}

/// Removes the first regular file found in every tracked directory.
/// Directories without files are skipped and not expected to be reported.
pub fn delete_file(ctx: &mut MutationContext<'_>) -> Result<DirectorySet, OperatorError> {
    let mut expected = DirectorySet::new();

    for dir in ctx.state.tracked_directories() {
        if delete_one_file(&dir)? {
            expected.insert(dir);
        }
    }

    debug!("Deleted a file from {} directories", expected.len());
    Ok(expected)
}

fn delete_one_file(dir: &Path) -> Result<bool, OperatorError> {
    let entries = fs::read_dir(dir).context(ScanSnafu { path: dir })?;
    for entry in entries {
        let entry = entry.context(ScanSnafu { path: dir })?;
        let file_type = entry.file_type().context(ScanSnafu { path: entry.path() })?;
        if file_type.is_file() {
            let path = entry.path();
            fs::remove_file(&path).context(RemoveFileSnafu { path })?;
            return Ok(true);
        }
    }
    Ok(false)
}

/// Moves one file out of the watched forest, then moves another one between
/// two distinct original directories.
pub fn move_file(ctx: &mut MutationContext<'_>) -> Result<DirectorySet, OperatorError> {
    let mut expected = DirectorySet::new();
    let originals = ctx.state.original_directories().to_vec();

    let (source_dir, file_name) = select_random_file(&originals, ctx.rng)?;
    let destination = ctx.layout.out_of_bounds_dir.join(&file_name);
    rename(&source_dir.join(&file_name), &destination)?;
    expected.insert(source_dir);

    let (source_dir, file_name) = select_random_file(&originals, ctx.rng)?;
    let destinations = originals
        .iter()
        .filter(|dir| **dir != source_dir)
        .cloned()
        .collect::<Vec<_>>();
    let destination_dir = choose(&destinations, ctx.rng, "destination directory")?.clone();
    rename(&source_dir.join(&file_name), &destination_dir.join(&file_name))?;
    expected.insert(source_dir);
    expected.insert(destination_dir);

    Ok(expected)
}

fn select_random_file(
    dirs: &[PathBuf],
    rng: &mut StdRng,
) -> Result<(PathBuf, String), OperatorError> {
    let mut candidates = Vec::new();
    for dir in dirs {
        let files = sequenced_files(dir)?;
        if !files.is_empty() {
            candidates.push((dir.clone(), files));
        }
    }

    let (dir, files) = choose(&candidates, rng, "original directory holding a file")?;
    let file_name = choose(files, rng, "file")?;
    Ok((dir.clone(), file_name.clone()))
}

fn sequenced_files(dir: &Path) -> Result<Vec<String>, OperatorError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).context(ScanSnafu { path: dir })? {
        let entry = entry.context(ScanSnafu { path: dir })?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if SequencedName::matches(EntryKind::File, &name) {
            names.push(name);
        }
    }
    // Directory order is filesystem dependent; sort so seeded runs repeat.
    names.sort();
    Ok(names)
}

fn rename(from: &Path, to: &Path) -> Result<(), OperatorError> {
    debug!("Moving {} to {}", from.display(), to.display());
    fs::rename(from, to).context(RenameSnafu { from, to })
}
