use std::fs;

use snafu::ResultExt;
use tracing::info;

use crate::filesystem::build_tree;
use crate::state::{DirectorySet, NamedTree, StateError};

use super::operation::{
    CreateDirSnafu, InconsistentStateSnafu, MutationContext, OperatorError, RemoveDirSnafu,
    RenameSnafu, TreeSnafu, choose, parent_of,
};

/// Builds a named tree `<parent>/<tree_name>` under a random original
/// directory. Only the chosen parent is expected to be reported.
pub fn add_tree(
    ctx: &mut MutationContext<'_>,
    tree_name: &str,
    height: usize,
    width: usize,
) -> Result<DirectorySet, OperatorError> {
    if ctx.state.contains_tree(tree_name) {
        return Err(StateError::DuplicateTree {
            tree_name: tree_name.to_string(),
        })
        .context(InconsistentStateSnafu);
    }

    let parent = choose(ctx.state.original_directories(), ctx.rng, "original directory")?.clone();
    let root = parent.join(tree_name);
    info!(
        "Adding tree {} ({}, {}) at {}",
        tree_name,
        height,
        width,
        parent.display()
    );

    fs::create_dir(&root).context(CreateDirSnafu { path: root.clone() })?;
    let descendants = build_tree(&root, tree_name, height, width).context(TreeSnafu)?;
    ctx.state
        .register_tree(tree_name, NamedTree { root, descendants })
        .context(InconsistentStateSnafu)?;

    Ok(DirectorySet::from([parent]))
}

/// Deletes a named tree. Every directory that lost a child is expected: the
/// root's parent and the parent of each recorded descendant.
pub fn remove_tree(
    ctx: &mut MutationContext<'_>,
    tree_name: &str,
) -> Result<DirectorySet, OperatorError> {
    let tree = ctx.state.tree(tree_name).context(InconsistentStateSnafu)?;

    let mut expected = DirectorySet::new();
    for path in std::iter::once(&tree.root).chain(tree.descendants.iter()) {
        expected.insert(parent_of(path)?);
    }

    info!("Removing tree {} at {}", tree_name, tree.root.display());
    fs::remove_dir_all(&tree.root).context(RemoveDirSnafu {
        path: tree.root.clone(),
    })?;
    ctx.state
        .unregister_tree(tree_name)
        .context(InconsistentStateSnafu)?;

    Ok(expected)
}

/// Moves a named tree under a random original directory other than its
/// current parent. Both parents are expected.
pub fn move_tree(
    ctx: &mut MutationContext<'_>,
    tree_name: &str,
) -> Result<DirectorySet, OperatorError> {
    let source = ctx
        .state
        .tree(tree_name)
        .context(InconsistentStateSnafu)?
        .root
        .clone();
    let source_parent = parent_of(&source)?;

    let destinations = ctx
        .state
        .original_directories()
        .iter()
        .filter(|dir| **dir != source_parent)
        .cloned()
        .collect::<Vec<_>>();
    let destination_parent = choose(&destinations, ctx.rng, "destination directory")?.clone();
    let destination = destination_parent.join(tree_name);

    info!(
        "Moving tree {} from {} to {}",
        tree_name,
        source_parent.display(),
        destination_parent.display()
    );
    fs::rename(&source, &destination).context(RenameSnafu {
        from: source.clone(),
        to: destination.clone(),
    })?;
    ctx.state
        .relocate_tree(tree_name, destination)
        .context(InconsistentStateSnafu)?;

    Ok(DirectorySet::from([source_parent, destination_parent]))
}
