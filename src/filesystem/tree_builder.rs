use std::fs;
use std::path::{Path, PathBuf};

use snafu::{OptionExt, ResultExt, Snafu};
use tracing::debug;

use crate::ext::PathReportExt;

const MAX_TREE_SIZE: usize = 1 << 20;

/// Builds a `width`-ary directory tree of depth `height` below `parent`.
///
/// Directory names encode the route from the root, so the tree
///
/// ```text
///      p_0          p_1
///     /   \        /   \
///  p_00   p_01  p_10   p_11
/// ```
///
/// is produced for prefix `p`, height 2 and width 2. Paths are returned in
/// pre-order: every directory precedes its children.
pub fn build_tree(
    parent: &Path,
    prefix: &str,
    height: usize,
    width: usize,
) -> Result<Vec<PathBuf>, TreeBuildError> {
    let size = expected_tree_size(height, width)
        .filter(|size| *size <= MAX_TREE_SIZE)
        .context(TooLargeSnafu { height, width })?;
    let mut created = Vec::new();
    build_level(parent, prefix, height, width, 0, "", &mut created)?;
    debug!(
        "Built tree '{}' ({} x {}) with {} directories under {}",
        prefix,
        height,
        width,
        size,
        parent.report_display()
    );
    Ok(created)
}

pub fn expected_tree_size(height: usize, width: usize) -> Option<usize> {
    if width <= 1 {
        return Some(height * width);
    }
    let mut level_size = 1usize;
    let mut total = 0usize;
    for _ in 0..height {
        level_size = level_size.checked_mul(width)?;
        total = total.checked_add(level_size)?;
    }
    Some(total)
}

fn build_level(
    parent: &Path,
    prefix: &str,
    height: usize,
    width: usize,
    depth: usize,
    route: &str,
    created: &mut Vec<PathBuf>,
) -> Result<(), TreeBuildError> {
    // The route string is not a depth counter once width exceeds ten.
    if depth >= height {
        return Ok(());
    }

    for child in 0..width {
        let child_route = format!("{route}{child}");
        let path = parent.join(format!("{prefix}_{child_route}"));
        fs::create_dir(&path).context(CreateDirSnafu { path: path.clone() })?;
        created.push(path.clone());
        build_level(&path, prefix, height, width, depth + 1, &child_route, created)?;
    }

    Ok(())
}

#[derive(Debug, Snafu)]
pub enum TreeBuildError {
    #[snafu(display("Failed to create tree directory {}", path.report_display()))]
    CreateDirError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "Tree of height {} and width {} exceeds {} directories",
        height,
        width,
        MAX_TREE_SIZE
    ))]
    TooLarge { height: usize, width: usize },
}
