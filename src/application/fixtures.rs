use std::fs;
use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use snafu::{OptionExt, ResultExt, Snafu};
use tracing::info;

use crate::config::{ExcludeEntry, TestDefinition, TopLevelDirectory};
use crate::ext::PathReportExt;
use crate::filesystem::{CONTROL_DIR_NAME, HarnessLayout, LayoutError, TreeBuildError, build_tree};
use crate::state::TestState;

pub struct Fixtures {
    pub layout: HarnessLayout,
    pub state: TestState,
}

pub fn prepare_fixtures(
    definition: &TestDefinition,
    rng: &mut StdRng,
) -> Result<Fixtures, FixtureError> {
    let layout = HarnessLayout::new(&definition.test_directory).context(LayoutSnafu)?;
    layout.create().context(LayoutSnafu)?;

    let mut state = TestState::new();
    for TopLevelDirectory {
        name,
        height,
        width,
    } in &definition.top_level_directories
    {
        let path = layout.top_level_path(name);
        if name != CONTROL_DIR_NAME {
            fs::create_dir(&path).context(CreateTopLevelSnafu { path: path.clone() })?;
            let tree = build_tree(&path, name, *height, *width).context(TreeSnafu { name })?;
            info!(
                "Built {} directories under {}",
                tree.len(),
                path.report_display()
            );
            state.register_original(tree);
        }
        state.register_top_level(path);
    }

    let excluded = resolve_excludes(&definition.exclude_directories, &state, rng)?;
    layout.write_exclude(&excluded).context(LayoutSnafu)?;
    layout
        .write_config(state.top_level_directories())
        .context(LayoutSnafu)?;

    Ok(Fixtures { layout, state })
}

fn resolve_excludes(
    entries: &[ExcludeEntry],
    state: &TestState,
    rng: &mut StdRng,
) -> Result<Vec<PathBuf>, FixtureError> {
    entries
        .iter()
        .map(|entry| match entry {
            ExcludeEntry::Random => state
                .top_level_directories()
                .choose(rng)
                .cloned()
                .context(NoTopLevelSnafu),
            ExcludeEntry::Path(path) => Ok(path.clone()),
        })
        .collect()
}

#[derive(Debug, Snafu)]
pub enum FixtureError {
    #[snafu(display("Failed to prepare the harness layout"))]
    LayoutError { source: LayoutError },
    #[snafu(display(
        "Failed to create top-level directory {}",
        path.report_display()
    ))]
    CreateTopLevelError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to build the tree of top-level directory '{}'", name))]
    TreeError {
        name: String,
        source: TreeBuildError,
    },
    #[snafu(display("A random exclude needs at least one top-level directory"))]
    NoTopLevelError,
}

#[cfg(test)]
pub(super) mod tests {
    use rand::SeedableRng;
    use tempfile::TempDir;

    use super::*;
    use crate::notifications::SettleConfig;

    pub fn definition(test_directory: PathBuf) -> TestDefinition {
        TestDefinition {
            test_directory,
            top_level_directories: vec![
                TopLevelDirectory {
                    name: "alpha".into(),
                    height: 2,
                    width: 2,
                },
                TopLevelDirectory {
                    name: CONTROL_DIR_NAME.into(),
                    height: 0,
                    width: 0,
                },
                TopLevelDirectory {
                    name: "beta".into(),
                    height: 1,
                    width: 3,
                },
            ],
            exclude_directories: Vec::new(),
            executable_path: PathBuf::from("watcher"),
            verbose: false,
            seed: None,
            settle: SettleConfig::default(),
            tests: Vec::new(),
        }
    }

    #[test]
    fn test_prepare_fixtures_builds_every_tree() {
        let temp_dir = TempDir::new().unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let fixtures = prepare_fixtures(&definition(temp_dir.path().join("run")), &mut rng)
            .expect("Failed to prepare fixtures");

        let layout = &fixtures.layout;
        assert_eq!(
            fixtures.state.top_level_directories(),
            &[
                layout.data_root.join("alpha"),
                layout.control_dir.clone(),
                layout.data_root.join("beta"),
            ]
        );
        assert_eq!(fixtures.state.original_directories().len(), 6 + 3);
        assert!(fixtures.state.original_directories().iter().all(|dir| dir.is_dir()));

        let config = fs::read_to_string(&layout.config_path).unwrap();
        assert_eq!(config.lines().count(), 3);
        let exclude = fs::read_to_string(&layout.exclude_path).unwrap();
        assert_eq!(exclude, format!("{}\n", layout.control_dir.display()));
    }

    #[test]
    fn test_prepare_fixtures_resolves_excludes() {
        let temp_dir = TempDir::new().unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let mut definition = definition(temp_dir.path().join("run"));
        definition.exclude_directories =
            vec![ExcludeEntry::Random, ExcludeEntry::Path("/elsewhere".into())];

        let fixtures = prepare_fixtures(&definition, &mut rng).unwrap();

        let exclude = fs::read_to_string(&fixtures.layout.exclude_path).unwrap();
        let lines = exclude.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], fixtures.layout.control_dir.display().to_string());
        assert!(
            fixtures
                .state
                .top_level_directories()
                .iter()
                .any(|dir| dir.display().to_string() == lines[1])
        );
        assert_eq!(lines[2], "/elsewhere");
    }

    #[test]
    fn test_random_exclude_without_top_level_fails() {
        let temp_dir = TempDir::new().unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let mut definition = definition(temp_dir.path().join("run"));
        definition.top_level_directories.clear();
        definition.exclude_directories = vec![ExcludeEntry::Random];

        let result = prepare_fixtures(&definition, &mut rng);

        assert!(matches!(result, Err(FixtureError::NoTopLevelError)));
    }
}
