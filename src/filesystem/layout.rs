use std::fs;
use std::path::{Path, PathBuf};

use snafu::{ResultExt, Snafu};
use tracing::{debug, info};

use crate::ext::PathReportExt;

pub const CONTROL_DIR_NAME: &str = "control";

const CONFIG_FILE_NAME: &str = "config.txt";
const EXCLUDE_FILE_NAME: &str = "exclude.txt";
const NOTIFY_DIR_NAME: &str = "fs_notify";
const DATA_DIR_NAME: &str = "data";
const OUT_OF_BOUNDS_DIR_NAME: &str = "out_of_bounds";

/// Scratch layout of a single harness run:
///
/// ```text
/// <test_dir>/control/config.txt
/// <test_dir>/control/exclude.txt
/// <test_dir>/control/fs_notify/
/// <test_dir>/data/out_of_bounds/
/// ```
#[derive(Debug, Clone)]
pub struct HarnessLayout {
    pub test_dir: PathBuf,
    pub control_dir: PathBuf,
    pub config_path: PathBuf,
    pub exclude_path: PathBuf,
    pub notify_dir: PathBuf,
    pub data_root: PathBuf,
    pub out_of_bounds_dir: PathBuf,
}

impl HarnessLayout {
    pub fn new(test_dir: &Path) -> Result<Self, LayoutError> {
        let test_dir = std::path::absolute(test_dir).context(AbsolutePathSnafu {
            path: test_dir.to_path_buf(),
        })?;
        let control_dir = test_dir.join(CONTROL_DIR_NAME);
        let data_root = test_dir.join(DATA_DIR_NAME);

        Ok(Self {
            config_path: control_dir.join(CONFIG_FILE_NAME),
            exclude_path: control_dir.join(EXCLUDE_FILE_NAME),
            notify_dir: control_dir.join(NOTIFY_DIR_NAME),
            out_of_bounds_dir: data_root.join(OUT_OF_BOUNDS_DIR_NAME),
            control_dir,
            data_root,
            test_dir,
        })
    }

    pub fn create(&self) -> Result<(), LayoutError> {
        if self.test_dir.exists() {
            info!(
                "Removing previous test directory {}",
                self.test_dir.report_display()
            );
            fs::remove_dir_all(&self.test_dir).context(RemoveSnafu {
                path: self.test_dir.clone(),
            })?;
        }

        for dir in [
            &self.test_dir,
            &self.control_dir,
            &self.notify_dir,
            &self.data_root,
            &self.out_of_bounds_dir,
        ] {
            debug!("Creating {}", dir.display());
            fs::create_dir(dir).context(CreateSnafu { path: dir.clone() })?;
        }

        Ok(())
    }

    pub fn top_level_path(&self, name: &str) -> PathBuf {
        if name == CONTROL_DIR_NAME {
            self.control_dir.clone()
        } else {
            self.data_root.join(name)
        }
    }

    pub fn write_config(&self, top_level_dirs: &[PathBuf]) -> Result<(), LayoutError> {
        write_path_list(&self.config_path, top_level_dirs.iter())
    }

    pub fn write_exclude(&self, excluded: &[PathBuf]) -> Result<(), LayoutError> {
        write_path_list(
            &self.exclude_path,
            std::iter::once(&self.control_dir).chain(excluded.iter()),
        )
    }
}

fn write_path_list<'a>(
    path: &Path,
    entries: impl Iterator<Item = &'a PathBuf>,
) -> Result<(), LayoutError> {
    let contents = entries
        .map(|entry| format!("{}\n", entry.display()))
        .collect::<String>();
    debug!("Writing {}:\n{}", path.display(), contents);
    fs::write(path, contents).context(WriteSnafu {
        path: path.to_path_buf(),
    })
}

#[derive(Debug, Snafu)]
pub enum LayoutError {
    #[snafu(display("Cannot resolve test directory {}", path.display()))]
    AbsolutePathError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to remove {}", path.report_display()))]
    RemoveError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to create {}", path.report_display()))]
    CreateError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to write {}", path.report_display()))]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
}
