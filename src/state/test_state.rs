use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use hashlink::LinkedHashMap;
use snafu::Snafu;
use tracing::debug;

pub type DirectorySet = BTreeSet<PathBuf>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedTree {
    pub root: PathBuf,
    pub descendants: Vec<PathBuf>,
}

impl NamedTree {
    fn relocate(&mut self, new_root: PathBuf) {
        self.descendants = self
            .descendants
            .iter()
            .map(|path| match path.strip_prefix(&self.root) {
                Ok(relative) => new_root.join(relative),
                Err(_) => path.clone(),
            })
            .collect();
        self.root = new_root;
    }
}

#[derive(Debug, Default)]
pub struct TestState {
    top_level_directories: Vec<PathBuf>,
    original_directories: Vec<PathBuf>,
    new_directories: Vec<PathBuf>,
    trees: LinkedHashMap<String, NamedTree>,
}

impl TestState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_top_level(&mut self, path: PathBuf) {
        self.top_level_directories.push(path);
    }

    pub fn top_level_directories(&self) -> &[PathBuf] {
        &self.top_level_directories
    }

    pub fn register_original(&mut self, paths: impl IntoIterator<Item = PathBuf>) {
        self.original_directories.extend(paths);
    }

    pub fn original_directories(&self) -> &[PathBuf] {
        &self.original_directories
    }

    pub fn register_new(&mut self, paths: impl IntoIterator<Item = PathBuf>) {
        self.new_directories.extend(paths);
    }

    pub fn unregister_new(&mut self, path: &Path) -> bool {
        match self.new_directories.iter().position(|known| known == path) {
            Some(index) => {
                self.new_directories.remove(index);
                true
            }
            None => {
                debug!("{} was not a tracked new directory", path.display());
                false
            }
        }
    }

    pub fn new_directories(&self) -> &[PathBuf] {
        &self.new_directories
    }

    pub fn tracked_directories(&self) -> Vec<PathBuf> {
        self.original_directories
            .iter()
            .chain(self.new_directories.iter())
            .cloned()
            .collect()
    }

    pub fn register_tree(&mut self, name: &str, tree: NamedTree) -> Result<(), StateError> {
        if self.trees.contains_key(name) {
            return Err(StateError::DuplicateTree {
                tree_name: name.to_string(),
            });
        }
        self.trees.insert(name.to_string(), tree);
        Ok(())
    }

    pub fn tree(&self, name: &str) -> Result<&NamedTree, StateError> {
        self.trees.get(name).ok_or_else(|| StateError::UnknownTree {
            tree_name: name.to_string(),
        })
    }

    pub fn contains_tree(&self, name: &str) -> bool {
        self.trees.contains_key(name)
    }

    pub fn unregister_tree(&mut self, name: &str) -> Result<NamedTree, StateError> {
        self.trees.remove(name).ok_or_else(|| StateError::UnknownTree {
            tree_name: name.to_string(),
        })
    }

    pub fn relocate_tree(&mut self, name: &str, new_root: PathBuf) -> Result<(), StateError> {
        let tree = self
            .trees
            .get_mut(name)
            .ok_or_else(|| StateError::UnknownTree {
                tree_name: name.to_string(),
            })?;
        tree.relocate(new_root);
        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum StateError {
    #[snafu(display("Tree '{}' is not registered", tree_name))]
    UnknownTree { tree_name: String },
    #[snafu(display("Tree '{}' is already registered", tree_name))]
    DuplicateTree { tree_name: String },
}
