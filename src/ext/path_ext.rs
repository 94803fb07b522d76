use std::path::{Component, Path, PathBuf};

pub trait PathReportExt {
    /// Absolute form for logs and errors. The longest existing prefix is
    /// canonicalized; the part already deleted is appended lexically.
    fn report_display(&self) -> String;

    /// Final path segment, or the whole path when it has none (`/`).
    fn base_name(&self) -> String;
}

impl PathReportExt for Path {
    fn report_display(&self) -> String {
        resolve_existing_prefix(&lexical_absolute(self))
            .display()
            .to_string()
    }

    fn base_name(&self) -> String {
        self.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.display().to_string())
    }
}

impl PathReportExt for PathBuf {
    fn report_display(&self) -> String {
        self.as_path().report_display()
    }

    fn base_name(&self) -> String {
        self.as_path().base_name()
    }
}

fn lexical_absolute(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    absolute
        .components()
        .fold(PathBuf::new(), |mut resolved, component| {
            match component {
                Component::CurDir => {}
                // `pop` keeps the root.
                Component::ParentDir => {
                    resolved.pop();
                }
                other => resolved.push(other),
            }
            resolved
        })
}

fn resolve_existing_prefix(path: &Path) -> PathBuf {
    let mut missing = Vec::new();
    let mut prefix = path;
    loop {
        if let Ok(canonical) = prefix.canonicalize() {
            return missing
                .iter()
                .rev()
                .fold(canonical, |resolved, name| resolved.join(name));
        }
        match (prefix.parent(), prefix.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                prefix = parent;
            }
            _ => return path.to_path_buf(),
        }
    }
}
