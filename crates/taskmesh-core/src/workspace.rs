use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::load_config;

/// A workspace root holding the `changes/`, `reviews/`, `specs/` and `tasks/`
/// collections of one project. Discovering workspaces is left to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Workspace {
    pub path: PathBuf,
    pub project_name: String,
    pub is_root: bool,
}

impl Workspace {
    pub fn new(path: impl Into<PathBuf>, project_name: impl Into<String>, is_root: bool) -> Self {
        Workspace {
            path: path.into(),
            project_name: project_name.into(),
            is_root,
        }
    }

    /// Builds the descriptor for `root`, naming it from `.taskmesh.toml` when
    /// the config sets `project_name`, otherwise from the directory name.
    pub fn from_root(root: &Path, is_root: bool) -> Self {
        let project_name = load_config(root)
            .and_then(|config| config.project_name)
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| project_name_from_dir(root));
        Workspace::new(root, project_name, is_root)
    }

    pub fn tasks_dir(&self) -> PathBuf {
        self.path.join("tasks")
    }
}

fn project_name_from_dir(root: &Path) -> String {
    let resolved = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    resolved
        .file_name()
        .and_then(|segment| segment.to_str())
        .map(|segment| segment.to_string())
        .unwrap_or_else(|| "workspace".to_string())
}
