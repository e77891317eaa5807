use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_COMMAND_NAME: &str = "taskmesh";

/// Project config files, in lookup order.
pub const CONFIG_FILENAMES: [&str; 2] = [".taskmesh.toml", ".taskmeshrc"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TaskmeshConfig {
    /// Name used for `project/item` prefixes. Defaults to the workspace directory name.
    pub project_name: Option<String>,
    /// Command shown in error hints, e.g. the ambiguous-parent message.
    pub command_name: Option<String>,
}

/// Where in the lookup chain a command name came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandNameSource {
    Project,
    Global,
    Default,
}

fn non_empty_env(name: &str) -> Option<PathBuf> {
    let value = std::env::var(name).ok()?;
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
}

/// `$TASKMESH_HOME/config.toml`, else `~/.taskmesh/config.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    let home = non_empty_env("TASKMESH_HOME").or_else(|| {
        non_empty_env("HOME")
            .or_else(|| non_empty_env("USERPROFILE"))
            .map(|home| home.join(".taskmesh"))
    })?;
    Some(home.join("config.toml"))
}

pub fn read_config(path: &Path) -> Result<TaskmeshConfig, ConfigError> {
    let text = fs::read_to_string(path)?;
    Ok(toml::from_str::<TaskmeshConfig>(&text)?)
}

/// Reads `path` when it exists. Unreadable or unparseable files are skipped
/// with a warning.
fn load_file(path: &Path) -> Option<TaskmeshConfig> {
    if !path.is_file() {
        return None;
    }
    match read_config(path) {
        Ok(config) => Some(config),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "ignoring config");
            None
        }
    }
}

/// Loads the first usable project config file in `workspace_root`.
pub fn load_config(workspace_root: &Path) -> Option<TaskmeshConfig> {
    CONFIG_FILENAMES
        .iter()
        .find_map(|name| load_file(&workspace_root.join(name)))
}

pub fn load_global_config() -> Option<TaskmeshConfig> {
    load_file(&global_config_path()?)
}

pub fn resolve_command_name_with_source(workspace_root: &Path) -> (String, CommandNameSource) {
    let configured = |config: TaskmeshConfig| {
        config
            .command_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
    };
    if let Some(value) = load_config(workspace_root).and_then(configured) {
        return (value, CommandNameSource::Project);
    }
    if let Some(value) = load_global_config().and_then(configured) {
        return (value, CommandNameSource::Global);
    }
    (DEFAULT_COMMAND_NAME.to_string(), CommandNameSource::Default)
}

pub fn resolve_command_name(workspace_root: &Path) -> String {
    resolve_command_name_with_source(workspace_root).0
}
