//! Append-only journal of task lifecycle changes, one JSON object per line in
//! `<workspace>/.audit.log`.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use thiserror::Error;

use crate::task::TaskStatus;
use crate::task_file::Transition;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Failed to write audit log: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize audit event: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleAction {
    Create,
    SetStatus,
    Complete,
    Undo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleEvent {
    pub timestamp: String,
    pub actor: Option<String>,
    pub action: LifecycleAction,
    /// Task file, relative to the workspace root when it lives inside it.
    pub task: PathBuf,
    /// `None` for a task that did not exist before the event.
    pub from: Option<TaskStatus>,
    pub to: TaskStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<String>,
}

impl LifecycleEvent {
    pub fn transition(
        action: LifecycleAction,
        workspace_root: &Path,
        task: &Path,
        transition: &Transition,
    ) -> Self {
        LifecycleEvent {
            from: Some(transition.from),
            to: transition.to,
            items: transition.items.clone(),
            ..LifecycleEvent::bare(action, workspace_root, task)
        }
    }

    pub fn created(workspace_root: &Path, task: &Path) -> Self {
        LifecycleEvent::bare(LifecycleAction::Create, workspace_root, task)
    }

    fn bare(action: LifecycleAction, workspace_root: &Path, task: &Path) -> Self {
        LifecycleEvent {
            timestamp: Local::now().to_rfc3339(),
            actor: std::env::var("TASKMESH_ACTOR")
                .ok()
                .filter(|value| !value.trim().is_empty()),
            action,
            task: task
                .strip_prefix(workspace_root)
                .unwrap_or(task)
                .to_path_buf(),
            from: None,
            to: TaskStatus::default(),
            items: Vec::new(),
        }
    }
}

pub fn audit_log_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(".audit.log")
}

pub fn append_lifecycle_event(
    workspace_root: &Path,
    event: &LifecycleEvent,
) -> Result<(), AuditError> {
    let line = serde_json::to_string(event)?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(audit_log_path(workspace_root))?;
    writeln!(file, "{line}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::TempDir;

    #[test]
    fn events_are_appended_as_json_lines() {
        let temp = TempDir::new().expect("tempdir");
        let task = temp.path().join("tasks").join("001-add-login-form.md");
        let created = LifecycleEvent::created(temp.path(), &task);
        let completed = LifecycleEvent::transition(
            LifecycleAction::Complete,
            temp.path(),
            &task,
            &Transition {
                from: TaskStatus::InProgress,
                to: TaskStatus::Done,
                items: vec!["Write form".to_string()],
            },
        );
        append_lifecycle_event(temp.path(), &created).expect("append");
        append_lifecycle_event(temp.path(), &completed).expect("append");

        let log = std::fs::read_to_string(audit_log_path(temp.path())).expect("read log");
        let lines: Vec<Value> = log
            .lines()
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["action"], "create");
        assert_eq!(lines[0]["task"], "tasks/001-add-login-form.md");
        assert_eq!(lines[0]["from"], Value::Null);
        assert_eq!(lines[0]["to"], "to-do");
        assert!(lines[0].get("items").is_none());
        assert_eq!(lines[1]["action"], "complete");
        assert_eq!(lines[1]["from"], "in-progress");
        assert_eq!(lines[1]["to"], "done");
        assert_eq!(lines[1]["items"][0], "Write form");
    }

    #[test]
    fn task_outside_workspace_keeps_full_path() {
        let temp = TempDir::new().expect("tempdir");
        let task = PathBuf::from("/elsewhere/task.md");
        let event = LifecycleEvent::created(temp.path(), &task);
        assert_eq!(event.task, task);
    }
}
