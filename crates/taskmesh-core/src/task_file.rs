use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::frontmatter::{parse_status, update_status};
use crate::lifecycle::{complete_task_fully, undo_task_fully};
use crate::task::TaskStatus;

#[derive(Debug, Error)]
pub enum TaskFileError {
    #[error("Failed to read task file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("Failed to write task file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Status change applied to one task file, with the checklist items it toggled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: TaskStatus,
    pub to: TaskStatus,
    pub items: Vec<String>,
}

pub fn read_task(path: &Path) -> Result<String, TaskFileError> {
    fs::read_to_string(path).map_err(|source| TaskFileError::Read {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn write_task(path: &Path, content: &str) -> Result<(), TaskFileError> {
    fs::write(path, content).map_err(|source| TaskFileError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads `path`, rewrites it with `apply` and reports the status change.
fn transition(
    path: &Path,
    apply: impl FnOnce(&str) -> (String, Vec<String>),
) -> Result<Transition, TaskFileError> {
    let content = read_task(path)?;
    let from = parse_status(&content);
    let (updated, items) = apply(&content);
    let to = parse_status(&updated);
    write_task(path, &updated)?;
    debug!(
        path = %path.display(),
        %from,
        %to,
        items = items.len(),
        "task transitioned"
    );
    Ok(Transition { from, to, items })
}

pub fn set_task_status(path: &Path, status: TaskStatus) -> Result<Transition, TaskFileError> {
    transition(path, |content| (update_status(content, status), Vec::new()))
}

/// Checks the implementation checklist and marks the task done.
pub fn complete_task_file(path: &Path) -> Result<Transition, TaskFileError> {
    transition(path, |content| {
        let completion = complete_task_fully(content);
        (completion.updated_content, completion.completed_items)
    })
}

/// Unchecks the implementation checklist and moves the task back to to-do.
pub fn undo_task_file(path: &Path) -> Result<Transition, TaskFileError> {
    transition(path, |content| {
        let reset = undo_task_fully(content);
        (reset.updated_content, reset.unchecked_items)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn read_task_reports_missing_file() {
        let temp = TempDir::new().expect("tempdir");
        let err = read_task(&temp.path().join("missing.md")).expect_err("missing");
        assert!(matches!(err, TaskFileError::Read { .. }));
        assert!(err.to_string().contains("missing.md"));
    }

    #[test]
    fn set_task_status_rewrites_file() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("001-add-login-form.md");
        fs::write(&path, "---\nstatus: to-do\nowner: me\n---\n\nBody\n").expect("write");

        let transition = set_task_status(&path, TaskStatus::InProgress).expect("set");
        assert_eq!(
            transition,
            Transition {
                from: TaskStatus::ToDo,
                to: TaskStatus::InProgress,
                items: Vec::new(),
            }
        );
        assert_eq!(
            fs::read_to_string(&path).expect("read"),
            "---\nstatus: in-progress\nowner: me\n---\n\nBody\n"
        );
    }

    #[test]
    fn complete_reports_previous_status() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("001-x.md");
        fs::write(
            &path,
            "---\nstatus: in-progress\n---\n\n## Implementation Checklist\n- [ ] Ship\n",
        )
        .expect("write");

        let transition = complete_task_file(&path).expect("complete");
        assert_eq!(transition.from, TaskStatus::InProgress);
        assert_eq!(transition.to, TaskStatus::Done);
        assert_eq!(transition.items, vec!["Ship"]);
    }
}
