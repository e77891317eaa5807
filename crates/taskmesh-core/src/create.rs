//! Creating a task file linked to a change or review.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::frontmatter::serialize;
use crate::ids::{is_known_template_type, parse_item_id, to_kebab_case, KNOWN_TEMPLATE_TYPES};
use crate::resolver::{resolve_parent, CollectionProbe, EntityKind, ResolveError};
use crate::task::{ParentType, SkillLevel, TaskFields, TaskStatus};
use crate::task_file::{write_task, TaskFileError};
use crate::workspace::Workspace;

#[derive(Debug, Error)]
pub enum CreateTaskError {
    #[error("Task title must contain at least one letter or digit")]
    EmptyTitle,
    #[error("Unknown template type '{0}'. Available types: {types}", types = KNOWN_TEMPLATE_TYPES.join(", "))]
    UnknownType(String),
    #[error("Parent not found: {0}")]
    ParentNotFound(String),
    #[error("Specs cannot have tasks directly attached. Tasks must be linked to a change or review.")]
    SpecParent,
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("Failed to create tasks directory {path}: {source}")]
    TasksDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Write(#[from] TaskFileError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub parent_id: String,
    pub parent_type: Option<EntityKind>,
    pub skill_level: Option<SkillLevel>,
    pub task_type: Option<String>,
    pub blocked_by: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedTask {
    pub path: PathBuf,
    pub workspace_path: PathBuf,
    pub task_id: String,
    pub parent_id: String,
    pub parent_type: ParentType,
    pub sequence: u32,
}

/// Resolves the parent of `task` and writes a new to-do task file into the
/// parent workspace's `tasks/` directory.
///
/// Files are named `NNN-<parent>-<title>.md`, where `NNN` continues the
/// numbering of the tasks already filed under the same parent.
pub fn create_task(
    task: &NewTask,
    workspaces: &[Workspace],
    probe: &impl CollectionProbe,
    command_label: &str,
) -> Result<CreatedTask, CreateTaskError> {
    let title_slug = to_kebab_case(&task.title);
    if title_slug.is_empty() {
        return Err(CreateTaskError::EmptyTitle);
    }
    if let Some(task_type) = task.task_type.as_deref() {
        if !is_known_template_type(task_type) {
            return Err(CreateTaskError::UnknownType(task_type.to_string()));
        }
    }

    let parent = resolve_parent(
        &task.parent_id,
        task.parent_type,
        workspaces,
        probe,
        command_label,
    )?
    .ok_or_else(|| CreateTaskError::ParentNotFound(task.parent_id.clone()))?;
    let parent_type = match parent.kind {
        EntityKind::Change => ParentType::Change,
        EntityKind::Review => ParentType::Review,
        EntityKind::Spec => return Err(CreateTaskError::SpecParent),
    };

    let tasks_dir = workspaces
        .iter()
        .find(|workspace| workspace.path == parent.workspace_path)
        .map_or_else(|| parent.workspace_path.join("tasks"), Workspace::tasks_dir);
    fs::create_dir_all(&tasks_dir).map_err(|source| CreateTaskError::TasksDir {
        path: tasks_dir.clone(),
        source,
    })?;

    let parent_id = parse_item_id(&task.parent_id).to_string();
    let parent_slug = parent_id.replace('/', "-");
    let sequence = next_sequence(&tasks_dir, &parent_slug);
    let path = tasks_dir.join(format!("{sequence:03}-{parent_slug}-{title_slug}.md"));

    let fields = TaskFields {
        status: TaskStatus::ToDo,
        skill_level: task.skill_level,
        parent_type: Some(parent_type),
        parent_id: Some(parent_id.clone()),
        task_type: task.task_type.clone(),
        blocked_by: (!task.blocked_by.is_empty()).then(|| task.blocked_by.clone()),
    };
    let body = format!("\n# Task: {}\n\n## Implementation Checklist\n", task.title.trim());
    write_task(&path, &serialize(&fields, &body))?;
    debug!(path = %path.display(), %parent_type, sequence, "task created");

    Ok(CreatedTask {
        path,
        workspace_path: parent.workspace_path,
        task_id: format!("{parent_slug}-{title_slug}"),
        parent_id,
        parent_type,
        sequence,
    })
}

/// One past the highest `NNN` among `NNN-<parent_slug>-*.md` files in `tasks_dir`.
fn next_sequence(tasks_dir: &Path, parent_slug: &str) -> u32 {
    let Ok(entries) = fs::read_dir(tasks_dir) else {
        return 1;
    };
    let prefix = format!("{parent_slug}-");
    entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter_map(|name| {
            let stem = name.strip_suffix(".md")?;
            let (number, rest) = stem.split_once('-')?;
            if !rest.starts_with(&prefix) || !number.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            number.parse::<u32>().ok()
        })
        .max()
        .map_or(1, |highest| highest + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontmatter::parse;
    use crate::resolver::FsCollectionProbe;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn workspace_with(entities: &[(EntityKind, &str)]) -> (TempDir, Workspace) {
        let temp = TempDir::new().expect("tempdir");
        let root = temp.path().join("workspace");
        for (kind, id) in entities {
            let dir = root.join(kind.collection_dir()).join(id);
            fs::create_dir_all(&dir).expect("entity dir");
            fs::write(dir.join(kind.marker_file()), "# Entity\n").expect("marker");
        }
        let workspace = Workspace::new(&root, "billing", true);
        (temp, workspace)
    }

    fn new_task(title: &str, parent_id: &str) -> NewTask {
        NewTask {
            title: title.to_string(),
            parent_id: parent_id.to_string(),
            ..NewTask::default()
        }
    }

    #[test]
    fn writes_frontmatter_and_minimal_body() {
        let (_temp, workspace) = workspace_with(&[(EntityKind::Change, "add-login")]);
        let task = NewTask {
            skill_level: Some(SkillLevel::Junior),
            task_type: Some("bug".to_string()),
            blocked_by: vec!["001-add-login-setup".to_string()],
            ..new_task("Fix Login Form!", "add-login")
        };
        let created = create_task(
            &task,
            &[workspace.clone()],
            &FsCollectionProbe,
            "taskmesh create \"Fix Login Form!\"",
        )
        .expect("create");

        assert_eq!(
            created.path,
            workspace.tasks_dir().join("001-add-login-fix-login-form.md")
        );
        assert_eq!(created.task_id, "add-login-fix-login-form");
        assert_eq!(created.parent_type, ParentType::Change);
        assert_eq!(
            fs::read_to_string(&created.path).expect("read"),
            "---\n\
status: to-do\n\
skill-level: junior\n\
parent-type: change\n\
parent-id: add-login\n\
type: bug\n\
blocked-by:\n  - 001-add-login-setup\n\
---\n\
\n\
# Task: Fix Login Form!\n\
\n\
## Implementation Checklist\n"
        );
    }

    #[test]
    fn sequence_continues_per_parent() {
        let (_temp, workspace) = workspace_with(&[
            (EntityKind::Change, "add-login"),
            (EntityKind::Review, "audit"),
        ]);
        let workspaces = [workspace.clone()];
        fs::create_dir_all(workspace.tasks_dir()).expect("tasks dir");
        fs::write(workspace.tasks_dir().join("007-add-login-old.md"), "").expect("old");

        let first = create_task(
            &new_task("Next step", "add-login"),
            &workspaces,
            &FsCollectionProbe,
            "taskmesh",
        )
        .expect("create");
        assert_eq!(first.sequence, 8);

        let review = create_task(
            &new_task("Check logs", "audit"),
            &workspaces,
            &FsCollectionProbe,
            "taskmesh",
        )
        .expect("create");
        assert_eq!(review.sequence, 1);
        assert_eq!(review.parent_type, ParentType::Review);
        let fields = parse(&fs::read_to_string(&review.path).expect("read")).expect("fields");
        assert_eq!(fields.parent_type, Some(ParentType::Review));
        assert_eq!(fields.parent_id.as_deref(), Some("audit"));
    }

    #[test]
    fn spec_parent_is_rejected() {
        let (_temp, workspace) = workspace_with(&[(EntityKind::Spec, "auth")]);
        let err = create_task(
            &new_task("Anything", "auth"),
            &[workspace.clone()],
            &FsCollectionProbe,
            "taskmesh",
        )
        .expect_err("spec parent");
        assert!(matches!(err, CreateTaskError::SpecParent));
        assert!(!workspace.tasks_dir().exists());
    }

    #[test]
    fn unknown_type_is_rejected_before_resolving() {
        let (_temp, workspace) = workspace_with(&[]);
        let task = NewTask {
            task_type: Some("epic".to_string()),
            ..new_task("Anything", "missing")
        };
        let err = create_task(&task, &[workspace], &FsCollectionProbe, "taskmesh")
            .expect_err("unknown type");
        assert!(matches!(err, CreateTaskError::UnknownType(ref t) if t == "epic"));
        assert!(err.to_string().contains("Available types: story, bug"));
    }

    #[test]
    fn missing_and_ambiguous_parents_fail() {
        let (_temp, workspace) = workspace_with(&[
            (EntityKind::Change, "shared"),
            (EntityKind::Review, "shared"),
        ]);
        let workspaces = [workspace];
        let err = create_task(
            &new_task("Anything", "nope"),
            &workspaces,
            &FsCollectionProbe,
            "taskmesh",
        )
        .expect_err("missing");
        assert_eq!(err.to_string(), "Parent not found: nope");

        let err = create_task(
            &new_task("Anything", "shared"),
            &workspaces,
            &FsCollectionProbe,
            "taskmesh create \"Anything\"",
        )
        .expect_err("ambiguous");
        assert!(matches!(err, CreateTaskError::Resolve(_)));
        assert!(err
            .to_string()
            .contains("taskmesh create \"Anything\" --parent-id shared --parent-type change"));

        let hinted = NewTask {
            parent_type: Some(EntityKind::Review),
            ..new_task("Anything", "shared")
        };
        let created =
            create_task(&hinted, &workspaces, &FsCollectionProbe, "taskmesh").expect("hinted");
        assert_eq!(created.parent_type, ParentType::Review);
    }

    #[test]
    fn blank_title_is_rejected() {
        let (_temp, workspace) = workspace_with(&[(EntityKind::Change, "add-login")]);
        let err = create_task(
            &new_task("  ?! ", "add-login"),
            &[workspace],
            &FsCollectionProbe,
            "taskmesh",
        )
        .expect_err("blank");
        assert!(matches!(err, CreateTaskError::EmptyTitle));
    }
}
