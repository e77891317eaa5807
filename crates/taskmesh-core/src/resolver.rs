//! Finding the change, review or spec a task points at.
//!
//! IDs are only unique inside one collection of one workspace, so a bare ID is
//! probed in every collection and every workspace in scope. More than one hit
//! is reported as ambiguous instead of picking one.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::ids::parse_prefixed_id;
use crate::task::ParentType;
use crate::workspace::Workspace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Change,
    Review,
    Spec,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Change, EntityKind::Review, EntityKind::Spec];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Change => "change",
            EntityKind::Review => "review",
            EntityKind::Spec => "spec",
        }
    }

    pub fn collection_dir(&self) -> &'static str {
        match self {
            EntityKind::Change => "changes",
            EntityKind::Review => "reviews",
            EntityKind::Spec => "specs",
        }
    }

    /// File whose presence marks an entity directory as real.
    pub fn marker_file(&self) -> &'static str {
        match self {
            EntityKind::Change => "proposal.md",
            EntityKind::Review => "review.md",
            EntityKind::Spec => "spec.md",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = ResolveError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| ResolveError::UnknownKind(value.to_string()))
    }
}

impl From<ParentType> for EntityKind {
    fn from(value: ParentType) -> Self {
        match value {
            ParentType::Change => EntityKind::Change,
            ParentType::Review => EntityKind::Review,
        }
    }
}

/// Existence check for one entity in one workspace.
pub trait CollectionProbe {
    fn exists(&self, workspace: &Workspace, kind: EntityKind, item_id: &str) -> bool;
}

/// Looks for `<workspace>/<collection>/<id>/<marker file>` on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsCollectionProbe;

impl CollectionProbe for FsCollectionProbe {
    fn exists(&self, workspace: &Workspace, kind: EntityKind, item_id: &str) -> bool {
        workspace
            .path
            .join(kind.collection_dir())
            .join(item_id)
            .join(kind.marker_file())
            .is_file()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedParent {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub path: PathBuf,
    pub workspace_path: PathBuf,
    pub project_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    NotFound,
    Found(ResolvedParent),
    Ambiguous {
        parent_id: String,
        item_id: String,
        candidates: Vec<ResolvedParent>,
    },
}

impl Resolution {
    /// Collapses to "found or absent", turning ambiguity into an error that
    /// names `command_label` in its hint.
    pub fn into_parent(self, command_label: &str) -> Result<Option<ResolvedParent>, ResolveError> {
        match self {
            Resolution::NotFound => Ok(None),
            Resolution::Found(parent) => Ok(Some(parent)),
            Resolution::Ambiguous {
                parent_id,
                item_id,
                candidates,
            } => Err(ResolveError::AmbiguousParent {
                parent_id,
                item_id,
                candidates,
                command_label: command_label.to_string(),
            }),
        }
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{}", describe_ambiguity(.parent_id, .item_id, .candidates, .command_label))]
    AmbiguousParent {
        parent_id: String,
        item_id: String,
        candidates: Vec<ResolvedParent>,
        command_label: String,
    },
    #[error("Unknown parent type: {0} (expected change, review or spec)")]
    UnknownKind(String),
}

fn describe_ambiguity(
    parent_id: &str,
    item_id: &str,
    candidates: &[ResolvedParent],
    command_label: &str,
) -> String {
    let mut lines = vec![format!("Parent ID '{parent_id}' matches multiple parents:")];
    for candidate in candidates {
        lines.push(format!(
            "  - {}: {}/{}/{}/",
            candidate.kind,
            candidate.project_name,
            candidate.kind.collection_dir(),
            item_id
        ));
    }
    let Some(first) = candidates.first() else {
        return lines.join("\n");
    };
    lines.push(format!(
        "Use --parent-type to specify: {command_label} --parent-id {parent_id} --parent-type {}",
        first.kind
    ));
    if candidates
        .iter()
        .any(|candidate| candidate.workspace_path != first.workspace_path)
    {
        lines.push(format!(
            "or prefix the ID with its project: {command_label} --parent-id {}/{item_id}",
            first.project_name
        ));
    }
    lines.join("\n")
}

/// Probes every collection in scope for `parent_id`.
///
/// A `project/` prefix naming a known workspace narrows the search to that
/// workspace. `hint` narrows it to one collection.
pub fn resolve(
    parent_id: &str,
    hint: Option<EntityKind>,
    workspaces: &[Workspace],
    probe: &impl CollectionProbe,
) -> Resolution {
    let parsed = parse_prefixed_id(parent_id, workspaces);
    if !stays_inside_collection(&parsed.item_id) {
        debug!(parent_id, "parent id escapes its collection");
        return Resolution::NotFound;
    }
    let in_scope: Vec<&Workspace> = match parsed.project_name.as_deref() {
        Some(project) => {
            let wanted = project.to_lowercase();
            workspaces
                .iter()
                .filter(|workspace| workspace.project_name.to_lowercase() == wanted)
                .collect()
        }
        None => workspaces.iter().collect(),
    };
    let kinds: Vec<EntityKind> = match hint {
        Some(kind) => vec![kind],
        None => EntityKind::ALL.to_vec(),
    };

    let mut candidates = Vec::new();
    for kind in kinds {
        for workspace in &in_scope {
            if !probe.exists(workspace, kind, &parsed.item_id) {
                continue;
            }
            debug!(
                parent_id,
                %kind,
                project = %workspace.project_name,
                "parent candidate"
            );
            candidates.push(ResolvedParent {
                kind,
                path: workspace
                    .path
                    .join(kind.collection_dir())
                    .join(&parsed.item_id),
                workspace_path: workspace.path.clone(),
                project_name: workspace.project_name.clone(),
            });
        }
    }

    match candidates.len() {
        0 => Resolution::NotFound,
        1 => Resolution::Found(candidates.remove(0)),
        _ => Resolution::Ambiguous {
            parent_id: parent_id.to_string(),
            item_id: parsed.item_id,
            candidates,
        },
    }
}

/// Item IDs are relative paths below a collection directory. Absolute paths and
/// `..` segments would make `Path::join` leave the workspace.
fn stays_inside_collection(item_id: &str) -> bool {
    !item_id.is_empty()
        && Path::new(item_id).components().all(|component| {
            !matches!(
                component,
                Component::RootDir | Component::Prefix(_) | Component::ParentDir
            )
        })
}

/// [`resolve`] with ambiguity reported as an error.
pub fn resolve_parent(
    parent_id: &str,
    hint: Option<EntityKind>,
    workspaces: &[Workspace],
    probe: &impl CollectionProbe,
    command_label: &str,
) -> Result<Option<ResolvedParent>, ResolveError> {
    resolve(parent_id, hint, workspaces, probe).into_parent(command_label)
}
