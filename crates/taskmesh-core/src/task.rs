use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::frontmatter::{parse_parent_id, parse_parent_type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    ToDo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::ToDo => "to-do",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = TaskError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "to-do" => Ok(TaskStatus::ToDo),
            "in-progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            other => Err(TaskError::InvalidValue {
                field: "status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkillLevel {
    Junior,
    Medior,
    Senior,
}

impl SkillLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillLevel::Junior => "junior",
            SkillLevel::Medior => "medior",
            SkillLevel::Senior => "senior",
        }
    }
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillLevel {
    type Err = TaskError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "junior" => Ok(SkillLevel::Junior),
            "medior" => Ok(SkillLevel::Medior),
            "senior" => Ok(SkillLevel::Senior),
            other => Err(TaskError::InvalidValue {
                field: "skill-level",
                value: other.to_string(),
            }),
        }
    }
}

/// Entity kinds a task may be linked to. Specs are resolvable but never parents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParentType {
    Change,
    Review,
}

impl ParentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParentType::Change => "change",
            ParentType::Review => "review",
        }
    }
}

impl fmt::Display for ParentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParentType {
    type Err = TaskError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "change" => Ok(ParentType::Change),
            "review" => Ok(ParentType::Review),
            other => Err(TaskError::InvalidValue {
                field: "parent-type",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("Task has parent-type but missing parent-id in frontmatter")]
    MissingParentId,
    #[error("Task has parent-id but missing parent-type in frontmatter")]
    MissingParentType,
    #[error("Invalid {field} value: {value}")]
    InvalidValue { field: &'static str, value: String },
}

/// Structured view of the fields this crate owns in a task's frontmatter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskFields {
    pub status: TaskStatus,
    pub skill_level: Option<SkillLevel>,
    pub parent_type: Option<ParentType>,
    pub parent_id: Option<String>,
    #[serde(rename = "type")]
    pub task_type: Option<String>,
    pub blocked_by: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskParentInfo {
    pub parent_type: ParentType,
    pub parent_id: String,
}

/// Reads the parent link, requiring `parent-type` and `parent-id` to appear together.
pub fn parse_task_parent_info(content: &str) -> Result<Option<TaskParentInfo>, TaskError> {
    match (parse_parent_type(content), parse_parent_id(content)) {
        (Some(parent_type), Some(parent_id)) => Ok(Some(TaskParentInfo {
            parent_type,
            parent_id,
        })),
        (None, None) => Ok(None),
        (Some(_), None) => Err(TaskError::MissingParentId),
        (None, Some(_)) => Err(TaskError::MissingParentType),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [TaskStatus::ToDo, TaskStatus::InProgress, TaskStatus::Done] {
            assert_eq!(status.as_str().parse::<TaskStatus>(), Ok(status));
        }
        assert!("Done".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn parent_type_rejects_spec() {
        let err = "spec".parse::<ParentType>().expect_err("spec is not a parent");
        assert_eq!(err.to_string(), "Invalid parent-type value: spec");
    }

    #[test]
    fn parent_info_requires_both_fields() {
        let content = "---\nstatus: to-do\nparent-type: change\nparent-id: add-login\n---\n";
        let info = parse_task_parent_info(content).expect("valid").expect("present");
        assert_eq!(info.parent_type, ParentType::Change);
        assert_eq!(info.parent_id, "add-login");
    }

    #[test]
    fn parent_info_absent_is_none() {
        let content = "---\nstatus: to-do\n---\nBody\n";
        assert_eq!(parse_task_parent_info(content), Ok(None));
        assert_eq!(parse_task_parent_info("no frontmatter"), Ok(None));
    }

    #[test]
    fn parent_info_errors_on_half_link() {
        let only_type = "---\nparent-type: change\n---\n";
        let err = parse_task_parent_info(only_type).expect_err("missing id");
        assert_eq!(err, TaskError::MissingParentId);
        assert!(err.to_string().contains("missing parent-id"));

        let only_id = "---\nparent-id: add-login\n---\n";
        let err = parse_task_parent_info(only_id).expect_err("missing type");
        assert_eq!(err, TaskError::MissingParentType);
    }

    #[test]
    fn parent_id_in_body_is_ignored() {
        let content = "---\nparent-type: review\n---\nparent-id: not-frontmatter\n";
        assert_eq!(
            parse_task_parent_info(content),
            Err(TaskError::MissingParentId)
        );
    }
}
