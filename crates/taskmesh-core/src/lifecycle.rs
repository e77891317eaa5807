//! Task completion and undo.
//!
//! Only checkboxes under `## Implementation Checklist` are ever toggled;
//! boxes under `## Constraints` and `## Acceptance Criteria` stay as written.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::frontmatter::{normalize_line_endings, update_status};
use crate::task::TaskStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistCompletion {
    pub updated_content: String,
    pub completed_items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistReset {
    pub updated_content: String,
    pub unchecked_items: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Outside,
    ImplementationChecklist,
    Excluded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Toggle {
    Check,
    Uncheck,
}

fn header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^##\s+(.*)$").expect("regex"))
}

fn unchecked_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\s*[-*]\s+)\[ \](.*)$").expect("regex"))
}

fn checked_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\s*[-*]\s+)\[[xX]\](.*)$").expect("regex"))
}

/// Section a level-2 header opens, or `None` for any other line.
fn section_for_header(line: &str) -> Option<Section> {
    let title = header_regex().captures(line)?.get(1)?.as_str();
    let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
    let section = if title.eq_ignore_ascii_case("implementation checklist") {
        Section::ImplementationChecklist
    } else if title.eq_ignore_ascii_case("constraints")
        || title.eq_ignore_ascii_case("acceptance criteria")
    {
        Section::Excluded
    } else {
        Section::Outside
    };
    Some(section)
}

fn toggle_checklist(content: &str, toggle: Toggle) -> (String, Vec<String>) {
    let normalized = normalize_line_endings(content);
    let (pattern, mark) = match toggle {
        Toggle::Check => (unchecked_regex(), "[x]"),
        Toggle::Uncheck => (checked_regex(), "[ ]"),
    };

    let mut section = Section::Outside;
    let mut items = Vec::new();
    let mut lines = Vec::new();
    for line in normalized.split('\n') {
        if let Some(next) = section_for_header(line) {
            section = next;
            lines.push(line.to_string());
            continue;
        }
        match section {
            Section::ImplementationChecklist => match pattern.captures(line) {
                Some(caps) => {
                    let prefix = caps.get(1).map_or("", |m| m.as_str());
                    let rest = caps.get(2).map_or("", |m| m.as_str());
                    items.push(rest.trim().to_string());
                    lines.push(format!("{prefix}{mark}{rest}"));
                }
                None => lines.push(line.to_string()),
            },
            Section::Outside | Section::Excluded => lines.push(line.to_string()),
        }
    }

    (lines.join("\n"), items)
}

/// Checks every open box in the Implementation Checklist.
pub fn complete_implementation_checklist(content: &str) -> ChecklistCompletion {
    let (updated_content, completed_items) = toggle_checklist(content, Toggle::Check);
    debug!(count = completed_items.len(), "checked implementation items");
    ChecklistCompletion {
        updated_content,
        completed_items,
    }
}

/// Clears every checked box (`[x]` or `[X]`) in the Implementation Checklist.
pub fn uncomplete_implementation_checklist(content: &str) -> ChecklistReset {
    let (updated_content, unchecked_items) = toggle_checklist(content, Toggle::Uncheck);
    debug!(count = unchecked_items.len(), "unchecked implementation items");
    ChecklistReset {
        updated_content,
        unchecked_items,
    }
}

/// Checks the checklist, then marks the task `done`.
pub fn complete_task_fully(content: &str) -> ChecklistCompletion {
    let completion = complete_implementation_checklist(content);
    ChecklistCompletion {
        updated_content: update_status(&completion.updated_content, TaskStatus::Done),
        completed_items: completion.completed_items,
    }
}

/// Unchecks the checklist, then moves the task back to `to-do`.
pub fn undo_task_fully(content: &str) -> ChecklistReset {
    let reset = uncomplete_implementation_checklist(content);
    ChecklistReset {
        updated_content: update_status(&reset.updated_content, TaskStatus::ToDo),
        unchecked_items: reset.unchecked_items,
    }
}
