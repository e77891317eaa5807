use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::workspace::Workspace;

/// Task template categories shipped with a workspace. `type:` values are not
/// validated against this list; it only drives hints.
pub const KNOWN_TEMPLATE_TYPES: [&str; 12] = [
    "story",
    "bug",
    "implementation",
    "components",
    "business-logic",
    "research",
    "discovery",
    "chore",
    "refactor",
    "infrastructure",
    "documentation",
    "release",
];

const MAX_SLUG_LEN: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrefixedId {
    /// Project segment as written by the caller, when it names a known workspace.
    pub project_name: Option<String>,
    pub item_id: String,
}

/// Splits `project/item` when `project` names one of `workspaces` (ignoring case).
/// Anything else is returned whole as the item id.
pub fn parse_prefixed_id(id: &str, workspaces: &[Workspace]) -> PrefixedId {
    let Some((candidate, item_id)) = id.split_once('/') else {
        return PrefixedId {
            project_name: None,
            item_id: id.to_string(),
        };
    };

    let wanted = candidate.to_lowercase();
    let known = workspaces
        .iter()
        .any(|workspace| workspace.project_name.to_lowercase() == wanted);
    if !known {
        return PrefixedId {
            project_name: None,
            item_id: id.to_string(),
        };
    }

    PrefixedId {
        project_name: Some(candidate.to_string()),
        item_id: item_id.to_string(),
    }
}

/// Drops everything up to and including the first `/`.
pub fn parse_item_id(id: &str) -> &str {
    id.split_once('/').map_or(id, |(_, item_id)| item_id)
}

pub fn is_known_template_type(value: &str) -> bool {
    KNOWN_TEMPLATE_TYPES.contains(&value)
}

pub fn to_kebab_case(value: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("regex"));
    let lowered = value.to_lowercase();
    let dashed = re.replace_all(&lowered, "-");
    let trimmed = dashed.strip_prefix('-').unwrap_or(&dashed);
    let trimmed = trimmed.strip_suffix('-').unwrap_or(trimmed);
    trimmed.chars().take(MAX_SLUG_LEN).collect()
}
