//! Reading and minimally rewriting the metadata block at the top of a task file.
//!
//! Only a fixed set of keys is understood (`status`, `skill-level`, `parent-type`,
//! `parent-id`, `type`, `blocked-by`). Every other line in the block is carried
//! through untouched, so mutations produce the smallest possible diff.

use std::borrow::Cow;
use std::str::FromStr;

use tracing::debug;

use crate::task::{ParentType, SkillLevel, TaskFields, TaskStatus};

pub const DELIMITER: &str = "---";

/// Options used when writing a brand new frontmatter block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontmatterOptions {
    pub status: Option<TaskStatus>,
    pub skill_level: Option<SkillLevel>,
    pub parent_type: Option<ParentType>,
    pub parent_id: Option<String>,
    pub task_type: Option<String>,
    pub blocked_by: Vec<String>,
}

impl From<&TaskFields> for FrontmatterOptions {
    fn from(fields: &TaskFields) -> Self {
        FrontmatterOptions {
            status: Some(fields.status),
            skill_level: fields.skill_level,
            parent_type: fields.parent_type,
            parent_id: fields.parent_id.clone(),
            task_type: fields.task_type.clone(),
            blocked_by: fields.blocked_by.clone().unwrap_or_default(),
        }
    }
}

/// A located frontmatter block. Borrowed from line-ending-normalized text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontMatter<'a> {
    open: &'a str,
    lines: Vec<&'a str>,
    close: &'a str,
    tail: &'a str,
}

impl<'a> FrontMatter<'a> {
    /// Finds a block that starts on the first line and is closed by a later
    /// delimiter line. Expects `\n` line endings.
    pub fn locate(text: &'a str) -> Option<Self> {
        let (open, rest) = text.split_once('\n')?;
        if open != DELIMITER {
            return None;
        }
        let mut lines = Vec::new();
        let mut offset = 0;
        for line in rest.split('\n') {
            if line.trim_end() == DELIMITER {
                return Some(FrontMatter {
                    open,
                    lines,
                    close: line,
                    tail: &rest[offset + line.len()..],
                });
            }
            lines.push(line);
            offset += line.len() + 1;
        }
        None
    }

    pub fn lines(&self) -> &[&'a str] {
        &self.lines
    }

    /// Text following the closing delimiter line.
    pub fn body(&self) -> &'a str {
        self.tail.strip_prefix('\n').unwrap_or(self.tail)
    }

    fn scalar(&self, key: &str) -> Option<&'a str> {
        self.lines.iter().find_map(|&line| key_value(line, key))
    }

    fn non_empty(&self, key: &str) -> Option<String> {
        self.scalar(key)
            .filter(|value| !value.is_empty())
            .map(|value| value.to_string())
    }

    /// First line under `key` whose value parses; invalid lines are skipped.
    fn typed<T: FromStr>(&self, key: &str) -> Option<T> {
        self.lines
            .iter()
            .filter_map(|&line| key_value(line, key))
            .find_map(|value| value.parse().ok())
    }

    pub fn status(&self) -> TaskStatus {
        self.typed("status").unwrap_or_default()
    }

    pub fn skill_level(&self) -> Option<SkillLevel> {
        self.typed("skill-level")
    }

    pub fn parent_type(&self) -> Option<ParentType> {
        self.typed("parent-type")
    }

    pub fn parent_id(&self) -> Option<String> {
        self.non_empty("parent-id")
    }

    pub fn task_type(&self) -> Option<String> {
        self.non_empty("type")
    }

    /// `blocked-by` as either `[a, b]` or an indented `- item` block.
    /// An empty list in either shape is reported as absent.
    pub fn blocked_by(&self) -> Option<Vec<String>> {
        let key = "blocked-by";
        let idx = self
            .lines
            .iter()
            .position(|line| key_value(line, key).is_some())?;
        let value = key_value(self.lines[idx], key)?;

        let items: Vec<String> =
            if let Some(inner) = value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
                inner
                    .split(',')
                    .map(clean_item)
                    .filter(|item| !item.is_empty())
                    .collect()
            } else if value.is_empty() {
                self.lines[idx + 1..]
                    .iter()
                    .take_while(|line| !is_top_level_key(line))
                    .filter_map(|line| block_item(line))
                    .filter(|item| !item.is_empty())
                    .collect()
            } else {
                Vec::new()
            };

        if items.is_empty() {
            None
        } else {
            Some(items)
        }
    }

    pub fn fields(&self) -> TaskFields {
        TaskFields {
            status: self.status(),
            skill_level: self.skill_level(),
            parent_type: self.parent_type(),
            parent_id: self.parent_id(),
            task_type: self.task_type(),
            blocked_by: self.blocked_by(),
        }
    }
}

/// Converts `\r\n` and lone `\r` to `\n`.
pub fn normalize_line_endings(content: &str) -> Cow<'_, str> {
    if !content.contains('\r') {
        return Cow::Borrowed(content);
    }
    Cow::Owned(content.replace("\r\n", "\n").replace('\r', "\n"))
}

fn with_front_matter<T>(content: &str, read: impl FnOnce(&FrontMatter<'_>) -> T) -> Option<T> {
    let normalized = normalize_line_endings(content);
    FrontMatter::locate(&normalized).map(|front| read(&front))
}

/// Returns the known fields, or `None` when the content has no frontmatter.
pub fn parse(content: &str) -> Option<TaskFields> {
    with_front_matter(content, |front| front.fields())
}

/// The content after the frontmatter block, or all of it when there is none.
pub fn body(content: &str) -> String {
    let normalized = normalize_line_endings(content);
    match FrontMatter::locate(&normalized) {
        Some(front) => front.body().to_string(),
        None => normalized.into_owned(),
    }
}

pub fn parse_status(content: &str) -> TaskStatus {
    with_front_matter(content, |front| front.status()).unwrap_or_default()
}

pub fn parse_skill_level(content: &str) -> Option<SkillLevel> {
    with_front_matter(content, |front| front.skill_level()).flatten()
}

pub fn parse_parent_type(content: &str) -> Option<ParentType> {
    with_front_matter(content, |front| front.parent_type()).flatten()
}

pub fn parse_parent_id(content: &str) -> Option<String> {
    with_front_matter(content, |front| front.parent_id()).flatten()
}

pub fn parse_type(content: &str) -> Option<String> {
    with_front_matter(content, |front| front.task_type()).flatten()
}

pub fn parse_blocked_by(content: &str) -> Option<Vec<String>> {
    with_front_matter(content, |front| front.blocked_by()).flatten()
}

/// Sets the status, touching nothing else in the block.
///
/// Without frontmatter a block holding only `status` is synthesized. Without a
/// status line one is inserted as the first field. Otherwise only the existing
/// status line is replaced.
pub fn update_status(content: &str, status: TaskStatus) -> String {
    let normalized = normalize_line_endings(content);
    let status_line = format!("status: {status}");

    let Some(front) = FrontMatter::locate(&normalized) else {
        debug!(%status, "no frontmatter, synthesizing status block");
        return format!("{DELIMITER}\n{status_line}\n{DELIMITER}\n\n{normalized}");
    };

    let mut lines = front.lines.clone();
    match lines
        .iter()
        .position(|line| key_value(line, "status").is_some())
    {
        Some(idx) => lines[idx] = status_line.as_str(),
        None => {
            debug!(%status, "frontmatter has no status line, prepending");
            lines.insert(0, status_line.as_str());
        }
    }

    format!(
        "{}\n{}\n{}{}",
        front.open,
        lines.join("\n"),
        front.close,
        front.tail
    )
}

/// Renders a new block in canonical field order, without a trailing newline.
pub fn build_frontmatter(options: &FrontmatterOptions) -> String {
    let mut lines = vec![
        DELIMITER.to_string(),
        format!("status: {}", options.status.unwrap_or_default()),
    ];
    if let Some(skill_level) = options.skill_level {
        lines.push(format!("skill-level: {skill_level}"));
    }
    if let Some(parent_type) = options.parent_type {
        lines.push(format!("parent-type: {parent_type}"));
    }
    if let Some(parent_id) = options.parent_id.as_deref().filter(|id| !id.is_empty()) {
        lines.push(format!("parent-id: {parent_id}"));
    }
    if let Some(task_type) = options.task_type.as_deref().filter(|t| !t.is_empty()) {
        lines.push(format!("type: {task_type}"));
    }
    if !options.blocked_by.is_empty() {
        lines.push("blocked-by:".to_string());
        lines.extend(options.blocked_by.iter().map(|item| format!("  - {item}")));
    }
    lines.push(DELIMITER.to_string());
    lines.join("\n")
}

/// Writes `fields` as a canonical block followed by `body`.
pub fn serialize(fields: &TaskFields, body: &str) -> String {
    format!("{}\n{}", build_frontmatter(&fields.into()), body)
}

/// Value of a top-level `key: value` line, trimmed.
fn key_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    line.strip_prefix(key)?.strip_prefix(':').map(str::trim)
}

fn is_top_level_key(line: &str) -> bool {
    let Some((key, _)) = line.split_once(':') else {
        return false;
    };
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

fn block_item(line: &str) -> Option<String> {
    let trimmed = line.trim_start();
    if trimmed.len() == line.len() {
        return None;
    }
    let rest = trimmed.strip_prefix('-')?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(clean_item(rest))
}

fn clean_item(raw: &str) -> String {
    let item = raw.trim();
    let item = item
        .strip_prefix(|c: char| c == '"' || c == '\'')
        .unwrap_or(item);
    let item = item
        .strip_suffix(|c: char| c == '"' || c == '\'')
        .unwrap_or(item);
    item.to_string()
}
