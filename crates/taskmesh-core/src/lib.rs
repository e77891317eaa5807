//! Core of TaskMesh: task frontmatter, lifecycle transitions and parent lookup.

pub mod audit;
pub mod config;
pub mod create;
pub mod frontmatter;
pub mod ids;
pub mod lifecycle;
pub mod resolver;
pub mod task;
pub mod task_file;
pub mod workspace;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}


#[cfg(test)]
mod tests {
    use super::version;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
