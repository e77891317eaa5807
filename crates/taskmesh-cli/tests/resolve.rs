use std::fs;
use std::path::Path;
use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_taskmesh"))
}

fn create_entity(workspace: &Path, collection: &str, id: &str, marker: &str) {
    let dir = workspace.join(collection).join(id);
    fs::create_dir_all(&dir).expect("entity dir");
    fs::write(dir.join(marker), "# Entity\n").expect("marker");
}

#[test]
fn resolve_finds_single_parent() {
    let workspace = TempDir::new().expect("workspace");
    create_entity(workspace.path(), "reviews", "audit", "review.md");

    let output = bin()
        .arg("resolve")
        .arg("--parent-id")
        .arg("audit")
        .arg("--workspace")
        .arg(workspace.path())
        .arg("--json")
        .output()
        .expect("resolve");
    assert!(output.status.success());
    let payload: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(payload["parent"]["type"], "review");
}

#[test]
fn suggested_disambiguation_command_runs() {
    let workspace = TempDir::new().expect("workspace");
    fs::write(
        workspace.path().join(".taskmesh.toml"),
        "command_name = \"splx\"\n",
    )
    .expect("config");
    create_entity(workspace.path(), "changes", "shared", "proposal.md");
    create_entity(workspace.path(), "specs", "shared", "spec.md");

    let output = bin()
        .arg("resolve")
        .arg("--parent-id")
        .arg("shared")
        .arg("--workspace")
        .arg(workspace.path())
        .arg("--json")
        .output()
        .expect("resolve");
    assert!(!output.status.success());
    let payload: Value = serde_json::from_slice(&output.stdout).expect("json");
    let error = payload["error"].as_str().unwrap_or_default();
    assert!(error.contains("- change:"));
    assert!(error.contains("- spec:"));

    let suggestion = error
        .lines()
        .find_map(|line| line.strip_prefix("Use --parent-type to specify: "))
        .expect("suggested command");
    let mut words = suggestion.split_whitespace();
    assert_eq!(words.next(), Some("splx"));
    let args: Vec<&str> = words.collect();
    assert_eq!(
        args,
        vec!["resolve", "--parent-id", "shared", "--parent-type", "change"]
    );

    let hinted = bin()
        .args(&args)
        .arg("--workspace")
        .arg(workspace.path())
        .arg("--json")
        .output()
        .expect("suggested command");
    assert!(
        hinted.status.success(),
        "{}",
        String::from_utf8_lossy(&hinted.stderr)
    );
    let payload: Value = serde_json::from_slice(&hinted.stdout).expect("json");
    assert_eq!(payload["parent"]["type"], "change");
}

#[test]
fn resolve_uses_project_prefix_across_workspaces() {
    let root = TempDir::new().expect("root");
    let other = TempDir::new().expect("other");
    fs::write(
        other.path().join(".taskmesh.toml"),
        "project_name = \"project-b\"\n",
    )
    .expect("config");
    create_entity(root.path(), "changes", "feature-x", "proposal.md");
    create_entity(other.path(), "changes", "feature-x", "proposal.md");

    let output = bin()
        .arg("resolve")
        .arg("--parent-id")
        .arg("project-b/feature-x")
        .arg("--workspace")
        .arg(root.path())
        .arg("--workspace")
        .arg(other.path())
        .arg("--json")
        .output()
        .expect("resolve");
    assert!(output.status.success());
    let payload: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(payload["parent"]["project_name"], "project-b");
}

#[test]
fn resolve_missing_parent_fails() {
    let workspace = TempDir::new().expect("workspace");
    let output = bin()
        .arg("resolve")
        .arg("--parent-id")
        .arg("nothing-here")
        .arg("--workspace")
        .arg(workspace.path())
        .output()
        .expect("resolve");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Parent not found: nothing-here"));
}
