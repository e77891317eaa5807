use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use taskmesh_core::audit::{append_lifecycle_event, LifecycleAction, LifecycleEvent};
use taskmesh_core::config::resolve_command_name;
use taskmesh_core::create::{create_task, NewTask};
use taskmesh_core::frontmatter::parse;
use taskmesh_core::ids::is_known_template_type;
use taskmesh_core::resolver::{resolve_parent, EntityKind, FsCollectionProbe};
use taskmesh_core::task::{parse_task_parent_info, SkillLevel, TaskStatus};
use taskmesh_core::task_file::{
    complete_task_file, read_task, set_task_status, undo_task_file, Transition,
};
use taskmesh_core::workspace::Workspace;

#[derive(Parser)]
#[command(name = "taskmesh", version, about = "TaskMesh task lifecycle and parent lookup")]
struct Cli {
    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Show the frontmatter fields of a task file
    Show { file: PathBuf },
    /// Set the status of a task file (to-do, in-progress, done)
    SetStatus { file: PathBuf, status: String },
    /// Check the implementation checklist and mark the task done
    Complete { file: PathBuf },
    /// Uncheck the implementation checklist and move the task back to to-do
    Undo { file: PathBuf },
    /// Create a to-do task under a change or review
    Create {
        title: String,
        #[arg(long)]
        parent_id: String,
        /// change, review or spec
        #[arg(long)]
        parent_type: Option<String>,
        /// junior, medior or senior
        #[arg(long)]
        skill_level: Option<String>,
        /// Template type, e.g. story, bug, chore
        #[arg(long = "type")]
        task_type: Option<String>,
        /// Comma-separated task IDs this task waits on
        #[arg(long, value_delimiter = ',')]
        blocked_by: Vec<String>,
        #[command(flatten)]
        scope: WorkspaceArgs,
    },
    /// Find the change, review or spec an ID refers to
    Resolve {
        #[arg(long)]
        parent_id: String,
        /// change, review or spec
        #[arg(long)]
        parent_type: Option<String>,
        #[command(flatten)]
        scope: WorkspaceArgs,
    },
    /// Print version information
    Version,
}

#[derive(Args)]
struct WorkspaceArgs {
    /// Workspace roots to search; the first one is the root workspace
    #[arg(long = "workspace")]
    workspaces: Vec<PathBuf>,
}

impl WorkspaceArgs {
    /// Workspaces in scope, defaulting to the current directory.
    fn load(self) -> Result<Vec<Workspace>> {
        let roots = if self.workspaces.is_empty() {
            vec![std::env::current_dir()?]
        } else {
            self.workspaces
        };
        Ok(roots
            .iter()
            .enumerate()
            .map(|(idx, root)| Workspace::from_root(root, idx == 0))
            .collect())
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let json = cli.json;
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if json {
                println!("{}", json!({ "error": err.to_string() }));
            } else {
                eprintln!("error: {err}");
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("TASKMESH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let json = cli.json;
    match cli.command {
        Some(Command::Show { file }) => show(&file, json),
        Some(Command::SetStatus { file, status }) => {
            let status: TaskStatus = status.parse()?;
            let transition = set_task_status(&file, status)?;
            journal(&file, LifecycleAction::SetStatus, &transition);
            emit(
                json,
                json!({ "ok": true, "path": file, "from": transition.from, "status": transition.to }),
                &format!("{}: {} -> {}", file.display(), transition.from, transition.to),
            );
            Ok(())
        }
        Some(Command::Complete { file }) => {
            let transition = complete_task_file(&file)?;
            journal(&file, LifecycleAction::Complete, &transition);
            emit(
                json,
                json!({
                    "ok": true,
                    "path": file,
                    "from": transition.from,
                    "status": transition.to,
                    "completed_items": transition.items,
                }),
                &format!(
                    "{}: {} ({} items checked)",
                    file.display(),
                    transition.to,
                    transition.items.len()
                ),
            );
            Ok(())
        }
        Some(Command::Undo { file }) => {
            let transition = undo_task_file(&file)?;
            journal(&file, LifecycleAction::Undo, &transition);
            emit(
                json,
                json!({
                    "ok": true,
                    "path": file,
                    "from": transition.from,
                    "status": transition.to,
                    "unchecked_items": transition.items,
                }),
                &format!(
                    "{}: {} ({} items unchecked)",
                    file.display(),
                    transition.to,
                    transition.items.len()
                ),
            );
            Ok(())
        }
        Some(Command::Create {
            title,
            parent_id,
            parent_type,
            skill_level,
            task_type,
            blocked_by,
            scope,
        }) => {
            let task = NewTask {
                title,
                parent_id,
                parent_type: parent_type
                    .as_deref()
                    .map(str::parse::<EntityKind>)
                    .transpose()?,
                skill_level: skill_level
                    .as_deref()
                    .map(str::parse::<SkillLevel>)
                    .transpose()?,
                task_type,
                blocked_by: blocked_by
                    .into_iter()
                    .map(|item| item.trim().to_string())
                    .filter(|item| !item.is_empty())
                    .collect(),
            };
            create(task, scope, json)
        }
        Some(Command::Resolve {
            parent_id,
            parent_type,
            scope,
        }) => resolve(&parent_id, parent_type.as_deref(), scope, json),
        Some(Command::Version) => {
            println!("taskmesh {}", taskmesh_core::version());
            Ok(())
        }
        None => {
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
    }
}

fn show(file: &Path, json: bool) -> Result<()> {
    let content = read_task(file)?;
    let parent = parse_task_parent_info(&content)?;
    let Some(fields) = parse(&content) else {
        emit(
            json,
            json!({ "path": file, "fields": Value::Null, "status": TaskStatus::default() }),
            &format!("{}: no frontmatter (status {})", file.display(), TaskStatus::default()),
        );
        return Ok(());
    };

    let known_type = fields.task_type.as_deref().map(is_known_template_type);
    let mut text = vec![format!("status: {}", fields.status)];
    if let Some(skill_level) = fields.skill_level {
        text.push(format!("skill-level: {skill_level}"));
    }
    if let Some(parent) = &parent {
        text.push(format!("parent: {} {}", parent.parent_type, parent.parent_id));
    }
    if let Some(task_type) = &fields.task_type {
        let note = if known_type == Some(true) { "" } else { " (custom)" };
        text.push(format!("type: {task_type}{note}"));
    }
    if let Some(blocked_by) = &fields.blocked_by {
        text.push(format!("blocked-by: {}", blocked_by.join(", ")));
    }
    emit(
        json,
        json!({ "path": file, "fields": fields, "parent": parent, "known_type": known_type }),
        &text.join("\n"),
    );
    Ok(())
}

fn create(task: NewTask, scope: WorkspaceArgs, json: bool) -> Result<()> {
    let workspaces = scope.load()?;
    let root = workspaces.first().ok_or_else(|| anyhow!("No workspace found"))?;
    let label = format!("{} create \"{}\"", resolve_command_name(&root.path), task.title);
    let created = create_task(&task, &workspaces, &FsCollectionProbe, &label)?;

    let event = LifecycleEvent::created(&created.workspace_path, &created.path);
    if let Err(err) = append_lifecycle_event(&created.workspace_path, &event) {
        tracing::warn!(error = %err, "failed to append audit event");
    }
    emit(
        json,
        json!({ "ok": true, "task": created }),
        &format!("Created task: {}", created.path.display()),
    );
    Ok(())
}

fn resolve(
    parent_id: &str,
    parent_type: Option<&str>,
    scope: WorkspaceArgs,
    json: bool,
) -> Result<()> {
    let hint = parent_type.map(str::parse::<EntityKind>).transpose()?;
    let workspaces = scope.load()?;
    let root = workspaces.first().ok_or_else(|| anyhow!("No workspace found"))?;
    let label = format!("{} resolve", resolve_command_name(&root.path));

    let parent = resolve_parent(parent_id, hint, &workspaces, &FsCollectionProbe, &label)?
        .ok_or_else(|| anyhow!("Parent not found: {parent_id}"))?;
    emit(
        json,
        json!({ "parent": parent }),
        &format!(
            "{} {} ({})",
            parent.kind,
            parent.path.display(),
            parent.project_name
        ),
    );
    Ok(())
}

/// Records a lifecycle change when the task lives in a workspace `tasks/` directory.
fn journal(file: &Path, action: LifecycleAction, transition: &Transition) {
    let Some(workspace_root) = file
        .parent()
        .filter(|dir| dir.file_name().and_then(|name| name.to_str()) == Some("tasks"))
        .and_then(Path::parent)
    else {
        return;
    };
    let event = LifecycleEvent::transition(action, workspace_root, file, transition);
    if let Err(err) = append_lifecycle_event(workspace_root, &event) {
        tracing::warn!(error = %err, "failed to append audit event");
    }
}

fn emit(json: bool, payload: Value, text: &str) {
    if json {
        println!("{payload}");
    } else {
        println!("{text}");
    }
}
