//! CLI for hub2lab GitLab operations
//!
//! Run `hub2lab --help` for usage information.

// CLI binaries legitimately need println! for user output
#![allow(clippy::disallowed_macros)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use hub2lab_config::{BuildEvent, Settings};
use hub2lab_gitlab::{FileUpdate, GitLabClient, ProjectRef, VariableSet, MAIN_BRANCH};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "hub2lab")]
#[command(about = "Provision GitLab projects and drive their CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved settings (secrets omitted)
    Config,

    /// Project lookup and provisioning
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },

    /// Make project CI/CD variables match the given values
    Variables {
        /// Project ID or namespace/name (defaults to GITLAB_REPO)
        #[arg(short, long)]
        project: Option<String>,

        /// Variable as KEY=VALUE, repeatable
        #[arg(long = "var", value_parser = parse_key_val)]
        vars: Vec<(String, String)>,
    },

    /// Fetch a job
    Job {
        /// Project ID or namespace/name (defaults to GITLAB_REPO)
        #[arg(short, long)]
        project: Option<String>,

        /// Job ID
        job_id: u64,
    },

    /// List the jobs of a pipeline
    Jobs {
        /// Project ID or namespace/name (defaults to GITLAB_REPO)
        #[arg(short, long)]
        project: Option<String>,

        /// Pipeline ID
        pipeline_id: u64,
    },

    /// Fetch a pipeline and its status
    Pipeline {
        /// Project ID or namespace/name (defaults to GITLAB_REPO)
        #[arg(short, long)]
        project: Option<String>,

        /// Pipeline ID
        pipeline_id: u64,
    },

    /// List statuses reported on a commit
    Statuses {
        /// Project ID or namespace/name (defaults to GITLAB_REPO)
        #[arg(short, long)]
        project: Option<String>,

        /// Commit SHA
        sha: String,
    },

    /// Create or update a file on a branch
    PushFile {
        /// Project ID or namespace/name (defaults to GITLAB_REPO)
        #[arg(short, long)]
        project: Option<String>,

        /// Local file to upload
        source: PathBuf,

        /// Path inside the repository (defaults to the source file name)
        #[arg(long)]
        path: Option<String>,

        /// Target branch
        #[arg(short, long)]
        branch: String,

        /// Commit message
        #[arg(short, long, default_value = "update file")]
        message: String,
    },

    /// Start a pipeline with a trigger token
    Trigger {
        /// Project ID or namespace/name (defaults to GITLAB_REPO)
        #[arg(short, long)]
        project: Option<String>,

        /// Branch or ref to build (defaults to GITLAB_BRANCH, then master)
        #[arg(short, long)]
        branch: Option<String>,

        /// Trigger token (defaults to GITLAB_TRIGGER)
        #[arg(long)]
        token: Option<String>,

        /// Only build if the build policy allows this event on the branch
        #[arg(long, value_enum)]
        event: Option<EventKind>,

        /// Pipeline variable as KEY=VALUE, repeatable
        #[arg(long = "var", value_parser = parse_key_val)]
        vars: Vec<(String, String)>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum EventKind {
    Push,
    PullRequest,
    Tag,
}

impl From<EventKind> for BuildEvent {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Push => Self::Push,
            EventKind::PullRequest => Self::PullRequest,
            EventKind::Tag => Self::Tag,
        }
    }
}

#[derive(Subcommand)]
enum ProjectCommand {
    /// Fetch a project
    Get {
        /// Project ID or namespace/name (defaults to GITLAB_REPO)
        project: Option<String>,
    },

    /// Fetch a project, creating it if missing
    Ensure {
        /// Project name
        name: String,

        /// Namespace (defaults to FAILFASTCI_NAMESPACE)
        #[arg(short, long)]
        namespace: Option<String>,
    },

    /// Ensure a project and seed its main branch
    Init {
        /// Project name
        name: String,

        /// Namespace (defaults to FAILFASTCI_NAMESPACE)
        #[arg(short, long)]
        namespace: Option<String>,
    },

    /// Delete a project
    Delete {
        /// Project ID or namespace/name
        project: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    let settings = Settings::from_env();
    run(&settings, cli.command).await
}

async fn run(settings: &Settings, command: Commands) -> Result<()> {
    let connect = || {
        GitLabClient::from_settings(&settings.gitlab).context("Failed to create GitLab client")
    };

    match command {
        Commands::Config => print_json(settings)?,
        Commands::Project { command } => run_project(&connect()?, command).await?,
        Commands::Variables { project, vars } => {
            let client = connect()?;
            let project = resolve_project(&client, project)?;
            let desired: VariableSet = vars.into_iter().collect();
            let report = client
                .sync_variables(&project, &desired)
                .await
                .with_context(|| format!("Failed to sync variables on {project}"))?;
            info!(
                created = report.created.len(),
                updated = report.updated.len(),
                unchanged = report.unchanged.len(),
                "Variables synced"
            );
            print_json(&report)?;
        }
        Commands::Job { project, job_id } => {
            let client = connect()?;
            let project = resolve_project(&client, project)?;
            print_json(&client.get_job(&project, job_id).await?)?;
        }
        Commands::Jobs {
            project,
            pipeline_id,
        } => {
            let client = connect()?;
            let project = resolve_project(&client, project)?;
            print_json(&client.get_jobs(&project, pipeline_id).await?)?;
        }
        Commands::Pipeline {
            project,
            pipeline_id,
        } => {
            let client = connect()?;
            let project = resolve_project(&client, project)?;
            print_json(&client.get_pipeline_status(&project, pipeline_id).await?)?;
        }
        Commands::Statuses { project, sha } => {
            let client = connect()?;
            let project = resolve_project(&client, project)?;
            print_json(&client.get_commit_statuses(&project, &sha).await?)?;
        }
        Commands::PushFile {
            project,
            source,
            path,
            branch,
            message,
        } => {
            let client = connect()?;
            let project = resolve_project(&client, project)?;
            let content = tokio::fs::read(&source)
                .await
                .with_context(|| format!("Failed to read {}", source.display()))?;
            let path = match path {
                Some(path) => path,
                None => repository_path(&source)?,
            };
            let file = FileUpdate {
                path,
                content,
                branch,
                message,
            };
            print_json(&client.push_file(&project, &file).await?)?;
        }
        Commands::Trigger {
            project,
            branch,
            token,
            event,
            vars,
        } => {
            let client = connect()?;
            let project = resolve_project(&client, project)?;
            if let Some(event) = event {
                let git_ref = branch
                    .as_deref()
                    .or(settings.gitlab.branch.as_deref())
                    .unwrap_or(MAIN_BRANCH);
                if !settings.failfast.should_build(event.into(), git_ref) {
                    info!(project = %project, git_ref, "Build policy skips this event");
                    println!("Skipped build of {git_ref} on {project}");
                    return Ok(());
                }
            }
            let variables: BTreeMap<String, String> = vars.into_iter().collect();
            let pipeline = client
                .trigger_build(&project, &variables, token.as_deref(), branch.as_deref())
                .await
                .with_context(|| format!("Failed to trigger pipeline on {project}"))?;
            print_json(&pipeline)?;
        }
    }

    Ok(())
}

async fn run_project(client: &GitLabClient, command: ProjectCommand) -> Result<()> {
    match command {
        ProjectCommand::Get { project } => {
            let project = resolve_project(client, project)?;
            print_json(&client.get_project(&project).await?)
        }
        ProjectCommand::Ensure { name, namespace } => {
            let project = client
                .get_or_create_project(&name, namespace.as_deref())
                .await
                .with_context(|| format!("Failed to ensure project {name}"))?;
            print_json(&project)
        }
        ProjectCommand::Init { name, namespace } => {
            let init = client
                .initialize_project(&name, namespace.as_deref())
                .await
                .with_context(|| format!("Failed to initialize project {name}"))?;
            print_json(&init)
        }
        ProjectCommand::Delete { project } => {
            let project: ProjectRef = project.parse()?;
            client.delete_project(&project).await?;
            println!("Deleted project {project}");
            Ok(())
        }
    }
}

/// Parse the optional project argument, falling back to `GITLAB_REPO`.
fn resolve_project(client: &GitLabClient, project: Option<String>) -> Result<ProjectRef> {
    let project = project.map(|p| p.parse::<ProjectRef>()).transpose()?;
    Ok(client.project_or_default(project)?)
}

fn repository_path(source: &std::path::Path) -> Result<String> {
    source
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Cannot derive a repository path from {}", source.display()))
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))?;
    if key.is_empty() {
        return Err(format!("empty key in {raw:?}"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
