//! GitLab API client for hub2lab.
//!
//! This crate provides:
//! - Project lookup, get-or-create and initialization
//! - CI/CD variable synchronization
//! - Pipeline, job and commit status reads
//! - Repository file pushes and pipeline triggers
//!
//! Writes follow a read-compare-act pattern: fetch the remote state, compare
//! it with the desired state and only write on a mismatch, treating "not
//! found" as a reason to create.
//!
//! # Example
//!
//! ```no_run
//! use hub2lab_config::Settings;
//! use hub2lab_gitlab::{GitLabClient, ProjectRef, VariableSet};
//!
//! # async fn example() -> Result<(), hub2lab_gitlab::GitLabError> {
//! let settings = Settings::from_env();
//! let client = GitLabClient::from_settings(&settings.gitlab)?;
//!
//! let project: ProjectRef = "failfast-ci/app".parse()?;
//! let mut desired = VariableSet::new();
//! desired.insert("GITHUB_REPO".to_string(), "org/app".to_string());
//!
//! let report = client.sync_variables(&project, &desired).await?;
//! println!("{} variable(s) written", report.writes());
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod error;
pub mod models;
pub mod pipelines;
pub mod project_ref;
pub mod projects;
pub mod reconcile;
pub mod repository;
pub mod variables;

pub use client::{ClientDefaults, GitLabClient, API_VERSION};
pub use error::GitLabError;
pub use models::{
    Branch, BuildStatus, CommitStatus, FileCommit, Job, Namespace, Pipeline, Project,
    ProjectTemplate, Variable,
};
pub use project_ref::ProjectRef;
pub use projects::{InitStep, ProjectInitialization, MAIN_BRANCH, WORKING_BRANCH};
pub use reconcile::{is_conflict, plan_write, WriteAction};
pub use repository::FileUpdate;
pub use variables::{VariableSet, VariableSyncReport};
