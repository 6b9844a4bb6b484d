//! Project lookup, provisioning and initialization.

use std::fmt;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::client::GitLabClient;
use crate::error::GitLabError;
use crate::models::{Branch, CreateProjectRequest, Namespace, Project};
use crate::project_ref::ProjectRef;
use crate::repository::FileUpdate;

/// Branch every project is seeded on.
pub const MAIN_BRANCH: &str = "master";

/// Scratch branch the bridge pushes CI files to.
pub const WORKING_BRANCH: &str = "_failfastci";

/// Ordered steps of [`GitLabClient::initialize_project`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStep {
    EnsureProject,
    CheckBranch,
    SeedReadme,
    UnprotectBranch,
    CreateWorkingBranch,
}

impl fmt::Display for InitStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::EnsureProject => "ensure-project",
            Self::CheckBranch => "check-branch",
            Self::SeedReadme => "seed-readme",
            Self::UnprotectBranch => "unprotect-branch",
            Self::CreateWorkingBranch => "create-working-branch",
        };
        f.write_str(s)
    }
}

/// Outcome of initializing a project.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectInitialization {
    pub project: Project,
    /// Whether the main branch had to be created.
    pub seeded: bool,
}

impl GitLabClient {
    /// Fetch a project.
    ///
    /// # Errors
    /// Returns [`GitLabError::NotFound`] if the project does not exist.
    pub async fn get_project(&self, project: &ProjectRef) -> Result<Project, GitLabError> {
        self.get(&format!("/projects/{}", project.encoded())).await
    }

    /// ID of the namespace found by searching for `namespace`.
    ///
    /// Takes the first search result. GitLab searches by substring, so this
    /// is only exact when namespace names are unique.
    ///
    /// # Errors
    /// Returns [`GitLabError::NotFound`] when the search comes back empty.
    pub async fn get_namespace_id(&self, namespace: &str) -> Result<u64, GitLabError> {
        let path = format!("/namespaces?search={}", urlencoding::encode(namespace));
        let found: Vec<Namespace> = self.get(&path).await?;

        if found.len() > 1 {
            warn!(
                namespace = %namespace,
                matches = found.len(),
                chosen = %found[0].path,
                "Namespace search is ambiguous, using first result"
            );
        }

        found
            .first()
            .map(|ns| ns.id)
            .ok_or_else(|| GitLabError::NotFound(format!("namespace {namespace}")))
    }

    /// Fetch `namespace/name`, creating it if the lookup does not succeed.
    ///
    /// `namespace` falls back to the configured default.
    ///
    /// # Errors
    /// Returns an error if the namespace cannot be found or the create fails.
    pub async fn get_or_create_project(
        &self,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<Project, GitLabError> {
        let namespace = namespace.unwrap_or(&self.defaults.namespace);
        let project = ProjectRef::path(namespace, name);

        let response = self
            .request(Method::GET, &format!("/projects/{}", project.encoded()))?
            .send()
            .await?;

        if response.status() == StatusCode::OK {
            debug!(project = %project, "Project already exists");
            return Self::handle_response(response).await;
        }

        info!(
            project = %project,
            status = response.status().as_u16(),
            "Project lookup failed, creating project"
        );

        let namespace_id = self.get_namespace_id(namespace).await?;
        let body = CreateProjectRequest::new(name, namespace_id, &self.defaults.template);
        let created: Project = self.send_json(Method::POST, "/projects", &body).await?;

        info!(project = %project, project_id = created.id, "Project created");
        Ok(created)
    }

    /// Delete a project.
    ///
    /// # Errors
    /// Returns an error if the project cannot be resolved or deleted.
    pub async fn delete_project(&self, project: &ProjectRef) -> Result<(), GitLabError> {
        let id = self.resolve_project_id(project).await?;
        info!(project_id = id, "Deleting project");

        let response = self
            .request(Method::DELETE, &format!("/projects/{id}"))?
            .send()
            .await?;
        Self::check_status(response).await
    }

    /// Make sure `namespace/name` exists and has a usable main branch.
    ///
    /// Steps run in order: ensure the project, check the main branch, and if
    /// it is missing seed a README, unprotect the branch and create the
    /// working branch from it. Nothing is rolled back when a step fails; the
    /// error names the step, and calling again is safe.
    ///
    /// # Errors
    /// Returns [`GitLabError::Initialization`] naming the failed step.
    pub async fn initialize_project(
        &self,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<ProjectInitialization, GitLabError> {
        let project = self
            .get_or_create_project(name, namespace)
            .await
            .map_err(GitLabError::at_step(InitStep::EnsureProject))?;
        let id = project.id;

        let branch_path = format!("/projects/{id}/repository/branches/{MAIN_BRANCH}");
        let existing: Option<Branch> = self
            .get_optional(&branch_path)
            .await
            .map_err(GitLabError::at_step(InitStep::CheckBranch))?;

        if existing.is_some() {
            debug!(project_id = id, "Main branch present, nothing to initialize");
            return Ok(ProjectInitialization {
                project,
                seeded: false,
            });
        }

        info!(project_id = id, branch = MAIN_BRANCH, "Seeding main branch");
        self.settle().await;

        let readme = FileUpdate {
            path: "README.md".to_string(),
            content: format!("# {name}").into_bytes(),
            branch: MAIN_BRANCH.to_string(),
            message: "init readme".to_string(),
        };
        self.push_file(&ProjectRef::Id(id), &readme)
            .await
            .map_err(GitLabError::at_step(InitStep::SeedReadme))?;

        self.settle().await;

        self.unprotect_branch(id, MAIN_BRANCH)
            .await
            .map_err(GitLabError::at_step(InitStep::UnprotectBranch))?;

        self.create_branch(id, WORKING_BRANCH, MAIN_BRANCH)
            .await
            .map_err(GitLabError::at_step(InitStep::CreateWorkingBranch))?;

        info!(project_id = id, "Project initialized");
        Ok(ProjectInitialization {
            project,
            seeded: true,
        })
    }

    async fn unprotect_branch(&self, project_id: u64, branch: &str) -> Result<(), GitLabError> {
        let response = self
            .request(
                Method::PUT,
                &format!("/projects/{project_id}/repository/branches/{branch}/unprotect"),
            )?
            .send()
            .await?;
        Self::check_status(response).await
    }

    /// Create `branch` from `from`; an existing branch counts as success.
    async fn create_branch(&self, project_id: u64, branch: &str, from: &str) -> Result<(), GitLabError> {
        let response = self
            .request(
                Method::POST,
                &format!("/projects/{project_id}/repository/branches"),
            )?
            .query(&[("branch", branch), ("ref", from)])
            .send()
            .await?;

        if response.status() == StatusCode::BAD_REQUEST {
            debug!(project_id, branch = %branch, "Branch already exists");
            return Ok(());
        }
        Self::check_status(response).await
    }

    async fn settle(&self) {
        let delay = self.defaults.settle_delay;
        if delay > Duration::ZERO {
            tokio::time::sleep(delay).await;
        }
    }
}
