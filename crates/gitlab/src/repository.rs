//! Pushing files to a project repository.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::Method;
use tracing::{debug, info, warn};

use crate::client::GitLabClient;
use crate::error::GitLabError;
use crate::models::{FileCommit, FileRequest};
use crate::project_ref::ProjectRef;
use crate::projects::WORKING_BRANCH;
use crate::reconcile::is_conflict;

/// A file to write on a branch.
#[derive(Debug, Clone)]
pub struct FileUpdate {
    /// Path inside the repository.
    pub path: String,
    pub content: Vec<u8>,
    pub branch: String,
    /// Commit message.
    pub message: String,
}

impl GitLabClient {
    /// Write a file on a branch, creating or updating it as needed.
    ///
    /// First asks GitLab to create the branch from the working branch; that
    /// call is allowed to fail. Then creates the file, and if GitLab answers
    /// 400 or 409 because it already exists, sends the same body as an
    /// update.
    ///
    /// # Errors
    /// Returns [`GitLabError::Conflict`] if the update is rejected too, or
    /// any other error from the API.
    pub async fn push_file(
        &self,
        project: &ProjectRef,
        file: &FileUpdate,
    ) -> Result<FileCommit, GitLabError> {
        let id = self.resolve_project_id(project).await?;

        self.ensure_branch(id, &file.branch, WORKING_BRANCH).await;

        let path = format!(
            "/projects/{id}/repository/files/{}",
            urlencoding::encode(&file.path)
        );
        let body = FileRequest {
            file_path: &file.path,
            branch: &file.branch,
            encoding: "base64",
            content: STANDARD.encode(&file.content),
            commit_message: &file.message,
        };

        let response = self.request(Method::POST, &path)?.json(&body).send().await?;
        if !is_conflict(response.status()) {
            let commit: FileCommit = Self::handle_response(response).await?;
            info!(project_id = id, file = %file.path, branch = %file.branch, "Created file");
            return Ok(commit);
        }

        debug!(
            project_id = id,
            file = %file.path,
            status = response.status().as_u16(),
            "File exists, updating instead"
        );

        let response = self.request(Method::PUT, &path)?.json(&body).send().await?;
        let status = response.status();
        if is_conflict(status) {
            let message = response.text().await.unwrap_or_default();
            return Err(GitLabError::Conflict {
                status: status.as_u16(),
                message,
            });
        }

        let commit: FileCommit = Self::handle_response(response).await?;
        info!(project_id = id, file = %file.path, branch = %file.branch, "Updated file");
        Ok(commit)
    }

    /// Ask GitLab to create `branch` from `from`, ignoring the outcome.
    async fn ensure_branch(&self, project_id: u64, branch: &str, from: &str) {
        let request = match self.request(
            Method::POST,
            &format!("/projects/{project_id}/repository/branches"),
        ) {
            Ok(request) => request,
            Err(e) => {
                warn!(project_id, branch = %branch, error = %e, "Skipping branch creation");
                return;
            }
        };

        match request
            .query(&[("branch", branch), ("ref", from)])
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                info!(project_id, branch = %branch, from = %from, "Created branch");
            }
            Ok(response) => {
                debug!(
                    project_id,
                    branch = %branch,
                    status = response.status().as_u16(),
                    "Branch not created"
                );
            }
            Err(e) => {
                warn!(project_id, branch = %branch, error = %e, "Branch creation request failed");
            }
        }
    }
}
