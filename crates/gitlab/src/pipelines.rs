//! Pipeline, job and commit status reads, and build triggers.

use std::collections::BTreeMap;

use reqwest::Method;
use tracing::info;

use crate::client::GitLabClient;
use crate::error::GitLabError;
use crate::models::{CommitStatus, Job, Pipeline, TriggerRequest};
use crate::project_ref::ProjectRef;
use crate::projects::MAIN_BRANCH;

impl GitLabClient {
    /// Fetch a single job.
    ///
    /// # Errors
    /// Returns an error if the project or job cannot be fetched.
    pub async fn get_job(&self, project: &ProjectRef, job_id: u64) -> Result<Job, GitLabError> {
        let id = self.resolve_project_id(project).await?;
        self.get(&format!("/projects/{id}/jobs/{job_id}")).await
    }

    /// List the jobs of a pipeline.
    ///
    /// # Errors
    /// Returns an error if the project or pipeline cannot be fetched.
    pub async fn get_jobs(
        &self,
        project: &ProjectRef,
        pipeline_id: u64,
    ) -> Result<Vec<Job>, GitLabError> {
        let id = self.resolve_project_id(project).await?;
        self.get(&format!("/projects/{id}/pipelines/{pipeline_id}/jobs"))
            .await
    }

    /// Fetch a pipeline and its status.
    ///
    /// # Errors
    /// Returns an error if the project or pipeline cannot be fetched.
    pub async fn get_pipeline_status(
        &self,
        project: &ProjectRef,
        pipeline_id: u64,
    ) -> Result<Pipeline, GitLabError> {
        let id = self.resolve_project_id(project).await?;
        self.get(&format!("/projects/{id}/pipelines/{pipeline_id}"))
            .await
    }

    /// List statuses reported on a commit.
    ///
    /// # Errors
    /// Returns an error if the project or commit cannot be fetched.
    pub async fn get_commit_statuses(
        &self,
        project: &ProjectRef,
        sha: &str,
    ) -> Result<Vec<CommitStatus>, GitLabError> {
        let id = self.resolve_project_id(project).await?;
        self.get(&format!("/projects/{id}/repository/commits/{sha}/statuses"))
            .await
    }

    /// Start a pipeline with a trigger token.
    ///
    /// `trigger_token` and `branch` fall back to the configured defaults;
    /// the branch finally falls back to `master`.
    ///
    /// # Errors
    /// Returns [`GitLabError::Config`] when no trigger token is available,
    /// or any error from the API.
    pub async fn trigger_build(
        &self,
        project: &ProjectRef,
        variables: &BTreeMap<String, String>,
        trigger_token: Option<&str>,
        branch: Option<&str>,
    ) -> Result<Pipeline, GitLabError> {
        let token = trigger_token
            .or(self.defaults.trigger_token.as_deref())
            .ok_or_else(|| {
                GitLabError::Config("no trigger token given and GITLAB_TRIGGER is not set".to_string())
            })?;
        let git_ref = branch
            .or(self.defaults.branch.as_deref())
            .unwrap_or(MAIN_BRANCH);

        let id = self.resolve_project_id(project).await?;
        let body = TriggerRequest {
            token,
            git_ref,
            variables,
        };

        let pipeline: Pipeline = self
            .send_json(Method::POST, &format!("/projects/{id}/trigger/pipeline"), &body)
            .await?;

        info!(
            project_id = id,
            pipeline_id = pipeline.id,
            git_ref = %git_ref,
            "Triggered pipeline"
        );
        Ok(pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::test_client;
    use crate::client::ClientDefaults;
    use crate::models::BuildStatus;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_job() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v4/projects/4/jobs/99"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 99,
                "name": "unit-tests",
                "status": "failed",
                "stage": "test",
                "ref": "pr-12",
                "duration": 12.5
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let job = client.get_job(&ProjectRef::Id(4), 99).await.unwrap();
        assert_eq!(job.name, "unit-tests");
        assert_eq!(job.status, BuildStatus::Failed);
        assert_eq!(job.git_ref.as_deref(), Some("pr-12"));
    }

    #[tokio::test]
    async fn test_get_jobs_of_pipeline() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v4/projects/4/pipelines/20/jobs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "name": "build", "status": "success"},
                {"id": 2, "name": "test", "status": "running"}
            ])))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let jobs = client.get_jobs(&ProjectRef::Id(4), 20).await.unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[1].status, BuildStatus::Running);
    }

    #[tokio::test]
    async fn test_get_pipeline_status_via_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v4/projects/group%2Fapp"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 4, "name": "app"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v4/projects/4/pipelines/20"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 20,
                "status": "success",
                "ref": "master",
                "sha": "deadbeef"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let pipeline = client
            .get_pipeline_status(&ProjectRef::path("group", "app"), 20)
            .await
            .unwrap();
        assert_eq!(pipeline.status, BuildStatus::Success);
        assert!(pipeline.status.is_finished());
    }

    #[tokio::test]
    async fn test_get_commit_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v4/projects/4/repository/commits/deadbeef/statuses"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": 5,
                "sha": "deadbeef",
                "name": "lint",
                "status": "pending",
                "target_url": "https://gitlab.example.com/jobs/5"
            }])))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let statuses = client
            .get_commit_statuses(&ProjectRef::Id(4), "deadbeef")
            .await
            .unwrap();
        assert_eq!(statuses[0].status, BuildStatus::Pending);
    }

    #[tokio::test]
    async fn test_missing_pipeline_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v4/projects/4/pipelines/404"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client
            .get_pipeline_status(&ProjectRef::Id(4), 404)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_trigger_build_with_explicit_arguments() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v4/projects/4/trigger/pipeline"))
            .and(body_json(json!({
                "token": "trig",
                "ref": "pr-12",
                "variables": {"EVENT": "pull_request", "SHA": "abc"}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 31,
                "status": "created",
                "ref": "pr-12"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let variables = BTreeMap::from([
            ("EVENT".to_string(), "pull_request".to_string()),
            ("SHA".to_string(), "abc".to_string()),
        ]);
        let pipeline = client
            .trigger_build(&ProjectRef::Id(4), &variables, Some("trig"), Some("pr-12"))
            .await
            .unwrap();
        assert_eq!(pipeline.id, 31);
    }

    #[tokio::test]
    async fn test_trigger_build_uses_defaults() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v4/projects/4/trigger/pipeline"))
            .and(body_json(json!({
                "token": "default-trigger",
                "ref": "master",
                "variables": {}
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"id": 32, "status": "pending"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri()).with_defaults(ClientDefaults {
            trigger_token: Some("default-trigger".to_string()),
            ..ClientDefaults::default()
        });
        let pipeline = client
            .trigger_build(&ProjectRef::Id(4), &BTreeMap::new(), None, None)
            .await
            .unwrap();
        assert_eq!(pipeline.status, BuildStatus::Pending);
    }

    #[tokio::test]
    async fn test_trigger_build_without_token_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client
            .trigger_build(&ProjectRef::Id(4), &BTreeMap::new(), None, Some("master"))
            .await
            .unwrap_err();
        assert!(matches!(err, GitLabError::Config(_)));
    }
}
