//! CI/CD variable reconciliation.

use std::collections::BTreeMap;

use reqwest::Method;
use serde::Serialize;
use tracing::{debug, info};

use crate::client::GitLabClient;
use crate::error::GitLabError;
use crate::models::{Variable, VariableRequest};
use crate::project_ref::ProjectRef;
use crate::reconcile::{plan_write, WriteAction};

/// Desired variable values, keyed by variable name.
pub type VariableSet = BTreeMap<String, String>;

/// What [`GitLabClient::sync_variables`] did, per key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VariableSyncReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub unchanged: Vec<String>,
}

impl VariableSyncReport {
    /// Number of writes issued.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.created.len() + self.updated.len()
    }
}

impl GitLabClient {
    /// Make the project's variables match `desired`.
    ///
    /// Each key costs one read, plus one write only when the remote value
    /// differs (update) or is missing (create). Variables not named in
    /// `desired` are left alone.
    ///
    /// # Errors
    /// Stops at the first read or write that fails with anything but a 404
    /// on the read.
    pub async fn sync_variables(
        &self,
        project: &ProjectRef,
        desired: &VariableSet,
    ) -> Result<VariableSyncReport, GitLabError> {
        let id = self.resolve_project_id(project).await?;
        let collection = format!("/projects/{id}/variables");
        let mut report = VariableSyncReport::default();

        for (key, value) in desired {
            let key_path = format!("{collection}/{}", urlencoding::encode(key));
            let current: Option<Variable> = self.get_optional(&key_path).await?;
            let body = VariableRequest { key, value };

            match plan_write(current.as_ref().map(|v| v.value.as_str()), value.as_str()) {
                WriteAction::Skip => {
                    debug!(project_id = id, key = %key, "Variable up to date");
                    report.unchanged.push(key.clone());
                }
                WriteAction::Update => {
                    let _: Variable = self.send_json(Method::PUT, &key_path, &body).await?;
                    info!(project_id = id, key = %key, "Updated variable");
                    report.updated.push(key.clone());
                }
                WriteAction::Create => {
                    let _: Variable = self.send_json(Method::POST, &collection, &body).await?;
                    info!(project_id = id, key = %key, "Created variable");
                    report.created.push(key.clone());
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::test_client;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn desired(pairs: &[(&str, &str)]) -> VariableSet {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    async fn mount_existing(server: &MockServer, key: &str, value: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/api/v4/projects/3/variables/{key}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "key": key,
                "value": value,
                "protected": false
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    async fn mount_missing(server: &MockServer, key: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/api/v4/projects/3/variables/{key}")))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"message": "404 Variable Not Found"})),
            )
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_matching_variables_are_not_written() {
        let server = MockServer::start().await;
        mount_existing(&server, "GITHUB_REPO", "org/app").await;
        mount_existing(&server, "GITHUB_PR", "12").await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let report = client
            .sync_variables(
                &ProjectRef::Id(3),
                &desired(&[("GITHUB_REPO", "org/app"), ("GITHUB_PR", "12")]),
            )
            .await
            .unwrap();

        assert_eq!(report.writes(), 0);
        assert_eq!(report.unchanged, vec!["GITHUB_PR", "GITHUB_REPO"]);
    }

    #[tokio::test]
    async fn test_one_write_per_differing_or_missing_key() {
        let server = MockServer::start().await;
        mount_existing(&server, "SAME", "1").await;
        mount_existing(&server, "CHANGED", "old").await;
        mount_missing(&server, "NEW").await;

        Mock::given(method("PUT"))
            .and(path("/api/v4/projects/3/variables/CHANGED"))
            .and(body_json(json!({"key": "CHANGED", "value": "new"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"key": "CHANGED", "value": "new"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v4/projects/3/variables"))
            .and(body_json(json!({"key": "NEW", "value": "fresh"})))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"key": "NEW", "value": "fresh"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let report = client
            .sync_variables(
                &ProjectRef::Id(3),
                &desired(&[("SAME", "1"), ("CHANGED", "new"), ("NEW", "fresh")]),
            )
            .await
            .unwrap();

        assert_eq!(report.created, vec!["NEW"]);
        assert_eq!(report.updated, vec!["CHANGED"]);
        assert_eq!(report.unchanged, vec!["SAME"]);
        assert_eq!(report.writes(), 2);
    }

    #[tokio::test]
    async fn test_read_errors_other_than_not_found_propagate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v4/projects/3/variables/TOKEN"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client
            .sync_variables(&ProjectRef::Id(3), &desired(&[("TOKEN", "x")]))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(403));
    }

    #[tokio::test]
    async fn test_empty_set_resolves_project_only() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v4/projects/group%2Fapp"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 3, "name": "app"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let report = client
            .sync_variables(&ProjectRef::path("group", "app"), &VariableSet::new())
            .await
            .unwrap();
        assert_eq!(report, VariableSyncReport::default());
    }
}
