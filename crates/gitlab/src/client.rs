//! GitLab API client: connection, headers and response handling.
//!
//! Resource operations live in sibling modules as further `impl` blocks on
//! [`GitLabClient`].

use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

use hub2lab_config::settings::{DEFAULT_GITLAB_TIMEOUT_SECS, DEFAULT_NAMESPACE};
use hub2lab_config::GitLabSettings;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::GitLabError;
use crate::models::ProjectTemplate;
use crate::project_ref::ProjectRef;

/// Versioned prefix of every API path.
pub const API_VERSION: &str = "/api/v4";

/// Pause between initialization steps so GitLab catches up.
const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

const PRIVATE_TOKEN: &str = "private-token";

/// Fallbacks used when a call leaves an argument unspecified.
#[derive(Clone)]
pub struct ClientDefaults {
    /// Project used when none is given (`GITLAB_REPO`).
    pub project: Option<ProjectRef>,
    /// Namespace for created projects.
    pub namespace: String,
    /// Branch for build triggers (`GITLAB_BRANCH`).
    pub branch: Option<String>,
    /// Pipeline trigger token (`GITLAB_TRIGGER`).
    pub trigger_token: Option<String>,
    /// Visibility and features of created projects.
    pub template: ProjectTemplate,
    pub settle_delay: Duration,
}

impl Default for ClientDefaults {
    fn default() -> Self {
        Self {
            project: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            branch: None,
            trigger_token: None,
            template: ProjectTemplate::default(),
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

/// Client for the GitLab REST API.
///
/// Every call is awaited before the next one is issued. The client keeps no
/// per-project state, so callers must serialize reconciliation of the same
/// project themselves.
pub struct GitLabClient {
    http: Client,
    endpoint: String,
    token: String,
    headers: OnceLock<HeaderMap>,
    pub(crate) defaults: ClientDefaults,
}

impl fmt::Debug for GitLabClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitLabClient")
            .field("endpoint", &self.endpoint)
            .field("namespace", &self.defaults.namespace)
            .finish_non_exhaustive()
    }
}

impl GitLabClient {
    /// Create a client with the default timeout.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Result<Self, GitLabError> {
        Self::with_timeout(endpoint, token, Duration::from_secs(DEFAULT_GITLAB_TIMEOUT_SECS))
    }

    /// Create a client whose every request uses `timeout`.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn with_timeout(
        endpoint: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GitLabError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(GitLabError::Http)?;

        let endpoint: String = endpoint.into();

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token: token.into(),
            headers: OnceLock::new(),
            defaults: ClientDefaults::default(),
        })
    }

    /// Create a client from process settings.
    ///
    /// # Errors
    /// Returns [`GitLabError::Config`] when no token is configured or the
    /// default project is malformed.
    pub fn from_settings(settings: &GitLabSettings) -> Result<Self, GitLabError> {
        let token = settings
            .token
            .clone()
            .ok_or_else(|| GitLabError::Config("GITLAB_TOKEN is not set".to_string()))?;

        let project = settings
            .repo
            .as_deref()
            .map(str::parse::<ProjectRef>)
            .transpose()
            .map_err(|e| GitLabError::Config(format!("GITLAB_REPO: {e}")))?;

        let defaults = ClientDefaults {
            project,
            namespace: settings.project_defaults.namespace.clone(),
            branch: settings.branch.clone(),
            trigger_token: settings.trigger.clone(),
            // Created projects are always public with only CI enabled.
            template: ProjectTemplate::default(),
            settle_delay: DEFAULT_SETTLE_DELAY,
        };

        Ok(Self::with_timeout(
            settings.api.clone(),
            token,
            Duration::from_secs(settings.timeout_secs),
        )?
        .with_defaults(defaults))
    }

    /// Replace the call fallbacks.
    #[must_use]
    pub fn with_defaults(mut self, defaults: ClientDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Change the pause between initialization steps.
    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.defaults.settle_delay = delay;
        self
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[must_use]
    pub fn defaults(&self) -> &ClientDefaults {
        &self.defaults
    }

    /// The given project, or the configured default one.
    ///
    /// # Errors
    /// Returns [`GitLabError::Config`] when neither is available.
    pub fn project_or_default(&self, project: Option<ProjectRef>) -> Result<ProjectRef, GitLabError> {
        project
            .or_else(|| self.defaults.project.clone())
            .ok_or_else(|| {
                GitLabError::Config("no project given and GITLAB_REPO is not set".to_string())
            })
    }

    /// Header set sent with every request, derived once from the token.
    fn headers(&self) -> Result<&HeaderMap, GitLabError> {
        if let Some(headers) = self.headers.get() {
            return Ok(headers);
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("hub2lab: ", env!("CARGO_PKG_VERSION"))),
        );
        let token = HeaderValue::from_str(&self.token)
            .map_err(|_| GitLabError::Config("GitLab token is not a valid header value".to_string()))?;
        headers.insert(PRIVATE_TOKEN, token);

        Ok(self.headers.get_or_init(|| headers))
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{API_VERSION}{path}", self.endpoint)
    }

    /// Start an authenticated request against an API path.
    pub(crate) fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, GitLabError> {
        let url = self.url(path);
        debug!(method = %method, url = %url, "GitLab request");
        Ok(self.http.request(method, url).headers(self.headers()?.clone()))
    }

    /// Make an authenticated GET request and parse the body.
    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, GitLabError> {
        let response = self.request(Method::GET, path)?.send().await?;
        Self::handle_response(response).await
    }

    /// Make an authenticated GET request, mapping 404 to `None`.
    pub(crate) async fn get_optional<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>, GitLabError> {
        let response = self.request(Method::GET, path)?.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::handle_response(response).await.map(Some)
    }

    /// Make an authenticated request with a JSON body and parse the reply.
    pub(crate) async fn send_json<T, B>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, GitLabError>
    where
        T: DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let response = self.request(method, path)?.json(body).send().await?;
        Self::handle_response(response).await
    }

    /// Parse a successful response, or turn the status into an error.
    pub(crate) async fn handle_response<T: DeserializeOwned>(
        response: Response,
    ) -> Result<T, GitLabError> {
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            serde_json::from_str(&text).map_err(|e| {
                warn!(error = %e, body = %text, "Failed to parse GitLab response");
                GitLabError::Serialization(e)
            })
        } else {
            Err(Self::status_error(status, text))
        }
    }

    /// Succeed on 2xx without looking at the body.
    pub(crate) async fn check_status(response: Response) -> Result<(), GitLabError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(Self::status_error(status, text))
        }
    }

    pub(crate) fn status_error(status: StatusCode, body: String) -> GitLabError {
        if status == StatusCode::NOT_FOUND {
            GitLabError::NotFound(body)
        } else {
            GitLabError::Remote {
                status: status.as_u16(),
                body,
            }
        }
    }

    /// Numeric ID of a project.
    ///
    /// IDs pass through without a request; paths cost exactly one lookup.
    ///
    /// # Errors
    /// Returns [`GitLabError::NotFound`] when the path does not resolve.
    pub async fn resolve_project_id(&self, project: &ProjectRef) -> Result<u64, GitLabError> {
        match project {
            ProjectRef::Id(id) => Ok(*id),
            ProjectRef::Path { .. } => {
                let found = self.get_project(project).await?;
                debug!(project = %project, project_id = found.id, "Resolved project path");
                Ok(found.id)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub(crate) const TOKEN: &str = "test-token";

    pub(crate) fn test_client(uri: &str) -> GitLabClient {
        GitLabClient::with_timeout(uri, TOKEN, Duration::from_secs(5))
            .expect("http client")
            .with_settle_delay(Duration::ZERO)
    }
}
