//! The settings tree, built once at startup.

use serde::Serialize;
use std::fmt;
use tracing::warn;

use crate::env::{env_bool, non_empty, resolve_with};
use crate::policy::{BuildEvent, BuildPolicy};

/// Default GitLab instance.
pub const DEFAULT_GITLAB_API: &str = "https://gitlab.com";
/// Default request timeout against GitLab, in seconds.
pub const DEFAULT_GITLAB_TIMEOUT_SECS: u64 = 30;
/// Group that hosts mirrored projects.
pub const DEFAULT_NAMESPACE: &str = "failfast-ci";
/// Default job-status API.
pub const DEFAULT_FAILFAST_API: &str = "https://jobs.failfast-ci.io";

/// Project visibility on GitLab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Private,
    Internal,
    Public,
}

impl Visibility {
    /// Parse a visibility name, forcing anything unknown to `Private`.
    #[must_use]
    pub fn parse_or_private(raw: &str) -> Self {
        match raw {
            "private" => Self::Private,
            "internal" => Self::Internal,
            "public" => Self::Public,
            other => {
                warn!(value = other, "invalid project visibility, using private");
                Self::Private
            }
        }
    }

    /// Legacy numeric `visibility_level` understood by the GitLab API.
    #[must_use]
    pub const fn level(self) -> u8 {
        match self {
            Self::Private => 0,
            Self::Internal => 10,
            Self::Public => 20,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Internal => "internal",
            Self::Public => "public",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Features toggled on projects created by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct FeatureFlags {
    /// CI jobs. Always on; without them the bridge has nothing to do.
    pub jobs: bool,
    pub shared_runners: bool,
    pub container_registry: bool,
    pub wiki: bool,
    pub snippets: bool,
    pub merge_requests: bool,
    pub issues: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            jobs: true,
            shared_runners: false,
            container_registry: false,
            wiki: false,
            snippets: false,
            merge_requests: false,
            issues: false,
        }
    }
}

/// Defaults applied to projects the bridge creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectDefaults {
    pub visibility: Visibility,
    pub namespace: String,
    pub robot_user: Option<String>,
    pub enabled: FeatureFlags,
}

impl Default for ProjectDefaults {
    fn default() -> Self {
        Self {
            visibility: Visibility::Internal,
            namespace: DEFAULT_NAMESPACE.to_string(),
            robot_user: None,
            enabled: FeatureFlags::default(),
        }
    }
}

/// GitLab connection settings.
#[derive(Clone, Serialize)]
pub struct GitLabSettings {
    /// Base URL of the instance, without the `/api/v4` suffix.
    pub api: String,
    /// Private token for API calls.
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub timeout_secs: u64,
    /// Default project as `namespace/name`.
    pub repo: Option<String>,
    /// Default branch for build triggers.
    pub branch: Option<String>,
    /// Default pipeline trigger token.
    #[serde(skip_serializing)]
    pub trigger: Option<String>,
    pub user: Option<String>,
    pub project_defaults: ProjectDefaults,
}

impl fmt::Debug for GitLabSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitLabSettings")
            .field("api", &self.api)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("trigger", &self.trigger.as_ref().map(|_| "<redacted>"))
            .field("user", &self.user)
            .field("project_defaults", &self.project_defaults)
            .finish()
    }
}

/// GitHub App identity used when reporting statuses back.
#[derive(Debug, Clone, Serialize)]
pub struct GitHubSettings {
    /// Status context shown on pull requests.
    pub context: String,
    pub integration_id: String,
    pub installation_id: String,
    #[serde(skip_serializing)]
    pub secret_token: Option<String>,
}

/// Build policy and job API settings.
#[derive(Debug, Clone, Serialize)]
pub struct FailFastSettings {
    pub api: String,
    /// Whether pull request events trigger builds at all.
    pub build_pull_request: bool,
    /// Whether push events trigger builds at all.
    pub build_push: bool,
    pub build: BuildPolicy,
}

impl FailFastSettings {
    /// Whether an event on `git_ref` should start a build.
    ///
    /// Pull requests are gated by `build_pull_request`; pushes and tags by
    /// `build_push`. The branch patterns apply on top of the gate.
    #[must_use]
    pub fn should_build(&self, event: BuildEvent, git_ref: &str) -> bool {
        let enabled = match event {
            BuildEvent::PullRequest => self.build_pull_request,
            BuildEvent::Push | BuildEvent::Tag => self.build_push,
        };
        enabled && self.build.allows(event, git_ref)
    }
}

/// Immutable settings for the whole process.
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    pub app_env: String,
    pub gitlab: GitLabSettings,
    pub github: GitHubSettings,
    pub failfast: FailFastSettings,
}

impl Settings {
    /// Read settings from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup<L>(lookup: L) -> Self
    where
        L: Fn(&str) -> Option<String>,
    {
        let text = |name: &str, default: &str| {
            resolve_with(&lookup, name, default.to_string(), str::to_string)
        };
        let optional = |name: &str| resolve_with(&lookup, name, None, non_empty);
        let flag = |name: &str, default: bool| resolve_with(&lookup, name, default, env_bool);

        let user = optional("GITLAB_USER");

        let project_defaults = ProjectDefaults {
            visibility: resolve_with(
                &lookup,
                "GITLAB_REPO_PRIVACY",
                Visibility::Internal,
                Visibility::parse_or_private,
            ),
            namespace: text("FAILFASTCI_NAMESPACE", DEFAULT_NAMESPACE),
            robot_user: user.clone(),
            enabled: FeatureFlags {
                jobs: true,
                shared_runners: flag("GITLAB_SHARED_RUNNERS", false),
                container_registry: flag("GITLAB_CONTAINER_REGISTRY", false),
                wiki: flag("GITLAB_WIKI", false),
                snippets: flag("GITLAB_SNIPPETS", false),
                merge_requests: flag("GITLAB_MERGE_REQUESTS", false),
                issues: flag("GITLAB_ISSUES", false),
            },
        };

        let timeout_secs = resolve_with(
            &lookup,
            "GITLAB_TIMEOUT",
            DEFAULT_GITLAB_TIMEOUT_SECS,
            |raw| {
                raw.parse().unwrap_or_else(|_| {
                    warn!(value = raw, "invalid GITLAB_TIMEOUT, using default");
                    DEFAULT_GITLAB_TIMEOUT_SECS
                })
            },
        );

        Self {
            app_env: text("APP_ENV", "development"),
            gitlab: GitLabSettings {
                api: text("GITLAB_API", DEFAULT_GITLAB_API),
                token: optional("GITLAB_TOKEN"),
                timeout_secs,
                repo: optional("GITLAB_REPO"),
                branch: optional("GITLAB_BRANCH"),
                trigger: optional("GITLAB_TRIGGER"),
                user,
                project_defaults,
            },
            github: GitHubSettings {
                context: text("GITHUB_CONTEXT", "gitlab-ci"),
                integration_id: text("GITHUB_INTEGRATION_ID", "743"),
                installation_id: text("GITHUB_INSTALLATION_ID", "3709"),
                secret_token: optional("GITHUB_SECRET_TOKEN"),
            },
            failfast: FailFastSettings {
                api: text("FAILFAST_CI_API", DEFAULT_FAILFAST_API),
                build_pull_request: flag("BUILD_PULL_REQUEST", true),
                build_push: flag("BUILD_PUSH", false),
                build: BuildPolicy::default(),
            },
        }
    }
}
