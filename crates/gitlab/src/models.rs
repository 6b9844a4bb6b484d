//! GitLab API request and response types.

use std::collections::BTreeMap;
use std::fmt;

use hub2lab_config::{FeatureFlags, ProjectDefaults, Visibility};
use serde::{Deserialize, Serialize};

// ============================================================================
// Response types
// ============================================================================

/// A GitLab project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub path_with_namespace: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub visibility: Option<String>,
}

/// A user or group namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Namespace {
    pub id: u64,
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub full_path: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
}

/// A project-level CI/CD variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub protected: bool,
    #[serde(default)]
    pub masked: bool,
}

/// A repository branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    #[serde(default)]
    pub protected: bool,
    #[serde(default)]
    pub default: bool,
}

/// Status shared by pipelines, jobs and commit statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    Created,
    WaitingForResource,
    Preparing,
    Pending,
    Running,
    Success,
    Failed,
    Canceled,
    Skipped,
    Manual,
    Scheduled,
    #[serde(other)]
    Unknown,
}

impl BuildStatus {
    /// Whether the build reached a final state.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(
            self,
            Self::Success | Self::Failed | Self::Canceled | Self::Skipped
        )
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::WaitingForResource => "waiting_for_resource",
            Self::Preparing => "preparing",
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::Skipped => "skipped",
            Self::Manual => "manual",
            Self::Scheduled => "scheduled",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// A CI pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: u64,
    pub status: BuildStatus,
    #[serde(rename = "ref", default)]
    pub git_ref: Option<String>,
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// A CI job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: u64,
    pub name: String,
    pub status: BuildStatus,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(rename = "ref", default)]
    pub git_ref: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub finished_at: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
}

/// A status reported on a commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitStatus {
    pub id: u64,
    pub sha: String,
    pub name: String,
    pub status: BuildStatus,
    #[serde(rename = "ref", default)]
    pub git_ref: Option<String>,
    #[serde(default)]
    pub target_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Result of creating or updating a repository file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileCommit {
    pub file_path: String,
    pub branch: String,
}

// ============================================================================
// Request types
// ============================================================================

/// Visibility and features for projects the client creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectTemplate {
    pub visibility: Visibility,
    pub features: FeatureFlags,
}

impl Default for ProjectTemplate {
    /// CI on, every other feature off, publicly visible.
    fn default() -> Self {
        Self {
            visibility: Visibility::Public,
            features: FeatureFlags::default(),
        }
    }
}

impl From<&ProjectDefaults> for ProjectTemplate {
    fn from(defaults: &ProjectDefaults) -> Self {
        Self {
            visibility: defaults.visibility,
            features: defaults.enabled,
        }
    }
}

#[derive(Debug, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub(crate) struct CreateProjectRequest<'a> {
    pub name: &'a str,
    pub namespace_id: u64,
    pub issues_enabled: bool,
    pub merge_requests_enabled: bool,
    pub jobs_enabled: bool,
    pub wiki_enabled: bool,
    pub snippets_enabled: bool,
    pub container_registry_enabled: bool,
    pub shared_runners_enabled: bool,
    pub public: bool,
    pub visibility: &'static str,
    pub visibility_level: u8,
    pub public_jobs: bool,
}

impl<'a> CreateProjectRequest<'a> {
    pub(crate) fn new(name: &'a str, namespace_id: u64, template: &ProjectTemplate) -> Self {
        let features = &template.features;
        Self {
            name,
            namespace_id,
            issues_enabled: features.issues,
            merge_requests_enabled: features.merge_requests,
            jobs_enabled: features.jobs,
            wiki_enabled: features.wiki,
            snippets_enabled: features.snippets,
            container_registry_enabled: features.container_registry,
            shared_runners_enabled: features.shared_runners,
            public: template.visibility == Visibility::Public,
            visibility: template.visibility.as_str(),
            visibility_level: template.visibility.level(),
            public_jobs: true,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct VariableRequest<'a> {
    pub key: &'a str,
    pub value: &'a str,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub(crate) struct FileRequest<'a> {
    pub file_path: &'a str,
    pub branch: &'a str,
    pub encoding: &'static str,
    pub content: String,
    pub commit_message: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct TriggerRequest<'a> {
    pub token: &'a str,
    #[serde(rename = "ref")]
    pub git_ref: &'a str,
    pub variables: &'a BTreeMap<String, String>,
}
