//! Runtime configuration for hub2lab, acquired from environment variables.
//!
//! Settings are resolved once at startup into an immutable [`Settings`]
//! value that callers pass to whatever needs it. Absent variables fall back
//! to static defaults; nothing in this crate fails.
//!
//! # Usage
//!
//! ```no_run
//! use hub2lab_config::Settings;
//!
//! let settings = Settings::from_env();
//! println!("GitLab at {}", settings.gitlab.api);
//! ```
//!
//! # Environment
//!
//! - `GITLAB_API`, `GITLAB_TOKEN`, `GITLAB_TIMEOUT`: connection
//! - `GITLAB_REPO`, `GITLAB_BRANCH`, `GITLAB_TRIGGER`, `GITLAB_USER`: defaults
//!   for project-scoped calls
//! - `GITLAB_SHARED_RUNNERS`, `GITLAB_CONTAINER_REGISTRY`, `GITLAB_WIKI`,
//!   `GITLAB_SNIPPETS`, `GITLAB_MERGE_REQUESTS`, `GITLAB_ISSUES`: feature
//!   flags for created projects (`1`/`true` enable)
//! - `GITLAB_REPO_PRIVACY`: `private`, `internal` or `public`
//! - `FAILFASTCI_NAMESPACE`, `FAILFAST_CI_API`, `BUILD_PULL_REQUEST`,
//!   `BUILD_PUSH`: build policy
//! - `GITHUB_CONTEXT`, `GITHUB_INTEGRATION_ID`, `GITHUB_INSTALLATION_ID`,
//!   `GITHUB_SECRET_TOKEN`: GitHub App identity

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod env;
pub mod policy;
pub mod settings;

pub use env::{env_bool, resolve, resolve_with};
pub use policy::{BuildEvent, BuildPolicy};
pub use settings::{
    FailFastSettings, FeatureFlags, GitHubSettings, GitLabSettings, ProjectDefaults, Settings,
    Visibility,
};
