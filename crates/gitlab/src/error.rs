//! Error types for GitLab API calls.

use thiserror::Error;

use crate::projects::InitStep;

/// Errors that can occur when talking to GitLab.
#[derive(Debug, Error)]
pub enum GitLabError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not match the expected shape.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A required setting is missing or unusable.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A project reference is neither a numeric ID nor `namespace/name`.
    #[error("Invalid project reference: {0:?}")]
    InvalidProjectRef(String),

    /// The remote resource does not exist (404).
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The remote rejected a write because the resource already exists.
    #[error("Conflict: {status} - {message}")]
    Conflict { status: u16, message: String },

    /// Any other non-success response.
    #[error("API error: {status} - {body}")]
    Remote { status: u16, body: String },

    /// A step of project initialization failed; earlier steps are not undone.
    #[error("Project initialization failed at step '{step}': {source}")]
    Initialization {
        step: InitStep,
        #[source]
        source: Box<GitLabError>,
    },
}

impl GitLabError {
    /// HTTP status carried by the error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound(_) => Some(404),
            Self::Conflict { status, .. } | Self::Remote { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Initialization { source, .. } => source.status(),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub(crate) fn at_step(step: InitStep) -> impl FnOnce(Self) -> Self {
        move |source| Self::Initialization {
            step,
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_extraction() {
        assert_eq!(GitLabError::NotFound("gone".into()).status(), Some(404));
        assert_eq!(
            GitLabError::Remote {
                status: 500,
                body: String::new()
            }
            .status(),
            Some(500)
        );
        assert_eq!(GitLabError::Config("missing".into()).status(), None);
    }

    #[test]
    fn test_initialization_error_names_step() {
        let err = GitLabError::at_step(InitStep::UnprotectBranch)(GitLabError::Remote {
            status: 403,
            body: "forbidden".into(),
        });

        assert_eq!(err.status(), Some(403));
        let message = err.to_string();
        assert!(message.contains("unprotect-branch"), "{message}");
        assert!(message.contains("403"), "{message}");
    }
}
