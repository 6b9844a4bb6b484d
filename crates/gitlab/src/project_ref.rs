//! Ways of naming a project.

use std::fmt;
use std::str::FromStr;

use crate::error::GitLabError;

/// A project, either by numeric ID or by `namespace/name` path.
///
/// Paths are resolved to an ID on every call that needs one; nothing is
/// cached between calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProjectRef {
    Id(u64),
    Path { namespace: String, name: String },
}

impl ProjectRef {
    /// Build a path reference. `namespace` may itself contain subgroups.
    pub fn path(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Path {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// URL path segment: the ID, or the percent-encoded `namespace/name`.
    #[must_use]
    pub fn encoded(&self) -> String {
        match self {
            Self::Id(id) => id.to_string(),
            Self::Path { namespace, name } => {
                urlencoding::encode(&format!("{namespace}/{name}")).into_owned()
            }
        }
    }
}

impl From<u64> for ProjectRef {
    fn from(id: u64) -> Self {
        Self::Id(id)
    }
}

impl FromStr for ProjectRef {
    type Err = GitLabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(id) = s.parse::<u64>() {
            return Ok(Self::Id(id));
        }
        match s.rsplit_once('/') {
            Some((namespace, name))
                if !namespace.is_empty()
                    && !name.is_empty()
                    && namespace.split('/').all(|part| !part.is_empty()) =>
            {
                Ok(Self::path(namespace, name))
            }
            _ => Err(GitLabError::InvalidProjectRef(s.to_string())),
        }
    }
}

impl fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Path { namespace, name } => write!(f, "{namespace}/{name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numeric_id() {
        assert_eq!("42".parse::<ProjectRef>().unwrap(), ProjectRef::Id(42));
    }

    #[test]
    fn test_parse_path() {
        assert_eq!(
            "failfast-ci/app".parse::<ProjectRef>().unwrap(),
            ProjectRef::path("failfast-ci", "app")
        );
        assert_eq!(
            "group/sub/app".parse::<ProjectRef>().unwrap(),
            ProjectRef::path("group/sub", "app")
        );
    }

    #[test]
    fn test_parse_invalid() {
        for raw in ["", "app", "/app", "group/", "group//app"] {
            assert!(
                matches!(
                    raw.parse::<ProjectRef>(),
                    Err(GitLabError::InvalidProjectRef(_))
                ),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_encoded() {
        assert_eq!(ProjectRef::Id(7).encoded(), "7");
        assert_eq!(
            ProjectRef::path("failfast-ci", "my app").encoded(),
            "failfast-ci%2Fmy%20app"
        );
    }

    #[test]
    fn test_display_round_trips_path() {
        let project = ProjectRef::path("group", "app");
        assert_eq!(project.to_string(), "group/app");
    }
}
