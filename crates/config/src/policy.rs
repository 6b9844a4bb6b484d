//! Which branches trigger builds for each kind of event.

use regex::Regex;
use serde::Serialize;
use tracing::warn;

/// Kind of upstream event asking for a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildEvent {
    Push,
    PullRequest,
    Tag,
}

/// Branch patterns per event kind.
///
/// Patterns are regular expressions matched against the whole ref name.
/// The literal `*` matches everything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildPolicy {
    pub push: Vec<String>,
    pub pr: Vec<String>,
    pub tags: Vec<String>,
}

impl Default for BuildPolicy {
    fn default() -> Self {
        Self {
            push: vec!["master".to_string()],
            pr: vec!["*".to_string()],
            tags: vec!["*".to_string()],
        }
    }
}

impl BuildPolicy {
    /// Patterns configured for `event`.
    #[must_use]
    pub fn patterns(&self, event: BuildEvent) -> &[String] {
        match event {
            BuildEvent::Push => &self.push,
            BuildEvent::PullRequest => &self.pr,
            BuildEvent::Tag => &self.tags,
        }
    }

    /// Whether an event on `git_ref` should trigger a build.
    #[must_use]
    pub fn allows(&self, event: BuildEvent, git_ref: &str) -> bool {
        self.patterns(event)
            .iter()
            .any(|pattern| pattern_matches(pattern, git_ref))
    }
}

fn pattern_matches(pattern: &str, git_ref: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    match Regex::new(&format!("^(?:{pattern})$")) {
        Ok(re) => re.is_match(git_ref),
        Err(e) => {
            warn!(pattern, error = %e, "ignoring invalid branch pattern");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = BuildPolicy::default();

        assert!(policy.allows(BuildEvent::Push, "master"));
        assert!(!policy.allows(BuildEvent::Push, "feature/login"));
        assert!(!policy.allows(BuildEvent::Push, "master-old"));
        assert!(policy.allows(BuildEvent::PullRequest, "feature/login"));
        assert!(policy.allows(BuildEvent::Tag, "v1.2.0"));
    }

    #[test]
    fn test_regex_patterns() {
        let policy = BuildPolicy {
            push: vec!["master".to_string(), "release-.*".to_string()],
            pr: vec![],
            tags: vec![r"v\d+\.\d+\.\d+".to_string()],
        };

        assert!(policy.allows(BuildEvent::Push, "release-1.4"));
        assert!(!policy.allows(BuildEvent::Push, "hotfix"));
        assert!(!policy.allows(BuildEvent::PullRequest, "master"));
        assert!(policy.allows(BuildEvent::Tag, "v2.0.1"));
        assert!(!policy.allows(BuildEvent::Tag, "v2.0"));
    }

    #[test]
    fn test_invalid_pattern_never_matches() {
        let policy = BuildPolicy {
            push: vec!["(unclosed".to_string()],
            pr: vec![],
            tags: vec![],
        };
        assert!(!policy.allows(BuildEvent::Push, "(unclosed"));
    }
}
