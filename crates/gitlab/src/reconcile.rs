//! Read-compare-act decisions.
//!
//! Reconciliation here is best effort: remote state can change between the
//! read and the write, and nothing guards that window. Re-running is safe.

use reqwest::StatusCode;

/// What to do after comparing remote state with the desired state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    /// Remote already matches.
    Skip,
    /// Remote exists with a different value.
    Update,
    /// Remote does not exist.
    Create,
}

/// Decide the write needed to move `current` to `desired`.
pub fn plan_write<T>(current: Option<&T>, desired: &T) -> WriteAction
where
    T: PartialEq + ?Sized,
{
    match current {
        Some(value) if value == desired => WriteAction::Skip,
        Some(_) => WriteAction::Update,
        None => WriteAction::Create,
    }
}

/// Statuses GitLab answers with when a create hits an existing resource.
#[must_use]
pub fn is_conflict(status: StatusCode) -> bool {
    status == StatusCode::BAD_REQUEST || status == StatusCode::CONFLICT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_write() {
        assert_eq!(plan_write(Some("a"), "a"), WriteAction::Skip);
        assert_eq!(plan_write(Some("a"), "b"), WriteAction::Update);
        assert_eq!(plan_write(None, "b"), WriteAction::Create);
    }

    #[test]
    fn test_plan_write_empty_values_compare_exactly() {
        assert_eq!(plan_write(Some(""), ""), WriteAction::Skip);
        assert_eq!(plan_write(Some(""), " "), WriteAction::Update);
    }

    #[test]
    fn test_is_conflict() {
        assert!(is_conflict(StatusCode::BAD_REQUEST));
        assert!(is_conflict(StatusCode::CONFLICT));
        assert!(!is_conflict(StatusCode::NOT_FOUND));
        assert!(!is_conflict(StatusCode::UNPROCESSABLE_ENTITY));
    }
}
