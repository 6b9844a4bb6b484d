//! Typed lookups of environment variables.
//!
//! Every lookup has a fallback: an absent variable yields the default as-is,
//! a present one is passed through a conversion function. Nothing here fails.

use tracing::trace;

/// Resolve `name` from the process environment.
///
/// Returns `default` unconverted when the variable is absent (or not valid
/// unicode), otherwise `convert(raw)`.
pub fn resolve<T>(name: &str, default: T, convert: impl FnOnce(&str) -> T) -> T {
    resolve_with(|key| std::env::var(key).ok(), name, default, convert)
}

/// Same contract as [`resolve`], against an arbitrary lookup function.
pub fn resolve_with<T, L>(lookup: L, name: &str, default: T, convert: impl FnOnce(&str) -> T) -> T
where
    L: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => convert(&raw),
        None => {
            trace!(variable = name, "environment variable unset, using default");
            default
        }
    }
}

/// Lenient boolean coercion: `"1"` and `"true"` in any case are true.
#[must_use]
pub fn env_bool(raw: &str) -> bool {
    raw == "1" || raw.eq_ignore_ascii_case("true")
}

/// Treat an empty string as unset.
pub(crate) fn non_empty(raw: &str) -> Option<String> {
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}
