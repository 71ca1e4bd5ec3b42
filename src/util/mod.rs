//! Shared helpers: logging setup, repository URL handling, and checks on
//! values lifted from repository files.

pub mod logging;
pub mod url;

pub use logging::{init_default, init_from_env, init_logging, LoggingConfig};
pub use url::{repository_slug, sanitize_url};

/// True for a non-empty value made only of ASCII letters, digits, `_`, `.`,
/// `-` and `/`. Values read from a repository are rendered into recipe lines
/// only when they pass.
pub fn is_plain_token(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '/'))
}
