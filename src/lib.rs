//! stackcraft - Dockerfile synthesis for git repositories
//!
//! Given a repository URL, stackcraft clones it into an isolated workspace,
//! classifies its technology stack with an ordered rule table, and renders a
//! Dockerfile from a per-stack template. A recipe can then be built with the
//! local container engine or committed to a fresh branch and pushed back.
//!
//! # Core Concepts
//!
//! - **Workspace**: an exclusive temporary checkout, removed when the
//!   operation that acquired it ends, whatever the outcome
//! - **Stack profile**: the primary technology plus secondary tags and the
//!   evidence (manifest, entry point, runtime version) detection found
//! - **Recipe**: the generated Dockerfile text and the template behind it
//! - **Credential**: an access token handed by value to clone and push only
//!
//! # Example Usage
//!
//! ```no_run
//! use stackcraft::build::UnavailableEngine;
//! use stackcraft::record::NullRecordStore;
//! use stackcraft::{StackcraftConfig, StackcraftService};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), stackcraft::PipelineError> {
//! let service = StackcraftService::new(
//!     StackcraftConfig::default(),
//!     Arc::new(UnavailableEngine::new("generate only")),
//!     Arc::new(NullRecordStore),
//! );
//! let generation = service.generate("https://github.com/acme/api", None).await?;
//! println!("{}", generation.recipe);
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`workspace`]: cloning and scoped cleanup
//! - [`stack`]: stack detection
//! - [`recipe`]: templates, generation, and Dockerfile syntax checks
//! - [`build`]: container engine abstraction and the build executor
//! - [`publish`]: branch, commit, and push
//! - [`record`]: best-effort generation records
//! - [`pipeline`]: the three operations tying the stages together
//! - [`server`]: the HTTP API

pub mod build;
pub mod cli;
pub mod config;
pub mod error;
pub mod fs;
pub mod pipeline;
pub mod progress;
pub mod publish;
pub mod recipe;
pub mod record;
pub mod server;
pub mod stack;
pub mod util;
pub mod workspace;

pub use config::{ConfigError, StackcraftConfig};
pub use error::{BuildError, CloneError, PipelineError, PublishError, Stage, ValidationError};
pub use pipeline::{Generation, StackcraftService};
pub use recipe::Recipe;
pub use stack::{StackProfile, StackTag};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};
pub use workspace::{Credential, RepositoryReference};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name_is_stackcraft() {
        assert_eq!(NAME, "stackcraft");
    }
}
