//! Error taxonomy for the three core operations.
//!
//! Each stage has its own error enum. [`PipelineError`] tags the first
//! failing stage so callers can report where an operation stopped.

use std::fmt;
use std::io;
use thiserror::Error;

/// Failures while obtaining a local checkout.
#[derive(Debug, Error)]
pub enum CloneError {
    #[error("Invalid repository URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Unsupported URL scheme '{scheme}' (allowed: {allowed})")]
    UnsupportedScheme { scheme: String, allowed: String },

    #[error("Authentication failed for {url}")]
    AuthenticationFailed { url: String },

    #[error("Repository unreachable: {url}: {message}")]
    Unreachable { url: String, message: String },

    #[error("Failed to prepare workspace: {0}")]
    Io(#[from] io::Error),

    #[error("Git error: {0}")]
    Git(String),

    #[error("Clone task failed: {0}")]
    Join(String),
}

/// Failures while building an image from a recipe.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Recipe is not valid: {0}")]
    InvalidRecipe(String),

    #[error("Container engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Image build failed: {message}")]
    Failed { message: String, log: String },

    #[error("Failed to write recipe: {0}")]
    Io(#[from] io::Error),

    #[error("Build task failed: {0}")]
    Join(String),
}

impl BuildError {
    /// Engine output captured before the failure, when there is any.
    pub fn log(&self) -> Option<&str> {
        match self {
            BuildError::Failed { log, .. } if !log.is_empty() => Some(log),
            _ => None,
        }
    }
}

/// Failures while committing and pushing a recipe branch.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Remote rejected branch '{branch}': {reason}")]
    Rejected { branch: String, reason: String },

    #[error("Credential lacks push rights for {url}")]
    PermissionDenied { url: String },

    #[error("Branch '{0}' already exists on the remote")]
    BranchExists(String),

    #[error("Network failure during push to {url}: {message}")]
    Network { url: String, message: String },

    #[error("Git error: {0}")]
    Git(String),

    #[error("Failed to write recipe: {0}")]
    Io(#[from] io::Error),

    #[error("Publish task failed: {0}")]
    Join(String),
}

/// Missing or empty input at the HTTP and CLI boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Field must not be empty: {0}")]
    Empty(&'static str),
}

impl ValidationError {
    /// Fails with `MissingField` for `None` and `Empty` for blank text.
    pub fn require<'a>(field: &'static str, value: Option<&'a str>) -> Result<&'a str, Self> {
        match value {
            None => Err(ValidationError::MissingField(field)),
            Some(v) if v.trim().is_empty() => Err(ValidationError::Empty(field)),
            Some(v) => Ok(v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Clone,
    Detect,
    Generate,
    Build,
    Publish,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Clone => "clone",
            Stage::Detect => "detect",
            Stage::Generate => "generate",
            Stage::Build => "build",
            Stage::Publish => "publish",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum PipelineErrorKind {
    #[error(transparent)]
    Clone(#[from] CloneError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    /// A stage that cannot fail on its own inputs failed to run at all
    /// (a panicked blocking task, for instance).
    #[error("{0}")]
    Internal(String),
}

/// The first failing stage of an operation and its error.
#[derive(Debug, Error)]
#[error("{stage} failed: {kind}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub kind: PipelineErrorKind,
}

impl PipelineError {
    pub fn new(stage: Stage, kind: impl Into<PipelineErrorKind>) -> Self {
        Self {
            stage,
            kind: kind.into(),
        }
    }

    pub fn internal(stage: Stage, message: impl Into<String>) -> Self {
        Self::new(stage, PipelineErrorKind::Internal(message.into()))
    }

    /// Captured build output when the build stage failed.
    pub fn build_log(&self) -> Option<&str> {
        match &self.kind {
            PipelineErrorKind::Build(e) => e.log(),
            _ => None,
        }
    }

    /// Returns a user-friendly error message with troubleshooting hints
    pub fn help_message(&self) -> String {
        match &self.kind {
            PipelineErrorKind::Clone(CloneError::AuthenticationFailed { url }) => format!(
                "Error: Authentication failed\nRepository: {}\n\n\
                Help: The access token was rejected. Please check:\n\
                - Is the token still valid?\n\
                - Does it grant read access to this repository?",
                url
            ),
            PipelineErrorKind::Clone(CloneError::UnsupportedScheme { scheme, allowed }) => format!(
                "Error: Unsupported repository URL scheme '{}'\n\n\
                Help: Only these schemes are accepted: {}\n\
                Configure the list with STACKCRAFT_ALLOWED_SCHEMES.",
                scheme, allowed
            ),
            PipelineErrorKind::Clone(CloneError::Unreachable { url, message }) => format!(
                "Error: Repository unreachable\nRepository: {}\n\n\
                Help: Check that the URL is correct and the host is reachable.\n\n\
                Details: {}",
                url, message
            ),
            PipelineErrorKind::Build(BuildError::EngineUnavailable(msg)) => format!(
                "Error: Container engine unavailable\n\n\
                Help: Cannot connect to Docker. Try:\n\
                1. Start the Docker daemon\n\
                2. Check DOCKER_HOST points at a running engine\n\
                3. Run: docker info\n\n\
                Details: {}",
                msg
            ),
            PipelineErrorKind::Build(BuildError::InvalidRecipe(msg)) => format!(
                "Error: Recipe is not a valid Dockerfile\n\n\
                Help: Fix the reported line and submit the recipe again.\n\n\
                Details: {}",
                msg
            ),
            PipelineErrorKind::Build(BuildError::Failed { message, .. }) => format!(
                "Error: Image build failed\n\n\
                Help: Review the build log, edit the recipe, and retry the build.\n\n\
                Details: {}",
                message
            ),
            PipelineErrorKind::Publish(PublishError::PermissionDenied { url }) => format!(
                "Error: Push permission denied\nRepository: {}\n\n\
                Help: The token needs write access (the 'repo' or 'contents:write' scope).",
                url
            ),
            PipelineErrorKind::Publish(PublishError::BranchExists(branch)) => format!(
                "Error: Branch '{}' already exists on the remote\n\n\
                Help: Retry the push; a fresh branch name is generated each time.",
                branch
            ),
            _ => format!("Error: {} stage failed\n\nDetails: {}", self.stage, self.kind),
        }
    }
}

impl From<CloneError> for PipelineError {
    fn from(err: CloneError) -> Self {
        Self::new(Stage::Clone, err)
    }
}

impl From<BuildError> for PipelineError {
    fn from(err: BuildError) -> Self {
        Self::new(Stage::Build, err)
    }
}

impl From<PublishError> for PipelineError {
    fn from(err: PublishError) -> Self {
        Self::new(Stage::Publish, err)
    }
}
