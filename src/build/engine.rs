use crate::error::BuildError;
use async_trait::async_trait;
use std::path::Path;

/// What the engine reported for one build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOutput {
    pub success: bool,
    /// Combined build output, in order.
    pub log: String,
    pub image_id: Option<String>,
}

/// A container engine able to build an image from a directory.
///
/// The engine is shared across operations; the context directory passed in
/// belongs to the calling operation alone.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Fails with [`BuildError::EngineUnavailable`] when the engine cannot be reached.
    async fn ping(&self) -> Result<(), BuildError>;

    async fn build(
        &self,
        context_dir: &Path,
        recipe_file: &str,
        tag: &str,
    ) -> Result<EngineOutput, BuildError>;
}

/// Stands in when no engine could be configured, so generate and publish
/// still work. Every build fails with the connection error.
#[derive(Debug, Clone)]
pub struct UnavailableEngine {
    reason: String,
}

impl UnavailableEngine {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ContainerEngine for UnavailableEngine {
    async fn ping(&self) -> Result<(), BuildError> {
        Err(BuildError::EngineUnavailable(self.reason.clone()))
    }

    async fn build(&self, _: &Path, _: &str, _: &str) -> Result<EngineOutput, BuildError> {
        Err(BuildError::EngineUnavailable(self.reason.clone()))
    }
}
