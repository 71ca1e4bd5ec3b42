use super::engine::ContainerEngine;
use crate::error::BuildError;
use crate::recipe::Validator;
use crate::util::repository_slug;
use crate::workspace::{RepositoryReference, Workspace};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of a successful image build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildResult {
    pub image_tag: String,
    pub image_id: Option<String>,
    pub log: String,
}

/// Writes a recipe into a workspace and builds it with a [`ContainerEngine`].
///
/// Nothing is retried: a failed build surfaces as [`BuildError::Failed`]
/// carrying the engine's log.
pub struct BuildExecutor {
    engine: Arc<dyn ContainerEngine>,
    validator: Validator,
    recipe_file: String,
    image_prefix: String,
}

impl BuildExecutor {
    pub fn new(engine: Arc<dyn ContainerEngine>) -> Self {
        Self {
            engine,
            validator: Validator::new(),
            recipe_file: "Dockerfile".to_string(),
            image_prefix: "stackcraft".to_string(),
        }
    }

    pub fn with_recipe_file(mut self, recipe_file: impl Into<String>) -> Self {
        self.recipe_file = recipe_file.into();
        self
    }

    pub fn with_image_prefix(mut self, image_prefix: impl Into<String>) -> Self {
        self.image_prefix = image_prefix.into();
        self
    }

    pub fn recipe_file(&self) -> &str {
        &self.recipe_file
    }

    /// `<prefix>/<owner-repo>:<first 8 hex of the workspace id>`
    pub fn image_tag(&self, repo: &RepositoryReference, workspace: &Workspace) -> String {
        let id = workspace.id().simple().to_string();
        format!(
            "{}/{}:{}",
            self.image_prefix,
            repository_slug(repo.as_str()),
            &id[..8]
        )
    }

    /// Validates the recipe and writes it into the workspace.
    pub async fn prepare(&self, recipe: &str, workspace: &Workspace) -> Result<PathBuf, BuildError> {
        self.validator
            .validate(recipe)
            .map_err(|e| BuildError::InvalidRecipe(e.to_string()))?;

        let path = workspace.write_file(&self.recipe_file, recipe).await?;
        debug!(path = %path.display(), "Recipe written");
        Ok(path)
    }

    /// Builds the recipe already written by [`BuildExecutor::prepare`].
    pub async fn run(
        &self,
        workspace: &Workspace,
        repo: &RepositoryReference,
    ) -> Result<BuildResult, BuildError> {
        self.engine.ping().await?;

        let tag = self.image_tag(repo, workspace);
        info!(tag = %tag, "Building image");
        let output = self
            .engine
            .build(workspace.path(), &self.recipe_file, &tag)
            .await?;

        if !output.success {
            let message = output
                .log
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("engine reported failure")
                .trim()
                .to_string();
            warn!(tag = %tag, error = %message, "Image build failed");
            return Err(BuildError::Failed {
                message,
                log: output.log,
            });
        }

        Ok(BuildResult {
            image_tag: tag,
            image_id: output.image_id,
            log: output.log,
        })
    }

    pub async fn build(
        &self,
        recipe: &str,
        workspace: &Workspace,
        repo: &RepositoryReference,
    ) -> Result<BuildResult, BuildError> {
        self.prepare(recipe, workspace).await?;
        self.run(workspace, repo).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::engine::{EngineOutput, MockContainerEngine};
    use crate::workspace::manager::scratch_workspace;

    const RECIPE: &str = "FROM alpine:3.20\nWORKDIR /app\nCOPY . .\nCMD [\"sh\"]\n";

    fn repo() -> RepositoryReference {
        RepositoryReference::parse("https://github.com/acme/api.git", &["https".to_string()]).unwrap()
    }

    #[tokio::test]
    async fn test_invalid_recipe_never_reaches_engine() {
        let mut engine = MockContainerEngine::new();
        engine.expect_ping().never();
        engine.expect_build().never();
        let executor = BuildExecutor::new(Arc::new(engine));
        let root = tempfile::tempdir().unwrap();
        let workspace = scratch_workspace(root.path());

        let err = executor
            .build("RUN echo before base\n", &workspace, &repo())
            .await
            .unwrap_err();

        assert!(matches!(err, BuildError::InvalidRecipe(_)));
        assert!(!workspace.path().join("Dockerfile").exists());
    }

    #[tokio::test]
    async fn test_successful_build_returns_tag_and_log() {
        let mut engine = MockContainerEngine::new();
        engine.expect_ping().returning(|| Ok(()));
        engine
            .expect_build()
            .withf(|_, file, tag| file.to_string() == "Dockerfile" && tag.starts_with("stackcraft/acme-api:"))
            .returning(|_, _, _| {
                Ok(EngineOutput {
                    success: true,
                    log: "Step 1/4 : FROM alpine:3.20\nSuccessfully built abc\n".to_string(),
                    image_id: Some("sha256:abc".to_string()),
                })
            });
        let executor = BuildExecutor::new(Arc::new(engine));
        let root = tempfile::tempdir().unwrap();
        let workspace = scratch_workspace(root.path());

        let result = executor.build(RECIPE, &workspace, &repo()).await.unwrap();

        assert_eq!(result.image_id.as_deref(), Some("sha256:abc"));
        assert!(result.log.contains("Successfully built"));
        assert_eq!(
            std::fs::read_to_string(workspace.path().join("Dockerfile")).unwrap(),
            RECIPE
        );
    }

    #[tokio::test]
    async fn test_failed_build_carries_log() {
        let mut engine = MockContainerEngine::new();
        engine.expect_ping().returning(|| Ok(()));
        engine.expect_build().returning(|_, _, _| {
            Ok(EngineOutput {
                success: false,
                log: "Step 2/4 : RUN make\nmake: *** No targets.  Stop.\n".to_string(),
                image_id: None,
            })
        });
        let executor = BuildExecutor::new(Arc::new(engine));
        let root = tempfile::tempdir().unwrap();
        let workspace = scratch_workspace(root.path());

        let err = executor.build(RECIPE, &workspace, &repo()).await.unwrap_err();

        assert_eq!(err.log().map(|l| l.contains("RUN make")), Some(true));
        assert!(err.to_string().contains("No targets"));
    }

    #[tokio::test]
    async fn test_unreachable_engine() {
        let mut engine = MockContainerEngine::new();
        engine
            .expect_ping()
            .returning(|| Err(BuildError::EngineUnavailable("connection refused".to_string())));
        engine.expect_build().never();
        let executor = BuildExecutor::new(Arc::new(engine));
        let root = tempfile::tempdir().unwrap();
        let workspace = scratch_workspace(root.path());

        let err = executor.build(RECIPE, &workspace, &repo()).await.unwrap_err();
        assert!(matches!(err, BuildError::EngineUnavailable(_)));
    }
}
