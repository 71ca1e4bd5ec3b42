//! The three core operations: generate, build, publish.
//!
//! Every operation owns one workspace for its whole duration and releases it
//! on every exit path. The first failing stage ends the operation; nothing is
//! retried and no stage falls back to an alternative.
//!
//! # Example
//!
//! ```no_run
//! use stackcraft::build::DockerEngine;
//! use stackcraft::pipeline::StackcraftService;
//! use stackcraft::record::NullRecordStore;
//! use stackcraft::StackcraftConfig;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = StackcraftService::new(
//!     StackcraftConfig::default(),
//!     Arc::new(DockerEngine::connect()?),
//!     Arc::new(NullRecordStore),
//! );
//! let generation = service.generate("https://github.com/acme/api", None).await?;
//! println!("{}", generation.recipe);
//! # Ok(())
//! # }
//! ```

use super::state::{Operation, OperationRun, OperationState};
use crate::build::{BuildExecutor, BuildResult, ContainerEngine};
use crate::config::StackcraftConfig;
use crate::error::{PipelineError, Stage};
use crate::fs::{FileSystem, RealFileSystem};
use crate::progress::{LoggingHandler, ProgressEvent, ProgressHandler};
use crate::publish::{PublishResult, Publisher};
use crate::recipe::{Recipe, RecipeGenerator};
use crate::record::{GenerationRecord, RecordStore};
use crate::stack::{StackDetector, StackProfile};
use crate::util::sanitize_url;
use crate::workspace::{Credential, RepositoryReference, Workspace, WorkspaceManager};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info_span, warn, Instrument};
use uuid::Uuid;

/// Result of [`StackcraftService::generate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub recipe: Recipe,
    pub profile: StackProfile,
}

pub struct StackcraftService {
    config: StackcraftConfig,
    workspaces: WorkspaceManager,
    fs: Arc<dyn FileSystem>,
    detector: StackDetector,
    generator: RecipeGenerator,
    executor: BuildExecutor,
    publisher: Publisher,
    records: Arc<dyn RecordStore>,
    progress: Arc<dyn ProgressHandler>,
}

impl StackcraftService {
    pub fn new(
        config: StackcraftConfig,
        engine: Arc<dyn ContainerEngine>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        let executor = BuildExecutor::new(engine)
            .with_recipe_file(config.recipe_file.clone())
            .with_image_prefix(config.image_prefix.clone());

        Self {
            workspaces: WorkspaceManager::from_config(&config),
            fs: Arc::new(RealFileSystem::new()),
            detector: StackDetector::new(),
            generator: RecipeGenerator::new(),
            executor,
            publisher: Publisher::from_config(&config),
            records,
            progress: Arc::new(LoggingHandler),
            config,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressHandler>) -> Self {
        self.progress = progress;
        self
    }

    /// Replaces the file system detection and generation read through.
    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn config(&self) -> &StackcraftConfig {
        &self.config
    }

    /// Clones the repository, classifies it, and synthesizes a recipe.
    ///
    /// The result is recorded best-effort; a failing record store is logged
    /// and does not fail the operation.
    pub async fn generate(
        &self,
        repository_url: &str,
        credential: Option<Credential>,
    ) -> Result<Generation, PipelineError> {
        let span = info_span!(
            "generate",
            operation_id = %Uuid::new_v4(),
            repo = %sanitize_url(repository_url)
        );
        async move {
            let mut run = self.start(Operation::Generate, repository_url);
            let (repo, workspace) = match self.checkout(&mut run, repository_url, credential).await {
                Ok(acquired) => acquired,
                Err(e) => return Err(run.fail(e)),
            };

            let outcome = self.classify(&workspace).await;
            if let Ok(generation) = &outcome {
                run.advance(
                    OperationState::Detected,
                    Some(ProgressEvent::StackDetected {
                        primary: generation.profile.primary,
                        tags: generation.profile.tags.clone(),
                    }),
                );
                run.emit(ProgressEvent::RecipeGenerated {
                    template: generation.recipe.template().name(),
                });
            }
            self.release(&run, workspace);

            let generation = match outcome {
                Ok(generation) => generation,
                Err(e) => return Err(run.fail(e)),
            };

            let record = GenerationRecord::new(
                repo.as_str(),
                generation.recipe.text(),
                generation.profile.clone(),
            );
            if let Err(e) = self.records.record(&record).await {
                warn!(error = %e, record_id = %record.id, "Failed to persist generation record");
            }

            run.complete();
            Ok(generation)
        }
        .instrument(span)
        .await
    }

    /// Clones the repository, writes `recipe` into it, and builds an image.
    pub async fn build(
        &self,
        repository_url: &str,
        credential: Option<Credential>,
        recipe: &str,
    ) -> Result<BuildResult, PipelineError> {
        let span = info_span!(
            "build",
            operation_id = %Uuid::new_v4(),
            repo = %sanitize_url(repository_url)
        );
        async move {
            let mut run = self.start(Operation::Build, repository_url);
            let (repo, workspace) = match self.checkout(&mut run, repository_url, credential).await {
                Ok(acquired) => acquired,
                Err(e) => return Err(run.fail(e)),
            };

            let outcome = async {
                let path = self.executor.prepare(recipe, &workspace).await?;
                run.advance(
                    OperationState::RecipeWritten,
                    Some(ProgressEvent::RecipeWritten { path }),
                );
                let started = Instant::now();
                let result = self.executor.run(&workspace, &repo).await;
                run.emit(ProgressEvent::BuildFinished {
                    success: result.is_ok(),
                    build_time: started.elapsed(),
                });
                result
            }
            .await;
            self.release(&run, workspace);

            match outcome {
                Ok(result) => {
                    run.complete();
                    Ok(result)
                }
                Err(e) => Err(run.fail(e.into())),
            }
        }
        .instrument(span)
        .await
    }

    /// Clones the repository, commits `recipe` to a new branch, and pushes it.
    pub async fn publish(
        &self,
        repository_url: &str,
        credential: Option<Credential>,
        recipe: &str,
    ) -> Result<PublishResult, PipelineError> {
        let span = info_span!(
            "publish",
            operation_id = %Uuid::new_v4(),
            repo = %sanitize_url(repository_url)
        );
        async move {
            let mut run = self.start(Operation::Publish, repository_url);
            let push_credential = credential.clone();
            let (repo, workspace) = match self.checkout(&mut run, repository_url, credential).await {
                Ok(acquired) => acquired,
                Err(e) => return Err(run.fail(e)),
            };

            let outcome = async {
                let path = self.publisher.stage(recipe, &workspace).await?;
                run.advance(
                    OperationState::RecipeWritten,
                    Some(ProgressEvent::RecipeWritten { path }),
                );
                self.publisher.push(&repo, &workspace, push_credential).await
            }
            .await;
            self.release(&run, workspace);

            match outcome {
                Ok(result) => {
                    run.emit(ProgressEvent::BranchPushed {
                        branch: result.branch.clone(),
                    });
                    run.complete();
                    Ok(result)
                }
                Err(e) => Err(run.fail(e.into())),
            }
        }
        .instrument(span)
        .await
    }

    fn start(&self, operation: Operation, repository_url: &str) -> OperationRun {
        OperationRun::start(
            operation,
            sanitize_url(repository_url),
            self.progress.clone(),
        )
    }

    async fn checkout(
        &self,
        run: &mut OperationRun,
        repository_url: &str,
        credential: Option<Credential>,
    ) -> Result<(RepositoryReference, Workspace), PipelineError> {
        let repo = RepositoryReference::parse(repository_url, &self.config.allowed_schemes)?;
        let started = Instant::now();
        let workspace = self.workspaces.acquire(&repo, credential).await?;
        run.advance(
            OperationState::WorkspaceAcquired,
            Some(ProgressEvent::WorkspaceAcquired {
                path: workspace.path().to_path_buf(),
                clone_time: started.elapsed(),
            }),
        );
        Ok((repo, workspace))
    }

    /// Detection and generation walk the tree, so they run off the async
    /// executor.
    async fn classify(&self, workspace: &Workspace) -> Result<Generation, PipelineError> {
        let fs = self.fs.clone();
        let root = workspace.path().to_path_buf();
        let detector = self.detector;
        let generator = self.generator;

        tokio::task::spawn_blocking(move || {
            let profile = detector.detect(fs.as_ref(), &root);
            let recipe = generator.generate(fs.as_ref(), &root, &profile);
            Generation { recipe, profile }
        })
        .await
        .map_err(|e| PipelineError::internal(Stage::Detect, e.to_string()))
    }

    fn release(&self, run: &OperationRun, workspace: Workspace) {
        let path = workspace.path().to_path_buf();
        let removed = workspace.release();
        run.emit(ProgressEvent::WorkspaceReleased { path, removed });
    }
}
