//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started {
                operation,
                repository,
            } => {
                info!(operation = %operation, repo = %repository, "Starting operation");
            }
            ProgressEvent::WorkspaceAcquired { path, clone_time } => {
                info!(
                    workspace = %path.display(),
                    clone_time_ms = clone_time.as_millis(),
                    "Repository cloned"
                );
            }
            ProgressEvent::StackDetected { primary, tags } => {
                let tags: Vec<&str> = tags.iter().map(|t| t.as_str()).collect();
                info!(primary = %primary, tags = ?tags, "Stack detected");
            }
            ProgressEvent::RecipeGenerated { template } => {
                debug!(template, "Recipe generated");
            }
            ProgressEvent::RecipeWritten { path } => {
                debug!(path = %path.display(), "Recipe written");
            }
            ProgressEvent::BuildFinished {
                success,
                build_time,
            } => {
                if *success {
                    info!(build_time_ms = build_time.as_millis(), "Image build succeeded");
                } else {
                    warn!(build_time_ms = build_time.as_millis(), "Image build failed");
                }
            }
            ProgressEvent::BranchPushed { branch } => {
                info!(branch = %branch, "Branch pushed");
            }
            ProgressEvent::WorkspaceReleased { path, removed } => {
                if *removed {
                    debug!(workspace = %path.display(), "Workspace removed");
                } else {
                    warn!(workspace = %path.display(), "Workspace could not be removed");
                }
            }
            ProgressEvent::Completed {
                operation,
                total_time,
            } => {
                info!(
                    operation = %operation,
                    total_time_ms = total_time.as_millis(),
                    "Operation complete"
                );
            }
            ProgressEvent::Failed {
                operation,
                stage,
                error,
            } => {
                warn!(operation = %operation, stage = %stage, error = %error, "Operation failed");
            }
        }
    }
}
