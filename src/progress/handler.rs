//! Progress handler trait and events

use crate::error::Stage;
use crate::pipeline::Operation;
use crate::stack::StackTag;
use std::path::PathBuf;
use std::time::Duration;

/// Events emitted as an operation moves through its states
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Operation accepted; `repository` is already sanitized
    Started {
        operation: Operation,
        repository: String,
    },

    /// Checkout finished
    WorkspaceAcquired {
        path: PathBuf,
        clone_time: Duration,
    },

    StackDetected {
        primary: StackTag,
        tags: Vec<StackTag>,
    },

    RecipeGenerated { template: &'static str },

    /// Recipe file written into the checkout
    RecipeWritten { path: PathBuf },

    BuildFinished {
        success: bool,
        build_time: Duration,
    },

    BranchPushed { branch: String },

    /// Checkout removed; `removed` is false when deletion failed
    WorkspaceReleased { path: PathBuf, removed: bool },

    Completed {
        operation: Operation,
        total_time: Duration,
    },

    Failed {
        operation: Operation,
        stage: Stage,
        error: String,
    },
}

/// Trait for handling progress events during an operation
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
