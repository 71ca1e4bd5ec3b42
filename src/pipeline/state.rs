//! Per-operation state tracking.

use crate::error::PipelineError;
use crate::progress::{ProgressEvent, ProgressHandler};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Generate,
    Build,
    Publish,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Generate => "generate",
            Operation::Build => "build",
            Operation::Publish => "publish",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ```text
/// Idle -> WorkspaceAcquired -> Detected ------> Terminal   (generate)
///                           -> RecipeWritten -> Terminal   (build, publish)
/// any state -> Terminal on failure
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    Idle,
    WorkspaceAcquired,
    Detected,
    RecipeWritten,
    Terminal,
}

impl OperationState {
    pub fn can_transition_to(self, next: OperationState) -> bool {
        use OperationState::*;
        matches!(
            (self, next),
            (Idle, WorkspaceAcquired)
                | (WorkspaceAcquired, Detected)
                | (WorkspaceAcquired, RecipeWritten)
                | (Idle | WorkspaceAcquired | Detected | RecipeWritten, Terminal)
        )
    }
}

/// Tracks one operation's state and forwards events to the progress handler.
pub(crate) struct OperationRun {
    operation: Operation,
    state: OperationState,
    started: Instant,
    progress: Arc<dyn ProgressHandler>,
}

impl OperationRun {
    pub(crate) fn start(
        operation: Operation,
        repository: String,
        progress: Arc<dyn ProgressHandler>,
    ) -> Self {
        progress.on_progress(&ProgressEvent::Started {
            operation,
            repository,
        });
        Self {
            operation,
            state: OperationState::Idle,
            started: Instant::now(),
            progress,
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> OperationState {
        self.state
    }

    pub(crate) fn advance(&mut self, next: OperationState, event: Option<ProgressEvent>) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!(operation = %self.operation, from = ?self.state, to = ?next, "State transition");
        self.state = next;
        if let Some(event) = event {
            self.progress.on_progress(&event);
        }
    }

    pub(crate) fn emit(&self, event: ProgressEvent) {
        self.progress.on_progress(&event);
    }

    pub(crate) fn complete(mut self) {
        self.advance(OperationState::Terminal, None);
        self.progress.on_progress(&ProgressEvent::Completed {
            operation: self.operation,
            total_time: self.started.elapsed(),
        });
    }

    pub(crate) fn fail(mut self, error: PipelineError) -> PipelineError {
        self.advance(OperationState::Terminal, None);
        self.progress.on_progress(&ProgressEvent::Failed {
            operation: self.operation,
            stage: error.stage,
            error: error.to_string(),
        });
        error
    }
}
