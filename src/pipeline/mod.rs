//! Operation orchestration over the workspace, detection, recipe, build, and
//! publish stages.

pub mod service;
pub mod state;

pub use service::{Generation, StackcraftService};
pub use state::{Operation, OperationState};
