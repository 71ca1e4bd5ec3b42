//! Per-operation repository checkouts.
//!
//! A [`Workspace`] is an exclusive temporary directory holding one clone. It
//! is removed on every exit path of the operation that acquired it.

pub(crate) mod git;
pub mod manager;
pub mod repository;

pub use manager::{Workspace, WorkspaceManager};
pub use repository::{Credential, RepositoryReference};
