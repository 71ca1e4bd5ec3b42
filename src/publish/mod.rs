//! Publishing a recipe back to its repository on a new branch.

pub mod publisher;

pub use publisher::{branch_name, PublishResult, Publisher};
