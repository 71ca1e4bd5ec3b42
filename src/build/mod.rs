//! Image builds from a recipe and a checkout.

pub mod docker;
pub mod engine;
pub mod executor;

pub use docker::DockerEngine;
pub use engine::{ContainerEngine, EngineOutput, UnavailableEngine};
pub use executor::{BuildExecutor, BuildResult};
