pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{CliArgs, Commands, ConfigArgs, GenerateArgs, RecipeArgs, RepositoryArgs, ServeArgs};
pub use output::{OutputFormat, OutputFormatter};
