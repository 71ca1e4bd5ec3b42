use clap::{Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Dockerfile synthesis for git repositories
#[derive(Parser, Debug)]
#[command(
    name = "stackcraft",
    about = "Detect a repository's stack and synthesize, build, and publish a Dockerfile",
    version,
    author,
    long_about = "stackcraft clones a git repository, classifies its technology stack with an \
                  ordered rule table, and renders a Dockerfile from a stack template. The recipe \
                  can then be built with the local container engine or pushed back to the \
                  repository on a new branch."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Generate a Dockerfile for a repository",
        long_about = "Clones the repository, detects its stack, and prints the synthesized \
                      Dockerfile.\n\n\
                      Examples:\n  \
                      stackcraft generate https://github.com/acme/api\n  \
                      stackcraft generate https://github.com/acme/api -f dockerfile > Dockerfile\n  \
                      stackcraft generate https://github.com/acme/api --format json"
    )]
    Generate(GenerateArgs),

    #[command(
        about = "Build an image from a Dockerfile against a repository",
        long_about = "Clones the repository, writes the given Dockerfile into it, and builds an \
                      image with the local container engine.\n\n\
                      Examples:\n  \
                      stackcraft build https://github.com/acme/api --recipe Dockerfile"
    )]
    Build(RecipeArgs),

    #[command(
        about = "Push a Dockerfile to a new branch of a repository",
        long_about = "Clones the repository, commits the given Dockerfile on a freshly named \
                      branch, and pushes that branch. Existing branches are never overwritten.\n\n\
                      Examples:\n  \
                      STACKCRAFT_GIT_TOKEN=ghp_... stackcraft push https://github.com/acme/api --recipe Dockerfile"
    )]
    Push(RecipeArgs),

    #[command(about = "Serve the HTTP API")]
    Serve(ServeArgs),

    #[command(about = "Show the effective configuration")]
    Config(ConfigArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct RepositoryArgs {
    #[arg(value_name = "URL", help = "Repository URL")]
    pub repository_url: String,

    #[arg(
        long,
        env = "STACKCRAFT_GIT_TOKEN",
        hide_env_values = true,
        value_name = "TOKEN",
        help = "Access token for private repositories and pushes"
    )]
    pub token: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub repository: RepositoryArgs,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write output to file instead of stdout"
    )]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct RecipeArgs {
    #[command(flatten)]
    pub repository: RepositoryArgs,

    #[arg(short = 'r', long, value_name = "FILE", help = "Dockerfile to use")]
    pub recipe: PathBuf,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, value_name = "ADDR", help = "Address to bind (overrides STACKCRAFT_BIND)")]
    pub bind: Option<SocketAddr>,
}

#[derive(Parser, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
    Dockerfile,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
            OutputFormatArg::Dockerfile => super::output::OutputFormat::Dockerfile,
        }
    }
}
