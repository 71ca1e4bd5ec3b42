use stackcraft::cli::commands::{CliArgs, Commands};
use stackcraft::cli::handlers::{
    handle_build, handle_config, handle_generate, handle_push, handle_serve,
};
use stackcraft::util::logging::{init_logging, parse_level, LoggingConfig};
use stackcraft::VERSION;

use clap::Parser;
use std::env;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("stackcraft v{} starting", VERSION);

    let exit_code = match &args.command {
        Commands::Generate(generate_args) => handle_generate(generate_args).await,
        Commands::Build(build_args) => handle_build(build_args).await,
        Commands::Push(push_args) => handle_push(push_args).await,
        Commands::Serve(serve_args) => handle_serve(serve_args).await,
        Commands::Config(config_args) => handle_config(config_args),
    };

    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    let level = if let Some(level_str) = &args.log_level {
        parse_level(level_str)
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        let level_str = env::var("STACKCRAFT_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        parse_level(&level_str)
    };

    let mut config = match &args.command {
        Commands::Serve(_) if env_flag("STACKCRAFT_LOG_JSON") => LoggingConfig::production(),
        _ => LoggingConfig::default(),
    };
    config.level = level;
    init_logging(config);
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false)
}
