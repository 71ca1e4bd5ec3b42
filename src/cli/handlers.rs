//! Subcommand handlers. Each returns the process exit code.

use super::commands::{ConfigArgs, GenerateArgs, RecipeArgs, RepositoryArgs, ServeArgs};
use super::output::{OutputFormat, OutputFormatter};
use crate::build::{ContainerEngine, DockerEngine, UnavailableEngine};
use crate::config::StackcraftConfig;
use crate::error::PipelineError;
use crate::pipeline::StackcraftService;
use crate::record::{JsonlRecordStore, NullRecordStore, RecordStore};
use crate::server;
use crate::workspace::Credential;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const EXIT_FAILURE: i32 = 1;
const EXIT_USAGE: i32 = 2;

fn load_config() -> Result<StackcraftConfig, i32> {
    let config = StackcraftConfig::default();
    if let Err(e) = config.validate() {
        eprintln!("Error: Invalid configuration: {}", e);
        return Err(EXIT_USAGE);
    }
    debug!("Configuration: {:?}", config);
    Ok(config)
}

/// Wires the service to the local Docker engine and the configured record
/// store. A missing engine only fails builds.
pub fn create_service(config: StackcraftConfig) -> StackcraftService {
    let engine: Arc<dyn ContainerEngine> = match DockerEngine::connect() {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            warn!(error = %e, "Container engine not configured; builds will fail");
            Arc::new(UnavailableEngine::new(e.to_string()))
        }
    };
    let records: Arc<dyn RecordStore> = match &config.record_path {
        Some(path) => Arc::new(JsonlRecordStore::new(path.clone())),
        None => Arc::new(NullRecordStore),
    };
    StackcraftService::new(config, engine, records)
}

fn credential(args: &RepositoryArgs) -> Option<Credential> {
    Credential::from_optional(args.token.clone())
}

fn report_failure(err: &PipelineError) -> i32 {
    error!(stage = %err.stage, "Operation failed: {}", err);
    eprintln!("{}", err.help_message());
    if let Some(log) = err.build_log() {
        eprintln!("\nBuild log:\n{}", log);
    }
    EXIT_FAILURE
}

fn emit(output: anyhow::Result<String>, destination: Option<&std::path::Path>) -> i32 {
    let text = match output {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return EXIT_FAILURE;
        }
    };
    match destination {
        Some(path) => match std::fs::write(path, &text) {
            Ok(()) => {
                info!(path = %path.display(), "Output written");
                0
            }
            Err(e) => {
                eprintln!("Error: Failed to write {}: {}", path.display(), e);
                EXIT_FAILURE
            }
        },
        None => {
            print!("{}", text);
            if !text.ends_with('\n') {
                println!();
            }
            0
        }
    }
}

async fn read_recipe(args: &RecipeArgs) -> Result<String, i32> {
    tokio::fs::read_to_string(&args.recipe).await.map_err(|e| {
        eprintln!("Error: Failed to read recipe {}: {}", args.recipe.display(), e);
        EXIT_USAGE
    })
}

pub async fn handle_generate(args: &GenerateArgs) -> i32 {
    let config = match load_config() {
        Ok(config) => config,
        Err(code) => return code,
    };
    let service = create_service(config);

    match service
        .generate(&args.repository.repository_url, credential(&args.repository))
        .await
    {
        Ok(generation) => {
            let formatter = OutputFormatter::new(args.format.into());
            emit(formatter.format_generation(&generation), args.output.as_deref())
        }
        Err(e) => report_failure(&e),
    }
}

pub async fn handle_build(args: &RecipeArgs) -> i32 {
    let config = match load_config() {
        Ok(config) => config,
        Err(code) => return code,
    };
    let recipe = match read_recipe(args).await {
        Ok(recipe) => recipe,
        Err(code) => return code,
    };
    let service = create_service(config);

    match service
        .build(&args.repository.repository_url, credential(&args.repository), &recipe)
        .await
    {
        Ok(result) => emit(OutputFormatter::new(args.format.into()).format_build(&result), None),
        Err(e) => report_failure(&e),
    }
}

pub async fn handle_push(args: &RecipeArgs) -> i32 {
    let config = match load_config() {
        Ok(config) => config,
        Err(code) => return code,
    };
    let recipe = match read_recipe(args).await {
        Ok(recipe) => recipe,
        Err(code) => return code,
    };
    let service = create_service(config);

    match service
        .publish(&args.repository.repository_url, credential(&args.repository), &recipe)
        .await
    {
        Ok(result) => emit(OutputFormatter::new(args.format.into()).format_publish(&result), None),
        Err(e) => report_failure(&e),
    }
}

pub async fn handle_serve(args: &ServeArgs) -> i32 {
    let config = match load_config() {
        Ok(config) => config,
        Err(code) => return code,
    };
    let addr = match args.bind {
        Some(addr) => addr,
        None => match config.bind_addr() {
            Ok(addr) => addr,
            Err(e) => {
                eprintln!("Error: {}", e);
                return EXIT_USAGE;
            }
        },
    };

    let service = Arc::new(create_service(config));
    match server::serve(service, addr).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: Server failed: {:#}", e);
            EXIT_FAILURE
        }
    }
}

pub fn handle_config(args: &ConfigArgs) -> i32 {
    let config = match load_config() {
        Ok(config) => config,
        Err(code) => return code,
    };
    let format: OutputFormat = args.format.into();
    emit(OutputFormatter::new(format).format_config(&config), None)
}
