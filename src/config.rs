//! Configuration management for stackcraft
//!
//! Settings load from environment variables with sensible defaults. The git
//! access token is deliberately absent: it is supplied per call and never
//! held by long-lived state.
//!
//! # Environment Variables
//!
//! - `STACKCRAFT_WORKSPACE_ROOT`: Parent directory of per-operation checkouts - default: system temp dir + "stackcraft-workspaces"
//! - `STACKCRAFT_ALLOWED_SCHEMES`: Comma-separated URL schemes accepted for clone and push - default: "https"
//! - `STACKCRAFT_FETCH_TIMEOUT`: Git transport read timeout in seconds - default: "60"
//! - `STACKCRAFT_CLONE_DEPTH`: History depth for clones, 0 for full history - default: "1"
//! - `STACKCRAFT_RECIPE_FILE`: Name of the recipe file written to the checkout - default: "Dockerfile"
//! - `STACKCRAFT_BRANCH_PREFIX`: Prefix of published branch names - default: "stackcraft/dockerfile"
//! - `STACKCRAFT_COMMIT_AUTHOR` / `STACKCRAFT_COMMIT_EMAIL`: Commit signature - default: "stackcraft" / "stackcraft@localhost"
//! - `STACKCRAFT_IMAGE_PREFIX`: Namespace for built image tags - default: "stackcraft"
//! - `STACKCRAFT_RECORD_PATH`: JSON Lines file receiving generation records, empty to disable - default: local data dir + "stackcraft/generations.jsonl"
//! - `STACKCRAFT_BIND`: HTTP listen address - default: "127.0.0.1:5000"
//! - `STACKCRAFT_LOG_LEVEL`: Logging level - default: "info"
//!
//! # Example
//!
//! ```no_run
//! use stackcraft::StackcraftConfig;
//!
//! let config = StackcraftConfig::default();
//! config.validate().expect("Invalid configuration");
//! println!("{}", config);
//! ```

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_ALLOWED_SCHEMES: &str = "https";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;
const DEFAULT_CLONE_DEPTH: u32 = 1;
const DEFAULT_RECIPE_FILE: &str = "Dockerfile";
const DEFAULT_BRANCH_PREFIX: &str = "stackcraft/dockerfile";
const DEFAULT_COMMIT_AUTHOR: &str = "stackcraft";
const DEFAULT_COMMIT_EMAIL: &str = "stackcraft@localhost";
const DEFAULT_IMAGE_PREFIX: &str = "stackcraft";
const DEFAULT_BIND: &str = "127.0.0.1:5000";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// Failed to parse configuration value
    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

#[derive(Debug, Clone)]
pub struct StackcraftConfig {
    /// Directory under which every operation gets its own checkout
    pub workspace_root: PathBuf,

    /// Lower-cased URL schemes accepted for clone and push
    pub allowed_schemes: Vec<String>,

    /// Connect and read timeout for git transports during clone and push, in seconds
    pub fetch_timeout_secs: u64,

    /// Shallow clone depth; 0 clones full history
    pub clone_depth: u32,

    /// File name of the recipe inside the checkout
    pub recipe_file: String,

    pub branch_prefix: String,

    pub commit_author: String,

    pub commit_email: String,

    /// Namespace for built image tags
    pub image_prefix: String,

    /// Generation record file; `None` disables recording
    pub record_path: Option<PathBuf>,

    pub bind: String,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for StackcraftConfig {
    /// Creates a new configuration by loading from environment variables with defaults
    fn default() -> Self {
        let workspace_root = env::var("STACKCRAFT_WORKSPACE_ROOT")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| env::temp_dir().join("stackcraft-workspaces"));

        let allowed_schemes = parse_schemes(
            &env::var("STACKCRAFT_ALLOWED_SCHEMES")
                .unwrap_or_else(|_| DEFAULT_ALLOWED_SCHEMES.to_string()),
        );

        let fetch_timeout_secs = env::var("STACKCRAFT_FETCH_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS);

        let clone_depth = env::var("STACKCRAFT_CLONE_DEPTH")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(DEFAULT_CLONE_DEPTH);

        let string_var = |key: &str, default: &str| {
            env::var(key)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        // An explicitly empty path disables recording
        let record_path = match env::var("STACKCRAFT_RECORD_PATH") {
            Ok(v) if v.trim().is_empty() => None,
            Ok(v) => Some(PathBuf::from(v)),
            Err(_) => dirs::data_local_dir()
                .map(|dir| dir.join("stackcraft").join("generations.jsonl")),
        };

        let log_level = env::var("STACKCRAFT_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            workspace_root,
            allowed_schemes,
            fetch_timeout_secs,
            clone_depth,
            recipe_file: string_var("STACKCRAFT_RECIPE_FILE", DEFAULT_RECIPE_FILE),
            branch_prefix: string_var("STACKCRAFT_BRANCH_PREFIX", DEFAULT_BRANCH_PREFIX),
            commit_author: string_var("STACKCRAFT_COMMIT_AUTHOR", DEFAULT_COMMIT_AUTHOR),
            commit_email: string_var("STACKCRAFT_COMMIT_EMAIL", DEFAULT_COMMIT_EMAIL),
            image_prefix: string_var("STACKCRAFT_IMAGE_PREFIX", DEFAULT_IMAGE_PREFIX),
            record_path,
            bind: string_var("STACKCRAFT_BIND", DEFAULT_BIND),
            log_level,
        }
    }
}

fn parse_schemes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl StackcraftConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any validation fails
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Fetch timeout must be at least 1 second".to_string(),
            ));
        }
        if self.fetch_timeout_secs > 600 {
            return Err(ConfigError::ValidationFailed(
                "Fetch timeout cannot exceed 10 minutes".to_string(),
            ));
        }

        if self.allowed_schemes.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "At least one URL scheme must be allowed".to_string(),
            ));
        }

        if self.recipe_file.contains(['/', '\\']) || self.recipe_file == ".." {
            return Err(ConfigError::ValidationFailed(format!(
                "Recipe file must be a plain file name, got '{}'",
                self.recipe_file
            )));
        }

        if git2::Branch::name_is_valid(&format!("{}-x", self.branch_prefix)).ok() != Some(true) {
            return Err(ConfigError::ValidationFailed(format!(
                "Branch prefix '{}' does not form a valid branch name",
                self.branch_prefix
            )));
        }

        self.bind_addr()?;

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind.parse().map_err(|e: std::net::AddrParseError| ConfigError::ParseError {
            field: "STACKCRAFT_BIND".to_string(),
            error: e.to_string(),
        })
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn is_scheme_allowed(&self, scheme: &str) -> bool {
        self.allowed_schemes
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(scheme))
    }

    /// Converts configuration to a display map for output formatting
    pub fn to_display_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();

        map.insert(
            "workspace_root".to_string(),
            self.workspace_root.display().to_string(),
        );
        map.insert("allowed_schemes".to_string(), self.allowed_schemes.join(","));
        map.insert(
            "fetch_timeout_secs".to_string(),
            self.fetch_timeout_secs.to_string(),
        );
        map.insert("clone_depth".to_string(), self.clone_depth.to_string());
        map.insert("recipe_file".to_string(), self.recipe_file.clone());
        map.insert("branch_prefix".to_string(), self.branch_prefix.clone());
        map.insert("commit_author".to_string(), self.commit_author.clone());
        map.insert("commit_email".to_string(), self.commit_email.clone());
        map.insert("image_prefix".to_string(), self.image_prefix.clone());
        if let Some(ref path) = self.record_path {
            map.insert("record_path".to_string(), path.display().to_string());
        }
        map.insert("bind".to_string(), self.bind.clone());
        map.insert("log_level".to_string(), self.log_level.clone());

        map
    }
}

impl fmt::Display for StackcraftConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stackcraft Configuration:")?;
        writeln!(f, "  Workspace Root: {}", self.workspace_root.display())?;
        writeln!(f, "  Allowed Schemes: {}", self.allowed_schemes.join(", "))?;
        writeln!(f, "  Fetch Timeout: {}s", self.fetch_timeout_secs)?;
        writeln!(f, "  Clone Depth: {}", self.clone_depth)?;
        writeln!(f, "  Recipe File: {}", self.recipe_file)?;
        writeln!(f, "  Branch Prefix: {}", self.branch_prefix)?;
        writeln!(
            f,
            "  Commit Author: {} <{}>",
            self.commit_author, self.commit_email
        )?;
        writeln!(f, "  Image Prefix: {}", self.image_prefix)?;
        match self.record_path {
            Some(ref path) => writeln!(f, "  Record Path: {}", path.display())?,
            None => writeln!(f, "  Record Path: disabled")?,
        }
        writeln!(f, "  Bind: {}", self.bind)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
