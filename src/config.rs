//! Configuration management for repo-spider
//!
//! Settings are loaded from environment variables with defaults; command line
//! flags override them through the `with_*` builders.
//!
//! # Environment Variables
//!
//! - `REPO_SPIDER_WORKSPACE`: Workspace id namespacing persisted records - default: "local"
//! - `REPO_SPIDER_DATA_DIR`: Root of the analysis store - default: platform data dir + "repo-spider"
//! - `REPO_SPIDER_CLONE_DIR`: Reusable clone directory - default: unset (temporary clones)
//! - `REPO_SPIDER_POOL_SIZE`: Candidates per batch - default: "40"
//! - `REPO_SPIDER_CANDIDATE_TIMEOUT`: Per-candidate timeout in seconds, 0 disables - default: unset
//! - `REPO_SPIDER_GITHUB_API`: GitHub REST API base URL - default: "https://api.github.com"
//! - `REPO_SPIDER_LOG_LEVEL`: Logging level - default: "info"
//! - `GITHUB_TOKEN`: Token for search and clone; never printed
//!
//! # Example
//!
//! ```no_run
//! use repo_spider::SpiderConfig;
//!
//! let config = SpiderConfig::default().with_pool_size(10);
//! config.validate().expect("Invalid configuration");
//! println!("{}", config);
//! ```

use crate::materialize::CloneConfig;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default values for configuration
const DEFAULT_WORKSPACE: &str = "local";
const DEFAULT_POOL_SIZE: usize = 40;
const MAX_POOL_SIZE: usize = 500;
const DEFAULT_GITHUB_API: &str = "https://api.github.com";
const DEFAULT_LOG_LEVEL: &str = "info";
const DATA_DIR_NAME: &str = "repo-spider";

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
pub struct SpiderConfig {
    /// Workspace (tenant) id; records live under `<data_dir>/<workspace_id>`
    pub workspace_id: String,

    /// Root directory of the analysis store
    pub data_dir: PathBuf,

    /// Reusable clone directory; temporary clones when `None`
    pub clone_dir: Option<PathBuf>,

    /// Candidates processed per batch
    pub pool_size: usize,

    /// Per-candidate timeout in seconds
    pub candidate_timeout_secs: Option<u64>,

    /// GitHub REST API base URL
    pub github_api: String,

    pub github_token: Option<String>,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(env::temp_dir)
        .join(DATA_DIR_NAME)
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Default for SpiderConfig {
    /// Loads `REPO_SPIDER_*` variables, falling back to defaults for any that
    /// are missing or unparsable.
    fn default() -> Self {
        let workspace_id =
            non_empty_var("REPO_SPIDER_WORKSPACE").unwrap_or_else(|| DEFAULT_WORKSPACE.to_string());

        let data_dir = non_empty_var("REPO_SPIDER_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let clone_dir = non_empty_var("REPO_SPIDER_CLONE_DIR").map(PathBuf::from);

        let pool_size = non_empty_var("REPO_SPIDER_POOL_SIZE")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_POOL_SIZE);

        let candidate_timeout_secs = non_empty_var("REPO_SPIDER_CANDIDATE_TIMEOUT")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0);

        let github_api =
            non_empty_var("REPO_SPIDER_GITHUB_API").unwrap_or_else(|| DEFAULT_GITHUB_API.to_string());

        let log_level = env::var("REPO_SPIDER_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            workspace_id,
            data_dir,
            clone_dir,
            pool_size,
            candidate_timeout_secs,
            github_api,
            github_token: non_empty_var("GITHUB_TOKEN"),
            log_level,
        }
    }
}

impl SpiderConfig {
    pub fn with_workspace(mut self, workspace_id: impl Into<String>) -> Self {
        self.workspace_id = workspace_id.into();
        self
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn with_clone_dir(mut self, clone_dir: impl Into<PathBuf>) -> Self {
        self.clone_dir = Some(clone_dir.into());
        self
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Zero disables the timeout.
    pub fn with_candidate_timeout(mut self, secs: u64) -> Self {
        self.candidate_timeout_secs = (secs > 0).then_some(secs);
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into().to_lowercase();
        self
    }

    pub fn candidate_timeout(&self) -> Option<Duration> {
        self.candidate_timeout_secs.map(Duration::from_secs)
    }

    pub fn clone_config(&self) -> CloneConfig {
        CloneConfig {
            clone_dir: self.clone_dir.clone(),
            token: self.github_token.clone(),
        }
    }

    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the workspace id is not a single path
    /// segment, the pool size is out of range, or the log level is unknown.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workspace_id.is_empty()
            || self.workspace_id == "."
            || self.workspace_id == ".."
            || self.workspace_id.contains(['/', '\\'])
        {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid workspace id: '{}'. Must be a single directory name",
                self.workspace_id
            )));
        }

        if self.pool_size == 0 || self.pool_size > MAX_POOL_SIZE {
            return Err(ConfigError::ValidationFailed(format!(
                "Pool size must be between 1 and {}, got {}",
                MAX_POOL_SIZE, self.pool_size
            )));
        }

        if !self.github_api.starts_with("http://") && !self.github_api.starts_with("https://") {
            return Err(ConfigError::ParseError {
                field: "REPO_SPIDER_GITHUB_API".to_string(),
                error: format!("'{}' is not an http(s) URL", self.github_api),
            });
        }

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

    /// Converts configuration to a display map for output formatting
    pub fn to_display_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();

        map.insert("workspace_id".to_string(), self.workspace_id.clone());
        map.insert("data_dir".to_string(), self.data_dir.display().to_string());
        if let Some(ref dir) = self.clone_dir {
            map.insert("clone_dir".to_string(), dir.display().to_string());
        }
        map.insert("pool_size".to_string(), self.pool_size.to_string());
        if let Some(secs) = self.candidate_timeout_secs {
            map.insert("candidate_timeout_secs".to_string(), secs.to_string());
        }
        map.insert("github_api".to_string(), self.github_api.clone());
        map.insert("github_token".to_string(), token_state(&self.github_token).to_string());
        map.insert("log_level".to_string(), self.log_level.clone());

        map
    }
}

fn token_state(token: &Option<String>) -> &'static str {
    if token.is_some() {
        "set"
    } else {
        "unset"
    }
}

impl fmt::Display for SpiderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Repo Spider Configuration:")?;
        writeln!(f, "  Workspace: {}", self.workspace_id)?;
        writeln!(f, "  Data Dir: {}", self.data_dir.display())?;
        if let Some(ref dir) = self.clone_dir {
            writeln!(f, "  Clone Dir: {}", dir.display())?;
        }
        writeln!(f, "  Pool Size: {}", self.pool_size)?;
        if let Some(secs) = self.candidate_timeout_secs {
            writeln!(f, "  Candidate Timeout: {}s", secs)?;
        }
        writeln!(f, "  GitHub API: {}", self.github_api)?;
        writeln!(f, "  GitHub Token: {}", token_state(&self.github_token))?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
