//! Configuration system for the `todosync` client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/todosync/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;
use std::time::Duration;

use todosync_proto::Filter;

use crate::cache::SNAPSHOT_KEY;
use crate::view::DEFAULT_PAGE_SIZE;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    remote: RemoteFileConfig,
    cache: CacheFileConfig,
    view: ViewFileConfig,
    task: TaskFileConfig,
}

/// `[remote]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct RemoteFileConfig {
    collection_url: Option<String>,
    request_timeout_secs: Option<u64>,
}

/// `[cache]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct CacheFileConfig {
    dir: Option<PathBuf>,
    key: Option<String>,
    enabled: Option<bool>,
}

/// `[view]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ViewFileConfig {
    page_size: Option<usize>,
}

/// `[task]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct TaskFileConfig {
    default_owner: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -- Remote --
    /// URL of the task collection resource.
    pub collection_url: String,
    /// Timeout for each collection request.
    pub request_timeout: Duration,

    // -- Cache --
    /// Snapshot directory. `None` means the platform data directory.
    pub cache_dir: Option<PathBuf>,
    /// Key the snapshot is stored under.
    pub cache_key: String,
    /// Whether the local snapshot is used at all.
    pub cache_enabled: bool,

    // -- View --
    /// Tasks per page.
    pub page_size: usize,

    // -- Task --
    /// Owner id for new tasks that name none.
    pub default_owner: String,

    // -- Logging --
    /// Log level filter.
    pub log_level: String,
    /// Log file path. `None` means `$TMPDIR/todosync.log`.
    pub log_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            collection_url: "http://127.0.0.1:9000/todos".to_string(),
            request_timeout: Duration::from_secs(10),
            cache_dir: None,
            cache_key: SNAPSHOT_KEY.to_string(),
            cache_enabled: true,
            page_size: DEFAULT_PAGE_SIZE,
            default_owner: "userId 1".to_string(),
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an
    /// error. Otherwise the default path (`~/.config/todosync/config.toml`)
    /// is tried and silently ignored if missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default. Separated from `load()` so it can be
    /// tested without CLI parsing.
    #[must_use]
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            collection_url: cli
                .url
                .clone()
                .or_else(|| file.remote.collection_url.clone())
                .unwrap_or(defaults.collection_url),
            request_timeout: cli
                .timeout_secs
                .or(file.remote.request_timeout_secs)
                .map_or(defaults.request_timeout, Duration::from_secs),
            cache_dir: cli.cache_dir.clone().or_else(|| file.cache.dir.clone()),
            cache_key: file.cache.key.clone().unwrap_or(defaults.cache_key),
            cache_enabled: !cli.no_cache && file.cache.enabled.unwrap_or(defaults.cache_enabled),
            page_size: file.view.page_size.unwrap_or(defaults.page_size),
            default_owner: file
                .task
                .default_owner
                .clone()
                .unwrap_or(defaults.default_owner),
            log_level: if cli.log_level.is_empty() {
                defaults.log_level
            } else {
                cli.log_level.clone()
            },
            log_file: cli.log_file.clone(),
        }
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Task list synchronized with a remote collection")]
pub struct CliArgs {
    /// URL of the task collection (e.g. `http://127.0.0.1:9000/todos`).
    #[arg(long, env = "TODOSYNC_URL")]
    pub url: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, env = "TODOSYNC_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Path to config file (default: `~/.config/todosync/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory for the local snapshot.
    #[arg(long, env = "TODOSYNC_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Do not read or write the local snapshot.
    #[arg(long)]
    pub no_cache: bool,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TODOSYNC_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/todosync.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// What to do. Defaults to `list`.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands.
#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show one page of tasks.
    List {
        /// Completion filter: all, completed or pending.
        #[arg(long, short)]
        filter: Option<Filter>,
        /// Only tasks whose title contains this text.
        #[arg(long, short)]
        search: Option<String>,
        /// 1-based page index.
        #[arg(long, short)]
        page: Option<usize>,
        /// Tasks per page.
        #[arg(long)]
        page_size: Option<usize>,
    },
    /// Create a task.
    Add {
        /// Task title (at least 3 characters).
        #[arg(long, short)]
        title: String,
        /// Owner id (default from config).
        #[arg(long, short)]
        owner: Option<String>,
        /// Create the task already completed.
        #[arg(long)]
        completed: bool,
    },
    /// Edit fields of a task.
    Edit {
        /// Task id.
        id: String,
        /// New title.
        #[arg(long, short)]
        title: Option<String>,
        /// New owner id.
        #[arg(long, short)]
        owner: Option<String>,
        /// New completion flag.
        #[arg(long)]
        completed: Option<bool>,
    },
    /// Flip a task between completed and pending.
    Toggle {
        /// Task id.
        id: String,
    },
    /// Delete a task.
    Delete {
        /// Task id.
        id: String,
    },
    /// Reload the list from the collection.
    Refresh,
    /// Show task counters.
    Stats,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("todosync").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
