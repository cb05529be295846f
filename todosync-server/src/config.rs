//! Settings for `todosync-server`.
//!
//! Each setting comes from the first source that has it: a command-line
//! flag, its environment variable, the `[server]` table of
//! `~/.config/todosync-server/config.toml`, or the built-in default.

use std::path::{Path, PathBuf};

/// Listen address used when nothing else is configured.
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:9000";
/// Collection path segment used when nothing else is configured.
const DEFAULT_COLLECTION_PATH: &str = "todos";
/// Task cap used when nothing else is configured.
const DEFAULT_MAX_TASKS: usize = 10_000;

/// Server settings could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The settings file exists but could not be read, or an explicit
    /// `--config` path is missing.
    #[error("cannot read {path}: {source}")]
    ReadFile {
        /// File that was opened.
        path: PathBuf,
        /// I/O failure.
        source: std::io::Error,
    },

    /// The settings file is not valid TOML for this server.
    #[error("invalid settings file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerConfigFile {
    server: ServerSection,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerSection {
    bind_addr: Option<String>,
    collection_path: Option<String>,
    max_tasks: Option<usize>,
}

/// Command line of `todosync-server`.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "In-memory REST task collection")]
pub struct ServerCliArgs {
    /// Listen address, e.g. `127.0.0.1:9000`.
    #[arg(short, long, env = "TODOSYNC_SERVER_ADDR")]
    pub bind: Option<String>,

    /// Settings file to use instead of the per-user one.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Serve the collection under `/<PATH>` instead of `/todos`.
    #[arg(long, value_name = "PATH")]
    pub collection_path: Option<String>,

    /// Reject creates once this many tasks are stored.
    #[arg(long)]
    pub max_tasks: Option<usize>,

    /// `tracing` filter directive.
    #[arg(long, default_value = "info", env = "TODOSYNC_SERVER_LOG")]
    pub log_level: String,
}

/// Effective server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind_addr: String,
    /// Collection segment with surrounding slashes removed, never empty.
    pub collection_path: String,
    pub max_tasks: usize,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            collection_path: DEFAULT_COLLECTION_PATH.to_string(),
            max_tasks: DEFAULT_MAX_TASKS,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Reads the settings file named by `cli` (or the per-user default) and
    /// merges it under the command line.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed. A
    /// missing per-user file is not an error.
    pub fn load(cli: &ServerCliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    fn resolve(cli: &ServerCliArgs, file: &ServerConfigFile) -> Self {
        let section = &file.server;
        let collection_path = cli
            .collection_path
            .as_deref()
            .or(section.collection_path.as_deref())
            .map(|path| path.trim_matches('/'))
            .filter(|path| !path.is_empty())
            .unwrap_or(DEFAULT_COLLECTION_PATH)
            .to_string();
        let log_level = if cli.log_level.is_empty() {
            "info".to_string()
        } else {
            cli.log_level.clone()
        };

        Self {
            bind_addr: cli
                .bind
                .as_deref()
                .or(section.bind_addr.as_deref())
                .unwrap_or(DEFAULT_BIND_ADDR)
                .to_string(),
            collection_path,
            max_tasks: cli.max_tasks.or(section.max_tasks).unwrap_or(DEFAULT_MAX_TASKS),
            log_level,
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("todosync-server").join("config.toml"))
}

fn load_config_file(explicit: Option<&Path>) -> Result<ServerConfigFile, ConfigError> {
    let (path, required) = match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => match default_config_path() {
            Some(path) => (path, false),
            None => return Ok(ServerConfigFile::default()),
        },
    };

    match std::fs::read_to_string(&path) {
        Ok(text) => Ok(toml::from_str(&text)?),
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
            Ok(ServerConfigFile::default())
        }
        Err(source) => Err(ConfigError::ReadFile { path, source }),
    }
}
