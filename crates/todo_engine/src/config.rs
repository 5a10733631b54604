use serde::Deserialize;
use tracing::debug;

use todo_base::pal::http::{DEFAULT_WORKERS, HttpServerConfig};
use todo_base::{FilePath, PalHandle, ResultExt, TodoResult};

use crate::todo::Todo;

/// Port the service listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 10000;
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Top-level service configuration, usually read from `todo.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    /// Items present when the service starts.
    #[serde(default)]
    pub seed: Vec<Todo>,
}

/// Where the HTTP server binds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Threads answering requests.
    pub workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            workers: DEFAULT_WORKERS,
        }
    }
}

impl ServerConfig {
    pub fn to_http_config(&self) -> HttpServerConfig {
        HttpServerConfig::new(self.host.clone())
            .with_port(self.port)
            .with_workers(self.workers)
    }
}

/// Behaviour switches of the request handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    pub update_policy: UpdatePolicy,
    pub malformed_body: MalformedBodyPolicy,
}

/* 📖 # Why make the update fallback a setting?

Some clients treat PUT as "create or replace" and rely on a 201 when the id was
unknown; others expect a 404 so they notice a typo in the id. Neither is
wrong, so the choice is explicit and defaults to the stricter reading.
*/

/// What `PUT /todo` does when no item has the given id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatePolicy {
    /// Respond 404.
    #[default]
    Strict,
    /// Create the item instead and respond 201 (409 if that fails on a conflict).
    Upsert,
}

/// How a request body that is not well-formed JSON is answered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedBodyPolicy {
    /// 400 with `"Bad Request"`.
    #[default]
    BadRequest,
    /// 500 with `"Internal Server Error"`, for clients written against older
    /// deployments.
    InternalError,
}

/// Load configuration from a TOML file using the PAL.
pub fn load_config(pal: &PalHandle, path: &FilePath) -> TodoResult<Config> {
    let content = pal
        .read_file_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path))?;
    let config = parse_config(&content).with_context(|| format!("Invalid config file: {}", path))?;
    debug!(
        path = %path,
        seed_count = config.seed.len(),
        "loaded configuration"
    );
    Ok(config)
}

/// Load the config file if it exists, otherwise fall back to defaults.
pub fn load_config_or_default(pal: &PalHandle, path: &FilePath) -> TodoResult<Config> {
    if pal.file_exists(path)? {
        load_config(pal, path)
    } else {
        debug!(path = %path, "config file not found, using defaults");
        Ok(Config::default())
    }
}

fn parse_config(content: &str) -> TodoResult<Config> {
    toml::from_str(content).map_err(|e| todo_base::err!("{}", e))
}
