use bsl_adapter::context::{default_launcher, DEFAULT_TIMEOUT};
use bsl_adapter::{EngineLocation, EngineSettings};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Config file looked up in the working directory when `--config` is not given.
const DEFAULT_CONFIG_NAME: &str = "mcp-1c-bsl";
const ENV_PREFIX: &str = "MCP_1C_BSL";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Used when `BSL_LANGUAGE_SERVER_JAR` is not set.
    #[serde(default)]
    pub jar: Option<String>,
    #[serde(default = "default_launcher")]
    pub launcher: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            jar: None,
            launcher: default_launcher(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub port: Option<u16>,
}

impl AppConfig {
    /// Engine settings with the JAR location resolved now, once.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            location: EngineLocation::resolve(self.engine.jar.as_deref()),
            launcher: self.engine.launcher.clone(),
            timeout: Duration::from_secs(self.engine.timeout_secs),
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let file = match path {
        Some(p) => File::from(p).required(true),
        None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
    };
    Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .list_separator(" ")
                .with_list_parse_key("engine.launcher"),
        )
        .build()?
        .try_deserialize()
}
