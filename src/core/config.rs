use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct QuestflowConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub flows: FlowsConfig,

    #[serde(default)]
    pub deploy: DeployConfig,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StorageConfig {
    /// Relative to the data directory, or `:memory:`.
    #[serde(default = "default_database")]
    pub database: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct FlowsConfig {
    #[serde(default = "default_flows_dir")]
    pub dir: String,
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Reject a start while the questionnaire is running or already starting.
    #[serde(default)]
    pub reject_running_starts: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DeployConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub phone_number: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LogConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    5000
}
fn default_database() -> String {
    "questflow.db".to_string()
}
fn default_flows_dir() -> String {
    "flows".to_string()
}
fn default_extension() -> String {
    "based".to_string()
}
fn default_base_url() -> String {
    "https://api.usebrainbase.com".to_string()
}
fn default_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
        }
    }
}

impl Default for FlowsConfig {
    fn default() -> Self {
        Self {
            dir: default_flows_dir(),
            extension: default_extension(),
            reject_running_starts: false,
        }
    }
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_base_url(),
            api_key: String::new(),
            phone_number: String::new(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl QuestflowConfig {
    /// Reads `config.toml` from `data_dir` (defaults when absent), then
    /// applies environment overrides looked up through `env`.
    pub fn load(data_dir: &Path, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config_path = data_dir.join(CONFIG_FILE);
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("reading {}", config_path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("parsing {}", config_path.display()))?
        } else {
            info!("No {} found, using defaults.", CONFIG_FILE);
            Self::default()
        };
        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(port) = env("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a port number, got '{}'", port))?;
        }
        if let Some(key) = env("BRAINBASE_API_KEY") {
            self.deploy.api_key = key;
        }
        if let Some(url) = env("BRAINBASE_BASE_URL") {
            self.deploy.base_url = url;
        }
        if let Some(phone) = env("TWILIO_PHONE_NUMBER") {
            self.deploy.phone_number = phone;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.deploy.enabled {
            if self.deploy.api_key.trim().is_empty() {
                bail!("[deploy] is enabled but no api_key is set (config or BRAINBASE_API_KEY)");
            }
            if self.deploy.phone_number.trim().is_empty() {
                bail!(
                    "[deploy] is enabled but no phone_number is set (config or TWILIO_PHONE_NUMBER)"
                );
            }
        }
        if self.flows.extension.trim().is_empty() {
            bail!("[flows] extension must not be empty");
        }
        self.log_level()?;
        Ok(())
    }

    pub fn log_level(&self) -> Result<tracing::Level> {
        self.log
            .level
            .parse()
            .map_err(|_| anyhow::anyhow!("unknown log level '{}'", self.log.level))
    }

    /// Database location, or `:memory:` passed through.
    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        if self.storage.database == ":memory:" {
            PathBuf::from(":memory:")
        } else {
            data_dir.join(&self.storage.database)
        }
    }

    pub fn flows_dir(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.flows.dir)
    }
}
