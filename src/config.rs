use std::fs;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::EnrichError;

pub const DEFAULT_CONFIG_FILE: &str = "cnpj-enrich.json";
pub const DEFAULT_API_URL: &str = "https://publica.cnpj.ws/cnpj/{cnpj}";
pub const CNPJ_PLACEHOLDER: &str = "{cnpj}";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_input")]
    pub input: String,
    #[serde(default = "default_column")]
    pub column: String,
    #[serde(default)]
    pub sheet: Option<String>,
    #[serde(default = "default_error_log")]
    pub error_log: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_pause_secs")]
    pub pause_secs: u64,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            database: default_database(),
            input: default_input(),
            column: default_column(),
            sheet: None,
            error_log: default_error_log(),
            batch_size: default_batch_size(),
            pause_secs: default_pause_secs(),
            request_timeout_secs: None,
        }
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_url: Option<String>,
    pub database: Option<String>,
    pub input: Option<String>,
    pub column: Option<String>,
    pub sheet: Option<String>,
    pub error_log: Option<String>,
    pub batch_size: Option<usize>,
    pub pause_secs: Option<u64>,
}

impl ConfigOverrides {
    pub fn apply(self, mut config: Config) -> Config {
        if let Some(value) = self.api_url {
            config.api_url = value;
        }
        if let Some(value) = self.database {
            config.database = value;
        }
        if let Some(value) = self.input {
            config.input = value;
        }
        if let Some(value) = self.column {
            config.column = value;
        }
        if let Some(value) = self.sheet {
            config.sheet = Some(value);
        }
        if let Some(value) = self.error_log {
            config.error_log = value;
        }
        if let Some(value) = self.batch_size {
            config.batch_size = value;
        }
        if let Some(value) = self.pause_secs {
            config.pause_secs = value;
        }
        config
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub api_url: String,
    pub database: Utf8PathBuf,
    pub input: Utf8PathBuf,
    pub column: String,
    pub sheet: Option<String>,
    pub error_log: Utf8PathBuf,
    pub batch_size: usize,
    pub pause: Duration,
    pub request_timeout: Option<Duration>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads the config file. Without an explicit path a missing
    /// `cnpj-enrich.json` falls back to the built-in defaults.
    pub fn load(path: Option<&str>) -> Result<Config, EnrichError> {
        let config_path = match path {
            Some(path) => Utf8PathBuf::from(path),
            None => Utf8PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.as_std_path().exists() {
            return Ok(Config::default());
        }

        Self::load_file(&config_path)
    }

    pub fn load_file(path: &Utf8Path) -> Result<Config, EnrichError> {
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|_| EnrichError::ConfigRead(path.to_path_buf()))?;
        serde_json::from_str(&content).map_err(|err| EnrichError::ConfigParse(err.to_string()))
    }

    pub fn resolve(
        path: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, EnrichError> {
        let config = Self::load(path)?;
        Self::resolve_config(overrides.apply(config))
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, EnrichError> {
        if config.batch_size == 0 {
            return Err(EnrichError::InvalidConfig(
                "batch_size must be greater than zero".to_string(),
            ));
        }
        if !config.api_url.contains(CNPJ_PLACEHOLDER) {
            return Err(EnrichError::InvalidConfig(format!(
                "api_url must contain the {CNPJ_PLACEHOLDER} placeholder"
            )));
        }

        Ok(ResolvedConfig {
            api_url: config.api_url,
            database: Utf8PathBuf::from(config.database),
            input: Utf8PathBuf::from(config.input),
            column: config.column,
            sheet: config.sheet,
            error_log: Utf8PathBuf::from(config.error_log),
            batch_size: config.batch_size,
            pause: Duration::from_secs(config.pause_secs),
            request_timeout: config.request_timeout_secs.map(Duration::from_secs),
        })
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_database() -> String {
    "cnpj_data.db".to_string()
}

fn default_input() -> String {
    "CNPJ_busca.xlsx".to_string()
}

fn default_column() -> String {
    "CNPJ".to_string()
}

fn default_error_log() -> String {
    "error_log.txt".to_string()
}

fn default_batch_size() -> usize {
    3
}

fn default_pause_secs() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.batch_size, 3);
        assert_eq!(resolved.pause, Duration::from_secs(60));
        assert_eq!(resolved.api_url, DEFAULT_API_URL);
        assert!(resolved.request_timeout.is_none());
    }
}
