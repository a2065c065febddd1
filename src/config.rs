use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::extract::{DEFAULT_APP, DEFAULT_ENDPOINT, DEFAULT_REFERER, DEFAULT_USER_AGENT};
use crate::validate::DEFAULT_ALLOWED_DOMAINS;

const DEFAULT_CONFIG_FILE: &str = "yt-relay";
const ENV_PREFIX: &str = "YT_RELAY";

/// Whether `/yt` answers with the extracted link or with the file itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    Json,
    Stream,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub extractor: ExtractorSettings,
    pub download: DownloadSettings,
    pub response_mode: ResponseMode,
    pub allowed_domains: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorSettings {
    pub endpoint: String,
    pub app: String,
    pub user_agent: String,
    pub referer: String,
    /// Seconds allowed for the whole extraction call.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadSettings {
    /// Seconds allowed for fetching the file in stream mode.
    pub timeout_secs: u64,
    /// Directory for scoped temp files; the system temp dir when unset.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

impl ExtractorSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl DownloadSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

impl Settings {
    /// Loads defaults, then the config file (`yt-relay.toml` in the working
    /// directory unless `path` is given), then `YT_RELAY__*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        Self::defaults()?
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("allowed_domains")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let domains: Vec<String> = DEFAULT_ALLOWED_DOMAINS
            .iter()
            .map(|d| d.to_string())
            .collect();

        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("extractor.endpoint", DEFAULT_ENDPOINT)?
            .set_default("extractor.app", DEFAULT_APP)?
            .set_default("extractor.user_agent", DEFAULT_USER_AGENT)?
            .set_default("extractor.referer", DEFAULT_REFERER)?
            .set_default("extractor.timeout_secs", 30)?
            .set_default("download.timeout_secs", 300)?
            .set_default("response_mode", "json")?
            .set_default("allowed_domains", domains)
    }
}
