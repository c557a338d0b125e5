use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants;
use crate::error::{Result, ScraperError};

/// Full run configuration, read from `config/searches.toml` by default.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub searches: Vec<SearchDef>,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub lookups: LookupConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

/// One saved search whose results feed the daily CSV.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SearchDef {
    pub search_id: u32,
    pub category: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub description: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_root")]
    pub root: PathBuf,
    #[serde(default = "default_output_file")]
    pub file_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LookupConfig {
    #[serde(default = "default_parcel_dirs")]
    pub parcel_dirs: Vec<PathBuf>,
    #[serde(default = "default_location_dirs")]
    pub location_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub require_parcel: bool,
    #[serde(default)]
    pub require_location: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_delay_ms_min")]
    pub delay_ms_min: u64,
    #[serde(default = "default_delay_ms_max")]
    pub delay_ms_max: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_output_root() -> PathBuf {
    PathBuf::from(constants::DEFAULT_OUTPUT_ROOT)
}

fn default_output_file() -> String {
    constants::DEFAULT_OUTPUT_FILE.to_string()
}

fn default_parcel_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from(constants::PARCEL_LOOKUP_DIR)]
}

fn default_location_dirs() -> Vec<PathBuf> {
    constants::LOCATION_LOOKUP_DIRS
        .iter()
        .map(PathBuf::from)
        .collect()
}

fn default_base_url() -> String {
    constants::DEFAULT_BASE_URL.to_string()
}

fn default_timeout_seconds() -> u64 {
    25
}

fn default_delay_ms_min() -> u64 {
    800
}

fn default_delay_ms_max() -> u64 {
    2500
}

fn default_user_agent() -> String {
    constants::DEFAULT_USER_AGENT.to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: default_output_root(),
            file_name: default_output_file(),
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            parcel_dirs: default_parcel_dirs(),
            location_dirs: default_location_dirs(),
            require_parcel: false,
            require_location: false,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            delay_ms_min: default_delay_ms_min(),
            delay_ms_max: default_delay_ms_max(),
            user_agent: default_user_agent(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Inter-search delay bounds in milliseconds, always ordered low..=high.
    pub fn delay_bounds_ms(&self) -> (u64, u64) {
        if self.delay_ms_min <= self.delay_ms_max {
            (self.delay_ms_min, self.delay_ms_max)
        } else {
            (self.delay_ms_max, self.delay_ms_min)
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config_path = path.as_ref();
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            ScraperError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;

        Self::from_toml_str(&config_content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for search in &self.searches {
            if !seen.insert(search.search_id) {
                return Err(ScraperError::Config(format!(
                    "search_id values must be unique (duplicate {})",
                    search.search_id
                )));
            }
        }
        Ok(())
    }
}
