use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{DashboardError, Result};

/// Runtime configuration of the dashboard
///
/// Loaded from an optional YAML file. Every field has a default, so an
/// empty or missing file yields a usable configuration pointing at a local
/// backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    /// Base URL of the sustainability backend, e.g. `http://localhost:8000/api/v1`
    pub api_base_url: String,

    /// Company whose records the dashboard shows
    pub company_id: String,

    /// Address the web dashboard binds to
    pub listen_addr: String,

    /// Client-side request timeout. `None` leaves request lifetime to the
    /// transport and the backend.
    pub request_timeout_secs: Option<u64>,

    /// Directory where downloaded reports and templates are written
    pub download_dir: PathBuf,

    /// Directory served under `/static`
    pub static_dir: PathBuf,

    /// Maximum number of activities fetched for analytics
    pub activity_limit: usize,

    /// Default number of recommendations fetched
    pub recommendation_limit: usize,

    /// Default `env_logger` filter when `RUST_LOG` is unset
    pub log_level: String,

    /// Upper bound on a single HTTP request body accepted by the web dashboard
    pub max_request_bytes: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api/v1".to_string(),
            company_id: "1".to_string(),
            listen_addr: "127.0.0.1:3000".to_string(),
            request_timeout_secs: None,
            download_dir: PathBuf::from("downloads"),
            static_dir: PathBuf::from("static"),
            activity_limit: 1000,
            recommendation_limit: 5,
            log_level: "info".to_string(),
            max_request_bytes: 64 * 1024 * 1024,
        }
    }
}

impl DashboardConfig {
    /// Apply `ECODASH_*` overrides using `lookup` to read variables
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("ECODASH_API_URL") {
            self.api_base_url = url;
        }
        if let Some(company) = lookup("ECODASH_COMPANY_ID") {
            self.company_id = company;
        }
        if let Some(addr) = lookup("ECODASH_LISTEN") {
            self.listen_addr = addr;
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            return Err(DashboardError::Config(format!(
                "api_base_url must be an http(s) URL, got '{}'",
                self.api_base_url
            )));
        }
        if self.company_id.trim().is_empty() {
            return Err(DashboardError::Config("company_id cannot be empty".into()));
        }
        if self.activity_limit == 0 {
            return Err(DashboardError::Config(
                "activity_limit must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Parse a configuration from YAML text
pub fn parse_config(yaml: &str) -> Result<DashboardConfig> {
    if yaml.trim().is_empty() {
        return Ok(DashboardConfig::default());
    }
    let config: DashboardConfig = serde_yaml::from_str(yaml)?;
    Ok(config)
}

/// Load the configuration
///
/// Reads `path` when given (a missing file is an error), applies the
/// environment overrides and validates the result.
pub fn load_config(path: Option<&Path>) -> Result<DashboardConfig> {
    let mut config = match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path).map_err(|e| {
                DashboardError::Config(format!("cannot read {}: {}", path.display(), e))
            })?;
            parse_config(&contents)?
        }
        None => DashboardConfig::default(),
    };

    config.apply_overrides(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}
