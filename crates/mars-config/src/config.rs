// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

const DEFAULT_CONFIG_FILE: &str = "/etc/mars-server.yaml";
const CONFIG_FILE_ENV: &str = "MARS_CONFIG_FILE";

/// Worker/client configuration, loaded from the YAML file named by
/// `MARS_CONFIG_FILE` (defaulting to `/etc/mars-server.yaml`); falls back
/// to [`Config::default`] when that file does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub cluster: String,
    pub cache_root: String,
    pub shares: Vec<String>,
    pub memcached: Vec<String>,
    pub cache_folder: String,
    pub download_servers: Vec<String>,
}

/// Mirrors the YAML document's shape, including the deprecated
/// `MARS_CACHE_FOLDER` alias: older fleet configs alternate between the
/// two keys, so this implementation reads either but always writes
/// `CACHE_FOLDER` in [`Config::cache_folder`].
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(rename = "CLUSTER")]
    cluster: Option<String>,
    #[serde(rename = "CACHE_ROOT")]
    cache_root: Option<String>,
    #[serde(rename = "SHARES")]
    shares: Option<Vec<String>>,
    #[serde(rename = "MEMCACHED")]
    memcached: Option<Vec<String>>,
    #[serde(rename = "CACHE_FOLDER")]
    cache_folder: Option<String>,
    #[serde(rename = "MARS_CACHE_FOLDER")]
    mars_cache_folder: Option<String>,
    #[serde(rename = "DOWNLOAD_SERVERS")]
    download_servers: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cluster: "cci1".to_string(),
            cache_root: "/".to_string(),
            shares: vec!["download-dev-0001".to_string(), "download-dev-0002".to_string()],
            memcached: vec![],
            cache_folder: "mars".to_string(),
            download_servers: vec![
                "https://dss-download-cci1.copernicus-climate.eu".to_string(),
                "https://dss-download-cci2.copernicus-climate.eu".to_string(),
            ],
        }
    }
}

impl Config {
    /// Resolve the config file path from `MARS_CONFIG_FILE`, falling back
    /// to `/etc/mars-server.yaml`.
    pub fn config_file_path() -> String {
        std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string())
    }

    /// Load from the resolved config file, or [`Config::default`] if it
    /// is absent.
    pub fn load() -> Result<Config, ConfigError> {
        Self::load_from(&Self::config_file_path())
    }

    pub fn load_from(path: &str) -> Result<Config, ConfigError> {
        if !Path::new(path).exists() {
            tracing::debug!(path, "config file absent, using built-in defaults");
            return Ok(Config::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;

        let raw: RawConfig = serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })?;

        let defaults = Config::default();

        let cache_folder = match (raw.cache_folder, raw.mars_cache_folder) {
            (Some(v), _) => v,
            (None, Some(v)) => {
                tracing::warn!(
                    path,
                    "config uses deprecated MARS_CACHE_FOLDER key, rename to CACHE_FOLDER"
                );
                v
            }
            (None, None) => defaults.cache_folder,
        };

        let config = Config {
            cluster: raw.cluster.unwrap_or(defaults.cluster),
            cache_root: raw.cache_root.unwrap_or(defaults.cache_root),
            shares: raw.shares.unwrap_or(defaults.shares),
            memcached: raw.memcached.unwrap_or(defaults.memcached),
            cache_folder,
            download_servers: raw.download_servers.unwrap_or(defaults.download_servers),
        };

        config.validate()?;
        tracing::debug!(?config, "config loaded");
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.shares.is_empty() {
            return Err(ConfigError::NoShares);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
