//! Runtime settings read from the environment.

use std::env;
use std::path::PathBuf;

use thiserror::Error;

pub const DATA_DIR_VAR: &str = "PORT_SYSTEM_DATA_DIR";
pub const SEED_VAR: &str = "PORT_SYSTEM_SEED";
pub const SAMPLE_DATA_VAR: &str = "PORT_SYSTEM_SAMPLE_DATA";
pub const LOG_FILTER_VAR: &str = "RUST_LOG";

pub mod defaults {
    pub const DATA_DIR: &str = "data";
    pub const SEED: u64 = 42;
    pub const SAMPLE_DATA: bool = true;
    pub const LOG_FILTER: &str = "info";
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding the five collection files
    pub data_dir: PathBuf,
    /// Seed for the sample-data generator
    pub seed: u64,
    /// Populate sample data when the store is empty
    pub sample_data: bool,
    /// `tracing` filter directive
    pub log_filter: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup. Unset keys take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let data_dir = lookup(DATA_DIR_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(defaults::DATA_DIR));

        let seed = match lookup(SEED_VAR) {
            Some(value) => value.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
                key: SEED_VAR,
                value,
            })?,
            None => defaults::SEED,
        };

        let sample_data = match lookup(SAMPLE_DATA_VAR) {
            Some(value) => parse_flag(&value).ok_or(ConfigError::Invalid {
                key: SAMPLE_DATA_VAR,
                value,
            })?,
            None => defaults::SAMPLE_DATA,
        };

        let log_filter = lookup(LOG_FILTER_VAR).unwrap_or_else(|| defaults::LOG_FILTER.to_string());

        Ok(Self {
            data_dir,
            seed,
            sample_data,
            log_filter,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(defaults::DATA_DIR),
            seed: defaults::SEED,
            sample_data: defaults::SAMPLE_DATA,
            log_filter: defaults::LOG_FILTER.to_string(),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_in(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.seed, 42);
        assert!(config.sample_data);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_reads_overrides() {
        let config = Config::from_lookup(lookup_in(&[
            (DATA_DIR_VAR, "/var/lib/ports"),
            (SEED_VAR, " 7 "),
            (SAMPLE_DATA_VAR, "No"),
            (LOG_FILTER_VAR, "port_management=debug"),
        ]))
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/ports"));
        assert_eq!(config.seed, 7);
        assert!(!config.sample_data);
        assert_eq!(config.log_filter, "port_management=debug");
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(
            Config::from_lookup(lookup_in(&[(SEED_VAR, "-3")])),
            Err(ConfigError::Invalid {
                key: SEED_VAR,
                value: "-3".to_string()
            })
        );
        assert!(matches!(
            Config::from_lookup(lookup_in(&[(SAMPLE_DATA_VAR, "maybe")])),
            Err(ConfigError::Invalid { key: SAMPLE_DATA_VAR, .. })
        ));
    }
}
