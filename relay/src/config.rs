use notifier::config::{Config as NotifierConfig, ConfigError as NotifierConfigError, ValidationError};
use serde::Deserialize;
use std::fs::File;

#[derive(Deserialize, Debug, PartialEq)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
}

#[derive(Deserialize, Debug, PartialEq)]
pub struct LoggingConfig {
    pub sentry_dsn: String,
}

#[derive(Deserialize, Debug, Default, PartialEq)]
pub struct CommonConfig {
    pub metrics: Option<MetricsConfig>,
    pub logging: Option<LoggingConfig>,
}

impl CommonConfig {
    /// Reads the optional statsd and Sentry settings from environment variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let metrics = match var("STATSD_HOST") {
            Some(statsd_host) => {
                let statsd_port = match var("STATSD_PORT") {
                    Some(raw) => raw
                        .trim()
                        .parse()
                        .map_err(|_| ConfigError::InvalidPort(raw))?,
                    None => DEFAULT_STATSD_PORT,
                };
                Some(MetricsConfig {
                    statsd_host,
                    statsd_port,
                })
            }
            None => None,
        };

        let logging = var("SENTRY_DSN").map(|sentry_dsn| LoggingConfig { sentry_dsn });

        Ok(CommonConfig { metrics, logging })
    }
}

const DEFAULT_STATSD_PORT: u16 = 8125;

#[derive(Deserialize, Debug)]
pub struct Config {
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(flatten)]
    pub notifier: NotifierConfig,
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let data: Config = serde_yaml::from_reader(file)?;
        data.notifier.validate()?;

        Ok(data)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Config {
            common: CommonConfig::from_lookup(&lookup)?,
            notifier: NotifierConfig::from_lookup(&lookup)?,
        })
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Env(#[from] NotifierConfigError),
    #[error("invalid STATSD_PORT: {0:?}")]
    InvalidPort(String),
}
