//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::str::FromStr;

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

pub use cli::{CacheOverrides, CliArgs, Command, PrintConfigArgs, SoakArgs};

use crate::cache::{DEFAULT_METRICS_LABEL, GroupReplacePolicy};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "socialcache";
const ENV_PREFIX: &str = "SOCIALCACHE";

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub metrics: bool,
    pub metrics_label: String,
    pub group_replace_policy: GroupReplacePolicy,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Soak(args)) => raw.apply_overrides(&args.overrides),
        Some(Command::PrintConfig(args)) => raw.apply_overrides(&args.overrides),
        None => raw.apply_overrides(&CacheOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the process arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    cache: RawCacheSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    metrics: Option<bool>,
    metrics_label: Option<String>,
    group_replace_policy: Option<String>,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &CacheOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
        if let Some(metrics) = overrides.cache_metrics {
            self.cache.metrics = Some(metrics);
        }
        if let Some(label) = overrides.cache_metrics_label.as_ref() {
            self.cache.metrics_label = Some(label.clone());
        }
        if let Some(policy) = overrides.cache_replace_policy.as_ref() {
            self.cache.group_replace_policy = Some(policy.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        Ok(Self {
            logging: build_logging_settings(raw.logging)?,
            cache: build_cache_settings(raw.cache)?,
        })
    }

    /// Renders the resolved settings for display.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let format = match self.logging.format {
            LogFormat::Json => "json",
            LogFormat::Compact => "compact",
        };
        let value = serde_json::json!({
            "logging": {
                "level": self.logging.level.to_string(),
                "format": format,
            },
            "cache": {
                "enabled": self.cache.enabled,
                "metrics": self.cache.metrics,
                "metrics_label": self.cache.metrics_label,
                "group_replace_policy": self.cache.group_replace_policy,
            },
        });
        serde_json::to_string_pretty(&value)
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let metrics_label = match cache.metrics_label {
        Some(label) => {
            let trimmed = label.trim();
            if trimmed.is_empty() {
                return Err(LoadError::invalid(
                    "cache.metrics_label",
                    "must not be empty",
                ));
            }
            trimmed.to_string()
        }
        None => DEFAULT_METRICS_LABEL.to_string(),
    };

    let group_replace_policy = match cache.group_replace_policy {
        Some(policy) => GroupReplacePolicy::from_str(&policy)
            .map_err(|reason| LoadError::invalid("cache.group_replace_policy", reason))?,
        None => GroupReplacePolicy::default(),
    };

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        metrics: cache.metrics.unwrap_or(true),
        metrics_label,
        group_replace_policy,
    })
}
