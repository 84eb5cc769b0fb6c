use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the socialcache binary.
#[derive(Debug, Parser)]
#[command(
    name = "socialcache",
    version,
    about = "Exercise the socialcache coherence layer"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "SOCIALCACHE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Hammer the configured cache from many threads, then verify its indexes.
    Soak(SoakArgs),
    /// Print the resolved configuration as JSON.
    #[command(name = "print-config")]
    PrintConfig(PrintConfigArgs),
}

#[derive(Debug, Args, Clone)]
pub struct SoakArgs {
    #[command(flatten)]
    pub overrides: CacheOverrides,

    /// Number of concurrent worker threads.
    #[arg(long, default_value_t = 8, value_parser = clap::value_parser!(usize))]
    pub threads: usize,

    /// Operations issued by each worker.
    #[arg(long, default_value_t = 10_000, value_parser = clap::value_parser!(usize))]
    pub rounds: usize,

    /// Number of distinct post ids the workload touches.
    #[arg(long = "post-span", default_value_t = 64, value_parser = clap::value_parser!(i32))]
    pub post_span: i32,
}

impl Default for SoakArgs {
    fn default() -> Self {
        Self {
            overrides: CacheOverrides::default(),
            threads: 8,
            rounds: 10_000,
            post_span: 64,
        }
    }
}

#[derive(Debug, Args, Default, Clone)]
pub struct PrintConfigArgs {
    #[command(flatten)]
    pub overrides: CacheOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CacheOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Turn the in-memory cache on or off.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Toggle per-operation latency timers.
    #[arg(
        long = "cache-metrics",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_metrics: Option<bool>,

    /// Override the `cache` label attached to latency timers.
    #[arg(long = "cache-metrics-label", value_name = "LABEL")]
    pub cache_metrics_label: Option<String>,

    /// What a comment-group replacement does with dropped comments (retain|purge).
    #[arg(long = "cache-replace-policy", value_name = "POLICY")]
    pub cache_replace_policy: Option<String>,
}
