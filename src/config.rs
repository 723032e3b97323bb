//! Configuration for both binaries, from environment variables and CLI args
//!
//! Values are read through a lookup function so the parsing can be tested
//! without touching the process environment. `from_env()` plugs in
//! `std::env::var`.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::stratz::RetryPolicy;

#[derive(Debug)]
pub enum ConfigError {
    MissingVariable(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVariable(var) => write!(f, "Missing environment variable: {}", var),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Configuration for the `fetch_hero_stats` run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// GraphQL endpoint
    pub api_url: String,

    /// Bearer token; must come from the environment or the first CLI arg
    pub token: Option<String>,

    /// Concurrent matchup fetches
    pub max_workers: usize,

    /// Cumulative backoff budget per logical request
    pub max_wait: Duration,

    /// Per-request HTTP timeout
    pub request_timeout: Duration,

    /// Matchup rows requested per hero (`take` query variable)
    pub matchup_take: u32,

    /// Directory of per-hero JSON records
    pub hero_data_dir: PathBuf,

    /// Merged roster snapshot
    pub snapshot_path: PathBuf,
}

impl PipelineConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `STRATZ_API_URL` (default: https://api.stratz.com/graphql)
    /// - `STRATZ_TOKEN` (no default)
    /// - `MAX_WORKERS` (default: 5)
    /// - `MAX_WAIT_SECS` (default: 60)
    /// - `REQUEST_TIMEOUT_SECS` (default: 30)
    /// - `MATCHUP_TAKE` (default: 150)
    /// - `HERO_DATA_DIR` (default: data/heroes)
    /// - `STRATZ_SNAPSHOT_PATH` (default: data/dota_heroes_stratz.json)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = lookup("STRATZ_API_URL").unwrap_or_else(|| "https://api.stratz.com/graphql".to_string());
        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "STRATZ_API_URL must start with http:// or https://".to_string(),
            ));
        }

        let config = Self {
            api_url,
            token: lookup("STRATZ_TOKEN").filter(|t| !t.trim().is_empty()),
            max_workers: parse_or(&lookup, "MAX_WORKERS", 5)?,
            max_wait: Duration::from_secs(parse_or(&lookup, "MAX_WAIT_SECS", 60)?),
            request_timeout: Duration::from_secs(parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30)?),
            matchup_take: parse_or(&lookup, "MATCHUP_TAKE", 150)?,
            hero_data_dir: lookup("HERO_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/heroes")),
            snapshot_path: lookup("STRATZ_SNAPSHOT_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/dota_heroes_stratz.json")),
        };
        config.validate()?;
        Ok(config)
    }

    /// Apply positional `[token] [workers]` overrides.
    ///
    /// A worker count that is not a positive integer is ignored with a
    /// warning and the configured value stays.
    pub fn apply_args(&mut self, args: &[String]) {
        if let Some(token) = args.first() {
            self.token = Some(token.clone());
        }
        if let Some(raw) = args.get(1) {
            match raw.parse::<usize>() {
                Ok(workers) if workers > 0 => self.max_workers = workers,
                _ => log::warn!("⚠️  Ignoring worker count '{}', using {}", raw, self.max_workers),
            }
        }
    }

    /// The token, or `MissingVariable` when neither env nor args set it
    pub fn require_token(&self) -> Result<&str, ConfigError> {
        self.token
            .as_deref()
            .ok_or_else(|| ConfigError::MissingVariable("STRATZ_TOKEN".to_string()))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            wait_budget: self.max_wait,
            ..RetryPolicy::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers == 0 {
            return Err(ConfigError::InvalidValue("MAX_WORKERS must be at least 1".to_string()));
        }
        if self.matchup_take == 0 {
            return Err(ConfigError::InvalidValue("MATCHUP_TAKE must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Configuration for the `generate_synergy_rules` batch job
#[derive(Debug, Clone, PartialEq)]
pub struct RulesConfig {
    pub hero_data_dir: PathBuf,
    /// Rules kept per direction in the written table and the listing
    pub top: usize,
    pub min_samples: u32,
    /// Output path for the rule table; listing only when unset
    pub write: Option<PathBuf>,
    /// List every inferred rule instead of the top ones
    pub list_all: bool,
}

impl RulesConfig {
    pub fn from_env(args: &[String]) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok(), args)
    }

    /// Flags: `--top N` (30), `--min N` (10), `--write PATH`, `--list-all`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>, args: &[String]) -> Result<Self, ConfigError> {
        let mut config = Self {
            hero_data_dir: lookup("HERO_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/heroes")),
            top: 30,
            min_samples: 10,
            write: None,
            list_all: false,
        };

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--top" => config.top = parse_flag(arg, iter.next())?,
                "--min" => config.min_samples = parse_flag(arg, iter.next())?,
                "--write" => {
                    let path = iter
                        .next()
                        .ok_or_else(|| ConfigError::InvalidValue("--write needs a path".to_string()))?;
                    config.write = Some(PathBuf::from(path));
                }
                "--list-all" => config.list_all = true,
                other => {
                    return Err(ConfigError::InvalidValue(format!("unknown argument '{}'", other)));
                }
            }
        }

        if config.min_samples == 0 {
            return Err(ConfigError::InvalidValue("--min must be at least 1".to_string()));
        }
        Ok(config)
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("{}='{}' is not a valid number", key, raw))),
        None => Ok(default),
    }
}

fn parse_flag<T: std::str::FromStr>(flag: &str, value: Option<&String>) -> Result<T, ConfigError> {
    let raw = value.ok_or_else(|| ConfigError::InvalidValue(format!("{} needs a value", flag)))?;
    raw.parse()
        .map_err(|_| ConfigError::InvalidValue(format!("{} expects a number, got '{}'", flag, raw)))
}
