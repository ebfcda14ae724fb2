//! Layered configuration loading utilities.
//!
//! Three files drive a discovery run: the general `config.toml`
//! (merged with `SPREADSCAN_`-prefixed environment variables), plus the
//! `exchanges.toml` and `directions.toml` tables that live next to it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use spreadscan_core::{SourceId, MAX_DIRECTIONS};

/// Root application configuration deserialized from layered sources.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_generated_dir")]
    pub generated_dir: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_quote_filter")]
    pub quote_filter: Vec<String>,
    /// Minimum sources that must succeed for a run to be usable.
    #[serde(default = "default_min_sources")]
    pub min_sources: usize,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
}

/// REST inventory fetch tuning.
#[derive(Clone, Debug, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_fetch_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_fetch_backoff_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_fetch_timeout_secs")]
    pub attempt_timeout_secs: u64,
}

/// Live WebSocket validation tuning. Defaults encode the documented
/// per-batch time budget.
#[derive(Clone, Debug, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_batch_timeout_secs")]
    pub batch_timeout_secs: u64,
    #[serde(default = "default_collect_secs")]
    pub collect_secs: u64,
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_read_slice_ms")]
    pub read_slice_ms: u64,
    #[serde(default = "default_batch_pause_ms")]
    pub batch_pause_ms: u64,
    #[serde(default = "default_max_reconnects")]
    pub max_reconnects: u32,
    #[serde(default = "default_reconnect_base_ms")]
    pub reconnect_base_ms: u64,
    #[serde(default = "default_reconnect_cap_ms")]
    pub reconnect_cap_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_fetch_attempts(),
            backoff_base_ms: default_fetch_backoff_ms(),
            attempt_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            batch_timeout_secs: default_batch_timeout_secs(),
            collect_secs: default_collect_secs(),
            idle_timeout_secs: default_idle_timeout_secs(),
            read_slice_ms: default_read_slice_ms(),
            batch_pause_ms: default_batch_pause_ms(),
            max_reconnects: default_max_reconnects(),
            reconnect_base_ms: default_reconnect_base_ms(),
            reconnect_cap_ms: default_reconnect_cap_ms(),
        }
    }
}

fn default_generated_dir() -> PathBuf {
    PathBuf::from("generated")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_quote_filter() -> Vec<String> {
    vec!["USDT".to_string()]
}

fn default_min_sources() -> usize {
    6
}

fn default_fetch_attempts() -> u32 {
    3
}

fn default_fetch_backoff_ms() -> u64 {
    100
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_batch_timeout_secs() -> u64 {
    90
}

fn default_collect_secs() -> u64 {
    30
}

fn default_idle_timeout_secs() -> u64 {
    10
}

fn default_read_slice_ms() -> u64 {
    1_000
}

fn default_batch_pause_ms() -> u64 {
    500
}

fn default_max_reconnects() -> u32 {
    5
}

fn default_reconnect_base_ms() -> u64 {
    100
}

fn default_reconnect_cap_ms() -> u64 {
    30_000
}

/// Loads the general configuration file merged with environment
/// variables prefixed `SPREADSCAN_` (`__` separates nesting levels).
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let builder = Config::builder()
        .add_source(File::from(path.to_path_buf()).required(true))
        .add_source(
            Environment::with_prefix("SPREADSCAN")
                .separator("__")
                .ignore_empty(true),
        );
    let config = builder
        .build()
        .with_context(|| format!("failed to read config {}", path.display()))?;
    config
        .try_deserialize()
        .with_context(|| format!("failed to parse config {}", path.display()))
}

// === Exchange table ===

#[derive(Debug, Deserialize)]
pub struct ExchangesConfig {
    pub exchange: Vec<ExchangeEntry>,
}

/// Per-venue endpoints. Two sources (spot + futures) hang off each entry.
#[derive(Clone, Debug, Deserialize)]
pub struct ExchangeEntry {
    pub name: String,
    pub rest_spot: String,
    pub rest_futures: String,
    pub ws_spot: String,
    pub ws_futures: String,
    /// Overrides the venue's built-in subscription batch size.
    #[serde(default)]
    pub ws_batch_size: Option<usize>,
}

impl ExchangesConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: ExchangesConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// The venue entry serving a source, if configured.
    #[must_use]
    pub fn entry(&self, source: SourceId) -> Option<&ExchangeEntry> {
        self.exchange.iter().find(|e| e.name == source.venue())
    }
}

impl ExchangeEntry {
    #[must_use]
    pub fn rest_base(&self, source: SourceId) -> &str {
        if source.is_spot() {
            &self.rest_spot
        } else {
            &self.rest_futures
        }
    }

    #[must_use]
    pub fn ws_url(&self, source: SourceId) -> &str {
        if source.is_spot() {
            &self.ws_spot
        } else {
            &self.ws_futures
        }
    }
}

// === Direction table ===

#[derive(Debug, Deserialize)]
pub struct DirectionsConfig {
    pub direction: Vec<DirectionEntry>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DirectionEntry {
    pub id: u8,
    pub name: String,
    pub spot_source: u8,
    pub futures_source: u8,
}

impl DirectionsConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: DirectionsConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects tables the downstream layouts cannot represent: too many
    /// directions, duplicate ids, or sides of the wrong market type.
    pub fn validate(&self) -> Result<()> {
        if self.direction.len() > MAX_DIRECTIONS {
            bail!(
                "{} directions configured, at most {} supported",
                self.direction.len(),
                MAX_DIRECTIONS
            );
        }
        let mut seen = HashSet::new();
        for entry in &self.direction {
            if !seen.insert(entry.id) {
                bail!("duplicate direction id {}", entry.id);
            }
            let spot = SourceId::from_u8(entry.spot_source)
                .with_context(|| format!("direction {}: bad spot source", entry.name))?;
            let futures = SourceId::from_u8(entry.futures_source)
                .with_context(|| format!("direction {}: bad futures source", entry.name))?;
            if !spot.is_spot() {
                bail!("direction {}: {} is not a spot source", entry.name, spot);
            }
            if !futures.is_futures() {
                bail!(
                    "direction {}: {} is not a futures source",
                    entry.name,
                    futures
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_config_defaults_fill_in() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "generated_dir = \"/tmp/generated\"\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.generated_dir, PathBuf::from("/tmp/generated"));
        assert_eq!(config.quote_filter, vec!["USDT"]);
        assert_eq!(config.min_sources, 6);
        assert_eq!(config.fetch.max_attempts, 3);
        assert_eq!(config.validation.batch_timeout_secs, 90);
        assert_eq!(config.validation.read_slice_ms, 1_000);
    }

    #[test]
    fn exchange_entry_maps_market_types() {
        let toml_str = r#"
[[exchange]]
name = "okx"
rest_spot = "https://www.okx.com"
rest_futures = "https://www.okx.com"
ws_spot = "wss://ws.okx.com:8443/ws/v5/public"
ws_futures = "wss://ws.okx.com:8443/ws/v5/public"
ws_batch_size = 60
"#;
        let config: ExchangesConfig = toml::from_str(toml_str).unwrap();
        let entry = config.entry(SourceId::OkxFutures).unwrap();
        assert_eq!(entry.ws_batch_size, Some(60));
        assert_eq!(
            entry.ws_url(SourceId::OkxFutures),
            "wss://ws.okx.com:8443/ws/v5/public"
        );
        assert!(config.entry(SourceId::BinanceSpot).is_none());
    }

    #[test]
    fn directions_validation_rejects_wrong_side() {
        let config = DirectionsConfig {
            direction: vec![DirectionEntry {
                id: 0,
                name: "bad".to_string(),
                spot_source: 1, // binance_futures on the spot side
                futures_source: 3,
            }],
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn directions_validation_rejects_duplicate_ids() {
        let entry = DirectionEntry {
            id: 7,
            name: "okx_spot_bybit_futures".to_string(),
            spot_source: 6,
            futures_source: 3,
        };
        let config = DirectionsConfig {
            direction: vec![entry.clone(), entry],
        };
        assert!(config.validate().is_err());
    }
}
