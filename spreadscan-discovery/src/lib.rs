//! Pair discovery: the pipeline that turns eight venue inventories
//! into the canonical symbol registry, direction tables, and liveness
//! certification the rest of the scanner runs on.
//!
//! Stages: REST inventory → normalization → registry build → direction
//! intersection → live WS validation → atomic emission. Each run is
//! self-contained; the only state that survives is the emitted files.

pub mod directions;
pub mod emit;
pub mod normalize;
pub mod registry;
pub mod rest;
pub mod validate;
pub mod ws;

use std::path::Path;

use thiserror::Error;
use tracing::{info, warn};

use spreadscan_config::{AppConfig, DirectionsConfig, ExchangesConfig};
use spreadscan_core::{DirectionRecord, SourceId, NUM_SOURCES};

use crate::normalize::RejectionCounts;
use crate::registry::RegistryBuilder;

/// Terminal pipeline failures. Everything else degrades per source,
/// per batch, or per symbol.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("only {available} of {required} inventory sources responded")]
    InsufficientSources { available: usize, required: usize },
    #[error("only {available} of {required} sources produced validation output")]
    ValidationFailed { available: usize, required: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Per-source intake accounting, surfaced in the validation report.
#[derive(Debug)]
pub struct SourceIntake {
    pub source: SourceId,
    /// Instruments fetched; `None` when the endpoint failed outright.
    pub fetched: Option<usize>,
    pub fetch_error: Option<String>,
    /// Instruments surviving normalization.
    pub accepted: usize,
    pub rejections: RejectionCounts,
}

/// What a successful run produced.
#[derive(Debug)]
pub struct DiscoverySummary {
    pub num_symbols: usize,
    pub pruned_symbols: usize,
    /// `(direction name, symbols)` after validation.
    pub direction_counts: Vec<(String, usize)>,
}

impl DiscoverySummary {
    #[must_use]
    pub fn total_pair_directions(&self) -> usize {
        self.direction_counts.iter().map(|(_, n)| n).sum()
    }
}

/// Execute the full pipeline and publish into `output_dir`.
///
/// `config_version` stamps `metadata.json`; pass `None` to fall back to
/// the wall-clock timestamp.
pub async fn run(
    client: &reqwest::Client,
    config: &AppConfig,
    exchanges: &ExchangesConfig,
    directions_config: &DirectionsConfig,
    output_dir: &Path,
    config_version: Option<u64>,
) -> Result<DiscoverySummary, DiscoveryError> {
    // C1: inventory, eight endpoints in parallel.
    info!("fetching instrument inventories");
    let fetched = rest::fetch_all(client, exchanges, &config.quote_filter, &config.fetch).await;
    let successes = fetched.iter().filter(|r| r.is_ok()).count();
    if successes < config.min_sources {
        return Err(DiscoveryError::InsufficientSources {
            available: successes,
            required: config.min_sources,
        });
    }

    // C2 + C3: normalize and build the registry. Failed endpoints
    // contribute empty lists and fall out of directions naturally.
    let mut builder = RegistryBuilder::new();
    let mut intake = Vec::with_capacity(NUM_SOURCES);
    for (idx, result) in fetched.into_iter().enumerate() {
        let source = SourceId::ALL[idx];
        match result {
            Ok(raws) => {
                let (normalized, rejections) =
                    normalize::normalize_source(source, &raws, &config.quote_filter);
                if rejections.total() > 0 {
                    info!(
                        source = %source,
                        rejected = rejections.total(),
                        "normalization rejected instruments"
                    );
                }
                intake.push(SourceIntake {
                    source,
                    fetched: Some(raws.len()),
                    fetch_error: None,
                    accepted: normalized.len(),
                    rejections,
                });
                builder.extend(normalized);
            }
            Err(err) => {
                warn!(source = %source, error = %err, "inventory endpoint failed");
                intake.push(SourceIntake {
                    source,
                    fetched: None,
                    fetch_error: Some(err.to_string()),
                    accepted: 0,
                    rejections: RejectionCounts::default(),
                });
            }
        }
    }
    let mut registry = builder.build();
    info!(symbols = registry.len(), "global registry built");

    // C4: direction intersections.
    let mut direction_records: Vec<DirectionRecord> =
        directions::build(&registry, &directions_config.direction);
    for direction in &direction_records {
        info!(
            direction = %direction.name,
            id = direction.direction_id,
            pairs = direction.symbols.len(),
            "direction built"
        );
    }

    // C5: live validation across all sources.
    info!("starting live validation");
    let results = validate::validate_all(&registry, exchanges, &config.validation).await;
    let usable = results.iter().filter(|r| r.completed).count();
    if usable < config.min_sources {
        return Err(DiscoveryError::ValidationFailed {
            available: usable,
            required: config.min_sources,
        });
    }
    let pruned = validate::apply(&mut registry, &mut direction_records, &results);

    // C6: atomic publication.
    let version = config_version.unwrap_or_else(|| chrono::Utc::now().timestamp() as u64);
    emit::emit_all(
        output_dir,
        &registry,
        &direction_records,
        &intake,
        &results,
        version,
    )?;

    let summary = DiscoverySummary {
        num_symbols: registry.len(),
        pruned_symbols: pruned,
        direction_counts: direction_records
            .iter()
            .map(|d| (d.name.clone(), d.symbols.len()))
            .collect(),
    };
    info!(
        symbols = summary.num_symbols,
        pruned = summary.pruned_symbols,
        pair_directions = summary.total_pair_directions(),
        "discovery complete"
    );
    Ok(summary)
}
