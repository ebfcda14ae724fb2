//! Artifact emission. The three machine-readable files are published
//! atomically (write to `.tmp`, fsync, rename) so concurrent readers
//! see either the previous run or this one, never a torn file. The
//! human-readable mirrors are best-effort.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use serde_json::json;
use tracing::{info, warn};

use spreadscan_core::{DirectionRecord, SourceId};

use crate::registry::Registry;
use crate::validate::ValidationResult;
use crate::SourceIntake;

/// Write bytes so that the final path flips atomically.
///
/// The temp file lives in the destination directory: `rename` is only
/// atomic within one filesystem. The trailing directory fsync makes the
/// rename itself durable; readers are safe without it, so its failure
/// is not fatal.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp = dir.join(format!("{file_name}.tmp"));

    let mut file = File::create(&tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);
    fs::rename(&tmp, path)?;

    if let Ok(dir_handle) = File::open(dir) {
        let _ = dir_handle.sync_all();
    }
    Ok(())
}

/// Serialize and publish every artifact into `output_dir`.
pub fn emit_all(
    output_dir: &Path,
    registry: &Registry,
    directions: &[DirectionRecord],
    intake: &[SourceIntake],
    results: &[ValidationResult],
    config_version: u64,
) -> io::Result<()> {
    fs::create_dir_all(output_dir)?;

    let symbols_bin = bincode::serialize(registry.records())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    atomic_write(&output_dir.join("symbols.bin"), &symbols_bin)?;
    info!(
        bytes = symbols_bin.len(),
        symbols = registry.len(),
        "published symbols.bin"
    );

    let directions_bin = bincode::serialize(directions)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    atomic_write(&output_dir.join("directions.bin"), &directions_bin)?;
    info!(
        bytes = directions_bin.len(),
        directions = directions.len(),
        "published directions.bin"
    );

    let metadata = build_metadata(registry, directions, results, config_version);
    let metadata_json = serde_json::to_vec_pretty(&metadata)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    atomic_write(&output_dir.join("metadata.json"), &metadata_json)?;

    for (name, content) in [
        ("symbols.txt", render_symbols(registry)),
        ("directions.txt", render_directions(directions)),
        ("validation_report.txt", render_report(intake, results)),
    ] {
        if let Err(err) = fs::write(output_dir.join(name), content) {
            warn!(file = name, error = %err, "failed to write report file");
        }
    }

    info!(dir = %output_dir.display(), "generated artifacts published");
    Ok(())
}

fn build_metadata(
    registry: &Registry,
    directions: &[DirectionRecord],
    results: &[ValidationResult],
    config_version: u64,
) -> serde_json::Value {
    let mut per_source = serde_json::Map::new();
    for source in SourceId::ALL {
        per_source.insert(
            source.name().to_string(),
            json!(registry.source_count(source)),
        );
    }

    let mut per_direction = serde_json::Map::new();
    for direction in directions {
        per_direction.insert(direction.name.clone(), json!(direction.symbols.len()));
    }

    let mut validation_sources = serde_json::Map::new();
    let mut total_checked = 0usize;
    let mut total_valid = 0usize;
    for result in results {
        total_checked += result.total;
        total_valid += result.valid.len();
        validation_sources.insert(
            result.source.name().to_string(),
            json!({
                "total": result.total,
                "valid": result.valid.len(),
                "invalid": result.invalid.len(),
                "reasons": result.reason_counts(),
                "elapsed_secs": result.elapsed.as_secs_f64(),
                "completed": result.completed,
            }),
        );
    }

    json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "config_version": config_version,
        "num_symbols": registry.len(),
        "per_source_counts": per_source,
        "per_direction_counts": per_direction,
        "validation_stats": {
            "total_checked": total_checked,
            "total_valid": total_valid,
            "total_invalid": total_checked - total_valid,
            "per_source": validation_sources,
        },
    })
}

fn render_symbols(registry: &Registry) -> String {
    let mut out = String::new();
    for record in registry.records() {
        let slots: Vec<&str> = record
            .source_names
            .iter()
            .map(|slot| slot.as_deref().unwrap_or("-"))
            .collect();
        out.push_str(&format!(
            "{}\t{}\t{}\n",
            record.symbol_id,
            record.name,
            slots.join("\t")
        ));
    }
    out
}

fn render_directions(directions: &[DirectionRecord]) -> String {
    let mut out = String::new();
    for direction in directions {
        let spot = SourceId::from_u8(direction.spot_source)
            .map(SourceId::name)
            .unwrap_or("?");
        let futures = SourceId::from_u8(direction.futures_source)
            .map(SourceId::name)
            .unwrap_or("?");
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\t{} pairs\n",
            direction.direction_id,
            direction.name,
            spot,
            futures,
            direction.symbols.len()
        ));
    }
    out
}

const REPORT_DETAIL_LIMIT: usize = 20;

fn render_report(intake: &[SourceIntake], results: &[ValidationResult]) -> String {
    let mut out = String::new();

    out.push_str("== inventory ==\n");
    for entry in intake {
        match (entry.fetched, &entry.fetch_error) {
            (Some(fetched), _) => {
                out.push_str(&format!(
                    "{}\t{} fetched\t{} accepted",
                    entry.source.name(),
                    fetched,
                    entry.accepted
                ));
                if entry.rejections.total() > 0 {
                    let detail: Vec<String> = entry
                        .rejections
                        .0
                        .iter()
                        .map(|(label, count)| format!("{label}={count}"))
                        .collect();
                    out.push_str(&format!("\trejected: {}", detail.join(", ")));
                }
                out.push('\n');
            }
            (None, err) => {
                out.push_str(&format!(
                    "{}\tFAILED\t{}\n",
                    entry.source.name(),
                    err.as_deref().unwrap_or("unknown error")
                ));
            }
        }
    }

    out.push_str("\n== validation ==\n");
    for result in results {
        let pct = if result.total > 0 {
            result.valid.len() as f64 / result.total as f64 * 100.0
        } else {
            100.0
        };
        out.push_str(&format!(
            "{}\t{} total\t{} valid ({:.1}%)\t{:.1}s{}\n",
            result.source.name(),
            result.total,
            result.valid.len(),
            pct,
            result.elapsed.as_secs_f64(),
            if result.completed { "" } else { "\t[incomplete]" },
        ));
        for entry in result.invalid.iter().take(REPORT_DETAIL_LIMIT) {
            out.push_str(&format!(
                "\t{}\t{}\t{}\n",
                entry.symbol_id, entry.exchange_symbol, entry.reason
            ));
        }
        if result.invalid.len() > REPORT_DETAIL_LIMIT {
            out.push_str(&format!(
                "\t... and {} more\n",
                result.invalid.len() - REPORT_DETAIL_LIMIT
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::NormalizedSymbol;
    use crate::registry::RegistryBuilder;
    use std::collections::HashSet;
    use std::time::Duration;

    fn sample_registry() -> Registry {
        let mut builder = RegistryBuilder::new();
        for (source, name, native) in [
            (SourceId::BinanceSpot, "BTC-USDT", "BTCUSDT"),
            (SourceId::OkxFutures, "BTC-USDT", "BTC-USDT-SWAP"),
            (SourceId::BinanceSpot, "ETH-USDT", "ETHUSDT"),
        ] {
            builder.insert(NormalizedSymbol {
                source,
                name: name.to_string(),
                exchange_symbol: native.to_string(),
                min_qty: None,
                max_qty: None,
                tick_size: None,
                min_notional: None,
            });
        }
        builder.build()
    }

    fn sample_intake() -> Vec<SourceIntake> {
        vec![
            SourceIntake {
                source: SourceId::BinanceSpot,
                fetched: Some(3),
                fetch_error: None,
                accepted: 2,
                rejections: Default::default(),
            },
            SourceIntake {
                source: SourceId::MexcFutures,
                fetched: None,
                fetch_error: Some("HTTP 403: denied".to_string()),
                accepted: 0,
                rejections: Default::default(),
            },
        ]
    }

    fn sample_results() -> Vec<ValidationResult> {
        vec![ValidationResult {
            source: SourceId::BinanceSpot,
            total: 2,
            valid: HashSet::from([0]),
            invalid: vec![crate::validate::InvalidEntry {
                symbol_id: 1,
                exchange_symbol: "ETHUSDT".to_string(),
                reason: crate::validate::InvalidReason::NoMessage,
            }],
            elapsed: Duration::from_secs(3),
            completed: true,
        }]
    }

    #[test]
    fn atomic_write_replaces_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("symbols.bin");
        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        // No temp residue under the final name's namespace.
        assert!(!dir.path().join("symbols.bin.tmp").exists());
    }

    #[test]
    fn interrupted_write_leaves_previous_content_visible() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("symbols.bin");
        atomic_write(&path, b"published").unwrap();

        // A writer that died before its rename leaves only the .tmp.
        std::fs::write(dir.path().join("symbols.bin.tmp"), b"torn").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"published");

        // The next run plows over the stale temp file.
        atomic_write(&path, b"fresh").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"fresh");
        assert!(!dir.path().join("symbols.bin.tmp").exists());
    }

    #[test]
    fn emitted_symbols_bin_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let registry = sample_registry();
        let directions = vec![DirectionRecord {
            direction_id: 0,
            name: "binance_spot_okx_futures".to_string(),
            spot_source: 0,
            futures_source: 7,
            symbols: vec![0],
        }];
        emit_all(
            dir.path(),
            &registry,
            &directions,
            &sample_intake(),
            &sample_results(),
            7,
        )
        .unwrap();

        let table = spreadscan_core::SymbolTable::load(dir.path()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.resolve(SourceId::BinanceSpot, "BTCUSDT"), Some(0));

        let loaded = spreadscan_core::DirectionTable::load(dir.path()).unwrap();
        assert_eq!(loaded.records, directions);

        let metadata: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.path().join("metadata.json")).unwrap())
                .unwrap();
        assert_eq!(metadata["config_version"], 7);
        assert_eq!(metadata["num_symbols"], 2);
        assert_eq!(metadata["per_source_counts"]["binance_spot"], 2);
        assert_eq!(
            metadata["validation_stats"]["per_source"]["binance_spot"]["reasons"]["no_message"],
            1
        );
    }

    #[test]
    fn report_caps_detail_lines() {
        let invalid: Vec<_> = (0..30)
            .map(|i| crate::validate::InvalidEntry {
                symbol_id: i,
                exchange_symbol: format!("SYM{i}USDT"),
                reason: crate::validate::InvalidReason::NoMessage,
            })
            .collect();
        let results = vec![ValidationResult {
            source: SourceId::MexcSpot,
            total: 30,
            valid: HashSet::new(),
            invalid,
            elapsed: Duration::from_secs(1),
            completed: true,
        }];
        let report = render_report(&sample_intake(), &results);
        assert!(report.contains("... and 10 more"));
        assert!(report.contains("mexc_futures\tFAILED\tHTTP 403: denied"));
    }
}
