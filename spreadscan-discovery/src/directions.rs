//! Direction intersection: which symbols are tradable on both sides of
//! each configured `(spot, futures)` pair. No network traffic here;
//! presence means "listed on both sources" until validation prunes.

use spreadscan_config::DirectionEntry;
use spreadscan_core::DirectionRecord;

use crate::registry::Registry;

/// Build one record per configured direction. Symbol ids come out
/// ascending because the registry is enumerated in id order.
#[must_use]
pub fn build(registry: &Registry, configs: &[DirectionEntry]) -> Vec<DirectionRecord> {
    configs
        .iter()
        .map(|entry| DirectionRecord {
            direction_id: entry.id,
            name: entry.name.clone(),
            spot_source: entry.spot_source,
            futures_source: entry.futures_source,
            symbols: intersect(registry, entry.spot_source, entry.futures_source),
        })
        .collect()
}

/// Recompute every direction's membership against the (pruned)
/// registry, dropping ids whose slots validation cleared.
pub fn rebuild(registry: &Registry, directions: &mut [DirectionRecord]) {
    for direction in directions {
        direction.symbols = intersect(registry, direction.spot_source, direction.futures_source);
    }
}

fn intersect(registry: &Registry, spot_source: u8, futures_source: u8) -> Vec<u16> {
    let spot = spot_source as usize;
    let futures = futures_source as usize;
    registry
        .records()
        .iter()
        .filter(|record| {
            record.source_names[spot].is_some() && record.source_names[futures].is_some()
        })
        .map(|record| record.symbol_id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::NormalizedSymbol;
    use crate::registry::RegistryBuilder;
    use spreadscan_core::SourceId;

    fn listing(source: SourceId, name: &str, native: &str) -> NormalizedSymbol {
        NormalizedSymbol {
            source,
            name: name.to_string(),
            exchange_symbol: native.to_string(),
            min_qty: None,
            max_qty: None,
            tick_size: None,
            min_notional: None,
        }
    }

    fn entry(id: u8, spot: SourceId, futures: SourceId) -> DirectionEntry {
        DirectionEntry {
            id,
            name: format!("{}_{}", spot.name(), futures.name()),
            spot_source: spot.index() as u8,
            futures_source: futures.index() as u8,
        }
    }

    #[test]
    fn intersection_requires_both_sides() {
        let mut builder = RegistryBuilder::new();
        builder.insert(listing(SourceId::OkxSpot, "BTC-USDT", "BTC-USDT"));
        builder.insert(listing(SourceId::BybitFutures, "BTC-USDT", "BTCUSDT"));
        builder.insert(listing(SourceId::OkxSpot, "ETH-USDT", "ETH-USDT"));
        let registry = builder.build();

        let directions = build(
            &registry,
            &[
                entry(0, SourceId::OkxSpot, SourceId::BybitFutures),
                entry(1, SourceId::BinanceSpot, SourceId::BybitFutures),
            ],
        );

        // BTC-USDT is id 0 (lexicographically first), present both sides.
        assert_eq!(directions[0].symbols, vec![0]);
        // Binance spot listed nothing.
        assert!(directions[1].symbols.is_empty());
    }

    #[test]
    fn rebuild_drops_cleared_slots() {
        let mut builder = RegistryBuilder::new();
        builder.insert(listing(SourceId::OkxSpot, "BTC-USDT", "BTC-USDT"));
        builder.insert(listing(SourceId::BybitFutures, "BTC-USDT", "BTCUSDT"));
        builder.insert(listing(SourceId::OkxSpot, "ETH-USDT", "ETH-USDT"));
        builder.insert(listing(SourceId::BybitFutures, "ETH-USDT", "ETHUSDT"));
        let mut registry = builder.build();

        let mut directions = build(
            &registry,
            &[entry(0, SourceId::OkxSpot, SourceId::BybitFutures)],
        );
        assert_eq!(directions[0].symbols, vec![0, 1]);

        registry.clear_slot(SourceId::BybitFutures, 1);
        rebuild(&registry, &mut directions);
        assert_eq!(directions[0].symbols, vec![0]);
    }
}
