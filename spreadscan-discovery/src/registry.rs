//! Global symbol registry construction.
//!
//! Ids are a pure function of the sorted canonical-name universe:
//! names are collected into an ordered map, then enumerated from zero
//! in ascending code-point order. Arrival order across sources cannot
//! influence the assignment, which is what makes `symbols.bin`
//! reproducible bit-for-bit from identical inputs.

use std::collections::{BTreeMap, HashMap};

use tracing::warn;

use spreadscan_core::{SourceId, SymbolRecord, SymbolSub, MAX_SYMBOLS, NUM_SOURCES};

use crate::normalize::NormalizedSymbol;

/// The registry handed from C3 to the later stages: records ordered by
/// id plus the per-source reverse maps.
#[derive(Debug, Default)]
pub struct Registry {
    records: Vec<SymbolRecord>,
    exchange_to_id: [HashMap<String, u16>; NUM_SOURCES],
}

/// Accumulates per-source listings under their canonical name before
/// ids exist.
#[derive(Default)]
pub struct RegistryBuilder {
    pending: BTreeMap<String, Pending>,
}

#[derive(Default)]
struct Pending {
    source_names: [Option<String>; NUM_SOURCES],
    min_qty: [Option<f64>; NUM_SOURCES],
    max_qty: [Option<f64>; NUM_SOURCES],
    tick_size: [Option<f64>; NUM_SOURCES],
    min_notional: [Option<f64>; NUM_SOURCES],
}

impl RegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one normalized listing. A duplicate `(source, name)` keeps
    /// the first listing.
    pub fn insert(&mut self, symbol: NormalizedSymbol) {
        let entry = self.pending.entry(symbol.name.clone()).or_default();
        let idx = symbol.source.index();
        if entry.source_names[idx].is_some() {
            warn!(
                source = %symbol.source,
                name = %symbol.name,
                duplicate = %symbol.exchange_symbol,
                "venue listed the same pair twice; keeping the first"
            );
            return;
        }
        entry.source_names[idx] = Some(symbol.exchange_symbol);
        entry.min_qty[idx] = symbol.min_qty;
        entry.max_qty[idx] = symbol.max_qty;
        entry.tick_size[idx] = symbol.tick_size;
        entry.min_notional[idx] = symbol.min_notional;
    }

    pub fn extend(&mut self, symbols: impl IntoIterator<Item = NormalizedSymbol>) {
        for symbol in symbols {
            self.insert(symbol);
        }
    }

    /// Assign ids and freeze. Past `MAX_SYMBOLS` the lexicographically
    /// highest names are dropped.
    #[must_use]
    pub fn build(self) -> Registry {
        let total = self.pending.len();
        if total > MAX_SYMBOLS as usize {
            warn!(
                total,
                max = MAX_SYMBOLS,
                dropped = total - MAX_SYMBOLS as usize,
                "symbol universe exceeds capacity; truncating the high end"
            );
        }

        let mut records = Vec::with_capacity(total.min(MAX_SYMBOLS as usize));
        let mut exchange_to_id: [HashMap<String, u16>; NUM_SOURCES] =
            std::array::from_fn(|_| HashMap::new());

        for (name, pending) in self.pending.into_iter().take(MAX_SYMBOLS as usize) {
            let symbol_id = records.len() as u16;
            let mut record = SymbolRecord::new(symbol_id, name);
            record.source_names = pending.source_names;
            record.min_qty = pending.min_qty;
            record.max_qty = pending.max_qty;
            record.tick_size = pending.tick_size;
            record.min_notional = pending.min_notional;
            for (idx, slot) in record.source_names.iter().enumerate() {
                if let Some(exchange_symbol) = slot {
                    exchange_to_id[idx].insert(exchange_symbol.clone(), symbol_id);
                }
            }
            records.push(record);
        }

        Registry {
            records,
            exchange_to_id,
        }
    }
}

impl Registry {
    #[must_use]
    pub fn records(&self) -> &[SymbolRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn resolve(&self, source: SourceId, exchange_symbol: &str) -> Option<u16> {
        self.exchange_to_id[source.index()]
            .get(exchange_symbol)
            .copied()
    }

    #[must_use]
    pub fn reverse_map(&self, source: SourceId) -> &HashMap<String, u16> {
        &self.exchange_to_id[source.index()]
    }

    /// Record lookup by id. Until pruning runs, ids equal vector
    /// positions; afterwards the id range may have gaps.
    #[must_use]
    pub fn get(&self, symbol_id: u16) -> Option<&SymbolRecord> {
        match self
            .records
            .binary_search_by_key(&symbol_id, |r| r.symbol_id)
        {
            Ok(pos) => Some(&self.records[pos]),
            Err(_) => None,
        }
    }

    /// Everything a source would have to subscribe to.
    #[must_use]
    pub fn subscription_list(&self, source: SourceId) -> Vec<SymbolSub> {
        let idx = source.index();
        self.records
            .iter()
            .filter_map(|record| {
                record.source_names[idx].as_ref().map(|name| SymbolSub {
                    symbol_id: record.symbol_id,
                    exchange_symbol: name.clone(),
                })
            })
            .collect()
    }

    /// Count of populated slots for one source.
    #[must_use]
    pub fn source_count(&self, source: SourceId) -> usize {
        let idx = source.index();
        self.records
            .iter()
            .filter(|r| r.source_names[idx].is_some())
            .count()
    }

    /// Clear one `(source, id)` slot and drop its reverse-map entry.
    /// Attributes for the slot go with it.
    pub fn clear_slot(&mut self, source: SourceId, symbol_id: u16) {
        let idx = source.index();
        let Ok(pos) = self
            .records
            .binary_search_by_key(&symbol_id, |r| r.symbol_id)
        else {
            return;
        };
        let record = &mut self.records[pos];
        if let Some(exchange_symbol) = record.source_names[idx].take() {
            self.exchange_to_id[idx].remove(&exchange_symbol);
        }
        record.min_qty[idx] = None;
        record.max_qty[idx] = None;
        record.tick_size[idx] = None;
        record.min_notional[idx] = None;
    }

    /// Drop records with no populated slot left. Ids of the survivors
    /// are untouched, so the id range may now contain gaps.
    pub fn retain_live(&mut self) -> usize {
        let before = self.records.len();
        self.records.retain(SymbolRecord::is_live);
        before - self.records.len()
    }
}
