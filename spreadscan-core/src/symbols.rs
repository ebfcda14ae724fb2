//! The global symbol table: one record per canonical pair, stored in
//! `generated/symbols.bin`.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{SourceId, TableError, NUM_SOURCES};

/// One globally-identified instrument.
///
/// `symbol_id` is unique within a run but the emitted id range may
/// contain gaps: discovery drops records that no venue could serve
/// without renumbering the survivors.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SymbolRecord {
    pub symbol_id: u16,
    /// Canonical name, `"{BASE}-USDT"`.
    pub name: String,
    /// Exchange-native symbol per source; `None` = not listed there.
    pub source_names: [Option<String>; NUM_SOURCES],
    pub min_qty: [Option<f64>; NUM_SOURCES],
    pub max_qty: [Option<f64>; NUM_SOURCES],
    pub tick_size: [Option<f64>; NUM_SOURCES],
    pub min_notional: [Option<f64>; NUM_SOURCES],
}

impl SymbolRecord {
    #[must_use]
    pub fn new(symbol_id: u16, name: String) -> Self {
        Self {
            symbol_id,
            name,
            source_names: Default::default(),
            min_qty: [None; NUM_SOURCES],
            max_qty: [None; NUM_SOURCES],
            tick_size: [None; NUM_SOURCES],
            min_notional: [None; NUM_SOURCES],
        }
    }

    /// True when at least one source slot is populated.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.source_names.iter().any(Option::is_some)
    }
}

/// Subscription entry handed to feed processes: a symbol id plus the
/// exchange-native name to put on the wire.
#[derive(Clone, Debug, PartialEq)]
pub struct SymbolSub {
    pub symbol_id: u16,
    pub exchange_symbol: String,
}

/// Read-side view of `symbols.bin` used by feeds and the spread engine.
pub struct SymbolTable {
    records: Vec<SymbolRecord>,
    by_id: HashMap<u16, usize>,
    exchange_to_id: [HashMap<String, u16>; NUM_SOURCES],
}

impl SymbolTable {
    /// Load and index `symbols.bin` from a generated directory.
    pub fn load(generated_dir: &Path) -> Result<Self, TableError> {
        let path = generated_dir.join("symbols.bin");
        let bytes = std::fs::read(&path).map_err(|source| TableError::Io {
            path: path.clone(),
            source,
        })?;
        let records: Vec<SymbolRecord> =
            bincode::deserialize(&bytes).map_err(|source| TableError::Decode { path, source })?;
        Ok(Self::from_records(records))
    }

    #[must_use]
    pub fn from_records(records: Vec<SymbolRecord>) -> Self {
        let mut by_id = HashMap::with_capacity(records.len());
        let mut exchange_to_id: [HashMap<String, u16>; NUM_SOURCES] =
            std::array::from_fn(|_| HashMap::new());
        for (pos, record) in records.iter().enumerate() {
            by_id.insert(record.symbol_id, pos);
            for (idx, slot) in record.source_names.iter().enumerate() {
                if let Some(exchange_symbol) = slot {
                    exchange_to_id[idx].insert(exchange_symbol.clone(), record.symbol_id);
                }
            }
        }
        Self {
            records,
            by_id,
            exchange_to_id,
        }
    }

    /// Resolve an exchange-native symbol back to its global id.
    #[must_use]
    pub fn resolve(&self, source: SourceId, exchange_symbol: &str) -> Option<u16> {
        self.exchange_to_id[source.index()]
            .get(exchange_symbol)
            .copied()
    }

    #[must_use]
    pub fn get(&self, symbol_id: u16) -> Option<&SymbolRecord> {
        self.by_id.get(&symbol_id).map(|&pos| &self.records[pos])
    }

    #[must_use]
    pub fn name(&self, symbol_id: u16) -> Option<&str> {
        self.get(symbol_id).map(|record| record.name.as_str())
    }

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

    /// Everything a given source must subscribe to.
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
}
