//! Direction records and the flat `(source, symbol) → directions`
//! index used by the spread engine's hot path.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{TableError, NUM_SOURCES};

/// One cross-venue direction, stored in `generated/directions.bin`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DirectionRecord {
    pub direction_id: u8,
    pub name: String,
    pub spot_source: u8,
    pub futures_source: u8,
    /// Symbol ids tradable on both sides, ascending.
    pub symbols: Vec<u16>,
}

/// Read-side view of `directions.bin`.
pub struct DirectionTable {
    pub records: Vec<DirectionRecord>,
}

impl DirectionTable {
    pub fn load(generated_dir: &Path) -> Result<Self, TableError> {
        let path = generated_dir.join("directions.bin");
        let bytes = std::fs::read(&path).map_err(|source| TableError::Io {
            path: path.clone(),
            source,
        })?;
        let records: Vec<DirectionRecord> =
            bincode::deserialize(&bytes).map_err(|source| TableError::Decode { path, source })?;
        Ok(Self { records })
    }
}

/// A symbol participates in at most this many directions on one source
/// (its venue paired against each foreign venue's other market type).
const MAX_DIRS_PER_SLOT: usize = 6;

/// Direction membership of one `(source, symbol)` slot.
#[derive(Clone, Copy, Debug, Default)]
pub struct SlotDirections {
    pub direction_ids: [u8; MAX_DIRS_PER_SLOT],
    pub counterpart_sources: [u8; MAX_DIRS_PER_SLOT],
    pub count: u8,
}

impl SlotDirections {
    fn push(&mut self, direction_id: u8, counterpart: u8) {
        if (self.count as usize) < MAX_DIRS_PER_SLOT {
            self.direction_ids[self.count as usize] = direction_id;
            self.counterpart_sources[self.count as usize] = counterpart;
            self.count += 1;
        }
    }
}

/// Flat lookup table: `index = source * capacity + symbol_id`.
pub struct SourceSymbolIndex {
    slots: Vec<SlotDirections>,
    capacity: u16,
}

impl SourceSymbolIndex {
    /// Build from a direction table. `capacity` must exceed the highest
    /// symbol id in any direction (use `MAX_SYMBOLS` or the registry size
    /// before pruning).
    #[must_use]
    pub fn build(directions: &DirectionTable, capacity: u16) -> Self {
        let mut slots = vec![SlotDirections::default(); NUM_SOURCES * capacity as usize];
        for dir in &directions.records {
            for &symbol_id in &dir.symbols {
                let spot_idx = dir.spot_source as usize * capacity as usize + symbol_id as usize;
                slots[spot_idx].push(dir.direction_id, dir.futures_source);
                let fut_idx = dir.futures_source as usize * capacity as usize + symbol_id as usize;
                slots[fut_idx].push(dir.direction_id, dir.spot_source);
            }
        }
        Self { slots, capacity }
    }

    /// O(1): all directions touching `(source, symbol_id)`.
    #[must_use]
    pub fn get(&self, source: u8, symbol_id: u16) -> &SlotDirections {
        &self.slots[source as usize * self.capacity as usize + symbol_id as usize]
    }
}
