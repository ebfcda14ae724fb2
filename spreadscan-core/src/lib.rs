//! Fundamental data types shared across the spread scanner.
//!
//! Everything downstream of pair discovery (the per-venue feeds, the
//! spread engine, the tracker) keys its fixed-size layouts on the
//! identifiers defined here: a [`SourceId`] in `[0, 8)` and a `u16`
//! symbol id assigned by discovery. This crate also owns the load path
//! for the generated artifacts (`symbols.bin`, `directions.bin`) so
//! every consumer decodes them the same way.

pub mod directions;
pub mod source;
pub mod symbols;

pub use directions::{DirectionRecord, DirectionTable, SourceSymbolIndex};
pub use source::SourceId;
pub use symbols::{SymbolRecord, SymbolSub, SymbolTable};

use std::path::PathBuf;

use thiserror::Error;

/// Number of `(venue, market)` sources. Fixed at compile time.
pub const NUM_SOURCES: usize = 8;

/// Hard cap on the global symbol registry. The shared-memory layouts
/// downstream are sized against this; discovery truncates past it.
pub const MAX_SYMBOLS: u16 = 1024;

/// Number of configured cross-venue directions.
pub const MAX_DIRECTIONS: usize = 12;

/// Errors raised while loading generated artifacts from disk.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },
}
