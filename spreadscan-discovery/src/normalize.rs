//! Symbol normalization: exchange-native encodings to the canonical
//! `"{BASE}-USDT"` form.
//!
//! Parsing is structural per venue; quote membership is confirmed by
//! equality, never by substring search (`contains("USDT")` would match
//! USDC-quoted and `TUSDT` pairs).

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use spreadscan_core::SourceId;

use crate::rest::RawInstrument;

/// One instrument reduced to its canonical identity.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedSymbol {
    pub source: SourceId,
    /// Canonical name, `"{BASE}-{QUOTE}"` uppercased.
    pub name: String,
    /// Exchange-native symbol, kept verbatim for WS subscribes and
    /// feed lookups.
    pub exchange_symbol: String,
    pub min_qty: Option<f64>,
    pub max_qty: Option<f64>,
    pub tick_size: Option<f64>,
    pub min_notional: Option<f64>,
}

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum NormalizeError {
    #[error("symbol '{0}' is not the concatenation of its declared assets")]
    SymbolMismatch(String),
    #[error("quote '{0}' is outside the quote filter")]
    InvalidQuote(String),
    #[error("degenerate pair '{0}'")]
    DegenerateBase(String),
    #[error("unparseable symbol '{0}'")]
    InvalidFormat(String),
}

impl NormalizeError {
    /// Stable key used for rejection counters and the report.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            NormalizeError::SymbolMismatch(_) => "symbol_mismatch",
            NormalizeError::InvalidQuote(_) => "invalid_quote",
            NormalizeError::DegenerateBase(_) => "degenerate_base",
            NormalizeError::InvalidFormat(_) => "invalid_format",
        }
    }
}

/// Derive `(base, quote)` according to the venue's symbol encoding and
/// build the canonical name.
pub fn normalize(
    raw: &RawInstrument,
    quote_filter: &[String],
) -> Result<NormalizedSymbol, NormalizeError> {
    let symbol = raw.exchange_symbol.as_str();
    let (base, quote) = match raw.source {
        // Concatenated encodings: trust the declared assets, but verify
        // they reassemble into the listed symbol.
        SourceId::BinanceSpot
        | SourceId::BinanceFutures
        | SourceId::BybitSpot
        | SourceId::BybitFutures
        | SourceId::MexcSpot => {
            let base = raw.base_asset.to_uppercase();
            let quote = raw.quote_asset.to_uppercase();
            if symbol.to_uppercase() != format!("{base}{quote}") {
                return Err(NormalizeError::SymbolMismatch(symbol.to_string()));
            }
            (base, quote)
        }
        SourceId::MexcFutures => {
            let mut parts = symbol.split('_');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(base), Some(quote), None) if !base.is_empty() => {
                    (base.to_uppercase(), quote.to_uppercase())
                }
                _ => return Err(NormalizeError::InvalidFormat(symbol.to_string())),
            }
        }
        SourceId::OkxSpot => {
            let parts: Vec<&str> = symbol.split('-').collect();
            match parts.as_slice() {
                [base, quote] if !base.is_empty() => (base.to_uppercase(), quote.to_uppercase()),
                _ => return Err(NormalizeError::InvalidFormat(symbol.to_string())),
            }
        }
        SourceId::OkxFutures => {
            let parts: Vec<&str> = symbol.split('-').collect();
            match parts.as_slice() {
                [base, quote, "SWAP"] if !base.is_empty() => {
                    (base.to_uppercase(), quote.to_uppercase())
                }
                _ => return Err(NormalizeError::InvalidFormat(symbol.to_string())),
            }
        }
    };

    if base.is_empty() {
        return Err(NormalizeError::InvalidFormat(symbol.to_string()));
    }
    if !quote_filter.iter().any(|q| q.eq_ignore_ascii_case(&quote)) {
        return Err(NormalizeError::InvalidQuote(quote));
    }
    if base == quote {
        return Err(NormalizeError::DegenerateBase(symbol.to_string()));
    }

    Ok(NormalizedSymbol {
        source: raw.source,
        name: format!("{base}-{quote}"),
        exchange_symbol: raw.exchange_symbol.clone(),
        min_qty: raw.min_qty,
        max_qty: raw.max_qty,
        tick_size: raw.tick_size,
        min_notional: raw.min_notional,
    })
}

/// Rejection tally for one source, keyed by reason label.
#[derive(Clone, Debug, Default)]
pub struct RejectionCounts(pub BTreeMap<&'static str, usize>);

impl RejectionCounts {
    pub fn record(&mut self, err: &NormalizeError) {
        *self.0.entry(err.label()).or_insert(0) += 1;
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.0.values().sum()
    }
}

/// Normalize everything a source listed; rejections are counted, not
/// fatal.
pub fn normalize_source(
    source: SourceId,
    raws: &[RawInstrument],
    quote_filter: &[String],
) -> (Vec<NormalizedSymbol>, RejectionCounts) {
    let mut out = Vec::with_capacity(raws.len());
    let mut rejections = RejectionCounts::default();
    for raw in raws {
        match normalize(raw, quote_filter) {
            Ok(normalized) => out.push(normalized),
            Err(err) => {
                debug!(source = %source, symbol = %raw.exchange_symbol, error = %err, "rejected instrument");
                rejections.record(&err);
            }
        }
    }
    (out, rejections)
}
