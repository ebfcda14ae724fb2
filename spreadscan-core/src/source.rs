//! Source identifiers: one per `(venue, market-type)` endpoint.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one of the eight market-data sources.
///
/// The discriminant doubles as the array index in every per-source
/// structure (symbol slots, attribute arrays, reverse maps), so the
/// numbering is part of the on-disk contract and must never change.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum SourceId {
    BinanceSpot = 0,
    BinanceFutures = 1,
    BybitSpot = 2,
    BybitFutures = 3,
    MexcSpot = 4,
    MexcFutures = 5,
    OkxSpot = 6,
    OkxFutures = 7,
}

impl SourceId {
    /// All sources in discriminant order.
    pub const ALL: [SourceId; crate::NUM_SOURCES] = [
        SourceId::BinanceSpot,
        SourceId::BinanceFutures,
        SourceId::BybitSpot,
        SourceId::BybitFutures,
        SourceId::MexcSpot,
        SourceId::MexcFutures,
        SourceId::OkxSpot,
        SourceId::OkxFutures,
    ];

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    /// Wire name used in config files, metadata, and reports.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            SourceId::BinanceSpot => "binance_spot",
            SourceId::BinanceFutures => "binance_futures",
            SourceId::BybitSpot => "bybit_spot",
            SourceId::BybitFutures => "bybit_futures",
            SourceId::MexcSpot => "mexc_spot",
            SourceId::MexcFutures => "mexc_futures",
            SourceId::OkxSpot => "okx_spot",
            SourceId::OkxFutures => "okx_futures",
        }
    }

    /// The venue half of the identifier, matching `exchanges.toml` entries.
    #[must_use]
    pub fn venue(self) -> &'static str {
        match self {
            SourceId::BinanceSpot | SourceId::BinanceFutures => "binance",
            SourceId::BybitSpot | SourceId::BybitFutures => "bybit",
            SourceId::MexcSpot | SourceId::MexcFutures => "mexc",
            SourceId::OkxSpot | SourceId::OkxFutures => "okx",
        }
    }

    #[must_use]
    pub fn is_spot(self) -> bool {
        matches!(
            self,
            SourceId::BinanceSpot | SourceId::BybitSpot | SourceId::MexcSpot | SourceId::OkxSpot
        )
    }

    #[must_use]
    pub fn is_futures(self) -> bool {
        !self.is_spot()
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminants_are_stable() {
        assert_eq!(SourceId::BinanceSpot.index(), 0);
        assert_eq!(SourceId::OkxFutures.index(), 7);
        for (i, source) in SourceId::ALL.iter().enumerate() {
            assert_eq!(source.index(), i);
            assert_eq!(SourceId::from_u8(i as u8), Some(*source));
        }
        assert_eq!(SourceId::from_u8(8), None);
    }

    #[test]
    fn spot_futures_partition() {
        let spot = SourceId::ALL.iter().filter(|s| s.is_spot()).count();
        let futures = SourceId::ALL.iter().filter(|s| s.is_futures()).count();
        assert_eq!(spot, 4);
        assert_eq!(futures, 4);
        assert!(SourceId::MexcSpot.is_spot());
        assert!(SourceId::MexcFutures.is_futures());
    }

    #[test]
    fn wire_names_round_trip_through_serde() {
        let json = serde_json::to_string(&SourceId::OkxSpot).unwrap();
        assert_eq!(json, "\"okx_spot\"");
        let back: SourceId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, SourceId::OkxSpot);
    }
}
