//! Per-venue WebSocket dialects: subscription payload builders and
//! ticker-message parsers.
//!
//! These functions are the production subscribe/parse path. The live
//! validator exercises exactly the code the feed processes run, so a
//! pair that validates here is a pair the feeds can stream.

pub mod binance;
pub mod bybit;
pub mod mexc;
pub mod okx;

use spreadscan_core::{SourceId, SymbolSub};

/// Best-bid/best-ask extracted from one venue message. Fields are
/// `None` when the venue omitted them or sent an empty string (Bybit
/// deltas do this routinely).
#[derive(Clone, Debug, PartialEq)]
pub struct TickerUpdate {
    pub exchange_symbol: String,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
}

/// Well-formedness of a single update.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TickQuality {
    Good,
    ZeroOrMissingBid,
    ZeroOrMissingAsk,
    Crossed,
}

impl TickerUpdate {
    #[must_use]
    pub fn quality(&self) -> TickQuality {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) if bid > 0.0 && ask > 0.0 => {
                if bid <= ask {
                    TickQuality::Good
                } else {
                    TickQuality::Crossed
                }
            }
            (Some(bid), _) if bid <= 0.0 => TickQuality::ZeroOrMissingBid,
            (None, _) => TickQuality::ZeroOrMissingBid,
            (_, _) => TickQuality::ZeroOrMissingAsk,
        }
    }
}

/// Outcome of parsing one inbound text frame.
#[derive(Clone, Debug, PartialEq)]
pub enum WsParse {
    Ticker(TickerUpdate),
    /// The venue refused the subscription request.
    SubscribeRejected { detail: String },
    /// Acks, heartbeats, and anything else without symbol content.
    Ignored,
}

/// Documented per-venue subscription caps, with margin.
#[must_use]
pub fn default_batch_size(source: SourceId) -> usize {
    match source {
        SourceId::BinanceSpot | SourceId::BinanceFutures => 200,
        SourceId::OkxSpot | SourceId::OkxFutures => 100,
        SourceId::BybitSpot | SourceId::BybitFutures => 50,
        SourceId::MexcSpot | SourceId::MexcFutures => 30,
    }
}

/// Build the subscribe payload(s) covering one batch. Most venues take
/// the whole batch in a single frame; MEXC futures takes one symbol per
/// frame. `request_id` seeds venues that echo an id in their acks.
#[must_use]
pub fn subscribe_messages(source: SourceId, batch: &[SymbolSub], request_id: u64) -> Vec<String> {
    match source {
        SourceId::BinanceSpot | SourceId::BinanceFutures => {
            vec![binance::subscribe_message(batch, request_id)]
        }
        SourceId::BybitSpot | SourceId::BybitFutures => vec![bybit::subscribe_message(batch)],
        SourceId::OkxSpot | SourceId::OkxFutures => vec![okx::subscribe_message(batch)],
        SourceId::MexcSpot => vec![mexc::spot_subscribe_message(batch)],
        SourceId::MexcFutures => mexc::futures_subscribe_messages(batch),
    }
}

/// Parse one inbound text frame in the venue's dialect.
#[must_use]
pub fn parse_message(source: SourceId, text: &str) -> WsParse {
    match source {
        SourceId::BinanceSpot | SourceId::BinanceFutures => binance::parse_message(text),
        SourceId::BybitSpot | SourceId::BybitFutures => bybit::parse_message(text),
        SourceId::OkxSpot | SourceId::OkxFutures => okx::parse_message(text),
        SourceId::MexcSpot => mexc::parse_spot_message(text),
        SourceId::MexcFutures => mexc::parse_futures_message(text),
    }
}

/// Decimal-in-string venue fields; empty strings count as absent.
fn parse_price(value: Option<&str>) -> Option<f64> {
    value.filter(|s| !s.is_empty()).and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(bid: Option<f64>, ask: Option<f64>) -> TickerUpdate {
        TickerUpdate {
            exchange_symbol: "BTCUSDT".to_string(),
            bid,
            ask,
        }
    }

    #[test]
    fn tick_quality_rules() {
        assert_eq!(update(Some(10.0), Some(10.5)).quality(), TickQuality::Good);
        assert_eq!(update(Some(10.0), Some(10.0)).quality(), TickQuality::Good);
        assert_eq!(
            update(Some(0.0), Some(10.5)).quality(),
            TickQuality::ZeroOrMissingBid
        );
        assert_eq!(
            update(None, Some(10.5)).quality(),
            TickQuality::ZeroOrMissingBid
        );
        assert_eq!(
            update(Some(10.0), None).quality(),
            TickQuality::ZeroOrMissingAsk
        );
        assert_eq!(
            update(Some(10.0), Some(0.0)).quality(),
            TickQuality::ZeroOrMissingAsk
        );
        assert_eq!(update(Some(11.0), Some(10.5)).quality(), TickQuality::Crossed);
    }

    #[test]
    fn batch_sizes_respect_documented_caps() {
        assert_eq!(default_batch_size(SourceId::BinanceSpot), 200);
        assert_eq!(default_batch_size(SourceId::OkxFutures), 100);
        assert_eq!(default_batch_size(SourceId::BybitSpot), 50);
        assert_eq!(default_batch_size(SourceId::MexcFutures), 30);
    }
}
