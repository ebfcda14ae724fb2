//! Venue-shaped inventory JSON builders.

use serde_json::{json, Value};

use spreadscan_core::SourceId;

/// The exchange-native symbol a venue would list for a pair.
#[must_use]
pub fn native_symbol(source: SourceId, base: &str, quote: &str) -> String {
    match source {
        SourceId::BinanceSpot
        | SourceId::BinanceFutures
        | SourceId::BybitSpot
        | SourceId::BybitFutures
        | SourceId::MexcSpot => format!("{base}{quote}"),
        SourceId::MexcFutures => format!("{base}_{quote}"),
        SourceId::OkxSpot => format!("{base}-{quote}"),
        SourceId::OkxFutures => format!("{base}-{quote}-SWAP"),
    }
}

/// Build the venue's instrument-listing response for a set of
/// `(base, quote)` pairs, all marked tradable.
#[must_use]
pub fn inventory_body(source: SourceId, pairs: &[(&str, &str)]) -> String {
    let body = match source {
        SourceId::BinanceSpot | SourceId::BinanceFutures => {
            let symbols: Vec<Value> = pairs
                .iter()
                .map(|(base, quote)| {
                    json!({
                        "symbol": native_symbol(source, base, quote),
                        "status": "TRADING",
                        "baseAsset": base,
                        "quoteAsset": quote,
                        "contractType": "PERPETUAL",
                        "filters": [
                            {"filterType": "PRICE_FILTER", "tickSize": "0.01"},
                            {"filterType": "LOT_SIZE", "minQty": "0.001", "maxQty": "9000"}
                        ]
                    })
                })
                .collect();
            json!({ "symbols": symbols })
        }
        SourceId::BybitSpot | SourceId::BybitFutures => {
            let list: Vec<Value> = pairs
                .iter()
                .map(|(base, quote)| {
                    json!({
                        "symbol": native_symbol(source, base, quote),
                        "status": "Trading",
                        "contractType": "LinearPerpetual",
                        "baseCoin": base,
                        "quoteCoin": quote,
                        "priceFilter": {"tickSize": "0.01"},
                        "lotSizeFilter": {"minOrderQty": "0.001"}
                    })
                })
                .collect();
            json!({
                "retCode": 0,
                "result": { "list": list, "nextPageCursor": "" }
            })
        }
        SourceId::MexcSpot => {
            let symbols: Vec<Value> = pairs
                .iter()
                .map(|(base, quote)| {
                    json!({
                        "symbol": native_symbol(source, base, quote),
                        "status": "1",
                        "baseAsset": base,
                        "quoteAsset": quote
                    })
                })
                .collect();
            json!({ "symbols": symbols })
        }
        SourceId::MexcFutures => {
            let data: Vec<Value> = pairs
                .iter()
                .map(|(base, quote)| {
                    json!({
                        "symbol": native_symbol(source, base, quote),
                        "baseCoin": base,
                        "quoteCoin": quote,
                        "state": 0,
                        "minVol": 1,
                        "priceUnit": 0.1
                    })
                })
                .collect();
            json!({ "success": true, "code": 0, "data": data })
        }
        SourceId::OkxSpot => {
            let data: Vec<Value> = pairs
                .iter()
                .map(|(base, quote)| {
                    json!({
                        "instId": native_symbol(source, base, quote),
                        "instType": "SPOT",
                        "state": "live",
                        "baseCcy": base,
                        "quoteCcy": quote,
                        "tickSz": "0.1",
                        "minSz": "0.001"
                    })
                })
                .collect();
            json!({ "code": "0", "data": data })
        }
        SourceId::OkxFutures => {
            let data: Vec<Value> = pairs
                .iter()
                .map(|(base, quote)| {
                    json!({
                        "instId": native_symbol(source, base, quote),
                        "instType": "SWAP",
                        "state": "live",
                        "ctValCcy": base,
                        "settleCcy": quote,
                        "tickSz": "0.1",
                        "minSz": "1"
                    })
                })
                .collect();
            json!({ "code": "0", "data": data })
        }
    };
    body.to_string()
}
