//! MEXC dialects. Spot subscribes to the book-ticker channel with
//! uppercase symbols and pushes `{"c":…,"s":…,"d":{"b":…,"a":…}}`
//! JSON frames (protobuf frames on the same channel are skipped at the
//! transport layer). Futures uses `sub.ticker` / `push.ticker` with
//! numeric bid1/ask1.

use serde_json::{json, Value};

use spreadscan_core::SymbolSub;

use super::{parse_price, TickerUpdate, WsParse};

const SPOT_CHANNEL_PREFIX: &str = "spot@public.book_ticker.v3.api.pb@";

pub fn spot_subscribe_message(batch: &[SymbolSub]) -> String {
    let params: Vec<String> = batch
        .iter()
        .map(|sub| format!("{SPOT_CHANNEL_PREFIX}{}", sub.exchange_symbol))
        .collect();
    json!({
        "method": "SUBSCRIPTION",
        "params": params,
    })
    .to_string()
}

/// One frame per symbol; the contract endpoint has no batch form.
pub fn futures_subscribe_messages(batch: &[SymbolSub]) -> Vec<String> {
    batch
        .iter()
        .map(|sub| {
            json!({
                "method": "sub.ticker",
                "param": { "symbol": sub.exchange_symbol },
            })
            .to_string()
        })
        .collect()
}

pub fn parse_spot_message(text: &str) -> WsParse {
    let Ok(value) = serde_json::from_str::<Value>(text) else {
        return WsParse::Ignored;
    };

    // Command responses carry an integer code; non-zero means refused.
    if let Some(code) = value.get("code").and_then(Value::as_i64) {
        if code != 0 {
            let detail = value
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or("subscription refused")
                .to_string();
            return WsParse::SubscribeRejected { detail };
        }
        return WsParse::Ignored;
    }

    let on_channel = value
        .get("c")
        .and_then(Value::as_str)
        .is_some_and(|c| c.starts_with("spot@public.book_ticker"));
    if !on_channel {
        return WsParse::Ignored;
    }
    let Some(symbol) = value.get("s").and_then(Value::as_str) else {
        return WsParse::Ignored;
    };
    let Some(data) = value.get("d") else {
        return WsParse::Ignored;
    };
    WsParse::Ticker(TickerUpdate {
        exchange_symbol: symbol.to_string(),
        bid: parse_price(data.get("b").and_then(Value::as_str)),
        ask: parse_price(data.get("a").and_then(Value::as_str)),
    })
}

pub fn parse_futures_message(text: &str) -> WsParse {
    let Ok(value) = serde_json::from_str::<Value>(text) else {
        return WsParse::Ignored;
    };
    match value.get("channel").and_then(Value::as_str) {
        Some("push.ticker") => {}
        Some("rs.error") => {
            let detail = value
                .get("data")
                .map(|d| d.to_string())
                .unwrap_or_else(|| "subscription refused".to_string());
            return WsParse::SubscribeRejected { detail };
        }
        _ => return WsParse::Ignored,
    }
    let Some(data) = value.get("data") else {
        return WsParse::Ignored;
    };
    let Some(symbol) = data.get("symbol").and_then(Value::as_str) else {
        return WsParse::Ignored;
    };
    WsParse::Ticker(TickerUpdate {
        exchange_symbol: symbol.to_string(),
        bid: data.get("bid1").and_then(Value::as_f64),
        ask: data.get("ask1").and_then(Value::as_f64),
    })
}
