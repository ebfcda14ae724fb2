//! OKX v5 `tickers` dialect, shared by SPOT and SWAP (the instId
//! carries the market type).

use serde_json::{json, Value};

use spreadscan_core::SymbolSub;

use super::{parse_price, TickerUpdate, WsParse};

pub fn subscribe_message(batch: &[SymbolSub]) -> String {
    let args: Vec<Value> = batch
        .iter()
        .map(|sub| {
            json!({
                "channel": "tickers",
                "instId": sub.exchange_symbol,
            })
        })
        .collect();
    json!({
        "op": "subscribe",
        "args": args,
    })
    .to_string()
}

pub fn parse_message(text: &str) -> WsParse {
    let Ok(value) = serde_json::from_str::<Value>(text) else {
        return WsParse::Ignored;
    };

    if value.get("event").and_then(Value::as_str) == Some("error") {
        let detail = value
            .get("msg")
            .and_then(Value::as_str)
            .unwrap_or("subscription refused")
            .to_string();
        return WsParse::SubscribeRejected { detail };
    }

    let channel_is_tickers = value
        .get("arg")
        .and_then(|arg| arg.get("channel"))
        .and_then(Value::as_str)
        == Some("tickers");
    if !channel_is_tickers {
        return WsParse::Ignored;
    }
    let Some(inst_id) = value
        .get("arg")
        .and_then(|arg| arg.get("instId"))
        .and_then(Value::as_str)
    else {
        return WsParse::Ignored;
    };
    let Some(entry) = value
        .get("data")
        .and_then(Value::as_array)
        .and_then(|data| data.first())
    else {
        return WsParse::Ignored;
    };
    WsParse::Ticker(TickerUpdate {
        exchange_symbol: inst_id.to_string(),
        bid: parse_price(entry.get("bidPx").and_then(Value::as_str)),
        ask: parse_price(entry.get("askPx").and_then(Value::as_str)),
    })
}
