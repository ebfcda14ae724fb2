//! Binance `bookTicker` dialect. Stream names must be lowercased on
//! subscribe; payload symbols come back in REST casing (uppercase).

use serde_json::{json, Value};

use spreadscan_core::SymbolSub;

use super::{parse_price, TickerUpdate, WsParse};

pub fn subscribe_message(batch: &[SymbolSub], request_id: u64) -> String {
    let params: Vec<String> = batch
        .iter()
        .map(|sub| format!("{}@bookTicker", sub.exchange_symbol.to_lowercase()))
        .collect();
    json!({
        "method": "SUBSCRIBE",
        "params": params,
        "id": request_id,
    })
    .to_string()
}

/// Accepts both the raw stream shape (`{"s":…,"b":…,"a":…}`) and the
/// combined-stream envelope (`{"stream":…,"data":{…}}`).
pub fn parse_message(text: &str) -> WsParse {
    let Ok(value) = serde_json::from_str::<Value>(text) else {
        return WsParse::Ignored;
    };
    if let Some(error) = value.get("error") {
        return WsParse::SubscribeRejected {
            detail: error.to_string(),
        };
    }
    let payload = value.get("data").unwrap_or(&value);
    let Some(symbol) = payload.get("s").and_then(Value::as_str) else {
        return WsParse::Ignored;
    };
    WsParse::Ticker(TickerUpdate {
        exchange_symbol: symbol.to_string(),
        bid: parse_price(payload.get("b").and_then(Value::as_str)),
        ask: parse_price(payload.get("a").and_then(Value::as_str)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::TickQuality;

    fn sub(symbol: &str) -> SymbolSub {
        SymbolSub {
            symbol_id: 0,
            exchange_symbol: symbol.to_string(),
        }
    }

    #[test]
    fn subscribe_lowercases_stream_names() {
        let msg = subscribe_message(&[sub("BTCUSDT"), sub("ETHUSDT")], 1);
        assert_eq!(
            msg,
            r#"{"id":1,"method":"SUBSCRIBE","params":["btcusdt@bookTicker","ethusdt@bookTicker"]}"#
        );
    }

    #[test]
    fn parses_raw_book_ticker() {
        let parsed = parse_message(
            r#"{"u":400900217,"s":"BTCUSDT","b":"96500.10","B":"31.2","a":"96500.90","A":"40.6"}"#,
        );
        let WsParse::Ticker(update) = parsed else {
            panic!("expected ticker");
        };
        assert_eq!(update.exchange_symbol, "BTCUSDT");
        assert_eq!(update.bid, Some(96500.10));
        assert_eq!(update.ask, Some(96500.90));
        assert_eq!(update.quality(), TickQuality::Good);
    }

    #[test]
    fn parses_combined_stream_envelope() {
        let parsed = parse_message(
            r#"{"stream":"btcusdt@bookTicker","data":{"s":"BTCUSDT","b":"1.5","a":"1.6"}}"#,
        );
        assert!(matches!(parsed, WsParse::Ticker(u) if u.exchange_symbol == "BTCUSDT"));
    }

    #[test]
    fn subscribe_ack_is_ignored_and_error_rejects() {
        assert_eq!(parse_message(r#"{"result":null,"id":1}"#), WsParse::Ignored);
        assert!(matches!(
            parse_message(r#"{"error":{"code":2,"msg":"Invalid request"},"id":1}"#),
            WsParse::SubscribeRejected { .. }
        ));
    }
}
