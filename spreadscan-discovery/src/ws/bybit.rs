//! Bybit v5 `tickers` dialect. Snapshot frames carry the full book
//! top; delta frames may omit either price. Topics use REST casing.

use serde_json::{json, Value};

use spreadscan_core::SymbolSub;

use super::{parse_price, TickerUpdate, WsParse};

pub fn subscribe_message(batch: &[SymbolSub]) -> String {
    let args: Vec<String> = batch
        .iter()
        .map(|sub| format!("tickers.{}", sub.exchange_symbol))
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

    if value.get("op").and_then(Value::as_str) == Some("subscribe")
        && value.get("success").and_then(Value::as_bool) == Some(false)
    {
        let detail = value
            .get("ret_msg")
            .and_then(Value::as_str)
            .unwrap_or("subscription refused")
            .to_string();
        return WsParse::SubscribeRejected { detail };
    }

    let is_ticker = value
        .get("topic")
        .and_then(Value::as_str)
        .is_some_and(|topic| topic.starts_with("tickers."));
    if !is_ticker {
        return WsParse::Ignored;
    }
    let Some(data) = value.get("data") else {
        return WsParse::Ignored;
    };
    let Some(symbol) = data.get("symbol").and_then(Value::as_str) else {
        return WsParse::Ignored;
    };
    let bid = parse_price(data.get("bid1Price").and_then(Value::as_str));
    let ask = parse_price(data.get("ask1Price").and_then(Value::as_str));
    if bid.is_none() && ask.is_none() {
        // Delta without book-top content; nothing to judge.
        return WsParse::Ignored;
    }
    WsParse::Ticker(TickerUpdate {
        exchange_symbol: symbol.to_string(),
        bid,
        ask,
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
    fn subscribe_uses_rest_casing() {
        let msg = subscribe_message(&[sub("BTCUSDT")]);
        assert_eq!(msg, r#"{"args":["tickers.BTCUSDT"],"op":"subscribe"}"#);
    }

    #[test]
    fn snapshot_with_both_prices_is_good() {
        let parsed = parse_message(
            r#"{"topic":"tickers.BTCUSDT","type":"snapshot",
                "data":{"symbol":"BTCUSDT","bid1Price":"96500","ask1Price":"96501"}}"#,
        );
        let WsParse::Ticker(update) = parsed else {
            panic!("expected ticker");
        };
        assert_eq!(update.quality(), TickQuality::Good);
    }

    #[test]
    fn delta_without_prices_is_ignored_not_malformed() {
        let parsed = parse_message(
            r#"{"topic":"tickers.BTCUSDT","type":"delta",
                "data":{"symbol":"BTCUSDT","lastPrice":"96500.5"}}"#,
        );
        assert_eq!(parsed, WsParse::Ignored);
    }

    #[test]
    fn delta_with_one_price_reports_the_other_missing() {
        let parsed = parse_message(
            r#"{"topic":"tickers.ETHUSDT","type":"delta",
                "data":{"symbol":"ETHUSDT","bid1Price":"3500"}}"#,
        );
        let WsParse::Ticker(update) = parsed else {
            panic!("expected ticker");
        };
        assert_eq!(update.quality(), TickQuality::ZeroOrMissingAsk);
    }

    #[test]
    fn failed_subscribe_is_rejected() {
        let parsed = parse_message(
            r#"{"op":"subscribe","success":false,"ret_msg":"args over limit"}"#,
        );
        assert!(matches!(parsed, WsParse::SubscribeRejected { detail } if detail.contains("limit")));
    }

    #[test]
    fn successful_subscribe_ack_is_ignored() {
        let parsed = parse_message(r#"{"op":"subscribe","success":true,"conn_id":"abc"}"#);
        assert_eq!(parsed, WsParse::Ignored);
    }
}
