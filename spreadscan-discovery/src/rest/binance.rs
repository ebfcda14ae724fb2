//! Binance `exchangeInfo` parsing (spot and USDⓈ-M futures share the
//! schema; futures additionally carries `contractType`).

use serde::Deserialize;

use spreadscan_core::SourceId;

use super::{quote_matches, FetchError, RawInstrument};

#[derive(Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolDto>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolDto {
    symbol: String,
    base_asset: String,
    quote_asset: String,
    status: String,
    #[serde(default)]
    contract_type: Option<String>,
    #[serde(default)]
    filters: Vec<FilterDto>,
}

/// One entry of the `filters` array; fields are populated depending on
/// `filterType`, everything else stays `None`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilterDto {
    filter_type: String,
    #[serde(default)]
    tick_size: Option<String>,
    #[serde(default)]
    min_qty: Option<String>,
    #[serde(default)]
    max_qty: Option<String>,
    #[serde(default)]
    min_notional: Option<String>,
}

fn extract_filters(filters: &[FilterDto]) -> (Option<f64>, Option<f64>, Option<f64>, Option<f64>) {
    let mut min_qty = None;
    let mut max_qty = None;
    let mut tick_size = None;
    let mut min_notional = None;
    for filter in filters {
        match filter.filter_type.as_str() {
            "PRICE_FILTER" => tick_size = super::parse_decimal_field(&filter.tick_size),
            "LOT_SIZE" => {
                min_qty = super::parse_decimal_field(&filter.min_qty);
                max_qty = super::parse_decimal_field(&filter.max_qty);
            }
            "MIN_NOTIONAL" | "NOTIONAL" => {
                min_notional = super::parse_decimal_field(&filter.min_notional);
            }
            _ => {}
        }
    }
    (min_qty, max_qty, tick_size, min_notional)
}

fn parse(
    body: &str,
    source: SourceId,
    quote_filter: &[String],
    require_perpetual: bool,
) -> Result<Vec<RawInstrument>, FetchError> {
    let info: ExchangeInfo =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;
    let out = info
        .symbols
        .into_iter()
        .filter(|s| s.status == "TRADING")
        .filter(|s| !require_perpetual || s.contract_type.as_deref() == Some("PERPETUAL"))
        .filter(|s| quote_matches(quote_filter, &s.quote_asset))
        .map(|s| {
            let (min_qty, max_qty, tick_size, min_notional) = extract_filters(&s.filters);
            RawInstrument {
                source,
                exchange_symbol: s.symbol,
                base_asset: s.base_asset,
                quote_asset: s.quote_asset,
                status: s.status,
                min_qty,
                max_qty,
                tick_size,
                min_notional,
            }
        })
        .collect();
    Ok(out)
}

pub fn parse_spot(body: &str, quote_filter: &[String]) -> Result<Vec<RawInstrument>, FetchError> {
    parse(body, SourceId::BinanceSpot, quote_filter, false)
}

pub fn parse_futures(
    body: &str,
    quote_filter: &[String],
) -> Result<Vec<RawInstrument>, FetchError> {
    parse(body, SourceId::BinanceFutures, quote_filter, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPOT_BODY: &str = r#"{
        "timezone": "UTC",
        "symbols": [
            {
                "symbol": "BTCUSDT",
                "status": "TRADING",
                "baseAsset": "BTC",
                "quoteAsset": "USDT",
                "filters": [
                    {"filterType": "PRICE_FILTER", "minPrice": "0.01", "maxPrice": "1000000", "tickSize": "0.01"},
                    {"filterType": "LOT_SIZE", "minQty": "0.00001", "maxQty": "9000", "stepSize": "0.00001"},
                    {"filterType": "NOTIONAL", "minNotional": "5"}
                ]
            },
            {
                "symbol": "ETHBTC",
                "status": "TRADING",
                "baseAsset": "ETH",
                "quoteAsset": "BTC",
                "filters": []
            },
            {
                "symbol": "LUNAUSDT",
                "status": "BREAK",
                "baseAsset": "LUNA",
                "quoteAsset": "USDT",
                "filters": []
            }
        ]
    }"#;

    #[test]
    fn spot_filters_status_and_quote() {
        let out = parse_spot(SPOT_BODY, &["USDT".to_string()]).unwrap();
        assert_eq!(out.len(), 1);
        let btc = &out[0];
        assert_eq!(btc.exchange_symbol, "BTCUSDT");
        assert_eq!(btc.tick_size, Some(0.01));
        assert_eq!(btc.min_qty, Some(0.00001));
        assert_eq!(btc.max_qty, Some(9_000.0));
        assert_eq!(btc.min_notional, Some(5.0));
    }

    #[test]
    fn futures_requires_perpetual() {
        let body = r#"{
            "symbols": [
                {"symbol": "BTCUSDT", "status": "TRADING", "baseAsset": "BTC",
                 "quoteAsset": "USDT", "contractType": "PERPETUAL", "filters": []},
                {"symbol": "BTCUSDT_240628", "status": "TRADING", "baseAsset": "BTC",
                 "quoteAsset": "USDT", "contractType": "CURRENT_QUARTER", "filters": []}
            ]
        }"#;
        let out = parse_futures(body, &["USDT".to_string()]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].exchange_symbol, "BTCUSDT");
        assert_eq!(out[0].source, SourceId::BinanceFutures);
    }

    #[test]
    fn malformed_body_is_a_parse_error() {
        let err = parse_spot("{\"symbols\": 42}", &["USDT".to_string()]).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }
}
