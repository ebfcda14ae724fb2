//! MEXC inventory parsing. Spot mirrors the Binance `exchangeInfo`
//! shape; futures uses the `contract/detail` envelope with numeric
//! attributes and an integer state.

use serde::Deserialize;

use spreadscan_core::SourceId;

use super::{quote_matches, FetchError, RawInstrument};

#[derive(Deserialize)]
struct SpotExchangeInfo {
    symbols: Vec<SpotSymbolDto>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpotSymbolDto {
    symbol: String,
    base_asset: String,
    quote_asset: String,
    status: String,
    #[serde(default)]
    quote_amount_precision: Option<String>,
}

/// The spot API has shipped three different encodings for "enabled".
fn spot_status_is_trading(status: &str) -> bool {
    matches!(status, "1" | "ENABLED" | "TRADING")
}

pub fn parse_spot(body: &str, quote_filter: &[String]) -> Result<Vec<RawInstrument>, FetchError> {
    let info: SpotExchangeInfo =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;
    let out = info
        .symbols
        .into_iter()
        .filter(|s| spot_status_is_trading(&s.status))
        .filter(|s| quote_matches(quote_filter, &s.quote_asset))
        .map(|s| RawInstrument {
            source: SourceId::MexcSpot,
            min_notional: super::parse_decimal_field(&s.quote_amount_precision),
            exchange_symbol: s.symbol,
            base_asset: s.base_asset,
            quote_asset: s.quote_asset,
            status: s.status,
            min_qty: None,
            max_qty: None,
            tick_size: None,
        })
        .collect();
    Ok(out)
}

#[derive(Deserialize)]
struct ContractDetail {
    data: Vec<ContractDto>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContractDto {
    symbol: String,
    base_coin: String,
    quote_coin: String,
    /// 0 = enabled.
    state: i64,
    #[serde(default)]
    min_vol: Option<f64>,
    #[serde(default)]
    max_vol: Option<f64>,
    #[serde(default)]
    price_unit: Option<f64>,
}

pub fn parse_futures(
    body: &str,
    quote_filter: &[String],
) -> Result<Vec<RawInstrument>, FetchError> {
    let detail: ContractDetail =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;
    let out = detail
        .data
        .into_iter()
        .filter(|s| s.state == 0)
        .filter(|s| quote_matches(quote_filter, &s.quote_coin))
        .map(|s| RawInstrument {
            source: SourceId::MexcFutures,
            exchange_symbol: s.symbol,
            base_asset: s.base_coin,
            quote_asset: s.quote_coin,
            status: s.state.to_string(),
            min_qty: s.min_vol,
            max_qty: s.max_vol,
            tick_size: s.price_unit,
            min_notional: None,
        })
        .collect();
    Ok(out)
}
