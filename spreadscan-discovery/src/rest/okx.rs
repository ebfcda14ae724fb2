//! OKX v5 public instruments parsing. SPOT declares base/quote
//! directly; SWAP instruments carry the pair in `ctValCcy`/`settleCcy`
//! and an `instId` of the form `BTC-USDT-SWAP`.

use serde::Deserialize;

use spreadscan_core::SourceId;

use super::{quote_matches, FetchError, RawInstrument};

#[derive(Deserialize)]
struct Envelope {
    data: Vec<InstrumentDto>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstrumentDto {
    inst_id: String,
    state: String,
    #[serde(default)]
    base_ccy: Option<String>,
    #[serde(default)]
    quote_ccy: Option<String>,
    #[serde(default)]
    settle_ccy: Option<String>,
    #[serde(default)]
    ct_val_ccy: Option<String>,
    #[serde(default)]
    tick_sz: Option<String>,
    #[serde(default)]
    min_sz: Option<String>,
    #[serde(default)]
    max_mkt_sz: Option<String>,
}

pub fn parse_spot(body: &str, quote_filter: &[String]) -> Result<Vec<RawInstrument>, FetchError> {
    let envelope: Envelope =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;
    let out = envelope
        .data
        .into_iter()
        .filter(|s| s.state == "live")
        .filter(|s| {
            s.quote_ccy
                .as_deref()
                .is_some_and(|q| quote_matches(quote_filter, q))
        })
        .map(|s| RawInstrument {
            source: SourceId::OkxSpot,
            base_asset: s.base_ccy.clone().unwrap_or_default(),
            quote_asset: s.quote_ccy.clone().unwrap_or_default(),
            status: s.state.clone(),
            min_qty: super::parse_decimal_field(&s.min_sz),
            max_qty: super::parse_decimal_field(&s.max_mkt_sz),
            tick_size: super::parse_decimal_field(&s.tick_sz),
            min_notional: None,
            exchange_symbol: s.inst_id,
        })
        .collect();
    Ok(out)
}

pub fn parse_swap(body: &str, quote_filter: &[String]) -> Result<Vec<RawInstrument>, FetchError> {
    let envelope: Envelope =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;
    let out = envelope
        .data
        .into_iter()
        .filter(|s| s.state == "live")
        .filter(|s| {
            s.settle_ccy
                .as_deref()
                .is_some_and(|c| quote_matches(quote_filter, c))
        })
        .map(|s| RawInstrument {
            source: SourceId::OkxFutures,
            base_asset: s.ct_val_ccy.clone().unwrap_or_default(),
            quote_asset: s.settle_ccy.clone().unwrap_or_default(),
            status: s.state.clone(),
            min_qty: super::parse_decimal_field(&s.min_sz),
            max_qty: super::parse_decimal_field(&s.max_mkt_sz),
            tick_size: super::parse_decimal_field(&s.tick_sz),
            min_notional: None,
            exchange_symbol: s.inst_id,
        })
        .collect();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spot_uses_declared_base_and_quote() {
        let body = r#"{
            "code": "0",
            "data": [
                {"instId": "BTC-USDT", "instType": "SPOT", "state": "live",
                 "baseCcy": "BTC", "quoteCcy": "USDT",
                 "tickSz": "0.1", "minSz": "0.00001"},
                {"instId": "BTC-USDC", "instType": "SPOT", "state": "live",
                 "baseCcy": "BTC", "quoteCcy": "USDC"},
                {"instId": "DEAD-USDT", "instType": "SPOT", "state": "suspend",
                 "baseCcy": "DEAD", "quoteCcy": "USDT"}
            ]
        }"#;
        let out = parse_spot(body, &["USDT".to_string()]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].exchange_symbol, "BTC-USDT");
        assert_eq!(out[0].base_asset, "BTC");
        assert_eq!(out[0].tick_size, Some(0.1));
    }

    #[test]
    fn swap_takes_pair_from_contract_fields() {
        let body = r#"{
            "code": "0",
            "data": [
                {"instId": "BTC-USDT-SWAP", "instType": "SWAP", "state": "live",
                 "ctValCcy": "BTC", "settleCcy": "USDT",
                 "tickSz": "0.1", "minSz": "1", "maxMktSz": "12000"},
                {"instId": "BTC-USD-SWAP", "instType": "SWAP", "state": "live",
                 "ctValCcy": "USD", "settleCcy": "BTC"}
            ]
        }"#;
        let out = parse_swap(body, &["USDT".to_string()]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].exchange_symbol, "BTC-USDT-SWAP");
        assert_eq!(out[0].base_asset, "BTC");
        assert_eq!(out[0].quote_asset, "USDT");
        assert_eq!(out[0].max_qty, Some(12_000.0));
    }
}
