//! Bybit v5 `instruments-info` parsing. Both categories use the same
//! envelope; results are cursor-paged.

use serde::Deserialize;

use spreadscan_config::FetchConfig;
use spreadscan_core::SourceId;

use super::{fetch_with_retry, quote_matches, FetchError, RawInstrument};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    result: PageResult,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageResult {
    #[serde(default)]
    list: Vec<InstrumentDto>,
    #[serde(default)]
    next_page_cursor: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstrumentDto {
    symbol: String,
    base_coin: String,
    quote_coin: String,
    status: String,
    #[serde(default)]
    contract_type: Option<String>,
    #[serde(default)]
    lot_size_filter: Option<LotSizeFilter>,
    #[serde(default)]
    price_filter: Option<PriceFilter>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LotSizeFilter {
    #[serde(default)]
    min_order_qty: Option<String>,
    #[serde(default)]
    max_order_qty: Option<String>,
    #[serde(default)]
    min_order_amt: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceFilter {
    #[serde(default)]
    tick_size: Option<String>,
}

/// Parse one page; returns the instruments plus the next cursor.
fn parse_page(
    body: &str,
    source: SourceId,
    quote_filter: &[String],
) -> Result<(Vec<RawInstrument>, Option<String>), FetchError> {
    let envelope: Envelope =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;
    let cursor = envelope
        .result
        .next_page_cursor
        .filter(|c| !c.is_empty());
    let instruments = envelope
        .result
        .list
        .into_iter()
        .filter(|s| s.status == "Trading")
        .filter(|s| {
            source == SourceId::BybitSpot || s.contract_type.as_deref() == Some("LinearPerpetual")
        })
        .filter(|s| quote_matches(quote_filter, &s.quote_coin))
        .map(|s| {
            let lot = s.lot_size_filter.as_ref();
            RawInstrument {
                source,
                exchange_symbol: s.symbol,
                base_asset: s.base_coin,
                quote_asset: s.quote_coin,
                status: s.status,
                min_qty: lot.and_then(|f| super::parse_decimal_field(&f.min_order_qty)),
                max_qty: lot.and_then(|f| super::parse_decimal_field(&f.max_order_qty)),
                tick_size: s
                    .price_filter
                    .as_ref()
                    .and_then(|f| super::parse_decimal_field(&f.tick_size)),
                min_notional: lot.and_then(|f| super::parse_decimal_field(&f.min_order_amt)),
            }
        })
        .collect();
    Ok((instruments, cursor))
}

/// Fetch a Bybit category, following `nextPageCursor` until exhausted.
pub async fn fetch(
    client: &reqwest::Client,
    source: SourceId,
    base: &str,
    quote_filter: &[String],
    cfg: &FetchConfig,
) -> Result<Vec<RawInstrument>, FetchError> {
    let category = if source == SourceId::BybitSpot {
        "spot"
    } else {
        "linear"
    };
    let mut out = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let url = match &cursor {
            Some(c) => format!(
                "{base}/v5/market/instruments-info?category={category}&limit=1000&cursor={c}"
            ),
            None => format!("{base}/v5/market/instruments-info?category={category}&limit=1000"),
        };
        let body = fetch_with_retry(client, &url, cfg).await?;
        let (mut page, next) = parse_page(&body, source, quote_filter)?;
        out.append(&mut page);
        match next {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    Ok(out)
}
