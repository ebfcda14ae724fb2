//! REST inventory fetching from all eight venue endpoints.
//!
//! Each venue publishes its instrument list under its own JSON schema
//! and status encoding; the per-venue submodules reduce all of them to
//! [`RawInstrument`]. Fetching is concurrent across endpoints and each
//! endpoint retries transient failures independently.

pub mod binance;
pub mod bybit;
pub mod mexc;
pub mod okx;

use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use spreadscan_config::{ExchangesConfig, FetchConfig};
use spreadscan_core::{SourceId, NUM_SOURCES};

/// One instrument as fetched from an exchange, before normalization.
#[derive(Clone, Debug)]
pub struct RawInstrument {
    pub source: SourceId,
    pub exchange_symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    /// Venue-native trading status, kept for the report.
    pub status: String,
    pub min_qty: Option<f64>,
    pub max_qty: Option<f64>,
    pub tick_size: Option<f64>,
    pub min_notional: Option<f64>,
}

/// Why an endpoint fetch (ultimately) failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Parse(String),
    #[error("venue not configured")]
    NotConfigured,
}

impl FetchError {
    /// Transient failures retry; permanent 4xx (other than 429) and
    /// parse failures do not.
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport(_) | FetchError::Timeout => true,
            FetchError::Status { status, .. } => *status >= 500 || *status == 429,
            FetchError::Parse(_) | FetchError::NotConfigured => false,
        }
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// GET a URL with per-attempt timeout and exponential backoff between
/// attempts (base, 2x, 4x ...).
async fn fetch_with_retry(
    client: &reqwest::Client,
    url: &str,
    cfg: &FetchConfig,
) -> Result<String, FetchError> {
    let attempt_timeout = Duration::from_secs(cfg.attempt_timeout_secs);
    let mut last_err = FetchError::Transport("no attempts made".to_string());
    for attempt in 1..=cfg.max_attempts {
        let result = match client.get(url).timeout(attempt_timeout).send().await {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    resp.text().await.map_err(FetchError::from_reqwest)
                } else {
                    let mut body = resp.text().await.unwrap_or_default();
                    body.truncate(256);
                    Err(FetchError::Status {
                        status: status.as_u16(),
                        body,
                    })
                }
            }
            Err(err) => Err(FetchError::from_reqwest(err)),
        };
        match result {
            Ok(body) => return Ok(body),
            Err(err) => {
                let retryable = err.is_retryable() && attempt < cfg.max_attempts;
                warn!(url, attempt, error = %err, retrying = retryable, "inventory fetch failed");
                if !retryable {
                    return Err(err);
                }
                last_err = err;
                let backoff = cfg.backoff_base_ms * 2u64.pow(attempt - 1);
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }
        }
    }
    Err(last_err)
}

/// Fetch one source's full instrument list.
pub async fn fetch_source(
    client: &reqwest::Client,
    source: SourceId,
    exchanges: &ExchangesConfig,
    quote_filter: &[String],
    cfg: &FetchConfig,
) -> Result<Vec<RawInstrument>, FetchError> {
    let entry = exchanges.entry(source).ok_or(FetchError::NotConfigured)?;
    let base = entry.rest_base(source).trim_end_matches('/');

    let instruments = match source {
        SourceId::BinanceSpot => {
            let body = fetch_with_retry(client, &format!("{base}/api/v3/exchangeInfo"), cfg).await?;
            binance::parse_spot(&body, quote_filter)?
        }
        SourceId::BinanceFutures => {
            let body =
                fetch_with_retry(client, &format!("{base}/fapi/v1/exchangeInfo"), cfg).await?;
            binance::parse_futures(&body, quote_filter)?
        }
        SourceId::BybitSpot | SourceId::BybitFutures => {
            bybit::fetch(client, source, base, quote_filter, cfg).await?
        }
        SourceId::MexcSpot => {
            let body = fetch_with_retry(client, &format!("{base}/api/v3/exchangeInfo"), cfg).await?;
            mexc::parse_spot(&body, quote_filter)?
        }
        SourceId::MexcFutures => {
            let body =
                fetch_with_retry(client, &format!("{base}/api/v1/contract/detail"), cfg).await?;
            mexc::parse_futures(&body, quote_filter)?
        }
        SourceId::OkxSpot => {
            let url = format!("{base}/api/v5/public/instruments?instType=SPOT");
            let body = fetch_with_retry(client, &url, cfg).await?;
            okx::parse_spot(&body, quote_filter)?
        }
        SourceId::OkxFutures => {
            let url = format!("{base}/api/v5/public/instruments?instType=SWAP");
            let body = fetch_with_retry(client, &url, cfg).await?;
            okx::parse_swap(&body, quote_filter)?
        }
    };

    info!(source = %source, count = instruments.len(), "fetched inventory");
    Ok(instruments)
}

/// Fetch all eight sources concurrently. Per-endpoint failures stay in
/// the array; the caller applies the quorum rule.
pub async fn fetch_all(
    client: &reqwest::Client,
    exchanges: &ExchangesConfig,
    quote_filter: &[String],
    cfg: &FetchConfig,
) -> [Result<Vec<RawInstrument>, FetchError>; NUM_SOURCES] {
    let (r0, r1, r2, r3, r4, r5, r6, r7) = tokio::join!(
        fetch_source(client, SourceId::BinanceSpot, exchanges, quote_filter, cfg),
        fetch_source(client, SourceId::BinanceFutures, exchanges, quote_filter, cfg),
        fetch_source(client, SourceId::BybitSpot, exchanges, quote_filter, cfg),
        fetch_source(client, SourceId::BybitFutures, exchanges, quote_filter, cfg),
        fetch_source(client, SourceId::MexcSpot, exchanges, quote_filter, cfg),
        fetch_source(client, SourceId::MexcFutures, exchanges, quote_filter, cfg),
        fetch_source(client, SourceId::OkxSpot, exchanges, quote_filter, cfg),
        fetch_source(client, SourceId::OkxFutures, exchanges, quote_filter, cfg),
    );
    [r0, r1, r2, r3, r4, r5, r6, r7]
}

fn quote_matches(quote_filter: &[String], quote: &str) -> bool {
    quote_filter.iter().any(|q| q.eq_ignore_ascii_case(quote))
}

fn parse_decimal_field(value: &Option<String>) -> Option<f64> {
    value.as_deref().and_then(|s| s.parse().ok())
}
