//! Live validation: prove each `(source, symbol)` pair actually streams
//! a well-formed book-top tick before it is published.
//!
//! One control connection per source, reused across batches. Batches
//! are sized to the venue's subscription cap and observed under four
//! nested timers: a per-message read slice, an idle timeout, the
//! nominal collect window, and a hard per-batch cap. Failures degrade
//! per batch, never per source, except when the reconnect budget runs
//! out.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use spreadscan_config::{ExchangesConfig, ValidationConfig};
use spreadscan_core::{SourceId, SymbolSub, NUM_SOURCES};

use crate::registry::Registry;
use crate::ws::{self, TickQuality, WsParse};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Why a `(source, symbol)` pair failed validation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    NoMessage,
    ZeroOrMissingBid,
    ZeroOrMissingAsk,
    BidAboveAsk,
    SubscribeRejected,
    BatchTimeout,
    ConnectionDropped,
}

impl InvalidReason {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            InvalidReason::NoMessage => "no_message",
            InvalidReason::ZeroOrMissingBid => "zero_or_missing_bid",
            InvalidReason::ZeroOrMissingAsk => "zero_or_missing_ask",
            InvalidReason::BidAboveAsk => "bid_above_ask",
            InvalidReason::SubscribeRejected => "subscribe_rejected",
            InvalidReason::BatchTimeout => "batch_timeout",
            InvalidReason::ConnectionDropped => "connection_dropped",
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<TickQuality> for InvalidReason {
    fn from(quality: TickQuality) -> Self {
        match quality {
            TickQuality::ZeroOrMissingBid => InvalidReason::ZeroOrMissingBid,
            TickQuality::ZeroOrMissingAsk => InvalidReason::ZeroOrMissingAsk,
            TickQuality::Crossed => InvalidReason::BidAboveAsk,
            TickQuality::Good => InvalidReason::NoMessage,
        }
    }
}

/// One failed pair, kept with its native symbol for the report.
#[derive(Clone, Debug)]
pub struct InvalidEntry {
    pub symbol_id: u16,
    pub exchange_symbol: String,
    pub reason: InvalidReason,
}

/// Outcome of probing one source.
#[derive(Debug)]
pub struct ValidationResult {
    pub source: SourceId,
    /// Pairs attempted.
    pub total: usize,
    pub valid: HashSet<u16>,
    pub invalid: Vec<InvalidEntry>,
    pub elapsed: Duration,
    /// False when the source never got through a single observation
    /// window (connect failures all the way down). Sources with
    /// nothing to validate count as completed.
    pub completed: bool,
}

impl ValidationResult {
    #[must_use]
    pub fn reason_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.invalid {
            *counts.entry(entry.reason.label()).or_insert(0) += 1;
        }
        counts
    }
}

struct Timing {
    batch_timeout: Duration,
    collect: Duration,
    idle: Duration,
    read_slice: Duration,
    batch_pause: Duration,
    reconnect_base: Duration,
    reconnect_cap: Duration,
    max_reconnects: u32,
}

impl Timing {
    fn from_config(cfg: &ValidationConfig) -> Self {
        Self {
            batch_timeout: Duration::from_secs(cfg.batch_timeout_secs),
            collect: Duration::from_secs(cfg.collect_secs),
            idle: Duration::from_secs(cfg.idle_timeout_secs),
            read_slice: Duration::from_millis(cfg.read_slice_ms),
            batch_pause: Duration::from_millis(cfg.batch_pause_ms),
            reconnect_base: Duration::from_millis(cfg.reconnect_base_ms),
            reconnect_cap: Duration::from_millis(cfg.reconnect_cap_ms),
            max_reconnects: cfg.max_reconnects,
        }
    }
}

/// Probe all eight sources concurrently.
pub async fn validate_all(
    registry: &Registry,
    exchanges: &ExchangesConfig,
    cfg: &ValidationConfig,
) -> [ValidationResult; NUM_SOURCES] {
    let timing = Timing::from_config(cfg);
    let plan: [(Vec<SymbolSub>, Option<String>, usize); NUM_SOURCES] = std::array::from_fn(|i| {
        let source = SourceId::ALL[i];
        let subs = registry.subscription_list(source);
        let entry = exchanges.entry(source);
        let url = entry.map(|e| e.ws_url(source).to_string());
        let batch_size = entry
            .and_then(|e| e.ws_batch_size)
            .unwrap_or_else(|| ws::default_batch_size(source))
            .max(1);
        (subs, url, batch_size)
    });
    let [p0, p1, p2, p3, p4, p5, p6, p7] = plan;

    let (r0, r1, r2, r3, r4, r5, r6, r7) = tokio::join!(
        validate_source(SourceId::BinanceSpot, p0.0, p0.1, p0.2, &timing),
        validate_source(SourceId::BinanceFutures, p1.0, p1.1, p1.2, &timing),
        validate_source(SourceId::BybitSpot, p2.0, p2.1, p2.2, &timing),
        validate_source(SourceId::BybitFutures, p3.0, p3.1, p3.2, &timing),
        validate_source(SourceId::MexcSpot, p4.0, p4.1, p4.2, &timing),
        validate_source(SourceId::MexcFutures, p5.0, p5.1, p5.2, &timing),
        validate_source(SourceId::OkxSpot, p6.0, p6.1, p6.2, &timing),
        validate_source(SourceId::OkxFutures, p7.0, p7.1, p7.2, &timing),
    );
    [r0, r1, r2, r3, r4, r5, r6, r7]
}

async fn validate_source(
    source: SourceId,
    subs: Vec<SymbolSub>,
    ws_url: Option<String>,
    batch_size: usize,
    timing: &Timing,
) -> ValidationResult {
    let started = Instant::now();
    if subs.is_empty() {
        return ValidationResult {
            source,
            total: 0,
            valid: HashSet::new(),
            invalid: Vec::new(),
            elapsed: started.elapsed(),
            completed: true,
        };
    }
    let Some(url) = ws_url else {
        warn!(source = %source, "no websocket endpoint configured");
        return ValidationResult {
            total: subs.len(),
            valid: HashSet::new(),
            invalid: subs
                .iter()
                .map(|sub| InvalidEntry {
                    symbol_id: sub.symbol_id,
                    exchange_symbol: sub.exchange_symbol.clone(),
                    reason: InvalidReason::ConnectionDropped,
                })
                .collect(),
            elapsed: started.elapsed(),
            completed: false,
            source,
        };
    };

    let name_to_id: HashMap<&str, u16> = subs
        .iter()
        .map(|sub| (sub.exchange_symbol.as_str(), sub.symbol_id))
        .collect();

    let mut valid: HashSet<u16> = HashSet::new();
    let mut provisional: HashMap<u16, InvalidReason> = HashMap::new();
    let mut invalid: Vec<InvalidEntry> = Vec::new();
    let mut conn: Option<WsStream> = None;
    let mut reconnects_left = timing.max_reconnects;
    let mut completed = false;
    let mut request_id: u64 = 1;

    let num_batches = subs.len().div_ceil(batch_size);
    for (batch_no, batch) in subs.chunks(batch_size).enumerate() {
        if conn.is_none() {
            conn = connect_with_backoff(source, &url, &mut reconnects_left, timing).await;
            if conn.is_none() {
                // Budget exhausted: everything unseen from this batch on
                // is dropped and the source concludes.
                let remaining = &subs[batch_no * batch_size..];
                for sub in remaining {
                    if !valid.contains(&sub.symbol_id) {
                        invalid.push(InvalidEntry {
                            symbol_id: sub.symbol_id,
                            exchange_symbol: sub.exchange_symbol.clone(),
                            reason: provisional
                                .remove(&sub.symbol_id)
                                .unwrap_or(InvalidReason::ConnectionDropped),
                        });
                    }
                }
                break;
            }
        }
        let stream = conn.as_mut().expect("connection established above");

        let outcome = run_batch(
            source,
            stream,
            batch,
            &name_to_id,
            &mut valid,
            &mut provisional,
            timing,
            &mut request_id,
        )
        .await;
        completed = true;

        let fallback = match outcome {
            BatchOutcome::Done => InvalidReason::NoMessage,
            BatchOutcome::HardTimeout => InvalidReason::BatchTimeout,
            BatchOutcome::ConnectionLost => {
                conn = None;
                InvalidReason::ConnectionDropped
            }
        };
        for sub in batch {
            if !valid.contains(&sub.symbol_id) {
                invalid.push(InvalidEntry {
                    symbol_id: sub.symbol_id,
                    exchange_symbol: sub.exchange_symbol.clone(),
                    reason: provisional.remove(&sub.symbol_id).unwrap_or(fallback),
                });
            }
        }

        if batch_no + 1 < num_batches {
            sleep(timing.batch_pause).await;
        }
    }

    let elapsed = started.elapsed();
    info!(
        source = %source,
        valid = valid.len(),
        total = subs.len(),
        pct = format!("{:.1}", valid.len() as f64 / subs.len() as f64 * 100.0),
        elapsed_secs = format!("{:.1}", elapsed.as_secs_f64()),
        "validation finished"
    );
    ValidationResult {
        source,
        total: subs.len(),
        valid,
        invalid,
        elapsed,
        completed,
    }
}

async fn connect_with_backoff(
    source: SourceId,
    url: &str,
    attempts_left: &mut u32,
    timing: &Timing,
) -> Option<WsStream> {
    let mut delay = timing.reconnect_base;
    loop {
        let attempt = timeout(CONNECT_TIMEOUT, connect_async(url)).await;
        match attempt {
            Ok(Ok((stream, _))) => {
                debug!(source = %source, "websocket connected");
                return Some(stream);
            }
            Ok(Err(err)) => {
                if *attempts_left == 0 {
                    warn!(source = %source, error = %err, "reconnect budget exhausted");
                    return None;
                }
                *attempts_left -= 1;
                warn!(
                    source = %source,
                    error = %err,
                    retry_in_ms = delay.as_millis() as u64,
                    "websocket connect failed"
                );
            }
            Err(_) => {
                if *attempts_left == 0 {
                    warn!(source = %source, "reconnect budget exhausted (connect timeout)");
                    return None;
                }
                *attempts_left -= 1;
                warn!(
                    source = %source,
                    retry_in_ms = delay.as_millis() as u64,
                    "websocket connect timed out"
                );
            }
        }
        sleep(delay).await;
        delay = (delay * 2).min(timing.reconnect_cap);
    }
}

enum BatchOutcome {
    /// The window closed normally (all seen, collect elapsed, or idle).
    Done,
    /// The hard per-batch cap fired.
    HardTimeout,
    /// The transport died mid-batch.
    ConnectionLost,
}

#[allow(clippy::too_many_arguments)]
async fn run_batch(
    source: SourceId,
    stream: &mut WsStream,
    batch: &[SymbolSub],
    name_to_id: &HashMap<&str, u16>,
    valid: &mut HashSet<u16>,
    provisional: &mut HashMap<u16, InvalidReason>,
    timing: &Timing,
    request_id: &mut u64,
) -> BatchOutcome {
    for payload in ws::subscribe_messages(source, batch, *request_id) {
        *request_id += 1;
        if stream.send(Message::Text(payload)).await.is_err() {
            return BatchOutcome::ConnectionLost;
        }
    }

    let mut pending: HashSet<u16> = batch
        .iter()
        .map(|sub| sub.symbol_id)
        .filter(|id| !valid.contains(id))
        .collect();
    let opened = Instant::now();
    let mut last_message = opened;

    loop {
        if pending.is_empty() {
            debug!(source = %source, batch = batch.len(), "all batch symbols observed");
            return BatchOutcome::Done;
        }
        let now = Instant::now();
        if now.duration_since(opened) >= timing.batch_timeout {
            return BatchOutcome::HardTimeout;
        }
        if now.duration_since(opened) >= timing.collect {
            return BatchOutcome::Done;
        }
        if now.duration_since(last_message) >= timing.idle {
            debug!(source = %source, unseen = pending.len(), "idle window expired");
            return BatchOutcome::Done;
        }

        // A read slice without traffic is normal; keep looping so the
        // outer timers stay live.
        let frame = match timeout(timing.read_slice, stream.next()).await {
            Err(_) => continue,
            Ok(None) => return BatchOutcome::ConnectionLost,
            Ok(Some(Err(_))) => return BatchOutcome::ConnectionLost,
            Ok(Some(Ok(frame))) => frame,
        };

        match frame {
            Message::Text(text) => match ws::parse_message(source, &text) {
                WsParse::Ticker(update) => {
                    let Some(&id) = name_to_id.get(update.exchange_symbol.as_str()) else {
                        continue;
                    };
                    last_message = Instant::now();
                    match update.quality() {
                        TickQuality::Good => {
                            valid.insert(id);
                            provisional.remove(&id);
                            pending.remove(&id);
                        }
                        quality => {
                            // Remember the defect but keep observing: a
                            // later clean tick still validates the pair.
                            if !valid.contains(&id) {
                                provisional.insert(id, quality.into());
                            }
                        }
                    }
                }
                WsParse::SubscribeRejected { detail } => {
                    warn!(source = %source, detail = %detail, "venue rejected subscription");
                    for &id in &pending {
                        provisional.insert(id, InvalidReason::SubscribeRejected);
                    }
                    return BatchOutcome::Done;
                }
                WsParse::Ignored => {}
            },
            Message::Ping(payload) => {
                let _ = stream.send(Message::Pong(payload)).await;
            }
            Message::Close(_) => return BatchOutcome::ConnectionLost,
            // Binary frames (compressed or protobuf feeds) carry no
            // parseable book top here.
            _ => {}
        }
    }
}

/// Apply validation outcomes to the registry and directions: clear
/// invalidated slots, drop records no venue can serve (ids keep their
/// gaps), recompute direction membership.
pub fn apply(
    registry: &mut Registry,
    directions: &mut [spreadscan_core::DirectionRecord],
    results: &[ValidationResult],
) -> usize {
    for result in results {
        for entry in &result.invalid {
            registry.clear_slot(result.source, entry.symbol_id);
        }
    }
    let dropped = registry.retain_live();
    if dropped > 0 {
        info!(dropped, "pruned symbols with no serving venue left");
    }
    crate::directions::rebuild(registry, directions);
    dropped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_quality_maps_to_reasons() {
        assert_eq!(
            InvalidReason::from(TickQuality::ZeroOrMissingBid),
            InvalidReason::ZeroOrMissingBid
        );
        assert_eq!(
            InvalidReason::from(TickQuality::Crossed),
            InvalidReason::BidAboveAsk
        );
    }

    #[test]
    fn reason_counts_aggregate_by_label() {
        let result = ValidationResult {
            source: SourceId::BybitSpot,
            total: 3,
            valid: HashSet::new(),
            invalid: vec![
                InvalidEntry {
                    symbol_id: 0,
                    exchange_symbol: "AUSDT".into(),
                    reason: InvalidReason::NoMessage,
                },
                InvalidEntry {
                    symbol_id: 1,
                    exchange_symbol: "BUSDT".into(),
                    reason: InvalidReason::NoMessage,
                },
                InvalidEntry {
                    symbol_id: 2,
                    exchange_symbol: "CUSDT".into(),
                    reason: InvalidReason::BidAboveAsk,
                },
            ],
            elapsed: Duration::from_secs(1),
            completed: true,
        };
        let counts = result.reason_counts();
        assert_eq!(counts.get("no_message"), Some(&2));
        assert_eq!(counts.get("bid_above_ask"), Some(&1));
    }

    #[test]
    fn reason_serializes_snake_case() {
        let json = serde_json::to_string(&InvalidReason::SubscribeRejected).unwrap();
        assert_eq!(json, "\"subscribe_rejected\"");
    }
}
