//! Scripted WebSocket ticker server. Understands one venue's subscribe
//! dialect, acks (or rejects) requests, and pushes one book-top tick
//! per subscribed symbol present in its quote map. Symbols missing
//! from the map stay silent, which is how tests model a dead pair.

use std::collections::HashMap;
use std::net::SocketAddr;

use anyhow::Result;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::warn;

use spreadscan_core::SourceId;

/// Behavior of one mock ticker server.
#[derive(Clone, Debug)]
pub struct TickerScript {
    pub source: SourceId,
    /// native symbol → (bid, ask). Use zero/crossed values to test
    /// malformed-tick classification.
    pub quotes: HashMap<String, (f64, f64)>,
    /// Refuse every subscription request in the venue's dialect.
    pub reject_subscriptions: bool,
}

impl TickerScript {
    #[must_use]
    pub fn new(source: SourceId) -> Self {
        Self {
            source,
            quotes: HashMap::new(),
            reject_subscriptions: false,
        }
    }

    #[must_use]
    pub fn with_quote(mut self, native_symbol: impl Into<String>, bid: f64, ask: f64) -> Self {
        self.quotes.insert(native_symbol.into(), (bid, ask));
        self
    }

    #[must_use]
    pub fn rejecting(mut self) -> Self {
        self.reject_subscriptions = true;
        self
    }
}

pub struct MockTickerServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl MockTickerServer {
    pub async fn spawn(script: TickerScript) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    accepted = listener.accept() => {
                        match accepted {
                            Ok((stream, _peer)) => {
                                let script = script.clone();
                                tokio::spawn(async move {
                                    if let Err(err) = handle_connection(script, stream).await {
                                        warn!(error = %err, "mock ticker connection ended with error");
                                    }
                                });
                            }
                            Err(err) => {
                                warn!(error = %err, "mock ticker accept failed");
                                break;
                            }
                        }
                    }
                }
            }
        });
        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            handle,
        })
    }

    #[must_use]
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.handle.abort();
    }
}

impl Drop for MockTickerServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.handle.abort();
    }
}

async fn handle_connection(script: TickerScript, stream: TcpStream) -> Result<()> {
    let mut ws: WebSocketStream<TcpStream> = accept_async(stream).await?;
    while let Some(frame) = ws.next().await {
        match frame? {
            Message::Text(text) => {
                let Ok(value) = serde_json::from_str::<Value>(&text) else {
                    continue;
                };
                let Some(symbols) = requested_symbols(script.source, &value) else {
                    continue;
                };
                if script.reject_subscriptions {
                    ws.send(Message::Text(rejection(script.source, &value).to_string()))
                        .await?;
                    continue;
                }
                ws.send(Message::Text(ack(script.source, &value).to_string()))
                    .await?;
                for symbol in symbols {
                    if let Some(&(bid, ask)) = script.quotes.get(&symbol) {
                        let tick = tick_message(script.source, &symbol, bid, ask);
                        ws.send(Message::Text(tick.to_string())).await?;
                    }
                }
            }
            Message::Ping(payload) => {
                ws.send(Message::Pong(payload)).await?;
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    Ok(())
}

/// Extract the native symbols a subscribe frame asks for; `None` when
/// the frame is not a subscription in this venue's dialect.
fn requested_symbols(source: SourceId, value: &Value) -> Option<Vec<String>> {
    match source {
        SourceId::BinanceSpot | SourceId::BinanceFutures => {
            if value.get("method").and_then(Value::as_str) != Some("SUBSCRIBE") {
                return None;
            }
            let params = value.get("params")?.as_array()?;
            Some(
                params
                    .iter()
                    .filter_map(Value::as_str)
                    .filter_map(|p| p.strip_suffix("@bookTicker"))
                    .map(str::to_uppercase)
                    .collect(),
            )
        }
        SourceId::BybitSpot | SourceId::BybitFutures => {
            if value.get("op").and_then(Value::as_str) != Some("subscribe") {
                return None;
            }
            let args = value.get("args")?.as_array()?;
            Some(
                args.iter()
                    .filter_map(Value::as_str)
                    .filter_map(|a| a.strip_prefix("tickers."))
                    .map(str::to_string)
                    .collect(),
            )
        }
        SourceId::OkxSpot | SourceId::OkxFutures => {
            if value.get("op").and_then(Value::as_str) != Some("subscribe") {
                return None;
            }
            let args = value.get("args")?.as_array()?;
            Some(
                args.iter()
                    .filter_map(|arg| arg.get("instId").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect(),
            )
        }
        SourceId::MexcSpot => {
            if value.get("method").and_then(Value::as_str) != Some("SUBSCRIPTION") {
                return None;
            }
            let params = value.get("params")?.as_array()?;
            Some(
                params
                    .iter()
                    .filter_map(Value::as_str)
                    .filter_map(|p| p.rsplit('@').next())
                    .map(str::to_string)
                    .collect(),
            )
        }
        SourceId::MexcFutures => {
            if value.get("method").and_then(Value::as_str) != Some("sub.ticker") {
                return None;
            }
            let symbol = value.get("param")?.get("symbol")?.as_str()?;
            Some(vec![symbol.to_string()])
        }
    }
}

fn ack(source: SourceId, request: &Value) -> Value {
    match source {
        SourceId::BinanceSpot | SourceId::BinanceFutures => {
            json!({ "result": null, "id": request.get("id").cloned().unwrap_or(json!(0)) })
        }
        SourceId::BybitSpot | SourceId::BybitFutures => {
            json!({ "op": "subscribe", "success": true, "conn_id": "mock" })
        }
        SourceId::OkxSpot | SourceId::OkxFutures => {
            json!({ "event": "subscribe", "arg": request.get("args").and_then(|a| a.get(0)).cloned() })
        }
        SourceId::MexcSpot => json!({ "id": 0, "code": 0, "msg": "subscribed" }),
        SourceId::MexcFutures => json!({ "channel": "rs.sub.ticker", "data": "success" }),
    }
}

fn rejection(source: SourceId, request: &Value) -> Value {
    match source {
        SourceId::BinanceSpot | SourceId::BinanceFutures => json!({
            "error": { "code": 2, "msg": "Invalid request" },
            "id": request.get("id").cloned().unwrap_or(json!(0)),
        }),
        SourceId::BybitSpot | SourceId::BybitFutures => {
            json!({ "op": "subscribe", "success": false, "ret_msg": "args over limit" })
        }
        SourceId::OkxSpot | SourceId::OkxFutures => {
            json!({ "event": "error", "code": "60012", "msg": "Illegal request" })
        }
        SourceId::MexcSpot => json!({ "id": 0, "code": 100, "msg": "Blocked" }),
        SourceId::MexcFutures => json!({ "channel": "rs.error", "data": "Blocked" }),
    }
}

fn tick_message(source: SourceId, symbol: &str, bid: f64, ask: f64) -> Value {
    match source {
        SourceId::BinanceSpot | SourceId::BinanceFutures => json!({
            "u": 1,
            "s": symbol,
            "b": bid.to_string(),
            "B": "1",
            "a": ask.to_string(),
            "A": "1",
        }),
        SourceId::BybitSpot | SourceId::BybitFutures => json!({
            "topic": format!("tickers.{symbol}"),
            "type": "snapshot",
            "data": {
                "symbol": symbol,
                "bid1Price": bid.to_string(),
                "ask1Price": ask.to_string(),
            },
        }),
        SourceId::OkxSpot | SourceId::OkxFutures => json!({
            "arg": { "channel": "tickers", "instId": symbol },
            "data": [{
                "instId": symbol,
                "bidPx": bid.to_string(),
                "askPx": ask.to_string(),
            }],
        }),
        SourceId::MexcSpot => json!({
            "c": format!("spot@public.book_ticker.v3.api.pb@{symbol}"),
            "s": symbol,
            "d": { "b": bid.to_string(), "a": ask.to_string() },
            "t": 1_700_000_000_000u64,
        }),
        SourceId::MexcFutures => json!({
            "channel": "push.ticker",
            "data": { "symbol": symbol, "bid1": bid, "ask1": ask },
            "ts": 1_700_000_000_000u64,
        }),
    }
}
