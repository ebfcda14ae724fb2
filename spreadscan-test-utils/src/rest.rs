//! Scripted HTTP endpoint: serves a fixed body, optionally failing the
//! first N requests with a chosen status.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server, StatusCode};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// What the endpoint should serve.
#[derive(Clone, Debug)]
pub struct EndpointScript {
    pub body: String,
    /// Respond `fail_status` to this many requests before succeeding.
    pub fail_first: usize,
    pub fail_status: u16,
}

impl EndpointScript {
    #[must_use]
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            fail_first: 0,
            fail_status: 500,
        }
    }

    /// Always fail with the given status.
    #[must_use]
    pub fn failing(status: u16) -> Self {
        Self {
            body: String::new(),
            fail_first: usize::MAX,
            fail_status: status,
        }
    }

    /// Fail the first `n` requests with `status`, then serve `body`.
    #[must_use]
    pub fn flaky(n: usize, status: u16, body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            fail_first: n,
            fail_status: status,
        }
    }
}

pub struct MockEndpoint {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl MockEndpoint {
    pub async fn spawn(script: EndpointScript) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let addr = listener.local_addr()?;
        let std_listener = listener.into_std()?;
        std_listener.set_nonblocking(true)?;
        let hits = Arc::new(AtomicUsize::new(0));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let script = Arc::new(script);
        let hits_for_service = hits.clone();
        let make_svc = make_service_fn(move |_| {
            let script = script.clone();
            let hits = hits_for_service.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |_req: Request<Body>| {
                    let script = script.clone();
                    let hits = hits.clone();
                    async move {
                        let hit = hits.fetch_add(1, Ordering::SeqCst);
                        let response = if hit < script.fail_first {
                            Response::builder()
                                .status(
                                    StatusCode::from_u16(script.fail_status)
                                        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                                )
                                .body(Body::from("scripted failure"))
                                .unwrap()
                        } else {
                            Response::builder()
                                .status(StatusCode::OK)
                                .header("Content-Type", "application/json")
                                .body(Body::from(script.body.clone()))
                                .unwrap()
                        };
                        Ok::<_, Infallible>(response)
                    }
                }))
            }
        });

        let server = Server::from_tcp(std_listener)?.serve(make_svc);
        let handle = tokio::spawn(async move {
            if let Err(err) = server
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
            {
                tracing::error!(error = %err, "mock endpoint exited with error");
            }
        });

        Ok(Self {
            addr,
            hits,
            shutdown_tx: Some(shutdown_tx),
            handle,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Requests served so far (including scripted failures).
    #[must_use]
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.handle.abort();
    }
}

impl Drop for MockEndpoint {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.handle.abort();
    }
}
