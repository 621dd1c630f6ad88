use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use parking_lot::Mutex;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

const WEBHOOK_PATH: &str = "/webhook/report";

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    content_type: &'static str,
    body: String,
    delay: Option<Duration>,
    broken_body: bool,
    hits: Arc<AtomicUsize>,
    bodies: Arc<Mutex<Vec<Value>>>,
}

/// Local HTTP server that answers every POST with a fixed status and body.
pub struct MockWebhook {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    bodies: Arc<Mutex<Vec<Value>>>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl MockWebhook {
    /// Answer with a JSON body.
    pub async fn json(status: u16, body: Value) -> Self {
        Self::start(status, "application/json", body.to_string(), None, false).await
    }

    /// Answer with a plain-text body.
    pub async fn text(status: u16, body: &str) -> Self {
        Self::start(status, "text/plain", body.to_string(), None, false).await
    }

    /// Answer with a JSON body after a delay.
    pub async fn delayed(status: u16, body: Value, delay: Duration) -> Self {
        Self::start(status, "application/json", body.to_string(), Some(delay), false).await
    }

    /// Send the status line and headers, then abort the connection halfway
    /// through the body.
    pub async fn broken_body(status: u16, body: Value) -> Self {
        Self::start(status, "application/json", body.to_string(), None, true).await
    }

    async fn start(
        status: u16,
        content_type: &'static str,
        body: String,
        delay: Option<Duration>,
        broken_body: bool,
    ) -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let bodies = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            content_type,
            body,
            delay,
            broken_body,
            hits: hits.clone(),
            bodies: bodies.clone(),
        };
        let app = Router::new()
            .route(WEBHOOK_PATH, post(answer))
            .with_state(state);
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock webhook");
        let addr = listener.local_addr().expect("mock webhook address");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
        });
        Self {
            addr,
            hits,
            bodies,
            shutdown: Some(shutdown_tx),
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}{}", self.addr, WEBHOOK_PATH)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// JSON bodies received so far, in arrival order.
    pub fn received(&self) -> Vec<Value> {
        self.bodies.lock().clone()
    }
}

impl Drop for MockWebhook {
    fn drop(&mut self) {
        if let Some(sender) = self.shutdown.take() {
            let _ = sender.send(());
        }
    }
}

async fn answer(State(state): State<MockState>, body: Bytes) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    if let Ok(value) = serde_json::from_slice::<Value>(&body) {
        state.bodies.lock().push(value);
    }
    if let Some(delay) = state.delay {
        tokio::time::sleep(delay).await;
    }
    if state.broken_body {
        let half = state.body.len() / 2;
        let head = Bytes::from(state.body.as_bytes()[..half].to_vec());
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(head),
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionAborted,
                "mock webhook aborted the body",
            )),
        ];
        return (
            state.status,
            [(header::CONTENT_TYPE, state.content_type)],
            Body::from_stream(futures_util::stream::iter(chunks)),
        )
            .into_response();
    }
    (
        state.status,
        [(header::CONTENT_TYPE, state.content_type)],
        state.body.clone(),
    )
        .into_response()
}
