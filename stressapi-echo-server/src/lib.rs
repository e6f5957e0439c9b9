use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::{Map, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

pub mod config;
use config::STATS_INTERVAL;

/// Abstraction over the monotonic clock for testability.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Production clock backed by `Instant::now`.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Counts handled requests and reports the average rate between reads.
pub struct RequestMeter {
    clock: Arc<dyn Clock>,
    count: AtomicU64,
    since: Mutex<Instant>,
}

impl RequestMeter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let since = clock.now();
        Self { clock, count: AtomicU64::new(0), since: Mutex::new(since) }
    }

    pub fn mark(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Requests per second since the previous call, then start over.
    pub fn take_average(&self) -> f64 {
        let now = self.clock.now();
        let mut since = self.since.lock();
        let count = self.count.swap(0, Ordering::Relaxed);
        let elapsed = now.saturating_duration_since(*since).as_secs_f64();
        *since = now;
        if elapsed <= 0.0 {
            return 0.0;
        }
        count as f64 / elapsed
    }
}

#[derive(Clone)]
pub struct AppState {
    pub meter: Arc<RequestMeter>,
    pub log_requests: bool,
}

impl AppState {
    pub fn new(clock: Arc<dyn Clock>, log_requests: bool) -> Self {
        Self { meter: Arc::new(RequestMeter::new(clock)), log_requests }
    }

    fn served(&self, method: &str, path: &str, status: StatusCode) {
        self.meter.mark();
        if self.log_requests {
            info!("{} {method} {path}", status.as_u16());
        } else {
            debug!("{} {method} {path}", status.as_u16());
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: SocketAddr,
    pub log_requests: bool,
}

/// Echo server used to smoke-test the load generator.
pub struct Server {
    config: ServerConfig,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub fn address(&self) -> SocketAddr {
        self.config.address
    }

    /// Every path answers every supported method.
    pub fn create_router(state: AppState) -> Router {
        let echo = get(handle_get).post(handle_post).put(handle_put).patch(handle_patch).delete(handle_delete);
        Router::new().route("/", echo.clone()).route("/*path", echo).with_state(state)
    }

    /// Run the server, signalling `ready_tx` with the bound address once accepting connections
    pub async fn run(
        self,
        ready_tx: tokio::sync::oneshot::Sender<SocketAddr>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let state = AppState::new(Arc::new(SystemClock), self.config.log_requests);
        let meter = Arc::clone(&state.meter);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(STATS_INTERVAL);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                info!("Average requests: {:.0} per second", meter.take_average());
            }
        });

        let app = Self::create_router(state);
        let listener = tokio::net::TcpListener::bind(self.config.address).await?;
        let local_addr = listener.local_addr()?;
        ready_tx.send(local_addr).ok();
        axum::serve(listener, app).await?;
        Ok(())
    }
}

/// Parse a JSON object body into comma-joined keys and values.
fn keys_and_values(body: &[u8]) -> Result<(String, String), Response> {
    let object: Map<String, Value> = serde_json::from_slice(body).map_err(|e| {
        (StatusCode::BAD_REQUEST, format!("Body must be a JSON object: {e}")).into_response()
    })?;
    let keys: Vec<&str> = object.keys().map(String::as_str).collect();
    let values: Vec<String> = object
        .values()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();
    Ok((keys.join(","), values.join(",")))
}

/// GET: 200 with the request path and the header names.
pub async fn handle_get(State(state): State<AppState>, uri: Uri, headers: HeaderMap) -> Response {
    state.served("GET", uri.path(), StatusCode::OK);
    let names: Vec<&str> = headers.keys().map(|name| name.as_str()).collect();
    format!("GET request path: {} - header keys: {}", uri.path(), names.join(",")).into_response()
}

/// POST: 200 echoing the JSON body keys and values.
pub async fn handle_post(State(state): State<AppState>, uri: Uri, body: Bytes) -> Response {
    let (keys, values) = match keys_and_values(&body) {
        Ok(pair) => pair,
        Err(response) => {
            state.served("POST", uri.path(), StatusCode::BAD_REQUEST);
            return response;
        }
    };
    state.served("POST", uri.path(), StatusCode::OK);
    format!("POST argument keys: {keys} - values: {values}").into_response()
}

/// PUT: 201 echoing the JSON body keys and values.
pub async fn handle_put(State(state): State<AppState>, uri: Uri, body: Bytes) -> Response {
    let (keys, values) = match keys_and_values(&body) {
        Ok(pair) => pair,
        Err(response) => {
            state.served("PUT", uri.path(), StatusCode::BAD_REQUEST);
            return response;
        }
    };
    state.served("PUT", uri.path(), StatusCode::CREATED);
    (StatusCode::CREATED, format!("PUT body argument keys: {keys} - values: {values}")).into_response()
}

/// PATCH: 204, body ignored.
pub async fn handle_patch(State(state): State<AppState>, uri: Uri) -> Response {
    state.served("PATCH", uri.path(), StatusCode::NO_CONTENT);
    StatusCode::NO_CONTENT.into_response()
}

/// DELETE: 202.
pub async fn handle_delete(State(state): State<AppState>, uri: Uri) -> Response {
    state.served("DELETE", uri.path(), StatusCode::ACCEPTED);
    StatusCode::ACCEPTED.into_response()
}
