//! # Fake Cloud
//!
//! One axum server standing in for the three REST surfaces the consumer
//! talks to:
//! - Pub/Sub `:pull` / `:acknowledge`
//! - Maps `geocode` / `elevation` / `timezone` JSON APIs
//! - BigQuery `insertAll`
//!
//! Responses are scripted per route and consumed in order; an empty script
//! falls back to a benign default. Every request is recorded.
//!
//! ```ignore
//! let cloud = FakeCloud::start().await?;
//! cloud.script(Route::Pull, 503, r#"{"error":{"message":"unavailable"}}"#);
//! let source = PubSubSource::new(&queue_config(cloud.endpoint()), retry, None)?;
//! ```

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::Value;
use tokio::task::JoinHandle;

/// Delay before an unscripted pull returns empty, standing in for the long-poll
const EMPTY_PULL_DELAY: Duration = Duration::from_millis(20);

/// Endpoint families served by the fake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Pull,
    Acknowledge,
    InsertAll,
    Geocode,
    Elevation,
    Timezone,
}

impl Route {
    fn default_response(self) -> &'static str {
        match self {
            Self::Pull | Self::Acknowledge => "{}",
            Self::InsertAll => r#"{"kind":"bigquery#tableDataInsertAllResponse"}"#,
            Self::Geocode | Self::Elevation => r#"{"status":"ZERO_RESULTS","results":[]}"#,
            Self::Timezone => r#"{"status":"ZERO_RESULTS"}"#,
        }
    }
}

/// A request as the fake saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
    /// JSON body, `Null` when absent or not JSON
    pub body: Value,
}

type Hook = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Inner {
    scripts: HashMap<Route, VecDeque<(u16, String)>>,
    requests: HashMap<Route, Vec<RecordedRequest>>,
    hooks: HashMap<Route, Vec<Hook>>,
}

#[derive(Clone, Default)]
struct FakeState {
    inner: Arc<Mutex<Inner>>,
}

impl FakeState {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Running fake server; stops when dropped
pub struct FakeCloud {
    endpoint: String,
    state: FakeState,
    server: JoinHandle<()>,
}

impl FakeCloud {
    /// Bind an ephemeral local port and start serving
    pub async fn start() -> std::io::Result<Self> {
        let state = FakeState::default();
        let app = Router::new()
            .route("/v1/projects/{project}/subscriptions/{action}", post(pubsub))
            .route(
                "/bigquery/v2/projects/{project}/datasets/{dataset}/tables/{table}/insertAll",
                post(insert_all),
            )
            .route("/maps/api/{api}/json", get(maps))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            endpoint: format!("http://{addr}"),
            state,
            server,
        })
    }

    /// Base URL to use as every client's endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Queue one response for `route`
    pub fn script(&self, route: Route, status: u16, body: impl Into<String>) {
        self.state
            .lock()
            .scripts
            .entry(route)
            .or_default()
            .push_back((status, body.into()));
    }

    /// Run `hook` on every request to `route`, before the response is sent
    pub fn on_request(&self, route: Route, hook: impl Fn() + Send + Sync + 'static) {
        self.state
            .lock()
            .hooks
            .entry(route)
            .or_default()
            .push(Arc::new(hook));
    }

    /// Requests received on `route`, in arrival order
    pub fn requests(&self, route: Route) -> Vec<RecordedRequest> {
        self.state
            .lock()
            .requests
            .get(&route)
            .cloned()
            .unwrap_or_default()
    }
}

impl Drop for FakeCloud {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn pubsub(
    State(state): State<FakeState>,
    Path((_project, action)): Path<(String, String)>,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let route = match action.rsplit_once(':').map(|(_, verb)| verb) {
        Some("pull") => Route::Pull,
        Some("acknowledge") => Route::Acknowledge,
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    respond(state, route, &uri, &headers, HashMap::new(), &body).await
}

async fn insert_all(
    State(state): State<FakeState>,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    respond(state, Route::InsertAll, &uri, &headers, HashMap::new(), &body).await
}

async fn maps(
    State(state): State<FakeState>,
    Path(api): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let route = match api.as_str() {
        "geocode" => Route::Geocode,
        "elevation" => Route::Elevation,
        "timezone" => Route::Timezone,
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    respond(state, route, &uri, &headers, query, "").await
}

async fn respond(
    state: FakeState,
    route: Route,
    uri: &Uri,
    headers: &HeaderMap,
    query: HashMap<String, String>,
    body: &str,
) -> Response {
    let recorded = RecordedRequest {
        path: uri.path().to_string(),
        query,
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_str(body).unwrap_or(Value::Null),
    };

    let (scripted, hooks) = {
        let mut inner = state.lock();
        inner.requests.entry(route).or_default().push(recorded);
        let scripted = inner.scripts.get_mut(&route).and_then(VecDeque::pop_front);
        let hooks = inner.hooks.get(&route).cloned().unwrap_or_default();
        (scripted, hooks)
    };
    for hook in hooks {
        hook();
    }

    let (status, body) = match scripted {
        Some(response) => response,
        None => {
            if route == Route::Pull {
                tokio::time::sleep(EMPTY_PULL_DELAY).await;
            }
            (200, route.default_response().to_string())
        }
    };
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}
