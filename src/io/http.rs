//! Landing page HTTP server
//!
//! Routes:
//! - `GET /` creates a session and redirects to `/s/{id}`
//! - `GET /s/{id}`, `GET /s/{id}/fragment` render HTML
//! - `GET /api/s/{id}/state` JSON snapshot, `DELETE /api/s/{id}` teardown
//! - `POST /api/s/{id}/...` widget actions (see `Action`)
//! - `POST /api/s/{id}/chat` `{text, response?}`, `POST /api/s/{id}/subscribe` `{email}`
//! - `GET /health`, `GET /metrics` (Prometheus text format)
//!
//! Handlers never fail: errors become JSON bodies with a matching status.

use crate::domain::types::{ActiveTab, SubscribeResult, TagCard};
use crate::infra::metrics::{Metrics, MetricsSummary, METRICS_BUCKET_BOUNDS, METRICS_NUM_BUCKETS};
use crate::io::render::{render_fragment, render_page};
use crate::services::page::{LandingPage, PageSnapshot};
use crate::services::session::{SessionError, SessionRegistry};
use crate::services::subscription::{SubscriberStore, SubscriptionClient};
use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CACHE_CONTROL, CONTENT_TYPE, LOCATION};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Largest accepted JSON request body
pub const MAX_BODY_BYTES: usize = 16 * 1024;

const CONTENT_HTML: &str = "text/html; charset=utf-8";
const CONTENT_JSON: &str = "application/json";
const CONTENT_PROMETHEUS: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Shared state handed to every connection
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub subscription: SubscriptionClient<Arc<dyn SubscriberStore>>,
    pub metrics: Arc<Metrics>,
}

/// Widget action without a request body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Tag(TagCard),
    ScreenOff,
    Tab(ActiveTab),
    Voice,
    VideoPlay(usize),
    VideoNext,
    VideoPrev,
    VideoPause,
}

impl Action {
    fn parse(rest: &[&str]) -> Option<Self> {
        match rest {
            ["tag", card] => card.parse().ok().map(Action::Tag),
            ["screen", "off"] => Some(Action::ScreenOff),
            ["tab", tab] => tab.parse().ok().map(Action::Tab),
            ["voice"] => Some(Action::Voice),
            ["video", "next"] => Some(Action::VideoNext),
            ["video", "prev"] => Some(Action::VideoPrev),
            ["video", "pause"] => Some(Action::VideoPause),
            ["video", index, "play"] => index.parse().ok().map(Action::VideoPlay),
            _ => None,
        }
    }

    /// Apply to the page; false when a guard ignored it
    pub fn apply(self, page: &mut LandingPage) -> bool {
        match self {
            Action::Tag(card) => page.view.tag(card),
            Action::ScreenOff => {
                page.view.turn_off();
                true
            }
            Action::Tab(tab) => {
                page.view.set_active_tab(tab);
                true
            }
            Action::Voice => page.voice.start(),
            Action::VideoPlay(index) => page.video.play(index),
            Action::VideoNext => page.video.swipe_next(),
            Action::VideoPrev => page.video.swipe_prev(),
            Action::VideoPause => page.video.pause(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Index,
    Page(Uuid),
    Fragment(Uuid),
    State(Uuid),
    Close(Uuid),
    Action(Uuid, Action),
    Chat(Uuid),
    Subscribe(Uuid),
    Health,
    Metrics,
    NotFound,
}

impl Route {
    pub fn parse(method: &Method, path: &str) -> Self {
        let segments: Vec<&str> = path.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect();

        match (method, segments.as_slice()) {
            (&Method::GET, []) => Route::Index,
            (&Method::GET, ["health"]) => Route::Health,
            (&Method::GET, ["metrics"]) => Route::Metrics,
            (&Method::GET, ["s", id]) => Self::with_id(id, Route::Page),
            (&Method::GET, ["s", id, "fragment"]) => Self::with_id(id, Route::Fragment),
            (&Method::GET, ["api", "s", id, "state"]) => Self::with_id(id, Route::State),
            (&Method::DELETE, ["api", "s", id]) => Self::with_id(id, Route::Close),
            (&Method::POST, ["api", "s", id, "chat"]) => Self::with_id(id, Route::Chat),
            (&Method::POST, ["api", "s", id, "subscribe"]) => Self::with_id(id, Route::Subscribe),
            (&Method::POST, ["api", "s", id, rest @ ..]) => match Action::parse(rest) {
                Some(action) => Self::with_id(id, |id| Route::Action(id, action)),
                None => Route::NotFound,
            },
            _ => Route::NotFound,
        }
    }

    fn with_id(id: &str, f: impl FnOnce(Uuid) -> Route) -> Route {
        Uuid::parse_str(id).map(f).unwrap_or(Route::NotFound)
    }
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    text: String,
    #[serde(default)]
    response: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubscribeRequest {
    email: String,
}

#[derive(Debug, Serialize)]
struct ActionReply {
    accepted: bool,
    state: PageSnapshot,
}

#[derive(Debug, Serialize)]
struct ErrorReply<'a> {
    error: &'a str,
}

fn respond(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response.headers_mut().insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn json<T: Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(value) {
        Ok(body) => respond(status, CONTENT_JSON, body),
        Err(e) => {
            error!(error = %e, "http_json_encode_error");
            respond(StatusCode::INTERNAL_SERVER_ERROR, CONTENT_JSON, r#"{"error":"internal"}"#)
        }
    }
}

fn json_error(status: StatusCode, error: &str) -> Response<Full<Bytes>> {
    json(status, &ErrorReply { error })
}

fn session_error(e: SessionError) -> Response<Full<Bytes>> {
    match e {
        SessionError::NotFound => json_error(StatusCode::NOT_FOUND, "session_not_found"),
        SessionError::AtCapacity => json_error(StatusCode::SERVICE_UNAVAILABLE, "too_many_sessions"),
    }
}

fn redirect(location: &str) -> Response<Full<Bytes>> {
    let mut response = respond(StatusCode::SEE_OTHER, CONTENT_HTML, Bytes::new());
    match HeaderValue::from_str(location) {
        Ok(value) => {
            response.headers_mut().insert(LOCATION, value);
            response
        }
        Err(_) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "bad_redirect"),
    }
}

/// Read and decode a size-limited JSON body
async fn read_json<T: DeserializeOwned>(req: Request<Incoming>) -> Result<T, Response<Full<Bytes>>> {
    let body = Limited::new(req.into_body(), MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "body_too_large"))?
        .to_bytes();

    serde_json::from_slice(&body).map_err(|e| {
        debug!(error = %e, "http_bad_json");
        json_error(StatusCode::BAD_REQUEST, "invalid_json")
    })
}

async fn handle_request(req: Request<Incoming>, state: Arc<AppState>) -> Result<Response<Full<Bytes>>, Infallible> {
    let route = Route::parse(req.method(), req.uri().path());

    let response = match route {
        Route::Index => match state.registry.create() {
            Ok(id) => redirect(&format!("/s/{id}")),
            Err(e) => session_error(e),
        },
        Route::Page(id) => match state.registry.with_page(id, |page| page.snapshot()) {
            Ok(snap) => respond(StatusCode::OK, CONTENT_HTML, render_page(id, &snap)),
            // Stale bookmark: start over with a fresh session
            Err(SessionError::NotFound) => redirect("/"),
            Err(e) => session_error(e),
        },
        Route::Fragment(id) => match state.registry.with_page(id, |page| page.snapshot()) {
            Ok(snap) => respond(StatusCode::OK, CONTENT_HTML, render_fragment(id, &snap, &chrono::Local::now())),
            Err(e) => session_error(e),
        },
        Route::State(id) => match state.registry.with_page(id, |page| page.snapshot()) {
            Ok(snap) => json(StatusCode::OK, &snap),
            Err(e) => session_error(e),
        },
        Route::Close(id) => match state.registry.remove(id) {
            Ok(()) => respond(StatusCode::NO_CONTENT, CONTENT_JSON, Bytes::new()),
            Err(e) => session_error(e),
        },
        Route::Action(id, action) => {
            let result = state.registry.with_page(id, |page| {
                let accepted = action.apply(page);
                ActionReply { accepted, state: page.snapshot() }
            });
            match result {
                Ok(reply) => {
                    state.metrics.record_demo_action(reply.accepted);
                    debug!(session = %id, action = ?action, accepted = reply.accepted, "demo_action");
                    json(StatusCode::OK, &reply)
                }
                Err(e) => session_error(e),
            }
        }
        Route::Chat(id) => match read_json::<ChatRequest>(req).await {
            Ok(body) => {
                let result = state.registry.with_page(id, |page| {
                    let accepted = page.chat.handle_send(&body.text, body.response.as_deref());
                    ActionReply { accepted, state: page.snapshot() }
                });
                match result {
                    Ok(reply) => {
                        state.metrics.record_demo_action(reply.accepted);
                        json(StatusCode::OK, &reply)
                    }
                    Err(e) => session_error(e),
                }
            }
            Err(response) => response,
        },
        Route::Subscribe(id) => match read_json::<SubscribeRequest>(req).await {
            Ok(body) => subscribe(state, id, &body.email).await,
            Err(response) => response,
        },
        Route::Health => {
            let body = serde_json::json!({
                "status": "ok",
                "git_hash": env!("GIT_HASH"),
                "sessions": state.registry.len(),
            });
            json(StatusCode::OK, &body)
        }
        Route::Metrics => {
            let body = format_prometheus_metrics(&state.metrics.report());
            respond(StatusCode::OK, CONTENT_PROMETHEUS, body)
        }
        Route::NotFound => json_error(StatusCode::NOT_FOUND, "not_found"),
    };

    Ok(response)
}

/// Form submit: gate on the form's loading flag, then insert and record the
/// outcome on a detached task. The task finishes even if the client hangs up,
/// so the loading flag is always released.
async fn subscribe(state: Arc<AppState>, id: Uuid, email: &str) -> Response<Full<Bytes>> {
    if email.trim().is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "email_required");
    }

    let email = match state.registry.with_page(id, |page| page.form.begin(email)) {
        Ok(Some(email)) => email,
        Ok(None) => return json_error(StatusCode::CONFLICT, "subscribe_in_progress"),
        Err(e) => return session_error(e),
    };

    let task = tokio::spawn(async move {
        let result: SubscribeResult = state.subscription.subscribe(&email).await;

        // Session may have been closed while the insert was in flight
        if let Err(e) = state.registry.with_page(id, |page| page.form.complete(&result)) {
            debug!(session = %id, error = %e, "subscribe_session_gone");
        }
        result
    });

    match task.await {
        Ok(result) => json(StatusCode::OK, &result),
        Err(e) => {
            error!(session = %id, error = %e, "subscribe_task_failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal")
        }
    }
}

/// Prometheus metric type
enum MetricType {
    Counter,
    Gauge,
}

impl MetricType {
    fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
        }
    }
}

fn write_metric(output: &mut String, name: &str, help: &str, typ: MetricType, val: u64) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} {}", typ.as_str());
    let _ = writeln!(output, "{name} {val}");
}

fn write_histogram(
    output: &mut String,
    name: &str,
    help: &str,
    buckets: &[u64; METRICS_NUM_BUCKETS],
    bounds: &[u64; 10],
    avg: u64,
) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} histogram");

    let mut cumulative = 0u64;
    for (i, &bound) in bounds.iter().enumerate() {
        cumulative += buckets[i];
        let _ = writeln!(output, "{name}_bucket{{le=\"{bound}\"}} {cumulative}");
    }
    cumulative += buckets[METRICS_NUM_BUCKETS - 1];
    let _ = writeln!(output, "{name}_bucket{{le=\"+Inf\"}} {cumulative}");

    let count: u64 = buckets.iter().sum();
    let _ = writeln!(output, "{name}_sum {}", avg * count);
    let _ = writeln!(output, "{name}_count {count}");
}

/// Format metrics in Prometheus text exposition format
fn format_prometheus_metrics(summary: &MetricsSummary) -> String {
    let mut output = String::with_capacity(4096);

    write_metric(&mut output, "landing_uptime_seconds", "Seconds since start", MetricType::Gauge, summary.uptime_secs);

    write_metric(
        &mut output,
        "landing_subscribe_attempts_total",
        "Subscribe calls made",
        MetricType::Counter,
        summary.subscribe_attempts,
    );
    write_metric(
        &mut output,
        "landing_subscribe_inserted_total",
        "New subscriber rows inserted",
        MetricType::Counter,
        summary.subscribe_inserted,
    );
    write_metric(
        &mut output,
        "landing_subscribe_duplicate_total",
        "Subscribes answered with a uniqueness violation",
        MetricType::Counter,
        summary.subscribe_duplicate,
    );
    write_metric(
        &mut output,
        "landing_subscribe_rejected_total",
        "Subscribes rejected by the backend",
        MetricType::Counter,
        summary.subscribe_rejected,
    );
    write_metric(
        &mut output,
        "landing_subscribe_network_errors_total",
        "Subscribes that never reached the backend",
        MetricType::Counter,
        summary.subscribe_network_errors,
    );
    write_histogram(
        &mut output,
        "landing_subscribe_latency_ms",
        "Subscribe round-trip latency in milliseconds",
        &summary.subscribe_lat_buckets,
        &METRICS_BUCKET_BOUNDS,
        summary.subscribe_lat_avg_ms,
    );

    write_metric(
        &mut output,
        "landing_sessions_active",
        "Live demo sessions",
        MetricType::Gauge,
        summary.sessions_active,
    );
    write_metric(
        &mut output,
        "landing_sessions_created_total",
        "Demo sessions created",
        MetricType::Counter,
        summary.sessions_created,
    );
    write_metric(
        &mut output,
        "landing_sessions_expired_total",
        "Demo sessions torn down after idling",
        MetricType::Counter,
        summary.sessions_expired,
    );
    write_metric(
        &mut output,
        "landing_sessions_rejected_total",
        "Session creations refused at capacity",
        MetricType::Counter,
        summary.sessions_rejected,
    );
    write_metric(
        &mut output,
        "landing_demo_actions_total",
        "Widget actions received",
        MetricType::Counter,
        summary.demo_actions,
    );
    write_metric(
        &mut output,
        "landing_demo_actions_ignored_total",
        "Widget actions ignored by a guard",
        MetricType::Counter,
        summary.demo_actions_ignored,
    );
    write_metric(
        &mut output,
        "landing_timers_cancelled_total",
        "Pending widget timers cancelled at teardown",
        MetricType::Counter,
        summary.timers_cancelled,
    );

    output
}

/// Serve on an already bound listener until shutdown
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!(addr = %listener.local_addr()?, "http_server_started");

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let state = state.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let state = state.clone();
                                async move { handle_request(req, state).await }
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                error!(error = %e, "http_connection_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "http_accept_error");
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("http_server_shutdown");
                    return Ok(());
                }
            }
        }
    }
}

/// Bind `addr` and serve the landing page
pub async fn start_http_server(
    addr: SocketAddr,
    state: Arc<AppState>,
    shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;
    serve(listener, state, shutdown).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> Uuid {
        Uuid::now_v7()
    }

    #[test]
    fn test_parse_static_routes() {
        assert_eq!(Route::parse(&Method::GET, "/"), Route::Index);
        assert_eq!(Route::parse(&Method::GET, "/health"), Route::Health);
        assert_eq!(Route::parse(&Method::GET, "/metrics"), Route::Metrics);
        assert_eq!(Route::parse(&Method::POST, "/health"), Route::NotFound);
        assert_eq!(Route::parse(&Method::GET, "/nope"), Route::NotFound);
    }

    #[test]
    fn test_parse_session_routes() {
        let id = id();
        assert_eq!(Route::parse(&Method::GET, &format!("/s/{id}")), Route::Page(id));
        assert_eq!(Route::parse(&Method::GET, &format!("/s/{id}/fragment")), Route::Fragment(id));
        assert_eq!(Route::parse(&Method::GET, &format!("/api/s/{id}/state")), Route::State(id));
        assert_eq!(Route::parse(&Method::DELETE, &format!("/api/s/{id}")), Route::Close(id));
        assert_eq!(Route::parse(&Method::POST, &format!("/api/s/{id}/chat")), Route::Chat(id));
        assert_eq!(Route::parse(&Method::POST, &format!("/api/s/{id}/subscribe")), Route::Subscribe(id));
    }

    #[test]
    fn test_parse_actions() {
        let id = id();
        let action = |path: &str| Route::parse(&Method::POST, &format!("/api/s/{id}/{path}"));

        assert_eq!(action("tag/feeding"), Route::Action(id, Action::Tag(TagCard::Feeding)));
        assert_eq!(action("screen/off"), Route::Action(id, Action::ScreenOff));
        assert_eq!(action("tab/growth"), Route::Action(id, Action::Tab(ActiveTab::Growth)));
        assert_eq!(action("voice"), Route::Action(id, Action::Voice));
        assert_eq!(action("video/3/play"), Route::Action(id, Action::VideoPlay(3)));
        assert_eq!(action("video/next"), Route::Action(id, Action::VideoNext));
        assert_eq!(action("video/prev"), Route::Action(id, Action::VideoPrev));
        assert_eq!(action("video/pause"), Route::Action(id, Action::VideoPause));

        assert_eq!(action("tag/bottle"), Route::NotFound);
        assert_eq!(action("video/-1/play"), Route::NotFound);
        assert_eq!(action("explode"), Route::NotFound);
    }

    #[test]
    fn test_parse_bad_session_id() {
        assert_eq!(Route::parse(&Method::GET, "/s/not-a-uuid"), Route::NotFound);
        assert_eq!(Route::parse(&Method::POST, "/api/s/123/voice"), Route::NotFound);
    }

    #[test]
    fn test_action_apply_reports_guards() {
        let mut page = LandingPage::new();
        assert!(Action::Tag(TagCard::Feeding).apply(&mut page));
        assert!(!Action::Tag(TagCard::Diaper).apply(&mut page));
        assert!(!Action::VideoPrev.apply(&mut page));
        assert!(Action::VideoNext.apply(&mut page));
        assert!(!Action::VideoPause.apply(&mut page));
    }

    #[test]
    fn test_format_prometheus_metrics() {
        let metrics = Metrics::new();
        metrics.record_session_created();
        metrics.record_subscribe(crate::infra::metrics::SubscribeOutcome::Duplicate, 120);

        let output = format_prometheus_metrics(&metrics.report());
        assert!(output.contains("landing_sessions_active 1"));
        assert!(output.contains("landing_subscribe_duplicate_total 1"));
        assert!(output.contains("landing_subscribe_latency_ms_bucket{le=\"200\"} 1"));
        assert!(output.contains("landing_subscribe_latency_ms_bucket{le=\"100\"} 0"));
        assert!(output.contains("landing_subscribe_latency_ms_count 1"));
    }
}
