//! End-to-end tests for the landing page HTTP server

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{redirect, Client, StatusCode};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use vom_landing::domain::types::SubscriptionRecord;
use vom_landing::infra::Metrics;
use vom_landing::io::http::serve;
use vom_landing::io::AppState;
use vom_landing::services::subscription::{StoreError, UNIQUE_VIOLATION_CODE};
use vom_landing::services::{SessionRegistry, SubscriberStore, SubscriptionClient};

/// In-memory subscriber table with an email check and optional latency
#[derive(Default)]
struct MemoryStore {
    emails: Mutex<HashSet<String>>,
    delay: Duration,
}

impl MemoryStore {
    fn slow(delay: Duration) -> Self {
        Self { delay, ..Self::default() }
    }
}

#[async_trait]
impl SubscriberStore for MemoryStore {
    async fn insert(&self, record: &SubscriptionRecord) -> Result<(), StoreError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if !record.email.contains('@') {
            return Err(StoreError::Rejected {
                code: Some("23514".to_string()),
                message: "violates check constraint \"email_format\"".to_string(),
            });
        }
        if !self.emails.lock().insert(record.email.clone()) {
            return Err(StoreError::Rejected {
                code: Some(UNIQUE_VIOLATION_CODE.to_string()),
                message: "duplicate".to_string(),
            });
        }
        Ok(())
    }
}

struct TestServer {
    base: String,
    client: Client,
    _shutdown: watch::Sender<bool>,
}

impl TestServer {
    async fn start(max_sessions: usize) -> Self {
        Self::start_with_store(max_sessions, MemoryStore::default()).await
    }

    async fn start_with_store(max_sessions: usize, store: MemoryStore) -> Self {
        let metrics = Arc::new(Metrics::new());
        let registry = Arc::new(SessionRegistry::new(Duration::from_secs(60), max_sessions, metrics.clone()));
        let store: Arc<dyn SubscriberStore> = Arc::new(store);
        let state = Arc::new(AppState {
            registry,
            subscription: SubscriptionClient::new(store).with_metrics(metrics.clone()),
            metrics,
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            serve(listener, state, rx).await.unwrap();
        });

        let client = Client::builder().redirect(redirect::Policy::none()).build().unwrap();
        Self { base, client, _shutdown: tx }
    }

    /// Create a session through `GET /` and return its id
    async fn session(&self) -> String {
        let res = self.client.get(format!("{}/", self.base)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        let location = res.headers()["location"].to_str().unwrap().to_string();
        location.strip_prefix("/s/").unwrap().to_string()
    }

    async fn post(&self, id: &str, path: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = self.client.post(format!("{}/api/s/{id}/{path}", self.base));
        if let Some(body) = body {
            req = req.json(&body);
        }
        let res = req.send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn state(&self, id: &str) -> (StatusCode, Value) {
        let res = self.client.get(format!("{}/api/s/{id}/state", self.base)).send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }
}

#[tokio::test]
async fn test_page_renders_for_new_session() {
    let server = TestServer::start(10).await;
    let id = server.session().await;

    let res = server.client.get(format!("{}/s/{id}", server.base)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let html = res.text().await.unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains(&format!(r#"data-session="{id}""#)));

    let (status, state) = server.state(&id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state["screen_mode"], "off");
    assert_eq!(state["voice"]["phase"], "idle");
}

#[tokio::test]
async fn test_tag_guard_over_http() {
    let server = TestServer::start(10).await;
    let id = server.session().await;

    let (status, reply) = server.post(&id, "tag/feeding", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["accepted"], true);
    assert_eq!(reply["state"]["tagging"], "feeding");

    let (_, reply) = server.post(&id, "tag/diaper", None).await;
    assert_eq!(reply["accepted"], false);

    tokio::time::sleep(Duration::from_millis(900)).await;
    let (_, state) = server.state(&id).await;
    assert_eq!(state["screen_mode"], "feeding");
}

#[tokio::test]
async fn test_chat_and_bad_body() {
    let server = TestServer::start(10).await;
    let id = server.session().await;

    let (status, reply) = server.post(&id, "chat", Some(json!({"text": "안녕", "response": "반가워요"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["accepted"], true);
    assert_eq!(reply["state"]["chat"]["messages"][0]["text"], "안녕");

    let (status, reply) = server.post(&id, "chat", Some(json!({"nope": 1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(reply["error"], "invalid_json");
}

#[tokio::test]
async fn test_subscribe_twice_succeeds() {
    let server = TestServer::start(10).await;
    let id = server.session().await;

    for _ in 0..2 {
        let (status, reply) = server.post(&id, "subscribe", Some(json!({"email": "a@b.com"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply, json!({"success": true}));
    }

    let (_, state) = server.state(&id).await;
    assert_eq!(state["form"]["submitted"], true);
    assert_eq!(state["form"]["is_loading"], false);

    let (status, _) = server.post(&id, "subscribe", Some(json!({"email": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_subscribe_rejection_shown_on_form() {
    let server = TestServer::start(10).await;
    let id = server.session().await;

    let (status, reply) = server.post(&id, "subscribe", Some(json!({"email": "not-an-email"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["success"], false);
    assert_eq!(reply["error"], "violates check constraint \"email_format\"");

    let (_, state) = server.state(&id).await;
    assert_eq!(state["form"]["is_loading"], false);
    assert_eq!(state["form"]["submitted"], false);
    assert_eq!(state["form"]["error"], "violates check constraint \"email_format\"");
}

#[tokio::test]
async fn test_subscribe_while_loading_conflicts() {
    let server = TestServer::start_with_store(10, MemoryStore::slow(Duration::from_millis(300))).await;
    let id = server.session().await;

    let (first, second) = tokio::join!(server.post(&id, "subscribe", Some(json!({"email": "a@b.com"}))), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        server.post(&id, "subscribe", Some(json!({"email": "c@d.com"}))).await
    });

    assert_eq!(second.0, StatusCode::CONFLICT);
    assert_eq!(second.1["error"], "subscribe_in_progress");
    assert_eq!(first.0, StatusCode::OK);
    assert_eq!(first.1, json!({"success": true}));
}

#[tokio::test]
async fn test_abandoned_subscribe_releases_form() {
    let server = TestServer::start_with_store(10, MemoryStore::slow(Duration::from_millis(500))).await;
    let id = server.session().await;

    // Client gives up long before the insert finishes
    let abandoned = server
        .client
        .post(format!("{}/api/s/{id}/subscribe", server.base))
        .json(&json!({"email": "a@b.com"}))
        .timeout(Duration::from_millis(100))
        .send()
        .await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_millis(1500)).await;

    let (_, state) = server.state(&id).await;
    assert_eq!(state["form"]["is_loading"], false);
    assert_eq!(state["form"]["submitted"], true);

    let (status, reply) = server.post(&id, "subscribe", Some(json!({"email": "a@b.com"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply, json!({"success": true}));
}

#[tokio::test]
async fn test_close_session() {
    let server = TestServer::start(10).await;
    let id = server.session().await;

    let res = server.client.delete(format!("{}/api/s/{id}", server.base)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let (status, reply) = server.state(&id).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(reply["error"], "session_not_found");

    let (status, _) = server.post(&id, "voice", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_capacity_limit() {
    let server = TestServer::start(1).await;
    server.session().await;

    let res = server.client.get(format!("{}/", server.base)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_health_and_metrics() {
    let server = TestServer::start(10).await;
    let id = server.session().await;
    server.post(&id, "voice", None).await;
    server.post(&id, "voice", None).await;

    let health: Value =
        server.client.get(format!("{}/health", server.base)).send().await.unwrap().json().await.unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["sessions"], 1);

    let metrics = server.client.get(format!("{}/metrics", server.base)).send().await.unwrap().text().await.unwrap();
    assert!(metrics.contains("landing_demo_actions_total 2"));
    assert!(metrics.contains("landing_demo_actions_ignored_total 1"));
    assert!(metrics.contains("landing_sessions_active 1"));
}
