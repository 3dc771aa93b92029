//! Integration tests for the PostgREST store against a local mock table

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;
use vom_landing::domain::content::NETWORK_ERROR_MESSAGE;
use vom_landing::domain::types::SubscribeResult;
use vom_landing::io::PostgrestStore;
use vom_landing::services::SubscriptionClient;

/// Headers and body of the last insert the mock saw
#[derive(Default)]
struct Seen {
    path: String,
    apikey: Option<String>,
    authorization: Option<String>,
    prefer: Option<String>,
    body: Value,
}

#[derive(Default)]
struct MockTable {
    emails: Mutex<HashSet<String>>,
    last: Mutex<Seen>,
}

fn header(req: &Request<hyper::body::Incoming>, name: &str) -> Option<String> {
    req.headers().get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}

fn reply(status: StatusCode, body: Value) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
    *response.status_mut() = status;
    response
}

async fn handle(
    req: Request<hyper::body::Incoming>,
    table: Arc<MockTable>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path().to_string();
    let apikey = header(&req, "apikey");
    let authorization = header(&req, "authorization");
    let prefer = header(&req, "prefer");
    let body = req.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    *table.last.lock() = Seen { path, apikey, authorization, prefer, body: body.clone() };

    let email = body[0]["email"].as_str().unwrap_or_default().to_string();
    if !email.contains('@') {
        return Ok(reply(
            StatusCode::BAD_REQUEST,
            json!({"code": "23514", "message": "violates check constraint \"email_format\"", "details": null, "hint": null}),
        ));
    }
    if !table.emails.lock().insert(email) {
        return Ok(reply(
            StatusCode::CONFLICT,
            json!({"code": "23505", "message": "duplicate key value violates unique constraint", "details": null, "hint": null}),
        ));
    }
    Ok(reply(StatusCode::CREATED, Value::Null))
}

/// Serve the mock on an ephemeral port, returning its base URL
async fn spawn_mock(table: Arc<MockTable>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            let table = table.clone();
            tokio::spawn(async move {
                let service = service_fn(move |req| handle(req, table.clone()));
                let _ = http1::Builder::new().serve_connection(TokioIo::new(stream), service).await;
            });
        }
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn test_insert_wire_format() {
    let table = Arc::new(MockTable::default());
    let base = spawn_mock(table.clone()).await;
    let store = PostgrestStore::with_endpoint(&base, "anon", "landing_subscribers").unwrap();
    assert_eq!(store.endpoint().path(), "/rest/v1/landing_subscribers");
    let client = SubscriptionClient::new(store);

    assert_eq!(client.subscribe("a@b.com").await, SubscribeResult::ok());

    let seen = table.last.lock();
    assert_eq!(seen.path, "/rest/v1/landing_subscribers");
    assert_eq!(seen.apikey.as_deref(), Some("anon"));
    assert_eq!(seen.authorization.as_deref(), Some("Bearer anon"));
    assert_eq!(seen.prefer.as_deref(), Some("return=minimal"));
    assert_eq!(seen.body[0]["email"], "a@b.com");
    assert!(seen.body[0]["subscribed_at"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_duplicate_email_is_success() {
    let table = Arc::new(MockTable::default());
    let base = spawn_mock(table.clone()).await;
    let client = SubscriptionClient::new(PostgrestStore::with_endpoint(&base, "anon", "t").unwrap());

    assert_eq!(client.subscribe("a@b.com").await, SubscribeResult::ok());
    assert_eq!(client.subscribe("a@b.com").await, SubscribeResult::ok());
    assert_eq!(table.emails.lock().len(), 1);
}

#[tokio::test]
async fn test_other_rejection_carries_remote_message() {
    let table = Arc::new(MockTable::default());
    let base = spawn_mock(table).await;
    let client = SubscriptionClient::new(PostgrestStore::with_endpoint(&base, "anon", "t").unwrap());

    let result = client.subscribe("bad").await;
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("violates check constraint \"email_format\""));
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    // Bind then drop to get a port nothing listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let store = PostgrestStore::with_endpoint(&format!("http://{addr}"), "anon", "t").unwrap();
    let result = SubscriptionClient::new(store).subscribe("a@b.com").await;

    assert_eq!(result, SubscribeResult::failed(NETWORK_ERROR_MESSAGE));
}
