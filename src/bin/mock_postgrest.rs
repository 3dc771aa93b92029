//! Mock PostgREST subscriber table
//!
//! Emulates the hosted `landing_subscribers` table for local runs.
//!
//! Behavior:
//! - `POST /rest/v1/{table}` with a JSON array of `{email, subscribed_at}` rows
//!   - missing `apikey` header -> 401
//!   - malformed row or email without `@` -> 400, code `23514`
//!   - email already present -> 409, code `23505`
//!   - otherwise -> 201 with an empty body
//! - `GET /rest/v1/{table}` lists stored rows
//! - `--fail-every N` answers every Nth insert with a 500
//!
//! Usage:
//!   cargo run --bin mock-postgrest -- --port 54321
//!   SUPABASE_URL=http://localhost:54321 SUPABASE_ANON_KEY=dev cargo run

use bytes::Bytes;
use clap::Parser;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use vom_landing::services::subscription::UNIQUE_VIOLATION_CODE;

const CHECK_VIOLATION_CODE: &str = "23514";
const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Parser, Debug)]
#[command(name = "mock-postgrest")]
#[command(about = "Mock PostgREST subscriber table for local runs")]
struct Args {
    /// HTTP port to listen on
    #[arg(short, long, default_value = "54321")]
    port: u16,

    /// Table name served under /rest/v1/
    #[arg(short, long, default_value = "landing_subscribers")]
    table: String,

    /// Fail every Nth insert with a 500 (0 = never)
    #[arg(long, default_value = "0")]
    fail_every: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Row {
    email: String,
    subscribed_at: String,
}

#[derive(Debug, Serialize)]
struct PgError<'a> {
    code: &'a str,
    message: String,
    details: Option<String>,
    hint: Option<&'a str>,
}

struct Table {
    name: String,
    rows: Mutex<Vec<Row>>,
    inserts: AtomicU64,
    fail_every: u64,
}

fn reply(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn pg_error(status: StatusCode, error: PgError<'_>) -> Response<Full<Bytes>> {
    let body = serde_json::to_vec(&error).unwrap_or_default();
    reply(status, body)
}

/// Validate and insert rows, all or nothing
fn insert(table: &Table, rows: Vec<Row>) -> Result<usize, (StatusCode, PgError<'static>)> {
    for row in &rows {
        if !row.email.contains('@') {
            return Err((
                StatusCode::BAD_REQUEST,
                PgError {
                    code: CHECK_VIOLATION_CODE,
                    message: format!(
                        "new row for relation \"{}\" violates check constraint \"email_format\"",
                        table.name
                    ),
                    details: None,
                    hint: None,
                },
            ));
        }
    }

    let mut stored = table.rows.lock();
    for row in &rows {
        if stored.iter().any(|r| r.email.eq_ignore_ascii_case(&row.email)) {
            return Err((
                StatusCode::CONFLICT,
                PgError {
                    code: UNIQUE_VIOLATION_CODE,
                    message: format!(
                        "duplicate key value violates unique constraint \"{}_email_key\"",
                        table.name
                    ),
                    details: Some(format!("Key (email)=({}) already exists.", row.email)),
                    hint: None,
                },
            ));
        }
    }

    let count = rows.len();
    stored.extend(rows);
    Ok(count)
}

async fn handle_request(req: Request<Incoming>, table: Arc<Table>) -> Result<Response<Full<Bytes>>, Infallible> {
    let expected_path = format!("/rest/v1/{}", table.name);
    if req.uri().path() != expected_path {
        return Ok(pg_error(
            StatusCode::NOT_FOUND,
            PgError {
                code: "42P01",
                message: format!("relation \"public.{}\" does not exist", req.uri().path()),
                details: None,
                hint: None,
            },
        ));
    }

    if !req.headers().contains_key("apikey") {
        return Ok(pg_error(
            StatusCode::UNAUTHORIZED,
            PgError {
                code: "PGRST301",
                message: "No API key found in request".to_string(),
                details: None,
                hint: Some("No `apikey` request header or url param was found."),
            },
        ));
    }

    let method = req.method().clone();
    match method {
        Method::GET => {
            let rows = table.rows.lock().clone();
            Ok(reply(StatusCode::OK, serde_json::to_vec(&rows).unwrap_or_default()))
        }
        Method::POST => {
            let n = table.inserts.fetch_add(1, Ordering::Relaxed) + 1;
            if table.fail_every > 0 && n % table.fail_every == 0 {
                println!("[MOCK] Insert #{} -> injected failure", n);
                return Ok(pg_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    PgError {
                        code: "XX000",
                        message: "injected failure".to_string(),
                        details: None,
                        hint: None,
                    },
                ));
            }

            let body = match Limited::new(req.into_body(), MAX_BODY_BYTES).collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(e) => {
                    eprintln!("[MOCK] Body read error: {}", e);
                    return Ok(reply(StatusCode::PAYLOAD_TOO_LARGE, Bytes::new()));
                }
            };

            let rows: Vec<Row> = match serde_json::from_slice(&body) {
                Ok(rows) => rows,
                Err(e) => {
                    return Ok(pg_error(
                        StatusCode::BAD_REQUEST,
                        PgError {
                            code: "PGRST102",
                            message: format!("Invalid body: {e}"),
                            details: None,
                            hint: None,
                        },
                    ))
                }
            };

            match insert(&table, rows) {
                Ok(count) => {
                    println!("[MOCK] Inserted {} row(s), {} total", count, table.rows.lock().len());
                    Ok(reply(StatusCode::CREATED, Bytes::new()))
                }
                Err((status, error)) => {
                    println!("[MOCK] Insert rejected: {} {}", error.code, error.message);
                    Ok(pg_error(status, error))
                }
            }
        }
        _ => Ok(reply(StatusCode::METHOD_NOT_ALLOWED, Bytes::new())),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    println!("[MOCK] PostgREST mock serving /rest/v1/{} on port {}", args.table, args.port);
    if args.fail_every > 0 {
        println!("[MOCK] Failing every {} insert(s)", args.fail_every);
    }

    let table = Arc::new(Table {
        name: args.table,
        rows: Mutex::new(Vec::new()),
        inserts: AtomicU64::new(0),
        fail_every: args.fail_every,
    });

    let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], args.port))).await?;

    loop {
        let (stream, peer) = listener.accept().await?;
        let table = table.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| handle_request(req, table.clone()));
            if let Err(e) = http1::Builder::new().serve_connection(TokioIo::new(stream), service).await {
                eprintln!("[MOCK] Connection error from {}: {}", peer, e);
            }
        });
    }
}
