//! End-to-end runs against local fake login, audit, and ingestion endpoints.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use prisma_audit_forwarder::auth::{AuthError, LoginTokenProvider};
use prisma_audit_forwarder::config::Credentials;
use prisma_audit_forwarder::forwarder::{AuditLogForwarder, Connector, ConnectorError, RunState};
use prisma_audit_forwarder::sink::{LogAnalyticsSink, LogSink, MemorySink};
use prisma_audit_forwarder::source::{FetchError, FixedClock, PrismaAuditSource};
use prisma_audit_forwarder::watermark::{MemoryWatermarkStore, SqliteWatermarkStore, WatermarkStore};
use serde_json::{json, Value};
use tempfile::TempDir;
use url::Url;

const NOW: i64 = 1_700_000_000;

#[derive(Clone, Default)]
struct Backend {
    records: Arc<Vec<Value>>,
    login_status: Arc<Mutex<Option<StatusCode>>>,
    audit_status: Arc<Mutex<Option<StatusCode>>>,
    logins: Arc<AtomicUsize>,
    audit_requests: Arc<Mutex<Vec<HashMap<String, String>>>>,
    ingested: Arc<Mutex<Vec<(String, Vec<Value>)>>>,
}

async fn login(
    State(backend): State<Backend>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    backend.logins.fetch_add(1, Ordering::SeqCst);
    assert_eq!(body["username"], "access-key");
    if let Some(status) = *backend.login_status.lock().unwrap() {
        return (status, Json(json!({"error": "bad credentials"})));
    }
    (StatusCode::OK, Json(json!({"token": "session-token"})))
}

async fn audit(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    if let Some(status) = *backend.audit_status.lock().unwrap() {
        return (status, Json(json!({"error": "unavailable"})));
    }
    if headers.get("x-redlock-auth").map(|v| v.as_bytes()) != Some(b"session-token".as_slice()) {
        return (StatusCode::UNAUTHORIZED, Json(json!([])));
    }

    let start: i64 = params["startTime"].parse().unwrap();
    let end: i64 = params["endTime"].parse().unwrap();
    backend.audit_requests.lock().unwrap().push(params);

    let matching: Vec<Value> = backend
        .records
        .iter()
        .filter(|r| {
            let ts = r["timestamp"].as_i64().unwrap();
            ts >= start && ts < end
        })
        .cloned()
        .collect();
    (StatusCode::OK, Json(Value::Array(matching)))
}

async fn ingest(State(backend): State<Backend>, headers: HeaderMap, body: Bytes) -> StatusCode {
    let category = headers["log-type"].to_str().unwrap().to_string();
    let records: Vec<Value> = serde_json::from_slice(&body).unwrap();
    backend.ingested.lock().unwrap().push((category, records));
    StatusCode::OK
}

async fn spawn_backend(backend: Backend) -> SocketAddr {
    let router = Router::new()
        .route("/login", post(login))
        .route("/audit/redlock", get(audit))
        .route("/api/logs", post(ingest))
        .with_state(backend);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get address");
    tokio::spawn(async move { axum::serve(listener, router).await });
    addr
}

struct Wiring {
    connector: Connector,
    store: SqliteWatermarkStore,
    sink: Arc<LogAnalyticsSink>,
}

fn audit_source(client: &reqwest::Client, base: &Url) -> Arc<PrismaAuditSource> {
    let tokens = Arc::new(LoginTokenProvider::new(
        client.clone(),
        base.join("/login").unwrap(),
        Credentials {
            username: "access-key".to_string(),
            password: "secret-key".to_string(),
        },
    ));
    Arc::new(PrismaAuditSource::new(
        client.clone(),
        base.join("/audit/redlock").unwrap(),
        tokens,
    ))
}

async fn wire(addr: SocketAddr, temp_dir: &TempDir) -> Wiring {
    let client = reqwest::Client::new();
    let base = Url::parse(&format!("http://{addr}")).unwrap();

    let source = audit_source(&client, &base);
    let sink = Arc::new(
        LogAnalyticsSink::new(client, &base, "ws-1", &STANDARD.encode(b"shared"), 10_000)
            .expect("valid sink"),
    );
    let store = SqliteWatermarkStore::open(temp_dir.path().join("state.db"), "audit")
        .await
        .expect("Failed to open store");

    let forwarder = AuditLogForwarder::new(
        source,
        sink.clone(),
        Arc::new(store.clone()),
        Arc::new(FixedClock(NOW)),
        "PaloAltoSentinel",
    );

    Wiring {
        connector: Connector::new(vec![forwarder], sink.clone()),
        store,
        sink,
    }
}

fn records(timestamps: &[i64]) -> Arc<Vec<Value>> {
    Arc::new(
        timestamps
            .iter()
            .map(|ts| json!({"timestamp": ts, "resource": format!("r-{ts}")}))
            .collect(),
    )
}

/// Two consecutive runs: the first forwards everything in the lookback
/// window, the second resumes after the watermark and finds nothing new.
#[tokio::test]
async fn test_consecutive_runs_resume_from_watermark() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let backend = Backend {
        records: records(&[
            (NOW - 100) * 1000,
            (NOW - 300) * 1000,
            (NOW - 200) * 1000,
            (NOW - 30_000) * 1000,
        ]),
        ..Backend::default()
    };
    let addr = spawn_backend(backend.clone()).await;
    let mut wiring = wire(addr, &temp_dir).await;

    let first = wiring.connector.run().await.expect("first run");
    assert_eq!(first.reports[0].forwarded, 3);
    assert_eq!(first.sent_events, 3);
    assert_eq!(
        wiring.store.get().await.unwrap(),
        Some(((NOW - 100) * 1000).to_string())
    );

    let second = wiring.connector.run().await.expect("second run");
    assert_eq!(second.reports[0].forwarded, 0);
    assert!(!second.reports[0].persisted);
    assert_eq!(
        wiring.store.get().await.unwrap(),
        Some(((NOW - 100) * 1000).to_string())
    );

    let requests = backend.audit_requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0]["timeType"], "absolute");
    assert_eq!(requests[0]["startTime"], ((NOW - 21_600) * 1000).to_string());
    assert_eq!(requests[1]["startTime"], ((NOW - 100) * 1000 + 1).to_string());
    assert_eq!(requests[1]["endTime"], ((NOW - 10) * 1000).to_string());

    let ingested = backend.ingested.lock().unwrap().clone();
    assert_eq!(ingested.len(), 1);
    assert_eq!(ingested[0].0, "PaloAltoSentinel");
    assert_eq!(ingested[0].1.len(), 3);

    assert_eq!(backend.logins.load(Ordering::SeqCst), 1);
    assert_eq!(wiring.sink.successful_sent_events(), 3);
}

/// A 500 from the audit endpoint aborts the run: nothing is ingested and
/// the stored watermark stays where it was.
#[tokio::test]
async fn test_server_error_keeps_watermark() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let backend = Backend {
        records: records(&[(NOW - 100) * 1000]),
        ..Backend::default()
    };
    *backend.audit_status.lock().unwrap() = Some(StatusCode::INTERNAL_SERVER_ERROR);
    let addr = spawn_backend(backend.clone()).await;
    let mut wiring = wire(addr, &temp_dir).await;

    let previous = ((NOW - 5_000) * 1000).to_string();
    wiring.store.post(previous.clone()).await.unwrap();

    let err = wiring.connector.run().await.expect_err("run should abort");
    assert!(matches!(&err, ConnectorError::Fetch(e) if e.status() == Some(500)));

    assert!(backend.ingested.lock().unwrap().is_empty());
    assert_eq!(wiring.store.get().await.unwrap(), Some(previous));
}

/// The watermark survives reopening the database.
#[tokio::test]
async fn test_watermark_persists_across_reopen() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let backend = Backend {
        records: records(&[(NOW - 50) * 1000]),
        ..Backend::default()
    };
    let addr = spawn_backend(backend).await;
    let mut wiring = wire(addr, &temp_dir).await;
    wiring.connector.run().await.expect("run");
    drop(wiring);

    let reopened = SqliteWatermarkStore::open(temp_dir.path().join("state.db"), "audit")
        .await
        .expect("Failed to reopen store");
    assert_eq!(
        reopened.get().await.unwrap(),
        Some(((NOW - 50) * 1000).to_string())
    );
}

/// A rejected login aborts the run before any audit request, forward,
/// flush, or watermark write.
#[tokio::test]
async fn test_login_rejection_aborts_run() {
    let backend = Backend {
        records: records(&[(NOW - 100) * 1000]),
        ..Backend::default()
    };
    *backend.login_status.lock().unwrap() = Some(StatusCode::UNAUTHORIZED);
    let addr = spawn_backend(backend.clone()).await;

    let client = reqwest::Client::new();
    let base = Url::parse(&format!("http://{addr}")).unwrap();
    let sink = Arc::new(MemorySink::new());
    let store = Arc::new(MemoryWatermarkStore::new(None));
    let mut forwarder = AuditLogForwarder::new(
        audit_source(&client, &base),
        sink.clone(),
        store.clone(),
        Arc::new(FixedClock(NOW)),
        "PaloAltoSentinel",
    );

    let err = forwarder.run().await.expect_err("run should abort");

    assert!(matches!(
        err,
        ConnectorError::Fetch(FetchError::Auth(AuthError::Rejected { status: 401 }))
    ));
    assert_eq!(forwarder.state(), RunState::Aborted);
    assert_eq!(backend.logins.load(Ordering::SeqCst), 1);
    assert!(backend.audit_requests.lock().unwrap().is_empty());
    assert!(sink.sends().is_empty());
    assert!(sink.flushes().is_empty());
    assert_eq!(store.post_count(), 0);
}
