//! Terminal flows against an in-process store backend and the in-memory
//! camera doubles.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use scanpos_api::{ApiSettings, PosApiClient};
use scanpos_core::CameraPermissionState;
use scanpos_scan::mock::{DecodeStep, MockDevices, ScriptedDecoder};
use scanpos_scan::{ChannelEmitter, ScanEvent, ScanSessionController, ScannerConfig};
use scanpos_terminal::repl::{Outcome, Repl};
use scanpos_terminal::state::{AppConfig, ScannerState};
use serde_json::{json, Value};
use tokio::io::BufReader;
use tokio::sync::mpsc::UnboundedReceiver;

const PEN: &str = "4902505130267";
const SAMPLE: &str = "1234567890001";

#[derive(Clone, Default)]
struct Backend {
    purchases: Arc<Mutex<Vec<Value>>>,
}

async fn product(Path(code): Path<String>) -> (StatusCode, Json<Value>) {
    match code.as_str() {
        PEN => (
            StatusCode::OK,
            Json(json!({"PRD_ID": 1, "CODE": PEN, "NAME": "Ballpoint pen", "PRICE": 120, "STOCK": 5})),
        ),
        SAMPLE => (
            StatusCode::OK,
            Json(json!({"PRD_ID": 2, "CODE": SAMPLE, "NAME": "Sample tea", "PRICE": 1500, "STOCK": 3})),
        ),
        _ => (StatusCode::NOT_FOUND, Json(json!({"detail": "not found"}))),
    }
}

async fn purchase(State(backend): State<Backend>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["employee_code"] == "FAIL" {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"detail": "down"})));
    }
    let total: i64 = body["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|i| i["quantity"].as_i64().unwrap_or(0) * i["unit_price"].as_i64().unwrap_or(0))
                .sum()
        })
        .unwrap_or(0);
    backend.purchases.lock().unwrap().push(body);
    (
        StatusCode::OK,
        Json(json!({"transaction_id": "T-42", "total_amount": total, "timestamp": "2026-10-19T09:00:00"})),
    )
}

async fn spawn_backend() -> (SocketAddr, Backend) {
    let backend = Backend::default();
    let app = Router::new()
        .route("/product/{code}", get(product))
        .route("/purchase", post(purchase))
        .with_state(backend.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, backend)
}

struct Terminal {
    repl: Repl<MockDevices, ScriptedDecoder>,
    events: UnboundedReceiver<ScanEvent>,
    devices: Arc<MockDevices>,
    backend: Backend,
}

async fn terminal(devices: MockDevices, steps: Vec<DecodeStep>) -> Terminal {
    let (addr, backend) = spawn_backend().await;
    let mut config = AppConfig::default();
    config.api = ApiSettings {
        base_url: format!("http://{}", addr),
        timeout_secs: 5,
    };
    config.terminal.employee_code = "E001".into();

    let devices = Arc::new(devices);
    let (emitter, events) = ChannelEmitter::new();
    let controller = ScanSessionController::new(
        ScannerConfig::default(),
        Arc::clone(&devices),
        Arc::new(ScriptedDecoder::new(steps)),
        Arc::new(emitter),
    )
    .unwrap();
    let api = PosApiClient::new(&config.api).unwrap();
    let repl = Repl::new(config, api, ScannerState::from_controller(controller));

    Terminal {
        repl,
        events,
        devices,
        backend,
    }
}

fn text(outcome: Outcome) -> String {
    match outcome {
        Outcome::Print(text) => text,
        Outcome::Quit => panic!("unexpected quit"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_typed_code_to_purchase() {
    let t = terminal(MockDevices::new(), vec![]).await;
    let input = format!("code {PEN}\nadd 2\nsample\nadd\npurchase\ncart\nquit\nstatus\n");
    let mut out = Vec::new();

    t.repl
        .run(BufReader::new(input.as_bytes()), t.events, &mut out)
        .await
        .unwrap();

    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("Ballpoint pen"), "{out}");
    assert!(out.contains("Sample tea"), "{out}");
    assert!(out.contains("Purchase complete."), "{out}");
    assert!(out.contains("¥1,740"), "{out}");
    assert!(out.contains("Purchase list is empty."), "{out}");
    assert!(!out.contains("Scanner:"), "input after quit was executed: {out}");

    let purchases = t.backend.purchases.lock().unwrap();
    assert_eq!(purchases.len(), 1);
    assert_eq!(purchases[0]["employee_code"], "E001");
    assert_eq!(purchases[0]["items"][0]["product_code"], PEN);
    assert_eq!(purchases[0]["items"][0]["quantity"], 2);
    assert_eq!(purchases[0]["items"][1]["unit_price"], 1500);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_camera_scan_looks_up_product() {
    let mut t = terminal(
        MockDevices::new().with_permission(CameraPermissionState::Granted),
        vec![DecodeStep::found(PEN), DecodeStep::found(PEN)],
    )
    .await;

    let started = text(t.repl.dispatch("scan").await);
    assert!(started.contains("Starting camera"));

    let event = tokio::time::timeout(Duration::from_secs(5), t.events.recv())
        .await
        .expect("no detection within 5s")
        .unwrap();
    assert_eq!(event, ScanEvent::CodeDetected(PEN.into()));

    let shown = t.repl.handle_event(event).await;
    assert!(shown.contains("Ballpoint pen"), "{shown}");
    assert!(shown.contains("add [1-5]"), "{shown}");
    assert_eq!(t.repl.lookup().pending().map(|p| p.price), Some(120));
    assert_eq!(t.devices.live_streams(), 0);

    let added = text(t.repl.dispatch("add 5").await);
    assert!(added.contains("¥600"), "{added}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unknown_code_keeps_cart() {
    let t = terminal(MockDevices::new(), vec![]).await;

    let shown = t.repl.handle_event(ScanEvent::CodeDetected("0000".into())).await;
    assert!(shown.contains("Product not found: 0000"), "{shown}");

    let err = text(t.repl.dispatch("add").await);
    assert!(err.starts_with("Error:"), "{err}");
    assert!(t.repl.cart().with_cart(|c| c.is_empty()));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_purchase_keeps_list() {
    let t = terminal(MockDevices::new(), vec![]).await;
    t.repl.handle_event(ScanEvent::CodeDetected(PEN.into())).await;
    text(t.repl.dispatch("add 1").await);

    let err = text(t.repl.dispatch("purchase FAIL").await);
    assert!(err.contains("HTTP 503"), "{err}");
    assert_eq!(t.repl.cart().with_cart(|c| c.total_quantity()), 1);
    assert!(t.backend.purchases.lock().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_empty_purchase_is_rejected_locally() {
    let t = terminal(MockDevices::new(), vec![]).await;
    let err = text(t.repl.dispatch("purchase").await);
    assert!(err.contains("Purchase list is empty"), "{err}");
    assert!(t.backend.purchases.lock().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_denied_camera_reports_guidance() {
    let mut t = terminal(
        MockDevices::new().with_permission(CameraPermissionState::Denied),
        vec![],
    )
    .await;

    let shown = text(t.repl.dispatch("permission").await);
    assert!(shown.contains("denied"), "{shown}");

    text(t.repl.dispatch("scan").await);
    let event = tokio::time::timeout(Duration::from_secs(5), t.events.recv())
        .await
        .unwrap()
        .unwrap();
    match event {
        ScanEvent::Error(message) => assert!(message.contains("Camera access was denied")),
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(t.devices.requests().is_empty());
}
