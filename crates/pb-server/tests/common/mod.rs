use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Json;

use pb_core::eval::{DatasetName, ResponseSink, SplitName};
use pb_server::dataset::{DatasetClient, RowsQuery};
use pb_server::handler::{self, AppState};
use pb_server::sessions::SessionMap;

// ---------------------------------------------------------------------------
// MockDatasetServer — mimics the datasets-server rows API
// ---------------------------------------------------------------------------

struct DatasetMockConfig {
    templates_row: serde_json::Value,
    image_rows: Vec<serde_json::Value>,
    status_code: u16,
    hits: AtomicUsize,
}

pub struct MockDatasetServer {
    addr: SocketAddr,
    config: Arc<DatasetMockConfig>,
    _handle: tokio::task::JoinHandle<()>,
}

impl MockDatasetServer {
    pub async fn start(templates_row: serde_json::Value, image_rows: Vec<serde_json::Value>) -> Self {
        Self::start_with_status(templates_row, image_rows, 200).await
    }

    pub async fn start_failing(status: u16) -> Self {
        Self::start_with_status(serde_json::json!({}), Vec::new(), status).await
    }

    async fn start_with_status(
        templates_row: serde_json::Value,
        image_rows: Vec<serde_json::Value>,
        status: u16,
    ) -> Self {
        let config = Arc::new(DatasetMockConfig {
            templates_row,
            image_rows,
            status_code: status,
            hits: AtomicUsize::new(0),
        });

        let app = axum::Router::new()
            .route("/rows", get(mock_rows_handler))
            .with_state(Arc::clone(&config));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock dataset server");
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            addr,
            config,
            _handle: handle,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Number of /rows requests served so far.
    pub fn hits(&self) -> usize {
        self.config.hits.load(Ordering::SeqCst)
    }
}

impl Drop for MockDatasetServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

async fn mock_rows_handler(
    State(config): State<Arc<DatasetMockConfig>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    config.hits.fetch_add(1, Ordering::SeqCst);

    if config.status_code != 200 {
        let status =
            StatusCode::from_u16(config.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, "mock dataset failure").into_response();
    }

    let rows: Vec<serde_json::Value> = if params.get("config").map(String::as_str) == Some("templates")
    {
        vec![serde_json::json!({
            "row_idx": 0,
            "row": config.templates_row,
            "truncated_cells": []
        })]
    } else {
        config
            .image_rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                serde_json::json!({
                    "row_idx": i,
                    "row": row,
                    "truncated_cells": []
                })
            })
            .collect()
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({ "features": [], "rows": rows })),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// MockSheetsServer — mimics the spreadsheet values API
// ---------------------------------------------------------------------------

struct SheetsMockState {
    rows: Mutex<Vec<Vec<String>>>,
    fail_next_append: AtomicBool,
}

pub struct MockSheetsServer {
    addr: SocketAddr,
    state: Arc<SheetsMockState>,
    _handle: tokio::task::JoinHandle<()>,
}

impl MockSheetsServer {
    pub async fn start() -> Self {
        let state = Arc::new(SheetsMockState {
            rows: Mutex::new(Vec::new()),
            fail_next_append: AtomicBool::new(false),
        });

        let app = axum::Router::new()
            .route(
                "/v4/spreadsheets/{id}/values/{range}",
                get(mock_values_get).post(mock_values_append),
            )
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock sheets server");
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            addr,
            state,
            _handle: handle,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn rows(&self) -> Vec<Vec<String>> {
        self.state.rows.lock().expect("sheets mock mutex").clone()
    }

    pub fn seed_rows(&self, rows: Vec<Vec<String>>) {
        *self.state.rows.lock().expect("sheets mock mutex") = rows;
    }

    /// Makes the next append request fail with HTTP 500, then recover.
    pub fn fail_next_append(&self) {
        self.state.fail_next_append.store(true, Ordering::SeqCst);
    }
}

impl Drop for MockSheetsServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

async fn mock_values_get(
    State(state): State<Arc<SheetsMockState>>,
    Path((_id, range)): Path<(String, String)>,
) -> Response {
    let rows = state.rows.lock().expect("sheets mock mutex");
    let body = if rows.is_empty() {
        // The real API omits "values" entirely for an empty range.
        serde_json::json!({ "range": range })
    } else {
        serde_json::json!({ "range": range, "values": rows.clone() })
    };
    (StatusCode::OK, Json(body)).into_response()
}

#[derive(serde::Deserialize)]
struct AppendBody {
    values: Vec<Vec<String>>,
}

async fn mock_values_append(
    State(state): State<Arc<SheetsMockState>>,
    Path((_id, _range)): Path<(String, String)>,
    Json(body): Json<AppendBody>,
) -> Response {
    if state.fail_next_append.swap(false, Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "mock sheets failure").into_response();
    }

    let appended = body.values.len();
    state
        .rows
        .lock()
        .expect("sheets mock mutex")
        .extend(body.values);

    (
        StatusCode::OK,
        Json(serde_json::json!({ "updates": { "updatedRows": appended } })),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// TestApp — starts a real pairbench server against the mocks
// ---------------------------------------------------------------------------

pub struct TestApp {
    addr: SocketAddr,
    _handle: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn start(
        dataset_url: &str,
        sink: Arc<dyn ResponseSink>,
        target_count: usize,
    ) -> Self {
        let state = Arc::new(AppState {
            dataset: DatasetClient::new(dataset_url),
            sessions: SessionMap::new().shared(),
            sink,
            dataset_name: DatasetName::new("in100"),
            split: SplitName::new("colorjitter"),
            templates_query: RowsQuery {
                dataset: "acme/mmscore".to_owned(),
                config: "templates".to_owned(),
                split: "in100".to_owned(),
                length: 100,
            },
            images_query: RowsQuery {
                dataset: "acme/mmscore".to_owned(),
                config: "in100".to_owned(),
                split: "colorjitter".to_owned(),
                length: 100,
            },
            target_count,
        });

        let app = handler::router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test app");
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            addr,
            _handle: handle,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

// ---------------------------------------------------------------------------
// Test fixtures
// ---------------------------------------------------------------------------

pub const VARIANT_PHRASE: &str = "treat color shifts as real differences";
pub const INVARIANT_PHRASE: &str = "disregard color shifts entirely";

pub fn sample_template_row() -> serde_json::Value {
    let query_templates = serde_json::json!({
        "v1": "Compare the two images.{conditions}Then reply with Score: <1-10>.",
        "v2": "Judge how similar the pair is.{conditions}Answer using Score: <1-10>."
    });
    let query_conditions = serde_json::json!({
        "color_jittering": { "variant": VARIANT_PHRASE, "invariant": INVARIANT_PHRASE },
        "rotation": { "variant": "rotation matters", "invariant": "ignore rotation" },
        "perspective": { "variant": "perspective matters", "invariant": "ignore perspective" }
    });
    let logistics = serde_json::json!({
        "data-pairs": [["image1", "image2"], ["image1", "image3"]]
    });

    serde_json::json!({
        "query_templates": query_templates.to_string(),
        "query_conditions": query_conditions.to_string(),
        "logistics": logistics.to_string(),
    })
}

pub fn sample_image_rows(count: usize) -> Vec<serde_json::Value> {
    (0..count)
        .map(|i| {
            serde_json::json!({
                "image1": { "src": format!("http://img.test/{i}/image1.jpg"), "height": 224, "width": 224 },
                "image2": { "src": format!("http://img.test/{i}/image2.jpg"), "height": 224, "width": 224 },
                "image3": { "src": format!("http://img.test/{i}/image3.jpg"), "height": 224, "width": 224 },
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

pub async fn create_session(client: &reqwest::Client, base: &str) -> serde_json::Value {
    let resp = client
        .post(format!("{base}/v1/sessions"))
        .send()
        .await
        .expect("create session request");
    assert_eq!(resp.status(), 201);
    resp.json().await.expect("session view")
}

pub async fn post_event(
    client: &reqwest::Client,
    base: &str,
    token: &str,
    event: &str,
    body: Option<serde_json::Value>,
) -> reqwest::Response {
    let mut req = client.post(format!("{base}/v1/sessions/{token}/{event}"));
    if let Some(body) = body {
        req = req.json(&body);
    }
    req.send().await.expect("event request")
}

pub async fn begin(client: &reqwest::Client, base: &str, token: &str, user: &str) -> reqwest::Response {
    post_event(
        client,
        base,
        token,
        "begin",
        Some(serde_json::json!({ "user_id": user })),
    )
    .await
}

pub async fn score(client: &reqwest::Client, base: &str, token: &str, value: u8) -> reqwest::Response {
    post_event(
        client,
        base,
        token,
        "score",
        Some(serde_json::json!({ "score": value })),
    )
    .await
}
