#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::HeaderMap,
    routing::{get, post},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use memory_capsule::{AppConfig, AppState, create_router};

pub async fn spawn(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

pub fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(4, 3, image::Rgb([200, 40, 40]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

pub fn zip_of(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    for (name, data) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// What the fake images endpoint answers with.
#[derive(Clone)]
pub enum ImagesReply {
    Base64,
    /// `data[0].url` pointing back at the fake's own `/image.png`.
    Url,
    Error(&'static str),
    /// A payload with none of the image fields.
    NoImage,
    /// `data[0].url` is a data URI with nothing after the comma.
    EmptyDataUri,
}

#[derive(Clone)]
struct ImagesState {
    reply: ImagesReply,
    addr: SocketAddr,
    seen: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

pub struct FakeImagesApi {
    pub addr: SocketAddr,
    /// Authorization header and body of each generation request.
    pub seen: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

impl FakeImagesApi {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

async fn images_generate(
    State(state): State<ImagesState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    let auth = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    state.seen.lock().unwrap().push((auth, body));
    Json(match &state.reply {
        ImagesReply::Base64 => json!({ "data": [{ "b64_json": STANDARD.encode(png_bytes()) }] }),
        ImagesReply::Url => {
            json!({ "data": [{ "url": format!("http://{}/image.png", state.addr) }] })
        }
        ImagesReply::Error(message) => json!({ "error": { "message": message } }),
        ImagesReply::NoImage => json!({ "created": 1, "data": [{ "revised_prompt": "kite" }] }),
        ImagesReply::EmptyDataUri => json!({ "data": [{ "url": "data:image/png;base64," }] }),
    })
}

pub async fn fake_images_api(reply: ImagesReply) -> FakeImagesApi {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let state = ImagesState {
        reply,
        addr,
        seen: seen.clone(),
    };
    let router = Router::new()
        .route("/v1/images/generations", post(images_generate))
        .route("/image.png", get(|| async { png_bytes() }))
        .with_state(state);
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    FakeImagesApi { addr, seen }
}

/// How the fake reconstruction service ends a job.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Succeed,
    Fail,
    /// Submit answers without a `JobId` or an `Error`.
    NoJobId,
    /// The job finishes with only a GIF preview.
    NoModel,
}

#[derive(Clone)]
struct HunyuanState {
    addr: SocketAddr,
    running_polls: usize,
    outcome: JobOutcome,
    queries: Arc<AtomicUsize>,
    submissions: Arc<Mutex<Vec<(HeaderMap, Value)>>>,
    archive: Arc<Vec<u8>>,
}

pub struct FakeHunyuan {
    pub addr: SocketAddr,
    pub queries: Arc<AtomicUsize>,
    pub submissions: Arc<Mutex<Vec<(HeaderMap, Value)>>>,
}

impl FakeHunyuan {
    pub fn endpoint(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

async fn hunyuan_action(
    State(state): State<HunyuanState>,
    headers: HeaderMap,
    body: String,
) -> Json<Value> {
    let params: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    let action = headers
        .get("x-tc-action")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    match action.as_str() {
        "SubmitHunyuanTo3DJob" => {
            state.submissions.lock().unwrap().push((headers, params));
            if state.outcome == JobOutcome::NoJobId {
                return Json(json!({ "Response": { "RequestId": "r1" } }));
            }
            Json(json!({ "Response": { "JobId": "job-1234", "RequestId": "r1" } }))
        }
        "QueryHunyuanTo3DJob" => {
            let seen = state.queries.fetch_add(1, Ordering::SeqCst);
            if seen < state.running_polls {
                return Json(json!({ "Response": { "Status": "RUN", "RequestId": "r2" } }));
            }
            if state.outcome == JobOutcome::Fail {
                return Json(json!({
                    "Response": { "Status": "FAIL", "ErrorMessage": "bad image", "RequestId": "r3" }
                }));
            }
            if state.outcome == JobOutcome::NoModel {
                return Json(json!({
                    "Response": {
                        "Status": "DONE",
                        "ResultFile3Ds": [{
                            "File3D": [{ "Type": "GIF", "Url": format!("http://{}/preview.gif", state.addr) }]
                        }],
                        "RequestId": "r4"
                    }
                }));
            }
            Json(json!({
                "Response": {
                    "Status": "DONE",
                    "ResultFile3Ds": [{
                        "File3D": [
                            { "Type": "GIF", "Url": format!("http://{}/preview.gif", state.addr) },
                            { "Type": "OBJ", "Url": format!("http://{}/archive.zip", state.addr) }
                        ]
                    }],
                    "RequestId": "r4"
                }
            }))
        }
        other => Json(json!({
            "Response": { "Error": { "Code": "InvalidAction", "Message": other } }
        })),
    }
}

/// A reconstruction service that reports `running_polls` RUN statuses before
/// ending the job per `outcome`. It serves a zip with an OBJ, an MTL and a
/// stray `metadata.json` at `/archive.zip`.
pub async fn fake_hunyuan(running_polls: usize, outcome: JobOutcome) -> FakeHunyuan {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let queries = Arc::new(AtomicUsize::new(0));
    let submissions = Arc::new(Mutex::new(Vec::new()));
    let archive = Arc::new(zip_of(&[
        ("result/mesh.obj", b"v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n"),
        ("result/mesh.mtl", b"newmtl default\n"),
        ("metadata.json", br#"{"title":"from archive","date":"1970-01-01"}"#),
    ]));
    let state = HunyuanState {
        addr,
        running_polls,
        outcome,
        queries: queries.clone(),
        submissions: submissions.clone(),
        archive,
    };
    let router = Router::new()
        .route("/", post(hunyuan_action))
        .route(
            "/archive.zip",
            get(|State(state): State<HunyuanState>| async move { state.archive.to_vec() }),
        )
        .with_state(state);
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    FakeHunyuan {
        addr,
        queries,
        submissions,
    }
}

/// Configuration pointing at local fakes, with fast polling.
pub fn test_config(static_dir: &Path, images_base: &str, hunyuan_endpoint: &str) -> AppConfig {
    let mut config = AppConfig::from_lookup(|key| match key {
        "STATIC_DIR" => Some(static_dir.display().to_string()),
        "VECTOR_ENGINE_BASE_URL" => Some(images_base.to_string()),
        "HUNYUAN_ENDPOINT" => Some(hunyuan_endpoint.to_string()),
        "TENCENTCLOUD_SECRET_ID" => Some("test-id".to_string()),
        "TENCENTCLOUD_SECRET_KEY" => Some("test-key".to_string()),
        _ => None,
    });
    config.poll.interval = Duration::from_millis(10);
    config.poll.max_attempts = 5;
    config
}

/// Starts the application against `config` and returns its base URL.
pub async fn spawn_app(config: AppConfig) -> String {
    spawn_app_with_state(config).await.0
}

/// Like `spawn_app`, also returning the state shared with the router.
pub async fn spawn_app_with_state(config: AppConfig) -> (String, AppState) {
    let state = AppState::new(config).unwrap();
    state.storage.init().await.unwrap();
    let addr = spawn(create_router(state.clone())).await;
    (format!("http://{addr}"), state)
}
