//! Shared state and the HTTP router.

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use reqwest::Client;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    handlers,
    image_generation::ImageGenerationClient,
    reconstruction::CancelHandle,
    storage::LocalFileStorage,
    web_pages,
};

const UPLOAD_BODY_LIMIT: usize = 50 * 1024 * 1024;
pub const STATIC_URL_PREFIX: &str = "/static";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub storage: Arc<LocalFileStorage>,
    pub http: Client,
    pub images: ImageGenerationClient,
    /// Cancelled on shutdown; stops every reconstruction still polling.
    pub shutdown: CancelHandle,
}

impl AppState {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| AppError::Configuration(format!("failed to build HTTP client: {err}")))?;
        let storage = LocalFileStorage::new(
            config.static_dir.clone(),
            STATIC_URL_PREFIX.to_string(),
        );
        let images = ImageGenerationClient::new(http.clone(), &config.image_api);
        Ok(Self {
            config: Arc::new(config),
            storage: Arc::new(storage),
            http,
            images,
            shutdown: CancelHandle::new(),
        })
    }
}

pub fn create_router(state: AppState) -> Router {
    let static_dir = state.storage.base_dir().to_path_buf();
    Router::new()
        .route("/", get(web_pages::index_page))
        .route("/generate_image", post(handlers::generate_image))
        .route("/list_models", get(handlers::list_models))
        .route("/update_model", post(handlers::update_model))
        .route(
            "/diary",
            get(handlers::get_diary).post(handlers::save_diary),
        )
        .route(
            "/upload",
            post(handlers::upload_image).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .nest_service(STATIC_URL_PREFIX, ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
