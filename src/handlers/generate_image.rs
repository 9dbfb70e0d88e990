use axum::{Json, extract::State, extract::rejection::JsonRejection};
use serde::{Deserialize, Serialize};

use crate::{
    app::AppState,
    error::AppResult,
    handlers::json_body,
    image_generation::GeneratedImage,
};

#[derive(Debug, Deserialize)]
pub struct GenerateImageRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    /// Overrides the server-side key when present.
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateImageResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub image: GeneratedImage,
}

pub async fn generate_image(
    State(state): State<AppState>,
    payload: Result<Json<GenerateImageRequest>, JsonRejection>,
) -> AppResult<Json<GenerateImageResponse>> {
    let request = json_body(payload)?;
    let prompt = request.prompt.unwrap_or_default();
    let api_key = request
        .api_key
        .filter(|key| !key.trim().is_empty())
        .or_else(|| state.config.image_api.api_key.clone())
        .unwrap_or_default();

    let image = state
        .images
        .generate(&state.storage, &prompt, &api_key)
        .await?;
    Ok(Json(GenerateImageResponse {
        status: "success",
        image,
    }))
}
