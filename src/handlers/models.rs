use axum::{Json, extract::State, extract::rejection::JsonRejection};
use serde::{Deserialize, Serialize};

use crate::{
    app::AppState,
    catalog::{self, ModelEntry},
    error::AppResult,
    handlers::{StatusResponse, json_body},
};

#[derive(Debug, Serialize)]
pub struct ModelList {
    pub models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateModelRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

pub async fn list_models(State(state): State<AppState>) -> AppResult<Json<ModelList>> {
    let models = catalog::list_models(&state.storage).await?;
    Ok(Json(ModelList { models }))
}

pub async fn update_model(
    State(state): State<AppState>,
    payload: Result<Json<UpdateModelRequest>, JsonRejection>,
) -> AppResult<Json<StatusResponse>> {
    let request = json_body(payload)?;
    catalog::update_model(
        &state.storage,
        request.id.as_deref(),
        request.title.as_deref(),
        request.date.as_deref(),
    )
    .await?;
    Ok(StatusResponse::success())
}
