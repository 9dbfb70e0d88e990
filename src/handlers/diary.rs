use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use serde::Deserialize;

use crate::{
    app::AppState,
    diary,
    error::AppResult,
    handlers::{StatusResponse, json_body, query_params},
    storage::DiaryEntry,
};

#[derive(Debug, Deserialize)]
pub struct DiaryQuery {
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DiaryRequest {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

pub async fn get_diary(
    State(state): State<AppState>,
    query: Result<Query<DiaryQuery>, QueryRejection>,
) -> AppResult<Json<DiaryEntry>> {
    let query = query_params(query)?;
    let entry = diary::get_entry(&state.storage, query.date.as_deref()).await?;
    Ok(Json(entry))
}

pub async fn save_diary(
    State(state): State<AppState>,
    payload: Result<Json<DiaryRequest>, JsonRejection>,
) -> AppResult<Json<StatusResponse>> {
    let request = json_body(payload)?;
    diary::put_entry(
        &state.storage,
        request.date.as_deref(),
        request.content.as_deref(),
    )
    .await?;
    Ok(StatusResponse::success())
}
