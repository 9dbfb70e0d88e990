pub mod diary;
pub mod generate_image;
pub mod models;
pub mod upload;

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
};
use serde::Serialize;

use crate::error::{AppError, AppResult};

#[derive(Serialize, Debug)]
pub struct StatusResponse {
    pub status: &'static str,
}

impl StatusResponse {
    pub fn success() -> Json<Self> {
        Json(Self { status: "success" })
    }
}

/// Unwraps a JSON body, reporting malformed input as a validation error so
/// clients always receive the JSON error shape.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

pub fn query_params<T>(
    query: Result<axum::extract::Query<T>, QueryRejection>,
) -> AppResult<T> {
    query
        .map(|axum::extract::Query(value)| value)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

pub use diary::{get_diary, save_diary};
pub use generate_image::generate_image;
pub use models::{list_models, update_model};
pub use upload::upload_image;
