use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, State},
};
use chrono::Local;
use serde::Serialize;
use tracing::info;

use crate::{
    app::AppState,
    error::{AppError, AppResult},
    hunyuan::HunyuanClient,
    image_processing,
    reconstruction::{ReconstructedModel, ReconstructionRequest, Reconstructor},
    storage::{
        LocalFileStorage, compute_hash, get_extension_from_mime_type, is_safe_component,
        sanitize_filename,
    },
};

const DEFAULT_TITLE: &str = "Untitled Memory";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub model: ReconstructedModel,
}

struct UploadedFile {
    file_name: String,
    bytes: Bytes,
}

/// A previously generated image is preferred over a new upload.
enum ImageSource {
    Generated(String),
    Upload(UploadedFile),
}

#[derive(Default)]
struct UploadForm {
    filename: Option<String>,
    file: Option<UploadedFile>,
    date: Option<String>,
    title: Option<String>,
}

fn read_error(err: impl std::fmt::Display) -> AppError {
    AppError::Validation(format!("Failed to read form: {err}"))
}

async fn read_form(mut multipart: Multipart) -> AppResult<UploadForm> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await.map_err(read_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let bytes = field.bytes().await.map_err(read_error)?;
                form.file = Some(UploadedFile { file_name, bytes });
            }
            "filename" => form.filename = Some(field.text().await.map_err(read_error)?),
            "date" => form.date = Some(field.text().await.map_err(read_error)?),
            "title" => form.title = Some(field.text().await.map_err(read_error)?),
            _ => {}
        }
    }
    Ok(form)
}

/// Resolves a previously generated image by name.
async fn existing_image(storage: &LocalFileStorage, filename: &str) -> AppResult<String> {
    let filename = filename.trim();
    if !is_safe_component(filename) {
        return Err(AppError::Validation("Invalid filename".to_string()));
    }
    let key = LocalFileStorage::get_upload_key(filename);
    if !storage.exists(&key).await? {
        return Err(AppError::NotFound("File not found".to_string()));
    }
    Ok(key)
}

/// Validates and stores a newly uploaded image.
async fn store_upload(storage: &LocalFileStorage, upload: UploadedFile) -> AppResult<String> {
    if upload.file_name.trim().is_empty() {
        return Err(AppError::Validation("No selected file".to_string()));
    }
    if upload.bytes.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }
    let info = image_processing::inspect_image(&upload.bytes)?;

    let mut name = sanitize_filename(&upload.file_name);
    if name.is_empty() || !name.contains('.') {
        let hash = compute_hash(&upload.bytes);
        name = format!(
            "upload_{}.{}",
            &hash[..16],
            get_extension_from_mime_type(info.mime_type)
        );
    }
    let key = LocalFileStorage::get_upload_key(&name);
    storage.put(&key, &upload.bytes).await?;
    info!(%key, width = info.width, height = info.height, "stored uploaded image");
    Ok(key)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub async fn upload_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let form = read_form(multipart).await?;
    let source = match (form.filename, form.file) {
        (Some(filename), _) => ImageSource::Generated(filename),
        (None, Some(upload)) => ImageSource::Upload(upload),
        (None, None) => {
            return Err(AppError::Validation(
                "No file part or filename provided".to_string(),
            ));
        }
    };
    let api = HunyuanClient::new(state.http.clone(), &state.config.hunyuan)?;

    let image_key = match source {
        ImageSource::Generated(filename) => existing_image(&state.storage, &filename).await?,
        ImageSource::Upload(upload) => store_upload(&state.storage, upload).await?,
    };

    let request = ReconstructionRequest {
        image_key,
        title: non_empty(form.title).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        date: non_empty(form.date)
            .unwrap_or_else(|| Local::now().format("%Y-%m-%d").to_string()),
    };
    info!(image = %request.image_key, title = %request.title, "starting reconstruction");

    let model = Reconstructor::new(&api, &state.http, &state.storage, state.config.poll)
        .run(&request, &state.shutdown)
        .await?;
    Ok(Json(UploadResponse {
        status: "success",
        model,
    }))
}
