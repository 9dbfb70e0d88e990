//! Listing and editing stored models.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::fs;
use tracing::warn;

use crate::{
    error::{AppError, AppResult},
    reconstruction::archive::scan_model_files,
    storage::{LocalFileStorage, ModelMetadata, is_safe_component, local::MODEL_DIR},
};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModelEntry {
    pub id: String,
    pub name: String,
    pub date: String,
    pub obj_url: Option<String>,
    pub mtl_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub glb_url: Option<String>,
    pub created_at: f64,
}

/// Reads a sidecar, treating a missing or unreadable one as empty.
async fn load_metadata(storage: &LocalFileStorage, meta_key: &str) -> ModelMetadata {
    match storage.get_json::<ModelMetadata>(meta_key).await {
        Ok(Some(metadata)) => metadata,
        Ok(None) => ModelMetadata::default(),
        Err(err) => {
            warn!(%meta_key, error = %err, "ignoring unreadable model metadata");
            ModelMetadata::default()
        }
    }
}

fn default_title(id: &str) -> String {
    let prefix: String = id.chars().take(4).collect();
    format!("Memory {prefix}")
}

/// All stored models, newest display date first.
pub async fn list_models(storage: &LocalFileStorage) -> AppResult<Vec<ModelEntry>> {
    let models_dir = storage.resolve_path(MODEL_DIR);
    let mut dir = match fs::read_dir(&models_dir).await {
        Ok(dir) => dir,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };

    let mut entries = Vec::new();
    while let Some(entry) = dir.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        let id = entry.file_name().to_string_lossy().into_owned();
        let path: PathBuf = entry.path();

        let scan_storage = storage.clone();
        let scan_path = path.clone();
        let files = tokio::task::spawn_blocking(move || scan_model_files(&scan_storage, &scan_path))
            .await
            .map_err(|err| AppError::Storage(std::io::Error::other(err)))?;
        if !files.has_model() {
            continue;
        }

        let prefix = LocalFileStorage::get_model_prefix(&id);
        let metadata = load_metadata(storage, &LocalFileStorage::get_meta_key(&prefix)).await;

        let fs_meta = entry.metadata().await?;
        let created: Option<SystemTime> = fs_meta.created().or_else(|_| fs_meta.modified()).ok();
        let created_at = created
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map(|elapsed| elapsed.as_secs_f64())
            .unwrap_or_default();
        let created_local: DateTime<Local> =
            created.map(DateTime::from).unwrap_or_else(Local::now);

        let public = |key: &Option<String>| key.as_deref().map(|key| storage.get_public_url(key));
        entries.push(ModelEntry {
            name: metadata
                .title
                .filter(|title| !title.is_empty())
                .unwrap_or_else(|| default_title(&id)),
            date: metadata
                .date
                .filter(|date| !date.is_empty())
                .unwrap_or_else(|| created_local.format("%Y-%m-%d").to_string()),
            obj_url: public(&files.obj),
            mtl_url: public(&files.mtl),
            glb_url: public(&files.glb),
            created_at,
            id,
        });
    }

    entries.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
    Ok(entries)
}

/// Merges `title` and `date` into the model's sidecar. Omitted or empty
/// fields keep their stored values.
pub async fn update_model(
    storage: &LocalFileStorage,
    id: Option<&str>,
    title: Option<&str>,
    date: Option<&str>,
) -> AppResult<ModelMetadata> {
    let id = id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("Missing model ID".to_string()))?;
    if !is_safe_component(id) {
        return Err(AppError::Validation("Invalid model ID".to_string()));
    }

    let prefix = LocalFileStorage::get_model_prefix(id);
    if !storage.exists(&prefix).await? {
        return Err(AppError::NotFound("Model not found".to_string()));
    }

    let meta_key = LocalFileStorage::get_meta_key(&prefix);
    let mut metadata = load_metadata(storage, &meta_key).await;
    metadata.merge(title, date);
    storage.put_json(&meta_key, &metadata).await?;
    Ok(metadata)
}
