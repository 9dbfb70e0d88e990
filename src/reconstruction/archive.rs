use std::io::Cursor;
use std::path::{Path, PathBuf};

use reqwest::Client;
use serde::Serialize;
use tracing::info;
use walkdir::WalkDir;

use crate::{
    error::{AppError, AppResult},
    storage::LocalFileStorage,
    url_validation::validate_http_url,
};

pub const ARCHIVE_FILE: &str = "model.zip";

/// Storage keys of the model files found in a job directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModelFiles {
    pub obj: Option<String>,
    pub mtl: Option<String>,
    pub glb: Option<String>,
}

impl ModelFiles {
    /// A directory is a usable model only if it holds an OBJ or GLB mesh.
    pub fn has_model(&self) -> bool {
        self.obj.is_some() || self.glb.is_some()
    }
}

/// Walks `dir` in file-name order and keeps the first `.obj`, `.mtl` and
/// `.glb` file (extensions compared case-insensitively).
pub fn scan_model_files(storage: &LocalFileStorage, dir: &Path) -> ModelFiles {
    let mut files = ModelFiles::default();
    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file());
    for entry in walker {
        let ext = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let slot = match ext.as_deref() {
            Some("obj") => &mut files.obj,
            Some("mtl") => &mut files.mtl,
            Some("glb") => &mut files.glb,
            _ => continue,
        };
        if slot.is_none() {
            *slot = storage.relative_key(entry.path());
        }
    }
    files
}

pub async fn download_archive(http: &Client, url: &str) -> AppResult<Vec<u8>> {
    let url = validate_http_url(url)?;
    let response = http.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AppError::Transport(format!(
            "Failed to download model archive: HTTP {status}"
        )));
    }
    let bytes = response.bytes().await?;
    info!(size = bytes.len(), "downloaded model archive");
    Ok(bytes.to_vec())
}

pub fn is_zip(bytes: &[u8]) -> bool {
    bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(b"PK\x05\x06")
}

/// Extracts a zip archive into `dest`. Entries that would land outside
/// `dest` make the whole archive invalid.
pub fn extract_archive(bytes: Vec<u8>, dest: &Path) -> AppResult<()> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    archive.extract(dest)?;
    Ok(())
}

/// Stores the downloaded result under `prefix` and reports the model files.
/// Zip archives are kept as `model.zip` and extracted in place; anything
/// else is saved as `model.<kind>`.
pub async fn unpack(
    storage: &LocalFileStorage,
    prefix: &str,
    bytes: Vec<u8>,
    kind: &str,
) -> AppResult<ModelFiles> {
    let dir: PathBuf = storage.resolve_path(prefix);
    if is_zip(&bytes) {
        storage.put(&format!("{prefix}/{ARCHIVE_FILE}"), &bytes).await?;
        let storage = storage.clone();
        tokio::task::spawn_blocking(move || -> AppResult<ModelFiles> {
            extract_archive(bytes, &dir)?;
            Ok(scan_model_files(&storage, &dir))
        })
        .await
        .map_err(|err| AppError::Storage(std::io::Error::other(err)))?
    } else {
        let ext = kind.to_ascii_lowercase();
        storage.put(&format!("{prefix}/model.{ext}"), &bytes).await?;
        let storage = storage.clone();
        tokio::task::spawn_blocking(move || scan_model_files(&storage, &dir))
            .await
            .map_err(|err| AppError::Storage(std::io::Error::other(err)))
    }
}
