use std::path::{Path, PathBuf};

use serde::{Serialize, de::DeserializeOwned};
use tokio::fs;

use crate::error::AppResult;

pub const UPLOAD_DIR: &str = "uploads";
pub const MODEL_DIR: &str = "models";
pub const DIARY_DIR: &str = "diaries";
const METADATA_FILE: &str = "metadata.json";

/// Filesystem store rooted at the static directory. Keys are forward-slash
/// paths relative to that root and map one-to-one onto public URLs.
#[derive(Clone, Debug)]
pub struct LocalFileStorage {
    base_dir: PathBuf,
    base_url: String,
}

impl LocalFileStorage {
    pub fn new(base_dir: PathBuf, base_url: String) -> Self {
        Self { base_dir, base_url }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Creates the uploads, models and diaries directories.
    pub async fn init(&self) -> AppResult<()> {
        for dir in [UPLOAD_DIR, MODEL_DIR, DIARY_DIR] {
            fs::create_dir_all(self.resolve_path(dir)).await?;
        }
        Ok(())
    }

    pub async fn get(&self, key: &str) -> AppResult<Option<Vec<u8>>> {
        let path = self.resolve_path(key);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn put(&self, key: &str, data: &[u8]) -> AppResult<()> {
        let path = self.resolve_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, data).await?;
        Ok(())
    }

    pub async fn exists(&self, key: &str) -> AppResult<bool> {
        let path = self.resolve_path(key);
        match fs::metadata(path).await {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        match self.get(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn put_json<T: Serialize>(&self, key: &str, value: &T) -> AppResult<()> {
        let payload = serde_json::to_vec_pretty(value)?;
        self.put(key, &payload).await
    }

    pub fn get_public_url(&self, key: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let key = key.trim_start_matches('/');
        format!("{base}/{key}")
    }

    /// Key of `path` relative to the storage root, always with `/`
    /// separators. `None` when `path` lies outside the root.
    pub fn relative_key(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.base_dir).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy().into_owned())
            .collect();
        if parts.is_empty() {
            return None;
        }
        Some(parts.join("/"))
    }

    pub fn get_upload_key(file_name: &str) -> String {
        format!("{UPLOAD_DIR}/{file_name}")
    }

    pub fn get_model_prefix(job_id: &str) -> String {
        format!("{MODEL_DIR}/{job_id}")
    }

    pub fn get_meta_key(prefix: &str) -> String {
        format!("{prefix}/{METADATA_FILE}")
    }

    pub fn get_diary_key(date: &str) -> String {
        format!("{DIARY_DIR}/{date}.json")
    }

    pub fn resolve_path(&self, key: &str) -> PathBuf {
        let normalized = key.trim_start_matches('/');
        self.base_dir.join(Path::new(normalized))
    }
}
