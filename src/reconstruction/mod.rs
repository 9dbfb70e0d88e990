//! Image to 3D model: submit, poll, then fetch and unpack the result.

pub mod archive;
pub mod job;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use tracing::info;

use crate::{
    config::PollPolicy,
    error::{AppError, AppResult},
    hunyuan::{ReconstructionApi, select_model_file},
    storage::{LocalFileStorage, ModelMetadata, is_safe_component},
};

pub use archive::ModelFiles;
pub use job::{CancelHandle, JobPhase, PollTimer, drive_job, run_job};

/// Source image plus the display fields for the resulting model.
#[derive(Debug, Clone)]
pub struct ReconstructionRequest {
    /// Storage key of the source image.
    pub image_key: String,
    pub title: String,
    pub date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconstructedModel {
    pub id: String,
    pub obj_url: Option<String>,
    pub mtl_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub glb_url: Option<String>,
}

pub struct Reconstructor<'a, A> {
    api: &'a A,
    http: &'a Client,
    storage: &'a LocalFileStorage,
    policy: PollPolicy,
}

impl<'a, A: ReconstructionApi> Reconstructor<'a, A> {
    pub fn new(
        api: &'a A,
        http: &'a Client,
        storage: &'a LocalFileStorage,
        policy: PollPolicy,
    ) -> Self {
        Self {
            api,
            http,
            storage,
            policy,
        }
    }

    /// Runs the whole workflow and blocks until the model is on disk.
    pub async fn run(
        &self,
        request: &ReconstructionRequest,
        cancel: &CancelHandle,
    ) -> AppResult<ReconstructedModel> {
        let image = self
            .storage
            .get(&request.image_key)
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;
        let encoded = STANDARD.encode(&image);

        let phase = run_job(self.api, &encoded, &self.policy, cancel).await?;
        let (job_id, query) = phase.into_result()?;
        if !is_safe_component(&job_id) {
            return Err(AppError::shape(
                format!("Unusable job identifier {job_id:?}"),
                Some(query.raw),
            ));
        }

        let file = select_model_file(&query.result_groups).ok_or_else(|| {
            AppError::shape("No 3D model found in result", Some(query.raw.clone()))
        })?;
        let kind = file.kind.clone().unwrap_or_default();
        let url = file.url.clone().unwrap_or_default();
        info!(%job_id, %kind, "reconstruction finished, fetching model");

        let prefix = LocalFileStorage::get_model_prefix(&job_id);
        let bytes = archive::download_archive(self.http, &url).await?;
        let files = archive::unpack(self.storage, &prefix, bytes, &kind).await?;

        // Written after extraction so an archive entry cannot replace it.
        let metadata = ModelMetadata {
            title: Some(request.title.clone()),
            date: Some(request.date.clone()),
            created_at: Some(Utc::now().timestamp_millis() as f64 / 1000.0),
            ..Default::default()
        };
        self.storage
            .put_json(&LocalFileStorage::get_meta_key(&prefix), &metadata)
            .await?;
        info!(%job_id, ?files, "model stored");

        let public = |key: &Option<String>| key.as_deref().map(|key| self.storage.get_public_url(key));
        Ok(ReconstructedModel {
            obj_url: public(&files.obj),
            mtl_url: public(&files.mtl),
            glb_url: public(&files.glb),
            id: job_id,
        })
    }
}
