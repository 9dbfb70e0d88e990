//! Tencent Cloud Hunyuan image-to-3D job service.

pub mod client;
pub mod signer;

use std::future::Future;

use serde::Deserialize;
use serde_json::Value;

use crate::error::AppResult;

pub use client::HunyuanClient;
pub use signer::Credential;

/// Job status as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// Missing or unrecognised statuses keep the job polling.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("SUCCESS") | Some("DONE") => JobStatus::Succeeded,
            Some("FAILED") | Some("FAIL") => JobStatus::Failed,
            _ => JobStatus::Running,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct File3D {
    #[serde(rename = "Type", default)]
    pub kind: Option<String>,
    #[serde(rename = "Url", default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ResultGroup {
    #[serde(rename = "File3D", default)]
    pub files: Vec<File3D>,
}

/// One status query.
#[derive(Debug, Clone)]
pub struct JobQuery {
    pub status: JobStatus,
    pub raw_status: Option<String>,
    pub result_groups: Vec<ResultGroup>,
    /// The whole `Response` object, returned to clients on failure.
    pub raw: Value,
}

impl JobQuery {
    pub fn from_response(raw: Value) -> Self {
        let raw_status = raw
            .get("Status")
            .and_then(Value::as_str)
            .map(str::to_string);
        // Malformed groups are skipped one by one.
        let result_groups = raw
            .get("ResultFile3Ds")
            .and_then(Value::as_array)
            .map(|groups| {
                groups
                    .iter()
                    .filter_map(|group| ResultGroup::deserialize(group).ok())
                    .collect()
            })
            .unwrap_or_default();
        Self {
            status: JobStatus::parse(raw_status.as_deref()),
            raw_status,
            result_groups,
            raw,
        }
    }
}

/// Picks the model archive: the first OBJ or GLB file with a URL, scanning
/// groups and then the files inside each group in order.
pub fn select_model_file(groups: &[ResultGroup]) -> Option<&File3D> {
    groups
        .iter()
        .flat_map(|group| group.files.iter())
        .find(|file| {
            let is_model = matches!(
                file.kind.as_deref().map(str::to_ascii_uppercase).as_deref(),
                Some("OBJ") | Some("GLB")
            );
            is_model && file.url.as_deref().is_some_and(|url| !url.trim().is_empty())
        })
}

/// A service that accepts an image and produces a 3D model job.
pub trait ReconstructionApi {
    /// Submits a base64 image and returns the job identifier.
    fn submit_job(&self, image_base64: &str) -> impl Future<Output = AppResult<String>> + Send;

    fn query_job(&self, job_id: &str) -> impl Future<Output = AppResult<JobQuery>> + Send;
}
