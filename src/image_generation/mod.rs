//! Text-to-image generation through an OpenAI-compatible images endpoint.

pub mod decode;
pub mod extract;

use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::{
    config::ImageApiConfig,
    error::{AppError, AppResult},
    image_processing,
    storage::{LocalFileStorage, get_extension_from_mime_type},
    url_validation::validate_http_url,
};

pub use decode::decode_base64_image;
pub use extract::{ImageLocation, LocatedImage, locate_image, upstream_error};

const IMAGE_SIZE: &str = "1024x1024";
const DISPLAY_URL_LIMIT: usize = 100;

/// A generated image saved under `uploads/`.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedImage {
    /// Upstream URL or data URI, shortened for display.
    pub image_url: String,
    pub local_image_url: String,
    pub filename: String,
}

#[derive(Clone, Debug)]
pub struct ImageGenerationClient {
    http: Client,
    base_url: String,
    model: String,
}

impl ImageGenerationClient {
    pub fn new(http: Client, config: &ImageApiConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        }
    }

    pub async fn generate(
        &self,
        storage: &LocalFileStorage,
        prompt: &str,
        api_key: &str,
    ) -> AppResult<GeneratedImage> {
        if prompt.trim().is_empty() {
            return Err(AppError::Validation("No prompt provided".to_string()));
        }
        if api_key.trim().is_empty() {
            return Err(AppError::Validation("No API Key provided".to_string()));
        }

        let payload = self.request_generation(prompt, api_key).await?;
        if let Some(message) = upstream_error(&payload) {
            return Err(AppError::upstream(message, payload));
        }

        let located = locate_image(&payload).ok_or_else(|| {
            AppError::shape("Failed to parse image URL from response", Some(payload.clone()))
        })?;
        info!(source = located.source, "found generated image in response");

        let bytes = match &located.location {
            ImageLocation::Base64(encoded) => decode_base64_image(encoded)?,
            ImageLocation::Url(url) => self.download(url).await?,
        };

        let ext = image_processing::detect_mime_type(&bytes)
            .map(get_extension_from_mime_type)
            .unwrap_or("png");
        let filename = format!("gen_{}.{ext}", Utc::now().timestamp_millis());
        let key = LocalFileStorage::get_upload_key(&filename);
        storage.put(&key, &bytes).await?;
        info!(%filename, size = bytes.len(), "saved generated image");

        Ok(GeneratedImage {
            image_url: truncate_for_display(&located.display, DISPLAY_URL_LIMIT),
            local_image_url: storage.get_public_url(&key),
            filename,
        })
    }

    async fn request_generation(&self, prompt: &str, api_key: &str) -> AppResult<Value> {
        let body = json!({
            "size": IMAGE_SIZE,
            "prompt": prompt,
            "model": self.model,
            "n": 1,
            "response_format": "b64_json",
        });
        let response = self
            .http
            .post(format!("{}/v1/images/generations", self.base_url))
            .bearer_auth(api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!(%status, body = %truncate_for_display(&text, 500), "images API responded");
        serde_json::from_str(&text).map_err(|err| {
            AppError::Transport(format!(
                "Images API returned a non-JSON body ({status}): {err}: {}",
                truncate_for_display(&text, 200)
            ))
        })
    }

    async fn download(&self, url: &str) -> AppResult<Vec<u8>> {
        let url = validate_http_url(url)?;
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Transport(format!(
                "Failed to download image: HTTP {status}"
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Keeps the first `limit` characters and marks the cut with `...`.
pub fn truncate_for_display(value: &str, limit: usize) -> String {
    match value.char_indices().nth(limit) {
        Some((index, _)) => format!("{}...", &value[..index]),
        None => value.to_string(),
    }
}
