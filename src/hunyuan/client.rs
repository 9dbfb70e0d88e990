use chrono::Utc;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, info};
use url::Url;

use crate::{
    config::HunyuanConfig,
    error::{AppError, AppResult},
    hunyuan::{
        JobQuery, ReconstructionApi,
        signer::{self, Credential},
    },
};

const SERVICE: &str = "hunyuan";
const API_VERSION: &str = "2023-09-01";
const SUBMIT_ACTION: &str = "SubmitHunyuanTo3DJob";
const QUERY_ACTION: &str = "QueryHunyuanTo3DJob";

#[derive(Clone, Debug)]
pub struct HunyuanClient {
    http: Client,
    endpoint: Url,
    host: String,
    region: String,
    credential: Credential,
}

impl HunyuanClient {
    pub fn new(http: Client, config: &HunyuanConfig) -> AppResult<Self> {
        let (Some(secret_id), Some(secret_key)) =
            (config.secret_id.clone(), config.secret_key.clone())
        else {
            return Err(AppError::Configuration(
                "Reconstruction API credentials are not configured \
                 (TENCENTCLOUD_SECRET_ID / TENCENTCLOUD_SECRET_KEY)"
                    .to_string(),
            ));
        };
        let endpoint = Url::parse(&config.endpoint).map_err(|err| {
            AppError::Configuration(format!("invalid HUNYUAN_ENDPOINT {}: {err}", config.endpoint))
        })?;
        let host = match (endpoint.host_str(), endpoint.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(AppError::Configuration(format!(
                    "HUNYUAN_ENDPOINT has no host: {}",
                    config.endpoint
                )));
            }
        };
        Ok(Self {
            http,
            endpoint,
            host,
            region: config.region.clone(),
            credential: Credential {
                secret_id,
                secret_key,
            },
        })
    }

    /// Signs and sends one API action, returning the `Response` object.
    async fn call(&self, action: &str, params: &Value) -> AppResult<Value> {
        let payload = params.to_string();
        let timestamp = Utc::now().timestamp();
        let authorization =
            signer::authorization(&self.credential, SERVICE, &self.host, &payload, timestamp)?;

        let response = self
            .http
            .post(self.endpoint.clone())
            .header(reqwest::header::AUTHORIZATION, authorization)
            .header(reqwest::header::CONTENT_TYPE, signer::CONTENT_TYPE)
            .header("X-TC-Action", action)
            .header("X-TC-Version", API_VERSION)
            .header("X-TC-Region", &self.region)
            .header("X-TC-Timestamp", timestamp.to_string())
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!(action, %status, "reconstruction API responded");
        let body: Value = serde_json::from_str(&text).map_err(|err| {
            AppError::Transport(format!(
                "Reconstruction API returned a non-JSON body ({status}): {err}"
            ))
        })?;
        match body.get("Response").filter(|inner| inner.is_object()).cloned() {
            Some(inner) => Ok(inner),
            None => Err(AppError::shape(
                format!("Malformed {action} response"),
                Some(body),
            )),
        }
    }
}

fn reported_error(response: &Value) -> Option<String> {
    let error = response.get("Error")?;
    let code = error.get("Code").and_then(Value::as_str).unwrap_or("Unknown");
    let message = error.get("Message").and_then(Value::as_str).unwrap_or("");
    Some(format!("{code}: {message}"))
}

impl ReconstructionApi for HunyuanClient {
    async fn submit_job(&self, image_base64: &str) -> AppResult<String> {
        let response = self
            .call(SUBMIT_ACTION, &json!({ "ImageBase64": image_base64 }))
            .await?;
        if let Some(job_id) = response
            .get("JobId")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
        {
            info!(job_id, "submitted reconstruction job");
            return Ok(job_id.to_string());
        }
        match reported_error(&response) {
            Some(reason) => {
                tracing::warn!(%reason, "reconstruction job rejected");
                Err(AppError::upstream("Failed to submit job", response))
            }
            None => Err(AppError::shape("Failed to submit job", Some(response))),
        }
    }

    async fn query_job(&self, job_id: &str) -> AppResult<JobQuery> {
        let response = self
            .call(QUERY_ACTION, &json!({ "JobId": job_id }))
            .await?;
        if let Some(reason) = reported_error(&response) {
            return Err(AppError::upstream(
                format!("Failed to query job: {reason}"),
                response,
            ));
        }
        Ok(JobQuery::from_response(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(endpoint: &str) -> HunyuanConfig {
        HunyuanConfig {
            endpoint: endpoint.to_string(),
            region: "ap-guangzhou".to_string(),
            secret_id: Some("id".to_string()),
            secret_key: Some("key".to_string()),
        }
    }

    #[test]
    fn missing_credentials_are_a_configuration_error() {
        let mut config = config("https://hunyuan.tencentcloudapi.com");
        config.secret_key = None;
        let err = HunyuanClient::new(Client::new(), &config).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn host_keeps_non_default_port() {
        let client = HunyuanClient::new(Client::new(), &config("http://127.0.0.1:9000")).unwrap();
        assert_eq!(client.host, "127.0.0.1:9000");
        let client =
            HunyuanClient::new(Client::new(), &config("https://hunyuan.tencentcloudapi.com:443"))
                .unwrap();
        assert_eq!(client.host, "hunyuan.tencentcloudapi.com");
    }

    #[test]
    fn reported_error_format() {
        let response = serde_json::json!({
            "Error": {"Code": "AuthFailure.SignatureFailure", "Message": "bad signature"},
            "RequestId": "r"
        });
        assert_eq!(
            reported_error(&response).as_deref(),
            Some("AuthFailure.SignatureFailure: bad signature")
        );
        assert_eq!(reported_error(&serde_json::json!({"JobId": "x"})), None);
    }
}
