use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_IMAGE_BASE_URL: &str = "https://api.vectorengine.ai";
const DEFAULT_IMAGE_MODEL: &str = "gpt-image-1";
const DEFAULT_HUNYUAN_ENDPOINT: &str = "https://hunyuan.tencentcloudapi.com";
const DEFAULT_HUNYUAN_REGION: &str = "ap-guangzhou";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 60;

/// How often and how long a reconstruction job is polled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ImageApiConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
}

#[derive(Clone, Debug)]
pub struct HunyuanConfig {
    pub endpoint: String,
    pub region: String,
    pub secret_id: Option<String>,
    pub secret_key: Option<String>,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_address: String,
    pub static_dir: PathBuf,
    pub image_api: ImageApiConfig,
    pub hunyuan: HunyuanConfig,
    pub poll: PollPolicy,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Blank values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let port = get("PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        let host = get("BIND_HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let poll = PollPolicy {
            interval: get("POLL_INTERVAL_SECS")
                .and_then(|value| value.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS)),
            max_attempts: get("POLL_MAX_ATTEMPTS")
                .and_then(|value| value.parse::<u32>().ok())
                .filter(|value| *value > 0)
                .unwrap_or(DEFAULT_POLL_MAX_ATTEMPTS),
        };

        Self {
            bind_address: format!("{host}:{port}"),
            static_dir: get("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("static")),
            image_api: ImageApiConfig {
                base_url: get("VECTOR_ENGINE_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_IMAGE_BASE_URL.to_string()),
                model: get("IMAGE_MODEL").unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
                api_key: get("VECTOR_ENGINE_API_KEY"),
            },
            hunyuan: HunyuanConfig {
                endpoint: get("HUNYUAN_ENDPOINT")
                    .unwrap_or_else(|| DEFAULT_HUNYUAN_ENDPOINT.to_string()),
                region: get("TENCENTCLOUD_REGION")
                    .unwrap_or_else(|| DEFAULT_HUNYUAN_REGION.to_string()),
                secret_id: get("TENCENTCLOUD_SECRET_ID"),
                secret_key: get("TENCENTCLOUD_SECRET_KEY"),
            },
            poll,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config_from(&[]);
        assert_eq!(config.bind_address, "0.0.0.0:5000");
        assert_eq!(config.static_dir, PathBuf::from("static"));
        assert_eq!(config.poll, PollPolicy::default());
        assert_eq!(config.image_api.model, "gpt-image-1");
        assert!(config.image_api.api_key.is_none());
        assert!(config.hunyuan.secret_id.is_none());
        assert!(config.hunyuan.secret_key.is_none());
        assert_eq!(config.hunyuan.region, "ap-guangzhou");
    }

    #[test]
    fn blank_and_invalid_values_fall_back() {
        let config = config_from(&[
            ("PORT", "not-a-port"),
            ("VECTOR_ENGINE_API_KEY", "   "),
            ("POLL_MAX_ATTEMPTS", "0"),
        ]);
        assert_eq!(config.bind_address, "0.0.0.0:5000");
        assert!(config.image_api.api_key.is_none());
        assert_eq!(config.poll.max_attempts, 60);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("BIND_HOST", "127.0.0.1"),
            ("STATIC_DIR", "/srv/capsule"),
            ("TENCENTCLOUD_SECRET_ID", "id"),
            ("TENCENTCLOUD_SECRET_KEY", "key"),
            ("POLL_INTERVAL_SECS", "2"),
            ("POLL_MAX_ATTEMPTS", "10"),
        ]);
        assert_eq!(config.bind_address, "127.0.0.1:8080");
        assert_eq!(config.static_dir, PathBuf::from("/srv/capsule"));
        assert_eq!(config.hunyuan.secret_id.as_deref(), Some("id"));
        assert_eq!(config.poll.interval, Duration::from_secs(2));
        assert_eq!(config.poll.max_attempts, 10);
    }
}
