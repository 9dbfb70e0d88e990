use url::Url;

use crate::error::{AppError, AppResult};

pub fn validate_http_url(raw: &str) -> AppResult<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::shape("Empty download URL", None));
    }
    let parsed = Url::parse(trimmed)
        .map_err(|err| AppError::shape(format!("Invalid download URL: {err}"), None))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(AppError::shape(
            format!("Unsupported URL scheme: {scheme}"),
            None,
        )),
    }
}
