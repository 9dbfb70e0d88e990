//! Locating the generated image inside an images API response.
//!
//! Providers disagree on where the image goes, so the payload is probed with
//! an ordered table of strategies and the first hit wins. Entries wrapped in
//! `data[0]` are preferred over root-level fields.

use serde_json::Value;

/// Where the image bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageLocation {
    /// Plain http(s) link.
    Url(String),
    /// Base64 payload with any `data:` URI header already removed.
    Base64(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedImage {
    /// Name of the strategy that matched, for logging.
    pub source: &'static str,
    /// What the caller echoes back: the URL, or the payload as a data URI.
    pub display: String,
    pub location: ImageLocation,
}

#[derive(Clone, Copy)]
enum FieldKind {
    Link,
    Base64,
}

struct ExtractionStrategy {
    name: &'static str,
    nested: bool,
    field: &'static str,
    kind: FieldKind,
}

const STRATEGIES: &[ExtractionStrategy] = &[
    ExtractionStrategy {
        name: "data[0].url",
        nested: true,
        field: "url",
        kind: FieldKind::Link,
    },
    ExtractionStrategy {
        name: "data[0].image_url",
        nested: true,
        field: "image_url",
        kind: FieldKind::Link,
    },
    ExtractionStrategy {
        name: "data[0].b64_json",
        nested: true,
        field: "b64_json",
        kind: FieldKind::Base64,
    },
    ExtractionStrategy {
        name: "url",
        nested: false,
        field: "url",
        kind: FieldKind::Link,
    },
    ExtractionStrategy {
        name: "image_url",
        nested: false,
        field: "image_url",
        kind: FieldKind::Link,
    },
    ExtractionStrategy {
        name: "b64_json",
        nested: false,
        field: "b64_json",
        kind: FieldKind::Base64,
    },
];

impl ExtractionStrategy {
    fn apply(&self, payload: &Value) -> Option<LocatedImage> {
        let scope = if self.nested {
            payload.get("data")?.as_array()?.first()?
        } else {
            payload
        };
        let raw = scope.get(self.field)?.as_str()?.trim();
        if raw.is_empty() {
            return None;
        }
        Some(classify(self.name, raw, self.kind))
    }
}

fn classify(source: &'static str, raw: &str, kind: FieldKind) -> LocatedImage {
    if raw.starts_with("data:") {
        let encoded = raw.split_once(',').map(|(_, data)| data).unwrap_or_default();
        return LocatedImage {
            source,
            display: raw.to_string(),
            location: ImageLocation::Base64(encoded.to_string()),
        };
    }
    match kind {
        FieldKind::Link => LocatedImage {
            source,
            display: raw.to_string(),
            location: ImageLocation::Url(raw.to_string()),
        },
        FieldKind::Base64 => LocatedImage {
            source,
            display: format!("data:image/png;base64,{raw}"),
            location: ImageLocation::Base64(raw.to_string()),
        },
    }
}

/// Applies the strategies in priority order.
pub fn locate_image(payload: &Value) -> Option<LocatedImage> {
    STRATEGIES.iter().find_map(|strategy| strategy.apply(payload))
}

/// Explicit `error` reported by the API, formatted for the client.
pub fn upstream_error(payload: &Value) -> Option<String> {
    let error = payload.get("error")?;
    if error.is_null() {
        return None;
    }
    let message = match error.get("message").and_then(Value::as_str) {
        Some(message) => message.to_string(),
        None => match error {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        },
    };
    Some(format!("API Error: {message}"))
}
