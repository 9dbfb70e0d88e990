use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};

use crate::error::{AppError, AppResult};

/// Decodes a base64 image payload, tolerating embedded whitespace, missing
/// `=` padding and the URL-safe alphabet.
pub fn decode_base64_image(encoded: &str) -> AppResult<Vec<u8>> {
    let mut cleaned: String = encoded
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .collect();
    while cleaned.ends_with('=') {
        cleaned.pop();
    }
    if cleaned.is_empty() {
        return Err(empty_payload());
    }
    let missing_padding = cleaned.len() % 4;
    if missing_padding != 0 {
        cleaned.push_str(&"=".repeat(4 - missing_padding));
    }

    let engine = if cleaned.contains(['-', '_']) {
        &URL_SAFE
    } else {
        &STANDARD
    };
    let bytes = engine
        .decode(cleaned.as_bytes())
        .map_err(|err| AppError::shape(format!("Failed to decode base64 image: {err}"), None))?;
    if bytes.is_empty() {
        return Err(empty_payload());
    }
    Ok(bytes)
}

fn empty_payload() -> AppError {
    AppError::shape("Failed to decode base64 image: empty payload", None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_generation::ImageLocation;

    fn samples() -> Vec<Vec<u8>> {
        vec![
            b"a".to_vec(),
            b"ab".to_vec(),
            b"abc".to_vec(),
            b"abcd".to_vec(),
            vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0xFF],
            (0u8..=255).collect(),
        ]
    }

    #[test]
    fn unpadded_matches_padded() {
        for bytes in samples() {
            let padded = STANDARD.encode(&bytes);
            let unpadded = padded.trim_end_matches('=');
            assert_eq!(decode_base64_image(&padded).unwrap(), bytes);
            assert_eq!(decode_base64_image(unpadded).unwrap(), bytes);
        }
    }

    #[test]
    fn whitespace_is_ignored() {
        let bytes: Vec<u8> = (0u8..=255).collect();
        let encoded = STANDARD.encode(&bytes);
        let wrapped: String = encoded
            .as_bytes()
            .chunks(60)
            .map(|chunk| std::str::from_utf8(chunk).unwrap())
            .collect::<Vec<_>>()
            .join("\r\n ");
        assert_eq!(decode_base64_image(&format!("  {wrapped}\n")).unwrap(), bytes);
    }

    #[test]
    fn url_safe_alphabet() {
        let bytes: Vec<u8> = vec![0xFB, 0xFF, 0xBF];
        let encoded = URL_SAFE.encode(&bytes);
        assert!(encoded.contains(['-', '_']));
        assert_eq!(decode_base64_image(&encoded).unwrap(), bytes);
    }

    #[test]
    fn empty_payloads_are_rejected() {
        for encoded in ["", "====", " \n= "] {
            let err = decode_base64_image(encoded).unwrap_err();
            assert!(matches!(err, AppError::UpstreamShape { .. }), "{encoded:?}");
            assert_eq!(err.to_string(), "Failed to decode base64 image: empty payload");
        }
    }

    #[test]
    fn data_uri_without_body_is_rejected() {
        let payload = serde_json::json!({ "data": [{ "url": "data:image/png;base64," }] });
        let located = crate::image_generation::locate_image(&payload).unwrap();
        let ImageLocation::Base64(encoded) = located.location else {
            panic!("data URI should be treated as inline base64");
        };
        assert!(decode_base64_image(&encoded).is_err());
    }

    #[test]
    fn garbage_is_a_shape_error() {
        let err = decode_base64_image("@@@@").unwrap_err();
        assert!(matches!(err, AppError::UpstreamShape { .. }));
        assert!(err.to_string().starts_with("Failed to decode base64 image"));
    }
}
