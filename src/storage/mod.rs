pub mod hash;
pub mod local;
pub mod metadata;

pub use hash::compute_hash;
pub use local::LocalFileStorage;
pub use metadata::*;

pub fn get_extension_from_mime_type(mime_type: &str) -> &str {
    match mime_type.to_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        _ => "bin",
    }
}

/// True when `segment` can be used as a single path component under the
/// storage root.
pub fn is_safe_component(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\', '\0'])
}

/// Reduces a client-supplied file name to `[A-Za-z0-9._-]`, dropping any
/// directory part. May return an empty string.
pub fn sanitize_filename(file_name: &str) -> String {
    let flattened = file_name.replace(['/', '\\'], " ");
    let joined = flattened.split_whitespace().collect::<Vec<_>>().join("_");
    let filtered: String = joined
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_'))
        .collect();
    filtered.trim_matches(['.', '_']).to_string()
}
