//! Extension/MIME pairing table for uploaded creative files.

use mediaplan_core::{HubError, HubResult};
use tracing::debug;

/// Known extension -> acceptable MIME types. The check is deliberately
/// permissive: unknown extensions and unknown MIME types pass, only a known
/// extension paired with a contradicting known MIME type is rejected.
const EXT_MIME_TABLE: &[(&str, &[&str])] = &[
    ("jpg", &["image/jpeg"]),
    ("jpeg", &["image/jpeg"]),
    ("png", &["image/png"]),
    ("gif", &["image/gif"]),
    ("webp", &["image/webp"]),
    ("svg", &["image/svg+xml"]),
    ("pdf", &["application/pdf"]),
    ("mp4", &["video/mp4"]),
    ("mov", &["video/quicktime"]),
    ("webm", &["video/webm"]),
    ("mp3", &["audio/mpeg"]),
    ("wav", &["audio/wav", "audio/x-wav"]),
    ("html", &["text/html"]),
    ("zip", &["application/zip", "application/x-zip-compressed"]),
];

/// File extension, lowercased, without the dot.
pub fn extension(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Validate an upload's extension/MIME pairing.
pub fn validate_upload(file_name: &str, content_type: &str) -> HubResult<()> {
    if file_name.trim().is_empty() {
        return Err(HubError::Validation("file name must not be empty".into()));
    }

    let Some(ext) = extension(file_name) else {
        debug!(file_name, "Upload without extension, accepting");
        return Ok(());
    };

    let Some((_, allowed)) = EXT_MIME_TABLE.iter().find(|(e, _)| *e == ext) else {
        debug!(file_name, %ext, "Unknown extension, accepting");
        return Ok(());
    };

    // A declared MIME type that belongs to some *other* table entry
    // contradicts the extension. Anything not in the table passes.
    if !content_type.is_empty()
        && !allowed.contains(&content_type)
        && EXT_MIME_TABLE
            .iter()
            .any(|(_, mimes)| mimes.contains(&content_type))
    {
        return Err(HubError::Validation(format!(
            "content type '{content_type}' does not match extension '.{ext}'"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_pair_passes() {
        assert!(validate_upload("banner.png", "image/png").is_ok());
        assert!(validate_upload("spot.mp4", "video/mp4").is_ok());
    }

    #[test]
    fn unknown_extension_passes() {
        assert!(validate_upload("layout.indd", "application/octet-stream").is_ok());
    }

    #[test]
    fn missing_mime_passes() {
        assert!(validate_upload("banner.png", "").is_ok());
    }

    #[test]
    fn contradicting_pair_rejected() {
        assert!(validate_upload("banner.png", "video/mp4").is_err());
    }

    #[test]
    fn empty_file_name_rejected() {
        assert!(validate_upload("  ", "image/png").is_err());
    }

    #[test]
    fn extension_is_case_insensitive() {
        assert!(validate_upload("BANNER.PNG", "image/png").is_ok());
    }
}
