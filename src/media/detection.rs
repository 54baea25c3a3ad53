const FALLBACK_IMAGE_MIME: &str = "image/jpeg";

#[must_use]
pub fn detect_mime(data: &[u8]) -> Option<String> {
    infer::get(data).map(|info| info.mime_type().to_string())
}

/// MIME type for a downloaded picture. Telegram re-encodes photos as JPEG, so
/// anything unrecognised is labelled as such.
#[must_use]
pub fn detect_image_mime(data: &[u8], declared: Option<&str>) -> String {
    detect_mime(data)
        .filter(|mime| mime.starts_with("image/"))
        .or_else(|| {
            declared
                .filter(|mime| mime.starts_with("image/"))
                .map(str::to_string)
        })
        .unwrap_or_else(|| FALLBACK_IMAGE_MIME.into())
}
