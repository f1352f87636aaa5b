// Media Payload Handling
// Decodes data-URL payloads and sniffs video inputs from the data URL or
// the advisory filename.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("empty media payload")]
    Empty,
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(String),
}

/// Decode a data-URL (or bare base64) payload into raw bytes.
pub fn decode_data_url(payload: &str) -> Result<Vec<u8>, MediaError> {
    let trimmed = payload.trim();
    if trimmed.is_empty() {
        return Err(MediaError::Empty);
    }

    let encoded = match trimmed.split_once(',') {
        Some((head, rest)) if head.starts_with("data:") => rest,
        _ => trimmed,
    };

    BASE64
        .decode(encoded.as_bytes())
        .map_err(|e| MediaError::InvalidBase64(e.to_string()))
}

/// A payload is treated as video when the data URL declares a video MIME
/// type or the advisory filename carries a video extension.
pub fn is_video_input(payload: &str, file_name: Option<&str>) -> bool {
    if payload.trim_start().starts_with("data:video/") {
        return true;
    }
    file_name
        .map(|name| video_ext_re().is_match(&name.to_lowercase()))
        .unwrap_or(false)
}

fn video_ext_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.(mp4|webm|mov|avi)$").unwrap())
}
