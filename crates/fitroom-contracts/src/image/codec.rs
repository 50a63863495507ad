use std::fs;
use std::path::Path;

use super::encoded::{CodecError, EncodedImage};

pub const DEFAULT_EXPORT_FILENAME: &str = "try-on-result.png";

const FALLBACK_MIME: &str = "image/png";

/// Reads a local file into an [`EncodedImage`]. Nothing is produced unless
/// the whole file was read.
pub fn encode_file(path: &Path) -> Result<EncodedImage, CodecError> {
    let bytes = fs::read(path).map_err(|source| CodecError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mime = mime_for_path(path).unwrap_or(FALLBACK_MIME);
    Ok(EncodedImage::from_bytes(mime, &bytes))
}

pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

/// Writes the decoded bytes of `image` to `path` unchanged.
pub fn export(image: &EncodedImage, path: &Path) -> Result<u64, CodecError> {
    let (_, bytes) = image.decode()?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| CodecError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, &bytes).map_err(|source| CodecError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(bytes.len() as u64)
}
