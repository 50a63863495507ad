use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed reading {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed writing {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("encoded image is not a base64 data URI")]
    Malformed,

    #[error("encoded image payload is not valid base64")]
    Decode(#[from] base64::DecodeError),
}

/// Self-describing image text of the form `data:<mime>;base64,<payload>`.
///
/// The same value is shown as a preview and sent to the model. Clones share
/// one allocation, so the result slot and history entries hold references to
/// a single copy of each image.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct EncodedImage(Arc<str>);

impl EncodedImage {
    /// Wraps raw data-URI text without validating it. Accessors report
    /// [`CodecError::Malformed`] lazily.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(Arc::from(raw.into()))
    }

    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        Self::from_base64(mime_type, &BASE64.encode(bytes))
    }

    pub fn from_base64(mime_type: &str, payload: &str) -> Self {
        Self::new(format!("data:{mime_type};base64,{payload}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The base64 payload after the first `,`.
    pub fn strip_payload(&self) -> Result<&str, CodecError> {
        self.0
            .split_once(',')
            .map(|(_, payload)| payload)
            .ok_or(CodecError::Malformed)
    }

    pub fn mime_type(&self) -> Result<&str, CodecError> {
        let (header, _) = self.0.split_once(',').ok_or(CodecError::Malformed)?;
        let mime = header
            .strip_prefix("data:")
            .and_then(|rest| rest.split(';').next())
            .map(str::trim)
            .unwrap_or_default();
        if mime.is_empty() {
            return Err(CodecError::Malformed);
        }
        Ok(mime)
    }

    pub fn decode(&self) -> Result<(&str, Vec<u8>), CodecError> {
        let mime = self.mime_type()?;
        let bytes = BASE64.decode(self.strip_payload()?.as_bytes())?;
        Ok((mime, bytes))
    }

    pub fn shares_storage_with(&self, other: &EncodedImage) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("mime_type", &self.mime_type().unwrap_or("?"))
            .field("len", &self.0.len())
            .finish()
    }
}

impl fmt::Display for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} chars)",
            self.mime_type().unwrap_or("unknown"),
            self.0.len()
        )
    }
}
