mod dryrun;
mod gemini;

pub use dryrun::DryrunTransport;
pub use gemini::GeminiTransport;

use fitroom_contracts::image::EncodedImage;

use crate::config::EngineConfig;
use crate::error::GenerationError;

pub const TRANSPORT_NAMES: &[&str] = &["dryrun", "gemini"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    /// Base64 payload.
    pub data: String,
}

impl InlineImage {
    pub fn into_encoded(self) -> EncodedImage {
        EncodedImage::from_base64(&self.mime_type, &self.data)
    }
}

/// One part of a request or of a model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    Image(InlineImage),
}

/// Remote "generate content from text and inline images" capability.
///
/// Implementations send `parts` in order and return the parts of the first
/// response candidate in order. They never retry.
pub trait ImageTransport: Send + Sync {
    fn name(&self) -> &str;
    fn model(&self) -> &str;
    fn generate_content(&self, parts: &[ContentPart]) -> Result<Vec<ContentPart>, GenerationError>;
}

pub fn transport_for(config: &EngineConfig) -> anyhow::Result<Box<dyn ImageTransport>> {
    match config.provider.as_str() {
        "gemini" => Ok(Box::new(GeminiTransport::new(config)?)),
        "dryrun" => Ok(Box::new(DryrunTransport::new(config))),
        other => anyhow::bail!(
            "unknown provider '{other}' (available: [{}])",
            TRANSPORT_NAMES.join(", ")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::{transport_for, InlineImage};
    use crate::config::EngineConfig;

    #[test]
    fn transport_for_resolves_known_providers() -> anyhow::Result<()> {
        let dryrun = EngineConfig::default().with_provider(Some("dryrun".to_string()));
        assert_eq!(transport_for(&dryrun)?.name(), "dryrun");

        let gemini = EngineConfig::default();
        let transport = transport_for(&gemini)?;
        assert_eq!(transport.name(), "gemini");
        assert_eq!(transport.model(), "gemini-2.5-flash-image");
        Ok(())
    }

    #[test]
    fn transport_for_rejects_unknown_provider() {
        let config = EngineConfig::default().with_provider(Some("imagen".to_string()));
        let err = transport_for(&config).err().map(|err| err.to_string());
        assert_eq!(
            err.as_deref(),
            Some("unknown provider 'imagen' (available: [dryrun, gemini])")
        );
    }

    #[test]
    fn inline_image_becomes_data_uri() {
        let image = InlineImage {
            mime_type: "image/webp".to_string(),
            data: "QUJD".to_string(),
        }
        .into_encoded();
        assert_eq!(image.as_str(), "data:image/webp;base64,QUJD");
    }
}
