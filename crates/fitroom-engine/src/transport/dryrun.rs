use std::io::Cursor;

use anyhow::Context;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use sha2::{Digest, Sha256};

use super::{ContentPart, ImageTransport, InlineImage};
use crate::config::EngineConfig;
use crate::error::GenerationError;

const PROVIDER: &str = "dryrun";
const SIDE: u32 = 64;

/// Offline transport: answers every call with solid-colour PNGs derived from
/// the request parts.
pub struct DryrunTransport {
    model: String,
    images_per_call: usize,
}

impl DryrunTransport {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            model: config.model.clone(),
            images_per_call: config.dryrun_images,
        }
    }
}

impl ImageTransport for DryrunTransport {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn generate_content(&self, parts: &[ContentPart]) -> Result<Vec<ContentPart>, GenerationError> {
        let mut out = Vec::with_capacity(self.images_per_call + 1);
        out.push(ContentPart::Text(format!(
            "dryrun response for {} part(s)",
            parts.len()
        )));
        for idx in 0..self.images_per_call {
            let (r, g, b) = color_from_parts(parts, idx as u64);
            let bytes = render_png(SIDE, SIDE, [r, g, b])
                .map_err(|err| GenerationError::remote(PROVIDER, &err))?;
            out.push(ContentPart::Image(InlineImage {
                mime_type: "image/png".to_string(),
                data: BASE64.encode(bytes),
            }));
        }
        Ok(out)
    }
}

fn color_from_parts(parts: &[ContentPart], seed: u64) -> (u8, u8, u8) {
    let mut hasher = Sha256::new();
    for part in parts {
        match part {
            ContentPart::Text(text) => hasher.update(text.as_bytes()),
            ContentPart::Image(image) => {
                hasher.update(image.mime_type.as_bytes());
                hasher.update(image.data.as_bytes());
            }
        }
    }
    hasher.update(seed.to_be_bytes());
    let digest = hasher.finalize();
    (digest[0], digest[1], digest[2])
}

fn render_png(width: u32, height: u32, rgb: [u8; 3]) -> anyhow::Result<Vec<u8>> {
    let mut image = RgbImage::new(width, height);
    for pixel in image.pixels_mut() {
        *pixel = Rgb(rgb);
    }
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .context("failed to encode dryrun PNG")?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use base64::Engine as _;

    use super::{DryrunTransport, BASE64};
    use crate::config::EngineConfig;
    use crate::transport::{ContentPart, ImageTransport};

    fn images(parts: Vec<ContentPart>) -> Vec<String> {
        parts
            .into_iter()
            .filter_map(|part| match part {
                ContentPart::Image(image) => Some(image.data),
                ContentPart::Text(_) => None,
            })
            .collect()
    }

    #[test]
    fn returns_configured_number_of_decodable_pngs() -> anyhow::Result<()> {
        let mut config = EngineConfig::default();
        config.dryrun_images = 2;
        let transport = DryrunTransport::new(&config);

        let parts = transport.generate_content(&[ContentPart::Text("red coat".to_string())])?;
        let payloads = images(parts);
        assert_eq!(payloads.len(), 2);
        assert_ne!(payloads[0], payloads[1]);

        let bytes = BASE64.decode(payloads[0].as_bytes())?;
        let decoded = image::load_from_memory(&bytes)?;
        assert_eq!((decoded.width(), decoded.height()), (64, 64));
        Ok(())
    }

    #[test]
    fn same_request_renders_same_colour() -> anyhow::Result<()> {
        let transport = DryrunTransport::new(&EngineConfig::default());
        let request = [ContentPart::Text("blue denim jacket".to_string())];
        assert_eq!(
            images(transport.generate_content(&request)?),
            images(transport.generate_content(&request)?)
        );
        Ok(())
    }

    #[test]
    fn zero_images_simulates_empty_response() -> anyhow::Result<()> {
        let mut config = EngineConfig::default();
        config.dryrun_images = 0;
        let transport = DryrunTransport::new(&config);
        let parts = transport.generate_content(&[ContentPart::Text("x".to_string())])?;
        assert!(images(parts).is_empty());
        Ok(())
    }
}
