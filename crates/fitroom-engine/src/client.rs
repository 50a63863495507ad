use fitroom_contracts::image::{CodecError, EncodedImage};

use crate::config::EngineConfig;
use crate::error::GenerationError;
use crate::transport::{transport_for, ContentPart, ImageTransport, InlineImage};

pub const TRY_ON_INSTRUCTION: &str = "Use the first image as the person and the second image as the clothing. Generate a high-quality, photorealistic full-body photo of the person wearing this clothing. Maintain the person's facial features and body shape accurately. Ensure the clothing fits naturally.";

pub fn garment_prompt(description: &str) -> String {
    format!(
        "Generate a high-quality image of clothing: {}. Flat lay or on a mannequin, white background, clean lighting.",
        description.trim()
    )
}

/// Stateless front for the two generation calls. Holds no per-request
/// state; the orchestrator decides when calls may run.
pub struct GenerationClient {
    transport: Box<dyn ImageTransport>,
}

impl GenerationClient {
    pub fn new(transport: Box<dyn ImageTransport>) -> Self {
        Self { transport }
    }

    pub fn from_config(config: &EngineConfig) -> anyhow::Result<Self> {
        Ok(Self::new(transport_for(config)?))
    }

    pub fn provider(&self) -> &str {
        self.transport.name()
    }

    pub fn model(&self) -> &str {
        self.transport.model()
    }

    pub fn synthesize_garment(&self, description: &str) -> Result<Vec<EncodedImage>, GenerationError> {
        let parts = [ContentPart::Text(garment_prompt(description))];
        let response = self.transport.generate_content(&parts)?;
        Ok(decode_images(response))
    }

    pub fn synthesize_try_on(
        &self,
        person: &EncodedImage,
        garment: &EncodedImage,
    ) -> Result<Vec<EncodedImage>, GenerationError> {
        let parts = [
            image_part(person)?,
            image_part(garment)?,
            ContentPart::Text(TRY_ON_INSTRUCTION.to_string()),
        ];
        let response = self.transport.generate_content(&parts)?;
        Ok(decode_images(response))
    }
}

/// Sends the MIME type recorded when the image was encoded.
fn image_part(image: &EncodedImage) -> Result<ContentPart, CodecError> {
    Ok(ContentPart::Image(InlineImage {
        mime_type: image.mime_type()?.to_string(),
        data: image.strip_payload()?.to_string(),
    }))
}

fn decode_images(parts: Vec<ContentPart>) -> Vec<EncodedImage> {
    parts
        .into_iter()
        .filter_map(|part| match part {
            ContentPart::Image(image) => Some(image.into_encoded()),
            ContentPart::Text(_) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use fitroom_contracts::image::EncodedImage;

    use super::{garment_prompt, GenerationClient, TRY_ON_INSTRUCTION};
    use crate::error::GenerationError;
    use crate::transport::{ContentPart, ImageTransport, InlineImage};

    type CallLog = Arc<Mutex<Vec<Vec<ContentPart>>>>;

    struct EchoTransport {
        calls: CallLog,
        reply: Vec<ContentPart>,
    }

    impl ImageTransport for EchoTransport {
        fn name(&self) -> &str {
            "echo"
        }

        fn model(&self) -> &str {
            "echo-image-1"
        }

        fn generate_content(
            &self,
            parts: &[ContentPart],
        ) -> Result<Vec<ContentPart>, GenerationError> {
            self.calls
                .lock()
                .expect("call log lock")
                .push(parts.to_vec());
            Ok(self.reply.clone())
        }
    }

    fn echo_client(reply: Vec<ContentPart>) -> (GenerationClient, CallLog) {
        let calls = CallLog::default();
        let transport = EchoTransport {
            calls: calls.clone(),
            reply,
        };
        (GenerationClient::new(Box::new(transport)), calls)
    }

    fn image(mime: &str, data: &str) -> ContentPart {
        ContentPart::Image(InlineImage {
            mime_type: mime.to_string(),
            data: data.to_string(),
        })
    }

    #[test]
    fn garment_prompt_appends_framing_instruction() {
        assert_eq!(
            garment_prompt("  red silk gown "),
            "Generate a high-quality image of clothing: red silk gown. Flat lay or on a mannequin, white background, clean lighting."
        );
    }

    #[test]
    fn synthesize_garment_sends_one_text_part_and_keeps_image_order() -> anyhow::Result<()> {
        let (client, calls) = echo_client(vec![
            ContentPart::Text("here you go".to_string()),
            image("image/png", "RzE="),
            image("image/jpeg", "RzI="),
        ]);

        let images = client.synthesize_garment("red silk gown")?;
        assert_eq!(
            images,
            vec![
                EncodedImage::from_base64("image/png", "RzE="),
                EncodedImage::from_base64("image/jpeg", "RzI="),
            ]
        );

        let calls = calls.lock().expect("call log lock");
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            vec![ContentPart::Text(garment_prompt("red silk gown"))]
        );
        Ok(())
    }

    #[test]
    fn text_only_response_yields_no_images() -> anyhow::Result<()> {
        let (client, _) = echo_client(vec![ContentPart::Text("I cannot do that".to_string())]);
        assert!(client.synthesize_garment("coat")?.is_empty());
        Ok(())
    }

    #[test]
    fn try_on_sends_person_garment_then_instruction() -> anyhow::Result<()> {
        let (client, calls) = echo_client(vec![image("image/png", "UjE=")]);

        let person = EncodedImage::from_base64("image/jpeg", "UDE=");
        let garment = EncodedImage::from_base64("image/png", "RzE=");
        let images = client.synthesize_try_on(&person, &garment)?;
        assert_eq!(images, vec![EncodedImage::from_base64("image/png", "UjE=")]);

        let calls = calls.lock().expect("call log lock");
        assert_eq!(
            calls[0],
            vec![
                image("image/jpeg", "UDE="),
                image("image/png", "RzE="),
                ContentPart::Text(TRY_ON_INSTRUCTION.to_string()),
            ]
        );
        Ok(())
    }

    #[test]
    fn try_on_rejects_malformed_input_without_calling_out() {
        let (client, calls) = echo_client(vec![image("image/png", "UjE=")]);

        let err = client
            .synthesize_try_on(
                &EncodedImage::new("not-a-data-uri"),
                &EncodedImage::from_base64("image/png", "RzE="),
            )
            .unwrap_err();
        assert!(matches!(err, GenerationError::Input(_)));
        assert!(calls.lock().expect("call log lock").is_empty());
    }

    #[test]
    fn client_reports_transport_identity() {
        let (client, _) = echo_client(Vec::new());
        assert_eq!(client.provider(), "echo");
        assert_eq!(client.model(), "echo-image-1");
    }
}
