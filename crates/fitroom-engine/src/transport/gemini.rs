use std::time::Duration;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ContentPart, ImageTransport, InlineImage};
use crate::config::EngineConfig;
use crate::error::{truncate_text, GenerationError};

const PROVIDER: &str = "gemini";
const FALLBACK_MIME: &str = "image/png";

pub struct GeminiTransport {
    api_base: String,
    api_key: Option<String>,
    model: String,
    http: HttpClient,
}

impl GeminiTransport {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let timeout = Duration::try_from_secs_f64(config.request_timeout_s).with_context(|| {
            format!("invalid request timeout {}s", config.request_timeout_s)
        })?;
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("failed to build Gemini HTTP client")?;
        Ok(Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            http,
        })
    }

    fn endpoint(&self) -> String {
        let trimmed = self.model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    fn build_payload(parts: &[ContentPart]) -> Value {
        let parts: Vec<Value> = parts
            .iter()
            .map(|part| match part {
                ContentPart::Text(text) => json!({ "text": text }),
                ContentPart::Image(image) => json!({
                    "inlineData": {
                        "mimeType": image.mime_type,
                        "data": image.data,
                    }
                }),
            })
            .collect();
        json!({
            "contents": [{
                "role": "user",
                "parts": parts,
            }],
            "generationConfig": {
                "responseModalities": ["IMAGE", "TEXT"],
            },
        })
    }

    fn post(&self, api_key: &str, payload: &Value) -> Result<Value> {
        let endpoint = self.endpoint();
        let response = self
            .http
            .post(&endpoint)
            .header("x-goog-api-key", api_key)
            .json(payload)
            .send()
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("Gemini request failed ({endpoint})"))?;
        response_json_or_error(response)
    }

    fn call(&self, parts: &[ContentPart]) -> Result<Vec<ContentPart>> {
        let Some(api_key) = self.api_key.as_deref() else {
            bail!("GEMINI_API_KEY or GOOGLE_API_KEY not set");
        };
        let payload = Self::build_payload(parts);
        let response_payload = self.post(api_key, &payload)?;
        Self::extract_parts(response_payload)
    }

    /// Parts of the first candidate, in response order.
    fn extract_parts(response_payload: Value) -> Result<Vec<ContentPart>> {
        let parsed: GenerateContentResponse = serde_json::from_value(response_payload)
            .context("Gemini response did not match the generateContent shape")?;
        let Some(candidate) = parsed.candidates.into_iter().next() else {
            return Ok(Vec::new());
        };
        let parts = candidate.content.map(|content| content.parts).unwrap_or_default();

        let mut out = Vec::with_capacity(parts.len());
        for part in parts {
            if let Some(inline) = part.inline_data.filter(|inline| !inline.data.is_empty()) {
                BASE64
                    .decode(inline.data.as_bytes())
                    .context("Gemini image base64 decode failed")?;
                out.push(ContentPart::Image(InlineImage {
                    mime_type: inline
                        .mime_type
                        .filter(|mime| !mime.trim().is_empty())
                        .unwrap_or_else(|| FALLBACK_MIME.to_string()),
                    data: inline.data,
                }));
            } else if let Some(text) = part.text {
                out.push(ContentPart::Text(text));
            }
        }
        Ok(out)
    }
}

impl ImageTransport for GeminiTransport {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn generate_content(&self, parts: &[ContentPart]) -> Result<Vec<ContentPart>, GenerationError> {
        self.call(parts)
            .map_err(|err| GenerationError::remote(PROVIDER, &err))
    }
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Deserialize)]
struct WirePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default, rename = "inlineData", alias = "inline_data")]
    inline_data: Option<WireInlineData>,
}

#[derive(Debug, Deserialize)]
struct WireInlineData {
    #[serde(default, rename = "mimeType", alias = "mime_type")]
    mime_type: Option<String>,
    #[serde(default)]
    data: String,
}

fn response_json_or_error(response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .context("Gemini response body read failed")?;
    if !status.is_success() {
        bail!(
            "Gemini request failed ({code}): {}",
            truncate_text(&body, 512)
        );
    }
    let parsed: Value =
        serde_json::from_str(&body).context("Gemini returned invalid JSON payload")?;
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::GeminiTransport;
    use crate::config::EngineConfig;
    use crate::error::GenerationError;
    use crate::transport::{ContentPart, ImageTransport, InlineImage};

    fn png_part(data: &str) -> ContentPart {
        ContentPart::Image(InlineImage {
            mime_type: "image/png".to_string(),
            data: data.to_string(),
        })
    }

    #[test]
    fn endpoint_accepts_bare_and_prefixed_model_names() -> anyhow::Result<()> {
        let mut config = EngineConfig::default();
        config.api_base = "https://example.test/v1beta/".to_string();
        let bare = GeminiTransport::new(&config)?;
        assert_eq!(
            bare.endpoint(),
            "https://example.test/v1beta/models/gemini-2.5-flash-image:generateContent"
        );

        config.model = "models/gemini-3-pro-image-preview".to_string();
        let prefixed = GeminiTransport::new(&config)?;
        assert_eq!(
            prefixed.endpoint(),
            "https://example.test/v1beta/models/gemini-3-pro-image-preview:generateContent"
        );
        Ok(())
    }

    #[test]
    fn payload_keeps_part_order_and_inline_shape() {
        let payload = GeminiTransport::build_payload(&[
            png_part("UDE="),
            ContentPart::Image(InlineImage {
                mime_type: "image/jpeg".to_string(),
                data: "RzE=".to_string(),
            }),
            ContentPart::Text("wear it".to_string()),
        ]);
        let parts = &payload["contents"][0]["parts"];
        assert_eq!(payload["contents"][0]["role"], json!("user"));
        assert_eq!(parts[0]["inlineData"]["mimeType"], json!("image/png"));
        assert_eq!(parts[0]["inlineData"]["data"], json!("UDE="));
        assert_eq!(parts[1]["inlineData"]["mimeType"], json!("image/jpeg"));
        assert_eq!(parts[2]["text"], json!("wear it"));
        assert_eq!(
            payload["generationConfig"]["responseModalities"],
            json!(["IMAGE", "TEXT"])
        );
    }

    #[test]
    fn extract_parts_reads_first_candidate_only() -> anyhow::Result<()> {
        let parts = GeminiTransport::extract_parts(json!({
            "candidates": [
                {"content": {"parts": [
                    {"text": "Here is your garment."},
                    {"inlineData": {"mimeType": "image/png", "data": "UjE="}},
                    {"inline_data": {"mime_type": "image/jpeg", "data": "UjI="}},
                ]}},
                {"content": {"parts": [
                    {"inlineData": {"mimeType": "image/png", "data": "SUdOT1JFRA=="}},
                ]}},
            ]
        }))?;
        assert_eq!(
            parts,
            vec![
                ContentPart::Text("Here is your garment.".to_string()),
                png_part("UjE="),
                ContentPart::Image(InlineImage {
                    mime_type: "image/jpeg".to_string(),
                    data: "UjI=".to_string(),
                }),
            ]
        );
        Ok(())
    }

    #[test]
    fn extract_parts_tolerates_missing_candidates_and_content() -> anyhow::Result<()> {
        assert!(GeminiTransport::extract_parts(json!({}))?.is_empty());
        assert!(GeminiTransport::extract_parts(json!({
            "candidates": [{"finishReason": "SAFETY"}],
            "promptFeedback": {"blockReason": "OTHER"},
        }))?
        .is_empty());
        Ok(())
    }

    #[test]
    fn extract_parts_defaults_missing_mime_to_png() -> anyhow::Result<()> {
        let parts = GeminiTransport::extract_parts(json!({
            "candidates": [{"content": {"parts": [
                {"inlineData": {"data": "UjE="}},
                {"inlineData": {"mimeType": "image/png", "data": ""}},
            ]}}]
        }))?;
        assert_eq!(parts, vec![png_part("UjE=")]);
        Ok(())
    }

    #[test]
    fn extract_parts_rejects_corrupt_base64() {
        let err = GeminiTransport::extract_parts(json!({
            "candidates": [{"content": {"parts": [
                {"inlineData": {"mimeType": "image/png", "data": "%%%"}},
            ]}}]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("base64 decode failed"));
    }

    #[test]
    fn connection_errors_do_not_carry_the_api_key() -> anyhow::Result<()> {
        let mut config = EngineConfig::default();
        config.api_key = Some("SECRETKEY123".to_string());
        config.api_base = "http://127.0.0.1:1/v1beta".to_string();
        config.request_timeout_s = 5.0;
        let transport = GeminiTransport::new(&config)?;

        let err = transport
            .generate_content(&[ContentPart::Text("a red coat".to_string())])
            .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("Gemini request failed"), "{text}");
        assert!(!text.contains("SECRETKEY123"), "{text}");
        assert!(!text.contains("key="), "{text}");
        Ok(())
    }

    #[test]
    fn unusable_timeouts_are_rejected() {
        for timeout in [-1.0, f64::NAN, f64::INFINITY] {
            let mut config = EngineConfig::default();
            config.request_timeout_s = timeout;
            let err = GeminiTransport::new(&config).err().expect("timeout rejected");
            assert!(err.to_string().contains("invalid request timeout"));
        }
    }

    #[test]
    fn missing_api_key_fails_before_any_request() {
        let transport = GeminiTransport::new(&EngineConfig::default()).expect("client builds");
        let err = transport
            .generate_content(&[ContentPart::Text("a red coat".to_string())])
            .unwrap_err();
        match err {
            GenerationError::RemoteCall { provider, message } => {
                assert_eq!(provider, "gemini");
                assert!(message.contains("GEMINI_API_KEY"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
