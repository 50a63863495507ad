use std::env;

pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_PROVIDER: &str = "gemini";

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    pub api_base: String,
    pub request_timeout_s: f64,
    /// Images the dryrun transport returns per call; 0 simulates an empty
    /// model response.
    pub dryrun_images: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            model: DEFAULT_IMAGE_MODEL.to_string(),
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout_s: 90.0,
            dryrun_images: 1,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(non_empty_env)
    }

    /// Resolves settings through `lookup`, which returns trimmed non-empty
    /// values only.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            provider: lookup("FITROOM_PROVIDER")
                .map(|value| value.to_ascii_lowercase())
                .unwrap_or(defaults.provider),
            model: lookup("FITROOM_IMAGE_MODEL").unwrap_or(defaults.model),
            api_key: lookup("GEMINI_API_KEY").or_else(|| lookup("GOOGLE_API_KEY")),
            api_base: lookup("GEMINI_API_BASE")
                .map(|value| value.trim_end_matches('/').to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or(defaults.api_base),
            request_timeout_s: value_as_f64(
                lookup("FITROOM_REQUEST_TIMEOUT").as_deref(),
                90.0,
                15.0,
                300.0,
            ),
            dryrun_images: value_as_f64(lookup("FITROOM_DRYRUN_IMAGES").as_deref(), 1.0, 0.0, 4.0)
                .round() as usize,
        }
    }

    pub fn with_provider(mut self, provider: Option<String>) -> Self {
        if let Some(provider) = provider.filter(|value| !value.trim().is_empty()) {
            self.provider = provider.trim().to_ascii_lowercase();
        }
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        if let Some(model) = model.filter(|value| !value.trim().is_empty()) {
            self.model = model.trim().to_string();
        }
        self
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn value_as_f64(raw: Option<&str>, default: f64, min: f64, max: f64) -> f64 {
    raw.and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(default)
        .clamp(min, max)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{EngineConfig, DEFAULT_API_BASE, DEFAULT_IMAGE_MODEL};

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| values.get(key).cloned()
    }

    #[test]
    fn defaults_target_gemini_flash_image() {
        let config = EngineConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config.provider, "gemini");
        assert_eq!(config.model, DEFAULT_IMAGE_MODEL);
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.api_key, None);
        assert_eq!(config.request_timeout_s, 90.0);
        assert_eq!(config.dryrun_images, 1);
    }

    #[test]
    fn google_key_is_fallback_and_base_is_trimmed() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("GOOGLE_API_KEY", "google-key"),
            ("GEMINI_API_BASE", "https://proxy.example.test/v1beta/"),
        ]));
        assert_eq!(config.api_key.as_deref(), Some("google-key"));
        assert_eq!(config.api_base, "https://proxy.example.test/v1beta");

        let preferred = EngineConfig::from_lookup(lookup_from(&[
            ("GOOGLE_API_KEY", "google-key"),
            ("GEMINI_API_KEY", "gemini-key"),
        ]));
        assert_eq!(preferred.api_key.as_deref(), Some("gemini-key"));
    }

    #[test]
    fn numeric_settings_are_clamped() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("FITROOM_REQUEST_TIMEOUT", "2"),
            ("FITROOM_DRYRUN_IMAGES", "9"),
        ]));
        assert_eq!(config.request_timeout_s, 15.0);
        assert_eq!(config.dryrun_images, 4);

        let garbage = EngineConfig::from_lookup(lookup_from(&[(
            "FITROOM_REQUEST_TIMEOUT",
            "soon",
        )]));
        assert_eq!(garbage.request_timeout_s, 90.0);
    }

    #[test]
    fn flag_overrides_replace_env_values() {
        let config = EngineConfig::from_lookup(lookup_from(&[("FITROOM_PROVIDER", "gemini")]))
            .with_provider(Some(" DryRun ".to_string()))
            .with_model(Some("gemini-3-pro-image-preview".to_string()))
            .with_model(Some("   ".to_string()));
        assert_eq!(config.provider, "dryrun");
        assert_eq!(config.model, "gemini-3-pro-image-preview");
    }
}
