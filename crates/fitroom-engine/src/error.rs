use fitroom_contracts::image::CodecError;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Transport or model-side failure.
    #[error("{provider} request failed: {message}")]
    RemoteCall { provider: String, message: String },

    #[error("input image unusable: {0}")]
    Input(#[from] CodecError),
}

impl GenerationError {
    pub fn remote(provider: &str, err: &anyhow::Error) -> Self {
        Self::RemoteCall {
            provider: provider.to_string(),
            message: error_chain_text(err, 2048),
        }
    }
}

fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut parts = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if parts
            .last()
            .map(|existing| existing == trimmed)
            .unwrap_or(false)
        {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    if parts.is_empty() {
        return truncate_text(&err.to_string(), max_chars);
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
