use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::store::HistoryStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub started_at: String,
    pub finished_at: String,
    pub total_garments: u64,
    pub total_try_ons: u64,
    pub history: Vec<Map<String, Value>>,
}

/// Metadata rows for each history entry, newest first. Image payloads are
/// left out.
pub fn history_digest(store: &HistoryStore) -> Vec<Map<String, Value>> {
    store
        .iter()
        .map(|entry| {
            let mut row = Map::new();
            row.insert(
                "timestamp".to_string(),
                Value::String(
                    entry
                        .timestamp()
                        .to_rfc3339_opts(SecondsFormat::Millis, true),
                ),
            );
            for (key, image) in [
                ("person_mime", entry.person()),
                ("garment_mime", entry.garment()),
                ("result_mime", entry.result()),
            ] {
                row.insert(
                    key.to_string(),
                    image
                        .mime_type()
                        .map(|mime| Value::String(mime.to_string()))
                        .unwrap_or(Value::Null),
                );
            }
            row
        })
        .collect()
}

pub fn write_summary(
    path: &Path,
    summary: &SessionSummary,
    extra: Option<&Map<String, Value>>,
) -> anyhow::Result<()> {
    let mut payload = match serde_json::to_value(summary)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    payload.insert("ts".to_string(), Value::String(now_utc_iso()));
    if let Some(extra) = extra {
        for (key, value) in extra {
            payload.insert(key.clone(), value.clone());
        }
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(&Value::Object(payload))?)?;
    Ok(())
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
