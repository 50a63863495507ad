use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

pub type EventPayload = Map<String, Value>;

const RESERVED_KEYS: [&str; 3] = ["type", "session_id", "ts"];

/// Everything a session writes to its event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SessionStarted,
    StageChanged,
    GarmentRequested,
    GarmentGenerated,
    GarmentFailed,
    TryOnRequested,
    TryOnCompleted,
    TryOnFailed,
    RequestDropped,
    HistoryRestored,
    ResultExported,
    SessionFinished,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SessionStarted => "session_started",
            Self::StageChanged => "stage_changed",
            Self::GarmentRequested => "garment_requested",
            Self::GarmentGenerated => "garment_generated",
            Self::GarmentFailed => "garment_failed",
            Self::TryOnRequested => "try_on_requested",
            Self::TryOnCompleted => "try_on_completed",
            Self::TryOnFailed => "try_on_failed",
            Self::RequestDropped => "request_dropped",
            Self::HistoryRestored => "history_restored",
            Self::ResultExported => "result_exported",
            Self::SessionFinished => "session_finished",
        }
    }
}

/// Append-only JSONL log for one session.
///
/// Each line starts with `type`, `session_id` and `ts`; payload keys follow
/// and may not replace those three. The file is opened on the first emit and
/// kept open. Clones share the handle.
#[derive(Debug, Clone)]
pub struct EventWriter {
    inner: Arc<EventWriterInner>,
}

#[derive(Debug)]
struct EventWriterInner {
    path: PathBuf,
    session_id: String,
    file: Mutex<Option<File>>,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(EventWriterInner {
                path: path.into(),
                session_id: session_id.into(),
                file: Mutex::new(None),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    pub fn emit(&self, kind: EventKind, payload: EventPayload) -> anyhow::Result<Value> {
        let mut event = Map::new();
        event.insert("type".to_string(), Value::String(kind.as_str().to_string()));
        event.insert(
            "session_id".to_string(),
            Value::String(self.inner.session_id.clone()),
        );
        event.insert("ts".to_string(), Value::String(now_utc_iso()));
        event.extend(
            payload
                .into_iter()
                .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str())),
        );

        let mut line = serde_json::to_string(&event)?;
        line.push('\n');

        let mut file = self
            .inner
            .file
            .lock()
            .map_err(|_| anyhow::anyhow!("event writer lock poisoned"))?;
        if file.is_none() {
            *file = Some(self.open()?);
        }
        if let Some(handle) = file.as_mut() {
            handle
                .write_all(line.as_bytes())
                .with_context(|| format!("failed to append to {}", self.inner.path.display()))?;
        }

        Ok(Value::Object(event))
    }

    fn open(&self) -> anyhow::Result<File> {
        if let Some(parent) = self.inner.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.inner.path)
            .with_context(|| format!("failed to open {}", self.inner.path.display()))
    }
}

pub fn new_session_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("session-{}", &id[..12])
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
