use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use fitroom_contracts::events::{new_session_id, EventKind, EventWriter};
use fitroom_contracts::history::{
    history_digest, write_summary, HistoryEntry, HistoryStore, SessionSummary,
};
use fitroom_contracts::image::{export as export_image, EncodedImage};
use fitroom_contracts::wizard::{
    Transition, TransitionError, WizardAction, WizardEffect, WizardStage, WizardState,
};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use crate::client::GenerationClient;
use crate::error::GenerationError;
use crate::notify::{FailureNotice, Notifier};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GenerationStatus {
    #[default]
    Idle,
    InFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Preconditions unmet or another request in flight; nothing was sent.
    Skipped,
    Produced(usize),
    Empty,
    Failed,
}

/// An issued garment request. Must be handed back to
/// [`Orchestrator::finish_garment`].
#[derive(Debug)]
#[must_use = "an unfinished ticket leaves the orchestrator in flight"]
pub struct GarmentTicket {
    request_id: u64,
    prompt: String,
    started: Instant,
}

/// An issued try-on request with the person and garment captured at issue
/// time. Must be handed back to [`Orchestrator::finish_try_on`].
#[derive(Debug)]
#[must_use = "an unfinished ticket leaves the orchestrator in flight"]
pub struct TryOnTicket {
    request_id: u64,
    person: EncodedImage,
    garment: EncodedImage,
    started: Instant,
}

/// Owns the wizard state and history of one session and runs generation
/// requests against them.
///
/// At most one request is in flight. A request issued meanwhile is dropped,
/// not queued. Completions apply to whatever the state is when they land.
pub struct Orchestrator<N: Notifier> {
    client: GenerationClient,
    notifier: N,
    state: WizardState,
    history: HistoryStore,
    status: GenerationStatus,
    events: Option<EventWriter>,
    session_id: String,
    started_at: String,
    next_request_id: u64,
    garments_generated: u64,
    try_ons_completed: u64,
}

impl<N: Notifier> Orchestrator<N> {
    pub fn new(client: GenerationClient, notifier: N) -> Self {
        Self {
            client,
            notifier,
            state: WizardState::new(),
            history: HistoryStore::new(),
            status: GenerationStatus::Idle,
            events: None,
            session_id: new_session_id(),
            started_at: now_utc_iso(),
            next_request_id: 0,
            garments_generated: 0,
            try_ons_completed: 0,
        }
    }

    pub fn with_events(mut self, events: EventWriter) -> Self {
        self.session_id = events.session_id().to_string();
        self.events = Some(events);
        self.emit(
            EventKind::SessionStarted,
            json!({
                "provider": self.client.provider(),
                "model": self.client.model(),
            }),
        );
        self
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn status(&self) -> GenerationStatus {
        self.status
    }

    pub fn client(&self) -> &GenerationClient {
        &self.client
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn select_person(&mut self, image: EncodedImage) -> Result<Transition, TransitionError> {
        self.apply(WizardAction::SelectPerson(image))
    }

    pub fn upload_garment(&mut self, image: EncodedImage) -> Result<Transition, TransitionError> {
        self.apply(WizardAction::UploadGarment(image))
    }

    pub fn pick_garment(&mut self, index: usize) -> Result<Transition, TransitionError> {
        self.apply(WizardAction::PickGarment(index))
    }

    pub fn navigate(&mut self, stage: WizardStage) -> Result<Transition, TransitionError> {
        self.apply(WizardAction::Navigate(stage))
    }

    pub fn retry_garment(&mut self) -> Result<Transition, TransitionError> {
        self.apply(WizardAction::RetryGarment)
    }

    pub fn reset(&mut self) -> Result<Transition, TransitionError> {
        self.apply(WizardAction::Reset)
    }

    /// Moves Garment → Result and runs the try-on the transition asks for.
    pub fn confirm_garment(&mut self) -> Result<GenerationOutcome, TransitionError> {
        let transition = self.apply(WizardAction::ConfirmGarment)?;
        Ok(match transition.effect {
            Some(effect) => self.run_effect(effect),
            None => GenerationOutcome::Skipped,
        })
    }

    /// Shows the result of history entry `index` (0 = newest). Stage and
    /// other selections stay as they are.
    pub fn restore_history(&mut self, index: usize) -> Option<EncodedImage> {
        let image = self
            .history
            .get(index)
            .map(|entry| self.history.restore(entry))?;
        self.record(WizardAction::RestoreResult(image.clone()));
        self.emit(
            EventKind::HistoryRestored,
            json!({
                "index": index,
                "result": image_digest(&image),
            }),
        );
        Some(image)
    }

    /// Writes the current result to `path`. `None` when there is no result.
    pub fn export_result(&self, path: &Path) -> Result<Option<u64>> {
        let Some(result) = self.state.selection().result.as_ref() else {
            return Ok(None);
        };
        let bytes = export_image(result, path)
            .with_context(|| format!("failed to export result to {}", path.display()))?;
        self.emit(
            EventKind::ResultExported,
            json!({
                "path": path.to_string_lossy().to_string(),
                "bytes": bytes,
                "result": image_digest(result),
            }),
        );
        Ok(Some(bytes))
    }

    pub fn request_garment(&mut self, prompt: &str) -> GenerationOutcome {
        let Some(ticket) = self.begin_garment(prompt) else {
            return GenerationOutcome::Skipped;
        };
        let result = self.client.synthesize_garment(&ticket.prompt);
        self.finish_garment(ticket, result)
    }

    /// Returns `None` for a blank prompt or while another request is in
    /// flight.
    pub fn begin_garment(&mut self, prompt: &str) -> Option<GarmentTicket> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return None;
        }
        let request_id = self.acquire("garment")?;
        self.emit(
            EventKind::GarmentRequested,
            json!({
                "request_id": request_id,
                "prompt": prompt,
                "provider": self.client.provider(),
                "model": self.client.model(),
            }),
        );
        Some(GarmentTicket {
            request_id,
            prompt: prompt.to_string(),
            started: Instant::now(),
        })
    }

    pub fn finish_garment(
        &mut self,
        ticket: GarmentTicket,
        result: Result<Vec<EncodedImage>, GenerationError>,
    ) -> GenerationOutcome {
        self.status = GenerationStatus::Idle;
        let latency_s = ticket.started.elapsed().as_secs_f64();

        match result {
            Ok(images) if images.is_empty() => {
                self.emit(
                    EventKind::GarmentFailed,
                    json!({
                        "request_id": ticket.request_id,
                        "reason": "empty",
                        "latency_s": latency_s,
                    }),
                );
                self.notifier.notify(FailureNotice::GarmentEmpty.message());
                GenerationOutcome::Empty
            }
            Ok(images) => {
                let count = images.len();
                let digests: Vec<String> = images.iter().map(image_digest).collect();
                self.garments_generated += count as u64;
                self.record(WizardAction::GarmentsGenerated(images));
                self.emit(
                    EventKind::GarmentGenerated,
                    json!({
                        "request_id": ticket.request_id,
                        "count": count,
                        "images": digests,
                        "pool_size": self.state.pool().len(),
                        "latency_s": latency_s,
                    }),
                );
                GenerationOutcome::Produced(count)
            }
            Err(err) => {
                eprintln!("fitroom: garment generation failed: {err}");
                self.emit(
                    EventKind::GarmentFailed,
                    json!({
                        "request_id": ticket.request_id,
                        "reason": "error",
                        "error": err.to_string(),
                        "latency_s": latency_s,
                    }),
                );
                self.notifier.notify(FailureNotice::GarmentFailed.message());
                GenerationOutcome::Failed
            }
        }
    }

    pub fn request_try_on(&mut self) -> GenerationOutcome {
        let Some(ticket) = self.begin_try_on() else {
            return GenerationOutcome::Skipped;
        };
        self.run_try_on(ticket)
    }

    /// Returns `None` when the person or garment is missing or while
    /// another request is in flight.
    pub fn begin_try_on(&mut self) -> Option<TryOnTicket> {
        let selection = self.state.selection();
        let person = selection.person.clone()?;
        let garment = selection.garment.clone()?;
        self.begin_try_on_with(person, garment)
    }

    pub fn finish_try_on(
        &mut self,
        ticket: TryOnTicket,
        result: Result<Vec<EncodedImage>, GenerationError>,
    ) -> GenerationOutcome {
        self.status = GenerationStatus::Idle;
        let latency_s = ticket.started.elapsed().as_secs_f64();

        match result {
            Ok(images) if images.is_empty() => {
                self.emit(
                    EventKind::TryOnFailed,
                    json!({
                        "request_id": ticket.request_id,
                        "reason": "empty",
                        "latency_s": latency_s,
                    }),
                );
                self.notifier.notify(FailureNotice::TryOnEmpty.message());
                GenerationOutcome::Empty
            }
            Ok(images) => {
                let count = images.len();
                self.try_ons_completed += 1;
                let mut digests = Vec::with_capacity(count);
                for image in images {
                    digests.push(image_digest(&image));
                    self.record(WizardAction::TryOnCompleted(image.clone()));
                    self.history.append(HistoryEntry::new(
                        ticket.person.clone(),
                        ticket.garment.clone(),
                        image,
                        Utc::now(),
                    ));
                }
                self.emit(
                    EventKind::TryOnCompleted,
                    json!({
                        "request_id": ticket.request_id,
                        "count": count,
                        "images": digests,
                        "history_len": self.history.len(),
                        "latency_s": latency_s,
                    }),
                );
                GenerationOutcome::Produced(count)
            }
            Err(err) => {
                eprintln!("fitroom: try-on generation failed: {err}");
                self.emit(
                    EventKind::TryOnFailed,
                    json!({
                        "request_id": ticket.request_id,
                        "reason": "error",
                        "error": err.to_string(),
                        "latency_s": latency_s,
                    }),
                );
                self.notifier.notify(FailureNotice::TryOnFailed.message());
                GenerationOutcome::Failed
            }
        }
    }

    /// Writes `summary.json` for the session and logs `session_finished`.
    pub fn finish(&self, summary_path: &Path) -> Result<SessionSummary> {
        let summary = SessionSummary {
            session_id: self.session_id.clone(),
            started_at: self.started_at.clone(),
            finished_at: now_utc_iso(),
            total_garments: self.garments_generated,
            total_try_ons: self.try_ons_completed,
            history: history_digest(&self.history),
        };
        let mut extra = Map::new();
        extra.insert(
            "provider".to_string(),
            Value::String(self.client.provider().to_string()),
        );
        extra.insert(
            "model".to_string(),
            Value::String(self.client.model().to_string()),
        );
        write_summary(summary_path, &summary, Some(&extra))?;
        self.emit(
            EventKind::SessionFinished,
            json!({
                "summary_path": summary_path.to_string_lossy().to_string(),
            }),
        );
        Ok(summary)
    }

    fn run_effect(&mut self, effect: WizardEffect) -> GenerationOutcome {
        match effect {
            WizardEffect::TryOnRequested { person, garment } => {
                match self.begin_try_on_with(person, garment) {
                    Some(ticket) => self.run_try_on(ticket),
                    None => GenerationOutcome::Skipped,
                }
            }
        }
    }

    fn run_try_on(&mut self, ticket: TryOnTicket) -> GenerationOutcome {
        let result = self
            .client
            .synthesize_try_on(&ticket.person, &ticket.garment);
        self.finish_try_on(ticket, result)
    }

    fn begin_try_on_with(
        &mut self,
        person: EncodedImage,
        garment: EncodedImage,
    ) -> Option<TryOnTicket> {
        let request_id = self.acquire("try_on")?;
        self.emit(
            EventKind::TryOnRequested,
            json!({
                "request_id": request_id,
                "person": image_digest(&person),
                "garment": image_digest(&garment),
                "provider": self.client.provider(),
                "model": self.client.model(),
            }),
        );
        Some(TryOnTicket {
            request_id,
            person,
            garment,
            started: Instant::now(),
        })
    }

    fn acquire(&mut self, kind: &str) -> Option<u64> {
        if self.status == GenerationStatus::InFlight {
            self.emit(EventKind::RequestDropped, json!({ "kind": kind }));
            return None;
        }
        self.status = GenerationStatus::InFlight;
        self.next_request_id += 1;
        Some(self.next_request_id)
    }

    fn apply(&mut self, action: WizardAction) -> Result<Transition, TransitionError> {
        let name = action.name();
        let transition = self.state.apply(action)?;
        if transition.stage_changed() {
            self.emit(
                EventKind::StageChanged,
                json!({
                    "action": name,
                    "from": transition.from,
                    "to": transition.to,
                }),
            );
        }
        Ok(transition)
    }

    /// For actions the reducer accepts in every stage.
    fn record(&mut self, action: WizardAction) {
        if let Err(err) = self.apply(action) {
            eprintln!("fitroom: state update rejected: {err}");
        }
    }

    fn emit(&self, kind: EventKind, payload: Value) {
        let Some(events) = self.events.as_ref() else {
            return;
        };
        if let Err(err) = events.emit(kind, map_object(payload)) {
            eprintln!("fitroom: event log write failed ({}): {err:#}", kind.as_str());
        }
    }
}

/// Short stable label for logging an image without its payload.
fn image_digest(image: &EncodedImage) -> String {
    let mut hasher = Sha256::new();
    hasher.update(image.as_str().as_bytes());
    hex::encode(&hasher.finalize()[..6])
}

fn map_object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
