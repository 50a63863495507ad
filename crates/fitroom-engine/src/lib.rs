mod client;
mod config;
mod error;
mod notify;
mod orchestrator;
mod transport;

pub use client::{garment_prompt, GenerationClient, TRY_ON_INSTRUCTION};
pub use config::{EngineConfig, DEFAULT_API_BASE, DEFAULT_IMAGE_MODEL};
pub use error::GenerationError;
pub use notify::{FailureNotice, Notifier};
pub use orchestrator::{
    GarmentTicket, GenerationOutcome, GenerationStatus, Orchestrator, TryOnTicket,
};
pub use transport::{
    transport_for, ContentPart, DryrunTransport, GeminiTransport, ImageTransport, InlineImage,
    TRANSPORT_NAMES,
};
