mod store;
mod summary;

pub use store::{HistoryEntry, HistoryStore};
pub use summary::{history_digest, write_summary, SessionSummary};
