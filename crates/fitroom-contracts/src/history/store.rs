use chrono::{DateTime, Utc};

use crate::image::EncodedImage;

/// One completed try-on. Fields are fixed at creation.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    person: EncodedImage,
    garment: EncodedImage,
    result: EncodedImage,
    timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(
        person: EncodedImage,
        garment: EncodedImage,
        result: EncodedImage,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            person,
            garment,
            result,
            timestamp,
        }
    }

    pub fn person(&self) -> &EncodedImage {
        &self.person
    }

    pub fn garment(&self) -> &EncodedImage {
        &self.garment
    }

    pub fn result(&self) -> &EncodedImage {
        &self.result
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Append-only log of try-on results for the running session.
///
/// Display order is newest first; index 0 is the latest entry. Entries are
/// never removed.
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    // Oldest first so appends stay O(1).
    entries: Vec<HistoryEntry>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        let len = self.entries.len();
        if index >= len {
            return None;
        }
        self.entries.get(len - 1 - index)
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &HistoryEntry> + '_ {
        self.entries.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The image to show when `entry` is picked from the gallery. The
    /// returned value shares storage with the entry.
    pub fn restore(&self, entry: &HistoryEntry) -> EncodedImage {
        entry.result.clone()
    }
}
