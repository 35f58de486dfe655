//! Measurement snapshot store
//!
//! Holds a validated snapshot of a user's measurements. Entries are only ever
//! appended or removed; readers get freshly sorted copies so no calculator
//! mutates the shared snapshot.

use chrono::NaiveDate;
use tracing::debug;

use crate::config::WeightBounds;
use crate::error::{EngineError, ValidationError};
use crate::types::{Measurement, TimeRange};

/// Validated measurement snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementStore {
    entries: Vec<Measurement>,
    bounds: WeightBounds,
}

impl MeasurementStore {
    /// Create an empty store with default weight bounds
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with explicit weight bounds
    pub fn with_bounds(bounds: WeightBounds) -> Self {
        Self {
            entries: Vec::new(),
            bounds,
        }
    }

    /// Build a store from entries, failing on the first invalid one
    pub fn from_entries(
        entries: impl IntoIterator<Item = Measurement>,
    ) -> Result<Self, EngineError> {
        let mut store = Self::new();
        for entry in entries {
            store.append(entry)?;
        }
        Ok(store)
    }

    /// Append a measurement after validating it.
    ///
    /// Invalid entries are rejected and never become part of the snapshot.
    pub fn append(&mut self, entry: Measurement) -> Result<(), EngineError> {
        entry.validate_within(self.bounds.min_kg, self.bounds.max_kg)?;
        if self.entries.iter().any(|e| e.id == entry.id) {
            return Err(ValidationError::invalid(
                "id",
                format!("duplicate measurement id '{}'", entry.id),
            )
            .into());
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Delete a measurement by id, returning it if present
    pub fn remove(&mut self, id: &str) -> Option<Measurement> {
        let idx = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(idx))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order
    pub fn entries(&self) -> &[Measurement] {
        &self.entries
    }

    /// Copy of the snapshot sorted ascending by date.
    ///
    /// The sort is stable, so same-day entries keep their insertion order.
    pub fn sorted_ascending(&self) -> Vec<Measurement> {
        let mut sorted = self.entries.clone();
        sorted.sort_by_key(|m| m.date);
        sorted
    }

    /// Entries with `date >= today - range_days`, ascending; the full snapshot for `All`
    pub fn filtered(&self, range: TimeRange, today: NaiveDate) -> Vec<Measurement> {
        let sorted = self.sorted_ascending();
        let filtered: Vec<Measurement> = match range.cutoff(today) {
            Some(cutoff) => sorted.into_iter().filter(|m| m.date >= cutoff).collect(),
            None => sorted,
        };
        debug!(
            range = %range,
            total = self.entries.len(),
            kept = filtered.len(),
            "filtered measurement snapshot"
        );
        filtered
    }

    /// Chronologically first measurement
    pub fn first(&self) -> Option<&Measurement> {
        self.entries.iter().min_by_key(|m| m.date)
    }

    /// Chronologically latest measurement
    pub fn latest(&self) -> Option<&Measurement> {
        // max_by_key returns the last of equal maxima, i.e. the latest insertion
        self.entries.iter().max_by_key(|m| m.date)
    }
}
