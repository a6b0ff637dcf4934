//! In-memory session history for tests and throwaway sessions.

use chrono::NaiveDate;
use electronav_core::error::{ElectronavError, Result};
use electronav_core::models::SessionRecord;
use electronav_core::ports::{SaveOutcome, SessionHistoryStore};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

/// History kept in a date-ordered map. Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistoryStore {
    records: Arc<RwLock<BTreeMap<NaiveDate, SessionRecord>>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with existing records; a later record replaces an earlier one with the same date
    pub fn with_records(records: impl IntoIterator<Item = SessionRecord>) -> Self {
        let map = records.into_iter().map(|r| (r.date, r)).collect();
        Self { records: Arc::new(RwLock::new(map)) }
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionHistoryStore for MemoryHistoryStore {
    fn save(
        &self,
        record: &SessionRecord,
        confirm: &dyn Fn(&SessionRecord) -> bool,
    ) -> Result<SaveOutcome> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);

        let outcome = match records.get(&record.date) {
            Some(existing) if !confirm(existing) => return Ok(SaveOutcome::Declined),
            Some(_) => SaveOutcome::Overwritten,
            None => SaveOutcome::Created,
        };
        records.insert(record.date, record.clone());

        tracing::info!(date = %record.date, ?outcome, "Saved session to memory history");
        Ok(outcome)
    }

    fn load_all(&self) -> Result<Vec<SessionRecord>> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(records.values().cloned().collect())
    }

    fn load_by_date(&self, date: NaiveDate) -> Result<SessionRecord> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records.get(&date).cloned().ok_or(ElectronavError::SessionNotFound { date })
    }
}
