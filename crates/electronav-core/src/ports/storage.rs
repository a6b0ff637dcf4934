use crate::error::Result;
use crate::models::SessionRecord;
use chrono::NaiveDate;

/// Result of saving a session record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// No record existed for the date
    Created,
    /// An existing record was replaced after confirmation
    Overwritten,
    /// The caller declined to overwrite; the store is unchanged
    Declined,
}

/// Port for the recording history
pub trait SessionHistoryStore {
    /// Append or update the record for `record.date`.
    ///
    /// `confirm` is called with the stored record only when the date already
    /// exists; returning `false` leaves the store untouched.
    fn save(
        &self,
        record: &SessionRecord,
        confirm: &dyn Fn(&SessionRecord) -> bool,
    ) -> Result<SaveOutcome>;

    /// All records, ordered by date
    fn load_all(&self) -> Result<Vec<SessionRecord>>;

    /// Record for one date
    fn load_by_date(&self, date: NaiveDate) -> Result<SessionRecord>;
}
