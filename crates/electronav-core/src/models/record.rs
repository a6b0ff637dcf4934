use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Persisted placement of one electrode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectrodeRecord {
    /// Electrode type id (brand + gauge code)
    pub id: String,
    pub target_x: f64,
    pub target_y: f64,
    pub depth: f64,
    pub guide_length: f64,
}

/// One row of the recording history, keyed by date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub date: NaiveDate,
    pub subject_id: String,
    pub electrodes: Vec<ElectrodeRecord>,

    /// Per-electrode contact ratings, in electrode order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<Vec<Vec<u32>>>,
}

impl SessionRecord {
    pub fn electrode_count(&self) -> usize {
        self.electrodes.len()
    }
}
