//! Recording history kept as a CSV spreadsheet.
//!
//! One row per electrode:
//!
//! ```text
//! date,subject,electrode,id,target_x,target_y,depth,guide_length,quality
//! 2024-05-14,Subject-A,1,PLX24,0,0,12.5,20,0;0;0;0;4;0;...
//! ```
//!
//! `electrode` is the 1-based position in the session and `quality` holds
//! the contact ratings joined with `;` (empty when the session was unrated).
//! Saving rewrites the whole file through a temporary sibling.

use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim, WriterBuilder};
use electronav_core::error::{ElectronavError, Result};
use electronav_core::models::{ElectrodeRecord, SessionRecord};
use electronav_core::ports::{SaveOutcome, SessionHistoryStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const QUALITY_SEPARATOR: char = ';';

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct HistoryRow {
    date: NaiveDate,
    subject: String,
    electrode: usize,
    id: String,
    target_x: f64,
    target_y: f64,
    depth: f64,
    guide_length: f64,
    #[serde(default)]
    quality: String,
}

#[derive(Debug, Clone)]
pub struct CsvHistoryStore {
    path: PathBuf,
}

impl CsvHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_records(&self) -> Result<BTreeMap<NaiveDate, SessionRecord>> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "History file missing, starting empty");
            return Ok(BTreeMap::new());
        }

        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .from_path(&self.path)
            .map_err(|e| self.csv_error(e))?;

        let mut grouped: BTreeMap<NaiveDate, Vec<HistoryRow>> = BTreeMap::new();
        for (idx, row) in reader.deserialize::<HistoryRow>().enumerate() {
            let row = row.map_err(|e| {
                ElectronavError::Serialization(format!(
                    "{}: row {}: {}",
                    self.path.display(),
                    idx + 1,
                    e
                ))
            })?;
            grouped.entry(row.date).or_default().push(row);
        }

        grouped
            .into_iter()
            .map(|(date, rows)| Ok((date, rows_to_record(date, rows)?)))
            .collect()
    }

    fn write_records(&self, records: &BTreeMap<NaiveDate, SessionRecord>) -> Result<()> {
        let staging = self.path.with_extension("csv.tmp");
        {
            let mut writer = WriterBuilder::new().from_path(&staging).map_err(|e| self.csv_error(e))?;
            for record in records.values() {
                for row in record_to_rows(record) {
                    writer.serialize(&row).map_err(|e| self.csv_error(e))?;
                }
            }
            writer.flush()?;
        }
        fs::rename(&staging, &self.path)?;
        Ok(())
    }

    fn csv_error(&self, error: csv::Error) -> ElectronavError {
        ElectronavError::Serialization(format!("{}: {}", self.path.display(), error))
    }
}

fn record_to_rows(record: &SessionRecord) -> Vec<HistoryRow> {
    record
        .electrodes
        .iter()
        .enumerate()
        .map(|(i, electrode)| {
            let quality = record
                .quality
                .as_ref()
                .and_then(|q| q.get(i))
                .map(|ratings| {
                    ratings
                        .iter()
                        .map(u32::to_string)
                        .collect::<Vec<_>>()
                        .join(&QUALITY_SEPARATOR.to_string())
                })
                .unwrap_or_default();
            HistoryRow {
                date: record.date,
                subject: record.subject_id.clone(),
                electrode: i + 1,
                id: electrode.id.clone(),
                target_x: electrode.target_x,
                target_y: electrode.target_y,
                depth: electrode.depth,
                guide_length: electrode.guide_length,
                quality,
            }
        })
        .collect()
}

fn rows_to_record(date: NaiveDate, mut rows: Vec<HistoryRow>) -> Result<SessionRecord> {
    rows.sort_by_key(|row| row.electrode);

    let subject_id = rows.first().map(|row| row.subject.clone()).unwrap_or_default();
    let mut electrodes = Vec::with_capacity(rows.len());
    let mut quality = Vec::with_capacity(rows.len());
    for row in &rows {
        electrodes.push(ElectrodeRecord {
            id: row.id.clone(),
            target_x: row.target_x,
            target_y: row.target_y,
            depth: row.depth,
            guide_length: row.guide_length,
        });
        quality.push(parse_quality(date, &row.quality)?);
    }

    let rated = quality.iter().any(|q| !q.is_empty());
    Ok(SessionRecord {
        date,
        subject_id,
        electrodes,
        quality: rated.then_some(quality),
    })
}

fn parse_quality(date: NaiveDate, field: &str) -> Result<Vec<u32>> {
    field
        .split(QUALITY_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>().map_err(|e| {
                ElectronavError::Serialization(format!("quality rating '{}' on {}: {}", s, date, e))
            })
        })
        .collect()
}

impl SessionHistoryStore for CsvHistoryStore {
    fn save(
        &self,
        record: &SessionRecord,
        confirm: &dyn Fn(&SessionRecord) -> bool,
    ) -> Result<SaveOutcome> {
        if record.electrodes.is_empty() {
            return Err(ElectronavError::invalid("session record", "contains no electrodes"));
        }

        let mut records = self.read_records()?;
        let outcome = match records.get(&record.date) {
            Some(existing) if !confirm(existing) => {
                tracing::info!(date = %record.date, "Overwrite declined, history unchanged");
                return Ok(SaveOutcome::Declined);
            }
            Some(_) => SaveOutcome::Overwritten,
            None => SaveOutcome::Created,
        };

        records.insert(record.date, record.clone());
        self.write_records(&records)?;

        tracing::info!(
            path = %self.path.display(),
            date = %record.date,
            electrodes = record.electrode_count(),
            ?outcome,
            "Saved session to history"
        );
        Ok(outcome)
    }

    fn load_all(&self) -> Result<Vec<SessionRecord>> {
        Ok(self.read_records()?.into_values().collect())
    }

    fn load_by_date(&self, date: NaiveDate) -> Result<SessionRecord> {
        self.read_records()?
            .remove(&date)
            .ok_or(ElectronavError::SessionNotFound { date })
    }
}
