//! History command implementation

use crate::cli::{HistoryArgs, HistoryCommands};
use crate::output::OutputWriter;
use crate::output_types::{HistoryRow, SessionElectrodeRow};
use anyhow::Result;
use chrono::NaiveDate;
use electronav_core::config::LayeredConfig;
use electronav_core::models::Session;
use electronav_core::ports::{ElectrodeCatalog, SessionHistoryStore};
use electronav_store::CsvHistoryStore;

pub fn execute(
    args: &HistoryArgs,
    config: &LayeredConfig,
    catalog: &dyn ElectrodeCatalog,
    output: &OutputWriter,
) -> Result<()> {
    let store = CsvHistoryStore::new(config.history_path.value.clone());
    match &args.command {
        HistoryCommands::List => list(&store, output),
        HistoryCommands::Show { date } => show(&store, *date, config, catalog, output),
    }
}

fn list(store: &CsvHistoryStore, output: &OutputWriter) -> Result<()> {
    let rows: Vec<HistoryRow> = store
        .load_all()?
        .into_iter()
        .map(|r| HistoryRow {
            date: r.date.to_string(),
            subject: r.subject_id.clone(),
            electrodes: r.electrode_count(),
            rated: r.quality.is_some(),
        })
        .collect();

    output.section(format!("Recording History ({})", store.path().display()));
    output.table(rows)
}

fn show(
    store: &CsvHistoryStore,
    date: NaiveDate,
    config: &LayeredConfig,
    catalog: &dyn ElectrodeCatalog,
    output: &OutputWriter,
) -> Result<()> {
    let record = store.load_by_date(date)?;

    // Restoring into a session validates types and ratings against the catalog
    let first_id = record
        .electrodes
        .first()
        .map_or(config.default_electrode.value.as_str(), |e| e.id.as_str());
    let first = catalog.lookup(first_id)?;
    let mut session = Session::new(date, "", &first, config.quality_scale()?)?;
    session.load_from(&record, catalog)?;

    if output.is_json() {
        return output.result(session.to_record());
    }

    output.section(format!("Session {}", date));
    output.kv("Subject", session.subject_id());
    output.kv("Electrodes", session.len());

    let rows: Vec<SessionElectrodeRow> = session
        .electrodes()
        .iter()
        .enumerate()
        .map(|(i, e)| SessionElectrodeRow {
            position: i + 1,
            id: e.id().to_string(),
            target_x: e.target().x,
            target_y: e.target().y,
            depth: e.current_depth(),
            guide_length: e.guide_length(),
            ratings: e.contact_data().iter().map(u32::to_string).collect::<Vec<_>>().join(" "),
        })
        .collect();
    output.table(rows)
}
