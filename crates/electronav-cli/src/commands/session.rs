//! Session command implementation

use crate::cli::RecordArgs;
use crate::output::OutputWriter;
use crate::output_types::RecordOutput;
use anyhow::{anyhow, Result};
use chrono::Local;
use dialoguer::Confirm;
use electronav_core::config::LayeredConfig;
use electronav_core::models::{DepthComponent, Session, SessionRecord, Target};
use electronav_core::ports::{ElectrodeCatalog, SaveOutcome, SessionHistoryStore};
use electronav_store::CsvHistoryStore;

/// Build a session from the command line and write it to the history
pub fn record(
    args: &RecordArgs,
    config: &LayeredConfig,
    catalog: &dyn ElectrodeCatalog,
    output: &OutputWriter,
) -> Result<()> {
    let date = args.date.unwrap_or_else(|| Local::now().date_naive());
    let scale = config.quality_scale()?;

    let first = args
        .electrodes
        .first()
        .ok_or_else(|| anyhow!("At least one --electrode is required"))?;
    let mut session = Session::new(date, args.subject.clone(), &catalog.lookup(&first.id)?, scale)?;

    for (index, placement) in args.electrodes.iter().enumerate() {
        if index > 0 {
            session.add_electrode(&placement.id, catalog)?;
        }
        let electrode = session.electrode_mut(index)?;
        electrode.set_target(Target::new(placement.x, placement.y))?;
        electrode.set_depth(DepthComponent::Start, placement.depth)?;
        electrode.set_guide_length(placement.guide)?;
    }

    for rating in &args.ratings {
        let index = rating
            .electrode
            .checked_sub(1)
            .ok_or_else(|| anyhow!("Electrode numbers in --rate start at 1"))?;
        let stored = session
            .electrode_mut(index)?
            .rate_contact(rating.contact, rating.rating, &scale)?;
        if stored as i64 != rating.rating {
            output.warning(format!(
                "Rating {} for electrode {} contact {} saturated to {}",
                rating.rating, rating.electrode, rating.contact, stored
            ));
        }
    }

    let store = CsvHistoryStore::new(config.history_path.value.clone());
    let assume_yes = args.yes;
    let confirm = |existing: &SessionRecord| -> bool {
        if assume_yes {
            return true;
        }
        Confirm::new()
            .with_prompt(format!(
                "A session dated {} ({}, {} electrodes) is already recorded. Overwrite?",
                existing.date,
                existing.subject_id,
                existing.electrode_count()
            ))
            .default(false)
            .interact()
            .unwrap_or(false)
    };
    let outcome = store.save(&session.to_record(), &confirm)?;
    tracing::debug!(date = %date, outcome = ?outcome, "Session record saved");

    if output.is_json() {
        return output.result(RecordOutput {
            date: date.to_string(),
            subject: args.subject.clone(),
            electrodes: session.len(),
            outcome: format!("{:?}", outcome).to_lowercase(),
            history_path: store.path().display().to_string(),
        });
    }

    match outcome {
        SaveOutcome::Created => output.success(format!(
            "Recorded session {} with {} electrode(s)",
            date,
            session.len()
        )),
        SaveOutcome::Overwritten => output.success(format!("Replaced session {}", date)),
        SaveOutcome::Declined => output.warning(format!("Kept the existing session {}", date)),
    }
    output.kv("History", store.path().display());
    Ok(())
}
