//! Electrodes command implementation

use crate::output::OutputWriter;
use crate::output_types::ElectrodeTypeRow;
use anyhow::Result;
use electronav_core::ports::ElectrodeCatalog;

pub fn execute(catalog: &dyn ElectrodeCatalog, output: &OutputWriter) -> Result<()> {
    let rows: Vec<ElectrodeTypeRow> = catalog
        .list()
        .into_iter()
        .map(|t| ElectrodeTypeRow {
            id: t.id,
            contacts: t.default_contact_number,
            diameter: t.diameter,
            tip_length: t.tip_length,
            contact_spacing: t.contact_spacing,
        })
        .collect();

    output.section("Electrode Types");
    output.table(rows)
}
