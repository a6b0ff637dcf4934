//! Grid command implementation

use crate::cli::GridArgs;
use crate::output::OutputWriter;
use crate::output_types::{HoleLookupOutput, HoleRow};
use anyhow::Result;
use electronav_core::config::LayeredConfig;

pub fn execute(args: &GridArgs, config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let grid = config.grid_model()?;

    if let Some([x, y]) = args.at.as_deref() {
        let hole = grid.hole_at(*x, *y).copied();
        let nearest = grid.nearest_hole(*x, *y).copied();

        if output.is_json() {
            return output.result(HoleLookupOutput { point: [*x, *y], hole, nearest });
        }

        match (hole, nearest) {
            (Some(hole), _) => output.success(format!(
                "({}, {}) is inside hole {} (row {}, column {})",
                x, y, hole.index, hole.row, hole.column
            )),
            (None, Some(near)) => {
                output.warning(format!("({}, {}) is not inside any hole", x, y));
                output.kv(
                    "Nearest hole",
                    format!("{} at ({}, {})", near.index, near.x_mm, near.y_mm),
                );
            }
            (None, None) => output.warning("The grid has no holes"),
        }
        return Ok(());
    }

    let rows: Vec<HoleRow> = grid.holes().iter().map(HoleRow::from).collect();
    if output.is_json() {
        return output.table(rows);
    }

    let spec = grid.spec();
    output.section("Recording Grid");
    output.kv("Rows", spec.holes_per_dim());
    output.kv("Holes", grid.len());
    output.kv("Spacing", format!("{} mm", spec.inter_hole_spacing));
    output.kv("Hole diameter", format!("{} mm", spec.hole_diameter));

    output.section("Holes");
    output.table(rows)
}
