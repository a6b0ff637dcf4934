//! Locate command implementation

use crate::cli::LocateArgs;
use crate::output::{fmt_point, OutputWriter};
use crate::output_types::{ContactRow, LocateOutput};
use anyhow::{Context, Result};
use electronav_core::config::LayeredConfig;
use electronav_core::models::{DepthComponent, Electrode, ElectrodeHandle, Target};
use electronav_core::ports::ElectrodeCatalog;
use electronav_geo::placement::ElectrodePlacement;
use electronav_geo::transform::RigidTransform;

pub fn execute(
    args: &LocateArgs,
    config: &LayeredConfig,
    catalog: &dyn ElectrodeCatalog,
    output: &OutputWriter,
) -> Result<()> {
    let id = args.electrode.as_deref().unwrap_or(&config.default_electrode.value);
    let kind = catalog.lookup(id)?;

    let transform = match &args.transform {
        Some(path) => RigidTransform::load(path)
            .with_context(|| format!("Failed to load transform {}", path.display()))?,
        None => RigidTransform::identity(),
    };

    let mut target = Target::new(args.target[0], args.target[1]);
    if args.snap {
        let snapped = config.grid_model()?.snap(target);
        if snapped != target && !output.is_json() {
            output.info(format!(
                "Snapped target ({}, {}) to hole centre ({}, {})",
                target.x, target.y, snapped.x, snapped.y
            ));
        }
        target = snapped;
    }

    let mut electrode = Electrode::new(ElectrodeHandle(0), &kind)?;
    electrode.set_target(target)?;
    electrode.set_depth(DepthComponent::Start, args.depth)?;
    electrode.set_depth(DepthComponent::Microdrive, args.microdrive)?;
    electrode.set_guide_length(args.guide)?;
    if let Some(n) = args.contacts {
        electrode.resize_contacts(n)?;
    }

    let geometry = electrode.world_geometry(&transform);
    let tip = electrode.tip_world_position(&transform);

    if output.is_json() {
        return output.result(LocateOutput {
            electrode: kind.id,
            target: [target.x, target.y],
            current_depth: electrode.current_depth(),
            tip,
            geometry,
        });
    }

    output.section(format!("Electrode {}", kind.id));
    output.kv("Target", format!("({}, {}) mm", target.x, target.y));
    output.kv("Depth", format!("{} mm", electrode.current_depth()));
    output.kv("Guide tube", fmt_point(geometry.guide.end));
    output.kv("Tip", fmt_point(tip));

    output.section("Contacts");
    let rows: Vec<ContactRow> = geometry
        .contacts
        .iter()
        .map(|c| ContactRow {
            contact: c.number,
            x: format!("{:.3}", c.centre[0]),
            y: format!("{:.3}", c.centre[1]),
            z: format!("{:.3}", c.centre[2]),
        })
        .collect();
    output.table(rows)
}
