//! Slice command implementation

use crate::cli::{AxisArg, SliceArgs};
use crate::output::{fmt_point, OutputWriter};
use crate::output_types::{OutlineOutput, SliceCommandOutput, SliceOutput, SliceRow};
use anyhow::{Context, Result};
use electronav_core::config::LayeredConfig;
use electronav_core::models::{LayerKind, VolumeLayer};
use electronav_core::ports::VolumeLoader;
use electronav_geo::outline::structure_outline;
use electronav_geo::slice::{composite, resolve_views, Axis};
use electronav_store::NiftiLoader;
use std::path::Path;

impl From<AxisArg> for Axis {
    fn from(arg: AxisArg) -> Self {
        match arg {
            AxisArg::Sagittal => Axis::Sagittal,
            AxisArg::Coronal => Axis::Coronal,
            AxisArg::Axial => Axis::Axial,
        }
    }
}

fn load_layer(
    loader: &NiftiLoader,
    path: &Path,
    kind: LayerKind,
    number: usize,
    config: &LayeredConfig,
) -> Result<VolumeLayer> {
    let loaded = loader
        .load(path)
        .with_context(|| format!("Failed to load volume {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(VolumeLayer::from_loaded(name, kind, number, loaded, &config.layer_options(number))?)
}

pub fn execute(args: &SliceArgs, config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let point = [args.point[0], args.point[1], args.point[2]];
    let loader = NiftiLoader::new();

    let mut layers = vec![load_layer(&loader, &args.volume, LayerKind::Native, 1, config)?];
    if let Some(atlas) = &args.atlas {
        layers.push(load_layer(&loader, atlas, LayerKind::Atlas, 2, config)?);
    }

    let views = resolve_views(&mut layers, point);
    let axes: Vec<Axis> = match args.axis {
        Some(axis) => vec![axis.into()],
        None => Axis::ALL.to_vec(),
    };

    let mut slices = Vec::new();
    let mut outlines = Vec::new();
    for axis in axes {
        let k = axis.fixed();
        let planes: Vec<_> = layers.iter().zip(&views).map(|(layer, view)| (layer, &view[k])).collect();
        let images = composite(&planes);

        for ((layer, slice), image) in planes.iter().zip(&images) {
            let (rows, cols) = slice.shape();
            let (min, max) = slice
                .slab
                .iter()
                .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
            slices.push(SliceOutput {
                layer: layer.name().to_string(),
                axis: axis.to_string(),
                valid: slice.valid,
                index_vox: slice.index_vox,
                position_mm: slice.position_mm,
                shape: [rows, cols],
                min,
                max,
                visible: image.alpha.iter().filter(|&&a| a > 0.0).count(),
                corners_mm: slice.in_plane_corners_mm,
            });
        }

        if let (Some(label), Some((atlas, slice))) = (args.label, planes.get(1)) {
            let outline = structure_outline(atlas, slice, label);
            outlines.push(OutlineOutput {
                label,
                axis: axis.to_string(),
                contours: outline.contours,
                anchor: outline.anchor,
            });
        }
    }

    if output.is_json() {
        return output.result(SliceCommandOutput { point, slices, outlines });
    }

    output.kv("Point", fmt_point(point));
    if slices.iter().any(|s| !s.valid) {
        output.warning("Point lies outside at least one volume; those planes are empty");
    }

    output.section("Slices");
    let rows: Vec<SliceRow> = slices
        .iter()
        .map(|s| SliceRow {
            layer: s.layer.clone(),
            axis: s.axis.clone(),
            index: if s.valid {
                format!("{:?}", s.index_vox)
            } else {
                "outside".to_string()
            },
            position: format!("{:.3}", s.position_mm),
            shape: format!("{}x{}", s.shape[0], s.shape[1]),
            range: format!("{:.3} .. {:.3}", s.min, s.max),
            visible: s.visible,
        })
        .collect();
    output.table(rows)?;

    for outline in &outlines {
        output.section(format!("Label {} ({})", outline.label, outline.axis));
        if outline.contours.is_empty() {
            output.info("Label not present on this plane");
            continue;
        }
        output.kv("Contours", outline.contours.len());
        output.kv(
            "Points",
            outline.contours.iter().map(Vec::len).sum::<usize>(),
        );
        if let Some(anchor) = outline.anchor {
            output.kv("Anchor", fmt_point(anchor));
        }
    }
    Ok(())
}
