//! Volumetric image layers (native MRI, atlas, structure masks).
//!
//! Voxel indices are 1-based along each axis, matching the origin voxel
//! convention of the loaders: `mm = (index - origin_vox) * voxel_dim`.

use crate::error::{ElectronavError, Result};
use ndarray::Array3;
use serde::{Deserialize, Serialize};

/// Output of a volume loader
#[derive(Debug, Clone)]
pub struct LoadedVolume {
    pub samples: Array3<f32>,
    /// Voxel size along x, y, z (mm)
    pub voxel_dim: [f64; 3],
    pub dim_vox: [usize; 3],
    /// 1-based voxel index of the millimetre origin
    pub origin_vox: [f64; 3],
    /// Millimetre position of the first voxel (translation row of the affine)
    pub affine_offset_mm: [f64; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerKind {
    Native,
    Atlas,
    Structure,
}

/// Label offset used by bilateral atlases to encode the second hemisphere.
///
/// Atlas volumes in this format store right-hemisphere labels as
/// `label + offset`; folding maps both hemispheres onto one label range.
/// It is a property of the atlas file, not of label volumes in general.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HemisphereFolding {
    pub offset: f32,
}

impl HemisphereFolding {
    pub fn new(offset: f32) -> Self {
        Self { offset }
    }

    pub fn fold(&self, value: f32) -> f32 {
        if value > self.offset {
            value - self.offset
        } else {
            value
        }
    }
}

impl Default for HemisphereFolding {
    fn default() -> Self {
        Self { offset: 1000.0 }
    }
}

/// Per-layer display options
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerOptions {
    pub opacity: f32,
    pub smoothing_sigma: f64,
    pub folding: Option<HemisphereFolding>,
}

impl Default for LayerOptions {
    fn default() -> Self {
        Self { opacity: 1.0, smoothing_sigma: 0.0, folding: Some(HemisphereFolding::default()) }
    }
}

#[derive(Debug, Clone)]
pub struct VolumeLayer {
    name: String,
    kind: LayerKind,
    number: usize,
    samples: Array3<f32>,
    alpha: Option<Array3<f32>>,
    voxel_dim: [f64; 3],
    dim_vox: [usize; 3],
    origin_vox: [f64; 3],
    lower_bound_mm: [f64; 3],
    upper_bound_mm: [f64; 3],
    current_slice: [usize; 3],
    opacity: f32,
    smoothing_sigma: f64,
    folding: Option<HemisphereFolding>,
}

impl VolumeLayer {
    /// Build a display layer from loader output.
    ///
    /// `number` is the 1-based stacking position. Layer 1 is the opaque
    /// anatomical base and is normalised to `[0, 1)`; higher layers hold
    /// label indices, folded per `options.folding`, with a `value > 0` mask.
    pub fn from_loaded(
        name: impl Into<String>,
        kind: LayerKind,
        number: usize,
        loaded: LoadedVolume,
        options: &LayerOptions,
    ) -> Result<Self> {
        let name = name.into();
        if number == 0 {
            return Err(ElectronavError::invalid("layer number", "layers are numbered from 1"));
        }
        let shape = loaded.samples.dim();
        if [shape.0, shape.1, shape.2] != loaded.dim_vox {
            return Err(ElectronavError::invalid(
                format!("volume {}", name),
                format!("samples have shape {:?}, header says {:?}", shape, loaded.dim_vox),
            ));
        }
        if loaded.dim_vox.iter().any(|&d| d == 0) {
            return Err(ElectronavError::invalid(format!("volume {}", name), "empty dimension"));
        }
        if loaded.voxel_dim.iter().any(|v| !(v.is_finite() && *v > 0.0)) {
            return Err(ElectronavError::invalid(
                format!("volume {}", name),
                format!("voxel sizes must be > 0, got {:?}", loaded.voxel_dim),
            ));
        }
        if options.smoothing_sigma < 0.0 || !options.smoothing_sigma.is_finite() {
            return Err(ElectronavError::invalid("smoothing sigma", "must be >= 0"));
        }

        let mut samples = loaded.samples;
        let alpha = if number == 1 {
            normalize_intensity(&mut samples);
            None
        } else {
            if let Some(folding) = options.folding {
                samples.mapv_inplace(|v| folding.fold(v));
            }
            Some(samples.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }))
        };

        let mut upper_bound_mm = [0.0; 3];
        for k in 0..3 {
            upper_bound_mm[k] =
                loaded.affine_offset_mm[k] + (loaded.dim_vox[k] - 1) as f64 * loaded.voxel_dim[k];
        }

        Ok(Self {
            name,
            kind,
            number,
            samples,
            alpha,
            voxel_dim: loaded.voxel_dim,
            dim_vox: loaded.dim_vox,
            origin_vox: loaded.origin_vox,
            lower_bound_mm: loaded.affine_offset_mm,
            upper_bound_mm,
            current_slice: loaded.dim_vox.map(|d| (d + 1) / 2),
            opacity: if number == 1 { 1.0 } else { options.opacity.clamp(0.0, 1.0) },
            smoothing_sigma: options.smoothing_sigma,
            folding: options.folding,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn number(&self) -> usize {
        self.number
    }

    pub fn is_base(&self) -> bool {
        self.number == 1
    }

    pub fn samples(&self) -> &Array3<f32> {
        &self.samples
    }

    pub fn alpha(&self) -> Option<&Array3<f32>> {
        self.alpha.as_ref()
    }

    pub fn voxel_dim(&self) -> [f64; 3] {
        self.voxel_dim
    }

    pub fn dim_vox(&self) -> [usize; 3] {
        self.dim_vox
    }

    pub fn origin_vox(&self) -> [f64; 3] {
        self.origin_vox
    }

    pub fn lower_bound_mm(&self) -> [f64; 3] {
        self.lower_bound_mm
    }

    pub fn upper_bound_mm(&self) -> [f64; 3] {
        self.upper_bound_mm
    }

    pub fn contains_mm(&self, point: [f64; 3]) -> bool {
        (0..3).all(|k| point[k] >= self.lower_bound_mm[k] && point[k] <= self.upper_bound_mm[k])
    }

    pub fn current_slice(&self) -> [usize; 3] {
        self.current_slice
    }

    /// Record the slice shown for the plane whose fixed axis is `axis`
    pub fn set_current_slice(&mut self, axis: usize, index: usize) -> Result<()> {
        let Some(&dim) = self.dim_vox.get(axis) else {
            return Err(ElectronavError::out_of_range("volume axis", axis, 3));
        };
        if index == 0 || index > dim {
            return Err(ElectronavError::out_of_range("slice", index, dim));
        }
        self.current_slice[axis] = index;
        Ok(())
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Clamped to `[0, 1]`; the base layer stays opaque
    pub fn set_opacity(&mut self, opacity: f32) {
        if !self.is_base() {
            self.opacity = opacity.clamp(0.0, 1.0);
        }
    }

    pub fn smoothing_sigma(&self) -> f64 {
        self.smoothing_sigma
    }

    pub fn set_smoothing(&mut self, sigma: f64) -> Result<()> {
        if !(sigma.is_finite() && sigma >= 0.0) {
            return Err(ElectronavError::invalid("smoothing sigma", format!("must be >= 0, got {}", sigma)));
        }
        self.smoothing_sigma = sigma;
        Ok(())
    }

    pub fn folding(&self) -> Option<HemisphereFolding> {
        self.folding
    }
}

fn normalize_intensity(samples: &mut Array3<f32>) {
    let (min, max) = samples
        .iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

    if !(max > min) {
        samples.fill(0.0);
        return;
    }
    let scale = (1.0 - f32::EPSILON) / (max - min);
    samples.mapv_inplace(|v| if v.is_finite() { (v - min) * scale } else { 0.0 });
}
