//! Slice resolution for the three canonical planes.
//!
//! A slice is resolved from a point in scanner millimetres: the point is
//! mapped onto the layer's voxel grid, the plane through it is cut out of the
//! volume and reoriented to the display convention, and optionally smoothed.
//! Points outside the volume give a blank slab flagged `valid = false`.

use electronav_core::error::{ElectronavError, Result};
use electronav_core::models::VolumeLayer;
use ndarray::{Array2, Array3, Axis as NdAxis};
use serde::Serialize;

/// Side length of the smoothing kernel
const KERNEL_SIZE: usize = 5;

/// Canonical viewing planes, named by the axis held fixed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Axis {
    /// x fixed
    Sagittal,
    /// y fixed
    Coronal,
    /// z fixed
    Axial,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::Sagittal, Axis::Coronal, Axis::Axial];

    /// Volume axis held constant by this plane
    pub fn fixed(self) -> usize {
        match self {
            Axis::Sagittal => 0,
            Axis::Coronal => 1,
            Axis::Axial => 2,
        }
    }

    /// Volume axes shown along the slab's rows and columns
    pub fn display_axes(self) -> (usize, usize) {
        match self {
            Axis::Sagittal => (2, 1),
            Axis::Coronal => (2, 0),
            Axis::Axial => (0, 1),
        }
    }

    /// Map a slab cell back to its 0-based voxel index
    pub fn display_to_voxel(self, row: usize, col: usize, fixed_index: usize) -> [usize; 3] {
        let (row_axis, col_axis) = self.display_axes();
        let mut voxel = [0; 3];
        voxel[self.fixed()] = fixed_index;
        voxel[row_axis] = row;
        voxel[col_axis] = col;
        voxel
    }

    pub fn name(self) -> &'static str {
        match self {
            Axis::Sagittal => "sagittal",
            Axis::Coronal => "coronal",
            Axis::Axial => "axial",
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One resolved plane of one layer
#[derive(Debug, Clone, PartialEq)]
pub struct SliceDescriptor {
    pub axis: Axis,
    /// 1-based voxel index of the point; may lie outside the volume when invalid
    pub index_vox: [i64; 3],
    /// Millimetre position of the plane along the fixed axis
    pub position_mm: f64,
    /// Plane corners in scanner millimetres, in slab order
    /// (first row/first column, first row/last column, last/last, last/first)
    pub in_plane_corners_mm: [[f64; 3]; 4],
    pub valid: bool,
    pub slab: Array2<f32>,
    pub alpha: Option<Array2<f32>>,
}

impl SliceDescriptor {
    pub fn shape(&self) -> (usize, usize) {
        self.slab.dim()
    }
}

/// Layer slab ready for blending, with its effective per-pixel alpha
#[derive(Debug, Clone, PartialEq)]
pub struct LayerImage {
    pub layer: usize,
    pub values: Array2<f32>,
    pub alpha: Array2<f32>,
}

/// 1-based voxel index nearest to `point_mm` on every axis
pub fn voxel_index(layer: &VolumeLayer, point_mm: [f64; 3]) -> [i64; 3] {
    let origin = layer.origin_vox();
    let voxel_dim = layer.voxel_dim();
    let mut index = [0i64; 3];
    for k in 0..3 {
        index[k] = (origin[k] + point_mm[k] / voxel_dim[k]).round() as i64;
    }
    index
}

/// Millimetre coordinate of a 1-based voxel index on axis `k`
pub fn voxel_to_mm(layer: &VolumeLayer, k: usize, index: f64) -> f64 {
    (index - layer.origin_vox()[k]) * layer.voxel_dim()[k]
}

fn in_volume(layer: &VolumeLayer, index: &[i64; 3]) -> bool {
    let dim = layer.dim_vox();
    (0..3).all(|k| index[k] >= 1 && index[k] <= dim[k] as i64)
}

/// Cut the plane at 0-based `fixed_index` out of `volume`, in display orientation
pub fn extract_slab(volume: &Array3<f32>, axis: Axis, fixed_index: usize) -> Array2<f32> {
    let plane = volume.index_axis(NdAxis(axis.fixed()), fixed_index);
    match axis {
        Axis::Axial => plane.to_owned(),
        // rot90 followed by a flip is a transpose
        Axis::Sagittal | Axis::Coronal => plane.t().as_standard_layout().into_owned(),
    }
}

/// Resolve one plane of `layer` through `point_mm`.
pub fn resolve_slice(layer: &VolumeLayer, point_mm: [f64; 3], axis: Axis) -> SliceDescriptor {
    let index_vox = voxel_index(layer, point_mm);
    let dim = layer.dim_vox();
    let (row_axis, col_axis) = axis.display_axes();
    let fixed = axis.fixed();
    let valid = in_volume(layer, &index_vox);

    let position_mm = if valid {
        voxel_to_mm(layer, fixed, index_vox[fixed] as f64)
    } else {
        point_mm[fixed]
    };
    let in_plane_corners_mm = plane_corners(layer, axis, position_mm);

    if !valid {
        tracing::debug!(
            layer = layer.name(),
            axis = %axis,
            index = ?index_vox,
            dim = ?dim,
            "Slice point outside volume, returning blank slab"
        );
        let shape = (dim[row_axis], dim[col_axis]);
        return SliceDescriptor {
            axis,
            index_vox,
            position_mm,
            in_plane_corners_mm,
            valid,
            slab: Array2::zeros(shape),
            alpha: layer.alpha().map(|_| Array2::zeros(shape)),
        };
    }

    let fixed_index = (index_vox[fixed] - 1) as usize;
    let mut slab = extract_slab(layer.samples(), axis, fixed_index);
    let mut alpha = layer.alpha().map(|a| extract_slab(a, axis, fixed_index));

    let sigma = layer.smoothing_sigma();
    if sigma > 0.0 {
        let kernel = gaussian_kernel(sigma);
        slab = convolve_same(&slab, &kernel);
        alpha = alpha.map(|a| convolve_same(&a, &kernel));
    }

    SliceDescriptor {
        axis,
        index_vox,
        position_mm,
        in_plane_corners_mm,
        valid,
        slab,
        alpha,
    }
}

/// Resolve all three planes for every layer, recording the shown slice on
/// each layer the point falls inside.
pub fn resolve_views(layers: &mut [VolumeLayer], point_mm: [f64; 3]) -> Vec<[SliceDescriptor; 3]> {
    let mut views = Vec::with_capacity(layers.len());
    for layer in layers.iter_mut() {
        let descriptors = Axis::ALL.map(|axis| resolve_slice(layer, point_mm, axis));
        for descriptor in descriptors.iter().filter(|d| d.valid) {
            let fixed = descriptor.axis.fixed();
            // valid descriptors always carry an in-range index
            if let Err(e) = layer.set_current_slice(fixed, descriptor.index_vox[fixed] as usize) {
                tracing::warn!(layer = layer.name(), error = %e, "Could not record current slice");
            }
        }
        views.push(descriptors);
    }
    views
}

fn plane_corners(layer: &VolumeLayer, axis: Axis, position_mm: f64) -> [[f64; 3]; 4] {
    let (row_axis, col_axis) = axis.display_axes();
    let lower = layer.lower_bound_mm();
    let upper = layer.upper_bound_mm();
    let corner = |row_mm: f64, col_mm: f64| {
        let mut p = [0.0; 3];
        p[axis.fixed()] = position_mm;
        p[row_axis] = row_mm;
        p[col_axis] = col_mm;
        p
    };
    [
        corner(lower[row_axis], lower[col_axis]),
        corner(lower[row_axis], upper[col_axis]),
        corner(upper[row_axis], upper[col_axis]),
        corner(upper[row_axis], lower[col_axis]),
    ]
}

/// Normalised `KERNEL_SIZE` x `KERNEL_SIZE` Gaussian
pub fn gaussian_kernel(sigma: f64) -> Array2<f32> {
    let half = (KERNEL_SIZE / 2) as f64;
    let mut kernel = Array2::from_shape_fn((KERNEL_SIZE, KERNEL_SIZE), |(r, c)| {
        // scale before squaring so a tiny sigma degrades to a unit impulse
        let dr = (r as f64 - half) / sigma;
        let dc = (c as f64 - half) / sigma;
        (-(dr * dr + dc * dc) / 2.0).exp()
    });
    let total: f64 = kernel.sum();
    kernel.mapv_inplace(|v| v / total);
    kernel.mapv(|v| v as f32)
}

/// Zero-padded convolution returning an image of the input's shape
pub fn convolve_same(image: &Array2<f32>, kernel: &Array2<f32>) -> Array2<f32> {
    let (rows, cols) = image.dim();
    let (kr, kc) = kernel.dim();
    let (hr, hc) = ((kr / 2) as isize, (kc / 2) as isize);
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        let mut acc = 0.0f32;
        for i in 0..kr {
            let sr = r as isize + i as isize - hr;
            if sr < 0 || sr >= rows as isize {
                continue;
            }
            for j in 0..kc {
                let sc = c as isize + j as isize - hc;
                if sc < 0 || sc >= cols as isize {
                    continue;
                }
                // symmetric kernel, so correlation and convolution agree
                acc += kernel[(i, j)] * image[(sr as usize, sc as usize)];
            }
        }
        acc
    })
}

/// Order resolved slices back to front and attach effective alpha.
///
/// Layer 1 is always opaque. Other layers use their opacity times their alpha
/// mask; an invalid overlay slice is fully transparent.
pub fn composite(slices: &[(&VolumeLayer, &SliceDescriptor)]) -> Vec<LayerImage> {
    let mut ordered: Vec<&(&VolumeLayer, &SliceDescriptor)> = slices.iter().collect();
    ordered.sort_by_key(|(layer, _)| layer.number());

    ordered
        .into_iter()
        .map(|(layer, slice)| {
            let shape = slice.slab.dim();
            let alpha = if layer.is_base() {
                Array2::ones(shape)
            } else if !slice.valid {
                Array2::zeros(shape)
            } else {
                let opacity = layer.opacity();
                match &slice.alpha {
                    Some(mask) => mask.mapv(|m| m * opacity),
                    None => Array2::from_elem(shape, opacity),
                }
            };
            LayerImage {
                layer: layer.number(),
                values: slice.slab.clone(),
                alpha,
            }
        })
        .collect()
}

/// Blend composited layers into one `rows x cols x 3` RGB image.
///
/// `colour` maps a layer number and sample value to RGB.
pub fn flatten_rgb<F>(images: &[LayerImage], colour: F) -> Result<Array3<f32>>
where
    F: Fn(usize, f32) -> [f32; 3],
{
    let Some(first) = images.first() else {
        return Err(ElectronavError::invalid("layer images", "nothing to flatten"));
    };
    let shape = first.values.dim();
    if let Some(bad) = images.iter().find(|img| img.values.dim() != shape || img.alpha.dim() != shape) {
        return Err(ElectronavError::invalid(
            "layer images",
            format!("layer {} has shape {:?}, expected {:?}", bad.layer, bad.values.dim(), shape),
        ));
    }

    let mut out = Array3::<f32>::zeros((shape.0, shape.1, 3));
    for image in images {
        for ((r, c), &value) in image.values.indexed_iter() {
            let a = image.alpha[(r, c)].clamp(0.0, 1.0);
            let rgb = colour(image.layer, value);
            for k in 0..3 {
                out[(r, c, k)] = out[(r, c, k)] * (1.0 - a) + rgb[k] * a;
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use electronav_core::models::{LayerKind, LayerOptions, LoadedVolume};

    /// 4 x 3 x 2 volume whose sample encodes its voxel index as `100x + 10y + z`
    fn indexed_volume() -> LoadedVolume {
        let samples = Array3::from_shape_fn((4, 3, 2), |(x, y, z)| (100 * x + 10 * y + z) as f32);
        LoadedVolume {
            samples,
            voxel_dim: [1.0, 1.0, 1.0],
            dim_vox: [4, 3, 2],
            origin_vox: [1.0, 1.0, 1.0],
            affine_offset_mm: [0.0, 0.0, 0.0],
        }
    }

    fn overlay() -> VolumeLayer {
        let options = LayerOptions { opacity: 0.5, smoothing_sigma: 0.0, folding: None };
        VolumeLayer::from_loaded("labels", LayerKind::Atlas, 2, indexed_volume(), &options).unwrap()
    }

    #[test]
    fn test_display_orientation() {
        let layer = overlay();
        let axial = resolve_slice(&layer, [1.0, 2.0, 1.0], Axis::Axial);
        assert!(axial.valid);
        assert_eq!(axial.shape(), (4, 3));
        assert_eq!(axial.slab[(3, 2)], 321.0);

        let sagittal = resolve_slice(&layer, [1.0, 2.0, 1.0], Axis::Sagittal);
        assert_eq!(sagittal.shape(), (2, 3));
        assert_eq!(sagittal.slab[(1, 2)], 121.0);

        let coronal = resolve_slice(&layer, [1.0, 2.0, 1.0], Axis::Coronal);
        assert_eq!(coronal.shape(), (2, 4));
        assert_eq!(coronal.slab[(0, 3)], 320.0);
    }

    #[test]
    fn test_display_to_voxel_inverts_extraction() {
        let layer = overlay();
        for axis in Axis::ALL {
            let slice = resolve_slice(&layer, [2.0, 1.0, 0.0], axis);
            let fixed = (slice.index_vox[axis.fixed()] - 1) as usize;
            for ((r, c), &v) in slice.slab.indexed_iter() {
                let [x, y, z] = axis.display_to_voxel(r, c, fixed);
                assert_eq!(v, layer.samples()[(x, y, z)]);
            }
        }
    }

    #[test]
    fn test_out_of_volume_is_blank() {
        let layer = overlay();
        let slice = resolve_slice(&layer, [4.0, 0.0, 0.0], Axis::Axial);
        assert!(!slice.valid);
        assert_eq!(slice.index_vox, [5, 1, 1]);
        assert_eq!(slice.shape(), (4, 3));
        assert!(slice.slab.iter().all(|&v| v == 0.0));
        assert!(slice.alpha.as_ref().unwrap().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_kernel_is_normalised_and_symmetric() {
        let kernel = gaussian_kernel(1.2);
        assert!((kernel.sum() - 1.0).abs() < 1e-5);
        assert_eq!(kernel[(0, 1)], kernel[(1, 0)]);
        assert_eq!(kernel[(0, 0)], kernel[(4, 4)]);
        assert!(kernel[(2, 2)] > kernel[(2, 3)]);
    }

    #[test]
    fn test_tiny_sigma_kernel_is_impulse() {
        let kernel = gaussian_kernel(1e-200);
        assert!(kernel.iter().all(|v| v.is_finite()));
        assert_eq!(kernel[(2, 2)], 1.0);
        assert_eq!(kernel.sum(), 1.0);
    }

    #[test]
    fn test_smoothing_spreads_alpha() {
        let mut samples = Array3::<f32>::zeros((7, 7, 1));
        samples[(3, 3, 0)] = 4.0;
        let loaded = LoadedVolume {
            samples,
            voxel_dim: [1.0; 3],
            dim_vox: [7, 7, 1],
            origin_vox: [1.0; 3],
            affine_offset_mm: [0.0; 3],
        };
        let options = LayerOptions { opacity: 1.0, smoothing_sigma: 1.0, folding: None };
        let layer = VolumeLayer::from_loaded("mask", LayerKind::Structure, 2, loaded, &options).unwrap();

        let slice = resolve_slice(&layer, [3.0, 3.0, 0.0], Axis::Axial);
        let alpha = slice.alpha.unwrap();
        assert!(alpha[(3, 3)] < 1.0);
        assert!(alpha[(3, 4)] > 0.0 && alpha[(3, 4)] < alpha[(3, 3)]);
        assert_eq!(alpha[(0, 0)], 0.0);
        assert!((alpha.sum() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_resolve_views_records_current_slice() {
        let mut layers = vec![overlay()];
        let views = resolve_views(&mut layers, [2.0, 1.0, 1.0]);
        assert_eq!(views.len(), 1);
        assert!(views[0].iter().all(|d| d.valid));
        assert_eq!(layers[0].current_slice(), [3, 2, 2]);

        let outside = resolve_views(&mut layers, [9.0, 0.0, 0.0]);
        assert!(outside[0].iter().all(|d| !d.valid));
        assert_eq!(layers[0].current_slice(), [3, 2, 2]);
    }

    #[test]
    fn test_composite_orders_and_blends() {
        let base_options = LayerOptions::default();
        let base =
            VolumeLayer::from_loaded("t1", LayerKind::Native, 1, indexed_volume(), &base_options).unwrap();
        let labels = overlay();
        let point = [0.0, 0.0, 0.0];
        let base_slice = resolve_slice(&base, point, Axis::Axial);
        let label_slice = resolve_slice(&labels, point, Axis::Axial);

        let images = composite(&[(&labels, &label_slice), (&base, &base_slice)]);
        assert_eq!(images.iter().map(|i| i.layer).collect::<Vec<_>>(), vec![1, 2]);
        assert!(images[0].alpha.iter().all(|&a| a == 1.0));
        assert_eq!(images[1].alpha[(0, 0)], 0.0);
        assert_eq!(images[1].alpha[(1, 0)], 0.5);

        let rgb = flatten_rgb(&images, |layer, _| if layer == 1 { [1.0, 1.0, 1.0] } else { [1.0, 0.0, 0.0] })
            .unwrap();
        assert_eq!(rgb.dim(), (4, 3, 3));
        assert_eq!(rgb[(0, 0, 1)], 1.0);
        assert_eq!(rgb[(1, 0, 1)], 0.5);
        assert_eq!(rgb[(1, 0, 0)], 1.0);
    }

    #[test]
    fn test_flatten_rejects_mismatched_shapes() {
        let a = LayerImage { layer: 1, values: Array2::zeros((2, 2)), alpha: Array2::ones((2, 2)) };
        let b = LayerImage { layer: 2, values: Array2::zeros((3, 2)), alpha: Array2::ones((3, 2)) };
        assert!(flatten_rgb(&[a, b], |_, _| [0.0; 3]).is_err());
        assert!(flatten_rgb(&[], |_, _| [0.0; 3]).is_err());
    }
}
