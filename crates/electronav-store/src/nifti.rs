//! Single-file NIfTI-1 (`.nii`) volume loader.
//!
//! Only the first 3D volume is read. Scaling (`scl_slope`/`scl_inter`) is
//! applied when set. The millimetre offset of voxel (1,1,1) comes from the
//! sform when present, otherwise from the qform offset.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use electronav_core::error::{ElectronavError, Result};
use electronav_core::models::LoadedVolume;
use electronav_core::ports::VolumeLoader;
use ndarray::{Array3, ShapeBuilder};
use std::fs;
use std::path::Path;

const HEADER_SIZE: usize = 348;

mod offsets {
    pub const SIZEOF_HDR: usize = 0;
    pub const DIM: usize = 40;
    pub const DATATYPE: usize = 70;
    pub const PIXDIM: usize = 76;
    pub const VOX_OFFSET: usize = 108;
    pub const SCL_SLOPE: usize = 112;
    pub const SCL_INTER: usize = 116;
    pub const SFORM_CODE: usize = 254;
    pub const QOFFSET_X: usize = 268;
    pub const SROW_X: usize = 280;
    pub const SROW_Y: usize = 296;
    pub const SROW_Z: usize = 312;
    pub const MAGIC: usize = 344;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataType {
    Uint8,
    Int8,
    Int16,
    Uint16,
    Int32,
    Float32,
    Float64,
}

impl DataType {
    fn from_code(code: i16) -> Result<Self> {
        Ok(match code {
            2 => Self::Uint8,
            4 => Self::Int16,
            8 => Self::Int32,
            16 => Self::Float32,
            64 => Self::Float64,
            256 => Self::Int8,
            512 => Self::Uint16,
            other => return Err(malformed(format!("unsupported datatype code {}", other))),
        })
    }

    fn byte_size(self) -> usize {
        match self {
            Self::Uint8 | Self::Int8 => 1,
            Self::Int16 | Self::Uint16 => 2,
            Self::Int32 | Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }
}

fn malformed(reason: impl Into<String>) -> ElectronavError {
    ElectronavError::invalid("NIfTI volume", reason)
}

/// Reads uncompressed single-file NIfTI-1 volumes
#[derive(Debug, Clone, Copy, Default)]
pub struct NiftiLoader;

impl NiftiLoader {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(bytes: &[u8]) -> Result<LoadedVolume> {
        if bytes.starts_with(&[0x1f, 0x8b]) {
            return Err(malformed("gzip-compressed volumes are not supported, decompress first"));
        }
        if bytes.len() < HEADER_SIZE {
            return Err(malformed(format!("file is {} bytes, shorter than the header", bytes.len())));
        }
        let size_field = &bytes[offsets::SIZEOF_HDR..offsets::SIZEOF_HDR + 4];
        if LittleEndian::read_i32(size_field) == HEADER_SIZE as i32 {
            parse_with::<LittleEndian>(bytes)
        } else if BigEndian::read_i32(size_field) == HEADER_SIZE as i32 {
            parse_with::<BigEndian>(bytes)
        } else {
            Err(malformed("sizeof_hdr is not 348, not a NIfTI-1 file"))
        }
    }
}

impl VolumeLoader for NiftiLoader {
    fn load(&self, path: &Path) -> Result<LoadedVolume> {
        let bytes = fs::read(path)?;
        let volume = Self::parse(&bytes).map_err(|e| match e {
            ElectronavError::InvalidArgument { reason, .. } => {
                ElectronavError::invalid(format!("NIfTI volume {}", path.display()), reason)
            }
            other => other,
        })?;
        tracing::info!(path = %path.display(), dim = ?volume.dim_vox, voxel = ?volume.voxel_dim, "Loaded volume");
        Ok(volume)
    }
}

fn parse_with<E: ByteOrder>(bytes: &[u8]) -> Result<LoadedVolume> {
    if &bytes[offsets::MAGIC..offsets::MAGIC + 4] != b"n+1\0" {
        return Err(malformed("missing n+1 magic; header/image pairs are not supported"));
    }

    let read_i16 = |at: usize| E::read_i16(&bytes[at..at + 2]);
    let read_f32 = |at: usize| E::read_f32(&bytes[at..at + 4]);

    let ndim = read_i16(offsets::DIM);
    if !(2..=7).contains(&ndim) {
        return Err(malformed(format!("dim[0] = {} is not a 2-7 dimensional image", ndim)));
    }
    let mut dim_vox = [1usize; 3];
    for (k, d) in dim_vox.iter_mut().enumerate().take(ndim.min(3) as usize) {
        let value = read_i16(offsets::DIM + 2 * (k + 1));
        if value <= 0 {
            return Err(malformed(format!("dim[{}] = {}", k + 1, value)));
        }
        *d = value as usize;
    }

    let datatype = DataType::from_code(read_i16(offsets::DATATYPE))?;

    let mut voxel_dim = [0.0f64; 3];
    for (k, v) in voxel_dim.iter_mut().enumerate() {
        let pixdim = read_f32(offsets::PIXDIM + 4 * (k + 1)).abs() as f64;
        *v = if k >= ndim as usize && pixdim == 0.0 { 1.0 } else { pixdim };
    }
    if voxel_dim.iter().any(|v| !(v.is_finite() && *v > 0.0)) {
        return Err(malformed(format!("voxel sizes must be > 0, got {:?}", voxel_dim)));
    }

    let vox_offset = read_f32(offsets::VOX_OFFSET);
    if !(vox_offset.is_finite() && vox_offset >= HEADER_SIZE as f32) {
        return Err(malformed(format!("vox_offset {} points inside the header", vox_offset)));
    }
    if vox_offset as f64 > bytes.len() as f64 {
        return Err(malformed(format!(
            "vox_offset {} lies past the end of the file ({} bytes)",
            vox_offset,
            bytes.len()
        )));
    }
    let start = vox_offset as usize;
    let end = dim_vox
        .iter()
        .try_fold(datatype.byte_size(), |acc, &d| acc.checked_mul(d))
        .and_then(|size| size.checked_add(start))
        .ok_or_else(|| malformed(format!("image of {:?} voxels is too large", dim_vox)))?;
    if bytes.len() < end {
        return Err(malformed(format!("image data truncated: need {} bytes, have {}", end, bytes.len())));
    }

    let mut data = decode::<E>(&bytes[start..end], datatype);
    let slope = read_f32(offsets::SCL_SLOPE);
    let inter = read_f32(offsets::SCL_INTER);
    if slope.is_finite() && slope != 0.0 && !(slope == 1.0 && inter == 0.0) {
        let inter = if inter.is_finite() { inter } else { 0.0 };
        data.iter_mut().for_each(|v| *v = *v * slope + inter);
    }

    let affine_offset_mm = if read_i16(offsets::SFORM_CODE) > 0 {
        [offsets::SROW_X, offsets::SROW_Y, offsets::SROW_Z].map(|row| read_f32(row + 12) as f64)
    } else {
        [0, 1, 2].map(|k| read_f32(offsets::QOFFSET_X + 4 * k) as f64)
    };
    let mut origin_vox = [0.0; 3];
    for k in 0..3 {
        origin_vox[k] = 1.0 - affine_offset_mm[k] / voxel_dim[k];
    }

    // NIfTI stores x fastest
    let samples = Array3::from_shape_vec((dim_vox[0], dim_vox[1], dim_vox[2]).f(), data)
        .map_err(|e| malformed(e.to_string()))?
        .as_standard_layout()
        .into_owned();

    Ok(LoadedVolume { samples, voxel_dim, dim_vox, origin_vox, affine_offset_mm })
}

fn decode<E: ByteOrder>(raw: &[u8], datatype: DataType) -> Vec<f32> {
    let size = datatype.byte_size();
    raw.chunks_exact(size)
        .map(|c| match datatype {
            DataType::Uint8 => c[0] as f32,
            DataType::Int8 => c[0] as i8 as f32,
            DataType::Int16 => E::read_i16(c) as f32,
            DataType::Uint16 => E::read_u16(c) as f32,
            DataType::Int32 => E::read_i32(c) as f32,
            DataType::Float32 => E::read_f32(c),
            DataType::Float64 => E::read_f64(c) as f32,
        })
        .collect()
}
