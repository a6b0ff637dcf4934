//! Rigid chamber-to-scanner transform
//!
//! A transform is immutable once built: recalibration replaces the whole
//! value, so readers never observe a half-updated matrix.

use electronav_core::error::{ElectronavError, Result};
use nalgebra::{DMatrix, Matrix3, Matrix4, Vector3, Vector4};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Tolerance for the bottom row and the orthonormality of the rotation block
const RIGID_TOLERANCE: f64 = 1e-4;

#[derive(Debug, Clone, PartialEq)]
pub struct RigidTransform {
    matrix: Matrix4<f64>,
    inverse: Matrix4<f64>,
}

/// Dense numeric encodings accepted by `RigidTransform::parse`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DenseMatrix {
    Bare(Vec<Vec<f64>>),
    Wrapped { matrix: Vec<Vec<f64>> },
}

/// Point-set layout resolved from the input shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Rows { homogeneous: bool },
    Columns { homogeneous: bool },
}

impl RigidTransform {
    pub fn new(matrix: Matrix4<f64>) -> Result<Self> {
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(invalid("matrix contains non-finite values"));
        }

        let bottom = matrix.row(3);
        let expected = [0.0, 0.0, 0.0, 1.0];
        if bottom.iter().zip(expected).any(|(v, e)| (v - e).abs() > RIGID_TOLERANCE) {
            return Err(invalid(format!(
                "bottom row must be [0, 0, 0, 1], got [{}, {}, {}, {}]",
                bottom[0], bottom[1], bottom[2], bottom[3]
            )));
        }

        let rotation: Matrix3<f64> = matrix.fixed_view::<3, 3>(0, 0).into_owned();
        let gram = rotation.transpose() * rotation;
        if (gram - Matrix3::identity()).abs().max() > RIGID_TOLERANCE {
            return Err(invalid("rotation block is not orthonormal"));
        }
        if rotation.determinant() <= 0.0 {
            return Err(invalid("rotation block is a reflection"));
        }

        let translation: Vector3<f64> = matrix.fixed_view::<3, 1>(0, 3).into_owned();
        let inverse = rigid_inverse(&rotation, &translation);
        Ok(Self { matrix, inverse })
    }

    pub fn identity() -> Self {
        Self { matrix: Matrix4::identity(), inverse: Matrix4::identity() }
    }

    pub fn translation(x: f64, y: f64, z: f64) -> Self {
        let offset = Vector3::new(x, y, z);
        Self {
            matrix: Matrix4::new_translation(&offset),
            inverse: Matrix4::new_translation(&-offset),
        }
    }

    pub fn from_parts(rotation: Matrix3<f64>, translation: Vector3<f64>) -> Result<Self> {
        let mut matrix = rotation.to_homogeneous();
        matrix.fixed_view_mut::<3, 1>(0, 3).copy_from(&translation);
        Self::new(matrix)
    }

    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        if rows.len() != 4 || rows.iter().any(|row| row.len() != 4) {
            let shape: Vec<usize> = rows.iter().map(Vec::len).collect();
            return Err(invalid(format!("expected 4 rows of 4 values, got row lengths {:?}", shape)));
        }
        Self::new(Matrix4::from_fn(|r, c| rows[r][c]))
    }

    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.matrix
    }

    pub fn to_rows(&self) -> [[f64; 4]; 4] {
        let mut rows = [[0.0; 4]; 4];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                *value = self.matrix[(r, c)];
            }
        }
        rows
    }

    /// Scanner-to-chamber transform
    pub fn inverse(&self) -> RigidTransform {
        Self { matrix: self.inverse, inverse: self.matrix }
    }

    /// Transform that applies `self` first, then `next`
    pub fn compose(&self, next: &RigidTransform) -> RigidTransform {
        Self {
            matrix: next.matrix * self.matrix,
            inverse: self.inverse * next.inverse,
        }
    }

    pub fn apply_point(&self, point: [f64; 3]) -> [f64; 3] {
        transform_point(&self.matrix, point)
    }

    pub fn apply_inverse_point(&self, point: [f64; 3]) -> [f64; 3] {
        transform_point(&self.inverse, point)
    }

    /// Transform mesh vertices or any other point list
    pub fn apply_points(&self, points: &[[f64; 3]]) -> Vec<[f64; 3]> {
        points.iter().map(|&p| self.apply_point(p)).collect()
    }

    /// Transform a point set stored either one point per row or one per column.
    ///
    /// The layout is read from the shape: the axis of length 3 holds the
    /// coordinates. A 3x3 input is read as rows. Without a length-3 axis, an
    /// axis of length 4 marks homogeneous input (rows first, so 4x4 is rows).
    /// The result keeps the input's layout and width.
    pub fn apply(&self, points: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        let (rows, cols) = points.shape();
        let layout = match (rows, cols) {
            (3, 3) => Layout::Rows { homogeneous: false },
            (_, 3) => Layout::Rows { homogeneous: false },
            (3, _) => Layout::Columns { homogeneous: false },
            (_, 4) => Layout::Rows { homogeneous: true },
            (4, _) => Layout::Columns { homogeneous: true },
            _ => {
                return Err(ElectronavError::invalid(
                    "point set",
                    format!("cannot infer point layout from a {}x{} matrix", rows, cols),
                ))
            }
        };

        let mut out = points.clone();
        match layout {
            Layout::Rows { homogeneous } => {
                for r in 0..rows {
                    let h = homogeneous_point(homogeneous, |k| points[(r, k)]);
                    let t = self.matrix * h;
                    for k in 0..cols {
                        out[(r, k)] = t[k];
                    }
                }
            }
            Layout::Columns { homogeneous } => {
                for c in 0..cols {
                    let h = homogeneous_point(homogeneous, |k| points[(k, c)]);
                    let t = self.matrix * h;
                    for k in 0..rows {
                        out[(k, c)] = t[k];
                    }
                }
            }
        }
        Ok(out)
    }

    /// Read a transform file in either on-disk encoding
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let transform = Self::parse(&content).map_err(|e| match e {
            ElectronavError::InvalidArgument { reason, .. } => {
                ElectronavError::invalid(format!("transform file {}", path.display()), reason)
            }
            other => other,
        })?;
        tracing::debug!(path = %path.display(), "Loaded chamber transform");
        Ok(transform)
    }

    /// Parse a dense JSON matrix (`[[..]..]` or `{"matrix": [[..]..]}`) or a
    /// whitespace/comma separated 4x4 text table with `#` comments.
    pub fn parse(content: &str) -> Result<Self> {
        let trimmed = content.trim_start();
        if trimmed.starts_with('[') || trimmed.starts_with('{') {
            let dense: DenseMatrix = serde_json::from_str(trimmed)
                .map_err(|e| invalid(format!("malformed matrix JSON: {}", e)))?;
            let rows = match dense {
                DenseMatrix::Bare(rows) => rows,
                DenseMatrix::Wrapped { matrix } => matrix,
            };
            return Self::from_rows(&rows);
        }

        let mut rows = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            let data = line.split('#').next().unwrap_or("").trim();
            if data.is_empty() {
                continue;
            }
            let row = data
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|token| !token.is_empty())
                .map(|token| {
                    token.parse::<f64>().map_err(|_| {
                        invalid(format!("line {}: '{}' is not a number", line_no + 1, token))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            rows.push(row);
        }
        Self::from_rows(&rows)
    }

    pub fn to_text(&self) -> String {
        self.to_rows()
            .iter()
            .map(|row| row.iter().map(|v| format!("{:.9}", v)).collect::<Vec<_>>().join(" "))
            .collect::<Vec<_>>()
            .join("\n")
            + "\n"
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_text())?;
        Ok(())
    }
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

fn invalid(reason: impl Into<String>) -> ElectronavError {
    ElectronavError::invalid("transform", reason)
}

fn rigid_inverse(rotation: &Matrix3<f64>, translation: &Vector3<f64>) -> Matrix4<f64> {
    let rt = rotation.transpose();
    let mut inverse = rt.to_homogeneous();
    inverse.fixed_view_mut::<3, 1>(0, 3).copy_from(&(-(rt * translation)));
    inverse
}

fn transform_point(matrix: &Matrix4<f64>, point: [f64; 3]) -> [f64; 3] {
    let t = matrix * Vector4::new(point[0], point[1], point[2], 1.0);
    [t[0], t[1], t[2]]
}

fn homogeneous_point(homogeneous: bool, coord: impl Fn(usize) -> f64) -> Vector4<f64> {
    let w = if homogeneous { coord(3) } else { 1.0 };
    Vector4::new(coord(0), coord(1), coord(2), w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Rotation3;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn close(a: [f64; 3], b: [f64; 3]) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-6)
    }

    #[test]
    fn test_translation() {
        let t = RigidTransform::translation(5.0, 0.0, -3.0);
        assert_eq!(t.apply_point([2.0, 2.0, 2.0]), [7.0, 2.0, -1.0]);
        assert_eq!(t.apply_inverse_point([7.0, 2.0, -1.0]), [2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_rotation_inverse() {
        let rotation = Rotation3::from_euler_angles(0.3, -0.2, 1.1).into_inner();
        let t = RigidTransform::from_parts(rotation, Vector3::new(1.0, -4.0, 2.5)).unwrap();
        let p = [3.0, -1.0, 8.0];
        assert!(close(t.inverse().apply_point(t.apply_point(p)), p));
    }

    #[test]
    fn test_rejects_non_rigid() {
        let mut m = Matrix4::identity();
        m[(0, 0)] = 2.0;
        assert!(RigidTransform::new(m).is_err());

        let mut m = Matrix4::identity();
        m[(3, 0)] = 1.0;
        assert!(RigidTransform::new(m).is_err());

        let mut m = Matrix4::identity();
        m[(2, 2)] = -1.0;
        assert!(RigidTransform::new(m).is_err());
    }

    #[test]
    fn test_apply_rows_and_columns() {
        let t = RigidTransform::translation(1.0, 2.0, 3.0);

        let rows = DMatrix::from_row_slice(2, 3, &[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        let out = t.apply(&rows).unwrap();
        assert_eq!(out.shape(), (2, 3));
        assert_eq!(out.row(1).iter().cloned().collect::<Vec<_>>(), vec![2.0, 3.0, 4.0]);

        let cols = rows.transpose();
        let out = t.apply(&cols).unwrap();
        assert_eq!(out.shape(), (3, 2));
        assert_eq!(out.column(1).iter().cloned().collect::<Vec<_>>(), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_apply_homogeneous() {
        let t = RigidTransform::translation(1.0, 0.0, 0.0);

        let square = DMatrix::from_row_slice(
            4,
            4,
            &[
                0.0, 0.0, 0.0, 1.0, //
                1.0, 0.0, 0.0, 1.0, //
                0.0, 1.0, 0.0, 1.0, //
                0.0, 0.0, 1.0, 0.0,
            ],
        );
        let out = t.apply(&square).unwrap();
        // Rows are points; a direction (w = 0) is not translated
        assert_eq!(out[(0, 0)], 1.0);
        assert_eq!(out[(1, 0)], 2.0);
        assert_eq!(out[(3, 0)], 0.0);
        assert_eq!(out[(3, 3)], 0.0);

        let columns = DMatrix::from_row_slice(4, 2, &[0.0, 5.0, 0.0, 5.0, 0.0, 5.0, 1.0, 1.0]);
        let out = t.apply(&columns).unwrap();
        assert_eq!(out[(0, 1)], 6.0);
    }

    #[test]
    fn test_apply_ambiguous_square_reads_rows() {
        let t = RigidTransform::translation(0.0, 0.0, 10.0);
        let m = DMatrix::from_row_slice(3, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        let out = t.apply(&m).unwrap();
        assert_eq!(out[(0, 2)], 13.0);
        assert_eq!(out[(2, 0)], 7.0);
    }

    #[test]
    fn test_apply_rejects_unknown_layout() {
        let t = RigidTransform::identity();
        assert!(t.apply(&DMatrix::zeros(2, 5)).is_err());
    }

    #[test]
    fn test_parse_text_table() {
        let text = "# chamber calibration\n1 0 0 5\n0, 1, 0, 0\n0 0 1 -3   # z offset\n\n0 0 0 1\n";
        let t = RigidTransform::parse(text).unwrap();
        assert_eq!(t.apply_point([0.0, 0.0, 0.0]), [5.0, 0.0, -3.0]);
    }

    #[test]
    fn test_parse_dense_json() {
        let bare = "[[1,0,0,5],[0,1,0,0],[0,0,1,-3],[0,0,0,1]]";
        let wrapped = r#"{"matrix": [[1,0,0,5],[0,1,0,0],[0,0,1,-3],[0,0,0,1]]}"#;
        assert_eq!(RigidTransform::parse(bare).unwrap(), RigidTransform::parse(wrapped).unwrap());
    }

    #[test]
    fn test_parse_malformed() {
        assert!(RigidTransform::parse("1 0 0\n0 1 0\n0 0 1").is_err());
        assert!(RigidTransform::parse("1 0 0 x\n0 1 0 0\n0 0 1 0\n0 0 0 1").is_err());
        assert!(RigidTransform::parse("[[1,0,0,0]]").is_err());
        assert!(RigidTransform::parse("{\"matrix\": 3}").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let rotation = Rotation3::from_euler_angles(0.0, 0.0, 0.5).into_inner();
        let t = RigidTransform::from_parts(rotation, Vector3::new(0.5, 0.25, -12.0)).unwrap();
        let file = NamedTempFile::new().unwrap();
        t.save(file.path()).unwrap();
        let loaded = RigidTransform::load(file.path()).unwrap();
        assert!(close(loaded.apply_point([1.0, 2.0, 3.0]), t.apply_point([1.0, 2.0, 3.0])));
    }

    #[test]
    fn test_load_reports_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not a matrix").unwrap();
        let err = RigidTransform::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("transform file"));
    }

    #[test]
    fn test_compose() {
        let a = RigidTransform::translation(1.0, 0.0, 0.0);
        let rotation = Rotation3::from_euler_angles(0.0, 0.0, std::f64::consts::FRAC_PI_2).into_inner();
        let b = RigidTransform::from_parts(rotation, Vector3::zeros()).unwrap();
        let ab = a.compose(&b);
        assert!(close(ab.apply_point([0.0, 0.0, 0.0]), [0.0, 1.0, 0.0]));
        assert!(close(ab.apply_inverse_point([0.0, 1.0, 0.0]), [0.0, 0.0, 0.0]));
    }
}
