//! Recording grid geometry.
//!
//! Holes are laid out row by row. Row 0 is the top row (largest `y`), and the
//! holes of each row are centred on `x = 0`.

use crate::error::{ElectronavError, Result};
use serde::{Deserialize, Serialize};

use super::electrode::Target;

/// Static description of a recording grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Number of holes in each row, top row first
    pub holes_per_column: Vec<usize>,

    /// Centre-to-centre hole spacing (mm)
    pub inter_hole_spacing: f64,

    /// Hole diameter (mm)
    pub hole_diameter: f64,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            holes_per_column: vec![5, 9, 11, 13, 13, 15, 15, 17, 17, 17, 15, 15, 13, 13, 11, 9, 5],
            inter_hole_spacing: 1.0,
            hole_diameter: 0.5,
        }
    }
}

impl GridSpec {
    /// Number of rows (`HolesPerDim`)
    pub fn holes_per_dim(&self) -> usize {
        self.holes_per_column.len()
    }

    pub fn validate(&self) -> Result<()> {
        if self.holes_per_column.is_empty() {
            return Err(ElectronavError::invalid("grid", "at least one row is required"));
        }
        if let Some(row) = self.holes_per_column.iter().position(|&n| n == 0) {
            return Err(ElectronavError::invalid("grid", format!("row {} has no holes", row)));
        }
        if !(self.inter_hole_spacing.is_finite() && self.inter_hole_spacing > 0.0) {
            return Err(ElectronavError::invalid(
                "grid",
                format!("inter-hole spacing must be > 0, got {}", self.inter_hole_spacing),
            ));
        }
        if !(self.hole_diameter.is_finite() && self.hole_diameter > 0.0) {
            return Err(ElectronavError::invalid(
                "grid",
                format!("hole diameter must be > 0, got {}", self.hole_diameter),
            ));
        }
        Ok(())
    }
}

/// One insertion point of the grid, in grid-local millimetres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridHole {
    pub index: usize,
    pub x_mm: f64,
    pub y_mm: f64,
    pub row: usize,
    pub column: usize,
}

/// Grid with its hole table generated once at construction
#[derive(Debug, Clone)]
pub struct GridModel {
    spec: GridSpec,
    holes: Vec<GridHole>,
}

impl GridModel {
    pub fn new(spec: GridSpec) -> Result<Self> {
        spec.validate()?;

        let mut holes = Vec::with_capacity(spec.holes_per_column.iter().sum());
        for (row, &cols) in spec.holes_per_column.iter().enumerate() {
            for column in 0..cols {
                let (x_mm, y_mm) = hole_coordinate(&spec, row, column);
                holes.push(GridHole { index: holes.len(), x_mm, y_mm, row, column });
            }
        }

        Ok(Self { spec, holes })
    }

    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    /// Holes in row-major order; the position in this slice is the hole index
    pub fn holes(&self) -> &[GridHole] {
        &self.holes
    }

    pub fn len(&self) -> usize {
        self.holes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holes.is_empty()
    }

    pub fn coordinate_of(&self, row: usize, column: usize) -> Result<(f64, f64)> {
        self.check_position(row, column)?;
        Ok(hole_coordinate(&self.spec, row, column))
    }

    pub fn hole_index(&self, row: usize, column: usize) -> Result<usize> {
        self.check_position(row, column)?;
        let preceding: usize = self.spec.holes_per_column[..row].iter().sum();
        Ok(preceding + column)
    }

    /// Hole whose opening contains the point, if any
    pub fn hole_at(&self, x: f64, y: f64) -> Option<&GridHole> {
        let radius = self.spec.hole_diameter / 2.0;
        self.nearest_hole(x, y)
            .filter(|hole| (hole.x_mm - x).hypot(hole.y_mm - y) <= radius)
    }

    pub fn nearest_hole(&self, x: f64, y: f64) -> Option<&GridHole> {
        self.holes.iter().min_by(|a, b| {
            let da = (a.x_mm - x).hypot(a.y_mm - y);
            let db = (b.x_mm - x).hypot(b.y_mm - y);
            da.total_cmp(&db)
        })
    }

    /// Snap a free target onto the nearest hole centre
    pub fn snap(&self, target: Target) -> Target {
        match self.nearest_hole(target.x, target.y) {
            Some(hole) => Target::new(hole.x_mm, hole.y_mm),
            None => target,
        }
    }

    fn check_position(&self, row: usize, column: usize) -> Result<()> {
        let rows = self.spec.holes_per_dim();
        let Some(&cols) = self.spec.holes_per_column.get(row) else {
            return Err(ElectronavError::out_of_range("grid row", row, rows));
        };
        if column >= cols {
            return Err(ElectronavError::out_of_range("grid column", column, cols));
        }
        Ok(())
    }
}

fn hole_coordinate(spec: &GridSpec, row: usize, column: usize) -> (f64, f64) {
    let rows = spec.holes_per_dim() as f64;
    let cols = spec.holes_per_column[row] as f64;
    let x = (-(cols - 1.0) / 2.0 + column as f64) * spec.inter_hole_spacing;
    let y = ((rows - 1.0) / 2.0 - row as f64) * spec.inter_hole_spacing;
    (x, y)
}
