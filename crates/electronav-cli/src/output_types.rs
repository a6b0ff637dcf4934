use electronav_core::models::GridHole;
use electronav_geo::placement::ElectrodeWorldGeometry;
use serde::Serialize;
use tabled::Tabled;

/// Row of the grid hole table
#[derive(Debug, Serialize, Tabled)]
pub struct HoleRow {
    #[tabled(rename = "Index")]
    pub index: usize,
    #[tabled(rename = "Row")]
    pub row: usize,
    #[tabled(rename = "Column")]
    pub column: usize,
    #[tabled(rename = "X (mm)")]
    pub x_mm: f64,
    #[tabled(rename = "Y (mm)")]
    pub y_mm: f64,
}

impl From<&GridHole> for HoleRow {
    fn from(hole: &GridHole) -> Self {
        Self { index: hole.index, row: hole.row, column: hole.column, x_mm: hole.x_mm, y_mm: hole.y_mm }
    }
}

/// Output for grid --at
#[derive(Debug, Serialize)]
pub struct HoleLookupOutput {
    pub point: [f64; 2],
    pub hole: Option<GridHole>,
    pub nearest: Option<GridHole>,
}

/// Row of the electrode catalog table
#[derive(Debug, Serialize, Tabled)]
pub struct ElectrodeTypeRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Contacts")]
    pub contacts: usize,
    #[tabled(rename = "Diameter (mm)")]
    pub diameter: f64,
    #[tabled(rename = "Tip (mm)")]
    pub tip_length: f64,
    #[tabled(rename = "Spacing (mm)")]
    pub contact_spacing: f64,
}

/// Output for transform command
#[derive(Debug, Serialize)]
pub struct TransformOutput {
    pub input: [f64; 3],
    pub output: [f64; 3],
    pub inverse: bool,
}

/// Output for locate command
#[derive(Debug, Serialize)]
pub struct LocateOutput {
    pub electrode: String,
    pub target: [f64; 2],
    pub current_depth: f64,
    pub tip: [f64; 3],
    pub geometry: ElectrodeWorldGeometry,
}

/// Row of the contact position table
#[derive(Debug, Serialize, Tabled)]
pub struct ContactRow {
    #[tabled(rename = "Contact")]
    pub contact: usize,
    #[tabled(rename = "X")]
    pub x: String,
    #[tabled(rename = "Y")]
    pub y: String,
    #[tabled(rename = "Z")]
    pub z: String,
}

/// One resolved plane of one layer
#[derive(Debug, Serialize)]
pub struct SliceOutput {
    pub layer: String,
    pub axis: String,
    pub valid: bool,
    pub index_vox: [i64; 3],
    pub position_mm: f64,
    pub shape: [usize; 2],
    pub min: f32,
    pub max: f32,
    /// Pixels with non-zero alpha after compositing
    pub visible: usize,
    pub corners_mm: [[f64; 3]; 4],
}

#[derive(Debug, Serialize, Tabled)]
pub struct SliceRow {
    #[tabled(rename = "Layer")]
    pub layer: String,
    #[tabled(rename = "Plane")]
    pub axis: String,
    #[tabled(rename = "Voxel")]
    pub index: String,
    #[tabled(rename = "Position (mm)")]
    pub position: String,
    #[tabled(rename = "Shape")]
    pub shape: String,
    #[tabled(rename = "Range")]
    pub range: String,
    #[tabled(rename = "Visible")]
    pub visible: usize,
}

/// Outline of one atlas label on one plane
#[derive(Debug, Serialize)]
pub struct OutlineOutput {
    pub label: f32,
    pub axis: String,
    pub contours: Vec<Vec<[f64; 3]>>,
    pub anchor: Option<[f64; 3]>,
}

/// Output for slice command
#[derive(Debug, Serialize)]
pub struct SliceCommandOutput {
    pub point: [f64; 3],
    pub slices: Vec<SliceOutput>,
    pub outlines: Vec<OutlineOutput>,
}

/// Output for session record
#[derive(Debug, Serialize)]
pub struct RecordOutput {
    pub date: String,
    pub subject: String,
    pub electrodes: usize,
    pub outcome: String,
    pub history_path: String,
}

/// Row of the history list
#[derive(Debug, Serialize, Tabled)]
pub struct HistoryRow {
    #[tabled(rename = "Date")]
    pub date: String,
    #[tabled(rename = "Subject")]
    pub subject: String,
    #[tabled(rename = "Electrodes")]
    pub electrodes: usize,
    #[tabled(rename = "Rated")]
    pub rated: bool,
}

/// Row of a recorded session's electrode table
#[derive(Debug, Serialize, Tabled)]
pub struct SessionElectrodeRow {
    #[tabled(rename = "#")]
    pub position: usize,
    #[tabled(rename = "Type")]
    pub id: String,
    #[tabled(rename = "Target X")]
    pub target_x: f64,
    #[tabled(rename = "Target Y")]
    pub target_y: f64,
    #[tabled(rename = "Depth (mm)")]
    pub depth: f64,
    #[tabled(rename = "Guide (mm)")]
    pub guide_length: f64,
    #[tabled(rename = "Ratings")]
    pub ratings: String,
}

/// Row of the config table
#[derive(Debug, Serialize, Tabled)]
pub struct ConfigRow {
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Source")]
    pub source: String,
}
