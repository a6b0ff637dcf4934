use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// ElectroNav - MRI-guided microelectrode navigation
#[derive(Parser, Debug)]
#[command(name = "electronav")]
#[command(about = "MRI-guided microelectrode navigation", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to ./electronav.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Electrode catalog TOML file (defaults to the built-in probes)
    #[arg(long, global = true, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Number of contact quality levels
    #[arg(long, global = true, value_name = "K")]
    pub quality_levels: Option<usize>,

    /// Atlas hemisphere label offset, or "none"
    #[arg(long, global = true, value_name = "OFFSET")]
    pub hemisphere_offset: Option<String>,

    /// Gaussian smoothing sigma for overlay layers
    #[arg(long, global = true, value_name = "SIGMA")]
    pub smoothing_sigma: Option<f64>,

    /// Recording history spreadsheet
    #[arg(long, global = true, value_name = "FILE")]
    pub history: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the recording grid or look up a hole by coordinate
    Grid(GridArgs),

    /// List electrode types in the catalog
    Electrodes,

    /// Map a point through a chamber transform
    Transform(TransformArgs),

    /// World positions of an electrode's tip and contacts
    Locate(LocateArgs),

    /// Resolve slices of a volume through a point
    Slice(SliceArgs),

    /// Build and record a session
    Session(SessionArgs),

    /// Inspect the recording history
    History(HistoryArgs),

    /// Show the layered configuration and where each value came from
    Config,
}

#[derive(Parser, Debug)]
pub struct GridArgs {
    /// Find the hole containing this chamber coordinate (mm)
    #[arg(long, num_args = 2, value_names = ["X", "Y"], allow_negative_numbers = true)]
    pub at: Option<Vec<f64>>,
}

#[derive(Parser, Debug)]
pub struct TransformArgs {
    /// Transform file (JSON matrix or 4x4 text table)
    pub file: PathBuf,

    #[arg(allow_negative_numbers = true)]
    pub x: f64,

    #[arg(allow_negative_numbers = true)]
    pub y: f64,

    #[arg(allow_negative_numbers = true)]
    pub z: f64,

    /// Map from scanner space back to chamber space
    #[arg(long)]
    pub inverse: bool,
}

#[derive(Parser, Debug)]
pub struct LocateArgs {
    /// Chamber-to-scanner transform file (identity when omitted)
    #[arg(long, value_name = "FILE")]
    pub transform: Option<PathBuf>,

    /// Electrode type id (defaults to the configured electrode)
    #[arg(long)]
    pub electrode: Option<String>,

    /// Target in chamber coordinates (mm)
    #[arg(long, required = true, num_args = 2, value_names = ["X", "Y"], allow_negative_numbers = true)]
    pub target: Vec<f64>,

    /// Snap the target to the nearest grid hole
    #[arg(long)]
    pub snap: bool,

    /// Start depth (mm)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub depth: f64,

    /// Microdrive depth (mm)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub microdrive: f64,

    /// Guide tube length (mm)
    #[arg(long, default_value_t = 0.0)]
    pub guide: f64,

    /// Number of contacts (defaults to the type's count)
    #[arg(long)]
    pub contacts: Option<usize>,
}

#[derive(Parser, Debug)]
pub struct SliceArgs {
    /// Base anatomical volume (NIfTI-1)
    pub volume: PathBuf,

    /// Point in scanner millimetres
    #[arg(long, required = true, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
    pub point: Vec<f64>,

    /// Atlas label volume stacked over the base
    #[arg(long, value_name = "FILE")]
    pub atlas: Option<PathBuf>,

    /// Atlas label to outline
    #[arg(long, requires = "atlas")]
    pub label: Option<f32>,

    /// Restrict output to one plane
    #[arg(long, value_enum)]
    pub axis: Option<AxisArg>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AxisArg {
    Sagittal,
    Coronal,
    Axial,
}

#[derive(Parser, Debug)]
pub struct SessionArgs {
    #[command(subcommand)]
    pub command: SessionCommands,
}

#[derive(Subcommand, Debug)]
pub enum SessionCommands {
    /// Record a session in the history spreadsheet
    Record(RecordArgs),
}

#[derive(Parser, Debug)]
pub struct RecordArgs {
    /// Session date (YYYY-MM-DD, defaults to today)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Subject identifier
    #[arg(long)]
    pub subject: String,

    /// Electrode placement as ID@X,Y,DEPTH[,GUIDE]; repeat for each electrode
    #[arg(long = "electrode", required = true, value_parser = parse_placement)]
    pub electrodes: Vec<Placement>,

    /// Contact rating as ELECTRODE:CONTACT=RATING (1-based); repeatable
    #[arg(long = "rate", value_parser = parse_rating)]
    pub ratings: Vec<Rating>,

    /// Overwrite an existing record for the date without asking
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub depth: f64,
    pub guide: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rating {
    pub electrode: usize,
    pub contact: usize,
    pub rating: i64,
}

fn parse_placement(s: &str) -> Result<Placement, String> {
    let (id, numbers) = s
        .split_once('@')
        .ok_or_else(|| format!("expected ID@X,Y,DEPTH[,GUIDE], got '{}'", s))?;
    let values = numbers
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|_| format!("'{}' is not a number", v.trim())))
        .collect::<Result<Vec<_>, _>>()?;
    match values.as_slice() {
        [x, y, depth] => Ok(Placement { id: id.trim().to_string(), x: *x, y: *y, depth: *depth, guide: 0.0 }),
        [x, y, depth, guide] => {
            Ok(Placement { id: id.trim().to_string(), x: *x, y: *y, depth: *depth, guide: *guide })
        }
        _ => Err(format!("expected 3 or 4 numbers after '@', got {}", values.len())),
    }
}

fn parse_rating(s: &str) -> Result<Rating, String> {
    let usage = || format!("expected ELECTRODE:CONTACT=RATING, got '{}'", s);
    let (position, rating) = s.split_once('=').ok_or_else(usage)?;
    let (electrode, contact) = position.split_once(':').ok_or_else(usage)?;
    Ok(Rating {
        electrode: electrode.trim().parse().map_err(|_| usage())?,
        contact: contact.trim().parse().map_err(|_| usage())?,
        rating: rating.trim().parse().map_err(|_| usage())?,
    })
}

#[derive(Parser, Debug)]
pub struct HistoryArgs {
    #[command(subcommand)]
    pub command: HistoryCommands,
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommands {
    /// List recorded sessions
    List,

    /// Show one recorded session
    Show {
        /// Session date (YYYY-MM-DD)
        date: NaiveDate,
    },
}
