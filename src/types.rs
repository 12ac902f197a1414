use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Surface reflectance value (unitless, already scaled)
pub type Reflectance = f64;

/// Landsat mission carrying the sensor that produced an observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Mission {
    #[serde(rename = "LANDSAT_4")]
    Landsat4,
    #[serde(rename = "LANDSAT_5")]
    Landsat5,
    #[serde(rename = "LANDSAT_7")]
    Landsat7,
    #[serde(rename = "LANDSAT_8")]
    Landsat8,
    #[serde(rename = "LANDSAT_9")]
    Landsat9,
}

impl Mission {
    pub const ALL: [Mission; 5] = [
        Mission::Landsat4,
        Mission::Landsat5,
        Mission::Landsat7,
        Mission::Landsat8,
        Mission::Landsat9,
    ];

    /// Mission every other sensor is normalized onto
    pub const REFERENCE: Mission = Mission::Landsat7;

    pub fn as_str(&self) -> &'static str {
        match self {
            Mission::Landsat4 => "LANDSAT_4",
            Mission::Landsat5 => "LANDSAT_5",
            Mission::Landsat7 => "LANDSAT_7",
            Mission::Landsat8 => "LANDSAT_8",
            Mission::Landsat9 => "LANDSAT_9",
        }
    }

    /// Short label used in file names and plots (e.g. `LS5`)
    pub fn short_name(&self) -> &'static str {
        match self {
            Mission::Landsat4 => "LS4",
            Mission::Landsat5 => "LS5",
            Mission::Landsat7 => "LS7",
            Mission::Landsat8 => "LS8",
            Mission::Landsat9 => "LS9",
        }
    }
}

impl fmt::Display for Mission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mission {
    type Err = HandoffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "LANDSAT_4" | "LT04" | "L4" | "LS4" => Ok(Mission::Landsat4),
            "LANDSAT_5" | "LT05" | "L5" | "LS5" => Ok(Mission::Landsat5),
            "LANDSAT_7" | "LE07" | "L7" | "LS7" => Ok(Mission::Landsat7),
            "LANDSAT_8" | "LC08" | "L8" | "LS8" => Ok(Mission::Landsat8),
            "LANDSAT_9" | "LC09" | "L9" | "LS9" => Ok(Mission::Landsat9),
            other => Err(HandoffError::UnknownMission(other.to_string())),
        }
    }
}

/// Surface reflectance band shared by all five missions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Band {
    Blue,
    Green,
    Red,
    Nir,
    Swir1,
    Swir2,
}

impl Band {
    /// Canonical band order, also the storage order inside an observation
    pub const ALL: [Band; 6] = [
        Band::Blue,
        Band::Green,
        Band::Red,
        Band::Nir,
        Band::Swir1,
        Band::Swir2,
    ];

    pub fn index(&self) -> usize {
        match self {
            Band::Blue => 0,
            Band::Green => 1,
            Band::Red => 2,
            Band::Nir => 3,
            Band::Swir1 => 4,
            Band::Swir2 => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Band::Blue => "Blue",
            Band::Green => "Green",
            Band::Red => "Red",
            Band::Nir => "Nir",
            Band::Swir1 => "Swir1",
            Band::Swir2 => "Swir2",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Band {
    type Err = HandoffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Band::ALL
            .iter()
            .copied()
            .find(|band| band.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| HandoffError::UnknownBand(s.to_string()))
    }
}

/// One scene/location observation of the filtered input dataset
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub mission: Mission,
    pub date: NaiveDate,
    pub scene_id: String,
    pub values: [Reflectance; 6],
}

impl Observation {
    pub fn band(&self, band: Band) -> Reflectance {
        self.values[band.index()]
    }
}

/// Error types for handoff processing
#[derive(Debug, thiserror::Error)]
pub enum HandoffError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Malformed input at line {line}: {reason}")]
    MalformedInput { line: u64, reason: String },

    #[error("Unknown mission identifier: {0}")]
    UnknownMission(String),

    #[error("Unknown band name: {0}")]
    UnknownBand(String),

    #[error(
        "Insufficient overlap data for {pair}: {reference_rows} reference rows, {candidate_rows} candidate rows"
    )]
    InsufficientOverlapData {
        pair: String,
        reference_rows: usize,
        candidate_rows: usize,
        orphan_last_date: Option<NaiveDate>,
    },

    #[error("Degenerate fit for {pair} {band}: {source}")]
    DegenerateFit {
        pair: String,
        band: Band,
        #[source]
        source: FitError,
    },

    #[error("Cannot compute quantiles of an empty sample")]
    EmptySample,

    #[error("Invalid sample value: {0}")]
    InvalidValue(f64),

    #[error("Quantile probability {0} is outside [0, 1]")]
    InvalidProbability(f64),

    #[error("Plot error: {0}")]
    Plot(String),
}

/// Reasons a quadratic least-squares fit cannot be computed
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    #[error("need at least {required} points, got {got}")]
    TooFewPoints { required: usize, got: usize },

    #[error("x has {x} points but y has {y}")]
    LengthMismatch { x: usize, y: usize },

    #[error("design matrix is rank deficient (column {column})")]
    RankDeficient { column: usize },

    #[error("non-finite input value")]
    NonFinite,
}

/// Result type for handoff operations
pub type HandoffResult<T> = Result<T, HandoffError>;
