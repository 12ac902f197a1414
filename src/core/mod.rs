//! Core handoff estimation modules

pub mod coefficients;
pub mod handoff;
pub mod polyfit;
pub mod quantile;
pub mod window;

// Re-export main types
pub use coefficients::{CoefficientTable, HandoffCoefficient};
pub use handoff::{
    compute_handoff, fit_band, FitDiagnostics, FitFailure, HandoffConfig, HandoffProcessor,
    HandoffRun,
};
pub use polyfit::{fit_quadratic, FitStatistics, PolynomialFit, QuadraticCoefficients};
pub use quantile::{quantiles, summarize};
pub use window::{MissionPairWindow, PairSample, QuantileGrid, SampleCounts, SkippedPair};
