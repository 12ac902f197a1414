//! Landsat handoff: cross-mission surface reflectance calibration
//!
//! Estimates quantile-matching polynomial coefficients that map Landsat 4, 5,
//! 8 and 9 surface reflectance onto the Landsat 7 scale, band by band, from a
//! pre-filtered table of per-scene water reflectance medians.

#[cfg(feature = "python")]
use pyo3::prelude::*;

pub mod types;
pub mod io;
pub mod core;

use std::path::Path;

// Re-export main types and functions for easier access
pub use types::{Band, FitError, HandoffError, HandoffResult, Mission, Observation, Reflectance};

pub use crate::core::{
    CoefficientTable, HandoffCoefficient, HandoffConfig, HandoffProcessor, HandoffRun,
    MissionPairWindow, QuantileGrid,
};
pub use io::{CoefficientFile, DatasetReader, ObservationTable};

/// Load the filtered dataset, estimate every handoff and write the
/// coefficient table. When `diagnostics_dir` is given, the text report and
/// one plot per fit are written there as well.
pub fn run_handoff_files(
    input: &Path,
    output: &Path,
    diagnostics_dir: Option<&Path>,
    config: HandoffConfig,
) -> HandoffResult<HandoffRun> {
    let table = DatasetReader::read_csv(input)?;
    let run = HandoffProcessor::new(config).run(&table);

    CoefficientFile::write(output, &run.coefficients)?;

    if let Some(dir) = diagnostics_dir {
        std::fs::create_dir_all(dir)?;
        io::write_report(dir.join("report.txt"), &run)?;
        io::write_plots(dir, &run)?;
    }

    Ok(run)
}

#[cfg(feature = "python")]
fn to_py_err(error: HandoffError) -> PyErr {
    PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!("{}", error))
}

/// Python: estimate handoffs from `input` CSV and write them to `output`.
/// Returns the rows as `(band, intercept, B1, B2, mission)` tuples.
#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "compute_handoffs")]
fn py_compute_handoffs(
    input: String,
    output: String,
    diagnostics_dir: Option<String>,
) -> PyResult<Vec<(String, f64, f64, f64, String)>> {
    let run = run_handoff_files(
        Path::new(&input),
        Path::new(&output),
        diagnostics_dir.as_deref().map(Path::new),
        HandoffConfig::default(),
    )
    .map_err(to_py_err)?;

    Ok(run
        .coefficients
        .rows()
        .iter()
        .map(|row| {
            (
                row.band.to_string(),
                row.intercept,
                row.b1,
                row.b2,
                row.mission.to_string(),
            )
        })
        .collect())
}

/// Python: quantiles of a reflectance array on the `"percent"` or
/// `"five_percent"` grid
#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "quantiles")]
fn py_quantiles<'py>(
    py: Python<'py>,
    values: numpy::PyReadonlyArray1<'py, f64>,
    grid: &str,
) -> PyResult<&'py numpy::PyArray1<f64>> {
    use numpy::IntoPyArray;

    let grid = match grid.to_lowercase().as_str() {
        "percent" => QuantileGrid::Percent,
        "five_percent" => QuantileGrid::FivePercent,
        _ => {
            return Err(PyErr::new::<pyo3::exceptions::PyValueError, _>(format!(
                "Invalid quantile grid: {}",
                grid
            )))
        }
    };

    let values = values.as_array().to_vec();
    let result = crate::core::summarize(&values, grid).map_err(to_py_err)?;
    Ok(result.into_pyarray(py))
}

/// Python module definition
#[cfg(feature = "python")]
#[pymodule]
fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(py_compute_handoffs, m)?)?;
    m.add_function(wrap_pyfunction!(py_quantiles, m)?)?;
    Ok(())
}
