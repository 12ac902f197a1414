use crate::core::handoff::{FitDiagnostics, HandoffRun};
use crate::types::{HandoffError, HandoffResult};
use plotters::prelude::*;
use std::path::{Path, PathBuf};

const PLOT_SIZE: (u32, u32) = (800, 640);
const CURVE_SAMPLES: usize = 200;

fn plot_error<E: std::fmt::Display>(error: E) -> HandoffError {
    HandoffError::Plot(error.to_string())
}

/// File name used for the plot of one (pair, band) fit
pub fn plot_file_name(diagnostics: &FitDiagnostics) -> String {
    format!(
        "{}_{}.svg",
        diagnostics.corrected_mission().short_name(),
        diagnostics.band
    )
}

/// Scatter of quantile pairs with the fitted quadratic and the 1:1 line
pub fn plot_fit<P: AsRef<Path>>(path: P, d: &FitDiagnostics) -> HandoffResult<()> {
    let (lo, hi) = axis_range(d);

    let root = SVGBackend::new(path.as_ref(), PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!(
                "{} {} (R² = {:.4})",
                d.window, d.band, d.fit.statistics.r_squared
            ),
            ("sans-serif", 22),
        )
        .margin(12)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(lo..hi, lo..hi)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .x_desc(format!("{} quantile", d.window.candidate))
        .y_desc(format!("{} quantile", d.window.reference))
        .draw()
        .map_err(plot_error)?;

    chart
        .draw_series(LineSeries::new(vec![(lo, lo), (hi, hi)], BLACK.mix(0.3)))
        .map_err(plot_error)?;

    chart
        .draw_series(
            d.candidate_quantiles
                .iter()
                .zip(d.reference_quantiles.iter())
                .map(|(&x, &y)| Circle::new((x, y), 3, BLUE.mix(0.7).filled())),
        )
        .map_err(plot_error)?;

    let coefficients = d.fit.coefficients;
    let step = (hi - lo) / CURVE_SAMPLES as f64;
    chart
        .draw_series(LineSeries::new(
            (0..=CURVE_SAMPLES).map(|i| {
                let x = lo + step * i as f64;
                (x, coefficients.evaluate(x))
            }),
            RED.stroke_width(2),
        ))
        .map_err(plot_error)?;

    root.present().map_err(plot_error)?;
    Ok(())
}

/// Shared x/y range covering both quantile vectors with a small margin
fn axis_range(d: &FitDiagnostics) -> (f64, f64) {
    let (min, max) = d
        .candidate_quantiles
        .iter()
        .chain(d.reference_quantiles.iter())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 0.2);
    }
    let pad = ((max - min) * 0.05).max(1e-4);
    (min - pad, max + pad)
}

/// Write one plot per fitted unit into `dir`.
///
/// A plot that fails to render is logged and skipped; the paths written are
/// returned.
pub fn write_plots<P: AsRef<Path>>(dir: P, run: &HandoffRun) -> HandoffResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::new();
    for diagnostics in &run.diagnostics {
        let path = dir.join(plot_file_name(diagnostics));
        match plot_fit(&path, diagnostics) {
            Ok(()) => written.push(path),
            Err(e) => log::warn!(
                "Failed to plot {} {}: {}",
                diagnostics.window,
                diagnostics.band,
                e
            ),
        }
    }

    log::info!("Wrote {} diagnostic plots to {}", written.len(), dir.display());
    Ok(written)
}
