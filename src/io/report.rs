use crate::core::handoff::{FitDiagnostics, HandoffRun};
use crate::types::HandoffResult;
use std::fmt::Write as _;
use std::path::Path;

/// Render the human-readable diagnostics of a handoff run
pub fn render_report(run: &HandoffRun) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Landsat handoff coefficients (reference LANDSAT_7)");
    let _ = writeln!(
        out,
        "{} fitted, {} skipped pairs, {} failed fits",
        run.diagnostics.len(),
        run.skipped.len(),
        run.failures.len()
    );

    for diagnostics in &run.diagnostics {
        out.push('\n');
        render_fit(&mut out, diagnostics);
    }

    if !run.skipped.is_empty() {
        let _ = writeln!(out, "\nSkipped pairs");
        for skipped in &run.skipped {
            let last = skipped
                .orphan_last_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "no data".to_string());
            let _ = writeln!(
                out,
                "  {} window ({}, {}): {} {} rows, {} {} rows; last available date {}",
                skipped.window,
                skipped.window.start,
                skipped.window.end,
                skipped.window.reference,
                skipped.reference_rows,
                skipped.window.candidate,
                skipped.candidate_rows,
                last
            );
        }
    }

    if !run.failures.is_empty() {
        let _ = writeln!(out, "\nFailed fits");
        for failure in &run.failures {
            let _ = writeln!(out, "  {} {}: {}", failure.window, failure.band, failure.error);
        }
    }

    out
}

fn render_fit(out: &mut String, d: &FitDiagnostics) {
    let stats = &d.fit.statistics;
    let coef = &d.fit.coefficients;

    let _ = writeln!(out, "== {} {} ({} quantiles)", d.window, d.band, d.probabilities.len());
    let _ = writeln!(
        out,
        "   {}: {} scenes, {} rows | {}: {} scenes, {} rows",
        d.window.reference,
        d.reference_counts.scenes,
        d.reference_counts.rows,
        d.window.candidate,
        d.candidate_counts.scenes,
        d.candidate_counts.rows
    );
    let _ = writeln!(out, "   {:<10} {:>14} {:>14}", "", "Estimate", "Std. Error");
    for (name, value, se) in [
        ("intercept", coef.intercept, stats.std_errors[0]),
        ("B1", coef.b1, stats.std_errors[1]),
        ("B2", coef.b2, stats.std_errors[2]),
    ] {
        let _ = writeln!(out, "   {:<10} {:>14.6e} {:>14.6e}", name, value, se);
    }
    let _ = writeln!(
        out,
        "   Residual standard error: {:.6e} on {} degrees of freedom",
        stats.residual_std_error, stats.degrees_of_freedom
    );
    let _ = writeln!(
        out,
        "   Multiple R-squared: {:.6}, Adjusted R-squared: {:.6}",
        stats.r_squared, stats.adj_r_squared
    );
}

/// Write the rendered report to a text file
pub fn write_report<P: AsRef<Path>>(path: P, run: &HandoffRun) -> HandoffResult<()> {
    std::fs::write(path.as_ref(), render_report(run))?;
    log::info!("Wrote handoff report to {}", path.as_ref().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::window::{MissionPairWindow, SkippedPair};
    use crate::types::Mission;
    use chrono::NaiveDate;

    #[test]
    fn test_skipped_pair_reports_last_date() {
        let window = MissionPairWindow::landsat()
            .into_iter()
            .find(|w| w.candidate == Mission::Landsat4)
            .unwrap();
        let run = HandoffRun {
            skipped: vec![SkippedPair {
                window,
                reference_rows: 12,
                candidate_rows: 0,
                orphan_last_date: NaiveDate::from_ymd_opt(1993, 12, 14),
            }],
            ..HandoffRun::default()
        };

        let text = render_report(&run);
        assert!(text.contains("0 fitted, 1 skipped pairs, 0 failed fits"));
        assert!(text.contains("LS4<->LS7"));
        assert!(text.contains("last available date 1993-12-14"));
    }
}
