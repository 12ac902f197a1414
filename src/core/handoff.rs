use crate::core::coefficients::{CoefficientTable, HandoffCoefficient};
use crate::core::polyfit::{fit_quadratic, PolynomialFit};
use crate::core::quantile::summarize;
use crate::core::window::{MissionPairWindow, PairSample, SampleCounts, SkippedPair};
use crate::io::ObservationTable;
use crate::types::{Band, HandoffError, HandoffResult, Mission, Reflectance};
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Handoff estimation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffConfig {
    /// Mission pair windows to fit, in output order
    pub windows: Vec<MissionPairWindow>,
    /// Bands fitted for every window, in output order
    pub bands: Vec<Band>,
    /// Minimum rows per mission inside a window before a pair is fitted
    pub min_observations: usize,
    /// Fit (pair, band) units on the rayon pool
    pub parallel: bool,
}

impl HandoffConfig {
    /// Canonical Landsat 4/5/8/9 to Landsat 7 configuration
    pub fn landsat() -> Self {
        Self {
            windows: MissionPairWindow::landsat(),
            bands: Band::ALL.to_vec(),
            min_observations: 1,
            parallel: true,
        }
    }
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self::landsat()
    }
}

/// Everything measured while fitting one (pair, band) unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitDiagnostics {
    pub window: MissionPairWindow,
    pub band: Band,
    pub reference_counts: SampleCounts,
    pub candidate_counts: SampleCounts,
    pub probabilities: Vec<f64>,
    /// Reference mission quantiles (regression response)
    pub reference_quantiles: Vec<Reflectance>,
    /// Candidate mission quantiles (regression predictor)
    pub candidate_quantiles: Vec<Reflectance>,
    pub fit: PolynomialFit,
}

impl FitDiagnostics {
    pub fn corrected_mission(&self) -> Mission {
        self.window.candidate
    }
}

/// A (pair, band) unit that failed without affecting the others
#[derive(Debug)]
pub struct FitFailure {
    pub window: MissionPairWindow,
    pub band: Band,
    pub error: HandoffError,
}

/// Output of a full handoff estimation
#[derive(Debug, Default)]
pub struct HandoffRun {
    pub coefficients: CoefficientTable,
    pub diagnostics: Vec<FitDiagnostics>,
    pub skipped: Vec<SkippedPair>,
    pub failures: Vec<FitFailure>,
}

impl HandoffRun {
    pub fn diagnostics_for(&self, mission: Mission, band: Band) -> Option<&FitDiagnostics> {
        self.diagnostics
            .iter()
            .find(|d| d.corrected_mission() == mission && d.band == band)
    }
}

/// Fit one band of an already windowed pair sample
pub fn fit_band(
    sample: &PairSample<'_>,
    band: Band,
) -> HandoffResult<(HandoffCoefficient, FitDiagnostics)> {
    let window = &sample.window;

    let reference_quantiles = summarize(&sample.reference_column(band), window.grid)?;
    let candidate_quantiles = summarize(&sample.candidate_column(band), window.grid)?;

    let fit = fit_quadratic(&candidate_quantiles, &reference_quantiles).map_err(|source| {
        HandoffError::DegenerateFit {
            pair: window.to_string(),
            band,
            source,
        }
    })?;

    let coefficient = HandoffCoefficient::new(band, window.candidate, fit.coefficients);
    let diagnostics = FitDiagnostics {
        window: window.clone(),
        band,
        reference_counts: sample.reference_counts(),
        candidate_counts: sample.candidate_counts(),
        probabilities: window.grid.probabilities(),
        reference_quantiles,
        candidate_quantiles,
        fit,
    };

    log::debug!(
        "{} {}: intercept={:.6} B1={:.6} B2={:.6} R²={:.5}",
        window,
        band,
        coefficient.intercept,
        coefficient.b1,
        coefficient.b2,
        diagnostics.fit.statistics.r_squared
    );

    Ok((coefficient, diagnostics))
}

/// Pure single-unit computation: window the dataset and fit one band
pub fn compute_handoff(
    table: &ObservationTable,
    window: &MissionPairWindow,
    band: Band,
    min_observations: usize,
) -> HandoffResult<(HandoffCoefficient, FitDiagnostics)> {
    let sample = window.select_overlap(table, min_observations)?;
    fit_band(&sample, band)
}

/// Quantile-matching handoff estimator over every configured pair and band
pub struct HandoffProcessor {
    config: HandoffConfig,
}

impl HandoffProcessor {
    pub fn new(config: HandoffConfig) -> Self {
        Self { config }
    }

    /// Processor with the canonical Landsat configuration
    pub fn standard() -> Self {
        Self::new(HandoffConfig::default())
    }

    pub fn config(&self) -> &HandoffConfig {
        &self.config
    }

    /// Run every (pair, band) unit and aggregate the coefficient table
    pub fn run(&self, table: &ObservationTable) -> HandoffRun {
        log::info!(
            "Estimating handoffs for {} mission pairs x {} bands over {} observations",
            self.config.windows.len(),
            self.config.bands.len(),
            table.len()
        );

        let mut run = HandoffRun::default();
        let mut samples = Vec::new();

        for window in &self.config.windows {
            match window.select_overlap(table, self.config.min_observations) {
                Ok(sample) => {
                    log::info!(
                        "{}: {} {} rows, {} {} rows in ({}, {})",
                        window,
                        window.reference,
                        sample.reference.len(),
                        window.candidate,
                        sample.candidate.len(),
                        window.start,
                        window.end
                    );
                    samples.push(sample);
                }
                Err(skipped) => {
                    log::warn!(
                        "Skipping {}: no overlapping data ({} reference rows, {} candidate rows, last orphan date {})",
                        window,
                        skipped.reference_rows,
                        skipped.candidate_rows,
                        skipped
                            .orphan_last_date
                            .map(|d| d.to_string())
                            .unwrap_or_else(|| "none".to_string())
                    );
                    run.skipped.push(skipped);
                }
            }
        }

        let units: Vec<(usize, Band)> = samples
            .iter()
            .enumerate()
            .flat_map(|(i, _)| self.config.bands.iter().map(move |&band| (i, band)))
            .collect();

        let results = self.fit_units(&samples, &units);

        for ((index, band), result) in units.into_iter().zip(results) {
            match result {
                Ok((coefficient, diagnostics)) => {
                    run.coefficients.push(coefficient);
                    run.diagnostics.push(diagnostics);
                }
                Err(error) => {
                    log::warn!("Fit failed for {} {}: {}", samples[index].window, band, error);
                    run.failures.push(FitFailure {
                        window: samples[index].window.clone(),
                        band,
                        error,
                    });
                }
            }
        }

        for (band, mission) in run.coefficients.duplicates() {
            log::error!("Duplicate handoff coefficients for {} {}", band, mission);
        }

        log::info!(
            "Handoff estimation complete: {} coefficient rows, {} skipped pairs, {} failed fits",
            run.coefficients.len(),
            run.skipped.len(),
            run.failures.len()
        );

        run
    }

    #[cfg(feature = "parallel")]
    fn fit_units(
        &self,
        samples: &[PairSample<'_>],
        units: &[(usize, Band)],
    ) -> Vec<HandoffResult<(HandoffCoefficient, FitDiagnostics)>> {
        if self.config.parallel {
            units
                .par_iter()
                .map(|&(index, band)| fit_band(&samples[index], band))
                .collect()
        } else {
            units
                .iter()
                .map(|&(index, band)| fit_band(&samples[index], band))
                .collect()
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn fit_units(
        &self,
        samples: &[PairSample<'_>],
        units: &[(usize, Band)],
    ) -> Vec<HandoffResult<(HandoffCoefficient, FitDiagnostics)>> {
        units
            .iter()
            .map(|&(index, band)| fit_band(&samples[index], band))
            .collect()
    }
}
