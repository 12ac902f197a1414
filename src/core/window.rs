use crate::io::ObservationTable;
use crate::types::{Band, HandoffError, Mission, Observation, Reflectance};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Probability grid used to summarize a band distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuantileGrid {
    /// 0.01, 0.02, ..., 0.99 (99 points)
    Percent,
    /// 0.05, 0.10, ..., 0.95 (19 points), for pairs with few overlapping scenes
    FivePercent,
}

impl QuantileGrid {
    fn step_percent(&self) -> usize {
        match self {
            QuantileGrid::Percent => 1,
            QuantileGrid::FivePercent => 5,
        }
    }

    pub fn len(&self) -> usize {
        99 / self.step_percent()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Grid probabilities, built from integer percents so every point is exact
    pub fn probabilities(&self) -> Vec<f64> {
        let step = self.step_percent();
        (1..=self.len())
            .map(|i| (i * step) as f64 / 100.0)
            .collect()
    }
}

/// Temporal overlap window between the reference mission and one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionPairWindow {
    pub reference: Mission,
    pub candidate: Mission,
    /// Exclusive lower bound
    pub start: NaiveDate,
    /// Exclusive upper bound
    pub end: NaiveDate,
    pub grid: QuantileGrid,
}

impl MissionPairWindow {
    pub fn new(
        reference: Mission,
        candidate: Mission,
        start: NaiveDate,
        end: NaiveDate,
        grid: QuantileGrid,
    ) -> Self {
        Self {
            reference,
            candidate,
            start,
            end,
            grid,
        }
    }

    /// Canonical Landsat 7 handoff windows (mission overlap dates)
    pub fn landsat() -> Vec<MissionPairWindow> {
        vec![
            // Landsat 4 stopped imaging long before Landsat 7 launched.
            MissionPairWindow::new(
                Mission::Landsat7,
                Mission::Landsat4,
                date(1999, 4, 15),
                date(2013, 6, 5),
                QuantileGrid::Percent,
            ),
            MissionPairWindow::new(
                Mission::Landsat7,
                Mission::Landsat5,
                date(1999, 4, 15),
                date(2013, 6, 5),
                QuantileGrid::Percent,
            ),
            MissionPairWindow::new(
                Mission::Landsat7,
                Mission::Landsat8,
                date(2013, 2, 11),
                date(2022, 4, 16),
                QuantileGrid::Percent,
            ),
            MissionPairWindow::new(
                Mission::Landsat7,
                Mission::Landsat9,
                date(2021, 9, 27),
                date(2022, 4, 16),
                QuantileGrid::FivePercent,
            ),
        ]
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start < date && date < self.end
    }

    /// Select both sub-populations inside the window
    pub fn select<'a>(&self, table: &'a ObservationTable) -> PairSample<'a> {
        let mut reference = Vec::new();
        let mut candidate = Vec::new();

        for obs in table.observations() {
            if !self.contains(obs.date) {
                continue;
            }
            if obs.mission == self.reference {
                reference.push(obs);
            } else if obs.mission == self.candidate {
                candidate.push(obs);
            }
        }

        PairSample {
            window: self.clone(),
            reference,
            candidate,
        }
    }

    /// Select the window and require at least `min_observations` rows per side.
    ///
    /// A pair without enough overlap comes back as a [`SkippedPair`] carrying
    /// the row counts and the last date of the mission that ran out of data.
    pub fn select_overlap<'a>(
        &self,
        table: &'a ObservationTable,
        min_observations: usize,
    ) -> Result<PairSample<'a>, SkippedPair> {
        let sample = self.select(table);
        let required = min_observations.max(1);

        if sample.reference.len() < required || sample.candidate.len() < required {
            let orphan = if sample.candidate.len() < required {
                self.candidate
            } else {
                self.reference
            };
            return Err(SkippedPair {
                window: self.clone(),
                reference_rows: sample.reference.len(),
                candidate_rows: sample.candidate.len(),
                orphan_last_date: table.last_date(orphan),
            });
        }

        Ok(sample)
    }
}

/// Calendar date of a window bound; bounds are compile-time literals
fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid window bound")
}

impl fmt::Display for MissionPairWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}<->{}",
            self.candidate.short_name(),
            self.reference.short_name()
        )
    }
}

/// A mission pair that was not fitted because its window lacks data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedPair {
    pub window: MissionPairWindow,
    pub reference_rows: usize,
    pub candidate_rows: usize,
    /// Last date anywhere in the dataset of the mission that ran out of data
    pub orphan_last_date: Option<NaiveDate>,
}

impl From<SkippedPair> for HandoffError {
    fn from(skipped: SkippedPair) -> Self {
        HandoffError::InsufficientOverlapData {
            pair: skipped.window.to_string(),
            reference_rows: skipped.reference_rows,
            candidate_rows: skipped.candidate_rows,
            orphan_last_date: skipped.orphan_last_date,
        }
    }
}

/// Per-mission size of one side of a windowed sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleCounts {
    pub scenes: usize,
    pub rows: usize,
}

impl SampleCounts {
    fn of(observations: &[&Observation]) -> Self {
        let scenes = observations
            .iter()
            .map(|obs| obs.scene_id.as_str())
            .collect::<HashSet<_>>()
            .len();
        Self {
            scenes,
            rows: observations.len(),
        }
    }
}

/// Observations of both missions that fall inside a pair window
#[derive(Debug, Clone)]
pub struct PairSample<'a> {
    pub window: MissionPairWindow,
    pub reference: Vec<&'a Observation>,
    pub candidate: Vec<&'a Observation>,
}

impl<'a> PairSample<'a> {
    pub fn reference_column(&self, band: Band) -> Vec<Reflectance> {
        self.reference.iter().map(|obs| obs.band(band)).collect()
    }

    pub fn candidate_column(&self, band: Band) -> Vec<Reflectance> {
        self.candidate.iter().map(|obs| obs.band(band)).collect()
    }

    pub fn reference_counts(&self) -> SampleCounts {
        SampleCounts::of(&self.reference)
    }

    pub fn candidate_counts(&self) -> SampleCounts {
        SampleCounts::of(&self.candidate)
    }
}
