use crate::core::polyfit::QuadraticCoefficients;
use crate::types::{Band, Mission, Reflectance};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One fitted handoff: maps `mission` reflectance in `band` onto Landsat 7
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HandoffCoefficient {
    pub band: Band,
    pub intercept: f64,
    #[serde(rename = "B1")]
    pub b1: f64,
    #[serde(rename = "B2")]
    pub b2: f64,
    #[serde(rename = "SatCorr")]
    pub mission: Mission,
}

impl HandoffCoefficient {
    pub fn new(band: Band, mission: Mission, coefficients: QuadraticCoefficients) -> Self {
        Self {
            band,
            intercept: coefficients.intercept,
            b1: coefficients.b1,
            b2: coefficients.b2,
            mission,
        }
    }

    pub fn polynomial(&self) -> QuadraticCoefficients {
        QuadraticCoefficients {
            intercept: self.intercept,
            b1: self.b1,
            b2: self.b2,
        }
    }

    pub fn apply(&self, value: Reflectance) -> Reflectance {
        self.polynomial().evaluate(value)
    }
}

/// Handoff coefficients for every (band, corrected mission) that could be fitted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoefficientTable {
    rows: Vec<HandoffCoefficient>,
}

impl CoefficientTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<HandoffCoefficient>) -> Self {
        Self { rows }
    }

    pub fn push(&mut self, row: HandoffCoefficient) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[HandoffCoefficient] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, band: Band, mission: Mission) -> Option<&HandoffCoefficient> {
        self.rows
            .iter()
            .find(|row| row.band == band && row.mission == mission)
    }

    /// Missions that have at least one coefficient row
    pub fn missions(&self) -> Vec<Mission> {
        let mut missions: Vec<Mission> = self.rows.iter().map(|row| row.mission).collect();
        missions.sort();
        missions.dedup();
        missions
    }

    /// (band, mission) keys that appear more than once
    pub fn duplicates(&self) -> Vec<(Band, Mission)> {
        let mut seen: HashMap<(Band, Mission), usize> = HashMap::new();
        for row in &self.rows {
            *seen.entry((row.band, row.mission)).or_insert(0) += 1;
        }
        let mut duplicates: Vec<_> = seen
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(key, _)| key)
            .collect();
        duplicates.sort();
        duplicates
    }

    /// Correct a reflectance value onto the Landsat 7 scale.
    ///
    /// Landsat 7 values are returned unchanged. Missions without a fitted row
    /// (Landsat 4 in the canonical configuration) give `None`; whether to
    /// borrow another mission's coefficients is left to the caller.
    pub fn apply(&self, mission: Mission, band: Band, value: Reflectance) -> Option<Reflectance> {
        if mission == Mission::REFERENCE {
            return Some(value);
        }
        self.get(band, mission).map(|row| row.apply(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(band: Band, mission: Mission, b1: f64) -> HandoffCoefficient {
        HandoffCoefficient {
            band,
            intercept: 0.001,
            b1,
            b2: 0.5,
            mission,
        }
    }

    #[test]
    fn test_lookup_and_apply() {
        let table = CoefficientTable::from_rows(vec![
            row(Band::Red, Mission::Landsat5, 0.9),
            row(Band::Red, Mission::Landsat8, 1.1),
        ]);

        let corrected = table.apply(Mission::Landsat5, Band::Red, 0.1).unwrap();
        assert!((corrected - (0.001 + 0.09 + 0.005)).abs() < 1e-12);

        assert_eq!(table.apply(Mission::Landsat7, Band::Red, 0.1), Some(0.1));
        assert_eq!(table.apply(Mission::Landsat4, Band::Red, 0.1), None);
        assert_eq!(table.apply(Mission::Landsat8, Band::Blue, 0.1), None);
        assert_eq!(table.missions(), vec![Mission::Landsat5, Mission::Landsat8]);
    }

    #[test]
    fn test_duplicates_are_reported_not_removed() {
        let table = CoefficientTable::from_rows(vec![
            row(Band::Nir, Mission::Landsat9, 1.0),
            row(Band::Nir, Mission::Landsat9, 1.2),
            row(Band::Blue, Mission::Landsat9, 1.0),
        ]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.duplicates(), vec![(Band::Nir, Mission::Landsat9)]);
    }
}
