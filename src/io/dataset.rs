use crate::types::{Band, HandoffError, HandoffResult, Mission, Observation, Reflectance};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

const MISSION_COLUMNS: [&str; 3] = ["mission", "sat", "spacecraft_id"];
const DATE_COLUMNS: [&str; 1] = ["date"];
const SCENE_COLUMNS: [&str; 3] = ["scene_id", "system:index", "landsat_id"];

/// Immutable filtered observation dataset shared by every handoff fit
#[derive(Debug, Clone, Default)]
pub struct ObservationTable {
    observations: Vec<Observation>,
}

impl ObservationTable {
    pub fn new(observations: Vec<Observation>) -> Self {
        Self { observations }
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Number of rows per mission
    pub fn mission_counts(&self) -> HashMap<Mission, usize> {
        let mut counts = HashMap::new();
        for obs in &self.observations {
            *counts.entry(obs.mission).or_insert(0) += 1;
        }
        counts
    }

    /// Last acquisition date available for a mission, if it has any data
    pub fn last_date(&self, mission: Mission) -> Option<NaiveDate> {
        self.observations
            .iter()
            .filter(|obs| obs.mission == mission)
            .map(|obs| obs.date)
            .max()
    }
}

/// Column positions resolved once from the CSV header
#[derive(Debug, Clone)]
struct ColumnLayout {
    mission: usize,
    date: usize,
    scene_id: usize,
    bands: [usize; 6],
}

impl ColumnLayout {
    fn from_headers(headers: &csv::StringRecord) -> HandoffResult<Self> {
        let find = |aliases: &[&str]| -> Option<usize> {
            headers.iter().position(|header| {
                aliases
                    .iter()
                    .any(|alias| header.trim().eq_ignore_ascii_case(alias))
            })
        };

        let mission = find(&MISSION_COLUMNS)
            .ok_or_else(|| HandoffError::MissingColumn(MISSION_COLUMNS[0].to_string()))?;
        let date = find(&DATE_COLUMNS)
            .ok_or_else(|| HandoffError::MissingColumn(DATE_COLUMNS[0].to_string()))?;
        let scene_id = find(&SCENE_COLUMNS)
            .ok_or_else(|| HandoffError::MissingColumn(SCENE_COLUMNS[0].to_string()))?;

        let mut bands = [0usize; 6];
        for band in Band::ALL {
            bands[band.index()] = find(&[band.as_str()])
                .ok_or_else(|| HandoffError::MissingColumn(band.as_str().to_string()))?;
        }

        Ok(Self {
            mission,
            date,
            scene_id,
            bands,
        })
    }
}

/// Reader for the upstream filtered reflectance table
pub struct DatasetReader;

impl DatasetReader {
    /// Load the filtered dataset from a CSV file
    pub fn read_csv<P: AsRef<Path>>(path: P) -> HandoffResult<ObservationTable> {
        log::info!("Reading observation dataset: {}", path.as_ref().display());
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    /// Load the filtered dataset from any CSV byte stream
    pub fn from_reader<R: Read>(reader: R) -> HandoffResult<ObservationTable> {
        let mut csv_reader = csv::ReaderBuilder::new().flexible(false).from_reader(reader);
        let layout = ColumnLayout::from_headers(csv_reader.headers()?)?;

        let mut observations = Vec::new();
        for record in csv_reader.records() {
            let record = record.map_err(row_error)?;
            observations.push(parse_record(&record, &layout)?);
        }

        let table = ObservationTable::new(observations);
        log::info!("Loaded {} observations", table.len());
        let counts = table.mission_counts();
        for mission in Mission::ALL {
            if let Some(count) = counts.get(&mission) {
                log::debug!("  {}: {} rows", mission, count);
            }
        }
        Ok(table)
    }
}

/// Row-level CSV errors carry a line number like any other malformed row
fn row_error(error: csv::Error) -> HandoffError {
    if let csv::ErrorKind::UnequalLengths {
        pos,
        expected_len,
        len,
    } = error.kind()
    {
        return HandoffError::MalformedInput {
            line: pos.as_ref().map(|p| p.line()).unwrap_or(0),
            reason: format!("expected {} fields, found {}", expected_len, len),
        };
    }
    HandoffError::Csv(error)
}

fn parse_record(record: &csv::StringRecord, layout: &ColumnLayout) -> HandoffResult<Observation> {
    let line = record.position().map(|p| p.line()).unwrap_or(0);
    let malformed = |reason: String| HandoffError::MalformedInput { line, reason };
    let field = |index: usize| record.get(index).unwrap_or("").trim();

    let mission = field(layout.mission)
        .parse::<Mission>()
        .map_err(|e| malformed(e.to_string()))?;

    let date = parse_date(field(layout.date))
        .ok_or_else(|| malformed(format!("unparseable date '{}'", field(layout.date))))?;

    let scene_id = field(layout.scene_id).to_string();

    let mut values = [0.0; 6];
    for band in Band::ALL {
        let raw = field(layout.bands[band.index()]);
        let value: Reflectance = raw
            .parse()
            .map_err(|_| malformed(format!("{} value '{}' is not a number", band, raw)))?;
        if !value.is_finite() {
            return Err(malformed(format!("{} value '{}' is not finite", band, raw)));
        }
        values[band.index()] = value;
    }

    Ok(Observation {
        mission,
        date,
        scene_id,
        values,
    })
}

/// Parse a calendar date, truncating any time-of-day component
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "sat,date,system:index,Blue,Green,Red,Nir,Swir1,Swir2,pixelCount\n";

    #[test]
    fn test_read_dataset() {
        let data = format!(
            "{}{}{}",
            HEADER,
            "LANDSAT_5,2005-07-01,LT05_1,0.01,0.02,0.03,0.04,0.05,0.06,20\n",
            "LANDSAT_7,2005-07-09 10:31:00,LE07_1,0.011,0.021,0.031,0.041,0.051,0.061,15\n"
        );

        let table = DatasetReader::from_reader(data.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);

        let first = &table.observations()[0];
        assert_eq!(first.mission, Mission::Landsat5);
        assert_eq!(first.scene_id, "LT05_1");
        assert_eq!(first.band(Band::Red), 0.03);

        let second = &table.observations()[1];
        assert_eq!(second.date, NaiveDate::from_ymd_opt(2005, 7, 9).unwrap());
        assert_eq!(
            table.last_date(Mission::Landsat7),
            NaiveDate::from_ymd_opt(2005, 7, 9)
        );
        assert_eq!(table.last_date(Mission::Landsat4), None);
    }

    #[test]
    fn test_missing_band_column_fails_fast() {
        let data = "mission,date,scene_id,Blue,Green,Red,Nir,Swir1\n";
        match DatasetReader::from_reader(data.as_bytes()) {
            Err(HandoffError::MissingColumn(name)) => assert_eq!(name, "Swir2"),
            other => panic!("expected MissingColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_identity_columns_fail_fast() {
        let bands = "Blue,Green,Red,Nir,Swir1,Swir2";
        let cases = [
            (format!("date,scene_id,{}\n", bands), "mission"),
            (format!("mission,scene_id,{}\n", bands), "date"),
            (format!("mission,date,{}\n", bands), "scene_id"),
        ];

        for (data, expected) in cases {
            match DatasetReader::from_reader(data.as_bytes()) {
                Err(HandoffError::MissingColumn(name)) => assert_eq!(name, expected),
                other => panic!("expected MissingColumn({}), got {:?}", expected, other),
            }
        }
    }

    #[test]
    fn test_short_row_reports_line() {
        let data = format!(
            "{}{}{}",
            HEADER,
            "LANDSAT_5,2005-07-01,LT05_1,0.01,0.02,0.03,0.04,0.05,0.06,20\n",
            "LANDSAT_5,2005-07-02,LT05_2,0.01,0.02\n"
        );

        match DatasetReader::from_reader(data.as_bytes()) {
            Err(HandoffError::MalformedInput { line, reason }) => {
                assert_eq!(line, 3);
                assert!(reason.contains("expected 10 fields, found 5"), "{}", reason);
            }
            other => panic!("expected MalformedInput, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_rows_are_rejected() {
        let bad_date = format!("{}LANDSAT_5,07/01/2005,a,0,0,0,0,0,0,1\n", HEADER);
        assert!(matches!(
            DatasetReader::from_reader(bad_date.as_bytes()),
            Err(HandoffError::MalformedInput { line: 2, .. })
        ));

        let bad_mission = format!("{}SENTINEL_2,2005-07-01,a,0,0,0,0,0,0,1\n", HEADER);
        assert!(matches!(
            DatasetReader::from_reader(bad_mission.as_bytes()),
            Err(HandoffError::MalformedInput { .. })
        ));

        let bad_value = format!("{}LANDSAT_5,2005-07-01,a,0,NaN,0,0,0,0,1\n", HEADER);
        assert!(matches!(
            DatasetReader::from_reader(bad_value.as_bytes()),
            Err(HandoffError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_parse_date_variants() {
        let expected = NaiveDate::from_ymd_opt(2013, 6, 5);
        assert_eq!(parse_date("2013-06-05"), expected);
        assert_eq!(parse_date("2013-06-05T17:02:11"), expected);
        assert_eq!(parse_date("June 5 2013"), None);
    }
}
