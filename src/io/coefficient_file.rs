use crate::core::coefficients::{CoefficientTable, HandoffCoefficient};
use crate::types::HandoffResult;
use std::io::{Read, Write};
use std::path::Path;

/// CSV persistence of the handoff coefficient table
pub struct CoefficientFile;

impl CoefficientFile {
    /// Write `band,intercept,B1,B2,SatCorr` rows to a file
    pub fn write<P: AsRef<Path>>(path: P, table: &CoefficientTable) -> HandoffResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = std::fs::File::create(path)?;
        Self::to_writer(file, table)?;
        log::info!("Wrote {} handoff coefficients to {}", table.len(), path.display());
        Ok(())
    }

    pub fn to_writer<W: Write>(writer: W, table: &CoefficientTable) -> HandoffResult<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for row in table.rows() {
            csv_writer.serialize(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Read a coefficient table previously written by [`CoefficientFile::write`]
    pub fn read<P: AsRef<Path>>(path: P) -> HandoffResult<CoefficientTable> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> HandoffResult<CoefficientTable> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let rows = csv_reader
            .deserialize::<HandoffCoefficient>()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CoefficientTable::from_rows(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Band, Mission};

    #[test]
    fn test_header_and_values() {
        let table = CoefficientTable::from_rows(vec![HandoffCoefficient {
            band: Band::Swir2,
            intercept: -0.0012,
            b1: 1.05,
            b2: 0.25,
            mission: Mission::Landsat8,
        }]);

        let mut buffer = Vec::new();
        CoefficientFile::to_writer(&mut buffer, &table).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("band,intercept,B1,B2,SatCorr"));
        assert_eq!(lines.next(), Some("Swir2,-0.0012,1.05,0.25,LANDSAT_8"));

        let parsed = CoefficientFile::from_reader(text.as_bytes()).unwrap();
        assert_eq!(parsed, table);
    }

    #[test]
    fn test_unknown_mission_rejected() {
        let text = "band,intercept,B1,B2,SatCorr\nRed,0.0,1.0,0.0,LANDSAT_6\n";
        assert!(CoefficientFile::from_reader(text.as_bytes()).is_err());
    }
}
