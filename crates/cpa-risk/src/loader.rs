//! Time-series loading from delimited text

use crate::{Result, RiskError, EXPECTED_COLUMNS};
use collision_avoidance::{Measurement, TrackSeries};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{info, warn};

/// Loaded series plus bookkeeping for the skipped records
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub series: TrackSeries,
    /// Records accepted
    pub records: usize,
    /// Records discarded as malformed
    pub skipped: usize,
}

/// Parse a numeric field, rejecting NaN and infinities
fn parse_number(field: &str) -> Option<f64> {
    field.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Convert one record, or explain why it was rejected
fn parse_record(record: &StringRecord) -> std::result::Result<Measurement, String> {
    if record.len() != EXPECTED_COLUMNS {
        return Err(format!(
            "expected {} columns, found {}",
            EXPECTED_COLUMNS,
            record.len()
        ));
    }

    let number = |idx: usize, name: &str| {
        parse_number(&record[idx]).ok_or_else(|| format!("invalid {}: {:?}", name, &record[idx]))
    };

    let id = record[1].to_string();
    if id.is_empty() {
        return Err("empty id".to_string());
    }

    Ok(Measurement {
        time: number(0, "time")?,
        id,
        x: number(2, "x")?,
        y: number(3, "y")?,
        speed: number(4, "speed")?,
        course: number(5, "course")?,
    })
}

/// Read `time,id,x,y,speed,course` records from any reader.
///
/// The first line is a header. Malformed records are logged and skipped;
/// each identity's measurements are sorted by time (stable for ties).
pub fn read_timeseries<R: Read>(reader: R) -> Result<LoadReport> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    if rdr.headers()?.is_empty() {
        return Err(RiskError::MissingHeader);
    }

    let mut report = LoadReport::default();
    let mut record = StringRecord::new();

    loop {
        match rdr.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {}
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                warn!("Skipping unreadable record: {}", e);
                report.skipped += 1;
                continue;
            }
        }

        let line = record.position().map(|p| p.line()).unwrap_or(0);
        match parse_record(&record) {
            Ok(m) => {
                report.series.entry(m.id.clone()).or_default().push(m);
                report.records += 1;
            }
            Err(reason) => {
                warn!("Skipping line {}: {} ({:?})", line, reason, record);
                report.skipped += 1;
            }
        }
    }

    for seq in report.series.values_mut() {
        seq.sort_by(|a, b| a.time.total_cmp(&b.time));
    }

    Ok(report)
}

/// Load a time-series file. Zero surviving tracks is an error.
pub fn load_timeseries(path: impl AsRef<Path>) -> Result<LoadReport> {
    let path = path.as_ref();
    info!("Loading time series from {:?}", path);

    let file = File::open(path)?;
    let report = read_timeseries(BufReader::new(file))?;

    if report.series.is_empty() {
        return Err(RiskError::NoTracks);
    }

    info!(
        "Loaded {} records for {} tracks ({} skipped)",
        report.records,
        report.series.len(),
        report.skipped
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_groups_and_sorts() {
        let csv = "time,id,x,y,speed,course\n\
                   2,A,90,50,5,180\n\
                   0,A,100,50,5,180\n\
                   1, B ,1,2,3,4\n\
                   1,A,95,50,5,180\n";

        let report = read_timeseries(csv.as_bytes()).unwrap();
        assert_eq!(report.records, 4);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.series.len(), 2);

        let a = &report.series["A"];
        let times: Vec<f64> = a.iter().map(|m| m.time).collect();
        assert_eq!(times, vec![0.0, 1.0, 2.0]);
        assert_eq!(a[1].x, 95.0);

        // Fields are trimmed
        assert!(report.series.contains_key("B"));
    }

    #[test]
    fn test_malformed_records_skipped() {
        let csv = "time,id,x,y,speed,course\n\
                   0,1,100,50,5,180\n\
                   1,1,95,50,5\n\
                   2,1,abc,50,5,180\n\
                   3,1,nan,50,5,180\n\
                   4,,90,50,5,180\n\
                   \n\
                   5,1,85,50,5,180,extra\n\
                   6,1,80,50,5,180\n";

        let report = read_timeseries(csv.as_bytes()).unwrap();
        assert_eq!(report.records, 2);
        assert_eq!(report.skipped, 5);
        let times: Vec<f64> = report.series["1"].iter().map(|m| m.time).collect();
        assert_eq!(times, vec![0.0, 6.0]);
    }

    #[test]
    fn test_equal_times_keep_file_order() {
        let csv = "time,id,x,y,speed,course\n\
                   1,T,1,0,0,0\n\
                   0,T,0,0,0,0\n\
                   1,T,2,0,0,0\n";

        let report = read_timeseries(csv.as_bytes()).unwrap();
        let xs: Vec<f64> = report.series["T"].iter().map(|m| m.x).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_empty_input_is_missing_header() {
        assert!(matches!(
            read_timeseries("".as_bytes()),
            Err(RiskError::MissingHeader)
        ));
    }

    #[test]
    fn test_load_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "time,id,x,y,speed,course").unwrap();
        writeln!(file, "0,1,100,50,5,180").unwrap();
        writeln!(file, "1,1,95,50,5,180").unwrap();

        let report = load_timeseries(file.path()).unwrap();
        assert_eq!(report.series["1"].len(), 2);
        assert_eq!(report.series["1"][0].id, "1");
    }

    #[test]
    fn test_load_header_only_has_no_tracks() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "time,id,x,y,speed,course").unwrap();
        writeln!(file, "garbage").unwrap();

        assert!(matches!(
            load_timeseries(file.path()),
            Err(RiskError::NoTracks)
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            load_timeseries("/nonexistent/track.csv"),
            Err(RiskError::Io(_))
        ));
    }
}
