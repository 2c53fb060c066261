//! Parsers for the biometric recording and the annual climate series.

use tracing::{debug, warn};

use crate::error::ParseError;
use crate::series::{CALMNESS, ClimateSample, MEDITATION, TimedSample};

const TIME_COLUMN: &str = "time_seconds";

fn column(headers: &[&str], name: &str, what: &'static str) -> Result<usize, ParseError> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| ParseError::MissingColumn {
            what,
            column: name.to_string(),
        })
}

fn field(cols: &[&str], idx: usize) -> Option<f64> {
    cols.get(idx)?.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a headband recording exported as CSV.
///
/// Columns are located by header name (`time_seconds`, `meditation`,
/// `calmness`); other columns are ignored. Times are rebased so the first
/// row sits at zero. Rows with unreadable numbers are skipped.
pub fn parse_biometric_csv(text: &str) -> Result<Vec<TimedSample>, ParseError> {
    const WHAT: &str = "biometric";
    let mut lines = text.trim().lines().filter(|l| !l.trim().is_empty());
    let header = lines.next().ok_or(ParseError::EmptyInput { what: WHAT })?;
    let headers: Vec<&str> = header.split(',').collect();
    let time_idx = column(&headers, TIME_COLUMN, WHAT)?;
    let med_idx = column(&headers, MEDITATION, WHAT)?;
    let calm_idx = column(&headers, CALMNESS, WHAT)?;

    let mut first_time = None;
    let mut samples = Vec::new();
    let mut skipped = 0usize;
    for (line_no, line) in lines.enumerate() {
        let cols: Vec<&str> = line.split(',').collect();
        let (Some(time), Some(med), Some(calm)) = (
            field(&cols, time_idx),
            field(&cols, med_idx),
            field(&cols, calm_idx),
        ) else {
            skipped += 1;
            warn!(line = line_no + 2, "skipping unreadable biometric row");
            continue;
        };
        let origin = *first_time.get_or_insert(time);
        samples.push(TimedSample::biometric(time - origin, med, calm));
    }

    debug!(samples = samples.len(), skipped, "parsed biometric series");
    Ok(samples)
}

/// Parse an annual temperature anomaly series and normalize it.
///
/// Lines starting with `#` and lines without a comma are ignored; the
/// first remaining line is the header. Each row is `year,anomaly`. The
/// anomalies are normalized once against the series' own min and max.
pub fn parse_climate_csv(text: &str) -> Result<Vec<ClimateSample>, ParseError> {
    const WHAT: &str = "climate";
    let mut lines = text
        .trim()
        .lines()
        .filter(|l| !l.trim_start().starts_with('#') && l.contains(','));
    lines.next().ok_or(ParseError::EmptyInput { what: WHAT })?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for line in lines {
        let mut cols = line.split(',');
        let year = cols.next().and_then(|y| y.trim().parse::<i32>().ok());
        let anomaly = cols
            .next()
            .and_then(|a| a.trim().parse::<f64>().ok())
            .filter(|a| a.is_finite());
        match (year, anomaly) {
            (Some(year), Some(anomaly)) => rows.push((year, anomaly)),
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!(skipped, "skipped unreadable climate rows");
    }

    let series = normalize_climate(&rows);
    debug!(years = series.len(), "parsed climate series");
    Ok(series)
}

/// Normalize `(year, anomaly)` rows over their global min/max into [0, 1].
/// A flat series normalizes to 0.
pub fn normalize_climate(rows: &[(i32, f64)]) -> Vec<ClimateSample> {
    let min = rows.iter().map(|r| r.1).fold(f64::INFINITY, f64::min);
    let max = rows.iter().map(|r| r.1).fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    rows.iter()
        .enumerate()
        .map(|(index, &(year, anomaly))| {
            let normalized = if range > 0.0 {
                ((anomaly - min) / range).clamp(0.0, 1.0)
            } else {
                0.0
            };
            ClimateSample {
                index,
                year,
                anomaly,
                normalized,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn biometric_rebases_time() {
        let csv = "timestamp,time_seconds,meditation,calmness\n\
                   a,100.5,50,60\n\
                   b,101.5,55,65\n\
                   c,103.0,70,40\n";
        let series = parse_biometric_csv(csv).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].time, 0.0);
        assert_eq!(series[1].time, 1.0);
        assert_eq!(series[2].time, 2.5);
        assert_eq!(series[2].get(MEDITATION), Some(70.0));
        assert_eq!(series[2].get(CALMNESS), Some(40.0));
    }

    #[test]
    fn biometric_skips_bad_rows() {
        let csv = "time_seconds,meditation,calmness\n\
                   10,50,50\n\
                   11,NaN,50\n\
                   12,oops,50\n\
                   \n\
                   13,80,20\n";
        let series = parse_biometric_csv(csv).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[1].time, 3.0);
    }

    #[test]
    fn biometric_requires_columns() {
        assert_eq!(
            parse_biometric_csv("time_seconds,meditation\n1,2\n"),
            Err(ParseError::MissingColumn {
                what: "biometric",
                column: "calmness".to_string()
            })
        );
        assert_eq!(
            parse_biometric_csv("   \n"),
            Err(ParseError::EmptyInput { what: "biometric" })
        );
    }

    #[test]
    fn biometric_header_only_is_empty_series() {
        let series = parse_biometric_csv("time_seconds,meditation,calmness").unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn climate_ignores_comments_and_normalizes() {
        let csv = "# Global temperature anomalies\n\
                   # Units: degrees C\n\
                   Year,Anomaly\n\
                   1900,-0.2\n\
                   1950,0.0\n\
                   2000,0.6\n\
                   2010,n/a\n";
        let series = parse_climate_csv(csv).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].normalized, 0.0);
        assert!((series[1].normalized - 0.25).abs() < 1e-12);
        assert_eq!(series[2].normalized, 1.0);
        assert_eq!(series[2].year, 2000);
        assert_eq!(series[2].index, 2);
        assert_eq!(series[0].anomaly, -0.2);
    }

    #[test]
    fn flat_climate_normalizes_to_zero() {
        let series = normalize_climate(&[(2000, 0.4), (2001, 0.4)]);
        assert!(series.iter().all(|s| s.normalized == 0.0));
        assert!(normalize_climate(&[]).is_empty());
    }

    #[test]
    fn climate_without_data_lines_is_empty_input() {
        assert_eq!(
            parse_climate_csv("# nothing here\n# at all\n"),
            Err(ParseError::EmptyInput { what: "climate" })
        );
    }
}
