//! Dataset ingest.
//!
//! This module is responsible for turning an ASCII table into a validated
//! `Dataset`.
//!
//! Format:
//! - one point per row; fields separated by commas (CSV) or by whitespace
//! - blank lines and lines starting with `#` are ignored
//! - each quantity is a `value sigma flag` triple, with `flag` 1 for an upper limit
//! - rows carry 2 to 5 triples; `x_column` / `y_column` pick the two to fit
//!
//! The common case is the six-column layout `x σx censor_x y σy censor_y`.
//!
//! Design goals:
//! - **Strict schema**: any malformed row is fatal and names its line
//! - **Deterministic behavior** (no hidden randomness)
//! - **Separation of concerns**: no fitting logic here

use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::domain::{DataPoint, Dataset};
use crate::error::OrthoError;

/// Maximum number of `value sigma flag` triples per row.
pub const MAX_QUANTITIES: usize = 5;

const FIELDS_PER_QUANTITY: usize = 3;

/// Load a dataset from disk.
pub fn load_dataset(path: &Path, x_column: usize, y_column: usize) -> Result<Dataset, OrthoError> {
    let text = fs::read_to_string(path).map_err(|e| OrthoError::io(path, e))?;
    let data = parse_dataset(&text, x_column, y_column)?;
    debug!(path = %path.display(), n = data.len(), "dataset loaded");
    Ok(data)
}

/// Parse the ASCII table format described in the module docs.
///
/// Comma-separated text goes through the `csv` reader; anything else is split
/// on whitespace.
pub fn parse_dataset(text: &str, x_column: usize, y_column: usize) -> Result<Dataset, OrthoError> {
    if x_column == y_column {
        return Err(OrthoError::config("x and y columns must differ"));
    }

    let mut rows = RowParser {
        x_column,
        y_column,
        triples_per_row: None,
        points: Vec::new(),
    };

    if text.contains(',') {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(text.as_bytes());

        for record in reader.records() {
            let record = record.map_err(|e| OrthoError::Parse {
                line: e.position().map_or(0, |p| record_line(text, p.byte())),
                message: e.to_string(),
            })?;
            let line = record.position().map_or(0, |p| record_line(text, p.byte()));
            let fields: Vec<&str> = record.iter().filter(|f| !f.is_empty()).collect();
            if fields.is_empty() || fields[0].starts_with('#') {
                continue;
            }
            rows.push(&fields, line)?;
        }
    } else {
        for (idx, raw) in text.lines().enumerate() {
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = trimmed.split_whitespace().collect();
            rows.push(&fields, idx + 1)?;
        }
    }

    Ok(Dataset::new(rows.points))
}

/// 1-based line of the first data row at or after byte offset `start`.
///
/// csv positions a record where the reader stopped after the previous one, so
/// any blank or `#` lines in between are skipped here.
fn record_line(text: &str, start: u64) -> usize {
    let start = usize::try_from(start).unwrap_or(text.len()).min(text.len());
    let Some(head) = text.get(..start) else {
        return 0;
    };
    let mut line = head.matches('\n').count() + 1;
    for raw in text[start..].lines() {
        let trimmed = raw.trim();
        if !trimmed.is_empty() && !trimmed.starts_with('#') {
            break;
        }
        line += 1;
    }
    line
}

struct RowParser {
    x_column: usize,
    y_column: usize,
    triples_per_row: Option<usize>,
    points: Vec<DataPoint>,
}

impl RowParser {
    fn push(&mut self, fields: &[&str], line: usize) -> Result<(), OrthoError> {
        let n_fields = fields.len();
        if n_fields % FIELDS_PER_QUANTITY != 0
            || !(2..=MAX_QUANTITIES).contains(&(n_fields / FIELDS_PER_QUANTITY))
        {
            return Err(OrthoError::Parse {
                line,
                message: format!(
                    "expected 6 to {} fields in value/sigma/flag triples, found {n_fields}",
                    MAX_QUANTITIES * FIELDS_PER_QUANTITY
                ),
            });
        }

        let triples = n_fields / FIELDS_PER_QUANTITY;
        match self.triples_per_row {
            None => self.triples_per_row = Some(triples),
            Some(expected) if expected != triples => {
                return Err(OrthoError::Parse {
                    line,
                    message: format!("row has {triples} quantities but earlier rows have {expected}"),
                });
            }
            Some(_) => {}
        }

        let highest = self.x_column.max(self.y_column);
        if highest >= triples {
            return Err(OrthoError::Parse {
                line,
                message: format!("quantity column {highest} requested but the row only has {triples}"),
            });
        }

        let (x, sigma_x, censored_x) = parse_triple(fields, self.x_column, line)?;
        let (y, sigma_y, censored_y) = parse_triple(fields, self.y_column, line)?;
        self.points.push(DataPoint {
            x,
            sigma_x,
            censored_x,
            y,
            sigma_y,
            censored_y,
        });
        Ok(())
    }
}

fn parse_triple(fields: &[&str], column: usize, line: usize) -> Result<(f64, f64, bool), OrthoError> {
    let base = column * FIELDS_PER_QUANTITY;
    let value = parse_number(fields[base], "value", line)?;
    let sigma = parse_number(fields[base + 1], "sigma", line)?;
    let flag = parse_number(fields[base + 2], "censor flag", line)?;

    if sigma < 0.0 {
        return Err(OrthoError::Parse {
            line,
            message: format!("sigma must be non-negative, got {sigma}"),
        });
    }
    let censored = if flag == 0.0 {
        false
    } else if flag == 1.0 {
        true
    } else {
        return Err(OrthoError::Parse {
            line,
            message: format!("censor flag must be 0 or 1, got '{}'", fields[base + 2]),
        });
    };

    Ok((value, sigma, censored))
}

fn parse_number(field: &str, what: &str, line: usize) -> Result<f64, OrthoError> {
    let v: f64 = field.parse().map_err(|_| OrthoError::Parse {
        line,
        message: format!("{what} '{field}' is not a number"),
    })?;
    if !v.is_finite() {
        return Err(OrthoError::Parse {
            line,
            message: format!("{what} '{field}' is not finite"),
        });
    }
    Ok(v)
}

/// Write a dataset in the six-column layout `load_dataset` reads.
pub fn write_dataset(path: &Path, data: &Dataset) -> Result<(), OrthoError> {
    let mut file = fs::File::create(path).map_err(|e| OrthoError::io(path, e))?;
    let mut out = String::from("# x sigma_x censor_x y sigma_y censor_y\n");
    for p in data.points() {
        out.push_str(&format!(
            "{:.6} {:.6} {} {:.6} {:.6} {}\n",
            p.x,
            p.sigma_x,
            u8::from(p.censored_x),
            p.y,
            p.sigma_y,
            u8::from(p.censored_y),
        ));
    }
    file.write_all(out.as_bytes()).map_err(|e| OrthoError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_six_column_rows_with_comments() {
        let text = "# header\n0.5 0.1 0 2.0 0.2 1\n\n1.5\t0.1 1   4.0 0.2\t0\n";
        let data = parse_dataset(text, 0, 1).unwrap();
        assert_eq!(data.len(), 2);

        let p = data.points()[0];
        assert_eq!((p.x, p.sigma_x, p.censored_x), (0.5, 0.1, false));
        assert_eq!((p.y, p.sigma_y, p.censored_y), (2.0, 0.2, true));
        assert!(data.points()[1].censored_x);
    }

    #[test]
    fn comma_separated_rows_use_csv_reader() {
        let text = "# x,sx,cx,y,sy,cy\n0.5, 0.1, 0, 2.0, 0.2, 1\n\n1.5,0.1,1,4.0,0.2,0\n";
        let data = parse_dataset(text, 0, 1).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.points()[0].y, 2.0);
        assert!(data.points()[0].censored_y && data.points()[1].censored_x);

        let err = parse_dataset("0.5,0.1,0,2.0,0.2,1\n# note\n\n1.5,0.1,1,4.0,0.2\n", 0, 1).unwrap_err();
        assert!(matches!(err, OrthoError::Parse { line: 4, .. }), "{err}");
    }

    #[test]
    fn record_line_skips_comments_and_blanks() {
        let text = "a\n# c\n\n  b\n";
        assert_eq!(record_line(text, 0), 1);
        assert_eq!(record_line(text, 2), 4);
        assert_eq!(record_line(text, 7), 4);
    }

    #[test]
    fn selects_quantities_from_wide_rows() {
        let text = "1 0.1 0  2 0.2 0  3 0.3 1\n4 0.4 1  5 0.5 0  6 0.6 0\n";
        let data = parse_dataset(text, 2, 0).unwrap();
        let p = data.points()[0];
        assert_eq!((p.x, p.censored_x), (3.0, true));
        assert_eq!((p.y, p.censored_y), (1.0, false));
    }

    #[test]
    fn reports_offending_line() {
        let err = parse_dataset("1 0.1 0 2 0.2 0\n1 0.1 0 2 0.2\n", 0, 1).unwrap_err();
        assert!(matches!(err, OrthoError::Parse { line: 2, .. }), "{err}");

        let err = parse_dataset("1 0.1 2 2 0.2 0\n", 0, 1).unwrap_err();
        assert!(err.to_string().contains("censor flag"));

        let err = parse_dataset("1 -0.1 0 2 0.2 0\n", 0, 1).unwrap_err();
        assert!(err.to_string().contains("non-negative"));

        let err = parse_dataset("1 abc 0 2 0.2 0\n", 0, 1).unwrap_err();
        assert!(err.to_string().contains("not a number"));
    }

    #[test]
    fn rejects_ragged_rows_and_missing_columns() {
        let ragged = "1 0.1 0 2 0.2 0\n1 0.1 0 2 0.2 0 3 0.3 0\n";
        assert!(matches!(parse_dataset(ragged, 0, 1), Err(OrthoError::Parse { line: 2, .. })));
        assert!(parse_dataset("1 0.1 0 2 0.2 0\n", 0, 2).is_err());
    }

    #[test]
    fn write_then_load_preserves_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        let data = Dataset::new(vec![
            DataPoint::detected(0.25, 0.05, 1.5, 0.1),
            DataPoint {
                x: 1.0,
                sigma_x: 0.0,
                censored_x: true,
                y: 3.0,
                sigma_y: 0.2,
                censored_y: true,
            },
        ]);
        write_dataset(&path, &data).unwrap();
        let loaded = load_dataset(&path, 0, 1).unwrap();
        assert_eq!(loaded, data);
    }
}
