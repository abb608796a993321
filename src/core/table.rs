//! Tabular consolidation of CSV flow records
//!
//! Sources are streamed row by row, so a merge never holds more than one record
//! in memory regardless of dataset size.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use log::{debug, info, warn};

use crate::core::error::{Error, Result};
use crate::core::layout::partial_path;

/// Field values treated as missing, alongside rows shorter than their header
const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Whether a single field counts as a missing value
pub fn is_missing(field: &str) -> bool {
    NA_TOKENS.contains(&field)
}

/// One loaded CSV file: its location and column names
#[derive(Debug, Clone)]
pub struct TableSource {
    pub path: PathBuf,
    pub headers: Vec<String>,
}

impl TableSource {
    /// Open `path` and read its header row
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .from_path(&path)
            .map_err(|e| csv_error(&path, e))?;
        let headers = reader
            .headers()
            .map_err(|e| csv_error(&path, e))?
            .iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        let headers = dedupe_headers(headers);

        if headers.is_empty() {
            return Err(Error::CsvError {
                path,
                message: "file has no header row".to_string(),
            });
        }
        Ok(Self { path, headers })
    }
}

/// Rename repeated column names to `name.1`, `name.2`, ... so no column is lost
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(headers.len());
    for header in headers {
        if !unique.contains(&header) {
            unique.push(header);
            continue;
        }
        let mut suffix = 1;
        let renamed = loop {
            let candidate = format!("{header}.{suffix}");
            if !unique.contains(&candidate) {
                break candidate;
            }
            suffix += 1;
        };
        debug!("Renamed duplicate column '{header}' to '{renamed}'");
        unique.push(renamed);
    }
    unique
}

/// Result of a completed merge
#[derive(Debug, Clone, PartialEq)]
pub struct MergeSummary {
    /// Rows written, excluding the header
    pub rows: u64,
    pub columns: usize,
    /// Rows discarded for containing a missing value
    pub dropped: u64,
    /// Wall time of the drop-and-concatenate step
    pub elapsed: Duration,
}

/// Union of all source headers, in first-seen order
pub fn union_headers(sources: &[TableSource]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for source in sources {
        for header in &source.headers {
            if !columns.contains(header) {
                columns.push(header.clone());
            }
        }
    }
    columns
}

/// Drop rows with missing values from each source and concatenate them into `output`.
///
/// The output header is the union of all source columns; columns a source lacks
/// are written empty. Data is written to `<output>.part` and renamed into place,
/// so an existing `output` is only replaced once the merge has succeeded.
pub fn merge_tables(sources: &[TableSource], output: &Path) -> Result<MergeSummary> {
    let start = Instant::now();
    let columns = union_headers(sources);

    if sources.iter().any(|s| s.headers != columns) {
        warn!(
            "Source schemas differ; merging {} columns as their union (absent columns are left empty)",
            columns.len()
        );
    }

    let partial = partial_path(output);
    let mut writer = WriterBuilder::new()
        .from_path(&partial)
        .map_err(|e| csv_error(&partial, e))?;
    writer
        .write_record(&columns)
        .map_err(|e| csv_error(&partial, e))?;

    let mut rows = 0u64;
    let mut dropped = 0u64;
    for source in sources {
        let (kept, skipped) = match append_source(source, &columns, &mut writer, &partial) {
            Ok(counts) => counts,
            Err(e) => {
                drop(writer);
                let _ = fs::remove_file(&partial);
                return Err(e);
            }
        };
        debug!(
            "{}: kept {kept} rows, dropped {skipped}",
            source.path.display()
        );
        rows += kept;
        dropped += skipped;
    }

    writer.flush()?;
    drop(writer);
    fs::rename(&partial, output)?;

    let summary = MergeSummary {
        rows,
        columns: columns.len(),
        dropped,
        elapsed: start.elapsed(),
    };
    info!(
        "Merged {} files into {} ({} rows, {} dropped)",
        sources.len(),
        output.display(),
        summary.rows,
        summary.dropped
    );
    Ok(summary)
}

/// Stream one source into `writer`, returning `(kept, dropped)` row counts
fn append_source(
    source: &TableSource,
    columns: &[String],
    writer: &mut csv::Writer<File>,
    partial: &Path,
) -> Result<(u64, u64)> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_path(&source.path)
        .map_err(|e| csv_error(&source.path, e))?;

    // Output column -> field index in this source
    let mapping: Vec<Option<usize>> = columns
        .iter()
        .map(|column| source.headers.iter().position(|h| h == column))
        .collect();

    let width = source.headers.len();
    let mut kept = 0u64;
    let mut dropped = 0u64;
    let mut record = StringRecord::new();
    let mut out = StringRecord::with_capacity(0, columns.len());

    while reader
        .read_record(&mut record)
        .map_err(|e| csv_error(&source.path, e))?
    {
        if record.len() > width {
            let line = record.position().map_or(0, |p| p.line());
            return Err(Error::CsvError {
                path: source.path.clone(),
                message: format!(
                    "line {line} has {} fields, header has {width}",
                    record.len()
                ),
            });
        }
        if record.len() < width || record.iter().any(is_missing) {
            dropped += 1;
            continue;
        }

        out.clear();
        for index in &mapping {
            out.push_field(index.and_then(|i| record.get(i)).unwrap_or(""));
        }
        writer
            .write_record(&out)
            .map_err(|e| csv_error(partial, e))?;
        kept += 1;
    }

    Ok((kept, dropped))
}

fn csv_error(path: &Path, err: csv::Error) -> Error {
    if !err.is_io_error() {
        return Error::CsvError {
            path: path.to_path_buf(),
            message: err.to_string(),
        };
    }
    match err.into_kind() {
        csv::ErrorKind::Io(io) => Error::IoError(io),
        other => Error::CsvError {
            path: path.to_path_buf(),
            message: format!("{other:?}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_merge_drops_missing_rows_without_index_column() {
        let dir = tempdir().unwrap();
        let a = write(dir.path(), "a.csv", "x,y\n1,2\n,4\n");
        let b = write(dir.path(), "b.csv", "x,y\n5,6\n");
        let output = dir.path().join("merged.csv");

        let sources = vec![TableSource::open(&a).unwrap(), TableSource::open(&b).unwrap()];
        let summary = merge_tables(&sources, &output).unwrap();

        assert_eq!(fs::read_to_string(&output).unwrap(), "x,y\n1,2\n5,6\n");
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.columns, 2);
        assert_eq!(summary.dropped, 1);
        assert!(!partial_path(&output).exists());
    }

    #[test]
    fn test_row_count_is_sum_of_independently_cleaned_sources() {
        let dir = tempdir().unwrap();
        // Missing values in different columns and rows for each source
        let a = write(dir.path(), "a.csv", "p,q,r\n1,2,3\nNaN,2,3\n4,5,6\n");
        let b = write(dir.path(), "b.csv", "p,q,r\n7,,9\n1,1,1\n2,2,2\n3,3,NA\n");
        let c = write(dir.path(), "c.csv", "p,q,r\n0,0\n9,9,9\n");
        let output = dir.path().join("merged.csv");

        let sources: Vec<_> = [a, b, c].iter().map(|p| TableSource::open(p).unwrap()).collect();
        let summary = merge_tables(&sources, &output).unwrap();

        assert_eq!(summary.rows, 2 + 2 + 1);
        assert_eq!(summary.dropped, 1 + 2 + 1);

        let merged = fs::read_to_string(&output).unwrap();
        assert_eq!(merged.lines().count(), 1 + 5);
        assert_eq!(merged.lines().next().unwrap(), "p,q,r");
    }

    #[test]
    fn test_union_schema_fills_absent_columns() {
        let dir = tempdir().unwrap();
        let a = write(dir.path(), "a.csv", "x,y\n1,2\n");
        let b = write(dir.path(), "b.csv", "y,z\n3,4\n");
        let output = dir.path().join("merged.csv");

        let sources = vec![TableSource::open(&a).unwrap(), TableSource::open(&b).unwrap()];
        assert_eq!(union_headers(&sources), vec!["x", "y", "z"]);

        let summary = merge_tables(&sources, &output).unwrap();
        assert_eq!(summary.columns, 3);
        assert_eq!(fs::read_to_string(&output).unwrap(), "x,y,z\n1,2,\n,3,4\n");
    }

    #[test]
    fn test_quoted_fields_survive_merge() {
        let dir = tempdir().unwrap();
        let a = write(dir.path(), "a.csv", "label,note\nDDoS,\"a, b\"\n");
        let output = dir.path().join("merged.csv");

        merge_tables(&[TableSource::open(&a).unwrap()], &output).unwrap();
        assert_eq!(fs::read_to_string(&output).unwrap(), "label,note\nDDoS,\"a, b\"\n");
    }

    #[test]
    fn test_overlong_row_is_error_and_keeps_existing_output() {
        let dir = tempdir().unwrap();
        let a = write(dir.path(), "a.csv", "x,y\n1,2,3\n");
        let output = write(dir.path(), "merged.csv", "previous\n");

        let result = merge_tables(&[TableSource::open(&a).unwrap()], &output);
        assert!(matches!(result, Err(Error::CsvError { .. })), "{result:?}");
        assert_eq!(fs::read_to_string(&output).unwrap(), "previous\n");
        assert!(!partial_path(&output).exists());
    }

    #[test]
    fn test_repeated_column_names_are_kept_apart() {
        let dir = tempdir().unwrap();
        let a = write(dir.path(), "a.csv", "x,x,x.1,x\n1,2,3,4\n");
        let output = dir.path().join("merged.csv");

        let source = TableSource::open(&a).unwrap();
        assert_eq!(source.headers, vec!["x", "x.1", "x.1.1", "x.2"]);

        let summary = merge_tables(&[source], &output).unwrap();
        assert_eq!(summary.columns, 4);
        assert_eq!(fs::read_to_string(&output).unwrap(), "x,x.1,x.1.1,x.2\n1,2,3,4\n");
    }

    #[test]
    fn test_open_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let result = TableSource::open(dir.path().join("absent.csv"));
        assert!(matches!(result, Err(Error::IoError(_))), "{result:?}");
    }

    #[test]
    fn test_open_empty_file_has_no_header() {
        let dir = tempdir().unwrap();
        let empty = write(dir.path(), "empty.csv", "");
        assert!(matches!(TableSource::open(&empty), Err(Error::CsvError { .. })));
    }

    #[test]
    fn test_na_tokens() {
        for token in ["", "NA", "NaN", "nan", "null", "NULL", "None", "N/A", "<NA>"] {
            assert!(is_missing(token), "{token:?}");
        }
        for value in ["0", " ", "none", "NAN", "Benign"] {
            assert!(!is_missing(value), "{value:?}");
        }
    }
}
