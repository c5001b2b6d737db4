use async_trait::async_trait;
use csv::{Reader, StringRecord};
use paceload_core::{Error, RecordSource, Result, Row};
use serde_json::{Number, Value};
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct CsvSourceOptions {
    /// Natural key column. First header column when unset.
    pub key_column: Option<String>,
    /// Rows with a blank or NaN value in any of these columns are skipped.
    pub required: Vec<String>,
    /// Columns kept as text.
    pub raw_columns: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub emitted: u64,
    pub skipped: u64,
}

/// Streams typed rows out of a headered CSV file.
///
/// Opening the file runs one counting pass so the writer can report percent
/// complete and ETA; rows are otherwise read one at a time.
pub struct CsvSource {
    path: PathBuf,
    reader: Reader<File>,
    headers: Vec<String>,
    key_index: usize,
    required: Vec<usize>,
    raw: HashSet<usize>,
    total: u64,
    /// Physical line where the last read record started.
    line: u64,
    stats: SourceStats,
}

impl CsvSource {
    pub fn open(path: &Path, options: CsvSourceOptions) -> Result<Self> {
        let mut reader = open_reader(path)?;
        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| source_error(path, e))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        if headers.is_empty() {
            return Err(Error::Source(format!("{} has no header row", path.display())));
        }

        let column = |name: &str| -> Result<usize> {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                Error::Configuration(format!(
                    "column '{}' not found in {} (columns: {})",
                    name,
                    path.display(),
                    headers.join(", ")
                ))
            })
        };

        let key_index = match options.key_column {
            Some(ref key) => column(key)?,
            None => 0,
        };

        let mut required = vec![key_index];
        for name in &options.required {
            let idx = column(name)?;
            if !required.contains(&idx) {
                required.push(idx);
            }
        }

        let mut raw = HashSet::from([key_index]);
        for name in &options.raw_columns {
            raw.insert(column(name)?);
        }

        let total = count_loadable(path, &required)?;

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            headers,
            key_index,
            required,
            raw,
            total,
            line: 1,
            stats: SourceStats::default(),
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn key_column(&self) -> &str {
        &self.headers[self.key_index]
    }

    pub fn line(&self) -> u64 {
        self.line
    }

    pub fn stats(&self) -> SourceStats {
        self.stats
    }

    fn to_row(&self, record: &StringRecord) -> Row {
        let mut row = Row::new(self.key_column(), record.get(self.key_index).unwrap_or_default());

        for (idx, name) in self.headers.iter().enumerate() {
            if idx == self.key_index {
                continue;
            }
            let raw = record.get(idx).unwrap_or_default();
            let value = if self.raw.contains(&idx) {
                Value::String(raw.to_string())
            } else {
                infer_value(raw)
            };
            row.insert(name.clone(), value);
        }

        row
    }
}

#[async_trait]
impl RecordSource for CsvSource {
    type Item = Row;

    async fn next_record(&mut self) -> Result<Option<Row>> {
        let mut record = StringRecord::new();

        loop {
            match self.reader.read_record(&mut record) {
                Ok(false) => return Ok(None),
                Ok(true) => {
                    self.line = record
                        .position()
                        .map_or_else(|| self.reader.position().line(), |p| p.line());
                }
                Err(e) if e.is_io_error() => return Err(source_error(&self.path, e)),
                Err(e) => {
                    self.line = e
                        .position()
                        .map_or_else(|| self.reader.position().line(), |p| p.line());
                    tracing::warn!("Skipping malformed row at line {}: {}", self.line, e);
                    self.stats.skipped += 1;
                    continue;
                }
            }

            if let Some(idx) = first_missing(&record, &self.required) {
                tracing::warn!(
                    "Skipping row at line {} with invalid {}: {}",
                    self.line,
                    self.headers[idx],
                    record.get(self.key_index).unwrap_or_default()
                );
                self.stats.skipped += 1;
                continue;
            }

            self.stats.emitted += 1;
            return Ok(Some(self.to_row(&record)));
        }
    }

    fn size_hint(&self) -> Option<u64> {
        Some(self.total)
    }
}

fn open_reader(path: &Path) -> Result<Reader<File>> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_path(path)
        .map_err(|e| source_error(path, e))
}

fn source_error(path: &Path, err: csv::Error) -> Error {
    Error::Source(format!("{}: {}", path.display(), err))
}

/// Rows the streaming pass will emit. Keeps only a single record in memory.
fn count_loadable(path: &Path, required: &[usize]) -> Result<u64> {
    let mut reader = open_reader(path)?;
    let mut record = StringRecord::new();
    let mut count = 0;

    loop {
        match reader.read_record(&mut record) {
            Ok(false) => return Ok(count),
            Ok(true) => {
                if first_missing(&record, required).is_none() {
                    count += 1;
                }
            }
            Err(e) if e.is_io_error() => return Err(source_error(path, e)),
            Err(_) => {}
        }
    }
}

fn first_missing(record: &StringRecord, required: &[usize]) -> Option<usize> {
    required
        .iter()
        .copied()
        .find(|&idx| record.get(idx).map_or(true, is_blank))
}

fn is_blank(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.eq_ignore_ascii_case("nan")
}

/// Integers and finite decimals become JSON numbers, empty cells null,
/// everything else text. Dates stay text; the sink decides how to store them.
pub fn infer_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }

    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Number(i.into());
    }

    if let Ok(f) = trimmed.parse::<f64>() {
        if let Some(n) = Number::from_f64(f) {
            return Value::Number(n);
        }
    }

    Value::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use paceload_core::Record;
    use serde_json::json;
    use std::io::Write;

    fn csv_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const MOVIES: &str = "\
title,overview,original_lang,rel_date,popularity,vote_count,vote_average
Heat,A heist,en,1995-12-15,42.5,6000,7.9
Ghost Movie,No date,en,NaN,1.0,3,5.0
Ronin,Spies,en,1998-09-25,20.1,2500,7.0
Blank Date,,en,,0.5,1,4.0
";

    fn options(required: &[&str]) -> CsvSourceOptions {
        CsvSourceOptions {
            key_column: Some("title".to_string()),
            required: required.iter().map(|s| s.to_string()).collect(),
            raw_columns: vec![],
        }
    }

    #[tokio::test]
    async fn test_streams_typed_rows_and_skips_invalid_dates() {
        let file = csv_file(MOVIES);
        let mut source = CsvSource::open(file.path(), options(&["rel_date"])).unwrap();
        assert_eq!(source.size_hint(), Some(2));

        let heat = source.next_record().await.unwrap().unwrap();
        assert_eq!(heat.natural_key(), "Heat");
        assert_eq!(heat.get("rel_date"), Some(&json!("1995-12-15")));
        assert_eq!(heat.get("popularity"), Some(&json!(42.5)));
        assert_eq!(heat.get("vote_count"), Some(&json!(6000)));

        let ronin = source.next_record().await.unwrap().unwrap();
        assert_eq!(ronin.natural_key(), "Ronin");

        assert!(source.next_record().await.unwrap().is_none());
        assert_eq!(
            source.stats(),
            SourceStats {
                emitted: 2,
                skipped: 2
            }
        );
    }

    #[tokio::test]
    async fn test_empty_cells_become_null_without_requirement() {
        let file = csv_file(MOVIES);
        let mut source = CsvSource::open(file.path(), options(&[])).unwrap();
        assert_eq!(source.size_hint(), Some(4));

        let mut last = None;
        while let Some(row) = source.next_record().await.unwrap() {
            last = Some(row);
        }

        let blank = last.unwrap();
        assert_eq!(blank.natural_key(), "Blank Date");
        assert_eq!(blank.get("overview"), Some(&Value::Null));
        assert_eq!(blank.get("rel_date"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_raw_columns_stay_text() {
        let file = csv_file("zip,city\n02134,Boston\n");
        let mut source = CsvSource::open(
            file.path(),
            CsvSourceOptions {
                key_column: Some("city".to_string()),
                required: vec![],
                raw_columns: vec!["zip".to_string()],
            },
        )
        .unwrap();

        let row = source.next_record().await.unwrap().unwrap();
        assert_eq!(row.get("zip"), Some(&json!("02134")));
        assert_eq!(row.natural_key(), "Boston");
    }

    #[tokio::test]
    async fn test_key_defaults_to_first_column() {
        let file = csv_file("id,name\n7,seven\n");
        let mut source = CsvSource::open(file.path(), CsvSourceOptions::default()).unwrap();

        assert_eq!(source.key_column(), "id");
        let row = source.next_record().await.unwrap().unwrap();
        assert_eq!(row.natural_key(), "7");
        assert_eq!(row.get("id"), Some(&json!("7")));
    }

    #[tokio::test]
    async fn test_malformed_rows_are_skipped() {
        let file = csv_file("id,name\n1,one\n2,two,extra\n3,three\n");
        let mut source = CsvSource::open(file.path(), CsvSourceOptions::default()).unwrap();

        let mut keys = Vec::new();
        while let Some(row) = source.next_record().await.unwrap() {
            keys.push(row.natural_key().to_string());
        }

        assert_eq!(keys, vec!["1", "3"]);
        assert_eq!(source.stats().skipped, 1);
    }

    #[tokio::test]
    async fn test_line_tracks_multiline_quoted_fields() {
        let file = csv_file("id,overview\n1,\"first line\nsecond line\"\n2,short\n");
        let mut source = CsvSource::open(file.path(), CsvSourceOptions::default()).unwrap();

        let first = source.next_record().await.unwrap().unwrap();
        assert_eq!(first.natural_key(), "1");
        assert_eq!(source.line(), 2);

        let second = source.next_record().await.unwrap().unwrap();
        assert_eq!(second.natural_key(), "2");
        assert_eq!(source.line(), 4);
    }

    #[test]
    fn test_unknown_column_is_configuration_error() {
        let file = csv_file(MOVIES);
        let result = CsvSource::open(file.path(), options(&["release"]));
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_missing_file_is_source_error() {
        let result = CsvSource::open(Path::new("/nonexistent/movies.csv"), options(&[]));
        assert!(matches!(result, Err(Error::Source(_))));
    }

    #[test]
    fn test_infer_value() {
        assert_eq!(infer_value("12"), json!(12));
        assert_eq!(infer_value("7.5"), json!(7.5));
        assert_eq!(infer_value("NaN"), json!("NaN"));
        assert_eq!(infer_value(""), Value::Null);
        assert_eq!(infer_value("en"), json!("en"));
    }
}
