//! CSV loading for the importer.
//!
//! Files are exported with a UTF-8 BOM and quoted fields. A file that cannot
//! be opened, is not valid UTF-8, or lacks a required header is fatal; blank
//! or malformed *values* are left for the phase code to skip.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};
use tracing::debug;

use crate::errors::ServiceError;

/// UTF-8 BOM bytes.
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Strip UTF-8 BOM from the beginning of data if present.
fn strip_utf8_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(UTF8_BOM).unwrap_or(data)
}

/// A fully read CSV file.
#[derive(Debug)]
pub struct CsvTable {
    path: PathBuf,
    columns: HashMap<String, usize>,
    records: Vec<StringRecord>,
}

impl CsvTable {
    /// Reads a file whose first line names the columns.
    pub async fn read_with_headers(path: &Path) -> Result<Self, ServiceError> {
        let data = read_file(path).await?;
        Self::parse(path, &data, true)
    }

    /// Reads a file without a header line; use [`CsvTable::first_column`].
    pub async fn read_headerless(path: &Path) -> Result<Self, ServiceError> {
        let data = read_file(path).await?;
        Self::parse(path, &data, false)
    }

    fn parse(path: &Path, data: &[u8], has_headers: bool) -> Result<Self, ServiceError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(has_headers)
            .flexible(true)
            .from_reader(strip_utf8_bom(data));

        let mut columns = HashMap::new();
        if has_headers {
            let headers = reader
                .headers()
                .map_err(|e| ServiceError::csv(path, e))?;
            for (index, name) in headers.iter().enumerate() {
                columns.entry(name.trim().to_string()).or_insert(index);
            }
        }

        let records = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ServiceError::csv(path, e))?;

        debug!(path = %path.display(), rows = records.len(), "read csv");

        Ok(Self {
            path: path.to_path_buf(),
            columns,
            records,
        })
    }

    #[cfg(test)]
    pub(crate) fn parse_for_tests(data: &str) -> Self {
        Self::parse(Path::new("test.csv"), data.as_bytes(), true).expect("valid test csv")
    }

    /// Fails with `MissingColumn` for the first absent header.
    pub fn require_columns(&self, required: &[&str]) -> Result<(), ServiceError> {
        match required.iter().find(|c| !self.columns.contains_key(**c)) {
            Some(missing) => Err(ServiceError::MissingColumn {
                path: self.path.clone(),
                column: (*missing).to_string(),
            }),
            None => Ok(()),
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.records.iter().map(move |record| Row {
            columns: &self.columns,
            record,
        })
    }

    /// Trimmed first-column values, in file order. Only rows whose first
    /// cell is empty are dropped; a whitespace-only cell still yields a value
    /// so that later rows keep their position.
    pub fn first_column(&self) -> impl Iterator<Item = &str> {
        self.records
            .iter()
            .filter_map(|record| record.get(0))
            .filter(|raw| !raw.is_empty())
            .map(str::trim)
    }
}

/// One data row, addressed by column name.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a HashMap<String, usize>,
    record: &'a StringRecord,
}

impl<'a> Row<'a> {
    /// Trimmed value; `None` when the column is absent or the cell is blank.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let index = *self.columns.get(column)?;
        let value = self.record.get(index)?.trim();
        (!value.is_empty()).then_some(value)
    }

    /// Trimmed value, empty when absent.
    pub fn text(&self, column: &str) -> &'a str {
        self.get(column).unwrap_or("")
    }

    /// 1-based line in the source file.
    pub fn line(&self) -> u64 {
        self.record.position().map(|p| p.line()).unwrap_or(0)
    }
}

async fn read_file(path: &Path) -> Result<Vec<u8>, ServiceError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| ServiceError::io(path, e))
}
