
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use calamine::{Data, Reader, Xlsx, open_workbook};
use tracing::{debug, info};

use crate::{MatcherError, Result};

/// Tabular formats a job dataset can be uploaded in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    Csv,
    Xlsx,
}

impl DatasetFormat {
    /// Detect the format from the file extension
    #[inline]
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("xlsx") => Ok(Self::Xlsx),
            _ => Err(MatcherError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// A header row plus string cells, before any schema checks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    #[inline]
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Parse CSV from any reader; the first record is the header row
    #[inline]
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader
            .headers()
            .map_err(|e| MatcherError::Dataset(format!("Failed to read CSV header: {}", e)))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for (index, record) in csv_reader.records().enumerate() {
            let record = record.map_err(|e| {
                MatcherError::Dataset(format!("Failed to read CSV row {}: {}", index + 1, e))
            })?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    /// Read the first worksheet of an XLSX workbook
    #[inline]
    pub fn from_xlsx_path(path: &Path) -> Result<Self> {
        let mut workbook: Xlsx<BufReader<File>> = open_workbook(path).map_err(|e| {
            MatcherError::Dataset(format!(
                "Failed to open workbook {}: {}",
                path.display(),
                e
            ))
        })?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| {
                MatcherError::Dataset(format!("Workbook {} has no worksheets", path.display()))
            })?
            .map_err(|e| MatcherError::Dataset(format!("Failed to read worksheet: {}", e)))?;

        let mut rows = range.rows();
        let headers = rows
            .next()
            .map(|row| row.iter().map(|cell| cell_to_string(cell).trim().to_string()).collect())
            .unwrap_or_default();
        let rows = rows
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect();

        Ok(Self { headers, rows })
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the column whose header matches `name` exactly
    #[inline]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    /// Cell text, or `None` when the row is shorter than the header
    #[inline]
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .map(String::as_str)
    }
}

/// Load a dataset file, choosing the parser from its extension
#[inline]
pub fn load_table(path: &Path) -> Result<RawTable> {
    let format = DatasetFormat::from_path(path)?;
    debug!("Loading {:?} dataset from {}", format, path.display());

    let table = match format {
        DatasetFormat::Csv => {
            let file = File::open(path)?;
            RawTable::from_csv_reader(BufReader::new(file))?
        }
        DatasetFormat::Xlsx => RawTable::from_xlsx_path(path)?,
    };

    info!(
        "Loaded {} rows with {} columns from {}",
        table.row_count(),
        table.headers.len(),
        path.display()
    );
    Ok(table)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
