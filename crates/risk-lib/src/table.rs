//! Tabular client data
//!
//! A small column-ordered table used for batch predictions and the
//! dashboard dataset. Rows are stored row-major; every row has exactly one
//! cell per column.

use crate::models::{ClientRecord, FeatureValue};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::io::Read;
use thiserror::Error;

/// Errors raised while building or serializing a table
#[derive(Debug, Error)]
pub enum TableError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("column {column} has {found} values, table has {expected} rows")]
    ColumnLength {
        column: String,
        found: usize,
        expected: usize,
    },

    #[error("CSV input has no header row")]
    MissingHeader,

    #[error("failed to flush CSV output: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<FeatureValue>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Result<Self, TableError> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(TableError::DuplicateColumn(column.clone()));
            }
        }
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    /// One-row table from a single client record
    pub fn from_record(record: &ClientRecord) -> Self {
        Self {
            columns: record.keys().cloned().collect(),
            rows: vec![record.values().cloned().collect()],
        }
    }

    /// Read a table from CSV with a header row
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        if headers.is_empty() {
            return Err(TableError::MissingHeader);
        }
        let mut table = Table::new(headers.iter().map(|h| h.trim().to_string()).collect())?;

        for (idx, record) in csv_reader.records().enumerate() {
            let record = record?;
            table
                .push_row(record.iter().map(FeatureValue::parse).collect())
                .map_err(|e| match e {
                    TableError::RaggedRow { found, expected, .. } => TableError::RaggedRow {
                        row: idx + 1,
                        found,
                        expected,
                    },
                    other => other,
                })?;
        }

        Ok(table)
    }

    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self, TableError> {
        Self::from_csv_reader(bytes)
    }

    pub fn push_row(&mut self, row: Vec<FeatureValue>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RaggedRow {
                row: self.rows.len(),
                found: row.len(),
                expected: self.columns.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<FeatureValue>] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of one column, in row order
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &FeatureValue> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Project onto `names` in the given order; `None` if any name is absent
    pub fn select(&self, names: &[String]) -> Option<Table> {
        let indices: Vec<usize> = names
            .iter()
            .map(|name| self.column_index(name))
            .collect::<Option<_>>()?;

        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();

        Some(Table {
            columns: names.to_vec(),
            rows,
        })
    }

    /// Append a column, or overwrite an existing column of the same name in place
    ///
    /// `values` must have one entry per row.
    pub fn with_column(mut self, name: &str, values: Vec<FeatureValue>) -> Result<Self, TableError> {
        if values.len() != self.rows.len() {
            return Err(TableError::ColumnLength {
                column: name.to_string(),
                found: values.len(),
                expected: self.rows.len(),
            });
        }
        self.set_column(name, values);
        Ok(self)
    }

    /// Append (or overwrite) a column holding the same value on every row
    pub fn with_constant_column(mut self, name: &str, value: FeatureValue) -> Self {
        let values = vec![value; self.rows.len()];
        self.set_column(name, values);
        self
    }

    /// Write a column in place or append it; rows beyond `values` get `Null`
    pub(crate) fn set_column(&mut self, name: &str, values: Vec<FeatureValue>) {
        let mut values = values.into_iter();
        match self.column_index(name) {
            Some(idx) => {
                for row in self.rows.iter_mut() {
                    row[idx] = values.next().unwrap_or(FeatureValue::Null);
                }
            }
            None => {
                self.columns.push(name.to_string());
                for row in self.rows.iter_mut() {
                    row.push(values.next().unwrap_or(FeatureValue::Null));
                }
            }
        }
    }

    pub fn to_csv_bytes(&self) -> Result<Vec<u8>, TableError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|cell| cell.to_string()))?;
        }
        writer
            .into_inner()
            .map_err(|e| TableError::Io(e.into_error()))
    }

    /// One JSON object per row, missing values as `null`
    pub fn to_json_records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .map(|(column, cell)| (column.clone(), cell.to_json()))
                    .collect()
            })
            .collect()
    }
}
