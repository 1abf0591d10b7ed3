use std::fmt::{self, Display};

use crate::types::{DataType, Value};

/// Metadata for one result column.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultColumn {
    name: String,
    data_type: DataType,
}

impl ResultColumn {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }
}

/// The outcome of `Database::execute`: a data matrix with column metadata,
/// or an error message. Never both.
///
/// The result owns a snapshot of the returned rows; it stays valid however
/// the database changes afterwards.
#[derive(Debug)]
pub struct QueryResult {
    columns: Vec<ResultColumn>,
    data: Vec<Vec<Option<Value>>>,
    error: Option<String>,
}

impl QueryResult {
    /// A successful result with no rows (DDL statements).
    pub fn ok() -> Self {
        Self {
            columns: Vec::new(),
            data: Vec::new(),
            error: None,
        }
    }

    pub fn with_data(columns: Vec<ResultColumn>, data: Vec<Vec<Option<Value>>>) -> Self {
        Self {
            columns,
            data,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            columns: Vec::new(),
            data: Vec::new(),
            error: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Row-major data: `data()[row][col]`, `None` for NULL.
    pub fn data(&self) -> &[Vec<Option<Value>>] {
        &self.data
    }

    pub fn columns(&self) -> &[ResultColumn] {
        &self.columns
    }

    /// Iterates the rows as name-addressable views.
    pub fn rows(&self) -> impl Iterator<Item = ResultRow<'_>> {
        self.data.iter().map(|values| ResultRow {
            columns: &self.columns,
            values,
        })
    }
}

/// A single result row addressable by column name.
#[derive(Debug, Clone, Copy)]
pub struct ResultRow<'a> {
    columns: &'a [ResultColumn],
    values: &'a [Option<Value>],
}

impl<'a> ResultRow<'a> {
    /// The value under `name`; `None` for NULL or an unknown column.
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        let position = self.columns.iter().position(|c| c.name() == name)?;
        self.values.get(position)?.as_ref()
    }

    pub fn values(&self) -> &'a [Option<Value>] {
        self.values
    }
}

/// ASCII-table rendering for debug printing: a name row, a type row, then
/// the data rows, with `NULL` spelled out.
impl Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(error) = &self.error {
            return writeln!(f, "Error: {}", error);
        }
        if self.columns.is_empty() {
            return writeln!(f, "OK");
        }

        let rendered: Vec<Vec<String>> = self
            .data
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .enumerate()
                    .map(|(i, _)| match row.get(i) {
                        Some(Some(value)) => value.to_string(),
                        _ => "NULL".to_string(),
                    })
                    .collect()
            })
            .collect();

        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let mut width = column.name().len().max(column.data_type().to_string().len());
                for row in &rendered {
                    width = width.max(row[i].len());
                }
                width.max(4)
            })
            .collect();

        let separator = |f: &mut fmt::Formatter<'_>| -> fmt::Result {
            for width in &widths {
                write!(f, "+{}", "-".repeat(width + 2))?;
            }
            writeln!(f, "+")
        };

        let write_row = |f: &mut fmt::Formatter<'_>, cells: &[String]| -> fmt::Result {
            for (cell, width) in cells.iter().zip(&widths) {
                write!(f, "| {:<width$} ", cell, width = *width)?;
            }
            writeln!(f, "|")
        };

        separator(f)?;
        let names: Vec<String> = self.columns.iter().map(|c| c.name().to_string()).collect();
        write_row(f, &names)?;
        let types: Vec<String> = self
            .columns
            .iter()
            .map(|c| c.data_type().to_string())
            .collect();
        write_row(f, &types)?;
        separator(f)?;

        for row in &rendered {
            write_row(f, row)?;
        }
        separator(f)
    }
}
