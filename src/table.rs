use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum TableError {
    #[error("cannot build a table from a JSON {0}")]
    Unsupported(&'static str),
    #[error("row {index} must be an object, found a JSON {kind}")]
    InvalidRow { index: usize, kind: &'static str },
    #[error("column `{0}` must be an array or a scalar")]
    InvalidColumn(String),
    #[error("All arrays must be of the same length")]
    LengthMismatch,
    #[error("If using all scalar values, you must pass an index")]
    AllScalars,
    #[error("Found array with 0 sample(s)")]
    Empty,
}

/// Rows of feature values keyed by column name. `Value::Null` marks a
/// value the row did not provide.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl RecordTable {
    /// Accepts either an array of row objects or an object of column arrays.
    pub fn from_json(value: &Value) -> Result<Self, TableError> {
        let table = match value {
            Value::Array(records) => Self::from_records(records)?,
            Value::Object(columns) => Self::from_columns(columns)?,
            other => return Err(TableError::Unsupported(json_kind(other))),
        };

        if table.is_empty() {
            return Err(TableError::Empty);
        }

        Ok(table)
    }

    fn from_records(records: &[Value]) -> Result<Self, TableError> {
        let mut columns: Vec<String> = Vec::new();
        let mut positions: HashMap<&str, usize> = HashMap::new();

        for (index, record) in records.iter().enumerate() {
            let fields = record.as_object().ok_or(TableError::InvalidRow {
                index,
                kind: json_kind(record),
            })?;
            for key in fields.keys() {
                if !positions.contains_key(key.as_str()) {
                    positions.insert(key.as_str(), columns.len());
                    columns.push(key.clone());
                }
            }
        }

        let rows = records
            .iter()
            .filter_map(Value::as_object)
            .map(|fields| {
                let mut row = vec![Value::Null; columns.len()];
                for (key, value) in fields {
                    row[positions[key.as_str()]] = value.clone();
                }
                row
            })
            .collect();

        Ok(Self { columns, rows })
    }

    fn from_columns(fields: &Map<String, Value>) -> Result<Self, TableError> {
        if fields.is_empty() {
            return Ok(Self {
                columns: Vec::new(),
                rows: Vec::new(),
            });
        }

        let mut num_rows: Option<usize> = None;
        for (name, value) in fields {
            match value {
                Value::Array(values) => match num_rows {
                    Some(n) if n != values.len() => return Err(TableError::LengthMismatch),
                    _ => num_rows = Some(values.len()),
                },
                Value::Object(_) => return Err(TableError::InvalidColumn(name.clone())),
                _ => {}
            }
        }
        let num_rows = num_rows.ok_or(TableError::AllScalars)?;

        let columns: Vec<String> = fields.keys().cloned().collect();
        let rows = (0..num_rows)
            .map(|i| {
                fields
                    .values()
                    .map(|value| match value {
                        Value::Array(values) => values[i].clone(),
                        scalar => scalar.clone(),
                    })
                    .collect()
            })
            .collect();

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Value]> {
        self.rows.iter().map(Vec::as_slice)
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
