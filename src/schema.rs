use crate::table::{json_kind, RecordTable};
use ndarray::Array2;
use serde_json::Value;
use std::{
    collections::HashSet,
    fs::File,
    io::{self, BufRead},
    path::Path,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("failed to read feature list: {0}")]
    Io(#[from] io::Error),
    #[error("feature list is empty")]
    EmptyFeatureList,
    #[error("duplicate feature `{0}` in feature list")]
    DuplicateFeature(String),
    #[error("Feature names unseen at fit time: {}", .0.join(", "))]
    UnknownFeatures(Vec<String>),
    #[error("row {row} is missing feature `{feature}`")]
    MissingFeature { row: usize, feature: String },
    #[error("row {row}: feature `{feature}` must be numeric, found a JSON {kind}")]
    NonNumeric {
        row: usize,
        feature: String,
        kind: &'static str,
    },
    #[error("row {row}: feature `{feature}` must be a finite number")]
    NotFinite { row: usize, feature: String },
}

/// Ordered feature names the model was trained on.
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    features: Vec<String>,
    allow_extra_features: bool,
}

impl FeatureSchema {
    pub fn new(features: Vec<String>, allow_extra_features: bool) -> Result<Self, SchemaError> {
        if features.is_empty() {
            return Err(SchemaError::EmptyFeatureList);
        }

        {
            let mut seen = HashSet::new();
            if let Some(duplicate) = features.iter().find(|f| !seen.insert(f.as_str())) {
                return Err(SchemaError::DuplicateFeature(duplicate.clone()));
            }
        }

        Ok(Self {
            features,
            allow_extra_features,
        })
    }

    pub fn load(path: &Path, allow_extra_features: bool) -> Result<Self, SchemaError> {
        let file = File::open(path)?;
        Self::from_reader(io::BufReader::new(file), allow_extra_features)
    }

    /// One feature name per line; blank lines and `#` comments are skipped.
    pub fn from_reader(
        reader: impl BufRead,
        allow_extra_features: bool,
    ) -> Result<Self, SchemaError> {
        let mut features = Vec::new();
        for line_result in reader.lines() {
            let line = line_result?;
            let name = line.trim();
            if name.is_empty() || name.starts_with('#') {
                continue;
            }
            features.push(name.to_string());
        }

        Self::new(features, allow_extra_features)
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Lays the table out as a `rows x features` matrix in feature list order.
    pub fn encode(&self, table: &RecordTable) -> Result<Array2<f32>, SchemaError> {
        if !self.allow_extra_features {
            let known: HashSet<&str> = self.features.iter().map(String::as_str).collect();
            let unknown: Vec<String> = table
                .columns()
                .iter()
                .filter(|column| !known.contains(column.as_str()))
                .cloned()
                .collect();
            if !unknown.is_empty() {
                return Err(SchemaError::UnknownFeatures(unknown));
            }
        }

        let positions: Vec<Option<usize>> = self
            .features
            .iter()
            .map(|feature| table.column_index(feature))
            .collect();

        let mut matrix = Array2::zeros((table.len(), self.features.len()));
        for (row_index, row) in table.rows().enumerate() {
            for (col, (feature, position)) in self.features.iter().zip(&positions).enumerate() {
                matrix[[row_index, col]] = match position {
                    Some(p) => to_feature_value(&row[*p], row_index, feature)?,
                    None => {
                        return Err(SchemaError::MissingFeature {
                            row: row_index,
                            feature: feature.clone(),
                        })
                    }
                };
            }
        }

        Ok(matrix)
    }
}

fn to_feature_value(value: &Value, row: usize, feature: &str) -> Result<f32, SchemaError> {
    let number = match value {
        Value::Null => {
            return Err(SchemaError::MissingFeature {
                row,
                feature: feature.to_string(),
            })
        }
        Value::Bool(flag) => {
            if *flag {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => n.as_f64().map(|n| n as f32).unwrap_or(f32::NAN),
        Value::String(s) => s.trim().parse::<f32>().map_err(|_| SchemaError::NonNumeric {
            row,
            feature: feature.to_string(),
            kind: "string",
        })?,
        other => {
            return Err(SchemaError::NonNumeric {
                row,
                feature: feature.to_string(),
                kind: json_kind(other),
            })
        }
    };

    if !number.is_finite() {
        return Err(SchemaError::NotFinite {
            row,
            feature: feature.to_string(),
        });
    }

    Ok(number)
}
