use std::collections::{HashMap, HashSet};

use anyhow::{ensure, Context, Result};
use serde::Deserialize;

use crate::model::task::predict::PredictRequest;

/// Ordered list of the feature names the model was trained on.
///
/// The model artifact itself is opaque, so the schema file next to it is the
/// authoritative statement of input arity and column order. Flat payloads are
/// matched positionally against this order; column payloads are matched by
/// name and reordered to it.
#[derive(Deserialize, Debug, Clone)]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<String>) -> Result<Self> {
        ensure!(!columns.is_empty(), "feature schema has no columns");
        let mut seen = HashSet::new();
        for name in &columns {
            ensure!(
                seen.insert(name.as_str()),
                "duplicate column {name} in feature schema"
            );
        }
        Ok(FeatureSchema { columns })
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read feature schema {path}"))?;
        let schema: FeatureSchema = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse feature schema {path}"))?;
        FeatureSchema::new(schema.columns)
    }

    pub fn arity(&self) -> usize {
        self.columns.len()
    }

    /// Builds row-major model input from a request body, validating the shape
    /// before any value reaches the model.
    pub fn rows_from_request(&self, request: &PredictRequest) -> Result<Vec<Vec<f32>>> {
        match request {
            PredictRequest::Flat { data } => Ok(vec![self.row_from_flat(data)?]),
            PredictRequest::Columns(columns) => self.rows_from_columns(columns),
        }
    }

    fn row_from_flat(&self, values: &[f64]) -> Result<Vec<f32>> {
        ensure!(
            values.len() == self.arity(),
            "expected {} feature values per row, got {}",
            self.arity(),
            values.len()
        );
        Ok(values.iter().map(|v| *v as f32).collect())
    }

    fn rows_from_columns(&self, columns: &HashMap<String, Vec<f64>>) -> Result<Vec<Vec<f32>>> {
        for name in columns.keys() {
            ensure!(
                self.columns.iter().any(|column| column == name),
                "unknown column {name}"
            );
        }

        let mut ordered = Vec::with_capacity(self.arity());
        for name in &self.columns {
            let values = columns
                .get(name)
                .with_context(|| format!("missing column {name}"))?;
            ordered.push(values.as_slice());
        }

        let row_count = ordered[0].len();
        for (name, values) in self.columns.iter().zip(&ordered) {
            ensure!(
                values.len() == row_count,
                "column {} has {} values, expected {}",
                name,
                values.len(),
                row_count
            );
        }

        Ok((0..row_count)
            .map(|row| ordered.iter().map(|column| column[row] as f32).collect())
            .collect())
    }
}
