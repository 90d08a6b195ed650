use std::collections::HashMap;

use anyhow::Error;
use serde::{Deserialize, Serialize};

/// Body of a `POST /predict` request.
///
/// Two shapes are accepted. The flat form carries one positional feature row
/// and must hold exactly as many values as the model was trained on. The
/// columns form maps feature names to value sequences of equal length and
/// yields one prediction per aligned row; key order is irrelevant since
/// columns are matched by name.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum PredictRequest {
    Flat { data: Vec<f64> },
    Columns(HashMap<String, Vec<f64>>),
}

#[derive(Deserialize, Serialize, Debug, PartialEq)]
pub struct PredictResponse {
    #[serde(rename = "Prediction")]
    pub prediction: Vec<f64>,
}

pub trait PredictHandler {
    /// Runs inference on validated feature rows, one prediction per row.
    fn run_predict(&self, rows: Vec<Vec<f32>>) -> Result<PredictResponse, Error>;
}
