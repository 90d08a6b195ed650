use anyhow::{anyhow, Context, Error, Result};
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;

use crate::model::schema::FeatureSchema;
use crate::model::task::predict::{PredictHandler, PredictResponse};

/// A pre-trained tree-ensemble regressor paired with the feature schema it
/// was trained against. Loaded once at startup and shared read-only with the
/// request handlers; inference does not mutate the ensemble.
pub struct ForestModel {
    forest: GBDT,
    schema: FeatureSchema,
}

impl std::fmt::Debug for ForestModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForestModel")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl ForestModel {
    pub fn load(model_file: &str, schema_file: &str) -> Result<Self> {
        let schema = FeatureSchema::from_file(schema_file)?;
        let forest = GBDT::load_model(model_file)
            .map_err(|err| anyhow!("{err}"))
            .with_context(|| format!("failed to load model artifact {model_file}"))?;
        Ok(ForestModel { forest, schema })
    }

    pub fn from_parts(forest: GBDT, schema: FeatureSchema) -> Self {
        ForestModel { forest, schema }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }
}

impl PredictHandler for ForestModel {
    fn run_predict(&self, rows: Vec<Vec<f32>>) -> Result<PredictResponse, Error> {
        if rows.is_empty() {
            return Ok(PredictResponse { prediction: vec![] });
        }
        let input: DataVec = rows
            .into_iter()
            .map(|row| Data::new_test_data(row, None))
            .collect();
        let predictions = self.forest.predict(&input);
        Ok(PredictResponse {
            prediction: predictions.into_iter().map(f64::from).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use gbdt::config::Config;
    use gbdt::decision_tree::{Data, DataVec};
    use gbdt::gradient_boost::GBDT;

    use super::ForestModel;
    use crate::model::schema::FeatureSchema;
    use crate::model::task::predict::PredictHandler;

    fn tiny_forest(feature_size: usize) -> GBDT {
        let mut config = Config::new();
        config.set_feature_size(feature_size);
        config.set_max_depth(3);
        config.set_iterations(10);
        config.set_shrinkage(0.1);

        let mut train: DataVec = (0..40)
            .map(|i| {
                let x = i as f32;
                let features = (0..feature_size).map(|f| x + f as f32).collect();
                Data::new_training_data(features, 1.0, x * 0.5, None)
            })
            .collect();

        let mut forest = GBDT::new(&config);
        forest.fit(&mut train);
        forest
    }

    fn tiny_model() -> ForestModel {
        let schema =
            FeatureSchema::new(vec!["temp_max".to_string(), "temp_min".to_string()]).unwrap();
        ForestModel::from_parts(tiny_forest(2), schema)
    }

    #[test]
    fn one_prediction_per_row() {
        let model = tiny_model();
        let rows = vec![vec![1.0, 2.0], vec![10.0, 11.0], vec![30.0, 31.0]];
        let response = model.run_predict(rows).unwrap();
        assert_eq!(response.prediction.len(), 3);
    }

    #[test]
    fn inference_is_deterministic() {
        let model = tiny_model();
        let first = model.run_predict(vec![vec![5.0, 6.0]]).unwrap();
        let second = model.run_predict(vec![vec![5.0, 6.0]]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_input_yields_empty_prediction() {
        let response = tiny_model().run_predict(vec![]).unwrap();
        assert!(response.prediction.is_empty());
    }

    #[test]
    fn loads_saved_artifact_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("model.gbdt");
        let schema_path = dir.path().join("schema.json");

        tiny_forest(2)
            .save_model(model_path.to_str().unwrap())
            .expect("save model");
        let mut schema_file = std::fs::File::create(&schema_path).unwrap();
        write!(
            schema_file,
            "{{\"columns\": [\"temp_max\", \"temp_min\"]}}"
        )
        .unwrap();

        let model = ForestModel::load(
            model_path.to_str().unwrap(),
            schema_path.to_str().unwrap(),
        )
        .unwrap();
        assert_eq!(model.schema().arity(), 2);

        let response = model.run_predict(vec![vec![5.0, 6.0]]).unwrap();
        assert_eq!(response.prediction.len(), 1);
    }

    #[test]
    fn missing_artifact_is_an_error() {
        let err = ForestModel::load("missing.gbdt", "missing.json").unwrap_err();
        assert!(err.to_string().contains("feature schema"));
    }
}
