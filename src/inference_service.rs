use crate::{
    labels::{label_classes, Category, LabelError},
    model_service::{ModelError, ModelService},
    schema::{FeatureSchema, SchemaError},
    table::{RecordTable, TableError},
};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Label(#[from] LabelError),
}

/// Table conversion, schema validation, inference and labelling for one request.
#[derive(Clone)]
pub struct InferenceService<M: ModelService> {
    model_service: Arc<M>,
    schema: Arc<FeatureSchema>,
}

impl<M: ModelService> InferenceService<M> {
    pub fn new(model_service: M, schema: FeatureSchema) -> Self {
        Self {
            model_service: Arc::new(model_service),
            schema: Arc::new(schema),
        }
    }

    #[instrument(skip(self, text))]
    pub async fn classify(&self, text: &Value) -> Result<Vec<Category>, InferenceError> {
        let table = RecordTable::from_json(text)?;
        let features = self.schema.encode(&table)?;
        tracing::debug!(
            "Classifying {} rows over {} features",
            table.len(),
            self.schema.len()
        );

        let classes = self.model_service.predict(features).await?;
        if classes.len() != table.len() {
            return Err(ModelError::RowCountMismatch {
                expected: table.len(),
                got: classes.len(),
            }
            .into());
        }

        Ok(label_classes(&classes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ndarray::Array2;
    use serde_json::json;

    /// Predicts `round(f1 * 10)` for each row.
    #[derive(Clone)]
    struct MockModelService {}

    #[async_trait]
    impl ModelService for MockModelService {
        async fn predict(&self, features: Array2<f32>) -> Result<Vec<i64>, ModelError> {
            Ok(features
                .rows()
                .into_iter()
                .map(|row| (row[0] * 10.0).round() as i64)
                .collect())
        }
    }

    #[derive(Clone)]
    struct ShortModelService {}

    #[async_trait]
    impl ModelService for ShortModelService {
        async fn predict(&self, _features: Array2<f32>) -> Result<Vec<i64>, ModelError> {
            Ok(vec![0])
        }
    }

    fn schema() -> FeatureSchema {
        FeatureSchema::new(vec!["f1".to_string(), "f2".to_string()], false).unwrap()
    }

    #[tokio::test]
    async fn test_classify() -> Result<(), Box<dyn std::error::Error>> {
        let service = InferenceService::new(MockModelService {}, schema());

        let labels = service
            .classify(&json!([
                {"f1": 0.3, "f2": 1.0},
                {"f1": 1.3, "f2": 0.0},
                {"f1": 0.0, "f2": 0.5},
            ]))
            .await?;

        assert_eq!(
            labels,
            vec![Category::Benign, Category::Trojan, Category::Adware]
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_column_form_gives_same_answer() -> Result<(), Box<dyn std::error::Error>> {
        let service = InferenceService::new(MockModelService {}, schema());

        let from_records = service
            .classify(&json!([{"f1": 0.8, "f2": 1}, {"f1": 1.0, "f2": 2}]))
            .await?;
        let from_columns = service
            .classify(&json!({"f1": [0.8, 1.0], "f2": [1, 2]}))
            .await?;

        assert_eq!(from_records, from_columns);
        assert_eq!(from_records, vec![Category::Ransomware, Category::Sms]);

        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_class_index_fails_request() {
        let service = InferenceService::new(MockModelService {}, schema());

        let err = service
            .classify(&json!([{"f1": 0.3, "f2": 0}, {"f1": 2.0, "f2": 0}]))
            .await
            .unwrap_err();

        assert!(matches!(err, InferenceError::Label(LabelError::UnknownClass(20))));
        assert_eq!(err.to_string(), "unknown class index 20");
    }

    #[tokio::test]
    async fn test_row_count_mismatch() {
        let service = InferenceService::new(ShortModelService {}, schema());

        let err = service
            .classify(&json!([{"f1": 0.3, "f2": 0}, {"f1": 0.4, "f2": 0}]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            InferenceError::Model(ModelError::RowCountMismatch {
                expected: 2,
                got: 1
            })
        ));
    }

    #[tokio::test]
    async fn test_malformed_rows_never_reach_the_model() {
        let service = InferenceService::new(ShortModelService {}, schema());

        let err = service
            .classify(&json!([{"f1": 0.3}]))
            .await
            .unwrap_err();

        assert!(matches!(err, InferenceError::Schema(_)));
        assert_eq!(err.to_string(), "row 0 is missing feature `f2`");
    }
}
