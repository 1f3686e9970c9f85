use crate::{
    inference_service::InferenceError, labels::Category, model_service::ModelService,
    server::SharedState,
};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum PredictError {
    #[error("No data provided")]
    MissingField,
    #[error(transparent)]
    MalformedBody(#[from] serde_json::Error),
    #[error(transparent)]
    Processing(#[from] InferenceError),
}

#[derive(Serialize)]
pub struct PredictResponse {
    pub answer: Vec<Category>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        tracing::warn!("Rejecting prediction request: {}", self);
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

#[instrument(skip(state, body))]
pub async fn predict<M: ModelService>(
    State(state): State<SharedState<M>>,
    body: Bytes,
) -> Result<Json<PredictResponse>, PredictError> {
    let payload: Value = serde_json::from_slice(&body)?;
    let text = payload.get("text").ok_or(PredictError::MissingField)?;

    let answer = state.inference_service.classify(text).await?;
    tracing::debug!("Returning {} labels", answer.len());

    Ok(Json(PredictResponse { answer }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        inference_service::InferenceService, model_service::ModelError, schema::FeatureSchema,
    };
    use async_trait::async_trait;
    use ndarray::Array2;
    use serde_json::json;

    /// Class 3 when `f2 >= 0.5`, class 13 otherwise; `f1 < 0` yields class 42.
    #[derive(Clone)]
    struct MockModelService {}

    #[async_trait]
    impl ModelService for MockModelService {
        async fn predict(&self, features: Array2<f32>) -> Result<Vec<i64>, ModelError> {
            Ok(features
                .rows()
                .into_iter()
                .map(|row| match (row[0], row[1]) {
                    (f1, _) if f1 < 0.0 => 42,
                    (_, f2) if f2 >= 0.5 => 3,
                    _ => 13,
                })
                .collect())
        }
    }

    fn state() -> SharedState<MockModelService> {
        let schema = FeatureSchema::new(vec!["f1".to_string(), "f2".to_string()], false).unwrap();
        SharedState {
            inference_service: InferenceService::new(MockModelService {}, schema),
        }
    }

    async fn call(body: &str) -> (StatusCode, Value) {
        let response = predict(State(state()), Bytes::from(body.to_string()))
            .await
            .into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_predict_single_row() {
        let (status, body) = call(r#"{"text": [{"f1": 0.2, "f2": 1.0}]}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"answer": ["Benign"]}));
    }

    #[tokio::test]
    async fn test_predict_preserves_row_order() {
        let (status, body) = call(
            r#"{"text": [
                {"f1": 0.2, "f2": 0.1},
                {"f1": 0.2, "f2": 0.9},
                {"f1": 0.7, "f2": 0.0}
            ]}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"answer": ["Trojan", "Benign", "Trojan"]}));
    }

    #[tokio::test]
    async fn test_missing_text_field() {
        let (status, body) = call("{}").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "No data provided"}));

        let (status, body) = call(r#"[{"f1": 0.2, "f2": 1.0}]"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "No data provided"}));
    }

    #[tokio::test]
    async fn test_malformed_rows() {
        let (status, body) = call(r#"{"text": [{"f1": 0.2}]}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.get("answer").is_none());
        assert_eq!(body["error"], json!("row 0 is missing feature `f2`"));

        let (status, body) = call(r#"{"text": "not a table"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body["error"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_json_body() {
        let (status, body) = call("{\"text\": [").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.get("answer").is_none());
        assert!(!body["error"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_class_index() {
        let (status, body) =
            call(r#"{"text": [{"f1": 0.2, "f2": 1.0}, {"f1": -1.0, "f2": 1.0}]}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "unknown class index 42"}));
    }

    #[tokio::test]
    async fn test_identical_requests_get_identical_responses() {
        let request = r#"{"text": {"f1": [0.1, 0.2], "f2": [0.7, 0.3]}}"#;

        let first = call(request).await;
        let second = call(request).await;

        assert_eq!(first, second);
        assert_eq!(first.1, json!({"answer": ["Benign", "Trojan"]}));
    }
}
