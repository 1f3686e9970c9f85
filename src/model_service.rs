use async_trait::async_trait;
use ndarray::Array2;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("session mutex poisoned: {0}")]
    SessionPoisoned(String),
    #[error("failed to build tensor: {0}")]
    Tensor(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("failed to extract output `{name}`: {reason}")]
    Output { name: String, reason: String },
    #[error("model returned {got} predictions for {expected} rows")]
    RowCountMismatch { expected: usize, got: usize },
}

/// A loaded classifier: one class index per row of `features`.
#[async_trait]
pub trait ModelService: Send + Sync + Clone + 'static {
    async fn predict(&self, features: Array2<f32>) -> Result<Vec<i64>, ModelError>;
}
