use crate::{
    config::{ModelConfig, Validatable},
    model_service::{ModelError, ModelService},
};
use async_trait::async_trait;
use ndarray::Array2;
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::TensorRef,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

#[derive(Clone)]
pub struct OrtModelService {
    sessions: Arc<Vec<Arc<Mutex<Session>>>>,
    counter: Arc<AtomicUsize>,
    output_name: Arc<str>,
}

impl OrtModelService {
    pub fn new(model_config: &ModelConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let num_instances = model_config.num_instances;
        let sessions = (0..num_instances)
            .map(|_| {
                let session = Session::builder()?
                    .with_optimization_level(GraphOptimizationLevel::Level3)?
                    .commit_from_file(model_config.get_path())?;
                Ok(Arc::new(Mutex::new(session)))
            })
            .collect::<Result<Vec<_>, ort::Error>>()?;

        if let Some(first) = sessions.first() {
            let session = first
                .lock()
                .map_err(|e| ModelError::SessionPoisoned(e.to_string()))?;
            let available: Vec<&str> =
                session.outputs.iter().map(|o| o.name.as_str()).collect();
            check_output_name(&available, &model_config.output_name)?;
        }

        tracing::info!(
            "Created {} ONNX sessions for {:?}",
            num_instances,
            model_config.get_path()
        );

        Ok(Self {
            sessions: Arc::new(sessions),
            counter: Arc::new(AtomicUsize::new(0)),
            output_name: Arc::from(model_config.output_name.as_str()),
        })
    }

    pub fn run_inference(&self, features: &Array2<f32>) -> Result<Vec<i64>, ModelError> {
        let index = self.counter.fetch_add(1, Ordering::SeqCst) % self.sessions.len();
        let mut session = self.sessions[index]
            .lock()
            .map_err(|e| ModelError::SessionPoisoned(e.to_string()))?;

        tracing::debug!("Handling request with session {}", index);
        let owned_buffer;
        let input_view = if features.view().is_standard_layout() {
            features.view()
        } else {
            owned_buffer = features.as_standard_layout().into_owned();
            owned_buffer.view()
        };

        let tensor_ref = TensorRef::from_array_view(input_view)
            .map_err(|e| ModelError::Tensor(e.to_string()))?;

        let outputs = session
            .run(ort::inputs![tensor_ref])
            .map_err(|e| ModelError::Inference(e.to_string()))?;

        let (_shape, data) = outputs[&*self.output_name]
            .try_extract_tensor::<i64>()
            .map_err(|e| ModelError::Output {
                name: self.output_name.to_string(),
                reason: e.to_string(),
            })?;

        // `[N]` or `[N, 1]`, one label per row either way.
        Ok(data.to_vec())
    }
}

fn check_output_name(available: &[&str], output_name: &str) -> Result<(), String> {
    if available.contains(&output_name) {
        return Ok(());
    }
    Err(format!(
        "model has no output named `{}` (available: {})",
        output_name,
        available.join(", ")
    ))
}

/// Runs a session call off the async workers; a panic becomes an inference error.
async fn run_blocking<T, F>(task: F) -> Result<T, ModelError>
where
    F: FnOnce() -> Result<T, ModelError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ModelError::Inference(format!("inference task failed: {}", e)))?
}

#[async_trait]
impl ModelService for OrtModelService {
    async fn predict(&self, features: Array2<f32>) -> Result<Vec<i64>, ModelError> {
        let service = self.clone();
        run_blocking(move || service.run_inference(&features)).await
    }
}
