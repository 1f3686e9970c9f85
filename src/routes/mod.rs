mod predict;

use crate::{model_service::ModelService, server::SharedState};
use axum::{routing::post, Router};

pub fn api_routes<M: ModelService>() -> Router<SharedState<M>> {
    Router::new().route("/predict", post(predict::predict::<M>))
}
