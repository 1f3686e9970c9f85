mod ort_service;
mod routes;

pub mod app;
pub mod config;
pub mod inference_service;
pub mod labels;
pub mod model_service;
pub mod schema;
pub mod server;
pub mod table;

pub use app::start_app;
pub use ort_service::OrtModelService;
