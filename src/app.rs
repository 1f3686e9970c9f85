use crate::{
    config::Config, inference_service::InferenceService, ort_service::OrtModelService,
    schema::FeatureSchema, server::HttpServer,
};
use std::error::Error;
use tokio::{signal, sync::broadcast};

pub async fn start_app(config: Config) -> Result<(), Box<dyn Error>> {
    let features_path = config.model.get_features_path();
    let schema = match FeatureSchema::load(&features_path, config.model.allow_extra_features) {
        Ok(schema) => schema,
        Err(e) => {
            tracing::error!("Failed to load feature list {:?}: {}", features_path, e);
            return Err(Box::new(e));
        }
    };
    tracing::info!("Loaded {} model features", schema.len());

    let model_service = match OrtModelService::new(&config.model) {
        Ok(service) => service,
        Err(e) => {
            tracing::error!("Failed to load model: {}", e);
            return Err(e);
        }
    };

    let inference_service = InferenceService::new(model_service, schema);
    let server = HttpServer::new(inference_service, &config.server).await?;

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let server_handle = server.run(shutdown_rx).await?;

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown.");

    let _ = shutdown_tx.send(());
    match server_handle.await {
        Ok(Ok(())) => tracing::info!("Server stopped"),
        Ok(Err(e)) => tracing::error!("Server exited with error: {}", e),
        Err(e) => tracing::error!("Server task failed: {}", e),
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
