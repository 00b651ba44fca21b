use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::{
    config::AppConfig,
    error::ServiceError,
    generator::ImageGenerator,
    openai::{GenerationRequest, GenerationResponse, HealthResponse, ModelList},
    triton::InferenceBackend,
};

#[derive(Clone)]
pub struct AppState {
    pub generator: ImageGenerator,
}

pub fn build_router(config: &AppConfig, backend: Arc<dyn InferenceBackend>) -> Router {
    let state = AppState {
        generator: ImageGenerator::new(backend, config),
    };

    Router::new()
        .route("/health", get(health))
        .route("/v1/images/generations", post(generate_images))
        .route("/v1/models", get(list_models))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn generate_images(
    State(state): State<AppState>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Json<GenerationResponse>, ServiceError> {
    let Json(request) = payload.map_err(|rejection| ServiceError::InvalidRequest {
        status: rejection.status(),
        message: rejection.body_text(),
    })?;
    if request.prompt.trim().is_empty() {
        return Err(ServiceError::invalid("prompt must not be empty"));
    }

    let response = state.generator.generate(request).await.map_err(|err| {
        error!(kind = err.kind(), error = %err, "image generation failed");
        ServiceError::GenerationFailed(err)
    })?;
    Ok(Json(response))
}

async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ServiceError> {
    match state.generator.is_backend_live().await {
        Ok(true) => Ok(Json(HealthResponse::connected())),
        Ok(false) => {
            warn!("inference server reports not live");
            Err(ServiceError::BackendUnavailable)
        }
        Err(err) => {
            warn!(kind = err.kind(), error = %err, "liveness probe failed");
            Err(ServiceError::BackendUnavailable)
        }
    }
}

async fn list_models(State(state): State<AppState>) -> Json<ModelList> {
    Json(state.generator.list_models())
}
