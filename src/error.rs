use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Why a backend round trip or the image decode behind it failed.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("failed to reach inference server: {}", with_causes(.0))]
    Transport(#[source] reqwest::Error),
    #[error("inference server did not answer in time")]
    Timeout,
    #[error("inference server returned {status}: {message}")]
    Backend { status: u16, message: String },
    #[error("unreadable inference response: {0}")]
    Protocol(String),
    #[error("output tensor '{0}' missing from inference response")]
    MissingOutput(String),
    #[error("unexpected output tensor: {0}")]
    Tensor(String),
    #[error("png encoding failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("image task failed: {0}")]
    Task(String),
}

/// Renders an error followed by every cause in its source chain.
pub fn with_causes(err: &dyn std::error::Error) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !rendered.ends_with(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        source = cause.source();
    }
    rendered
}

impl InferenceError {
    pub fn kind(&self) -> &'static str {
        match self {
            InferenceError::Transport(_) | InferenceError::Timeout => "network",
            InferenceError::Backend { .. } => "backend",
            InferenceError::Protocol(_) | InferenceError::MissingOutput(_) => "protocol",
            InferenceError::Tensor(_) | InferenceError::Image(_) => "decode",
            InferenceError::Task(_) => "runtime",
        }
    }
}

impl From<reqwest::Error> for InferenceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            InferenceError::Timeout
        } else if err.is_decode() {
            InferenceError::Protocol(err.to_string())
        } else {
            InferenceError::Transport(err)
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Image generation failed: {0}")]
    GenerationFailed(#[from] InferenceError),
    #[error("Triton server unavailable")]
    BackendUnavailable,
    #[error("{message}")]
    InvalidRequest { status: StatusCode, message: String },
}

impl ServiceError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ServiceError::InvalidRequest {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: message.into(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::GenerationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::BackendUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::InvalidRequest { status, .. } => *status,
        };

        let body = serde_json::json!({
            "detail": self.to_string(),
        });

        (status, axum::Json(body)).into_response()
    }
}
