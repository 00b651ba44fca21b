mod client;
pub mod protocol;

use async_trait::async_trait;

use crate::error::InferenceError;

pub use client::TritonClient;
pub use protocol::{InferInput, InferOutput, InferRequest, InferResponse, RequestedOutput};

/// The remote inference server as seen by the adapter.
///
/// Implementations must be shareable across concurrent requests.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    async fn infer(
        &self,
        model_name: &str,
        request: &InferRequest,
    ) -> Result<InferResponse, InferenceError>;

    /// `Ok(false)` means the server answered but reported itself not live.
    async fn is_live(&self) -> Result<bool, InferenceError>;
}
