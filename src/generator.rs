use std::sync::Arc;

use tokio::task;
use tracing::{debug, info, warn};

use crate::{
    config::AppConfig,
    error::InferenceError,
    openai::{B64_JSON, GenerationRequest, GenerationResponse, ImageData, ModelCard, ModelList},
    raster::Raster,
    triton::{InferInput, InferRequest, InferenceBackend, RequestedOutput},
};

pub const PROMPT_INPUT: &str = "prompt";
pub const NEGATIVE_PROMPT_INPUT: &str = "negative_prompt";
pub const IMAGE_OUTPUT: &str = "generated_image";
pub const OWNED_BY: &str = "triton";

/// Turns OpenAI-style image requests into calls against one configured backend model.
#[derive(Clone)]
pub struct ImageGenerator {
    backend: Arc<dyn InferenceBackend>,
    model_name: String,
}

impl ImageGenerator {
    pub fn new(backend: Arc<dyn InferenceBackend>, config: &AppConfig) -> Self {
        Self {
            backend,
            model_name: config.model_name.clone(),
        }
    }

    pub fn build_request(request: &GenerationRequest) -> InferRequest {
        let mut inputs = vec![InferInput::text(PROMPT_INPUT, &request.prompt)];
        if let Some(negative) = request.negative_prompt.as_deref().filter(|n| !n.is_empty()) {
            inputs.push(InferInput::text(NEGATIVE_PROMPT_INPUT, negative));
        }

        InferRequest {
            inputs,
            outputs: vec![RequestedOutput::json(IMAGE_OUTPUT)],
        }
    }

    pub async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, InferenceError> {
        self.log_ignored_fields(&request);

        let infer_request = Self::build_request(&request);
        info!(
            model = %self.model_name,
            negative_prompt = infer_request.inputs.len() > 1,
            "submitting inference request"
        );

        let response = self
            .backend
            .infer(&self.model_name, &infer_request)
            .await
            .inspect_err(|err| warn!(kind = err.kind(), error = %err, "inference call failed"))?;

        // Cast, squeeze and PNG-encode off the async workers.
        let encoded = task::spawn_blocking(move || {
            let raster = Raster::from_output(response.output(IMAGE_OUTPUT)?)?;
            let b64 = raster.to_base64_png()?;
            Ok::<_, InferenceError>((raster.width, raster.height, b64))
        })
        .await
        .map_err(|err| InferenceError::Task(err.to_string()))?
        .inspect_err(|err| warn!(kind = err.kind(), error = %err, "image decode failed"))?;

        let (width, height, b64_json) = encoded;
        info!(width, height, bytes = b64_json.len(), "image encoded");

        Ok(GenerationResponse {
            created: chrono::Utc::now().timestamp(),
            data: vec![ImageData {
                b64_json: Some(b64_json),
                url: None,
            }],
        })
    }

    pub async fn is_backend_live(&self) -> Result<bool, InferenceError> {
        self.backend.is_live().await
    }

    pub fn list_models(&self) -> ModelList {
        ModelList {
            object: "list".into(),
            data: vec![ModelCard {
                id: self.model_name.clone(),
                object: "model".into(),
                created: chrono::Utc::now().timestamp(),
                owned_by: OWNED_BY.into(),
            }],
        }
    }

    fn log_ignored_fields(&self, request: &GenerationRequest) {
        if let Some(model) = request.model.as_deref().filter(|m| *m != self.model_name) {
            debug!(requested = model, using = %self.model_name, "ignoring requested model");
        }
        if request.n != 1 {
            debug!(n = request.n, "returning a single image");
        }
        if request.response_format != B64_JSON {
            debug!(response_format = %request.response_format, "only b64_json is produced");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use base64::{Engine as _, engine::general_purpose};
    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;
    use crate::triton::InferResponse;

    #[derive(Default)]
    struct FakeTriton {
        calls: Mutex<Vec<(String, InferRequest)>>,
        response: Option<serde_json::Value>,
    }

    #[async_trait]
    impl InferenceBackend for FakeTriton {
        async fn infer(
            &self,
            model_name: &str,
            request: &InferRequest,
        ) -> Result<InferResponse, InferenceError> {
            self.calls
                .lock()
                .push((model_name.to_string(), request.clone()));
            match &self.response {
                Some(body) => Ok(serde_json::from_value(body.clone()).unwrap()),
                None => Err(InferenceError::Timeout),
            }
        }

        async fn is_live(&self) -> Result<bool, InferenceError> {
            Ok(true)
        }
    }

    fn config() -> AppConfig {
        AppConfig {
            listen_addr: "127.0.0.1:0".parse().unwrap(),
            triton_url: "http://localhost:8000".into(),
            model_name: "stable_diffusion_xl".into(),
            request_timeout: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(1),
            health_timeout: Duration::from_secs(1),
        }
    }

    fn request(body: serde_json::Value) -> GenerationRequest {
        serde_json::from_value(body).unwrap()
    }

    fn two_by_two_rgb() -> serde_json::Value {
        json!({
            "outputs": [{
                "name": "generated_image",
                "datatype": "UINT8",
                "shape": [1, 2, 2, 3],
                "data": [255, 0, 0, 0, 255, 0, 0, 0, 255, 9, 9, 9]
            }]
        })
    }

    #[test]
    fn empty_negative_prompt_is_not_attached() {
        let built = ImageGenerator::build_request(&request(
            json!({"prompt": "a cat", "negative_prompt": ""}),
        ));
        assert_eq!(built.inputs.len(), 1);
        assert_eq!(built.inputs[0].name, PROMPT_INPUT);
        assert_eq!(built.outputs[0].name, IMAGE_OUTPUT);
    }

    #[test]
    fn negative_prompt_becomes_second_text_tensor() {
        let built = ImageGenerator::build_request(&request(
            json!({"prompt": "a cat", "negative_prompt": "blurry"}),
        ));
        assert_eq!(built.inputs.len(), 2);
        assert_eq!(built.inputs[1].name, NEGATIVE_PROMPT_INPUT);
        assert_eq!(built.inputs[1].shape, vec![1, 1]);
        assert_eq!(built.inputs[1].data, vec!["blurry".to_string()]);
    }

    #[tokio::test]
    async fn generate_targets_configured_model_and_returns_one_png() {
        let backend = Arc::new(FakeTriton {
            response: Some(two_by_two_rgb()),
            ..Default::default()
        });
        let generator = ImageGenerator::new(backend.clone(), &config());

        let response = generator
            .generate(request(json!({"prompt": "a cat", "model": "dall-e-3", "n": 4})))
            .await
            .unwrap();

        assert_eq!(response.data.len(), 1);
        assert!(response.data[0].url.is_none());
        let png = general_purpose::STANDARD
            .decode(response.data[0].b64_json.as_ref().unwrap())
            .unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgb8();
        assert_eq!(
            decoded.into_raw(),
            vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 9, 9, 9]
        );

        let calls = backend.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "stable_diffusion_xl");
    }

    #[tokio::test]
    async fn missing_output_tensor_is_a_protocol_error() {
        let backend = Arc::new(FakeTriton {
            response: Some(json!({"outputs": []})),
            ..Default::default()
        });
        let generator = ImageGenerator::new(backend, &config());

        let err = generator
            .generate(request(json!({"prompt": "a cat"})))
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::MissingOutput(_)));
    }

    #[test]
    fn model_list_advertises_configured_model() {
        let generator = ImageGenerator::new(Arc::new(FakeTriton::default()), &config());
        let list = generator.list_models();
        assert_eq!(list.object, "list");
        assert_eq!(list.data.len(), 1);
        assert_eq!(list.data[0].id, "stable_diffusion_xl");
        assert_eq!(list.data[0].owned_by, "triton");
    }
}
