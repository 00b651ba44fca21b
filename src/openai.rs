//! OpenAI-compatible request and response bodies.

use serde::{Deserialize, Serialize};

pub const B64_JSON: &str = "b64_json";

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Accepted for client compatibility; the backend target comes from configuration.
    #[serde(default)]
    pub model: Option<String>,
    /// Accepted for client compatibility; exactly one image is always returned.
    #[serde(default = "default_n")]
    pub n: i64,
    #[serde(default = "default_response_format")]
    pub response_format: String,
    #[serde(default)]
    pub negative_prompt: Option<String>,
}

fn default_n() -> i64 {
    1
}

fn default_response_format() -> String {
    B64_JSON.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub created: i64,
    pub data: Vec<ImageData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b64_json: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelList {
    pub object: String,
    pub data: Vec<ModelCard>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCard {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub triton: String,
}

impl HealthResponse {
    pub fn connected() -> Self {
        Self {
            status: "healthy".into(),
            triton: "connected".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_fields_take_defaults() {
        let request: GenerationRequest =
            serde_json::from_str(r#"{"prompt":"a lighthouse at dusk"}"#).unwrap();
        assert_eq!(request.n, 1);
        assert_eq!(request.response_format, B64_JSON);
        assert!(request.model.is_none());
        assert!(request.negative_prompt.is_none());
    }

    #[test]
    fn any_integer_n_is_accepted() {
        for n in [-1i64, 0, 7, i64::from(u32::MAX) + 1] {
            let request: GenerationRequest =
                serde_json::from_value(serde_json::json!({"prompt": "a fox", "n": n})).unwrap();
            assert_eq!(request.n, n);
        }
    }

    #[test]
    fn absent_url_is_not_serialized() {
        let data = ImageData {
            b64_json: Some("AAAA".into()),
            url: None,
        };
        assert_eq!(
            serde_json::to_value(&data).unwrap(),
            serde_json::json!({"b64_json": "AAAA"})
        );
    }
}
