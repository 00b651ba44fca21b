//! JSON bodies of the Triton (KServe v2) HTTP inference protocol.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::InferenceError;

pub const BYTES: &str = "BYTES";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferRequest {
    pub inputs: Vec<InferInput>,
    pub outputs: Vec<RequestedOutput>,
}

/// A string tensor; `data` is the row-major flattening of `shape`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferInput {
    pub name: String,
    pub shape: Vec<usize>,
    pub datatype: String,
    pub data: Vec<String>,
}

impl InferInput {
    /// One string laid out as a single-row, single-column batch.
    pub fn text(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            shape: vec![1, 1],
            datatype: BYTES.to_string(),
            data: vec![value.to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestedOutput {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<OutputParameters>,
}

impl RequestedOutput {
    /// Asks for the tensor inline in the JSON body rather than as a binary trailer.
    pub fn json(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parameters: Some(OutputParameters { binary_data: false }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputParameters {
    pub binary_data: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InferResponse {
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub outputs: Vec<InferOutput>,
}

impl InferResponse {
    pub fn output(&self, name: &str) -> Result<&InferOutput, InferenceError> {
        self.outputs
            .iter()
            .find(|output| output.name == name)
            .ok_or_else(|| InferenceError::MissingOutput(name.to_string()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InferOutput {
    pub name: String,
    pub datatype: String,
    pub shape: Vec<usize>,
    pub data: Vec<Value>,
}

impl InferOutput {
    /// Casts every element to `u8` the way an unsigned 8-bit array cast does:
    /// floats truncate toward zero and integers wrap modulo 256.
    pub fn as_u8(&self) -> Result<Vec<u8>, InferenceError> {
        self.data
            .iter()
            .enumerate()
            .map(|(idx, value)| {
                cast_u8(value).ok_or_else(|| {
                    InferenceError::Tensor(format!(
                        "{} element {idx} is not numeric ({} tensor)",
                        self.name, self.datatype
                    ))
                })
            })
            .collect()
    }
}

fn cast_u8(value: &Value) -> Option<u8> {
    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Some(u as u8)
            } else if let Some(i) = n.as_i64() {
                Some(i as u8)
            } else {
                n.as_f64().map(|f| f as i64 as u8)
            }
        }
        Value::Bool(b) => Some(u8::from(*b)),
        _ => None,
    }
}

/// Body Triton sends alongside non-2xx statuses.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
