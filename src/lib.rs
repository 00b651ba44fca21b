pub mod config;
pub mod error;
pub mod generator;
pub mod openai;
pub mod raster;
pub mod server;
pub mod triton;

pub use config::AppConfig;
pub use error::{InferenceError, ServiceError};
pub use generator::ImageGenerator;
pub use openai::{GenerationRequest, GenerationResponse, ImageData};
pub use server::build_router;
pub use triton::{InferenceBackend, TritonClient};
