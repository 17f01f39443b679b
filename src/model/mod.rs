//! Generative model API: wire types, HTTP client, prompts and text extraction

pub mod client;
pub mod extract;
pub mod prompts;
pub mod types;

pub use client::{GeminiClient, ModelApi, ModelError};
pub use extract::{extract_code_block, extract_json, extract_json_object, strip_code_fence};
pub use types::{GenerateRequest, GenerateResponse, InlineData, ModelInfo};
