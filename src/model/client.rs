//! HTTP client for the Generative Language API.

use std::time::Duration;

use reqwest::blocking::Client as HttpClient;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;

use crate::config::AppConfig;
use crate::model::types::{GenerateRequest, GenerateResponse, ModelInfo, ModelList};

/// Model API errors
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Response contained no candidates")]
    NoCandidates,

    #[error("Response contained no image data. Model said: {0}")]
    NoImage(String),

    #[error("Empty response text")]
    EmptyText,
}

impl From<reqwest::Error> for ModelError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ModelError::InvalidResponse(e.to_string())
        } else {
            // without_url: the key travels in the query string
            ModelError::Network(e.without_url().to_string())
        }
    }
}

/// The two calls the rest of the crate needs from a model provider.
pub trait ModelApi: Send + Sync {
    fn generate_content(&self, model: &str, request: &GenerateRequest) -> Result<GenerateResponse, ModelError>;

    fn list_models(&self) -> Result<Vec<ModelInfo>, ModelError>;
}

/// Blocking REST client
pub struct GeminiClient {
    http: HttpClient,
    api_base: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, config: &AppConfig) -> Result<Self, ModelError> {
        let mut builder = HttpClient::builder();
        // No timeout unless configured; image generation can take minutes.
        builder = match config.request_timeout_secs {
            Some(secs) => builder.timeout(Duration::from_secs(secs)),
            None => builder.timeout(None),
        };
        let http = builder.build()?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn check_status(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response, ModelError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(ModelError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

impl ModelApi for GeminiClient {
    fn generate_content(&self, model: &str, request: &GenerateRequest) -> Result<GenerateResponse, ModelError> {
        let endpoint = format!("{}/models/{}:generateContent", self.api_base, model);
        log::debug!("POST {}", endpoint);
        let response = self
            .http
            .post(endpoint)
            .query(&[("key", self.api_key.as_str())])
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()?;
        let response = Self::check_status(response)?;
        let text = response.text()?;
        serde_json::from_str(&text).map_err(|e| ModelError::InvalidResponse(e.to_string()))
    }

    fn list_models(&self) -> Result<Vec<ModelInfo>, ModelError> {
        let endpoint = format!("{}/models", self.api_base);
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self.http.get(&endpoint).query(&[("key", self.api_key.as_str())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let response = Self::check_status(request.send()?)?;
            let page: ModelList = response.json()?;
            models.extend(page.models);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(models)
    }
}
