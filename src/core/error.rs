//! Error types for terrain-ai

use thiserror::Error;

use crate::host::HostError;
use crate::model::ModelError;

/// Main error type; every user-triggered action returns this.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Google API key not found. Set GOOGLE_API_KEY or save one with `set-key`.")]
    MissingApiKey,

    #[error("API key cannot be empty")]
    EmptyApiKey,

    #[error("No valid images loaded")]
    NoImages,

    #[error("{0} already in progress")]
    Busy(String),

    #[error("Nothing to deploy: {0}")]
    NothingToDeploy(String),

    #[error("Select a sky image first")]
    NoSkyImage,

    #[error("Could not parse analysis JSON")]
    UnparsedAnalysis,

    #[error("Sandboxed script failed: {0}")]
    Sandbox(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Model API error: {0}")]
    Model(#[from] ModelError),

    #[error("Terrain host error: {0}")]
    Host(#[from] HostError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
