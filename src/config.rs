//! Application configuration.
//!
//! Loaded from an optional JSON file (default `terrain-ai.json` in the working
//! directory). Missing fields fall back to [`AppConfig::default`]; a few
//! environment variables override the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::host::HostProfile;

/// Default config file name
pub const CONFIG_FILENAME: &str = "terrain-ai.json";

/// Overrides the host bridge address
pub const HOST_ENV: &str = "TERRAIN_AI_HOST";
/// Overrides the output directory
pub const OUTPUT_ENV: &str = "TERRAIN_AI_OUTPUT";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where generated rasters and saved analyses land.
    pub output_dir: PathBuf,
    /// Env file holding the `GOOGLE_API_KEY=` credential line.
    pub env_file: PathBuf,
    /// Generative Language REST base URL.
    pub api_base: String,
    /// Model used for text/vision analysis.
    pub text_model: String,
    /// Model used for image generation.
    pub image_model: String,
    /// Network timeout for model calls. `None` waits indefinitely.
    pub request_timeout_secs: Option<u64>,
    /// Post-processing settings for generated rasters.
    pub heightmap: HeightmapConfig,
    /// Host bridge address (`host:port`).
    pub host_addr: String,
    /// Interpreter used by the script sandbox.
    pub script_interpreter: String,
    /// Interpreter flags placed before the script path.
    pub script_args: Vec<String>,
    /// Candidate class/parameter tables. `None` = detect from the platform.
    pub host_profile: Option<HostProfile>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            env_file: PathBuf::from(".env"),
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            text_model: "gemini-1.5-pro".to_string(),
            image_model: "gemini-3-pro-image-preview".to_string(),
            request_timeout_secs: None,
            heightmap: HeightmapConfig::default(),
            host_addr: format!("127.0.0.1:{}", terragen_rpc::DEFAULT_PORT),
            script_interpreter: "python3".to_string(),
            script_args: vec!["-I".to_string()],
            host_profile: None,
        }
    }
}

/// Raster post-processing settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightmapConfig {
    /// Output edge length in pixels (outputs are square).
    pub size: u32,
    /// Gaussian blur sigma applied to heightmaps. 0 disables.
    pub blur_sigma: f32,
    /// Stretch heightmap values to the full 0-255 range.
    pub normalize: bool,
}

impl Default for HeightmapConfig {
    fn default() -> Self {
        Self {
            size: 1024,
            blur_sigma: 1.0,
            normalize: true,
        }
    }
}

impl AppConfig {
    /// Load from `path`, or from [`CONFIG_FILENAME`] when it exists, then
    /// apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load_file(p)?,
            None if Path::new(CONFIG_FILENAME).exists() => Self::load_file(Path::new(CONFIG_FILENAME))?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    fn load_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        let config = serde_json::from_str(&json)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(addr) = std::env::var(HOST_ENV) {
            if !addr.trim().is_empty() {
                self.host_addr = addr.trim().to_string();
            }
        }
        if let Ok(dir) = std::env::var(OUTPUT_ENV) {
            if !dir.trim().is_empty() {
                self.output_dir = PathBuf::from(dir.trim());
            }
        }
    }

    /// Profile from config, or the platform default.
    pub fn host_profile(&self) -> HostProfile {
        self.host_profile.clone().unwrap_or_else(HostProfile::detect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("cfg.json");
        std::fs::write(&path, r#"{"output_dir": "renders", "heightmap": {"size": 512}}"#).unwrap();

        let config = AppConfig::load_file(&path).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("renders"));
        assert_eq!(config.heightmap.size, 512);
        assert!(config.heightmap.normalize);
        assert_eq!(config.image_model, "gemini-3-pro-image-preview");
        assert!(config.host_profile.is_none());
    }

    #[test]
    fn test_bad_file_is_config_error() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("cfg.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(AppConfig::load_file(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_default_host_addr() {
        assert!(AppConfig::default().host_addr.ends_with(":36492"));
    }
}
