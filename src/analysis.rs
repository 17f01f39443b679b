//! Sky and terrain analysis via the text/vision model.
//!
//! Model output is untrusted: anything that does not parse falls back to the
//! raw text instead of failing the action.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::core::{Error, Result};
use crate::imaging::{image_to_payload, load_payloads};
use crate::model::{GenerateRequest, ModelApi, ModelError, extract_code_block, extract_json, prompts};

/// Parsed sky analysis. Every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SkyAnalysis {
    #[serde(default, deserialize_with = "opt_string")]
    pub description: Option<String>,
    #[serde(default)]
    pub atmosphere: Option<AtmosphereSpec>,
    #[serde(default, deserialize_with = "vec_or_null")]
    pub cloud_layers: Vec<CloudLayerSpec>,
    #[serde(default)]
    pub sun: Option<SunSpec>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AtmosphereSpec {
    #[serde(default, deserialize_with = "opt_f64")]
    pub visibility_km: Option<f64>,
    #[serde(default, deserialize_with = "opt_string")]
    pub tint: Option<String>,
    /// Raw host parameters applied verbatim, in key order.
    #[serde(default)]
    pub terragen_params: Option<Map<String, Value>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CloudLayerSpec {
    #[serde(rename = "type", default, deserialize_with = "opt_string")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "opt_f64")]
    pub base_alt_km: Option<f64>,
    #[serde(default, deserialize_with = "opt_f64")]
    pub top_alt_km: Option<f64>,
    #[serde(default, deserialize_with = "opt_f64")]
    pub thickness_m: Option<f64>,
    #[serde(default, deserialize_with = "opt_f64")]
    pub coverage_pct: Option<f64>,
    #[serde(default, deserialize_with = "opt_string")]
    pub density: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub softness: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SunSpec {
    #[serde(default, deserialize_with = "opt_f64")]
    pub azimuth_deg: Option<f64>,
    #[serde(default, deserialize_with = "opt_f64")]
    pub elevation_deg: Option<f64>,
}

/// Numbers may arrive as JSON numbers or numeric strings ("2.5", "40%").
fn opt_f64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<f64>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    })
}

fn opt_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn vec_or_null<'de, D, T>(d: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(d)?.unwrap_or_default())
}

/// Outcome of a sky analysis call.
#[derive(Clone, Debug)]
pub struct SkyReport {
    pub raw_text: String,
    /// Whatever JSON could be extracted
    pub json: Option<Value>,
    /// Typed view of `json`, if it had the expected shape
    pub analysis: Option<SkyAnalysis>,
}

impl SkyReport {
    pub fn from_text(raw_text: String) -> Self {
        let json = extract_json(&raw_text);
        let analysis = json.as_ref().and_then(|v| parse_sky_value(v.clone()));
        Self {
            raw_text,
            json,
            analysis,
        }
    }
}

/// Accepts an object, or a list whose first entry is an object.
pub fn parse_sky_value(value: Value) -> Option<SkyAnalysis> {
    let value = match value {
        Value::Array(items) => items.into_iter().find(Value::is_object)?,
        v @ Value::Object(_) => v,
        other => {
            log::warn!("Unexpected analysis type: {}", other);
            return None;
        }
    };
    match serde_json::from_value(value) {
        Ok(a) => Some(a),
        Err(e) => {
            log::warn!("Analysis JSON has an unexpected shape: {}", e);
            None
        }
    }
}

/// Load a previously saved analysis file.
pub fn load_sky_analysis(path: &Path) -> Result<SkyAnalysis> {
    let text = std::fs::read_to_string(path)?;
    extract_json(&text)
        .and_then(parse_sky_value)
        .ok_or(Error::UnparsedAnalysis)
}

/// Send one request and return the response text. No candidates and blank
/// text are both errors.
pub fn request_text(api: &dyn ModelApi, model: &str, request: &GenerateRequest) -> std::result::Result<String, ModelError> {
    let response = api.generate_content(model, request)?;
    if response.candidates.is_empty() {
        return Err(ModelError::NoCandidates);
    }
    let text = response.text();
    if text.trim().is_empty() {
        return Err(ModelError::EmptyText);
    }
    Ok(text)
}

/// Analyze one sky/cloud photograph.
pub fn analyze_sky(api: &dyn ModelApi, model: &str, image: &Path) -> Result<SkyReport> {
    log::info!("Analyzing atmosphere and clouds in {}", image.display());
    let payload = image_to_payload(image)?;
    let request = GenerateRequest::with_images(&[payload], prompts::SKY_ANALYSIS);
    let text = request_text(api, model, &request)?;

    let report = SkyReport::from_text(text);
    match &report.analysis {
        Some(a) => log::info!(
            "Atmosphere analysis parsed: {} cloud layer(s), sun {}",
            a.cloud_layers.len(),
            if a.sun.is_some() { "present" } else { "absent" }
        ),
        None => log::info!("Atmosphere analysis complete (raw text)"),
    }
    Ok(report)
}

/// Terrain analysis result. Falls back to the raw text as the description.
#[derive(Clone, Debug, Default)]
pub struct TerrainAnalysis {
    pub atmosphere: Option<Value>,
    pub description: Option<String>,
    pub python_code: Option<String>,
    pub raw_text: String,
    /// True when the structured JSON answer was parsed
    pub parsed: bool,
}

impl TerrainAnalysis {
    pub fn from_text(raw_text: String) -> Self {
        if let Some(Value::Object(map)) = extract_json(&raw_text) {
            log::info!("Data parsed successfully");
            let text_field = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);
            return Self {
                atmosphere: map.get("atmosphere").cloned(),
                description: text_field("terrain_description"),
                python_code: text_field("python_code"),
                raw_text,
                parsed: true,
            };
        }
        log::info!("Returning raw text response");
        Self {
            atmosphere: None,
            description: Some(raw_text.clone()),
            python_code: extract_code_block(&raw_text),
            raw_text,
            parsed: false,
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "atmosphere": self.atmosphere,
            "terrain_description": self.description,
            "python_code": self.python_code,
            "raw_text": self.raw_text,
        })
    }
}

/// Analyze reference photos of terrain.
pub fn analyze_terrain<P: AsRef<Path>>(api: &dyn ModelApi, model: &str, images: &[P]) -> Result<TerrainAnalysis> {
    log::info!("Loading images...");
    let payloads = load_payloads(images);
    if payloads.is_empty() {
        return Err(Error::NoImages);
    }
    log::info!("Loaded {} images. Preparing API request...", payloads.len());
    crate::core::logging::log_block(log::Level::Debug, "Prompt sent to API", prompts::TERRAIN_ANALYSIS);

    let request = GenerateRequest::with_images(&payloads, prompts::TERRAIN_ANALYSIS);
    log::info!("Sending request to {} (this may take a minute)...", model);
    let text = request_text(api, model, &request)?;
    log::info!("Response received. Parsing data...");
    Ok(TerrainAnalysis::from_text(text))
}
