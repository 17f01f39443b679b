//! Heightfield (and optional texture) generation from reference photos.

use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Local;
use image::DynamicImage;

use crate::config::AppConfig;
use crate::core::{Error, Result};
use crate::imaging::{self, ImagePayload, OutputKind, load_payloads, output_path, process_heightmap, process_texture};
use crate::model::{GenerateRequest, ModelApi, ModelError, prompts};

/// Files written by one generation run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GenerationResult {
    pub heightfield_path: PathBuf,
    pub texture_path: Option<PathBuf>,
}

/// Request one image from the image model and decode it.
pub fn request_image(
    api: &dyn ModelApi,
    model: &str,
    images: &[ImagePayload],
    prompt: &str,
) -> Result<DynamicImage> {
    let request = GenerateRequest::with_images(images, prompt).wants_image();
    let response = api.generate_content(model, &request)?;
    if response.candidates.is_empty() {
        return Err(ModelError::NoCandidates.into());
    }
    let Some(inline) = response.first_image() else {
        let text = response.text();
        let snippet: String = text.chars().take(200).collect();
        return Err(ModelError::NoImage(snippet).into());
    };
    let bytes = BASE64
        .decode(inline.data.trim())
        .map_err(|e| ModelError::InvalidResponse(format!("image data is not base64: {}", e)))?;
    Ok(image::load_from_memory(&bytes)?)
}

/// Generate a heightfield PNG, plus a texture PNG when `with_texture`.
/// Both files share one timestamp.
pub fn generate_heightfield<P: AsRef<Path>>(
    api: &dyn ModelApi,
    config: &AppConfig,
    images: &[P],
    with_texture: bool,
) -> Result<GenerationResult> {
    log::info!("Starting generation using {} reference image(s)...", images.len());
    let payloads = load_payloads(images);
    if payloads.is_empty() {
        return Err(Error::NoImages);
    }

    let stamp = imaging::timestamp(Local::now());
    let out_dir = &config.output_dir;

    log::info!("Requesting heightmap from {}...", config.image_model);
    let raw = request_image(api, &config.image_model, &payloads, prompts::HEIGHTMAP)?;
    log::info!("Heightmap received ({}x{}), post-processing", raw.width(), raw.height());
    let heightmap = process_heightmap(&raw, &config.heightmap);
    let heightfield_path = imaging::save_heightmap(out_dir, &stamp, &heightmap)?;

    let texture_path = if with_texture {
        log::info!("Requesting texture from {}...", config.image_model);
        let raw = request_image(api, &config.image_model, &payloads, prompts::TEXTURE)?;
        let texture = process_texture(&raw, config.heightmap.size);
        Some(imaging::save_texture(out_dir, &stamp, &texture)?)
    } else {
        None
    };

    log::info!("Generation completed successfully");
    Ok(GenerationResult {
        heightfield_path,
        texture_path,
    })
}

/// Most recent generation in `dir`, judged by the timestamp in the file name.
/// The texture is included when one shares the heightfield's timestamp.
pub fn latest_generation(dir: &Path) -> Result<Option<GenerationResult>> {
    if !dir.is_dir() {
        return Ok(None);
    }
    let mut latest: Option<String> = None;
    for entry in std::fs::read_dir(dir)? {
        let name = entry?.file_name().to_string_lossy().into_owned();
        let Some(stamp) = name.strip_prefix("heightfield_").and_then(|s| s.strip_suffix(".png")) else {
            continue;
        };
        if latest.as_deref().is_none_or(|best| stamp > best) {
            latest = Some(stamp.to_string());
        }
    }
    Ok(latest.map(|stamp| {
        let texture = output_path(dir, OutputKind::Texture, &stamp);
        GenerationResult {
            heightfield_path: output_path(dir, OutputKind::Heightfield, &stamp),
            texture_path: texture.is_file().then_some(texture),
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::GenerateResponse;
    use crate::testing::ScriptedModel;
    use image::{GrayImage, Luma};
    use tempfile::TempDir;

    fn config_in(dir: &Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.output_dir = dir.join("out");
        config.heightmap.size = 32;
        config
    }

    fn write_reference(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        GrayImage::from_fn(20, 20, |x, y| Luma([(x * 10 + y) as u8])).save(&path).unwrap();
        path
    }

    #[test]
    fn test_zero_candidates_is_error() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let config = config_in(temp_dir.path());
        let reference = write_reference(temp_dir.path(), "a.png");
        let api = ScriptedModel::new(vec![GenerateResponse::default()]);

        let err = generate_heightfield(&api, &config, &[reference], false).unwrap_err();
        assert!(matches!(err, Error::Model(ModelError::NoCandidates)));
        assert!(!config.output_dir.exists());
    }

    #[test]
    fn test_text_only_answer_is_error() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let config = config_in(temp_dir.path());
        let reference = write_reference(temp_dir.path(), "a.png");
        let api = ScriptedModel::new(vec![ScriptedModel::text_response("I can't draw that")]);

        let err = generate_heightfield(&api, &config, &[reference], false).unwrap_err();
        assert!(matches!(err, Error::Model(ModelError::NoImage(ref t)) if t.contains("can't draw")));
    }

    #[test]
    fn test_no_readable_images() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let config = config_in(temp_dir.path());
        let api = ScriptedModel::new(vec![]);
        let err = generate_heightfield(&api, &config, &[temp_dir.path().join("missing.png")], true).unwrap_err();
        assert!(matches!(err, Error::NoImages));
        assert_eq!(api.calls(), 0);
    }

    #[test]
    fn test_with_texture_writes_both() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let config = config_in(temp_dir.path());
        let reference = write_reference(temp_dir.path(), "a.png");
        let api = ScriptedModel::new(vec![
            ScriptedModel::image_response(64, 48),
            ScriptedModel::image_response(40, 40),
        ]);

        let result = generate_heightfield(&api, &config, &[reference], true).unwrap();
        let texture = result.texture_path.clone().expect("texture written");
        assert!(result.heightfield_path.exists());
        assert!(texture.exists());
        assert_eq!(image::open(&texture).unwrap().width(), 32);
        assert_eq!(api.calls(), 2);
        assert_eq!(latest_generation(&config.output_dir).unwrap(), Some(result));
    }

    #[test]
    fn test_latest_generation_picks_newest_stamp() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let dir = temp_dir.path();
        assert_eq!(latest_generation(&dir.join("missing")).unwrap(), None);
        for name in [
            "heightfield_20240101_120000.png",
            "texture_20240101_120000.png",
            "heightfield_20240102_080000.png",
            "notes.txt",
        ] {
            std::fs::write(dir.join(name), b"x").unwrap();
        }
        let latest = latest_generation(dir).unwrap().unwrap();
        assert_eq!(latest.heightfield_path, dir.join("heightfield_20240102_080000.png"));
        assert!(latest.texture_path.is_none());
    }
}
