//! Timestamped output files.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use image::{GrayImage, RgbImage};

use crate::core::Result;

/// Kind of generated file; decides the filename prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputKind {
    Heightfield,
    Texture,
    SkyAnalysis,
    TerrainAnalysis,
}

impl OutputKind {
    fn prefix(self) -> &'static str {
        match self {
            Self::Heightfield => "heightfield",
            Self::Texture => "texture",
            Self::SkyAnalysis => "sky_analysis",
            Self::TerrainAnalysis => "terrain_analysis",
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::Heightfield | Self::Texture => "png",
            Self::SkyAnalysis | Self::TerrainAnalysis => "json",
        }
    }
}

/// `YYYYmmdd_HHMMSS`, shared by every file written in one action.
pub fn timestamp(at: DateTime<Local>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

pub fn output_path(dir: &Path, kind: OutputKind, stamp: &str) -> PathBuf {
    dir.join(format!("{}_{}.{}", kind.prefix(), stamp, kind.extension()))
}

pub fn save_heightmap(dir: &Path, stamp: &str, img: &GrayImage) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = output_path(dir, OutputKind::Heightfield, stamp);
    img.save(&path)?;
    log::info!("Saved heightfield: {}", path.display());
    Ok(path)
}

pub fn save_texture(dir: &Path, stamp: &str, img: &RgbImage) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = output_path(dir, OutputKind::Texture, stamp);
    img.save(&path)?;
    log::info!("Saved texture: {}", path.display());
    Ok(path)
}

pub fn save_json(dir: &Path, kind: OutputKind, stamp: &str, value: &serde_json::Value) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = output_path(dir, kind, stamp);
    std::fs::write(&path, serde_json::to_string_pretty(value)?)?;
    log::info!("Saved {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use image::Luma;
    use tempfile::TempDir;

    #[test]
    fn test_names_are_deterministic() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let stamp = timestamp(at);
        assert_eq!(stamp, "20240309_070501");
        assert_eq!(
            output_path(Path::new("out"), OutputKind::Texture, &stamp),
            Path::new("out").join("texture_20240309_070501.png")
        );
        assert_eq!(
            output_path(Path::new("out"), OutputKind::SkyAnalysis, &stamp),
            Path::new("out").join("sky_analysis_20240309_070501.json")
        );
    }

    #[test]
    fn test_save_creates_directory() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let dir = temp_dir.path().join("nested/out");
        let path = save_heightmap(&dir, "20240101_000000", &GrayImage::from_pixel(2, 2, Luma([9]))).unwrap();
        assert!(path.exists());
        assert_eq!(image::open(&path).unwrap().width(), 2);
    }
}
