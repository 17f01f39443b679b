//! Generation against a scripted model.

use image::{Rgb, RgbImage};
use tempfile::TempDir;

use terrain_ai::config::AppConfig;
use terrain_ai::core::Error;
use terrain_ai::generation::{generate_heightfield, latest_generation};
use terrain_ai::session::{DeploySource, Session};
use terrain_ai::testing::ScriptedModel;

fn reference(dir: &TempDir, name: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    RgbImage::from_fn(32, 24, |x, y| Rgb([(x * 8) as u8, (y * 10) as u8, 90])).save(&path).unwrap();
    path
}

fn config(dir: &TempDir) -> AppConfig {
    let mut config = AppConfig {
        output_dir: dir.path().join("output"),
        ..AppConfig::default()
    };
    config.heightmap.size = 64;
    config
}

#[test]
fn test_heightfield_only() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let images = vec![reference(&temp_dir, "a.png"), reference(&temp_dir, "b.jpg")];
    let config = config(&temp_dir);
    let api = ScriptedModel::new(vec![ScriptedModel::image_response(96, 80)]);

    let result = generate_heightfield(&api, &config, &images, false).unwrap();
    assert_eq!(api.calls(), 1);
    assert!(result.texture_path.is_none());

    let names: Vec<String> = std::fs::read_dir(&config.output_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names.len(), 1);
    assert!(names[0].starts_with("heightfield_") && names[0].ends_with(".png"));

    let saved = image::open(&result.heightfield_path).unwrap();
    assert_eq!((saved.width(), saved.height()), (64, 64));

    // the generated result is what a "generated" deploy picks up
    let session = Session {
        last_generation: latest_generation(&config.output_dir).unwrap(),
        ..Session::default()
    };
    let files = session.deploy_files(DeploySource::Generated).unwrap();
    assert_eq!(files.heightfield, result.heightfield_path);
    assert!(files.texture.is_none());
}

#[test]
fn test_unreadable_references() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let bogus = temp_dir.path().join("notes.png");
    std::fs::write(&bogus, "not an image").unwrap();
    let api = ScriptedModel::new(vec![]);

    let err = generate_heightfield(&api, &config(&temp_dir), &[bogus], true).unwrap_err();
    assert!(matches!(err, Error::NoImages));
    assert_eq!(api.calls(), 0);
}
