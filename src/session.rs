//! Per-session state shared by the actions.

use std::path::PathBuf;

use crate::analysis::{self, SkyAnalysis, SkyReport};
use crate::core::{Error, Result};
use crate::generation::GenerationResult;
use crate::model::ModelApi;

/// Where a deploy takes its files from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum DeploySource {
    /// Explicitly chosen heightfield/texture files.
    Manual,
    /// The last generation result.
    Generated,
    /// The reference images: first is the heightfield, second the texture.
    Uploaded,
}

/// Files a deploy will push.
#[derive(Clone, Debug, PartialEq)]
pub struct DeployFiles {
    pub heightfield: PathBuf,
    pub texture: Option<PathBuf>,
}

/// Selected inputs and cached results.
#[derive(Clone, Debug, Default)]
pub struct Session {
    pub reference_images: Vec<PathBuf>,
    pub manual_heightfield: Option<PathBuf>,
    pub manual_texture: Option<PathBuf>,
    pub last_generation: Option<GenerationResult>,
    pub sky_image: Option<PathBuf>,
    pub sky_analysis: Option<SkyAnalysis>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick deploy files for `source`. A missing heightfield is an error.
    pub fn deploy_files(&self, source: DeploySource) -> Result<DeployFiles> {
        let (heightfield, texture) = match source {
            DeploySource::Manual => (self.manual_heightfield.clone(), self.manual_texture.clone()),
            DeploySource::Generated => match &self.last_generation {
                Some(result) => (Some(result.heightfield_path.clone()), result.texture_path.clone()),
                None => (None, None),
            },
            DeploySource::Uploaded => (
                self.reference_images.first().cloned(),
                self.reference_images.get(1).cloned(),
            ),
        };
        let heightfield = heightfield
            .ok_or_else(|| Error::NothingToDeploy(format!("no heightfield selected or available ({:?})", source)))?;
        Ok(DeployFiles { heightfield, texture })
    }

    /// Keep a sky report; only a parsed analysis is cached.
    pub fn record_sky_report(&mut self, report: &SkyReport) {
        if let Some(parsed) = &report.analysis {
            self.sky_analysis = Some(parsed.clone());
        }
    }

    /// The cached sky analysis, or a fresh one for the selected sky image.
    pub fn sky_analysis_or_analyze(&mut self, api: &dyn ModelApi, model: &str) -> Result<&SkyAnalysis> {
        if self.sky_analysis.is_none() {
            let image = self.sky_image.as_deref().ok_or(Error::NoSkyImage)?;
            log::info!("No cached analysis found, calling API...");
            let report = analysis::analyze_sky(api, model, image)?;
            self.record_sky_report(&report);
        }
        self.sky_analysis.as_ref().ok_or(Error::UnparsedAnalysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedModel;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    #[test]
    fn test_deploy_sources() {
        let mut session = Session::new();
        assert!(matches!(
            session.deploy_files(DeploySource::Manual),
            Err(Error::NothingToDeploy(_))
        ));

        session.reference_images = vec!["a.png".into(), "b.png".into(), "c.png".into()];
        let files = session.deploy_files(DeploySource::Uploaded).unwrap();
        assert_eq!(files.heightfield, PathBuf::from("a.png"));
        assert_eq!(files.texture, Some(PathBuf::from("b.png")));

        session.reference_images.truncate(1);
        assert_eq!(session.deploy_files(DeploySource::Uploaded).unwrap().texture, None);

        assert!(session.deploy_files(DeploySource::Generated).is_err());
        session.last_generation = Some(GenerationResult {
            heightfield_path: "out/heightfield_x.png".into(),
            texture_path: None,
        });
        assert_eq!(
            session.deploy_files(DeploySource::Generated).unwrap().heightfield,
            PathBuf::from("out/heightfield_x.png")
        );

        // a texture alone is not deployable
        session.manual_texture = Some("t.png".into());
        assert!(session.deploy_files(DeploySource::Manual).is_err());
    }

    #[test]
    fn test_sky_analysis_requires_image() {
        let mut session = Session::new();
        let api = ScriptedModel::new(vec![]);
        assert!(matches!(session.sky_analysis_or_analyze(&api, "m"), Err(Error::NoSkyImage)));
    }

    #[test]
    fn test_sky_analysis_is_cached() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let sky = temp_dir.path().join("sky.png");
        RgbImage::from_pixel(8, 8, Rgb([120, 160, 220])).save(&sky).unwrap();

        let api = ScriptedModel::new(vec![ScriptedModel::text_response(
            r#"```json
{"description": "clear", "sun": {"azimuth_deg": 180, "elevation_deg": 40}}
```"#,
        )]);
        let mut session = Session {
            sky_image: Some(sky),
            ..Session::default()
        };
        let first = session.sky_analysis_or_analyze(&api, "m").unwrap().clone();
        assert_eq!(first.description.as_deref(), Some("clear"));
        let second = session.sky_analysis_or_analyze(&api, "m").unwrap();
        assert_eq!(second, &first);
        assert_eq!(api.calls(), 1);
    }

    #[test]
    fn test_unparsed_sky_answer() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let sky = temp_dir.path().join("sky.png");
        RgbImage::from_pixel(8, 8, Rgb([90, 90, 90])).save(&sky).unwrap();

        let api = ScriptedModel::new(vec![ScriptedModel::text_response("Looks cloudy to me.")]);
        let mut session = Session {
            sky_image: Some(sky),
            ..Session::default()
        };
        assert!(matches!(
            session.sky_analysis_or_analyze(&api, "m"),
            Err(Error::UnparsedAnalysis)
        ));
        assert!(session.sky_analysis.is_none());
    }
}
