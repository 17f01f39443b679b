//! Atmosphere and sun settings from a sky analysis.

use serde_json::Value;

use super::{HostError, HostProfile, Node, Prober, TerrainHost};
use crate::analysis::{AtmosphereSpec, SkyAnalysis, SunSpec};

/// Tint keyword → horizon colour. First keyword found in the tint wins.
const TINT_COLOURS: &[(&str, &str)] = &[
    ("golden", "1.0 0.8 0.5"),
    ("orange", "1.0 0.6 0.3"),
    ("blue", "0.6 0.7 1.0"),
    ("gray", "0.8 0.8 0.8"),
    ("grey", "0.8 0.8 0.8"),
    ("clear", "1.0 1.0 1.0"),
    ("neutral", "1.0 1.0 1.0"),
];

const HAZE_DENSITY: &str = "haze_density";
const HORIZON_COLOUR: &str = "haze_horizon_colour";

pub fn tint_colour(tint: &str) -> Option<&'static str> {
    let tint = tint.to_lowercase();
    TINT_COLOURS
        .iter()
        .find(|(keyword, _)| tint.contains(keyword))
        .map(|(_, colour)| *colour)
}

/// Haze density for a visibility in km (clamped to at least 1 km).
pub fn haze_density(visibility_km: f64) -> f64 {
    20.0 / visibility_km.max(1.0)
}

/// Host parameters are strings; arrays become space-separated vectors.
fn param_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => (if *b { "1" } else { "0" }).to_string(),
        Value::Array(items) => items.iter().map(param_value).collect::<Vec<_>>().join(" "),
        other => other.to_string(),
    }
}

fn set_logged(prober: &Prober<'_>, node: &Node, param: &str, value: &str) -> bool {
    match prober.set_and_verify(node, param, value) {
        Ok(_) => true,
        Err(e) => {
            log::warn!("Failed to set {}.{}: {}", node.name, param, e);
            false
        }
    }
}

/// Apply atmosphere settings. Returns a line per applied change.
pub fn apply_atmosphere(host: &dyn TerrainHost, profile: &HostProfile, spec: &AtmosphereSpec) -> Vec<String> {
    let prober = Prober::new(host);
    let Some(atmosphere) = prober.locate(&profile.atmosphere) else {
        log::warn!("Atmosphere node not found, skipping atmosphere settings");
        return Vec::new();
    };
    let mut changes = Vec::new();

    let direct = spec.terragen_params.as_ref();
    for (param, value) in direct.into_iter().flatten() {
        let value = param_value(value);
        if set_logged(&prober, &atmosphere, param, &value) {
            changes.push(format!("Direct set {} = {}", param, value));
        }
    }
    let is_direct = |param: &str| direct.is_some_and(|d| d.contains_key(param));

    if !is_direct(HAZE_DENSITY)
        && let Some(visibility) = spec.visibility_km
    {
        let haze = haze_density(visibility);
        if set_logged(&prober, &atmosphere, HAZE_DENSITY, &haze.to_string()) {
            changes.push(format!("Set haze_density to {:.2} based on {}km visibility", haze, visibility));
        }
    }

    if !is_direct(HORIZON_COLOUR)
        && let Some(tint) = spec.tint.as_deref()
        && let Some(colour) = tint_colour(tint)
        && set_logged(&prober, &atmosphere, HORIZON_COLOUR, colour)
    {
        changes.push(format!("Set haze_horizon_colour to {} based on tint '{}'", colour, tint));
    }

    changes
}

/// Point the sun. Returns a line per applied change.
pub fn apply_sun(host: &dyn TerrainHost, profile: &HostProfile, sun: &SunSpec) -> Vec<String> {
    let prober = Prober::new(host);
    let Some(node) = prober.locate(&profile.sun) else {
        log::warn!("Sunlight node not found");
        return Vec::new();
    };
    let mut changes = Vec::new();
    if let Some(azimuth) = sun.azimuth_deg
        && set_logged(&prober, &node, "heading", &azimuth.to_string())
    {
        changes.push(format!("Sun Heading: {}", azimuth));
    }
    if let Some(elevation) = sun.elevation_deg
        && set_logged(&prober, &node, "elevation", &elevation.to_string())
    {
        changes.push(format!("Sun Elevation: {}", elevation));
    }
    changes
}

/// Apply the atmosphere and sun parts of an analysis.
pub fn setup_lighting(host: &dyn TerrainHost, profile: &HostProfile, analysis: &SkyAnalysis) -> Result<Vec<String>, HostError> {
    // fail fast when the host is unreachable
    host.root()?;
    log::info!("--- Setting up lighting & atmosphere ---");

    let mut report = Vec::new();
    match &analysis.atmosphere {
        Some(spec) => report.extend(apply_atmosphere(host, profile, spec)),
        None => log::info!("No atmosphere data in analysis"),
    }
    match &analysis.sun {
        Some(sun) => report.extend(apply_sun(host, profile, sun)),
        None => log::info!("No sun data in analysis"),
    }

    log::info!("--- Lighting & atmosphere setup complete ---");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;
    use serde_json::json;

    #[test]
    fn test_tint_lookup_order() {
        assert_eq!(tint_colour("Golden hour"), Some("1.0 0.8 0.5"));
        assert_eq!(tint_colour("GREY overcast"), Some("0.8 0.8 0.8"));
        assert_eq!(tint_colour("bluish gray"), Some("0.6 0.7 1.0"));
        assert_eq!(tint_colour("purple"), None);
    }

    #[test]
    fn test_haze_from_visibility() {
        assert_eq!(haze_density(10.0), 2.0);
        assert_eq!(haze_density(0.2), 20.0);
    }

    #[test]
    fn test_atmosphere_heuristics() {
        let host = MemoryHost::default_scene();
        let spec = AtmosphereSpec {
            visibility_km: Some(25.0),
            tint: Some("Orange sunset".into()),
            terragen_params: None,
        };
        let changes = apply_atmosphere(&host, &HostProfile::default(), &spec);
        assert_eq!(changes.len(), 2);
        assert_eq!(host.param("/Atmosphere 01", "haze_density").as_deref(), Some("0.8"));
        assert_eq!(host.param("/Atmosphere 01", "haze_horizon_colour").as_deref(), Some("1.0 0.6 0.3"));
    }

    #[test]
    fn test_direct_params_win() {
        let host = MemoryHost::default_scene();
        let spec = AtmosphereSpec {
            visibility_km: Some(5.0),
            tint: Some("blue".into()),
            terragen_params: json!({"haze_density": 0.25, "haze_horizon_colour": [0.9, 0.9, 1]})
                .as_object()
                .cloned(),
        };
        let changes = apply_atmosphere(&host, &HostProfile::default(), &spec);
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|c| c.starts_with("Direct set")));
        assert_eq!(host.param("/Atmosphere 01", "haze_density").as_deref(), Some("0.25"));
        assert_eq!(host.param("/Atmosphere 01", "haze_horizon_colour").as_deref(), Some("0.9 0.9 1"));
    }

    #[test]
    fn test_setup_lighting_with_sun() {
        let host = MemoryHost::default_scene();
        let analysis = SkyAnalysis {
            sun: Some(SunSpec {
                azimuth_deg: Some(215.0),
                elevation_deg: Some(12.5),
            }),
            ..Default::default()
        };
        let report = setup_lighting(&host, &HostProfile::default(), &analysis).unwrap();
        assert_eq!(report, vec!["Sun Heading: 215".to_string(), "Sun Elevation: 12.5".to_string()]);
        assert_eq!(host.param("/Sunlight 01", "heading").as_deref(), Some("215"));
        assert_eq!(host.param("/Sunlight 01", "elevation").as_deref(), Some("12.5"));
    }

    #[test]
    fn test_missing_nodes_are_skipped() {
        let host = MemoryHost::new();
        let analysis = SkyAnalysis {
            atmosphere: Some(AtmosphereSpec {
                visibility_km: Some(10.0),
                ..Default::default()
            }),
            sun: Some(SunSpec {
                azimuth_deg: Some(90.0),
                elevation_deg: None,
            }),
            ..Default::default()
        };
        let report = setup_lighting(&host, &HostProfile::default(), &analysis).unwrap();
        assert!(report.is_empty());
    }
}
