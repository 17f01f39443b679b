//! Candidate class and parameter names for each host build.
//!
//! Host builds disagree on class identifiers and parameter names. Rather
//! than encoding the differences as nested fallbacks, every candidate list
//! lives here as data, in priority order. A profile can be overridden from
//! the config file.

use serde::{Deserialize, Serialize};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// How to find one well-known node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeLookup {
    /// Human label, also the name given to a created node.
    pub label: String,
    /// Paths tried first, in order.
    pub paths: Vec<String>,
    /// Classes searched among root children (first match wins).
    pub classes: Vec<String>,
    /// Create from `classes[0]` when nothing was found.
    #[serde(default)]
    pub create: bool,
    /// Finally scan root children for this name.
    #[serde(default)]
    pub scan_name: Option<String>,
}

impl NodeLookup {
    fn by_name(label: &str, classes: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            paths: vec![format!("/{}", label), label.to_string()],
            classes: strings(classes),
            create: false,
            scan_name: None,
        }
    }
}

/// Cloud type keywords → class preference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CloudTypeRule {
    pub keywords: Vec<String>,
    pub classes: Vec<String>,
}

/// Candidate parameter names, most likely first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamTables {
    pub texture_filename: Vec<String>,
    pub projection: Vec<String>,
    pub texture_size: Vec<String>,
    pub texture_center: Vec<String>,
    /// Per-axis extents, all written.
    pub texture_axis_size: Vec<String>,
    /// Per-axis repeat counts, all written.
    pub texture_axis_repeat: Vec<String>,
    pub repeat_flags: Vec<String>,
    pub color_input: Vec<String>,
    pub planet_surface: Vec<String>,
    pub atmosphere_input: Vec<String>,
    pub cloud_link: Vec<String>,
    pub cloud_coverage: Vec<String>,
}

impl Default for ParamTables {
    fn default() -> Self {
        Self {
            // US/UK spellings and legacy names
            texture_filename: strings(&[
                "image_filename",
                "filename",
                "texture_filename",
                "file",
                "map_filename",
                "colour_image",
                "color_image",
            ]),
            projection: strings(&["projection", "mapping_mode", "map_projection", "mapping"]),
            texture_size: strings(&["size", "map_size", "tile_size", "scale", "repeat_scale", "texture_size"]),
            texture_center: strings(&["position_center", "center", "map_center", "offset", "origin"]),
            texture_axis_size: strings(&["size_x", "size_y", "size_z"]),
            texture_axis_repeat: strings(&["repeat_x", "repeat_y"]),
            repeat_flags: strings(&["tile", "tiling", "repeat", "wrap", "use_repeat", "repeat_enabled"]),
            color_input: strings(&[
                "color_function_input",
                "color_function",
                "colour_function_input",
                "colour_function",
                "color_input",
                "colour_input",
                "surface_shader_input",
                "shader_input",
                "input_node",
            ]),
            planet_surface: strings(&["surface_shader", "surface_shader_input"]),
            atmosphere_input: strings(&["input_node", "main_input", "atmosphere_input", "shader_input", "cloud_input"]),
            cloud_link: strings(&["input_node", "main_input", "shader_input", "cloud_input", "layer_input"]),
            cloud_coverage: strings(&["cloud_cover", "coverage", "density_multiplier", "cloud_density"]),
        }
    }
}

/// Everything the prober needs to know about one host build.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HostProfile {
    pub name: String,
    pub cloud_classes: Vec<String>,
    pub image_map_classes: Vec<String>,
    pub surface_classes: Vec<String>,
    pub heightfield_load_classes: Vec<String>,
    pub heightfield_shader_classes: Vec<String>,
    pub cloud_type_rules: Vec<CloudTypeRule>,
    pub planet: NodeLookup,
    pub compute_terrain: NodeLookup,
    pub atmosphere: NodeLookup,
    pub sun: NodeLookup,
    #[serde(default)]
    pub params: ParamTables,
}

impl Default for HostProfile {
    /// Ordering that works for most Windows and Linux installs.
    fn default() -> Self {
        let cloud_v1_first = strings(&["cloud_layer", "cloud_layer_v3", "cloud_layer_v2"]);
        Self {
            name: "default".to_string(),
            cloud_classes: cloud_v1_first.clone(),
            image_map_classes: strings(&["image_map_shader", "image_map_shader_v2", "image_map", "image_map_v3"]),
            surface_classes: strings(&["default_shader", "fractal_shader", "surface_layer"]),
            heightfield_load_classes: strings(&["heightfield_load"]),
            heightfield_shader_classes: strings(&["heightfield_shader"]),
            cloud_type_rules: vec![
                CloudTypeRule {
                    keywords: strings(&["cirrus"]),
                    classes: strings(&["cloud_layer_v3", "cloud_layer", "cloud_layer_v2"]),
                },
                CloudTypeRule {
                    keywords: strings(&["cumul", "strato", "alto", "nimbus"]),
                    classes: cloud_v1_first,
                },
            ],
            planet: NodeLookup::by_name("Planet 01", &["planet"]),
            compute_terrain: NodeLookup {
                create: true,
                scan_name: Some("Compute Terrain".to_string()),
                ..NodeLookup::by_name("Compute Terrain", &["compute_terrain"])
            },
            atmosphere: NodeLookup::by_name("Atmosphere 01", &["atmosphere"]),
            sun: NodeLookup::by_name("Sunlight 01", &["sun"]),
            params: ParamTables::default(),
        }
    }
}

impl HostProfile {
    /// macOS builds sometimes expose the v3 cloud and v2 image-map classes first.
    pub fn macos() -> Self {
        Self {
            name: "macos".to_string(),
            cloud_classes: strings(&["cloud_layer_v3", "cloud_layer", "cloud_layer_v2"]),
            image_map_classes: strings(&["image_map_shader_v2", "image_map_shader", "image_map_v3", "image_map"]),
            ..Self::default()
        }
    }

    /// Profile for the platform this binary runs on.
    pub fn detect() -> Self {
        Self::for_os(std::env::consts::OS)
    }

    pub fn for_os(os: &str) -> Self {
        match os {
            "macos" => Self::macos(),
            _ => Self::default(),
        }
    }

    /// Class order for a cloud type such as "Cirrus" or "cumulonimbus".
    pub fn cloud_classes_for(&self, kind: Option<&str>) -> &[String] {
        let Some(kind) = kind.map(str::to_lowercase).filter(|k| !k.is_empty()) else {
            return &self.cloud_classes;
        };
        self.cloud_type_rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| kind.contains(k.as_str())))
            .map(|rule| rule.classes.as_slice())
            .unwrap_or(&self.cloud_classes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_ordering() {
        let mac = HostProfile::for_os("macos");
        assert_eq!(mac.cloud_classes[0], "cloud_layer_v3");
        assert_eq!(mac.image_map_classes[0], "image_map_shader_v2");
        assert_eq!(mac.surface_classes, HostProfile::default().surface_classes);

        let win = HostProfile::for_os("windows");
        assert_eq!(win.cloud_classes[0], "cloud_layer");
        assert_eq!(win.name, "default");
    }

    #[test]
    fn test_cloud_type_rules() {
        let profile = HostProfile::for_os("macos");
        assert_eq!(profile.cloud_classes_for(Some("Cirrus"))[0], "cloud_layer_v3");
        assert_eq!(profile.cloud_classes_for(Some("cumulonimbus"))[0], "cloud_layer");
        assert_eq!(profile.cloud_classes_for(Some("Altostratus"))[0], "cloud_layer");
        // unknown and missing types fall back to the platform order
        assert_eq!(profile.cloud_classes_for(Some("lenticular"))[0], "cloud_layer_v3");
        assert_eq!(profile.cloud_classes_for(None)[0], "cloud_layer_v3");
    }

    #[test]
    fn test_profile_override_from_json() {
        let mut json = serde_json::to_value(HostProfile::default()).unwrap();
        json["params"] = serde_json::json!({"texture_filename": ["img_file"]});
        let profile: HostProfile = serde_json::from_value(json).unwrap();
        assert_eq!(profile.params.texture_filename, vec!["img_file".to_string()]);
        // tables missing from the override keep their defaults
        assert_eq!(profile.params.cloud_link[0], "input_node");
    }

    #[test]
    fn test_compute_terrain_lookup() {
        let ct = HostProfile::default().compute_terrain;
        assert_eq!(ct.paths, vec!["/Compute Terrain".to_string(), "Compute Terrain".to_string()]);
        assert!(ct.create);
        assert_eq!(ct.scan_name.as_deref(), Some("Compute Terrain"));
    }
}
