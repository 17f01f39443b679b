//! Push a heightfield (and optional texture) into the host's node graph.
//!
//! Wiring after a deploy with a texture:
//!
//! ```text
//! Planet.surface_shader -> Manual_Surface
//!   Manual_Surface.<colour input> -> AI_Texture_Image
//!   Manual_Surface.input_node -> Compute Terrain
//!     Compute Terrain.input_node -> Manual_HF_Shader
//!       Manual_HF_Shader.heightfield -> Manual_HF_Load
//!       Manual_HF_Shader.input_node -> <previous terrain source>
//! ```
//!
//! Without a texture the planet's surface shader is the compute terrain.
//! Re-running a deploy reuses the named nodes and leaves existing links alone.

use std::path::Path;

use super::probe::values_match;
use super::{Acceptance, HostError, HostProfile, Node, ProbeOutcome, Prober, TerrainHost};

pub const HF_LOAD_NAME: &str = "Manual_HF_Load";
pub const HF_SHADER_NAME: &str = "Manual_HF_Shader";
pub const SURFACE_NAME: &str = "Manual_Surface";
pub const TEXTURE_NAME: &str = "AI_Texture_Image";

/// Planar projection straight down onto the heightfield.
const TEXTURE_PROJECTION: &str = "Plan Y";
/// The heightfield load spans roughly 10 km.
const TEXTURE_EXTENT: &str = "10000 10000 10000";
const TEXTURE_AXIS_EXTENT: &str = "10000";
const TEXTURE_AXIS_REPEAT: &str = "1";
const TEXTURE_CENTER: &str = "0 0 0";
const REPEAT_OFF: &str = "0";

const INPUT_NODE: &str = "input_node";

/// Texture half of a deploy.
#[derive(Clone, Debug)]
pub struct TextureWiring {
    pub surface: Node,
    pub image_map: Node,
    pub filename: ProbeOutcome,
    pub color_input: ProbeOutcome,
}

/// What a deploy touched.
#[derive(Clone, Debug)]
pub struct DeployReport {
    pub planet: Node,
    pub compute_terrain: Node,
    pub heightfield_load: Node,
    pub heightfield_shader: Node,
    /// Previous compute terrain input now feeding the heightfield shader.
    pub chained_input: Option<String>,
    pub texture: Option<TextureWiring>,
    pub planet_surface: ProbeOutcome,
}

impl DeployReport {
    pub fn summary(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Heightfield loaded by {}", self.heightfield_load.path),
            format!("{} -> {}", self.compute_terrain.path, self.heightfield_shader.path),
        ];
        if let Some(old) = &self.chained_input {
            lines.push(format!("{} -> {}", self.heightfield_shader.path, old));
        }
        if let Some(tex) = &self.texture {
            lines.push(format!(
                "Texture file via {}: {}",
                tex.filename.param.as_deref().unwrap_or("none"),
                tex.filename.readback.as_deref().unwrap_or("empty")
            ));
            lines.push(format!(
                "{}.{} -> {}",
                tex.surface.path,
                tex.color_input.param.as_deref().unwrap_or("none"),
                tex.color_input.readback.as_deref().unwrap_or("empty")
            ));
        }
        lines.push(format!(
            "{}.{} = {}",
            self.planet.path,
            self.planet_surface.param.as_deref().unwrap_or("surface_shader"),
            self.planet_surface.readback.as_deref().unwrap_or("unchanged")
        ));
        lines
    }
}

fn host_path(path: &Path) -> String {
    // the host resolves relative paths against its own working directory
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

/// Deploy `heightfield` (and `texture`, when given) into the host.
pub fn deploy(
    host: &dyn TerrainHost,
    profile: &HostProfile,
    heightfield: &Path,
    texture: Option<&Path>,
) -> Result<DeployReport, HostError> {
    let prober = Prober::new(host);
    let file_name = |p: &Path| p.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    log::info!(
        "--- Deploying to terrain host (HF: {}, Tex: {}) ---",
        file_name(heightfield),
        texture.map(file_name).unwrap_or_else(|| "None".to_string())
    );

    let planet = prober.require(&profile.planet)?;
    let compute_terrain = prober.require(&profile.compute_terrain)?;

    let (heightfield_load, _) = prober.find_or_create(HF_LOAD_NAME, &profile.heightfield_load_classes)?;
    prober.set_and_verify(&heightfield_load, "filename", &host_path(heightfield))?;

    let (heightfield_shader, _) = prober.find_or_create(HF_SHADER_NAME, &profile.heightfield_shader_classes)?;
    prober.set_and_verify(&heightfield_shader, "heightfield", &heightfield_load.path)?;

    let current_input = prober.read(&compute_terrain, INPUT_NODE).unwrap_or_default();
    let mut chained_input = None;
    if values_match(&current_input, &heightfield_shader.path) {
        log::info!("Compute Terrain already connected to HF Shader");
    } else {
        if !current_input.trim().is_empty() {
            prober.set_and_verify(&heightfield_shader, INPUT_NODE, &current_input)?;
            log::info!("Chained HF Shader -> old terrain source ({})", current_input);
            chained_input = Some(current_input);
        }
        prober.set_and_verify(&compute_terrain, INPUT_NODE, &heightfield_shader.path)?;
        log::info!("Connected Compute Terrain -> HF Shader");
    }

    let (texture, surface_target) = match texture {
        Some(texture) => {
            let wiring = wire_texture(&prober, profile, &planet, &compute_terrain, texture)?;
            let target = wiring.surface.path.clone();
            (Some(wiring), target)
        }
        None => (None, compute_terrain.path.clone()),
    };

    let planet_surface = prober.probe_set(&planet, &profile.params.planet_surface, &surface_target, Acceptance::Matching);
    if planet_surface.succeeded() {
        log::info!("Connected planet surface -> {}", surface_target);
    } else {
        log::warn!("Planet surface input was not updated; connect {} manually", surface_target);
    }

    log::info!("--- Deploy complete ---");
    Ok(DeployReport {
        planet,
        compute_terrain,
        heightfield_load,
        heightfield_shader,
        chained_input,
        texture,
        planet_surface,
    })
}

fn wire_texture(
    prober: &Prober<'_>,
    profile: &HostProfile,
    planet: &Node,
    compute_terrain: &Node,
    texture: &Path,
) -> Result<TextureWiring, HostError> {
    let params = &profile.params;

    let (surface, _) = prober.find_or_create(SURFACE_NAME, &profile.surface_classes)?;
    prober.set_and_verify(&surface, INPUT_NODE, &compute_terrain.path)?;

    let (image_map, _) = prober.find_or_create(TEXTURE_NAME, &profile.image_map_classes)?;
    let filename = prober.probe_set(&image_map, &params.texture_filename, &host_path(texture), Acceptance::Matching);
    log::info!(
        "Texture file set result -> param: {}, readback: {}",
        filename.param.as_deref().unwrap_or("none"),
        filename.readback.as_deref().unwrap_or("empty")
    );

    prober.probe_set(&image_map, &params.projection, TEXTURE_PROJECTION, Acceptance::Matching);
    prober.probe_set(&image_map, &params.texture_size, TEXTURE_EXTENT, Acceptance::Matching);
    for axis in &params.texture_axis_size {
        prober.probe_set(&image_map, std::slice::from_ref(axis), TEXTURE_AXIS_EXTENT, Acceptance::Matching);
    }
    for axis in &params.texture_axis_repeat {
        prober.probe_set(&image_map, std::slice::from_ref(axis), TEXTURE_AXIS_REPEAT, Acceptance::Matching);
    }
    prober.probe_set(&image_map, &params.texture_center, TEXTURE_CENTER, Acceptance::Matching);
    prober.probe_set(&image_map, &params.repeat_flags, REPEAT_OFF, Acceptance::Matching);

    let color_input = prober.probe_set(&surface, &params.color_input, &image_map.path, Acceptance::Matching);
    log::info!(
        "Texture wiring result -> param: {}, readback: {}",
        color_input.param.as_deref().unwrap_or("none"),
        color_input.readback.as_deref().unwrap_or("empty")
    );

    let post = prober.probe_get(&surface, &params.color_input);
    log::info!("Post-check surface colour input: {}", if post.succeeded() { post.value() } else { "empty" });
    let post = prober.probe_get(planet, &params.planet_surface);
    log::info!(
        "Post-check planet surface input ({}) = {}",
        post.param.as_deref().unwrap_or("n/a"),
        if post.succeeded() { post.value() } else { "empty" }
    );
    let post = prober.probe_get(compute_terrain, &[INPUT_NODE]);
    log::info!("Post-check compute terrain input = {}", if post.succeeded() { post.value() } else { "empty" });

    prober.dump_params(&image_map, TEXTURE_NAME);
    prober.dump_params(&surface, SURFACE_NAME);
    prober.dump_params(planet, "Planet");

    Ok(TextureWiring {
        surface,
        image_map,
        filename,
        color_input,
    })
}
