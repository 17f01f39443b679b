//! Prompt text sent with reference images.

/// Multi-image terrain analysis returning settings, a description and a
/// heightmap script.
pub const TERRAIN_ANALYSIS: &str = r#"Analyze these reference images of terrain. I need configuration data for a 3D terrain application.

1. Atmosphere settings: a JSON object with sun position (azimuth, elevation), cloud coverage (0-1), fog density, sky color (RGB) and ambient light intensity.
2. Terrain analysis: describe the terrain features in detail (mountains, valleys, plains, roughness).
3. Height map generation: write a self-contained Python function using numpy and PIL that generates a 1024x1024 grayscale heightmap matching the terrain in the images, and a main block that saves it to the path given as the first command line argument.

Answer in exactly this format:
```json
{
    "atmosphere": { ... },
    "terrain_description": "...",
    "python_code": "..."
}
```"#;

/// Single sky photo → atmosphere, cloud layers and sun.
pub const SKY_ANALYSIS: &str = r#"Analyze this photograph of the sky and clouds for recreation in a 3D terrain renderer.

Return only a JSON object with this structure:
{
  "description": "short summary of the sky",
  "atmosphere": {
    "visibility_km": number,
    "tint": "golden | orange | blue | gray | clear | neutral",
    "terragen_params": { "haze_density": number, "haze_horizon_colour": "r g b" }
  },
  "cloud_layers": [
    {
      "type": "cumulus | stratus | cirrus | altostratus | nimbostratus",
      "base_alt_km": number,
      "top_alt_km": number,
      "thickness_m": number,
      "coverage_pct": number,
      "density": "low | medium | high",
      "softness": "soft | medium | hard"
    }
  ],
  "sun": { "azimuth_deg": number, "elevation_deg": number }
}
Omit fields you cannot estimate. Colours are three floats between 0 and 1."#;

/// Image generation: heightmap from reference photos.
pub const HEIGHTMAP: &str = "Using these reference photographs of a landscape, generate a top-down grayscale heightmap \
of the terrain. White is the highest elevation and black the lowest. No text, labels, borders, shading or \
perspective: a single square orthographic height field with smooth gradients suitable for a terrain renderer.";

/// Image generation: colour texture matching the heightmap.
pub const TEXTURE: &str = "Using these reference photographs of a landscape, generate a top-down colour texture map \
(albedo) of the terrain as seen from directly above, with no lighting, shadows, text or borders. A single square \
orthographic image covering the same area as a matching heightmap.";
