//! terrain-ai command line

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use terrain_ai::analysis::{self, SkyAnalysis};
use terrain_ai::config::AppConfig;
use terrain_ai::core::{Error, Result, logging};
use terrain_ai::credentials;
use terrain_ai::generation;
use terrain_ai::host::{self, HostBridge, MemoryHost, RpcHost};
use terrain_ai::imaging::{self, OutputKind};
use terrain_ai::model::{GeminiClient, ModelApi};
use terrain_ai::sandbox;
use terrain_ai::session::{DeploySource, Session};
use terrain_ai::worker::ActionRunner;
use terragen_rpc::{DEFAULT_PORT, HostHandler, HostServer};

#[derive(Parser)]
#[command(name = "terrain-ai")]
#[command(version, about = "AI heightmaps and sky setups for a node-graph terrain host", long_about = None)]
struct Cli {
    /// JSON config file (default: terrain-ai.json when present)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a heightfield (and texture) from reference photos
    Generate {
        #[arg(long = "image", value_name = "PATH", num_args = 1.., required = true)]
        images: Vec<PathBuf>,
        /// Skip the texture request
        #[arg(long)]
        no_texture: bool,
    },

    /// Describe terrain photos and optionally run the returned processing script
    AnalyzeTerrain {
        #[arg(long = "image", value_name = "PATH", num_args = 1.., required = true)]
        images: Vec<PathBuf>,
        /// Run the returned script in the sandbox
        #[arg(long)]
        run_code: bool,
    },

    /// Analyze a sky photo into atmosphere, cloud and sun settings
    AnalyzeSky {
        #[arg(long, value_name = "PATH")]
        image: PathBuf,
        /// Save the parsed analysis to the output directory
        #[arg(long)]
        save: bool,
    },

    /// Push a heightfield (and texture) into the running host
    Deploy {
        #[arg(long, value_enum, default_value = "generated")]
        source: DeploySource,
        /// Heightfield for `--source manual`
        #[arg(long, value_name = "PATH")]
        heightfield: Option<PathBuf>,
        /// Texture for `--source manual`
        #[arg(long, value_name = "PATH")]
        texture: Option<PathBuf>,
        /// Images for `--source uploaded`: heightfield first, texture second
        #[arg(long = "image", value_name = "PATH")]
        images: Vec<PathBuf>,
    },

    /// Log the host's root nodes and terrain wiring
    Inspect,

    /// Add one cloud layer to the atmosphere chain
    AddCloud,

    /// Create cloud layers from a sky analysis
    CloudsFromAnalysis {
        #[arg(long, value_name = "PATH", required_unless_present = "analysis")]
        image: Option<PathBuf>,
        /// Saved analysis JSON instead of a new API call
        #[arg(long, value_name = "FILE")]
        analysis: Option<PathBuf>,
    },

    /// Apply atmosphere and sun settings from a sky analysis
    SetupLighting {
        #[arg(long, value_name = "PATH", required_unless_present = "analysis")]
        image: Option<PathBuf>,
        /// Saved analysis JSON instead of a new API call
        #[arg(long, value_name = "FILE")]
        analysis: Option<PathBuf>,
    },

    /// List available models and their generation methods
    ListModels,

    /// Save the API key to the env file
    SetKey { key: String },

    /// Serve an in-memory scene over the bridge protocol
    MockHost {
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(()) => 0,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("Error: {}", e);
            1
        }
    };
    std::process::exit(code);
}

fn model_client(config: &AppConfig) -> Result<GeminiClient> {
    let key = credentials::load_api_key(&config.env_file)?;
    Ok(GeminiClient::new(key, config)?)
}

/// Saved analysis file, or a fresh analysis of `image`.
fn sky_analysis(config: &AppConfig, image: Option<PathBuf>, saved: Option<&Path>) -> Result<SkyAnalysis> {
    if let Some(path) = saved {
        log::info!("Using saved analysis {}", path.display());
        return analysis::load_sky_analysis(path);
    }
    let api = model_client(config)?;
    let mut session = Session {
        sky_image: image,
        ..Session::default()
    };
    Ok(session.sky_analysis_or_analyze(&api, &config.text_model)?.clone())
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Generate { images, no_texture } => {
            let api = model_client(&config)?;
            let result = ActionRunner::new("Generation")
                .run(move || generation::generate_heightfield(&api, &config, &images, !no_texture))?;
            println!("Heightfield: {}", result.heightfield_path.display());
            if let Some(texture) = &result.texture_path {
                println!("Texture: {}", texture.display());
            }
        }

        Commands::AnalyzeTerrain { images, run_code } => {
            let api = model_client(&config)?;
            let terrain = ActionRunner::new("Analysis").run({
                let model = config.text_model.clone();
                move || analysis::analyze_terrain(&api, &model, &images)
            })?;
            let stamp = imaging::timestamp(chrono::Local::now());
            imaging::save_json(&config.output_dir, OutputKind::TerrainAnalysis, &stamp, &terrain.to_json())?;
            println!("{}", terrain.description.as_deref().unwrap_or(&terrain.raw_text));

            if run_code {
                let Some(code) = terrain.python_code else {
                    log::warn!("Analysis returned no script to run");
                    return Ok(());
                };
                let path = ActionRunner::new("Script").run(move || sandbox::run_heightmap_script(&config, &code))?;
                println!("Script heightfield: {}", path.display());
            }
        }

        Commands::AnalyzeSky { image, save } => {
            let api = model_client(&config)?;
            let report = ActionRunner::new("Sky analysis").run({
                let model = config.text_model.clone();
                move || analysis::analyze_sky(&api, &model, &image)
            })?;
            match &report.json {
                Some(json) => println!("{}", serde_json::to_string_pretty(json)?),
                None => println!("{}", report.raw_text),
            }
            if save {
                let json = report.json.as_ref().ok_or(Error::UnparsedAnalysis)?;
                let stamp = imaging::timestamp(chrono::Local::now());
                let path = imaging::save_json(&config.output_dir, OutputKind::SkyAnalysis, &stamp, json)?;
                println!("Saved: {}", path.display());
            }
        }

        Commands::Deploy {
            source,
            heightfield,
            texture,
            images,
        } => {
            let session = Session {
                reference_images: images,
                manual_heightfield: heightfield,
                manual_texture: texture,
                last_generation: generation::latest_generation(&config.output_dir)?,
                ..Session::default()
            };
            let files = session.deploy_files(source)?;
            let target = RpcHost::connect(config.host_addr.clone())?;
            let profile = config.host_profile();
            let report = ActionRunner::new("Deploy").run(move || {
                Ok(host::deploy::deploy(&target, &profile, &files.heightfield, files.texture.as_deref())?)
            })?;
            for line in report.summary() {
                println!("{}", line);
            }
        }

        Commands::Inspect => {
            let target = RpcHost::connect(config.host_addr.clone())?;
            let profile = config.host_profile();
            let structure = ActionRunner::new("Inspect")
                .run(move || Ok(host::inspect::read_node_structure(&target, &profile)?))?;
            print!("{}", structure);
        }

        Commands::AddCloud => {
            let target = RpcHost::connect(config.host_addr.clone())?;
            let profile = config.host_profile();
            let report = ActionRunner::new("Cloud creation")
                .run(move || Ok(host::clouds::add_cloud_layer(&target, &profile)?))?;
            println!("Created {} ({:?})", report.node.path, report.wiring);
        }

        Commands::CloudsFromAnalysis { image, analysis } => {
            let sky = sky_analysis(&config, image, analysis.as_deref())?;
            let target = RpcHost::connect(config.host_addr.clone())?;
            let profile = config.host_profile();
            let reports = ActionRunner::new("Cloud creation")
                .run(move || Ok(host::clouds::clouds_from_analysis(&target, &profile, &sky.cloud_layers)?))?;
            for report in &reports {
                println!("Created {} ({:?})", report.node.path, report.wiring);
            }
            println!("Created {} cloud layer(s)", reports.len());
        }

        Commands::SetupLighting { image, analysis } => {
            let sky = sky_analysis(&config, image, analysis.as_deref())?;
            let target = RpcHost::connect(config.host_addr.clone())?;
            let profile = config.host_profile();
            let changes = ActionRunner::new("Lighting setup")
                .run(move || Ok(host::lighting::setup_lighting(&target, &profile, &sky)?))?;
            if changes.is_empty() {
                println!("No lighting changes applied");
            }
            for change in changes {
                println!("{}", change);
            }
        }

        Commands::ListModels => {
            let api = model_client(&config)?;
            for model in api.list_models()? {
                println!("{} [{}]", model.name, model.supported_generation_methods.join(", "));
            }
        }

        Commands::SetKey { key } => {
            credentials::save_api_key(&config.env_file, &key)?;
            println!("API key saved to {}", config.env_file.display());
        }

        Commands::MockHost { port } => {
            let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
            rt.block_on(async move {
                let bridge = HostBridge::new(Arc::new(MemoryHost::default_scene()));
                let handler: Arc<tokio::sync::Mutex<dyn HostHandler>> = Arc::new(tokio::sync::Mutex::new(bridge));
                log::info!("Serving the default scene on port {}", port);
                HostServer::start(handler, port).wait().await;
            });
        }
    }
    Ok(())
}
