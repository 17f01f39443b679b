//! Cloud layer creation and chain wiring.
//!
//! Cloud layers form a chain: the atmosphere's input names the head cloud,
//! each cloud's link input names the next one, and the tail's link input is
//! empty ("open"). New layers are attached without breaking existing links
//! where possible.

use std::collections::HashSet;

use super::{Acceptance, HostError, HostProfile, Node, ProbeOutcome, Prober, TerrainHost};
use crate::analysis::CloudLayerSpec;

pub const CLOUD_NAME_PREFIX: &str = "AI Cloud";

const DEFAULT_DEPTH_M: f64 = 3000.0;
const DEFAULT_ALTITUDE_M: f64 = 5000.0;

const DEFAULT_BASE_KM: f64 = 2.0;
const DEFAULT_COVERAGE_PCT: f64 = 50.0;
const MIN_DEPTH_M: f64 = 500.0;

/// Softness keyword → edge sharpness. Unknown keywords get the "medium" value.
const EDGE_SHARPNESS: &[(&str, f64)] = &[("soft", 0.0), ("medium", 0.5), ("hard", 1.0), ("high", 1.0), ("low", 0.0)];
const DEFAULT_SHARPNESS: f64 = 0.5;

const INPUT_NODE: &str = "input_node";

/// How a new cloud ended up connected.
#[derive(Clone, Debug, PartialEq)]
pub enum CloudWiring {
    /// The atmosphere had no cloud input and now reads the new cloud.
    AtmosphereInput,
    /// An existing cloud with an open link input is now fed by the new cloud.
    Feeds(Node),
    /// No open inputs: the head's link input now reads the new cloud.
    BeforeHead(Node),
    /// The atmosphere names a path that does not resolve; the new cloud
    /// links to it.
    UnresolvedHead(String),
    /// Left disconnected for manual wiring.
    Unwired,
}

#[derive(Clone, Debug)]
pub struct CloudReport {
    pub node: Node,
    pub wiring: CloudWiring,
    /// Atmosphere input after wiring.
    pub atmosphere_input: ProbeOutcome,
}

/// Head and tail of the chain hanging off the atmosphere.
#[derive(Clone, Debug, Default)]
pub struct CloudChain {
    pub head: Option<Node>,
    /// The head's path, or the raw atmosphere input when it did not resolve.
    pub head_path: Option<String>,
    pub tail: Option<Node>,
}

/// First `"{prefix} N"` (N counting from `start`) not used by `existing`.
pub fn next_cloud_name(existing: &[Node], start: usize) -> String {
    let names: HashSet<&str> = existing.iter().map(|n| n.name.as_str()).collect();
    (start.max(1)..)
        .map(|idx| format!("{} {}", CLOUD_NAME_PREFIX, idx))
        .find(|name| !names.contains(name.as_str()))
        .unwrap_or_else(|| format!("{} {}", CLOUD_NAME_PREFIX, start))
}

fn has_open_input(prober: &Prober<'_>, profile: &HostProfile, cloud: &Node) -> bool {
    !prober.probe_get(cloud, &profile.params.cloud_link).succeeded()
}

fn find_open_input<'n>(prober: &Prober<'_>, profile: &HostProfile, candidates: &'n [Node]) -> Option<&'n Node> {
    candidates.iter().find(|c| has_open_input(prober, profile, c))
}

/// Follow the chain from the atmosphere input.
///
/// When the atmosphere input does not resolve, a cloud with an open input
/// (or else the first cloud) stands in as head. The walk stops at the first
/// empty, unresolvable or already-visited link.
pub fn find_chain(prober: &Prober<'_>, profile: &HostProfile, atmosphere: &Node, clouds: &[Node]) -> CloudChain {
    let input = prober.probe_get(atmosphere, &profile.params.atmosphere_input);
    let mut head_path = input.readback.clone();
    let mut head = head_path.as_deref().and_then(|p| prober.resolve(p));

    match &head {
        Some(node) => log::info!(
            "Atmosphere input before connect: {} -> {}",
            input.param.as_deref().unwrap_or("?"),
            node.path
        ),
        None => {
            log::info!("Atmosphere has no resolved cloud input; searching for a standalone head...");
            let standalone = find_open_input(prober, profile, clouds).or(clouds.first());
            if let Some(node) = standalone {
                log::info!("Head candidate: {} ({})", node.name, node.path);
                head_path = Some(node.path.clone());
                head = Some(node.clone());
            }
        }
    }

    let mut visited = HashSet::new();
    let mut tail = head.clone();
    while let Some(node) = tail.clone() {
        if !visited.insert(node.path.clone()) {
            break;
        }
        let link = prober.probe_get(&node, &profile.params.cloud_link);
        match link.readback.as_deref().and_then(|p| prober.resolve(p)) {
            Some(next) if !visited.contains(&next.path) => tail = Some(next),
            _ => break,
        }
    }

    if let Some(head) = &head {
        log::info!(
            "Chain head: {} ({}); tail: {}",
            head.name,
            head.path,
            tail.as_ref().map(|t| t.name.as_str()).unwrap_or("n/a")
        );
    }
    CloudChain { head, head_path, tail }
}

/// Set one value, logging the read-back. Failures are logged only.
fn safe_set(prober: &Prober<'_>, node: &Node, param: &str, value: f64) -> Option<String> {
    match prober.set_and_verify(node, param, &value.to_string()) {
        Ok(readback) => Some(readback),
        Err(e) => {
            log::warn!("Failed set {}.{}: {}", node.name, param, e);
            None
        }
    }
}

fn create_cloud(prober: &Prober<'_>, classes: &[String], name: &str) -> Result<Node, HostError> {
    let node = prober.create_first(classes).ok_or_else(|| HostError::NoCreatableNode {
        name: name.to_string(),
        classes: classes.to_vec(),
    })?;
    Ok(prober.rename(&node, name))
}

fn report_atmosphere_input(prober: &Prober<'_>, profile: &HostProfile, atmosphere: &Node) -> ProbeOutcome {
    let check = prober.probe_get(atmosphere, &profile.params.atmosphere_input);
    match check.param.as_deref() {
        Some(param) => log::info!("Atmosphere input after connect: {} -> {}", param, check.value()),
        None => log::warn!("Atmosphere input still empty; verify manually"),
    }
    check
}

/// Add one default cloud layer and wire it into the chain.
pub fn add_cloud_layer(host: &dyn TerrainHost, profile: &HostProfile) -> Result<CloudReport, HostError> {
    let prober = Prober::new(host);
    log::info!("Creating or chaining cloud node to atmosphere...");
    let atmosphere = prober.require(&profile.atmosphere)?;

    let clouds = prober.collect_by_classes(&profile.cloud_classes);
    if clouds.is_empty() {
        log::info!("No existing cloud layers found");
        prober.log_root_children();
    }

    let name = next_cloud_name(&clouds, 1);
    let cloud = create_cloud(&prober, &profile.cloud_classes, &name)?;
    safe_set(&prober, &cloud, "cloud_depth", DEFAULT_DEPTH_M);
    safe_set(&prober, &cloud, "cloud_altitude", DEFAULT_ALTITUDE_M);

    let chain = find_chain(&prober, profile, &atmosphere, &clouds);
    let links = &profile.params.cloud_link;

    let wiring = if chain.head.is_none() && chain.head_path.is_none() {
        prober.try_set(&cloud, INPUT_NODE, "");
        prober.probe_set(&atmosphere, &profile.params.atmosphere_input, &cloud.path, Acceptance::NonEmpty);
        log::info!("No existing clouds; atmosphere now reads {}", name);
        CloudWiring::AtmosphereInput
    } else if let Some(target) =
        find_open_input(&prober, profile, &clouds).or_else(|| chain.head.as_ref().filter(|h| has_open_input(&prober, profile, h)))
    {
        prober.probe_set(target, links, &cloud.path, Acceptance::NonEmpty);
        prober.try_set(&cloud, INPUT_NODE, "");
        log::info!("Connected {} into {}'s input", name, target.name);
        CloudWiring::Feeds(target.clone())
    } else if let Some(head) = &chain.head {
        prober.probe_set(head, links, &cloud.path, Acceptance::NonEmpty);
        prober.try_set(&cloud, INPUT_NODE, "");
        log::info!("Inserted {} before head {} (no open inputs found)", name, head.name);
        CloudWiring::BeforeHead(head.clone())
    } else {
        let path = chain.head_path.clone().unwrap_or_default();
        prober.try_set(&cloud, INPUT_NODE, &path);
        log::info!("Chained {} before unresolved head path {}", name, path);
        CloudWiring::UnresolvedHead(path)
    };

    let atmosphere_input = report_atmosphere_input(&prober, profile, &atmosphere);
    Ok(CloudReport {
        node: cloud,
        wiring,
        atmosphere_input,
    })
}

/// Create a cloud layer from an analyzed layer description.
///
/// `index` is 1-based and seeds the layer name.
pub fn cloud_from_layer(
    host: &dyn TerrainHost,
    profile: &HostProfile,
    layer: &CloudLayerSpec,
    index: usize,
) -> Result<CloudReport, HostError> {
    let prober = Prober::new(host);
    let atmosphere = prober.require(&profile.atmosphere)?;

    let classes = profile.cloud_classes_for(layer.kind.as_deref());
    let existing = prober.collect_by_classes(&profile.cloud_classes);
    let name = next_cloud_name(&existing, index);
    let cloud = create_cloud(&prober, classes, &name)?;
    log::info!("Created cloud {} ({}) as {}", index, cloud.class, name);

    let nonzero = |v: Option<f64>| v.filter(|x| *x != 0.0);
    let base_km = nonzero(layer.base_alt_km).unwrap_or(DEFAULT_BASE_KM);
    let top_km = nonzero(layer.top_alt_km).unwrap_or(base_km + 1.0);
    let depth_m = nonzero(layer.thickness_m).unwrap_or(((top_km - base_km) * 1000.0).max(MIN_DEPTH_M));
    let coverage = nonzero(layer.coverage_pct).unwrap_or(DEFAULT_COVERAGE_PCT) / 100.0;

    safe_set(&prober, &cloud, "cloud_altitude", base_km * 1000.0);
    safe_set(&prober, &cloud, "cloud_depth", depth_m);
    // builds differ on which of these exists; set them all
    for param in &profile.params.cloud_coverage {
        safe_set(&prober, &cloud, param, coverage);
    }

    let softness = layer.softness.as_deref().unwrap_or("medium").to_lowercase();
    let sharpness = EDGE_SHARPNESS
        .iter()
        .find(|(key, _)| *key == softness.trim())
        .map(|(_, v)| *v)
        .unwrap_or(DEFAULT_SHARPNESS);
    safe_set(&prober, &cloud, "edge_sharpness", sharpness);
    safe_set(&prober, &cloud, "edge_softness", 1.0 - sharpness);

    let others: Vec<Node> = prober
        .collect_by_classes(&profile.cloud_classes)
        .into_iter()
        .filter(|c| c.path != cloud.path)
        .collect();

    let head = prober.probe_get(&atmosphere, &profile.params.atmosphere_input);
    let wiring = if !head.succeeded() {
        prober.probe_set(&atmosphere, &profile.params.atmosphere_input, &cloud.path, Acceptance::NonEmpty);
        log::info!("Atmosphere empty; connected to {}", name);
        CloudWiring::AtmosphereInput
    } else if let Some(target) = find_open_input(&prober, profile, &others) {
        prober.probe_set(target, &profile.params.cloud_link, &cloud.path, Acceptance::NonEmpty);
        log::info!("Connected {} into {}'s input", name, target.name);
        CloudWiring::Feeds(target.clone())
    } else {
        log::warn!("No open cloud inputs found; {} created but not wired", name);
        CloudWiring::Unwired
    };

    let atmosphere_input = report_atmosphere_input(&prober, profile, &atmosphere);
    Ok(CloudReport {
        node: cloud,
        wiring,
        atmosphere_input,
    })
}

/// One cloud layer per analyzed layer, in order. Stops at the first failure.
pub fn clouds_from_analysis(
    host: &dyn TerrainHost,
    profile: &HostProfile,
    layers: &[CloudLayerSpec],
) -> Result<Vec<CloudReport>, HostError> {
    if layers.is_empty() {
        log::info!("No cloud layers detected in analysis");
        return Ok(Vec::new());
    }
    log::info!("Analysis returned {} cloud layers; creating...", layers.len());
    layers
        .iter()
        .enumerate()
        .map(|(i, layer)| cloud_from_layer(host, profile, layer, i + 1))
        .collect()
}
