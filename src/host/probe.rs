//! Best-effort node discovery and parameter probing.
//!
//! Every remote call is guarded individually: a failure moves on to the next
//! candidate instead of aborting. Exhausting a candidate list is logged and
//! reported through [`ProbeOutcome`], never raised. The one hard failure is
//! [`HostError::NoCreatableNode`].

use std::collections::HashSet;

use super::{HostError, NAME_PARAM, Node, NodeLookup, TerrainHost};

/// When a write followed by a read-back counts as having stuck.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Acceptance {
    /// Read-back equals the written value (see [`values_match`]).
    Matching,
    /// Any non-empty read-back.
    NonEmpty,
}

impl Acceptance {
    fn accepts(self, readback: &str, target: &str) -> bool {
        match self {
            Acceptance::Matching => values_match(readback, target),
            Acceptance::NonEmpty => !readback.trim().is_empty(),
        }
    }
}

/// Host values come back reformatted: case, node path prefixes and number
/// formatting ("10000" vs "10000.0") may differ from what was written.
pub fn values_match(readback: &str, target: &str) -> bool {
    let (a, b) = (readback.trim(), target.trim());
    if a.eq_ignore_ascii_case(b) {
        return true;
    }
    let (bare_a, bare_b) = (a.trim_start_matches('/'), b.trim_start_matches('/'));
    if !bare_a.is_empty() && !bare_b.is_empty() && bare_a.eq_ignore_ascii_case(bare_b) {
        return true;
    }
    let numbers = |s: &str| s.split_whitespace().map(str::parse::<f64>).collect::<Result<Vec<_>, _>>();
    match (numbers(a), numbers(b)) {
        (Ok(x), Ok(y)) => !x.is_empty() && x.len() == y.len() && x.iter().zip(&y).all(|(p, q)| (p - q).abs() < 1e-6),
        _ => false,
    }
}

/// Which candidate stuck, and what the host read back.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProbeOutcome {
    pub param: Option<String>,
    pub readback: Option<String>,
}

impl ProbeOutcome {
    fn hit(param: &str, readback: String) -> Self {
        Self {
            param: Some(param.to_string()),
            readback: Some(readback),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.param.is_some()
    }

    /// The read-back value, or "" when nothing stuck.
    pub fn value(&self) -> &str {
        self.readback.as_deref().unwrap_or("")
    }
}

/// Probing helpers over any [`TerrainHost`].
pub struct Prober<'a> {
    host: &'a dyn TerrainHost,
}

impl<'a> Prober<'a> {
    pub fn new(host: &'a dyn TerrainHost) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &dyn TerrainHost {
        self.host
    }

    pub fn root(&self) -> Result<Node, HostError> {
        self.host.root()
    }

    /// Resolve a path, treating errors as "not there".
    pub fn resolve(&self, path: &str) -> Option<Node> {
        if path.trim().is_empty() {
            return None;
        }
        match self.host.node_by_path(path) {
            Ok(node) => node,
            Err(e) => {
                log::debug!("Lookup of '{}' failed: {}", path, e);
                None
            }
        }
    }

    /// Read a parameter, treating errors as "unreadable".
    pub fn read(&self, node: &Node, param: &str) -> Option<String> {
        match self.host.get_param(node, param) {
            Ok(value) => Some(value),
            Err(e) => {
                log::debug!("Read {}.{} failed: {}", node.name, param, e);
                None
            }
        }
    }

    /// Write, ignoring failures. Returns whether the host accepted the write.
    pub fn try_set(&self, node: &Node, param: &str, value: &str) -> bool {
        match self.host.set_param(node, param, value) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("Set {}.{} failed: {}", node.name, param, e);
                false
            }
        }
    }

    /// Write then read back, logging both. Errors propagate.
    pub fn set_and_verify(&self, node: &Node, param: &str, value: &str) -> Result<String, HostError> {
        log::info!("Setting {}.{} = {}", node.name, param, value);
        self.host.set_param(node, param, value)?;
        let readback = self.host.get_param(node, param)?;
        if values_match(&readback, value) {
            log::info!("  -> read back {}.{} = {}", node.name, param, readback);
        } else {
            log::warn!("  -> read back {}.{} = '{}' (expected '{}')", node.name, param, readback, value);
        }
        Ok(readback)
    }

    /// Find the first candidate that takes `value`.
    ///
    /// A read-only pass runs first: a candidate that already holds `value`
    /// is returned without writing anything.
    pub fn probe_set<S: AsRef<str>>(&self, node: &Node, candidates: &[S], value: &str, acceptance: Acceptance) -> ProbeOutcome {
        for param in candidates.iter().map(AsRef::as_ref) {
            if let Some(current) = self.read(node, param)
                && !current.is_empty()
                && values_match(&current, value)
            {
                log::info!("{}.{} already = {}", node.name, param, current);
                return ProbeOutcome::hit(param, current);
            }
        }

        for param in candidates.iter().map(AsRef::as_ref) {
            if !self.try_set(node, param, value) {
                continue;
            }
            let readback = self.read(node, param).unwrap_or_default();
            if acceptance.accepts(&readback, value) {
                log::info!("Set {}.{} -> {}", node.name, param, readback);
                return ProbeOutcome::hit(param, readback);
            }
            log::debug!("{}.{} did not take '{}' (read back '{}')", node.name, param, value, readback);
        }

        log::warn!(
            "None of [{}] on {} accepted '{}'",
            candidates.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(", "),
            node.name,
            value
        );
        ProbeOutcome::default()
    }

    /// First candidate with a non-empty value.
    pub fn probe_get<S: AsRef<str>>(&self, node: &Node, candidates: &[S]) -> ProbeOutcome {
        candidates
            .iter()
            .map(AsRef::as_ref)
            .find_map(|param| {
                self.read(node, param)
                    .filter(|v| !v.trim().is_empty())
                    .map(|v| ProbeOutcome::hit(param, v))
            })
            .unwrap_or_default()
    }

    pub fn root_children(&self) -> Result<Vec<Node>, HostError> {
        let root = self.host.root()?;
        self.host.children(&root)
    }

    /// Log what the host thinks exists; used before reporting a missing node.
    pub fn log_root_children(&self) {
        match self.root_children() {
            Ok(children) => {
                log::info!("Root children ({}):", children.len());
                for child in children {
                    log::info!("  {} [{}] {}", child.name, child.class, child.path);
                }
            }
            Err(e) => log::warn!("Could not list root children: {}", e),
        }
    }

    /// Root children of any of `classes`, deduplicated by path, in class order.
    pub fn collect_by_classes<S: AsRef<str>>(&self, classes: &[S]) -> Vec<Node> {
        let Ok(root) = self.host.root() else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        let mut nodes = Vec::new();
        for class in classes.iter().map(AsRef::as_ref) {
            match self.host.children_by_class(&root, class) {
                Ok(found) => nodes.extend(found.into_iter().filter(|n| seen.insert(n.path.clone()))),
                Err(e) => log::debug!("Listing class '{}' failed: {}", class, e),
            }
        }
        nodes
    }

    /// Create a root child with the first class the host accepts.
    pub fn create_first<S: AsRef<str>>(&self, classes: &[S]) -> Option<Node> {
        let root = match self.host.root() {
            Ok(root) => root,
            Err(e) => {
                log::warn!("No root node: {}", e);
                return None;
            }
        };
        for class in classes.iter().map(AsRef::as_ref) {
            match self.host.create_child(&root, class) {
                Ok(Some(node)) => {
                    log::info!("Created {} using class '{}'", node.path, class);
                    return Some(node);
                }
                Ok(None) => log::debug!("Host declined to create class '{}'", class),
                Err(e) => log::warn!("Create attempt failed for class '{}': {}", class, e),
            }
        }
        None
    }

    /// Rename a node and return a fresh handle: the host may move it to a
    /// new path. A failed rename keeps the old handle.
    pub fn rename(&self, node: &Node, name: &str) -> Node {
        if let Err(e) = self.host.set_param(node, NAME_PARAM, name) {
            log::warn!("Could not rename {} to '{}': {}", node.path, name, e);
            return node.clone();
        }
        let parent = match node.path.rsplit_once('/') {
            Some((parent, _)) => parent,
            None => "",
        };
        let new_path = format!("{}/{}", parent, name);
        self.resolve(&new_path)
            .or_else(|| self.resolve(&node.path))
            .unwrap_or_else(|| Node {
                name: name.to_string(),
                ..node.clone()
            })
    }

    /// Find `/<name>` (or a node of one of `classes` named `name`), else create
    /// one with the first class that works and name it.
    ///
    /// Returns the node and whether it already existed.
    pub fn find_or_create<S: AsRef<str>>(&self, name: &str, classes: &[S]) -> Result<(Node, bool), HostError> {
        if let Some(node) = self.resolve(&format!("/{}", name)) {
            log::info!("Found existing {} ({})", name, node.class);
            return Ok((node, true));
        }
        if let Some(node) = self.collect_by_classes(classes).into_iter().find(|n| n.name == name) {
            log::info!("Found existing {} by class scan", name);
            return Ok((node, true));
        }
        match self.create_first(classes) {
            Some(node) => Ok((self.rename(&node, name), false)),
            None => Err(HostError::NoCreatableNode {
                name: name.to_string(),
                classes: classes.iter().map(|c| c.as_ref().to_string()).collect(),
            }),
        }
    }

    /// Paths, then classes, then (optionally) creation, then a name scan.
    pub fn locate(&self, lookup: &NodeLookup) -> Option<Node> {
        if let Some(node) = lookup.paths.iter().find_map(|p| self.resolve(p)) {
            return Some(node);
        }
        if let Some(node) = self.collect_by_classes(&lookup.classes).into_iter().next() {
            log::info!("Found {} by class: {}", lookup.label, node.path);
            return Some(node);
        }
        if lookup.create
            && let Some(node) = self.create_first(&lookup.classes)
        {
            log::info!("Created missing {}", lookup.label);
            return Some(self.rename(&node, &lookup.label));
        }
        let wanted = lookup.scan_name.as_deref()?;
        let found = self
            .root_children()
            .ok()?
            .into_iter()
            .find(|n| n.name == wanted || n.path.trim_start_matches('/') == wanted);
        if let Some(node) = &found {
            log::info!("Found {} by name scan: {}", lookup.label, node.path);
        }
        found
    }

    /// [`locate`](Self::locate), listing root children and failing when
    /// nothing turns up.
    pub fn require(&self, lookup: &NodeLookup) -> Result<Node, HostError> {
        if let Some(node) = self.locate(lookup) {
            return Ok(node);
        }
        log::error!("{} node not found", lookup.label);
        self.log_root_children();
        Err(HostError::NodeNotFound(lookup.label.clone()))
    }

    /// Log every parameter of `node`, where the host can enumerate them.
    pub fn dump_params(&self, node: &Node, label: &str) {
        let names = match self.host.param_names(node) {
            Ok(names) => names,
            Err(HostError::Unsupported) => {
                log::debug!("{}: parameter listing not supported", label);
                return;
            }
            Err(e) => {
                log::warn!("{}: could not list parameters: {}", label, e);
                return;
            }
        };
        log::info!("--- {} ({}) parameters ---", label, node.path);
        for name in names {
            let value = self.read(node, &name).unwrap_or_else(|| "<unreadable>".to_string());
            log::info!("  {} = {}", name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostProfile, MemoryHost};

    #[test]
    fn test_values_match() {
        assert!(values_match("Plan Y", "plan y"));
        assert!(values_match("10000.0 10000 1e4", "10000 10000 10000"));
        assert!(values_match("Manual_HF_Shader", "/Manual_HF_Shader"));
        assert!(!values_match("", "/"));
        assert!(!values_match("/", ""));
        assert!(!values_match("0 0", "0 0 0"));
        assert!(!values_match("", "x"));
    }

    #[test]
    fn test_probe_set_skips_rejected_candidates() {
        let host = MemoryHost::new();
        host.restrict_params("image_map_shader", &["filename"]);
        let prober = Prober::new(&host);
        let (node, existed) = prober.find_or_create("Tex", &["image_map_shader"]).unwrap();
        assert!(!existed);

        let outcome = prober.probe_set(&node, &["image_filename", "filename"], "/tmp/t.png", Acceptance::Matching);
        assert_eq!(outcome.param.as_deref(), Some("filename"));
        assert_eq!(outcome.value(), "/tmp/t.png");
    }

    #[test]
    fn test_probe_set_ignored_write_falls_through() {
        let host = MemoryHost::new();
        host.ignore_writes("cloud_layer", "input_node");
        let prober = Prober::new(&host);
        let (node, _) = prober.find_or_create("C", &["cloud_layer"]).unwrap();

        let outcome = prober.probe_set(&node, &["input_node", "main_input"], "/X", Acceptance::NonEmpty);
        assert_eq!(outcome.param.as_deref(), Some("main_input"));
    }

    #[test]
    fn test_probe_set_exhaustion_is_not_an_error() {
        let host = MemoryHost::new();
        host.restrict_params("planet", &[]);
        let prober = Prober::new(&host);
        let (node, _) = prober.find_or_create("P", &["planet"]).unwrap();
        let outcome = prober.probe_set(&node, &["a", "b"], "1", Acceptance::Matching);
        assert!(!outcome.succeeded());
        assert_eq!(outcome.value(), "");
    }

    #[test]
    fn test_discovery_is_idempotent() {
        let host = MemoryHost::new();
        let prober = Prober::new(&host);
        let (node, existed) = prober.find_or_create("AI_Texture_Image", &["image_map_shader"]).unwrap();
        assert!(!existed);
        let first = prober.probe_set(&node, &["image_filename", "filename"], "/a.png", Acceptance::Matching);
        let creates = host.create_count();
        let writes = host.write_count();

        // second round: same node found, same name returned, nothing written
        let (again, existed) = prober.find_or_create("AI_Texture_Image", &["image_map_shader"]).unwrap();
        assert!(existed);
        assert_eq!(again.path, node.path);
        let second = prober.probe_set(&again, &["filename", "image_filename"], "/a.png", Acceptance::Matching);
        assert_eq!(second.param, first.param);
        assert_eq!(host.create_count(), creates);
        assert_eq!(host.write_count(), writes);
    }

    #[test]
    fn test_find_or_create_falls_back_and_fails() {
        let host = MemoryHost::new();
        host.refuse_class("image_map_shader");
        let prober = Prober::new(&host);
        let (node, _) = prober.find_or_create("Tex", &["image_map_shader", "image_map_shader_v2"]).unwrap();
        assert_eq!(node.class, "image_map_shader_v2");
        assert_eq!(node.path, "/Tex");

        host.refuse_class("image_map");
        let err = prober.find_or_create("Other", &["image_map_shader", "image_map"]).unwrap_err();
        assert!(matches!(err, HostError::NoCreatableNode { ref name, .. } if name == "Other"));
    }

    #[test]
    fn test_locate_strategies() {
        let host = MemoryHost::new();
        let profile = HostProfile::default();
        let prober = Prober::new(&host);

        // nothing exists: planet has no create step
        assert!(prober.locate(&profile.planet).is_none());
        assert!(matches!(prober.require(&profile.planet), Err(HostError::NodeNotFound(_))));

        // found by class under a different name
        host.add_node("My World", "planet", &[]);
        assert_eq!(prober.locate(&profile.planet).unwrap().path, "/My World");

        // compute terrain is created and named
        let ct = prober.locate(&profile.compute_terrain).unwrap();
        assert_eq!(ct.path, "/Compute Terrain");
        assert_eq!(ct.class, "compute_terrain");
    }

    #[test]
    fn test_locate_name_scan() {
        let host = MemoryHost::new();
        host.refuse_class("compute_terrain");
        host.add_node("Compute Terrain", "custom_compute", &[]);
        let mut lookup = HostProfile::default().compute_terrain;
        lookup.paths.clear();
        let found = Prober::new(&host).locate(&lookup).unwrap();
        assert_eq!(found.class, "custom_compute");
    }

    #[test]
    fn test_collect_dedups() {
        let host = MemoryHost::new();
        host.add_node("A", "cloud_layer", &[]);
        host.add_node("B", "cloud_layer_v3", &[]);
        let found = Prober::new(&host).collect_by_classes(&["cloud_layer_v3", "cloud_layer", "cloud_layer_v3"]);
        let names: Vec<_> = found.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
    }
}
