//! Read-only view of the host's node structure.

use std::fmt;

use super::{HostError, HostProfile, Node, NodeLookup, Prober, TerrainHost};

/// Root children plus the two links a deploy touches.
#[derive(Clone, Debug)]
pub struct NodeStructure {
    pub root_children: Vec<Node>,
    pub planet: Option<Node>,
    /// The planet's surface shader input, as read back.
    pub planet_surface: Option<String>,
    pub compute_terrain: Option<Node>,
    pub compute_input: Option<String>,
}

impl fmt::Display for NodeStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Root children ({}):", self.root_children.len())?;
        for child in &self.root_children {
            writeln!(f, " - {} ({}) [class: {}]", child.name, child.path, child.class)?;
        }
        match (&self.planet, &self.planet_surface) {
            (Some(planet), surface) => {
                writeln!(f, "{} surface shader input: '{}'", planet.name, surface.as_deref().unwrap_or(""))?
            }
            (None, _) => writeln!(f, "WARNING: planet not found")?,
        }
        match (&self.compute_terrain, &self.compute_input) {
            (Some(ct), input) => writeln!(f, "{} input node: '{}'", ct.name, input.as_deref().unwrap_or("")),
            (None, _) => writeln!(f, "WARNING: compute terrain not found"),
        }
    }
}

/// Inspecting never creates nodes, whatever the lookup says.
fn read_only(lookup: &NodeLookup) -> NodeLookup {
    NodeLookup {
        create: false,
        ..lookup.clone()
    }
}

pub fn read_node_structure(host: &dyn TerrainHost, profile: &HostProfile) -> Result<NodeStructure, HostError> {
    let prober = Prober::new(host);
    let root_children = prober.root_children()?;

    let planet = prober.locate(&read_only(&profile.planet));
    let planet_surface = planet
        .as_ref()
        .map(|p| prober.probe_get(p, &profile.params.planet_surface).value().to_string());

    let compute_terrain = prober.locate(&read_only(&profile.compute_terrain));
    let compute_input = compute_terrain
        .as_ref()
        .and_then(|ct| prober.read(ct, "input_node"));

    let structure = NodeStructure {
        root_children,
        planet,
        planet_surface,
        compute_terrain,
        compute_input,
    };
    log::info!("--- Reading node structure ---");
    for line in structure.to_string().lines() {
        log::info!("{}", line);
    }
    Ok(structure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;

    #[test]
    fn test_default_scene_structure() {
        let host = MemoryHost::default_scene();
        let s = read_node_structure(&host, &HostProfile::default()).unwrap();
        assert_eq!(s.root_children.len(), 6);
        assert_eq!(s.planet_surface.as_deref(), Some("/Base colours"));
        assert_eq!(s.compute_input.as_deref(), Some("/Fractal terrain 01"));
        let text = s.to_string();
        assert!(text.contains("Root children (6):"));
        assert!(text.contains("[class: compute_terrain]"));
    }

    #[test]
    fn test_inspect_does_not_create() {
        let host = MemoryHost::new();
        let s = read_node_structure(&host, &HostProfile::default()).unwrap();
        assert!(s.planet.is_none());
        assert!(s.compute_terrain.is_none());
        assert_eq!(host.create_count(), 0);
        assert!(s.to_string().contains("WARNING: compute terrain not found"));
    }
}
