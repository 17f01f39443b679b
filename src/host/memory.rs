//! In-memory node graph.
//!
//! Backs the `mock-host` command and every host test. Paths follow the
//! `/Name` convention of the real host: renaming a node through its `name`
//! parameter changes its path.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use super::{HostError, NAME_PARAM, Node, TerrainHost};

const ROOT_PATH: &str = "/";

#[derive(Clone, Debug)]
struct MemNode {
    name: String,
    class: String,
    parent: Option<String>,
    params: BTreeMap<String, String>,
}

impl MemNode {
    fn info(&self, path: &str) -> Node {
        Node::new(path, self.name.clone(), self.class.clone())
    }
}

#[derive(Default)]
struct Graph {
    /// Paths in creation order.
    order: Vec<String>,
    nodes: HashMap<String, MemNode>,
    class_counters: HashMap<String, u32>,
    /// Classes whose creation fails.
    refused_classes: HashSet<String>,
    /// Per-class parameter whitelists. Classes without one accept anything.
    known_params: HashMap<String, HashSet<String>>,
    /// (class, param) pairs that accept writes but keep their old value.
    ignored_writes: HashSet<(String, String)>,
    creates: usize,
    writes: usize,
}

impl Graph {
    fn insert(&mut self, path: String, node: MemNode) {
        self.order.push(path.clone());
        self.nodes.insert(path, node);
    }

    fn resolve(&self, path: &str) -> Option<String> {
        if self.nodes.contains_key(path) {
            return Some(path.to_string());
        }
        let absolute = format!("/{}", path.trim_start_matches('/'));
        self.nodes.contains_key(&absolute).then_some(absolute)
    }

    fn get(&self, path: &str) -> Result<(String, &MemNode), HostError> {
        let key = self.resolve(path).ok_or_else(|| HostError::NoSuchNode(path.to_string()))?;
        let node = self.nodes.get(&key).ok_or_else(|| HostError::NoSuchNode(path.to_string()))?;
        Ok((key, node))
    }

    fn child_path(parent: &str, name: &str) -> String {
        if parent == ROOT_PATH {
            format!("/{}", name)
        } else {
            format!("{}/{}", parent, name)
        }
    }

    fn children_of(&self, parent: &str) -> Vec<Node> {
        self.order
            .iter()
            .filter_map(|path| {
                let node = self.nodes.get(path)?;
                (node.parent.as_deref() == Some(parent)).then(|| node.info(path))
            })
            .collect()
    }

    fn param_known(&self, class: &str, param: &str) -> bool {
        param == NAME_PARAM
            || self
                .known_params
                .get(class)
                .is_none_or(|known| known.contains(param))
    }

    fn rename(&mut self, old_path: &str, new_name: &str) -> Result<(), HostError> {
        let Some(mut node) = self.nodes.remove(old_path) else {
            return Err(HostError::NoSuchNode(old_path.to_string()));
        };
        let parent = node.parent.clone().unwrap_or_else(|| ROOT_PATH.to_string());
        let new_path = Self::child_path(&parent, new_name);
        if new_path != old_path && self.nodes.contains_key(&new_path) {
            self.nodes.insert(old_path.to_string(), node);
            return Err(HostError::Rejected {
                node: old_path.to_string(),
                param: NAME_PARAM.to_string(),
                reason: format!("name '{}' already in use", new_name),
            });
        }
        node.name = new_name.to_string();
        self.nodes.insert(new_path.clone(), node);
        for path in self.order.iter_mut().filter(|p| p.as_str() == old_path) {
            *path = new_path.clone();
        }
        // references stored in other nodes follow the rename
        for other in self.nodes.values_mut() {
            for value in other.params.values_mut().filter(|v| v.as_str() == old_path) {
                *value = new_path.clone();
            }
        }
        Ok(())
    }
}

/// Thread-safe in-memory [`TerrainHost`].
pub struct MemoryHost {
    graph: Mutex<Graph>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    /// Empty project with just a root node.
    pub fn new() -> Self {
        let mut graph = Graph::default();
        graph.insert(
            ROOT_PATH.to_string(),
            MemNode {
                name: "root".to_string(),
                class: "project".to_string(),
                parent: None,
                params: BTreeMap::new(),
            },
        );
        Self {
            graph: Mutex::new(graph),
        }
    }

    /// The node layout of a fresh host project.
    pub fn default_scene() -> Self {
        let host = Self::new();
        host.add_node("Fractal terrain 01", "power_fractal_shader_v3", &[]);
        host.add_node("Compute Terrain", "compute_terrain", &[("input_node", "/Fractal terrain 01")]);
        host.add_node("Base colours", "default_shader", &[("input_node", "/Compute Terrain")]);
        host.add_node("Planet 01", "planet", &[("surface_shader", "/Base colours")]);
        host.add_node("Atmosphere 01", "atmosphere", &[("input_node", ""), ("haze_density", "2")]);
        host.add_node("Sunlight 01", "sun", &[("heading", "100"), ("elevation", "25")]);
        host
    }

    fn lock(&self) -> MutexGuard<'_, Graph> {
        // a panicking test thread must not wedge the others
        self.graph.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a root child with a fixed name and initial parameters.
    pub fn add_node(&self, name: &str, class: &str, params: &[(&str, &str)]) -> Node {
        let mut graph = self.lock();
        let path = Graph::child_path(ROOT_PATH, name);
        let node = MemNode {
            name: name.to_string(),
            class: class.to_string(),
            parent: Some(ROOT_PATH.to_string()),
            params: params.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        };
        let info = node.info(&path);
        graph.insert(path, node);
        info
    }

    /// Remove a node (children are not cascaded).
    pub fn remove_node(&self, path: &str) -> bool {
        let mut graph = self.lock();
        let removed = graph.nodes.remove(path).is_some();
        graph.order.retain(|p| p != path);
        removed
    }

    /// Make `create_child` fail for `class`.
    pub fn refuse_class(&self, class: &str) {
        self.lock().refused_classes.insert(class.to_string());
    }

    /// Restrict `class` to the listed parameters.
    pub fn restrict_params(&self, class: &str, params: &[&str]) {
        self.lock()
            .known_params
            .insert(class.to_string(), params.iter().map(|p| p.to_string()).collect());
    }

    /// Writes to `param` on `class` succeed but do not stick.
    pub fn ignore_writes(&self, class: &str, param: &str) {
        self.lock().ignored_writes.insert((class.to_string(), param.to_string()));
    }

    /// Direct read that bypasses whitelists, for assertions.
    pub fn param(&self, path: &str, param: &str) -> Option<String> {
        let graph = self.lock();
        let (_, node) = graph.get(path).ok()?;
        node.params.get(param).cloned()
    }

    pub fn find_by_name(&self, name: &str) -> Option<Node> {
        let graph = self.lock();
        graph
            .order
            .iter()
            .find_map(|path| graph.nodes.get(path).filter(|n| n.name == name).map(|n| n.info(path)))
    }

    pub fn nodes_of_class(&self, class: &str) -> Vec<Node> {
        let graph = self.lock();
        graph
            .order
            .iter()
            .filter_map(|path| graph.nodes.get(path).filter(|n| n.class == class).map(|n| n.info(path)))
            .collect()
    }

    pub fn create_count(&self) -> usize {
        self.lock().creates
    }

    pub fn write_count(&self) -> usize {
        self.lock().writes
    }
}

impl TerrainHost for MemoryHost {
    fn root(&self) -> Result<Node, HostError> {
        let graph = self.lock();
        graph.get(ROOT_PATH).map(|(path, node)| node.info(&path))
    }

    fn node_by_path(&self, path: &str) -> Result<Option<Node>, HostError> {
        let graph = self.lock();
        Ok(graph.get(path).ok().map(|(key, node)| node.info(&key)))
    }

    fn children(&self, parent: &Node) -> Result<Vec<Node>, HostError> {
        let graph = self.lock();
        let (key, _) = graph.get(&parent.path)?;
        Ok(graph.children_of(&key))
    }

    fn children_by_class(&self, parent: &Node, class: &str) -> Result<Vec<Node>, HostError> {
        Ok(self.children(parent)?.into_iter().filter(|n| n.class == class).collect())
    }

    fn create_child(&self, parent: &Node, class: &str) -> Result<Option<Node>, HostError> {
        let mut graph = self.lock();
        let (parent_path, _) = graph.get(&parent.path)?;
        if graph.refused_classes.contains(class) {
            return Err(HostError::Rejected {
                node: parent_path,
                param: "class".to_string(),
                reason: format!("unknown class '{}'", class),
            });
        }
        let name = loop {
            let counter = graph.class_counters.entry(class.to_string()).or_insert(0);
            *counter += 1;
            let candidate = format!("{} {:02}", class, counter);
            if !graph.nodes.contains_key(&Graph::child_path(&parent_path, &candidate)) {
                break candidate;
            }
        };
        let path = Graph::child_path(&parent_path, &name);
        let node = MemNode {
            name,
            class: class.to_string(),
            parent: Some(parent_path),
            params: BTreeMap::new(),
        };
        let info = node.info(&path);
        graph.insert(path, node);
        graph.creates += 1;
        Ok(Some(info))
    }

    fn get_param(&self, node: &Node, param: &str) -> Result<String, HostError> {
        let graph = self.lock();
        let (key, mem) = graph.get(&node.path)?;
        if param == NAME_PARAM {
            return Ok(mem.name.clone());
        }
        if !graph.param_known(&mem.class, param) {
            return Err(HostError::Rejected {
                node: key,
                param: param.to_string(),
                reason: "no such parameter".to_string(),
            });
        }
        Ok(mem.params.get(param).cloned().unwrap_or_default())
    }

    fn set_param(&self, node: &Node, param: &str, value: &str) -> Result<(), HostError> {
        let mut graph = self.lock();
        let (key, mem) = graph.get(&node.path)?;
        let class = mem.class.clone();
        if !graph.param_known(&class, param) {
            return Err(HostError::Rejected {
                node: key,
                param: param.to_string(),
                reason: "no such parameter".to_string(),
            });
        }
        graph.writes += 1;
        if graph.ignored_writes.contains(&(class, param.to_string())) {
            return Ok(());
        }
        if param == NAME_PARAM {
            return graph.rename(&key, value);
        }
        if let Some(mem) = graph.nodes.get_mut(&key) {
            mem.params.insert(param.to_string(), value.to_string());
        }
        Ok(())
    }

    fn param_names(&self, node: &Node) -> Result<Vec<String>, HostError> {
        let graph = self.lock();
        let (_, mem) = graph.get(&node.path)?;
        let mut names: Vec<String> = match graph.known_params.get(&mem.class) {
            Some(known) => known.iter().cloned().collect(),
            None => mem.params.keys().cloned().collect(),
        };
        names.push(NAME_PARAM.to_string());
        names.sort();
        names.dedup();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scene_layout() {
        let host = MemoryHost::default_scene();
        let root = host.root().unwrap();
        let children = host.children(&root).unwrap();
        let names: Vec<_> = children.iter().map(|n| n.name.as_str()).collect();
        assert!(names.contains(&"Planet 01"));
        assert!(names.contains(&"Compute Terrain"));
        assert_eq!(host.children_by_class(&root, "sun").unwrap().len(), 1);
        // relative lookups resolve against the root
        assert_eq!(host.node_by_path("Atmosphere 01").unwrap().unwrap().path, "/Atmosphere 01");
        assert!(host.node_by_path("/Nothing").unwrap().is_none());
    }

    #[test]
    fn test_create_names_are_unique() {
        let host = MemoryHost::new();
        let root = host.root().unwrap();
        let a = host.create_child(&root, "cloud_layer").unwrap().unwrap();
        let b = host.create_child(&root, "cloud_layer").unwrap().unwrap();
        assert_ne!(a.path, b.path);
        assert_eq!(host.create_count(), 2);
    }

    #[test]
    fn test_rename_moves_path_and_references() {
        let host = MemoryHost::new();
        let root = host.root().unwrap();
        let node = host.create_child(&root, "heightfield_load").unwrap().unwrap();
        let other = host.add_node("Reader", "heightfield_shader", &[("heightfield", &node.path)]);

        host.set_param(&node, NAME_PARAM, "Manual_HF_Load").unwrap();
        assert!(host.node_by_path(&node.path).unwrap().is_none());
        let renamed = host.node_by_path("/Manual_HF_Load").unwrap().unwrap();
        assert_eq!(renamed.class, "heightfield_load");
        assert_eq!(host.param(&other.path, "heightfield").as_deref(), Some("/Manual_HF_Load"));
    }

    #[test]
    fn test_rename_collision_rejected() {
        let host = MemoryHost::default_scene();
        let root = host.root().unwrap();
        let node = host.create_child(&root, "planet").unwrap().unwrap();
        let err = host.set_param(&node, NAME_PARAM, "Planet 01").unwrap_err();
        assert!(matches!(err, HostError::Rejected { .. }));
        assert!(host.node_by_path(&node.path).unwrap().is_some());
    }

    #[test]
    fn test_whitelists_and_ignored_writes() {
        let host = MemoryHost::new();
        host.restrict_params("image_map_shader", &["image_filename"]);
        host.ignore_writes("image_map_shader", "image_filename");
        host.refuse_class("image_map_v3");
        let root = host.root().unwrap();
        let node = host.create_child(&root, "image_map_shader").unwrap().unwrap();

        assert!(host.set_param(&node, "filename", "a.png").is_err());
        host.set_param(&node, "image_filename", "a.png").unwrap();
        assert_eq!(host.get_param(&node, "image_filename").unwrap(), "");
        assert!(host.create_child(&root, "image_map_v3").is_err());
        assert_eq!(
            host.param_names(&node).unwrap(),
            vec!["image_filename".to_string(), "name".to_string()]
        );
    }
}
