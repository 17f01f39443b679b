//! [`TerrainHost`] over the bridge client.

use std::sync::{Mutex, MutexGuard};

use terragen_rpc::HostClient;

use super::{HostError, Node, TerrainHost};

/// A running host reached through the bridge protocol.
///
/// Calls are serialized over one connection.
pub struct RpcHost {
    client: Mutex<HostClient>,
}

impl RpcHost {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            client: Mutex::new(HostClient::new(addr)),
        }
    }

    fn client(&self) -> MutexGuard<'_, HostClient> {
        self.client.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Round-trip check.
    pub fn ping(&self) -> Result<String, HostError> {
        Ok(self.client().ping()?)
    }

    /// Connect and ping, so an unreachable host fails before any wiring starts.
    pub fn connect(addr: impl Into<String>) -> Result<Self, HostError> {
        let host = Self::new(addr);
        let reply = host.ping()?;
        log::info!("Terrain host answered: {}", reply);
        Ok(host)
    }
}

impl TerrainHost for RpcHost {
    fn root(&self) -> Result<Node, HostError> {
        self.client().root()?.ok_or(HostError::NotConnected)
    }

    fn node_by_path(&self, path: &str) -> Result<Option<Node>, HostError> {
        Ok(self.client().node_by_path(path)?)
    }

    fn children(&self, parent: &Node) -> Result<Vec<Node>, HostError> {
        Ok(self.client().children(&parent.path)?)
    }

    fn children_by_class(&self, parent: &Node, class: &str) -> Result<Vec<Node>, HostError> {
        Ok(self.client().children_by_class(&parent.path, class)?)
    }

    fn create_child(&self, parent: &Node, class: &str) -> Result<Option<Node>, HostError> {
        Ok(self.client().create_child(&parent.path, class)?)
    }

    fn get_param(&self, node: &Node, param: &str) -> Result<String, HostError> {
        Ok(self.client().get_param(&node.path, param)?)
    }

    fn set_param(&self, node: &Node, param: &str, value: &str) -> Result<(), HostError> {
        Ok(self.client().set_param(&node.path, param, value)?)
    }

    fn param_names(&self, node: &Node) -> Result<Vec<String>, HostError> {
        Ok(self.client().param_names(&node.path)?)
    }
}
