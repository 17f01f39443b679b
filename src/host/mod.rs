//! Terrain host node graph: the capability interface, its implementations,
//! and the best-effort probing/wiring built on top of it.

pub mod bridge;
pub mod clouds;
pub mod deploy;
pub mod inspect;
pub mod lighting;
pub mod memory;
pub mod probe;
pub mod profile;
pub mod rpc;

use thiserror::Error;

pub use bridge::HostBridge;
pub use memory::MemoryHost;
pub use probe::{Acceptance, ProbeOutcome, Prober};
pub use profile::{HostProfile, NodeLookup, ParamTables};
pub use rpc::RpcHost;
pub use terragen_rpc::NodeInfo as Node;

/// Host errors
#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Rpc(#[from] terragen_rpc::RpcError),

    #[error("Not connected to the terrain host")]
    NotConnected,

    #[error("No such node: {0}")]
    NoSuchNode(String),

    #[error("Could not find a {0} node. See log for available nodes.")]
    NodeNotFound(String),

    #[error("Could not create '{name}' with any of the classes {classes:?}")]
    NoCreatableNode { name: String, classes: Vec<String> },

    #[error("Parameter introspection is not supported by this host")]
    Unsupported,

    #[error("Host rejected {param} on {node}: {reason}")]
    Rejected {
        node: String,
        param: String,
        reason: String,
    },
}

/// The capability set the rest of the crate uses to drive a terrain host.
///
/// Values always travel as strings; node references are node paths.
pub trait TerrainHost: Send + Sync {
    fn root(&self) -> Result<Node, HostError>;

    /// `Ok(None)` when nothing lives at `path`.
    fn node_by_path(&self, path: &str) -> Result<Option<Node>, HostError>;

    fn children(&self, parent: &Node) -> Result<Vec<Node>, HostError>;

    fn children_by_class(&self, parent: &Node, class: &str) -> Result<Vec<Node>, HostError>;

    /// `Ok(None)` when the host declines without raising.
    fn create_child(&self, parent: &Node, class: &str) -> Result<Option<Node>, HostError>;

    fn get_param(&self, node: &Node, param: &str) -> Result<String, HostError>;

    fn set_param(&self, node: &Node, param: &str, value: &str) -> Result<(), HostError>;

    fn param_names(&self, _node: &Node) -> Result<Vec<String>, HostError> {
        Err(HostError::Unsupported)
    }
}

/// Parameter that renames a node.
pub const NAME_PARAM: &str = "name";
