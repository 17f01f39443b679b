//! Bridge protocol - JSON command/response definitions

use serde::{Deserialize, Serialize};

/// Commands sent from the client to the host bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "params")]
pub enum HostCommand {
    /// Health check
    Ping,
    /// Get the project root node
    Root,
    /// Resolve a node by its path (absolute or relative to the root)
    NodeByPath { path: String },
    /// List all children of a node
    Children { path: String },
    /// List children of a node that have the given class
    ChildrenByClass { path: String, class: String },
    /// Create a new child of the given class
    CreateChild { parent: String, class: String },
    /// Read a parameter as a string
    GetParam { path: String, param: String },
    /// Write a parameter (values are always sent as strings)
    SetParam {
        path: String,
        param: String,
        value: String,
    },
    /// List parameter names of a node, where the host supports it
    ParamNames { path: String },
}

/// Responses from the host bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum HostResponse {
    #[serde(rename = "ok")]
    Ok { data: ResponseData },
    #[serde(rename = "error")]
    Error { message: String },
}

/// Response data variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseData {
    Pong {
        message: String,
    },
    Lookup {
        found: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node: Option<NodeInfo>,
    },
    Nodes {
        nodes: Vec<NodeInfo>,
    },
    Param {
        value: String,
    },
    ParamNames {
        params: Vec<String>,
    },
    None,
}

/// A node as seen through the bridge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Full path, e.g. "/Planet 01"
    pub path: String,
    /// Display name
    pub name: String,
    /// Class identifier, e.g. "planet" or "cloud_layer_v3"
    pub class: String,
}

impl NodeInfo {
    pub fn new(path: impl Into<String>, name: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            class: class.into(),
        }
    }
}

impl HostResponse {
    pub fn ok(data: ResponseData) -> Self {
        Self::Ok { data }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self::Error {
            message: msg.into(),
        }
    }

    pub fn pong() -> Self {
        Self::ok(ResponseData::Pong {
            message: "pong".into(),
        })
    }

    pub fn none() -> Self {
        Self::ok(ResponseData::None)
    }

    pub fn lookup(node: Option<NodeInfo>) -> Self {
        Self::ok(ResponseData::Lookup {
            found: node.is_some(),
            node,
        })
    }

    pub fn nodes(nodes: Vec<NodeInfo>) -> Self {
        Self::ok(ResponseData::Nodes { nodes })
    }

    pub fn param(value: impl Into<String>) -> Self {
        Self::ok(ResponseData::Param {
            value: value.into(),
        })
    }
}
