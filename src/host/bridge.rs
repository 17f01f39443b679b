//! Serve any [`TerrainHost`] over the bridge protocol.

use std::sync::Arc;

use terragen_rpc::{HostCommand, HostHandler, HostResponse, ResponseData};

use super::{HostError, Node, TerrainHost};

/// Answers bridge commands from a [`TerrainHost`].
pub struct HostBridge<H: TerrainHost> {
    host: Arc<H>,
}

impl<H: TerrainHost> HostBridge<H> {
    pub fn new(host: Arc<H>) -> Self {
        Self { host }
    }

    fn node(&self, path: &str) -> Result<Node, HostError> {
        self.host
            .node_by_path(path)?
            .ok_or_else(|| HostError::NoSuchNode(path.to_string()))
    }

    fn dispatch(&self, cmd: HostCommand) -> Result<HostResponse, HostError> {
        let host = &self.host;
        Ok(match cmd {
            HostCommand::Ping => HostResponse::pong(),
            HostCommand::Root => HostResponse::lookup(Some(host.root()?)),
            HostCommand::NodeByPath { path } => HostResponse::lookup(host.node_by_path(&path)?),
            HostCommand::Children { path } => HostResponse::nodes(host.children(&self.node(&path)?)?),
            HostCommand::ChildrenByClass { path, class } => {
                HostResponse::nodes(host.children_by_class(&self.node(&path)?, &class)?)
            }
            HostCommand::CreateChild { parent, class } => {
                HostResponse::lookup(host.create_child(&self.node(&parent)?, &class)?)
            }
            HostCommand::GetParam { path, param } => HostResponse::param(host.get_param(&self.node(&path)?, &param)?),
            HostCommand::SetParam { path, param, value } => {
                host.set_param(&self.node(&path)?, &param, &value)?;
                HostResponse::none()
            }
            HostCommand::ParamNames { path } => HostResponse::ok(ResponseData::ParamNames {
                params: host.param_names(&self.node(&path)?)?,
            }),
        })
    }
}

impl<H: TerrainHost + 'static> HostHandler for HostBridge<H> {
    fn handle_command(&mut self, cmd: HostCommand) -> HostResponse {
        self.dispatch(cmd).unwrap_or_else(|e| {
            log::debug!("Bridge command failed: {}", e);
            HostResponse::error(e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;

    #[test]
    fn test_dispatch_round() {
        let mut bridge = HostBridge::new(Arc::new(MemoryHost::default_scene()));
        let resp = bridge.handle_command(HostCommand::ChildrenByClass {
            path: "/".into(),
            class: "planet".into(),
        });
        match resp {
            HostResponse::Ok {
                data: ResponseData::Nodes { nodes },
            } => assert_eq!(nodes[0].path, "/Planet 01"),
            other => panic!("unexpected response: {:?}", other),
        }

        let resp = bridge.handle_command(HostCommand::SetParam {
            path: "/Planet 01".into(),
            param: "surface_shader".into(),
            value: "/Compute Terrain".into(),
        });
        assert_eq!(resp, HostResponse::none());
        let resp = bridge.handle_command(HostCommand::GetParam {
            path: "Planet 01".into(),
            param: "surface_shader".into(),
        });
        assert_eq!(resp, HostResponse::param("/Compute Terrain"));
    }

    #[test]
    fn test_errors_become_error_responses() {
        let mut bridge = HostBridge::new(Arc::new(MemoryHost::new()));
        let resp = bridge.handle_command(HostCommand::GetParam {
            path: "/Missing".into(),
            param: "x".into(),
        });
        assert!(matches!(resp, HostResponse::Error { ref message } if message.contains("/Missing")));
        assert_eq!(
            bridge.handle_command(HostCommand::NodeByPath { path: "/Missing".into() }),
            HostResponse::lookup(None)
        );
    }
}
