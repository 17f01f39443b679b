//! Blocking bridge client
//!
//! The connection is opened lazily on the first command. A transport failure
//! drops the connection so the next command reconnects; the failed command
//! itself is not resent.

use std::io::{self, BufRead, BufReader, Write};
use std::net::TcpStream;

use thiserror::Error;

use crate::protocol::{HostCommand, HostResponse, NodeInfo, ResponseData};

/// Errors raised by the bridge client
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("Cannot connect to terrain host at {addr}. Is it running? Error: {source}")]
    Connect { addr: String, source: io::Error },

    #[error("Transport error: {0}")]
    Transport(#[from] io::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] serde_json::Error),

    #[error("Host closed the connection")]
    Closed,

    #[error("Host error: {0}")]
    Host(String),

    #[error("Unexpected response to {cmd}: {data:?}")]
    UnexpectedResponse { cmd: &'static str, data: ResponseData },
}

struct Connection {
    writer: TcpStream,
    reader: BufReader<TcpStream>,
}

impl Connection {
    fn connect(addr: &str) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Self {
            writer: stream,
            reader,
        })
    }

    fn send_command(&mut self, cmd: &HostCommand) -> Result<HostResponse, RpcError> {
        let mut json_str = serde_json::to_string(cmd)?;
        json_str.push('\n');
        self.writer.write_all(json_str.as_bytes())?;
        self.writer.flush()?;

        let mut response_line = String::new();
        if self.reader.read_line(&mut response_line)? == 0 {
            return Err(RpcError::Closed);
        }
        Ok(serde_json::from_str(response_line.trim())?)
    }
}

/// Client for a host bridge listening on `addr`
pub struct HostClient {
    addr: String,
    conn: Option<Connection>,
}

impl HostClient {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            conn: None,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Send a raw command and unwrap the status envelope.
    pub fn send(&mut self, cmd: &HostCommand) -> Result<ResponseData, RpcError> {
        if self.conn.is_none() {
            let conn = Connection::connect(&self.addr).map_err(|source| RpcError::Connect {
                addr: self.addr.clone(),
                source,
            })?;
            self.conn = Some(conn);
        }

        let result = match self.conn.as_mut() {
            Some(conn) => conn.send_command(cmd),
            None => Err(RpcError::Closed),
        };

        match result {
            Ok(HostResponse::Ok { data }) => Ok(data),
            Ok(HostResponse::Error { message }) => Err(RpcError::Host(message)),
            Err(e) => {
                log::warn!("Bridge connection dropped: {}", e);
                self.conn = None;
                Err(e)
            }
        }
    }

    pub fn ping(&mut self) -> Result<String, RpcError> {
        match self.send(&HostCommand::Ping)? {
            ResponseData::Pong { message } => Ok(message),
            data => Err(RpcError::UnexpectedResponse { cmd: "Ping", data }),
        }
    }

    pub fn root(&mut self) -> Result<Option<NodeInfo>, RpcError> {
        self.lookup("Root", HostCommand::Root)
    }

    pub fn node_by_path(&mut self, path: &str) -> Result<Option<NodeInfo>, RpcError> {
        self.lookup(
            "NodeByPath",
            HostCommand::NodeByPath {
                path: path.to_string(),
            },
        )
    }

    pub fn children(&mut self, path: &str) -> Result<Vec<NodeInfo>, RpcError> {
        self.node_list(
            "Children",
            HostCommand::Children {
                path: path.to_string(),
            },
        )
    }

    pub fn children_by_class(&mut self, path: &str, class: &str) -> Result<Vec<NodeInfo>, RpcError> {
        self.node_list(
            "ChildrenByClass",
            HostCommand::ChildrenByClass {
                path: path.to_string(),
                class: class.to_string(),
            },
        )
    }

    pub fn create_child(&mut self, parent: &str, class: &str) -> Result<Option<NodeInfo>, RpcError> {
        self.lookup(
            "CreateChild",
            HostCommand::CreateChild {
                parent: parent.to_string(),
                class: class.to_string(),
            },
        )
    }

    pub fn get_param(&mut self, path: &str, param: &str) -> Result<String, RpcError> {
        let cmd = HostCommand::GetParam {
            path: path.to_string(),
            param: param.to_string(),
        };
        match self.send(&cmd)? {
            ResponseData::Param { value } => Ok(value),
            data => Err(RpcError::UnexpectedResponse { cmd: "GetParam", data }),
        }
    }

    pub fn set_param(&mut self, path: &str, param: &str, value: &str) -> Result<(), RpcError> {
        let cmd = HostCommand::SetParam {
            path: path.to_string(),
            param: param.to_string(),
            value: value.to_string(),
        };
        self.send(&cmd).map(|_| ())
    }

    pub fn param_names(&mut self, path: &str) -> Result<Vec<String>, RpcError> {
        let cmd = HostCommand::ParamNames {
            path: path.to_string(),
        };
        match self.send(&cmd)? {
            ResponseData::ParamNames { params } => Ok(params),
            data => Err(RpcError::UnexpectedResponse {
                cmd: "ParamNames",
                data,
            }),
        }
    }

    fn lookup(&mut self, name: &'static str, cmd: HostCommand) -> Result<Option<NodeInfo>, RpcError> {
        match self.send(&cmd)? {
            ResponseData::Lookup { found: true, node } => Ok(node),
            ResponseData::Lookup { found: false, .. } => Ok(None),
            data => Err(RpcError::UnexpectedResponse { cmd: name, data }),
        }
    }

    fn node_list(&mut self, name: &'static str, cmd: HostCommand) -> Result<Vec<NodeInfo>, RpcError> {
        match self.send(&cmd)? {
            ResponseData::Nodes { nodes } => Ok(nodes),
            data => Err(RpcError::UnexpectedResponse { cmd: name, data }),
        }
    }
}
