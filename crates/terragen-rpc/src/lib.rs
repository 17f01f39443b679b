//! Bridge protocol for driving a terrain host's node graph over TCP
//!
//! Talk to a running host:
//! ```ignore
//! let mut client = HostClient::new("127.0.0.1:36492");
//! let root = client.root()?;
//! ```
//!
//! Or serve a node graph yourself:
//! ```ignore
//! let handler = Arc::new(Mutex::new(MyHandler::new()));
//! let _server = HostServer::start(handler, 36492);
//! ```

pub mod client;
pub mod protocol;
pub mod server;

pub use client::{HostClient, RpcError};
pub use protocol::*;
pub use server::{HostHandler, HostServer};

/// Default bridge port
pub const DEFAULT_PORT: u16 = 36492;
