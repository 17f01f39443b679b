//! TCP bridge server

use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use crate::protocol::{HostCommand, HostResponse};

/// Trait that a node-graph owner implements to answer bridge commands
pub trait HostHandler: Send + Sync + 'static {
    fn handle_command(&mut self, cmd: HostCommand) -> HostResponse;
}

/// Bridge server handle - keep this alive to keep the server running
pub struct HostServer {
    handle: tokio::task::JoinHandle<()>,
}

impl HostServer {
    /// Start the bridge server on the given port.
    /// The handler is called for each incoming command.
    /// Returns immediately -- server runs in background.
    pub fn start(handler: Arc<Mutex<dyn HostHandler>>, port: u16) -> Self {
        let handle = tokio::spawn(async move {
            let addr = format!("127.0.0.1:{}", port);
            let listener = match TcpListener::bind(&addr).await {
                Ok(l) => {
                    log::info!("Host bridge listening on {}", addr);
                    l
                }
                Err(e) => {
                    log::error!("Failed to bind host bridge on {}: {}", addr, e);
                    return;
                }
            };
            serve(listener, handler).await;
        });

        Self { handle }
    }

    /// Start on an already-bound listener (port 0 in tests).
    pub fn start_with_listener(listener: TcpListener, handler: Arc<Mutex<dyn HostHandler>>) -> Self {
        let handle = tokio::spawn(serve(listener, handler));
        Self { handle }
    }

    /// Wait until the accept loop ends.
    pub async fn wait(self) {
        if let Err(e) = self.handle.await {
            log::error!("Host bridge task failed: {}", e);
        }
    }
}

async fn serve(listener: TcpListener, handler: Arc<Mutex<dyn HostHandler>>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                log::info!("Bridge client connected from {}", peer);
                let handler = handler.clone();
                tokio::spawn(async move {
                    handle_connection(stream, handler).await;
                    log::info!("Bridge client disconnected: {}", peer);
                });
            }
            Err(e) => {
                log::error!("Host bridge accept error: {}", e);
            }
        }
    }
}

/// Answer one request line. Malformed JSON is answered, not fatal.
async fn respond(line: &str, handler: &Mutex<dyn HostHandler>) -> String {
    let response = match serde_json::from_str::<HostCommand>(line) {
        Ok(cmd) => {
            log::debug!("Bridge command: {:?}", cmd);
            handler.lock().await.handle_command(cmd)
        }
        Err(e) => HostResponse::error(format!("Invalid command JSON: {}", e)),
    };
    let mut json = serde_json::to_string(&response).unwrap_or_else(|e| {
        serde_json::json!({"status": "error", "message": format!("Serialize error: {}", e)}).to_string()
    });
    json.push('\n');
    json
}

/// One JSON request per line, one JSON response per line, until EOF.
async fn handle_connection(stream: TcpStream, handler: Arc<Mutex<dyn HostHandler>>) {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                log::error!("Host bridge read error: {}", e);
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = respond(line, &handler).await;
        if let Err(e) = writer.write_all(reply.as_bytes()).await {
            log::error!("Host bridge write error: {}", e);
            break;
        }
    }
}
