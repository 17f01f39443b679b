//! terrain-ai - AI heightmaps and sky setups for a node-graph terrain host
//!
//! Reference photos go to a generative model for a heightmap (and optional
//! texture) or a structured sky/terrain analysis; results are post-processed
//! locally and wired into the host's node graph over the bridge protocol.

pub mod analysis;
pub mod config;
pub mod core;
pub mod credentials;
pub mod generation;
pub mod host;
pub mod imaging;
pub mod model;
pub mod sandbox;
pub mod session;
pub mod testing;
pub mod worker;
