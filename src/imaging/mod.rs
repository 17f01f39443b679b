//! Image payloads, post-processing and output files

pub mod output;
pub mod payload;
pub mod postprocess;

pub use output::{OutputKind, output_path, save_heightmap, save_json, save_texture, timestamp};
pub use payload::{ImagePayload, encode_payload, image_to_payload, load_payloads};
pub use postprocess::{center_crop_square, normalize, process_heightmap, process_texture};
