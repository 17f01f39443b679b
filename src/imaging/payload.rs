//! Reference image → model request payload.

use std::io::Cursor;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::{DynamicImage, ImageFormat};

use crate::core::Result;

pub const JPEG_MIME: &str = "image/jpeg";

/// Base64 image data ready for an inline request part.
#[derive(Clone, Debug, PartialEq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: String,
}

/// Decode an image file and re-encode it as RGB JPEG base64.
pub fn image_to_payload(path: &Path) -> Result<ImagePayload> {
    let img = image::open(path)?;
    encode_payload(&img)
}

/// Grayscale and alpha inputs are flattened to RGB first; JPEG has no alpha.
pub fn encode_payload(img: &DynamicImage) -> Result<ImagePayload> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut bytes = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)?;
    Ok(ImagePayload {
        mime_type: JPEG_MIME.to_string(),
        data: BASE64.encode(bytes),
    })
}

/// Load every readable image, skipping (and logging) the ones that fail.
pub fn load_payloads<P: AsRef<Path>>(paths: &[P]) -> Vec<ImagePayload> {
    let mut payloads = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.as_ref();
        match image_to_payload(path) {
            Ok(p) => payloads.push(p),
            Err(e) => log::warn!("Failed to load {}: {}", path.display(), e),
        }
    }
    payloads
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ColorType, GrayImage, Luma, Rgba, RgbaImage};
    use tempfile::TempDir;

    fn decode(payload: &ImagePayload) -> DynamicImage {
        let bytes = BASE64.decode(&payload.data).expect("valid base64");
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
        image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg).expect("valid jpeg")
    }

    #[test]
    fn test_grayscale_becomes_rgb_jpeg() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("gray.png");
        GrayImage::from_pixel(16, 8, Luma([120])).save(&path).unwrap();

        let payload = image_to_payload(&path).unwrap();
        assert_eq!(payload.mime_type, "image/jpeg");
        let img = decode(&payload);
        assert_eq!(img.color(), ColorType::Rgb8);
        assert_eq!((img.width(), img.height()), (16, 8));
    }

    #[test]
    fn test_alpha_becomes_rgb_jpeg() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("alpha.png");
        RgbaImage::from_pixel(10, 10, Rgba([200, 10, 10, 64])).save(&path).unwrap();

        let img = decode(&image_to_payload(&path).unwrap());
        assert_eq!(img.color(), ColorType::Rgb8);
    }

    #[test]
    fn test_unreadable_files_are_skipped() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let good = temp_dir.path().join("good.png");
        GrayImage::from_pixel(4, 4, Luma([1])).save(&good).unwrap();
        let bad = temp_dir.path().join("bad.png");
        std::fs::write(&bad, b"not an image").unwrap();

        let payloads = load_payloads(&[bad, good]);
        assert_eq!(payloads.len(), 1);
    }
}
