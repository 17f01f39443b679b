//! Post-processing for generated rasters.
//!
//! A fixed pipeline replaces model-written processing code: centre-crop to a
//! square, resize, blur, then stretch the value range.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, RgbImage};

use crate::config::HeightmapConfig;

/// Largest centred square inside the image.
pub fn center_crop_square(img: &DynamicImage) -> DynamicImage {
    let (w, h) = (img.width(), img.height());
    let side = w.min(h);
    if side == 0 || w == h {
        return img.clone();
    }
    img.crop_imm((w - side) / 2, (h - side) / 2, side, side)
}

/// Stretch values so the darkest pixel is 0 and the brightest 255.
/// Flat images are left untouched.
pub fn normalize(gray: &mut GrayImage) {
    let (min, max) = gray
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));
    if max <= min {
        return;
    }
    let range = (max - min) as f32;
    for p in gray.pixels_mut() {
        p[0] = (((p[0] - min) as f32 / range) * 255.0).round() as u8;
    }
}

/// Grayscale heightmap: crop → resize → blur → normalize.
pub fn process_heightmap(img: &DynamicImage, cfg: &HeightmapConfig) -> GrayImage {
    let square = center_crop_square(img);
    let resized = square.resize_exact(cfg.size, cfg.size, FilterType::Lanczos3);
    let blurred = if cfg.blur_sigma > 0.0 {
        resized.blur(cfg.blur_sigma)
    } else {
        resized
    };
    let mut gray = blurred.to_luma8();
    if cfg.normalize {
        normalize(&mut gray);
    }
    gray
}

/// RGB texture: crop → resize. Colours are kept as generated.
pub fn process_texture(img: &DynamicImage, size: u32) -> RgbImage {
    center_crop_square(img)
        .resize_exact(size, size, FilterType::Lanczos3)
        .to_rgb8()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    #[test]
    fn test_crop_is_centered() {
        let mut img = RgbImage::from_pixel(30, 10, Rgb([0, 0, 0]));
        img.put_pixel(10, 0, Rgb([255, 0, 0]));
        let cropped = center_crop_square(&DynamicImage::ImageRgb8(img)).to_rgb8();
        assert_eq!(cropped.dimensions(), (10, 10));
        assert_eq!(cropped.get_pixel(0, 0), &Rgb([255, 0, 0]));
    }

    #[test]
    fn test_normalize_stretches_range() {
        let mut gray = GrayImage::from_fn(4, 1, |x, _| Luma([100 + x as u8 * 10]));
        normalize(&mut gray);
        assert_eq!(gray.get_pixel(0, 0)[0], 0);
        assert_eq!(gray.get_pixel(3, 0)[0], 255);
    }

    #[test]
    fn test_normalize_flat_image_untouched() {
        let mut gray = GrayImage::from_pixel(3, 3, Luma([77]));
        normalize(&mut gray);
        assert!(gray.pixels().all(|p| p[0] == 77));
    }

    #[test]
    fn test_heightmap_pipeline_shape() {
        let src = DynamicImage::ImageRgb8(RgbImage::from_fn(64, 32, |x, _| {
            Rgb([(x * 4) as u8, (x * 4) as u8, (x * 4) as u8])
        }));
        let cfg = HeightmapConfig {
            size: 16,
            blur_sigma: 0.5,
            normalize: true,
        };
        let hm = process_heightmap(&src, &cfg);
        assert_eq!(hm.dimensions(), (16, 16));
        let max = hm.pixels().map(|p| p[0]).max().unwrap();
        let min = hm.pixels().map(|p| p[0]).min().unwrap();
        assert_eq!((min, max), (0, 255));
    }

    #[test]
    fn test_texture_pipeline_shape() {
        let src = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 20, Rgb([10, 200, 30])));
        let tex = process_texture(&src, 8);
        assert_eq!(tex.dimensions(), (8, 8));
    }
}
