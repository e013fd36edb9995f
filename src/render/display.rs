//! Convert raster maps to grayscale images for debugging and for the viewer
//! bridge.

use crate::core::MapBatch;
use image::GrayImage;

/// Silhouette mask (`{0,1}`) of one batch element as a `{0,255}` image.
pub fn silhouette_to_gray(mask: &MapBatch<u8>, batch: usize) -> GrayImage {
    let (w, h) = (mask.width() as u32, mask.height() as u32);
    let data = mask
        .batch(batch)
        .iter()
        .map(|&s| if s != 0 { 255u8 } else { 0u8 })
        .collect();
    GrayImage::from_raw(w, h, data).expect("silhouette buffer matches image size")
}

/// Depth map of one batch element as an inverted grayscale image: near is
/// bright, the `far` background is black.
pub fn depth_to_gray(depth: &MapBatch<f32>, batch: usize, near: f32, far: f32) -> GrayImage {
    let (w, h) = (depth.width() as u32, depth.height() as u32);
    let span = (far - near).max(f32::EPSILON);
    let data = depth
        .batch(batch)
        .iter()
        .map(|&z| {
            let t = 1.0 - (z - near) / span;
            (t.clamp(0.0, 1.0) * 255.0).round() as u8
        })
        .collect();
    GrayImage::from_raw(w, h, data).expect("depth buffer matches image size")
}

/// Signed per-pixel gradient contributions as a magnitude image, normalized
/// to the largest absolute value in the batch element.
pub fn grad_map_to_gray(grad: &MapBatch<f32>, batch: usize) -> GrayImage {
    let (w, h) = (grad.width() as u32, grad.height() as u32);
    let peak = grad
        .batch(batch)
        .iter()
        .fold(0.0f32, |m, &g| m.max(g.abs()))
        .max(f32::EPSILON);
    let data = grad
        .batch(batch)
        .iter()
        .map(|&g| ((g.abs() / peak) * 255.0).round() as u8)
        .collect();
    GrayImage::from_raw(w, h, data).expect("gradient buffer matches image size")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silhouette_scaling() {
        let mut mask = MapBatch::filled(1, 2, 2, 0u8);
        *mask.at_mut(0, 1, 0) = 1;
        let img = silhouette_to_gray(&mask, 0);
        assert_eq!(img.get_pixel(0, 1).0[0], 255);
        assert_eq!(img.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn test_depth_inversion() {
        let mut depth = MapBatch::filled(1, 1, 2, 1.0f32);
        *depth.at_mut(0, 0, 0) = 0.0;
        let img = depth_to_gray(&depth, 0, 0.0, 1.0);
        assert_eq!(img.get_pixel(0, 0).0[0], 255);
        assert_eq!(img.get_pixel(1, 0).0[0], 0);
    }

    #[test]
    fn test_grad_normalization_handles_all_zero() {
        let grad = MapBatch::filled(1, 2, 2, 0.0f32);
        let img = grad_map_to_gray(&grad, 0);
        assert!(img.pixels().all(|p| p.0[0] == 0));
    }
}
