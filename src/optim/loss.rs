//! Silhouette loss and the upstream gradient it feeds backward.

use crate::core::{MapBatch, RasterizeError};

/// Squared-difference silhouette loss, returning `(loss, upstream)`.
///
/// Both masks hold `{0, 1}` occupancy. The loss is `mean((target -
/// rendered)^2)` over all pixels of all batch elements. The upstream map is
/// `rendered - target` per pixel: positive where the render overshoots the
/// target, negative where it undershoots, zero where they agree. Zero entries
/// let the backward pass skip matching pixels entirely.
pub fn silhouette_loss_and_grad(
    rendered: &MapBatch<u8>,
    target: &MapBatch<u8>,
) -> Result<(f32, MapBatch<f32>), RasterizeError> {
    if !rendered.same_shape(target) {
        return Err(RasterizeError::ShapeMismatch(format!(
            "rendered {}x{}x{} vs target {}x{}x{}",
            rendered.batch_size(),
            rendered.height(),
            rendered.width(),
            target.batch_size(),
            target.height(),
            target.width()
        )));
    }

    let (b, h, w) = (rendered.batch_size(), rendered.height(), rendered.width());
    let n = (b * h * w) as f32;
    let mut loss = 0.0f32;
    let mut upstream = MapBatch::filled(b, h, w, 0.0f32);

    for bi in 0..b {
        for yi in 0..h {
            for xi in 0..w {
                let r = rendered.at(bi, yi, xi) as f32;
                let t = target.at(bi, yi, xi) as f32;
                let diff = r - t;
                loss += diff * diff;
                *upstream.at_mut(bi, yi, xi) = diff;
            }
        }
    }

    Ok((loss / n, upstream))
}

/// An axis-aligned filled-rectangle target mask for a single-element batch.
///
/// Rows `y0..y1` and columns `x0..x1` (half-open) are set to 1, everything
/// else to 0. Ranges are clamped to the image.
pub fn rect_target(
    height: usize,
    width: usize,
    y0: usize,
    y1: usize,
    x0: usize,
    x1: usize,
) -> MapBatch<u8> {
    let mut target = MapBatch::filled(1, height, width, 0u8);
    for yi in y0..y1.min(height) {
        for xi in x0..x1.min(width) {
            *target.at_mut(0, yi, xi) = 1;
        }
    }
    target
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_masks_give_zero_loss() {
        let mask = rect_target(8, 8, 2, 6, 2, 6);
        let (loss, upstream) = silhouette_loss_and_grad(&mask, &mask).unwrap();
        assert_eq!(loss, 0.0);
        assert!(upstream.batch(0).iter().all(|&u| u == 0.0));
    }

    #[test]
    fn test_upstream_sign_tracks_mismatch_direction() {
        let rendered = rect_target(4, 4, 0, 2, 0, 4);
        let target = rect_target(4, 4, 2, 4, 0, 4);
        let (loss, upstream) = silhouette_loss_and_grad(&rendered, &target).unwrap();
        // Half the pixels overshoot, half undershoot.
        assert!((loss - 1.0).abs() < 1e-6);
        assert_eq!(upstream.at(0, 0, 0), 1.0);
        assert_eq!(upstream.at(0, 3, 0), -1.0);
    }

    #[test]
    fn test_shape_mismatch_is_an_error() {
        let a = rect_target(4, 4, 0, 2, 0, 2);
        let b = rect_target(4, 8, 0, 2, 0, 2);
        assert!(matches!(
            silhouette_loss_and_grad(&a, &b),
            Err(RasterizeError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_rect_target_clamps_to_image() {
        let t = rect_target(4, 4, 2, 100, 2, 100);
        assert_eq!(t.at(0, 3, 3), 1);
        assert_eq!(t.at(0, 0, 0), 0);
        assert_eq!(t.batch(0).iter().map(|&v| v as usize).sum::<usize>(), 4);
    }
}
