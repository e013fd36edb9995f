//! Shared 2D geometry utilities: NDC/pixel mapping and edge functions.
//!
//! The image is addressed two ways. Pixel coordinates run from the top-left
//! corner, `x` rightward and `y` downward. Normalized device coordinates
//! (NDC) span `[-1, 1]` on both axes with `y` pointing *up*, so a pixel row
//! maps to NDC with a sign flip.

use nalgebra::Vector2;

/// Denominator guard for degenerate triangles and edges. Faces that approach
/// zero area during optimization are skipped, never raised.
pub const GEOM_EPS: f32 = 1e-10;

/// Map a pixel index to NDC: `2 * (p / (size - 1) - 0.5)`.
///
/// Pixel `0` maps to `-1` and pixel `size - 1` maps to `+1`. The caller flips
/// the sign for the vertical axis.
#[inline]
pub fn ndc_from_pixel(p: usize, size: usize) -> f32 {
    2.0 * (p as f32 / (size as f32 - 1.0) - 0.5)
}

/// Map an NDC coordinate back to a clamped pixel index.
#[inline]
pub fn pixel_from_ndc(f: f32, size: usize) -> usize {
    let p = ((f + 1.0) * 0.5 * (size as f32 - 1.0)).round() as i64;
    p.clamp(0, size as i64 - 1) as usize
}

/// The NDC extent of one pixel step: `2 / (size - 1)`.
#[inline]
pub fn ndc_pixel_step(size: usize) -> f32 {
    2.0 / (size as f32 - 1.0)
}

/// Signed edge function for the directed edge `a -> b` evaluated at `p`:
///
/// ```text
/// E(p) = (p.y - a.y) * (b.x - a.x) - (p.x - a.x) * (b.y - a.y)
/// ```
///
/// Zero on the edge's line; positive on the interior side for a
/// counter-clockwise triangle. Used for both coverage testing and gradient
/// derivation (it is affine in `p` and in both endpoints).
#[inline]
pub fn edge_function(a: Vector2<f32>, b: Vector2<f32>, p: Vector2<f32>) -> f32 {
    (p.y - a.y) * (b.x - a.x) - (p.x - a.x) * (b.y - a.y)
}

/// Twice the signed area of triangle `(a, b, c)`; positive when the winding
/// `a -> b -> c` is counter-clockwise in NDC.
#[inline]
pub fn twice_signed_area(a: Vector2<f32>, b: Vector2<f32>, c: Vector2<f32>) -> f32 {
    (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)
}
