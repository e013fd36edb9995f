//! Forward rasterizer: per pixel, find the nearest valid front-facing
//! triangle.
//!
//! This is a brute-force per-face/per-pixel scan with no acceleration
//! structure. Determinism matters
//! more than speed here: given a fixed face scan order the outputs are
//! bit-identical across calls, including the tie-break at exactly equal
//! depths (strict `<`, so the first-encountered face wins).

use crate::core::math::{edge_function, ndc_from_pixel, twice_signed_area, GEOM_EPS};
use crate::core::{MapBatch, RasterizeError};
use crate::render::FaceVertices;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Call-time rasterization parameters: image size and depth window.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RenderSettings {
    pub width: usize,
    pub height: usize,

    /// Depth window. The window is strictly exclusive at both ends: a face
    /// depth `z` survives only if `near < z < far`. Interpolated depths at
    /// exactly `near` or `far` are rejected.
    pub near: f32,
    pub far: f32,
}

impl RenderSettings {
    pub fn new(width: usize, height: usize, near: f32, far: f32) -> Self {
        Self {
            width,
            height,
            near,
            far,
        }
    }

    pub fn validate(&self) -> Result<(), RasterizeError> {
        if self.width < 2 || self.height < 2 {
            return Err(RasterizeError::InvalidSettings(format!(
                "image size {}x{} is below the 2x2 minimum",
                self.width, self.height
            )));
        }
        if !self.near.is_finite() || !self.far.is_finite() || self.near >= self.far {
            return Err(RasterizeError::InvalidSettings(format!(
                "depth window ({}, {}) is empty or non-finite",
                self.near, self.far
            )));
        }
        Ok(())
    }
}

/// The three per-pixel maps the forward pass produces, all `(batch, H, W)`.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterOutputs {
    /// Index of the visible face per pixel; `-1` where nothing covers it.
    pub face_index: MapBatch<i32>,

    /// Interpolated depth per pixel; `far` (the background value) where the
    /// face index is `-1`, strictly inside `(near, far)` everywhere else.
    pub depth: MapBatch<f32>,

    /// Binary occupancy: `1` where the face index is not `-1`, else `0`.
    pub silhouette: MapBatch<u8>,
}

/// Rasterize a batch of assembled faces into face-index, depth, and
/// silhouette maps.
///
/// Per pixel and face, in scan order: back-face cull by 2D winding, bounding
/// reject on the NDC y/x ranges, three edge-function half-plane tests,
/// barycentric weights (clamped and renormalized after the coverage decision),
/// perspective-correct depth `1/z = sum(w_i / z_i)`, depth-window reject, and
/// a minimum-depth z-buffer update.
///
/// Degenerate faces are excluded by the winding and determinant guards and
/// never raise; argument validation happens before any pixel is touched.
pub fn rasterize_silhouette(
    face_vertices: &FaceVertices,
    settings: &RenderSettings,
) -> Result<RasterOutputs, RasterizeError> {
    settings.validate()?;

    let batch_size = face_vertices.batch_size();
    let (w, h) = (settings.width, settings.height);
    let mut face_index = MapBatch::filled(batch_size, h, w, -1i32);
    let mut depth = MapBatch::filled(batch_size, h, w, settings.far);
    let mut silhouette = MapBatch::filled(batch_size, h, w, 0u8);

    for bi in 0..batch_size {
        for (fi, tri) in face_vertices.faces(bi).iter().enumerate() {
            let a = Vector2::new(tri[0].x, tri[0].y);
            let b = Vector2::new(tri[1].x, tri[1].y);
            let c = Vector2::new(tri[2].x, tri[2].y);
            let (za, zb, zc) = (tri[0].z, tri[1].z, tri[2].z);

            // Clockwise winding is a back face; zero area is degenerate.
            // Both are skipped here.
            if twice_signed_area(a, b, c) <= 0.0 {
                continue;
            }

            let x_min = a.x.min(b.x).min(c.x);
            let x_max = a.x.max(b.x).max(c.x);
            let y_min = a.y.min(b.y).min(c.y);
            let y_max = a.y.max(b.y).max(c.y);

            // Barycentric linear system shared by every pixel of this face.
            let det = (b.y - c.y) * (a.x - c.x) + (c.x - b.x) * (a.y - c.y);
            if det.abs() < GEOM_EPS {
                continue;
            }

            for yi in 0..h {
                // Row order runs top to bottom; NDC y points up.
                let yf = -ndc_from_pixel(yi, h);
                if yf < y_min || yf > y_max {
                    continue;
                }
                for xi in 0..w {
                    let xf = ndc_from_pixel(xi, w);
                    if xf < x_min || xf > x_max {
                        continue;
                    }
                    let p = Vector2::new(xf, yf);

                    // Outside if the pixel fails any half-plane test. Pixels
                    // exactly on an edge pass for both adjacent faces; the
                    // z-buffer tie-break assigns exactly one.
                    if edge_function(a, b, p) < 0.0
                        || edge_function(b, c, p) < 0.0
                        || edge_function(c, a, p) < 0.0
                    {
                        continue;
                    }

                    // Barycentric weights, clamped and renormalized for
                    // interpolation stability only; the accept decision was
                    // made above.
                    let w1 = ((b.y - c.y) * (p.x - c.x) + (c.x - b.x) * (p.y - c.y)) / det;
                    let w2 = ((c.y - a.y) * (p.x - c.x) + (a.x - c.x) * (p.y - c.y)) / det;
                    let w3 = 1.0 - w1 - w2;
                    let (w1, w2, w3) = (
                        w1.clamp(0.0, 1.0),
                        w2.clamp(0.0, 1.0),
                        w3.clamp(0.0, 1.0),
                    );
                    let w_sum = w1 + w2 + w3;
                    if w_sum < GEOM_EPS {
                        continue;
                    }

                    // Perspective-correct depth.
                    let inv_z = (w1 / za + w2 / zb + w3 / zc) / w_sum;
                    let z = 1.0 / inv_z;
                    if !z.is_finite() {
                        continue;
                    }
                    if z <= settings.near || z >= settings.far {
                        continue;
                    }

                    // Strict `<`: the first face at an exact depth tie wins.
                    if z < depth.at(bi, yi, xi) {
                        *depth.at_mut(bi, yi, xi) = z;
                        *face_index.at_mut(bi, yi, xi) = fi as i32;
                        *silhouette.at_mut(bi, yi, xi) = 1;
                    }
                }
            }
        }
    }

    Ok(RasterOutputs {
        face_index,
        depth,
        silhouette,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::assemble_face_vertices;
    use nalgebra::Vector3;

    fn raster(
        vertices: Vec<Vector3<f32>>,
        faces: Vec<[u32; 3]>,
        settings: &RenderSettings,
    ) -> RasterOutputs {
        let fv = assemble_face_vertices(&[vertices], &[faces]).unwrap();
        rasterize_silhouette(&fv, settings).unwrap()
    }

    #[test]
    fn test_settings_validation() {
        assert!(RenderSettings::new(1, 16, 0.0, 1.0).validate().is_err());
        assert!(RenderSettings::new(16, 16, 1.0, 1.0).validate().is_err());
        assert!(RenderSettings::new(16, 16, f32::NAN, 1.0).validate().is_err());
        assert!(RenderSettings::new(16, 16, 0.0, 1.0).validate().is_ok());
    }

    #[test]
    fn test_depth_window_is_exclusive() {
        let settings = RenderSettings::new(8, 8, 0.0, 1.0);
        // Flat triangle exactly at the far plane: rejected everywhere.
        let out = raster(
            vec![
                Vector3::new(-4.0, -4.0, 1.0),
                Vector3::new(4.0, -4.0, 1.0),
                Vector3::new(0.0, 4.0, 1.0),
            ],
            vec![[0, 1, 2]],
            &settings,
        );
        assert!(out.silhouette.batch(0).iter().all(|&s| s == 0));
    }

    #[test]
    fn test_degenerate_face_is_skipped_quietly() {
        let settings = RenderSettings::new(8, 8, 0.0, 1.0);
        let v = Vector3::new(0.1, 0.1, 0.5);
        let out = raster(vec![v, v, v], vec![[0, 1, 2]], &settings);
        assert!(out.face_index.batch(0).iter().all(|&f| f == -1));
    }

    #[test]
    fn test_nearest_face_wins() {
        let settings = RenderSettings::new(16, 16, 0.0, 1.0);
        // Two full-viewport triangles, the second one closer.
        let vertices = vec![
            Vector3::new(-4.0, -4.0, 0.8),
            Vector3::new(4.0, -4.0, 0.8),
            Vector3::new(0.0, 4.0, 0.8),
            Vector3::new(-4.0, -4.0, 0.4),
            Vector3::new(4.0, -4.0, 0.4),
            Vector3::new(0.0, 4.0, 0.4),
        ];
        let out = raster(vertices, vec![[0, 1, 2], [3, 4, 5]], &settings);
        let center = out.face_index.at(0, 8, 8);
        assert_eq!(center, 1);
        assert!(out.depth.at(0, 8, 8) < 0.5);
    }
}
