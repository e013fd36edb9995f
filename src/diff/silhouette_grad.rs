//! Backward gradient engine: per-vertex position gradients from a per-pixel
//! silhouette-loss gradient.
//!
//! Occupancy is piecewise constant in the vertices, so the true derivative is
//! zero almost everywhere. Instead, pixels on or near visibility boundaries
//! are given a boundary-sensitivity gradient: for each nearby triangle edge,
//! the closed-form partials of the edge function are scaled by the upstream
//! gradient and a finite pixel step, turning the edge's instantaneous
//! sensitivity into a usable signal. Summed over a boundary, the result
//! approximates the change in silhouette area per unit of vertex motion.
//!
//! Gradients are expressed in the projected NDC coordinates of the vertices,
//! the same space the rasterizer consumes.

use crate::core::math::{ndc_from_pixel, ndc_pixel_step};
use crate::core::{MapBatch, MeshBatch, RasterizeError, VertexGrads};
use crate::render::{FaceVertices, RenderSettings};
use nalgebra::{Vector2, Vector3};
use rayon::prelude::*;

/// Edges shorter than this (in NDC) are skipped; their distance and partials
/// are not meaningful.
const EDGE_EPS: f32 = 1e-6;

// Accumulation targets are shared across pixels whose triangles share
// vertices, so each worker owns private buffers that are merged at the end.
struct ThreadLocalGrads {
    d_vertices: Vec<Vector3<f32>>,
    debug: Vec<f32>,
}

impl ThreadLocalGrads {
    fn new(num_vertices: usize, num_pixels: usize) -> Self {
        Self {
            d_vertices: vec![Vector3::zeros(); num_vertices],
            debug: vec![0.0; num_pixels],
        }
    }
}

/// Accumulate per-vertex gradients from an upstream per-pixel silhouette
/// gradient, using the forward pass's face-index map as context.
///
/// `grad_vertices` must be zero-initialized by the caller; contributions are
/// purely additive, so the accumulation order does not affect the result
/// beyond floating-point rounding. Returns a per-pixel map of summed
/// contribution magnitudes for visualization.
///
/// A pixel contributes when its upstream gradient is nonzero and it sits on a
/// visibility boundary: its assigned face differs from a 4-neighbor's, or its
/// center lies within one NDC pixel step of an edge of a candidate face.
/// Pixels with the sentinel face index and no covered neighbor contribute
/// nothing.
pub fn backward_silhouette(
    mesh: &MeshBatch,
    face_vertices: &FaceVertices,
    face_index: &MapBatch<i32>,
    upstream: &MapBatch<f32>,
    settings: &RenderSettings,
    grad_vertices: &mut VertexGrads,
) -> Result<MapBatch<f32>, RasterizeError> {
    settings.validate()?;
    validate_shapes(mesh, face_vertices, face_index, upstream, settings, grad_vertices)?;

    let (w, h) = (settings.width, settings.height);
    let batch_size = mesh.batch_size();
    let mut debug = MapBatch::filled(batch_size, h, w, 0.0f32);

    // One pixel step in NDC decides which pixels count as "near" an edge,
    // and the band width 2*tol is the finite step standing in for the
    // undefined derivative of the coverage step function.
    let tol = ndc_pixel_step(w.min(h));
    let scale = 1.0 / (2.0 * tol);

    for bi in 0..batch_size {
        let faces = mesh.faces(bi);
        let triangles = face_vertices.faces(bi);
        let num_vertices = mesh.num_vertices(bi);

        let pixels: Vec<(usize, usize)> = (0..h)
            .flat_map(|yi| (0..w).map(move |xi| (xi, yi)))
            .collect();

        let partials: Vec<ThreadLocalGrads> = pixels
            .par_iter()
            .fold(
                || ThreadLocalGrads::new(num_vertices, w * h),
                |mut local, &(xi, yi)| {
                    let u = upstream.at(bi, yi, xi);
                    if u == 0.0 {
                        return local;
                    }

                    // The pixel's own face plus any differing neighbor faces.
                    let own = face_index.at(bi, yi, xi);
                    let mut candidates = [0i32; 5];
                    let mut n_candidates = 0usize;
                    if own >= 0 {
                        candidates[0] = own;
                        n_candidates = 1;
                    }
                    let neighbors = [
                        (xi.wrapping_sub(1), yi),
                        (xi + 1, yi),
                        (xi, yi.wrapping_sub(1)),
                        (xi, yi + 1),
                    ];
                    for (nx, ny) in neighbors {
                        if nx >= w || ny >= h {
                            continue;
                        }
                        let nf = face_index.at(bi, ny, nx);
                        if nf >= 0 && nf != own && !candidates[..n_candidates].contains(&nf) {
                            candidates[n_candidates] = nf;
                            n_candidates += 1;
                        }
                    }
                    if n_candidates == 0 {
                        return local;
                    }

                    let p = Vector2::new(ndc_from_pixel(xi, w), -ndc_from_pixel(yi, h));
                    let mut debug_sum = 0.0f32;

                    for &fi in &candidates[..n_candidates] {
                        let tri = &triangles[fi as usize];
                        let idx = faces[fi as usize];
                        for k in 0..3 {
                            let ia = idx[k] as usize;
                            let ib = idx[(k + 1) % 3] as usize;
                            let a = Vector2::new(tri[k].x, tri[k].y);
                            let b = Vector2::new(tri[(k + 1) % 3].x, tri[(k + 1) % 3].y);

                            let len = (b - a).norm();
                            if len < EDGE_EPS {
                                continue;
                            }

                            let g = super::edge_function_with_grads(a, b, p);
                            // Distance from the pixel center to the edge's
                            // line; only edges within one pixel step count.
                            if g.value.abs() / len > tol {
                                continue;
                            }

                            let s = u * scale / len;
                            local.d_vertices[ia].x += s * g.d_ax;
                            local.d_vertices[ia].y += s * g.d_ay;
                            local.d_vertices[ib].x += s * g.d_bx;
                            local.d_vertices[ib].y += s * g.d_by;
                            debug_sum +=
                                s.abs() * (g.d_ax.abs() + g.d_ay.abs() + g.d_bx.abs() + g.d_by.abs());
                        }
                    }

                    local.debug[yi * w + xi] += debug_sum;
                    local
                },
            )
            .collect();

        // Merge the per-worker buffers.
        let grads = grad_vertices.batch_mut(bi);
        let debug_out = debug.batch_mut(bi);
        for part in partials {
            for (g, d) in grads.iter_mut().zip(&part.d_vertices) {
                *g += *d;
            }
            for (o, d) in debug_out.iter_mut().zip(&part.debug) {
                *o += *d;
            }
        }
    }

    Ok(debug)
}

fn validate_shapes(
    mesh: &MeshBatch,
    face_vertices: &FaceVertices,
    face_index: &MapBatch<i32>,
    upstream: &MapBatch<f32>,
    settings: &RenderSettings,
    grad_vertices: &VertexGrads,
) -> Result<(), RasterizeError> {
    let batch_size = mesh.batch_size();
    if face_vertices.batch_size() != batch_size
        || face_index.batch_size() != batch_size
        || upstream.batch_size() != batch_size
        || grad_vertices.batch_size() != batch_size
    {
        return Err(RasterizeError::BatchSizeMismatch(format!(
            "mesh {}, face vertices {}, face index {}, upstream {}, grads {}",
            batch_size,
            face_vertices.batch_size(),
            face_index.batch_size(),
            upstream.batch_size(),
            grad_vertices.batch_size(),
        )));
    }
    if !face_index.same_shape(upstream) {
        return Err(RasterizeError::ShapeMismatch(
            "upstream gradient and face index map differ in shape".into(),
        ));
    }
    if face_index.width() != settings.width || face_index.height() != settings.height {
        return Err(RasterizeError::ShapeMismatch(format!(
            "face index map is {}x{} but settings say {}x{}",
            face_index.width(),
            face_index.height(),
            settings.width,
            settings.height
        )));
    }
    for bi in 0..batch_size {
        if face_vertices.num_faces(bi) != mesh.num_faces(bi) {
            return Err(RasterizeError::ShapeMismatch(format!(
                "batch {}: {} assembled faces vs {} mesh faces",
                bi,
                face_vertices.num_faces(bi),
                mesh.num_faces(bi)
            )));
        }
        if grad_vertices.batch(bi).len() != mesh.num_vertices(bi) {
            return Err(RasterizeError::ShapeMismatch(format!(
                "batch {}: gradient accumulator has {} entries for {} vertices",
                bi,
                grad_vertices.batch(bi).len(),
                mesh.num_vertices(bi)
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{assemble_face_vertices, rasterize_silhouette};

    fn square_mesh(x0: f32, x1: f32, y0: f32, y1: f32, z: f32) -> MeshBatch {
        MeshBatch::single(
            vec![
                Vector3::new(x0, y0, z),
                Vector3::new(x1, y0, z),
                Vector3::new(x1, y1, z),
                Vector3::new(x0, y1, z),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
        .unwrap()
    }

    #[test]
    fn test_zero_upstream_gives_zero_grads() {
        let mesh = square_mesh(-0.5, 0.5, -0.5, 0.5, 0.5);
        let settings = RenderSettings::new(32, 32, 0.0, 1.0);
        let fv = assemble_face_vertices(
            &[mesh.vertices(0).to_vec()],
            &[mesh.faces(0).to_vec()],
        )
        .unwrap();
        let out = rasterize_silhouette(&fv, &settings).unwrap();

        let upstream = MapBatch::filled(1, 32, 32, 0.0f32);
        let mut grads = VertexGrads::zeros_like(&mesh);
        let debug =
            backward_silhouette(&mesh, &fv, &out.face_index, &upstream, &settings, &mut grads)
                .unwrap();

        assert!(grads.batch(0).iter().all(|g| *g == Vector3::zeros()));
        assert!(debug.batch(0).iter().all(|&d| d == 0.0));
    }

    #[test]
    fn test_uncovered_image_contributes_nothing() {
        // No faces at all: every pixel holds the sentinel, nothing to do.
        let mesh = MeshBatch::single(vec![Vector3::new(0.0, 0.0, 0.5)], vec![]).unwrap();
        let settings = RenderSettings::new(16, 16, 0.0, 1.0);
        let fv = assemble_face_vertices(
            &[mesh.vertices(0).to_vec()],
            &[mesh.faces(0).to_vec()],
        )
        .unwrap();
        let out = rasterize_silhouette(&fv, &settings).unwrap();

        let upstream = MapBatch::filled(1, 16, 16, 1.0f32);
        let mut grads = VertexGrads::zeros_like(&mesh);
        backward_silhouette(&mesh, &fv, &out.face_index, &upstream, &settings, &mut grads)
            .unwrap();
        assert_eq!(grads.batch(0)[0], Vector3::zeros());
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let mesh = square_mesh(-0.5, 0.5, -0.5, 0.5, 0.5);
        let settings = RenderSettings::new(32, 32, 0.0, 1.0);
        let fv = assemble_face_vertices(
            &[mesh.vertices(0).to_vec()],
            &[mesh.faces(0).to_vec()],
        )
        .unwrap();
        let out = rasterize_silhouette(&fv, &settings).unwrap();

        let upstream = MapBatch::filled(1, 16, 16, 0.0f32);
        let mut grads = VertexGrads::zeros_like(&mesh);
        let err =
            backward_silhouette(&mesh, &fv, &out.face_index, &upstream, &settings, &mut grads)
                .unwrap_err();
        assert!(matches!(err, RasterizeError::ShapeMismatch(_)));
    }

    #[test]
    fn test_gradient_pushes_boundary_outward_for_negative_upstream() {
        // Upstream = rendered - target. With target fully on and the square
        // only partially covering, upstream is -1 outside the square, which
        // should pull the boundary outward: the right edge's x-gradients on
        // gradient *descent* (v -= g) must move +x, i.e. g.x < 0 for the
        // right-edge vertices.
        let mesh = square_mesh(-0.4, 0.4, -0.4, 0.4, 0.5);
        let settings = RenderSettings::new(64, 64, 0.0, 1.0);
        let fv = assemble_face_vertices(
            &[mesh.vertices(0).to_vec()],
            &[mesh.faces(0).to_vec()],
        )
        .unwrap();
        let out = rasterize_silhouette(&fv, &settings).unwrap();

        let mut upstream = MapBatch::filled(1, 64, 64, 0.0f32);
        for yi in 0..64 {
            for xi in 0..64 {
                let rendered = out.silhouette.at(0, yi, xi) as f32;
                *upstream.at_mut(0, yi, xi) = rendered - 1.0;
            }
        }

        let mut grads = VertexGrads::zeros_like(&mesh);
        backward_silhouette(&mesh, &fv, &out.face_index, &upstream, &settings, &mut grads)
            .unwrap();

        // Vertices 1 and 2 form the right edge (x = 0.4).
        assert!(grads.batch(0)[1].x < 0.0);
        assert!(grads.batch(0)[2].x < 0.0);
        // z never receives gradient.
        assert!(grads.batch(0).iter().all(|g| g.z == 0.0));
    }
}
