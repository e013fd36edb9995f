//! Batched triangle meshes and the validation errors shared by the pipeline.

use nalgebra::Vector3;
use thiserror::Error;

/// Errors raised by argument validation across the rasterization pipeline.
///
/// These are all fatal to the call that raised them and are produced before
/// any pixel is processed; a failed call writes no partial output. Numeric
/// degeneracies (zero-area faces, zero-length edges) are deliberately *not*
/// errors: they are expected during optimization and are epsilon-guarded
/// inside the kernels instead.
#[derive(Debug, Error)]
pub enum RasterizeError {
    #[error("batch size mismatch: {0}")]
    BatchSizeMismatch(String),

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error(
        "face index out of bounds: batch {batch}, face {face} references vertex {vertex} \
         but the batch element has {num_vertices} vertices"
    )]
    FaceIndexOutOfBounds {
        batch: usize,
        face: usize,
        vertex: u32,
        num_vertices: usize,
    },

    #[error("invalid render settings: {0}")]
    InvalidSettings(String),
}

/// A batch of triangle meshes.
///
/// Per batch element: an ordered list of 3D vertex positions and a list of
/// vertex-index triples defining triangle winding. Face indices are
/// batch-local and validated on construction, so every downstream consumer
/// can gather without bounds checks.
#[derive(Clone, Debug)]
pub struct MeshBatch {
    vertices: Vec<Vec<Vector3<f32>>>,
    faces: Vec<Vec<[u32; 3]>>,
}

impl MeshBatch {
    /// Build a mesh batch, validating that every face index is in range for
    /// its batch element.
    pub fn new(
        vertices: Vec<Vec<Vector3<f32>>>,
        faces: Vec<Vec<[u32; 3]>>,
    ) -> Result<Self, RasterizeError> {
        if vertices.len() != faces.len() {
            return Err(RasterizeError::BatchSizeMismatch(format!(
                "{} vertex sets vs {} face sets",
                vertices.len(),
                faces.len()
            )));
        }
        for (bi, (verts, tris)) in vertices.iter().zip(&faces).enumerate() {
            for (fi, tri) in tris.iter().enumerate() {
                for &vi in tri {
                    if vi as usize >= verts.len() {
                        return Err(RasterizeError::FaceIndexOutOfBounds {
                            batch: bi,
                            face: fi,
                            vertex: vi,
                            num_vertices: verts.len(),
                        });
                    }
                }
            }
        }
        Ok(Self { vertices, faces })
    }

    /// Convenience constructor for a batch of one mesh.
    pub fn single(
        vertices: Vec<Vector3<f32>>,
        faces: Vec<[u32; 3]>,
    ) -> Result<Self, RasterizeError> {
        Self::new(vec![vertices], vec![faces])
    }

    pub fn batch_size(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_vertices(&self, batch: usize) -> usize {
        self.vertices[batch].len()
    }

    pub fn num_faces(&self, batch: usize) -> usize {
        self.faces[batch].len()
    }

    pub fn vertices(&self, batch: usize) -> &[Vector3<f32>] {
        &self.vertices[batch]
    }

    /// Mutable vertex access for the optimizer step. Face indices stay valid
    /// because only positions change, never the vertex count.
    pub fn vertices_mut(&mut self, batch: usize) -> &mut [Vector3<f32>] {
        &mut self.vertices[batch]
    }

    pub fn faces(&self, batch: usize) -> &[[u32; 3]] {
        &self.faces[batch]
    }

    /// All vertex sets, in the layout the camera and assembler consume.
    pub fn all_vertices(&self) -> &[Vec<Vector3<f32>>] {
        &self.vertices
    }

    /// All face-index sets.
    pub fn all_faces(&self) -> &[Vec<[u32; 3]>] {
        &self.faces
    }
}

/// Per-vertex gradient accumulator with the same shape as a mesh batch's
/// vertex sets.
///
/// The backward pass only ever adds into this; the caller is responsible for
/// zeroing it (or building a fresh one) before each backward call.
#[derive(Clone, Debug)]
pub struct VertexGrads {
    grads: Vec<Vec<Vector3<f32>>>,
}

impl VertexGrads {
    /// A zero-filled accumulator matching `mesh`'s vertex layout.
    pub fn zeros_like(mesh: &MeshBatch) -> Self {
        let grads = (0..mesh.batch_size())
            .map(|bi| vec![Vector3::zeros(); mesh.num_vertices(bi)])
            .collect();
        Self { grads }
    }

    pub fn batch_size(&self) -> usize {
        self.grads.len()
    }

    pub fn batch(&self, batch: usize) -> &[Vector3<f32>] {
        &self.grads[batch]
    }

    pub fn batch_mut(&mut self, batch: usize) -> &mut [Vector3<f32>] {
        &mut self.grads[batch]
    }

    pub fn zero(&mut self) {
        for g in &mut self.grads {
            for v in g.iter_mut() {
                *v = Vector3::zeros();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_mesh_batch() {
        let mesh = MeshBatch::single(
            vec![
                Vector3::new(0.0, 0.0, 1.0),
                Vector3::new(1.0, 0.0, 1.0),
                Vector3::new(0.0, 1.0, 1.0),
            ],
            vec![[0, 1, 2]],
        )
        .unwrap();
        assert_eq!(mesh.batch_size(), 1);
        assert_eq!(mesh.num_vertices(0), 3);
        assert_eq!(mesh.num_faces(0), 1);
    }

    #[test]
    fn test_face_index_out_of_bounds_is_fatal() {
        let err = MeshBatch::single(
            vec![Vector3::zeros(), Vector3::zeros(), Vector3::zeros()],
            vec![[0, 1, 3]],
        )
        .unwrap_err();
        match err {
            RasterizeError::FaceIndexOutOfBounds {
                vertex,
                num_vertices,
                ..
            } => {
                assert_eq!(vertex, 3);
                assert_eq!(num_vertices, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_batch_size_mismatch() {
        let err = MeshBatch::new(vec![vec![Vector3::zeros()]], vec![]).unwrap_err();
        assert!(matches!(err, RasterizeError::BatchSizeMismatch(_)));
    }

    #[test]
    fn test_vertex_grads_shape_and_zeroing() {
        let mesh = MeshBatch::single(
            vec![Vector3::zeros(), Vector3::zeros(), Vector3::zeros()],
            vec![[0, 1, 2]],
        )
        .unwrap();
        let mut grads = VertexGrads::zeros_like(&mesh);
        assert_eq!(grads.batch(0).len(), 3);
        grads.batch_mut(0)[1] = Vector3::new(1.0, 2.0, 3.0);
        grads.zero();
        assert_eq!(grads.batch(0)[1], Vector3::zeros());
    }
}
