//! Face assembler: gather per-face vertex triples from flat vertex and index
//! batches.

use crate::core::RasterizeError;
use nalgebra::Vector3;

/// Projected vertex positions gathered per face: shape `(batch, F, 3, 3)`.
///
/// Derived data, rebuilt by [`assemble_face_vertices`] on every call and
/// never persisted across calls.
#[derive(Clone, Debug)]
pub struct FaceVertices {
    batches: Vec<Vec<[Vector3<f32>; 3]>>,
}

impl FaceVertices {
    pub fn batch_size(&self) -> usize {
        self.batches.len()
    }

    pub fn num_faces(&self, batch: usize) -> usize {
        self.batches[batch].len()
    }

    pub fn faces(&self, batch: usize) -> &[[Vector3<f32>; 3]] {
        &self.batches[batch]
    }
}

/// Gather the three projected vertex positions of every face.
///
/// `vertices` is the projected `(batch, V, 3)` set, `faces` the `(batch, F,
/// 3)` index triples. Every face index must be `< V` for its batch element;
/// a violation is a fatal precondition error raised before any gather, not a
/// clamped value.
pub fn assemble_face_vertices(
    vertices: &[Vec<Vector3<f32>>],
    faces: &[Vec<[u32; 3]>],
) -> Result<FaceVertices, RasterizeError> {
    if vertices.len() != faces.len() {
        return Err(RasterizeError::BatchSizeMismatch(format!(
            "{} vertex sets vs {} face sets",
            vertices.len(),
            faces.len()
        )));
    }
    for (bi, (verts, tris)) in vertices.iter().zip(faces).enumerate() {
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

    let batches = vertices
        .iter()
        .zip(faces)
        .map(|(verts, tris)| {
            tris.iter()
                .map(|tri| {
                    [
                        verts[tri[0] as usize],
                        verts[tri[1] as usize],
                        verts[tri[2] as usize],
                    ]
                })
                .collect()
        })
        .collect();

    Ok(FaceVertices { batches })
}
