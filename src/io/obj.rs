//! Wavefront OBJ mesh loading and export.
//!
//! Only the subset needed for silhouette fitting is handled: `v` positions
//! and `f` faces. Texture and normal references in face entries (`1/2/3`)
//! are parsed and discarded; polygons with more than three vertices are fan
//! triangulated.

use nalgebra::Vector3;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid OBJ at line {line}: {message}")]
    InvalidFormat { line: usize, message: String },

    #[error("Face at line {line} references vertex {index} but only {num_vertices} exist")]
    IndexOutOfRange {
        line: usize,
        index: i64,
        num_vertices: usize,
    },
}

/// Load vertex positions and triangulated faces from an OBJ file.
///
/// OBJ indices are 1-based; negative indices count back from the most
/// recently read vertex. Both are converted to 0-based `u32` triples.
pub fn load_obj(path: &Path) -> Result<(Vec<Vector3<f32>>, Vec<[u32; 3]>), LoadError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut vertices: Vec<Vector3<f32>> = Vec::new();
    let mut faces: Vec<[u32; 3]> = Vec::new();

    for (li, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = li + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        match parts.next() {
            Some("v") => {
                let mut coord = |name: &str| -> Result<f32, LoadError> {
                    parts
                        .next()
                        .ok_or_else(|| LoadError::InvalidFormat {
                            line: line_no,
                            message: format!("vertex missing {name} coordinate"),
                        })?
                        .parse::<f32>()
                        .map_err(|e| LoadError::InvalidFormat {
                            line: line_no,
                            message: format!("bad {name} coordinate: {e}"),
                        })
                };
                let x = coord("x")?;
                let y = coord("y")?;
                let z = coord("z")?;
                vertices.push(Vector3::new(x, y, z));
            }
            Some("f") => {
                let mut indices: Vec<u32> = Vec::with_capacity(4);
                for entry in parts {
                    // "7", "7/2", "7/2/5", "7//5" all name vertex 7.
                    let vert = entry.split('/').next().unwrap_or(entry);
                    let raw: i64 = vert.parse().map_err(|e| LoadError::InvalidFormat {
                        line: line_no,
                        message: format!("bad face index {entry:?}: {e}"),
                    })?;
                    let idx = if raw > 0 {
                        raw - 1
                    } else if raw < 0 {
                        vertices.len() as i64 + raw
                    } else {
                        return Err(LoadError::InvalidFormat {
                            line: line_no,
                            message: "face index 0 is not valid in OBJ".into(),
                        });
                    };
                    if idx < 0 || idx as usize >= vertices.len() {
                        return Err(LoadError::IndexOutOfRange {
                            line: line_no,
                            index: raw,
                            num_vertices: vertices.len(),
                        });
                    }
                    indices.push(idx as u32);
                }
                if indices.len() < 3 {
                    return Err(LoadError::InvalidFormat {
                        line: line_no,
                        message: format!("face has {} vertices, need at least 3", indices.len()),
                    });
                }
                for k in 1..indices.len() - 1 {
                    faces.push([indices[0], indices[k], indices[k + 1]]);
                }
            }
            // vn, vt, usemtl, o, g, s and friends are irrelevant here.
            _ => {}
        }
    }

    Ok((vertices, faces))
}

/// Write vertex positions and faces as a minimal OBJ file.
pub fn save_obj(
    path: &Path,
    vertices: &[Vector3<f32>],
    faces: &[[u32; 3]],
) -> Result<(), LoadError> {
    let file = File::create(path)?;
    let mut w = BufWriter::new(file);

    for v in vertices {
        writeln!(w, "v {} {} {}", v.x, v.y, v.z)?;
    }
    for f in faces {
        writeln!(w, "f {} {} {}", f[0] + 1, f[1] + 1, f[2] + 1)?;
    }
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_load_triangles_and_quads() {
        let f = write_temp(
            "# comment\n\
             v 0 0 0\n\
             v 1 0 0\n\
             v 1 1 0\n\
             v 0 1 0\n\
             vn 0 0 1\n\
             f 1 2 3\n\
             f 1/1 2/2/1 3//1 4\n",
        );
        let (verts, faces) = load_obj(f.path()).unwrap();
        assert_eq!(verts.len(), 4);
        // One triangle plus a fan-triangulated quad.
        assert_eq!(faces, vec![[0, 1, 2], [0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn test_negative_indices_resolve_backwards() {
        let f = write_temp("v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n");
        let (_, faces) = load_obj(f.path()).unwrap();
        assert_eq!(faces, vec![[0, 1, 2]]);
    }

    #[test]
    fn test_out_of_range_index_is_an_error() {
        let f = write_temp("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 9\n");
        let err = load_obj(f.path()).unwrap_err();
        assert!(matches!(err, LoadError::IndexOutOfRange { index: 9, .. }));
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let verts = vec![
            Vector3::new(-0.5, -0.5, 0.0),
            Vector3::new(0.5, -0.5, 0.0),
            Vector3::new(0.0, 0.5, 0.0),
        ];
        let faces = vec![[0u32, 1, 2]];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tri.obj");

        save_obj(&path, &verts, &faces).unwrap();
        let (v2, f2) = load_obj(&path).unwrap();
        assert_eq!(v2, verts);
        assert_eq!(f2, faces);
    }
}
