//! Forward rendering pipeline: face assembly, silhouette rasterization, and
//! debug image conversion.

mod assemble;
pub mod display;
mod forward;

pub use assemble::{assemble_face_vertices, FaceVertices};
pub use forward::{rasterize_silhouette, RasterOutputs, RenderSettings};
