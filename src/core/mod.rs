//! Fundamental data structures: mesh batches, the camera, dense per-pixel
//! map grids, and shared 2D geometry utilities.

mod camera;
mod map;
pub mod math;
mod mesh;

pub use camera::{rotate_z, Camera};
pub use map::MapBatch;
pub use mesh::{MeshBatch, RasterizeError, VertexGrads};
