//! # meshgrad: differentiable silhouette rasterization for triangle meshes
//!
//! This crate renders batches of triangle meshes into per-pixel face-index,
//! depth, and silhouette maps, and propagates an image-space silhouette-loss
//! gradient back onto vertex positions. The rasterization operator is
//! piecewise constant in the vertices, so it has no analytic derivative;
//! the backward pass instead measures edge-function sensitivity at visibility
//! boundaries and turns it into a usable gradient signal.
//!
//! ## Architecture
//!
//! - `core`: fundamental data (mesh batches, camera, dense map grids, geometry)
//! - `render`: forward pipeline (face assembly, rasterization, debug images)
//! - `diff`: backward pass (edge-function gradients, silhouette gradients)
//! - `optim`: optimization (loss preparation, Adam, the outer fit loop)
//! - `io`: OBJ mesh load/save
//! - `viewer`: binary wire protocol for the remote visualization process
//!
//! The forward and backward passes are explicit pure functions; composing them
//! with an optimizer is the caller's responsibility (`optim::fit_silhouette`
//! shows the intended loop).

// Core data structures and math
pub mod core;

// Differentiable operations (backward pass)
pub mod diff;

// Mesh file I/O
pub mod io;

// Optimization (loss, Adam, fit loop)
pub mod optim;

// Forward rendering pipeline
pub mod render;

// Viewer bridge wire format
pub mod viewer;

// Re-export commonly used types at crate root for convenience
pub use crate::core::{Camera, MapBatch, MeshBatch, RasterizeError};
pub use crate::render::{rasterize_silhouette, RasterOutputs, RenderSettings};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
