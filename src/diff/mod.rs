//! Backward pass: edge-function gradients and the silhouette gradient
//! engine.

mod edge_grad;
mod silhouette_grad;

pub use edge_grad::{edge_function_with_grads, EdgeGrads};
pub use silhouette_grad::backward_silhouette;
