//! Silhouette-loss preparation and vertex optimization.

pub mod adam;
pub mod loss;
pub mod trainer;

pub use adam::AdamVec3;
pub use loss::{rect_target, silhouette_loss_and_grad};
pub use trainer::{fit_silhouette, FitConfig, FitOutputs, Optimizer};
