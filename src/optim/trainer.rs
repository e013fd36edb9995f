//! Silhouette-fitting loop: render, compare to a target mask, backpropagate
//! to vertex positions, step.
//!
//! This is a single-view overfit loop. Gradients live in the projected NDC
//! coordinates of the vertices and are applied to the object-space positions
//! directly; with the orbit camera at identity rotation the two frames agree
//! up to a positive scale, which the learning rate absorbs.

use crate::core::{Camera, MapBatch, MeshBatch, VertexGrads};
use crate::diff::backward_silhouette;
use crate::optim::adam::AdamVec3;
use crate::optim::loss::silhouette_loss_and_grad;
use crate::render::{assemble_face_vertices, rasterize_silhouette, RenderSettings};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Optimizer {
    Sgd,
    Adam,
}

pub struct FitConfig {
    pub settings: RenderSettings,
    pub camera: Camera,
    pub iters: usize,
    pub lr: f32,
    pub optimizer: Optimizer,
    /// Print a loss line every this many iterations; 0 silences the loop.
    pub log_every: usize,
}

pub struct FitOutputs {
    /// Loss value per iteration, in order.
    pub losses: Vec<f32>,
    pub initial_silhouette: MapBatch<u8>,
    pub final_silhouette: MapBatch<u8>,
    pub final_depth: MapBatch<f32>,
    /// Debug gradient map from the last backward pass.
    pub final_grad_map: MapBatch<f32>,
}

/// Optimize the mesh's vertex positions so its rendered silhouette matches
/// `target`.
///
/// The mesh is updated in place. Every iteration runs the full pipeline from
/// scratch; nothing is cached between iterations, so each step is a pure
/// function of the current vertex positions.
pub fn fit_silhouette(
    mesh: &mut MeshBatch,
    target: &MapBatch<u8>,
    cfg: &FitConfig,
) -> anyhow::Result<FitOutputs> {
    if target.batch_size() != mesh.batch_size() {
        return Err(anyhow::anyhow!(
            "target batch size {} does not match mesh batch size {}",
            target.batch_size(),
            mesh.batch_size()
        ));
    }

    let mut grads = VertexGrads::zeros_like(mesh);
    let mut adams: Vec<AdamVec3> = (0..mesh.batch_size())
        .map(|_| AdamVec3::new(cfg.lr, 0.9, 0.999, 1e-8))
        .collect();

    let mut losses = Vec::with_capacity(cfg.iters);
    let mut initial_silhouette = None;
    let mut last_outputs = None;
    let mut last_grad_map = None;

    for iter in 0..cfg.iters {
        let projected = cfg.camera.project_batch(mesh.all_vertices());
        let face_vertices = assemble_face_vertices(&projected, mesh.all_faces())?;
        let outputs = rasterize_silhouette(&face_vertices, &cfg.settings)?;

        if initial_silhouette.is_none() {
            initial_silhouette = Some(outputs.silhouette.clone());
        }

        let (loss, upstream) = silhouette_loss_and_grad(&outputs.silhouette, target)?;
        losses.push(loss);

        grads.zero();
        let grad_map = backward_silhouette(
            mesh,
            &face_vertices,
            &outputs.face_index,
            &upstream,
            &cfg.settings,
            &mut grads,
        )?;

        for bi in 0..mesh.batch_size() {
            match cfg.optimizer {
                Optimizer::Sgd => {
                    let verts = mesh.vertices_mut(bi);
                    for (v, g) in verts.iter_mut().zip(grads.batch(bi)) {
                        *v -= g * cfg.lr;
                    }
                }
                Optimizer::Adam => {
                    adams[bi].step(mesh.vertices_mut(bi), grads.batch(bi));
                }
            }
        }

        if cfg.log_every > 0 && (iter % cfg.log_every == 0 || iter + 1 == cfg.iters) {
            println!("[fit] iter {:5}  loss {:.6}", iter, loss);
        }

        last_outputs = Some(outputs);
        last_grad_map = Some(grad_map);
    }

    // Render once more so the reported final state reflects the last step.
    let projected = cfg.camera.project_batch(mesh.all_vertices());
    let face_vertices = assemble_face_vertices(&projected, mesh.all_faces())?;
    let final_outputs = rasterize_silhouette(&face_vertices, &cfg.settings)?;

    let (h, w) = (cfg.settings.height, cfg.settings.width);
    Ok(FitOutputs {
        losses,
        initial_silhouette: initial_silhouette
            .or_else(|| last_outputs.map(|o| o.silhouette))
            .unwrap_or_else(|| final_outputs.silhouette.clone()),
        final_silhouette: final_outputs.silhouette,
        final_depth: final_outputs.depth,
        final_grad_map: last_grad_map
            .unwrap_or_else(|| MapBatch::filled(mesh.batch_size(), h, w, 0.0)),
    })
}
