//! End-to-end silhouette fitting: render, compare to a box target, step.

use meshgrad::core::MeshBatch;
use meshgrad::optim::{fit_silhouette, rect_target, FitConfig, Optimizer};
use meshgrad::{Camera, RenderSettings};
use nalgebra::Vector3;

fn square(half: f32) -> MeshBatch {
    MeshBatch::single(
        vec![
            Vector3::new(-half, -half, 0.0),
            Vector3::new(half, -half, 0.0),
            Vector3::new(half, half, 0.0),
            Vector3::new(-half, half, 0.0),
        ],
        vec![[0, 1, 2], [0, 2, 3]],
    )
    .unwrap()
}

#[test]
fn test_sgd_fit_shrinks_loss_substantially() {
    let size = 64;
    let mut mesh = square(0.25);
    // Box target scaled down from the 256-pixel window [30, 225).
    let (lo, hi) = (30 * size / 256, 225 * size / 256);
    let target = rect_target(size, size, lo, hi, lo, hi);

    let cfg = FitConfig {
        settings: RenderSettings::new(size, size, 0.1, 100.0),
        camera: Camera::new(2.0, 0.0, 0.0, 45.0),
        iters: 80,
        lr: 1e-4,
        optimizer: Optimizer::Sgd,
        log_every: 0,
    };

    let before = mesh.vertices(0).to_vec();
    let out = fit_silhouette(&mut mesh, &target, &cfg).unwrap();

    let first = out.losses[0];
    let last = *out.losses.last().unwrap();
    assert!(first > 0.1, "initial mismatch should be large, got {first}");
    assert!(
        last < first * 0.5,
        "loss should at least halve: {first} -> {last}"
    );

    // The square had to grow to reach the target.
    let moved = mesh
        .vertices(0)
        .iter()
        .zip(&before)
        .any(|(a, b)| (a - b).norm() > 1e-3);
    assert!(moved, "vertices should have been updated");

    // Final silhouette covers more than the initial one.
    let count = |m: &meshgrad::MapBatch<u8>| -> usize {
        m.batch(0).iter().map(|&v| v as usize).sum()
    };
    assert!(count(&out.final_silhouette) > count(&out.initial_silhouette));
}

#[test]
fn test_adam_fit_also_converges() {
    let size = 48;
    // Start from a tilted square so no edge is axis aligned.
    let mut mesh = square(0.3);
    meshgrad::core::rotate_z(mesh.vertices_mut(0), 10.0);
    let (lo, hi) = (30 * size / 256, 225 * size / 256);
    let target = rect_target(size, size, lo, hi, lo, hi);

    let cfg = FitConfig {
        settings: RenderSettings::new(size, size, 0.1, 100.0),
        camera: Camera::new(2.0, 0.0, 0.0, 45.0),
        iters: 150,
        lr: 1e-2,
        optimizer: Optimizer::Adam,
        log_every: 0,
    };

    let out = fit_silhouette(&mut mesh, &target, &cfg).unwrap();
    let first = out.losses[0];
    let last = *out.losses.last().unwrap();
    assert!(last < first, "Adam should reduce the loss: {first} -> {last}");
    assert!(out.losses.iter().all(|l| l.is_finite()));
}
