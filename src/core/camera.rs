//! Camera model: object rotation, camera-space transform, and perspective
//! projection into NDC.
//!
//! This is the pipeline stage in front of the rasterizer. It is a pure
//! function of its inputs and holds no per-call state; all parameters are
//! supplied at call time.

use nalgebra::{Rotation3, Vector3};
use serde::{Deserialize, Serialize};

/// A simple orbiting perspective camera.
///
/// The object is rotated by Euler angles around its origin, pushed
/// `distance` units along `+z`, and perspective-projected. After projection,
/// `x`/`y` are NDC coordinates and `z` is the untouched camera-space depth
/// (larger is farther); the rasterizer's `(near, far)` window is applied to
/// that depth.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Camera {
    /// Distance from the object origin to the camera along the view axis.
    pub distance: f32,

    /// Object rotation around the x axis, degrees.
    pub angle_x_deg: f32,

    /// Object rotation around the y axis, degrees.
    pub angle_y_deg: f32,

    /// Full vertical field of view, degrees.
    pub viewing_angle_deg: f32,
}

impl Camera {
    pub fn new(distance: f32, angle_x_deg: f32, angle_y_deg: f32, viewing_angle_deg: f32) -> Self {
        Self {
            distance,
            angle_x_deg,
            angle_y_deg,
            viewing_angle_deg,
        }
    }

    fn rotation(&self) -> Rotation3<f32> {
        Rotation3::from_euler_angles(
            self.angle_x_deg.to_radians(),
            self.angle_y_deg.to_radians(),
            0.0,
        )
    }

    /// Transform a point from object space to camera space.
    pub fn world_to_camera(&self, p: &Vector3<f32>) -> Vector3<f32> {
        let mut q = self.rotation() * p;
        q.z += self.distance;
        q
    }

    /// Perspective-project a camera-space point.
    ///
    /// `x' = x / (z * tan(fov/2))`, likewise for `y`; `z` passes through.
    /// Points at or behind the camera produce coordinates the rasterizer's
    /// depth window rejects, so no special casing happens here.
    pub fn project(&self, p_cam: &Vector3<f32>) -> Vector3<f32> {
        let t = (self.viewing_angle_deg.to_radians() * 0.5).tan();
        let d = p_cam.z * t;
        Vector3::new(p_cam.x / d, p_cam.y / d, p_cam.z)
    }

    /// Rotate, transform, and project a whole vertex batch.
    ///
    /// Output has the same `(batch, V, 3)` shape as the input; it is the
    /// projected vertex set the face assembler consumes.
    pub fn project_batch(&self, vertices: &[Vec<Vector3<f32>>]) -> Vec<Vec<Vector3<f32>>> {
        vertices
            .iter()
            .map(|verts| {
                verts
                    .iter()
                    .map(|v| self.project(&self.world_to_camera(v)))
                    .collect()
            })
            .collect()
    }
}

/// Rotate every vertex around the z axis by `deg` degrees, in place.
///
/// Used to build rotated variants of a test scene.
pub fn rotate_z(vertices: &mut [Vector3<f32>], deg: f32) {
    let r = Rotation3::from_euler_angles(0.0, 0.0, deg.to_radians());
    for v in vertices.iter_mut() {
        *v = r * *v;
    }
}
