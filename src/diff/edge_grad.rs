//! Closed-form partial derivatives of the edge function.
//!
//! The edge function `E(p) = (p.y - a.y)(b.x - a.x) - (p.x - a.x)(b.y - a.y)`
//! is affine in both the evaluation point and the two endpoints, so its
//! partials with respect to the endpoint coordinates are exact one-liners.
//! These are the only derivatives the backward pass needs.

use crate::core::math::edge_function;
use nalgebra::Vector2;

/// Edge-function value at a point together with its partials with respect to
/// the four endpoint coordinates.
#[derive(Clone, Copy, Debug)]
pub struct EdgeGrads {
    pub value: f32,
    pub d_ax: f32,
    pub d_ay: f32,
    pub d_bx: f32,
    pub d_by: f32,
}

/// Evaluate the edge function for `a -> b` at `p` and its endpoint partials.
pub fn edge_function_with_grads(a: Vector2<f32>, b: Vector2<f32>, p: Vector2<f32>) -> EdgeGrads {
    EdgeGrads {
        value: edge_function(a, b, p),
        d_ax: b.y - p.y,
        d_ay: p.x - b.x,
        d_bx: p.y - a.y,
        d_by: a.x - p.x,
    }
}
