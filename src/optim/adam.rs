//! Adam optimizer over per-vertex position vectors.

use nalgebra::Vector3;

pub struct AdamVec3 {
    pub lr: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub eps: f32,
    t: u32,
    m: Vec<Vector3<f32>>,
    v: Vec<Vector3<f32>>,
}

impl AdamVec3 {
    pub fn new(lr: f32, beta1: f32, beta2: f32, eps: f32) -> Self {
        Self {
            lr,
            beta1,
            beta2,
            eps,
            t: 0,
            m: Vec::new(),
            v: Vec::new(),
        }
    }

    pub fn ensure_len(&mut self, len: usize) {
        if self.m.len() != len {
            self.m.resize(len, Vector3::zeros());
            self.v.resize(len, Vector3::zeros());
        }
    }

    pub fn step(&mut self, params: &mut [Vector3<f32>], grads: &[Vector3<f32>]) {
        assert_eq!(params.len(), grads.len());
        self.ensure_len(params.len());

        self.t += 1;
        let t = self.t as f32;
        let b1 = self.beta1;
        let b2 = self.beta2;

        let bias1 = 1.0 - b1.powf(t);
        let bias2 = 1.0 - b2.powf(t);

        for i in 0..params.len() {
            let g = grads[i];
            self.m[i] = self.m[i] * b1 + g * (1.0 - b1);
            self.v[i] = self.v[i] * b2 + g.component_mul(&g) * (1.0 - b2);

            let m_hat = self.m[i] / bias1;
            let v_hat = self.v[i] / bias2;

            params[i].x -= self.lr * m_hat.x / (v_hat.x.sqrt() + self.eps);
            params[i].y -= self.lr * m_hat.y / (v_hat.y.sqrt() + self.eps);
            params[i].z -= self.lr * m_hat.z / (v_hat.z.sqrt() + self.eps);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adam_basic_update() {
        let mut opt = AdamVec3::new(0.01, 0.9, 0.999, 1e-8);

        let mut params = vec![Vector3::new(1.0, 1.0, 1.0)];
        let grads = vec![Vector3::new(1.0, 1.0, 1.0)];

        let initial = params[0];
        opt.step(&mut params, &grads);

        assert!(
            params[0].x < initial.x,
            "Parameter should decrease with positive gradient"
        );
        assert!(params[0].y < initial.y);
        assert!(params[0].z < initial.z);
    }

    #[test]
    fn test_adam_preserves_timestep_on_resize() {
        let mut opt = AdamVec3::new(0.001, 0.9, 0.999, 1e-8);

        let mut params = vec![Vector3::new(1.0, 2.0, 3.0), Vector3::new(4.0, 5.0, 6.0)];
        let grads = vec![Vector3::new(0.1, 0.2, 0.3), Vector3::new(0.4, 0.5, 0.6)];
        opt.step(&mut params, &grads);
        opt.step(&mut params, &grads);
        assert_eq!(opt.t, 2);

        let mut params3 = vec![
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::new(4.0, 5.0, 6.0),
            Vector3::new(7.0, 8.0, 9.0),
        ];
        let grads3 = vec![
            Vector3::new(0.1, 0.2, 0.3),
            Vector3::new(0.4, 0.5, 0.6),
            Vector3::new(0.7, 0.8, 0.9),
        ];
        opt.step(&mut params3, &grads3);

        assert_eq!(opt.t, 3, "Timestep should not reset on resize");
        assert_eq!(opt.m.len(), 3);
        assert_ne!(opt.m[0], Vector3::zeros());
        assert_ne!(opt.m[2], Vector3::zeros());
    }

    #[test]
    fn test_zero_gradient_leaves_params_unchanged() {
        let mut opt = AdamVec3::new(0.01, 0.9, 0.999, 1e-8);
        let mut params = vec![Vector3::new(1.0, -2.0, 0.5)];
        let grads = vec![Vector3::zeros()];
        opt.step(&mut params, &grads);
        assert_eq!(params[0], Vector3::new(1.0, -2.0, 0.5));
    }
}
