//! Finite difference curvature along the dimer axis.
//!
//! With forces being negative gradients,
//! `F(x - delta N) - F(x + delta N) ≈ 2 delta H N`, so
//!
//! ```text
//! C = (F_minus - F_plus) . N / (2 delta) ≈ N^T H N
//! ```
//!
//! Negative `C` means the surface curves downward along `N`.

use saddle_slice_math::{vdot, v, V};

/// Curvature along `orientation` from the forces at both replicas.
pub fn estimate_curvature(force_plus: &[f64], force_minus: &[f64], orientation: &[f64], delta: f64) -> f64 {
    let V(diff) = v(force_minus) - v(force_plus);
    0.5 * vdot(&diff, orientation) / delta
}

/// Curvature along `orientation` from the forces at `plus` and the center,
/// with `F_minus = 2 F_center - F_plus`.
pub fn estimate_curvature_one_replica(force_plus: &[f64], force_center: &[f64], orientation: &[f64], delta: f64) -> f64 {
    let V(force_minus) = 2.0 * v(force_center) - v(force_plus);
    estimate_curvature(force_plus, &force_minus, orientation, delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_functions::{Lifted, DoubleWell, Potential};

    // force of the double well at a single particle
    fn force(pos: [f64; 3]) -> Vec<f64> {
        Lifted::new(DoubleWell).compute(&[pos]).1[0].to_vec()
    }

    #[test]
    fn negative_along_the_unstable_mode() {
        // hessian at the origin is diag(-4, 2, 2)
        let delta = 1e-3;
        let fp = force([delta, 0.0, 0.0]);
        let fm = force([-delta, 0.0, 0.0]);
        let c = estimate_curvature(&fp, &fm, &[1.0, 0.0, 0.0], delta);
        assert_close!(rel=1e-5, c, -4.0);

        let fp = force([0.0, delta, 0.0]);
        let fm = force([0.0, -delta, 0.0]);
        let c = estimate_curvature(&fp, &fm, &[0.0, 1.0, 0.0], delta);
        assert_close!(rel=1e-8, c, 2.0);
    }

    #[test]
    fn one_replica_agrees_with_two() {
        let delta = 1e-4;
        let n = [0.6, 0.8, 0.0];
        let center = [0.1, -0.2, 0.3];
        let at = |s: f64| [center[0] + s * n[0], center[1] + s * n[1], center[2] + s * n[2]];

        let two = estimate_curvature(&force(at(delta)), &force(at(-delta)), &n, delta);
        let one = estimate_curvature_one_replica(&force(at(delta)), &force(center), &n, delta);

        // exact value: 0.36 * (12 x^2 - 4) + 0.64 * 2
        let exact = 0.36 * (12.0 * 0.01 - 4.0) + 0.64 * 2.0;
        assert_close!(abs=1e-6, two, exact);
        assert_close!(abs=1e-3, one, exact);
    }

    #[test]
    fn non_finite_propagates() {
        let c = estimate_curvature(&[std::f64::NAN, 0.0, 0.0], &[0.0; 3], &[1.0, 0.0, 0.0], 1e-3);
        assert!(c.is_nan());
    }
}
