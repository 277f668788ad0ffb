//! Analytic surfaces with known saddle points.
//!
//! Each particle feels the same external potential independently, so any
//! number of particles may be used; the single particle case is the usual one.

use crate::util::Never;

/// An energy model given in closed form.
pub trait Potential {
    /// Energy and forces (negative gradient).
    fn compute(&self, positions: &[[f64; 3]]) -> (f64, Vec<[f64; 3]>);

    /// Adapt for use as a [`ForceQuery`](crate::ForceQuery).
    fn force_query(&self) -> Box<dyn FnMut(&[[f64; 3]]) -> Result<(f64, Vec<[f64; 3]>), Never> + '_> {
        Box::new(move |positions: &[[f64; 3]]| Ok(self.compute(positions)))
    }
}

/// A surface in the xy plane.
pub trait Surface2d {
    /// Value and gradient at `(x, y)`.
    fn value_grad(&self, x: f64, y: f64) -> (f64, [f64; 2]);
}

/// Extends a [`Surface2d`] to three dimensions with a harmonic term `k z^2`.
#[derive(Debug, Clone)]
pub struct Lifted<S> {
    pub surface: S,
    pub z_stiffness: f64,
}

impl<S> Lifted<S> {
    pub fn new(surface: S) -> Self { Lifted { surface, z_stiffness: 1.0 } }
}

impl<S: Surface2d> Potential for Lifted<S> {
    fn compute(&self, positions: &[[f64; 3]]) -> (f64, Vec<[f64; 3]>) {
        let mut energy = 0.0;
        let forces = positions.iter().map(|&[x, y, z]| {
            let (value, [gx, gy]) = self.surface.value_grad(x, y);
            energy += value + self.z_stiffness * z * z;
            [-gx, -gy, -2.0 * self.z_stiffness * z]
        }).collect();
        (energy, forces)
    }
}

/// `E = sum k_i x_i^2`, a stationary point at the origin with hessian `diag(2k)`.
#[derive(Debug, Clone)]
pub struct Quadratic {
    pub stiffness: [f64; 3],
}

impl Quadratic {
    pub fn diagonal(stiffness: [f64; 3]) -> Self { Quadratic { stiffness } }
}

impl Potential for Quadratic {
    fn compute(&self, positions: &[[f64; 3]]) -> (f64, Vec<[f64; 3]>) {
        let k = self.stiffness;
        let mut energy = 0.0;
        let forces = positions.iter().map(|pos| {
            let mut force = [0.0; 3];
            for i in 0..3 {
                energy += k[i] * pos[i] * pos[i];
                force[i] = -2.0 * k[i] * pos[i];
            }
            force
        }).collect();
        (energy, forces)
    }
}

/// `(x^2 - 1)^2 + y^2`
///
/// Minima at `(±1, 0)`, saddle at the origin with hessian `diag(-4, 2)`.
#[derive(Debug, Copy, Clone)]
pub struct DoubleWell;

impl Surface2d for DoubleWell {
    fn value_grad(&self, x: f64, y: f64) -> (f64, [f64; 2]) {
        let w = x * x - 1.0;
        (w * w + y * y, [4.0 * x * w, 2.0 * y])
    }
}

/// `(x^2 - 1)^2 + k (y - x)^2`
///
/// Minima at `(±1, ±1)` and a saddle at the origin whose unstable mode is not
/// aligned with either axis.  (hessian `[[2k - 4, -2k], [-2k, 2k]]`)
#[derive(Debug, Copy, Clone)]
pub struct CoupledDoubleWell {
    pub coupling: f64,
}

impl Surface2d for CoupledDoubleWell {
    fn value_grad(&self, x: f64, y: f64) -> (f64, [f64; 2]) {
        let w = x * x - 1.0;
        let d = y - x;
        let k = self.coupling;
        (w * w + k * d * d, [4.0 * x * w - 2.0 * k * d, 2.0 * k * d])
    }
}

/// The Müller-Brown potential.
///
/// Three minima and two saddles; the saddle locations are only known numerically,
/// see [`MullerBrown::SADDLES`].
#[derive(Debug, Copy, Clone)]
pub struct MullerBrown;

impl MullerBrown {
    const A: [f64; 4] = [-200.0, -100.0, -170.0, 15.0];
    const a: [f64; 4] = [-1.0, -1.0, -6.5, 0.7];
    const b: [f64; 4] = [0.0, 0.0, 11.0, 0.6];
    const c: [f64; 4] = [-10.0, -10.0, -6.5, 0.7];
    const X0: [f64; 4] = [1.0, 0.0, -0.5, -1.0];
    const Y0: [f64; 4] = [0.0, 0.5, 1.5, 1.0];

    /// Approximate `(x, y, energy)` of the two saddles.
    pub const SADDLES: [(f64, f64, f64); 2] = [
        (-0.82200, 0.62431, -40.6648),
        (0.21249, 0.29298, -72.2489),
    ];
    /// Approximate `(x, y, energy)` of the three minima.
    pub const MINIMA: [(f64, f64, f64); 3] = [
        (-0.55822, 1.44173, -146.6995),
        (0.62350, 0.02804, -108.1667),
        (-0.05001, 0.46669, -80.7678),
    ];
}

impl Surface2d for MullerBrown {
    #[allow(non_upper_case_globals)]
    fn value_grad(&self, x: f64, y: f64) -> (f64, [f64; 2]) {
        let mut value = 0.0;
        let mut grad = [0.0; 2];
        for i in 0..4 {
            let dx = x - Self::X0[i];
            let dy = y - Self::Y0[i];
            let (a, b, c) = (Self::a[i], Self::b[i], Self::c[i]);
            let term = Self::A[i] * f64::exp(a * dx * dx + b * dx * dy + c * dy * dy);
            value += term;
            grad[0] += term * (2.0 * a * dx + b * dy);
            grad[1] += term * (b * dx + 2.0 * c * dy);
        }
        (value, grad)
    }
}
