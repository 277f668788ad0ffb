//! Energy models selectable from the settings file.

use itertools::Itertools;
use saddle_dimer::test_functions::{self as surfaces, Lifted, Potential};
use saddle_slice_math::{v, vsqnorm, V};
use saddle_tasks_config as cfg;

pub(crate) fn from_config(kind: &cfg::PotentialKind) -> Box<dyn Potential> {
    match kind {
        cfg::PotentialKind::DoubleWell(lift) => Box::new(Lifted {
            surface: surfaces::DoubleWell,
            z_stiffness: lift.z_stiffness,
        }),
        cfg::PotentialKind::CoupledDoubleWell(params) => Box::new(Lifted {
            surface: surfaces::CoupledDoubleWell { coupling: params.coupling },
            z_stiffness: params.z_stiffness,
        }),
        cfg::PotentialKind::MullerBrown(lift) => Box::new(Lifted {
            surface: surfaces::MullerBrown,
            z_stiffness: lift.z_stiffness,
        }),
        cfg::PotentialKind::LennardJones(params) => Box::new(LennardJones::from_config(params)),
    }
}

/// 12-6 pair potential with optional immobile particles.
///
/// Particles closer than `overlap` report an infinite energy, which the
/// search treats as unphysical.
#[derive(Debug, Clone)]
pub(crate) struct LennardJones {
    epsilon: f64,
    sigma: f64,
    fixed: Vec<[f64; 3]>,
    overlap: f64,
}

impl LennardJones {
    pub(crate) fn from_config(params: &cfg::LennardJones) -> Self {
        LennardJones {
            epsilon: params.epsilon,
            sigma: params.sigma,
            fixed: params.fixed.clone(),
            overlap: params.overlap * params.sigma,
        }
    }

    /// Energy of a pair, and the force on `a`.  `None` on overlap.
    fn pair(&self, a: &[f64; 3], b: &[f64; 3]) -> Option<(f64, [f64; 3])> {
        let V(diff) = v(&a[..]) - v(&b[..]);
        let r2 = vsqnorm(&diff);
        if r2 < self.overlap * self.overlap {
            return None;
        }
        let sr6 = (self.sigma * self.sigma / r2).powi(3);
        let energy = 4.0 * self.epsilon * (sr6 * sr6 - sr6);
        let scale = 24.0 * self.epsilon * (2.0 * sr6 * sr6 - sr6) / r2;
        Some((energy, [scale * diff[0], scale * diff[1], scale * diff[2]]))
    }
}

impl Potential for LennardJones {
    fn compute(&self, positions: &[[f64; 3]]) -> (f64, Vec<[f64; 3]>) {
        let mut energy = 0.0;
        let mut forces = vec![[0.0; 3]; positions.len()];
        let unphysical = |forces| (std::f64::INFINITY, forces);

        for (i, j) in (0..positions.len()).tuple_combinations() {
            let (e, f) = match self.pair(&positions[i], &positions[j]) {
                Some(x) => x,
                None => return unphysical(forces),
            };
            energy += e;
            for k in 0..3 {
                forces[i][k] += f[k];
                forces[j][k] -= f[k];
            }
        }
        for (i, pos) in positions.iter().enumerate() {
            for fixed in &self.fixed {
                let (e, f) = match self.pair(pos, fixed) {
                    Some(x) => x,
                    None => return unphysical(forces),
                };
                energy += e;
                for k in 0..3 {
                    forces[i][k] += f[k];
                }
            }
        }
        (energy, forces)
    }
}
