/* ************************************************************************ **
** This file is part of saddle, and is licensed under EITHER the MIT        **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Rotating the dimer towards the lowest curvature mode.
//!
//! Within the plane spanned by `N` and the rotational force direction `Θ`,
//! the curvature along `N(θ) = cos θ N + sin θ Θ` is a sinusoid of period π:
//!
//! ```text
//! C(θ)    = c̄ - R cos 2(θ - θ₀)
//! Frot(θ) = -dC/dθ = -2R sin 2(θ - θ₀)
//! F'(θ)   = dFrot/dθ = -4R cos 2(θ - θ₀)
//! ```
//!
//! `Frot` and `F'` are measured at the midpoint of a small probe rotation
//! `dθ`, which pins down `θ₀` (the minimum of `C`) with a single `atan2`.

#![allow(non_snake_case)]

use std::f64::consts::{PI, FRAC_PI_2};

use saddle_slice_math::{vdot, vnormalize, vreject, vaxpy, v, V};

use crate::curvature::estimate_curvature;
use crate::errors::StepError;
use crate::force::{Evaluator, ForceQuery};
use crate::image::DimerImage;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RotationSettings {
    pub(crate) dtheta_min: f64,
    pub(crate) max_rotation: f64,
    pub(crate) frot_tol: f64,
    pub(crate) max_rotations: u32,
}

/// What happened during one rotation phase.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct RotationSummary {
    /// `Frot` at the start of each rotation iteration, including the final orientation.
    pub frot_history: Vec<f64>,
    pub rotations: u32,
    /// Curvature along the final orientation.
    pub curvature: f64,
    /// `false` if the rotation budget ran out first.
    pub converged: bool,
}

impl RotationSummary {
    pub fn frot(&self) -> f64 { self.frot_history.last().cloned().unwrap_or(0.0) }
}

/// `[(F₊ - (F₊·N)N) - (F₋ - (F₋·N)N)] / δ`
///
/// This is about `-2 (H N)` with the part along `N` removed.
pub fn perpendicular_force(force_plus: &[f64], force_minus: &[f64], orientation: &[f64], delta: f64) -> Vec<f64> {
    let V(perp_plus) = vreject(force_plus, orientation);
    let V(perp_minus) = vreject(force_minus, orientation);
    ((v(perp_plus) - v(perp_minus)) / delta).0
}

/// Angle to rotate from the probe orientation `N*` to the curvature minimum.
///
/// `frot` is the rotational force averaged over both ends of the probe rotation,
/// and `fprime` its finite difference derivative.  The result lies in `(-π/2, π/2]`;
/// anything else would describe the same dimer pointing the other way.
pub fn rotation_angle(frot: f64, fprime: f64, dtheta: f64) -> f64 {
    let angle = -0.5 * f64::atan2(-2.0 * frot, -fprime) - 0.5 * dtheta;
    reduce_half_turn(angle)
}

fn reduce_half_turn(mut angle: f64) -> f64 {
    while angle > FRAC_PI_2 { angle -= PI; }
    while angle <= -FRAC_PI_2 { angle += PI; }
    angle
}

/// Remove the components along a set of orthonormal modes.
pub(crate) fn project_out(mut vec: Vec<f64>, modes: &[Vec<f64>]) -> Vec<f64> {
    for mode in modes {
        let dot = vdot(&vec, mode);
        vaxpy(&mut vec, -dot, mode);
    }
    vec
}

/// Rotate the dimer until `Frot < frot_tol` or the budget runs out.
///
/// The center does not move, so its force is passed in.  `dtheta` is the probe
/// angle; it shrinks when a rotation has to be clamped, and stays shrunk.
pub(crate) fn rotate<F: ForceQuery>(
    image: &mut DimerImage,
    center_force: &[f64],
    settings: &RotationSettings,
    dtheta: &mut f64,
    excluded_modes: &[Vec<f64>],
    eval: &mut Evaluator<F>,
) -> Result<RotationSummary, StepError<F::Error>> {
    let delta = image.delta();
    let mut frot_history = vec![];
    let mut rotations = 0;

    loop {
        let forces = image.replica_forces(eval, center_force)?;
        let N = image.orientation().to_vec();
        let curvature = estimate_curvature(&forces.plus, &forces.minus, &N, delta);
        let finish = |frot_history, converged| RotationSummary { frot_history, rotations, curvature, converged };

        let Fperp = project_out(perpendicular_force(&forces.plus, &forces.minus, &N, delta), excluded_modes);
        let Theta = match vnormalize(&Fperp) {
            Ok(V(x)) => x,
            Err(_) => {
                trace!("rotation: no perpendicular force, already aligned");
                frot_history.push(0.0);
                return Ok(finish(frot_history, true));
            },
        };
        let Frot = vdot(&Fperp, &Theta);
        frot_history.push(Frot);
        trace!("rotation {:>3}: Frot = {:e}, C = {:+e}", rotations, Frot, curvature);

        if Frot < settings.frot_tol {
            return Ok(finish(frot_history, true));
        }
        if rotations >= settings.max_rotations {
            debug!("rotation budget exhausted with Frot = {:e}", Frot);
            return Ok(finish(frot_history, false));
        }

        // probe rotation
        let (sin, cos) = dtheta.sin_cos();
        let V(N_star) = cos * v(&N) + sin * v(&Theta);
        let V(Theta_star) = cos * v(&Theta) - sin * v(&N);

        let star = image.probe_forces(eval, &N_star, center_force)?;
        let Fperp_star = project_out(perpendicular_force(&star.plus, &star.minus, &N_star, delta), excluded_modes);
        let Frot_star = vdot(&Fperp_star, &Theta_star);

        let Frot_mid = 0.5 * (Frot + Frot_star);
        let Fprime = (Frot_star - Frot) / *dtheta;
        let mut angle = rotation_angle(Frot_mid, Fprime, *dtheta);
        if angle.abs() > settings.max_rotation {
            angle = settings.max_rotation.copysign(angle);
            *dtheta = f64::max(*dtheta / 10.0, settings.dtheta_min);
            warn!("rotation clamped to {:+.4} rad; probe angle is now {:e}", angle, *dtheta);
        }

        let (sin, cos) = angle.sin_cos();
        let V(new_N) = cos * v(&N_star) + sin * v(&Theta_star);
        let new_N = project_out(new_N, excluded_modes);
        if image.set_orientation(&new_N).is_err() {
            // N* and Θ* are orthonormal, so this takes a rather contrived set of excluded modes
            warn!("rotation produced a null orientation; keeping the old one");
            return Ok(finish(frot_history, false));
        }
        rotations += 1;
    }
}
