//! Moving the dimer along the effective force.
//!
//! With negative curvature, the component of the force along `N` is reversed
//! so that the dimer climbs along the unstable mode while relaxing in every
//! other direction.  With positive curvature there is nothing to climb yet,
//! and the dimer is pushed uphill along `N` alone.

use saddle_slice_math::{vdot, vnormalize, vproject, vreflect, V};

use crate::errors::StepError;
use crate::force::{Evaluation, Evaluator, ForceQuery};
use crate::image::DimerImage;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TranslationSettings {
    pub(crate) probe_step: f64,
    pub(crate) max_step: f64,
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct TranslationSummary {
    /// Signed distance moved along the effective force direction.
    pub step: f64,
    /// Magnitude of the effective force before the step.
    pub effective_force: f64,
    /// Derivative of the effective force along the step direction, from the probe.
    pub line_curvature: f64,
}

/// `F - 2 (F.N) N` for negative curvature, `-(F.N) N` otherwise.
pub fn effective_force(force: &[f64], orientation: &[f64], curvature: f64) -> Vec<f64> {
    if curvature < 0.0 {
        vreflect(force, orientation).0
    } else {
        (-vproject(force, orientation)).0
    }
}

/// Total distance to move from the starting point.
///
/// `f0` and `f1` are the effective force along the step direction at the start
/// and after the probe.  The force is modeled as linear in the distance, and the
/// step goes to its root.  When the model has no root ahead (the force grows
/// along the step) or the curvature is not yet negative, the step is `max_step`.
pub fn newton_step(f0: f64, f1: f64, probe_step: f64, curvature: f64, max_step: f64) -> f64 {
    let line_curvature = (f1 - f0) / probe_step;
    if line_curvature >= 0.0 || curvature >= 0.0 {
        return max_step;
    }
    let step = 0.5 * probe_step - 0.5 * (f0 + f1) / line_curvature;
    step.max(-max_step).min(max_step)
}

/// Translate the dimer once.  `center` is updated to the new center.
///
/// Costs two evaluations of the center: one after the probe step and one at
/// the final position.
pub(crate) fn translate<F: ForceQuery>(
    image: &mut DimerImage,
    center: &mut Evaluation,
    curvature: f64,
    settings: &TranslationSettings,
    eval: &mut Evaluator<F>,
) -> Result<TranslationSummary, StepError<F::Error>> {
    let feff = effective_force(&center.force, image.orientation(), curvature);
    let dir = match vnormalize(&feff) {
        Ok(V(dir)) => dir,
        Err(_) => {
            debug!("zero effective force; dimer stays put");
            return Ok(TranslationSummary { step: 0.0, effective_force: 0.0, line_curvature: 0.0 });
        },
    };
    let f0 = vdot(&feff, &dir);

    let probe_step = settings.probe_step;
    image.translate(probe_step, &dir);
    let probe = eval.compute(image.center())?;
    let feff_probe = effective_force(&probe.force, image.orientation(), curvature);
    let f1 = vdot(&feff_probe, &dir);

    let line_curvature = (f1 - f0) / probe_step;
    let step = newton_step(f0, f1, probe_step, curvature, settings.max_step);
    if step.abs() == settings.max_step {
        debug!("translation at maximum step ({:+e}), line curvature {:+e}", step, line_curvature);
    }

    image.translate(step - probe_step, &dir);
    *center = eval.compute(image.center())?;

    Ok(TranslationSummary { step, effective_force: f0, line_curvature })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ReplicaMode;
    use crate::test_functions::{Lifted, DoubleWell, Potential, Quadratic};
    use saddle_slice_math::vnorm;

    #[test]
    fn climbs_the_unstable_mode() {
        // E = (x^2 - 1)^2 + y^2 + z^2; the unstable mode at the saddle is x
        let surface = Lifted::new(DoubleWell);
        let (_, force) = surface.compute(&[[0.1, 0.05, 0.0]]);
        let force = force[0].to_vec();

        let feff = effective_force(&force, &[1.0, 0.0, 0.0], -3.88);
        // energy increases towards the saddle along -x
        let ascending = [-1.0, 0.0, 0.0];
        assert!(vdot(&feff, &ascending) > 0.0);
        // and everything else still goes downhill
        assert_close!(feff[1], force[1]);
        assert!(feff[1] < 0.0);
    }

    #[test]
    fn positive_curvature_uses_axial_force_only() {
        let feff = effective_force(&[1.0, 2.0, 3.0], &[0.0, 1.0, 0.0], 0.5);
        assert_eq!(feff, vec![0.0, -2.0, 0.0]);
    }

    #[test]
    fn newton_step_cases() {
        // f(t) = 1 - 2t, root at t = 0.5
        assert_close!(newton_step(1.0, 1.0 - 2.0 * 0.01, 0.01, -1.0, 1.0), 0.5);
        // clamped
        assert_close!(newton_step(1.0, 1.0 - 2.0 * 0.01, 0.01, -1.0, 0.1), 0.1);
        // root behind the start
        assert_close!(newton_step(-1.0, -1.0 - 2.0 * 0.01, 0.01, -1.0, 1.0), -0.5);
        // force grows along the step
        assert_eq!(newton_step(1.0, 1.5, 0.01, -1.0, 0.2), 0.2);
        // curvature not yet negative
        assert_eq!(newton_step(1.0, 0.5, 0.01, 1.0, 0.2), 0.2);
    }

    #[test]
    fn quadratic_step_lands_on_saddle_line() {
        // along x alone the effective surface is an upturned parabola, so one
        // newton step from a point on the x axis goes straight to the origin
        let surface = Quadratic::diagonal([-2.0, 1.0, 1.0]);
        let mut eval = Evaluator::new(surface.force_query());
        let mut image = DimerImage::new(vec![0.03, 0.0, 0.0], &[1.0, 0.0, 0.0], 1e-3, ReplicaMode::Two).unwrap();
        let mut center = eval.compute(image.center()).unwrap();

        let settings = TranslationSettings { probe_step: 1e-3, max_step: 0.1 };
        let summary = translate(&mut image, &mut center, -4.0, &settings, &mut eval).unwrap();

        assert_close!(abs=1e-10, image.center(), &[0.0, 0.0, 0.0][..]);
        assert_close!(abs=1e-10, summary.step, 0.03);
        assert_close!(rel=1e-8, summary.line_curvature, -4.0);
        assert_close!(vnorm(image.orientation()), 1.0);
        assert_close!(abs=1e-10, center.force, vec![0.0; 3]);
    }

    #[test]
    fn zero_effective_force_means_no_step() {
        let surface = Quadratic::diagonal([-2.0, 1.0, 1.0]);
        let mut eval = Evaluator::new(surface.force_query());
        let mut image = DimerImage::new(vec![0.0; 3], &[1.0, 0.0, 0.0], 1e-3, ReplicaMode::Two).unwrap();
        let mut center = eval.compute(image.center()).unwrap();

        let settings = TranslationSettings { probe_step: 1e-3, max_step: 0.1 };
        let summary = translate(&mut image, &mut center, -4.0, &settings, &mut eval).unwrap();
        assert_eq!(summary.step, 0.0);
        assert_eq!(image.center(), &[0.0; 3]);
        assert_eq!(eval.num_evaluations, 1);
    }
}
