/* ************************************************************************ **
** This file is part of saddle, and is licensed under EITHER the MIT        **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

#![allow(non_snake_case)]

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use crate::errors::{bad_params, DimerError};
use crate::image::ReplicaMode;
use crate::rotation::RotationSettings;
use crate::translation::TranslationSettings;

/// Parameters of a saddle search.  Lengths are in the units of the configuration.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Params {
    /// Distance from the center to each replica.
    #[serde(default = "params__delta")] pub delta: f64,
    /// Probe angle for the finite difference of the rotational force.
    #[serde(default = "params__dtheta")] pub dtheta: f64,
    /// The probe angle is never shrunk below this.
    #[serde(default = "params__dtheta_min")] pub dtheta_min: f64,
    /// Largest single rotation (radians).  Larger rotations are clamped,
    /// and shrink the probe angle tenfold.
    #[serde(default = "params__max_rotation")] pub max_rotation: f64,
    /// Rotation stops once the rotational force is below this.
    #[serde(default = "params__frot_tol")] pub frot_tol: f64,
    /// Rotations per outer iteration.
    #[serde(default = "params__max_rotations")] pub max_rotations: u32,
    /// Length of the probe step used to estimate the line curvature during translation.
    #[serde(default = "params__probe_step")] pub probe_step: f64,
    /// Largest translation per outer iteration.
    #[serde(default = "params__max_step")] pub max_step: f64,
    /// Converged once the sum of squared forces at the center is below this.
    ///
    /// Only consulted when the Builder is not given an explicit stop condition.
    #[serde(default = "params__force_sq_tol")] pub force_sq_tol: f64,
    #[serde(default = "params__max_iterations")] pub max_iterations: u64,
    #[serde(default = "params__replicas")] pub replicas: ReplicaMode,
    /// Finer settings to switch to near the saddle.
    #[serde(default)] pub refine: Option<Refine>,
}

/// Settings applied once the saddle tolerance first drops below `threshold`.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Refine {
    #[serde(default = "refine__threshold")] pub threshold: f64,
    #[serde(default = "refine__probe_step")] pub probe_step: f64,
    #[serde(default = "refine__max_step")] pub max_step: f64,
    #[serde(default = "refine__dtheta")] pub dtheta: f64,
    #[serde(default = "refine__frot_tol")] pub frot_tol: f64,
    #[serde(default = "refine__max_rotations")] pub max_rotations: u32,
}

fn params__delta() -> f64 { 1e-3 }
fn params__dtheta() -> f64 { 1e-4 }
fn params__dtheta_min() -> f64 { 1e-7 }
fn params__max_rotation() -> f64 { FRAC_PI_4 }
fn params__frot_tol() -> f64 { 1e-2 }
fn params__max_rotations() -> u32 { 8 }
fn params__probe_step() -> f64 { 1e-3 }
fn params__max_step() -> f64 { 0.04 }
fn params__force_sq_tol() -> f64 { 1e-6 }
fn params__max_iterations() -> u64 { 1000 }
fn params__replicas() -> ReplicaMode { ReplicaMode::Two }

fn refine__threshold() -> f64 { 0.5 }
fn refine__probe_step() -> f64 { 1e-6 }
fn refine__max_step() -> f64 { 1e-3 }
fn refine__dtheta() -> f64 { 1e-6 }
fn refine__frot_tol() -> f64 { 1e-2 }
fn refine__max_rotations() -> u32 { 5 }

impl Default for Params {
    fn default() -> Self {
        Params {
            delta: params__delta(),
            dtheta: params__dtheta(),
            dtheta_min: params__dtheta_min(),
            max_rotation: params__max_rotation(),
            frot_tol: params__frot_tol(),
            max_rotations: params__max_rotations(),
            probe_step: params__probe_step(),
            max_step: params__max_step(),
            force_sq_tol: params__force_sq_tol(),
            max_iterations: params__max_iterations(),
            replicas: params__replicas(),
            refine: None,
        }
    }
}

impl Default for Refine {
    fn default() -> Self {
        Refine {
            threshold: refine__threshold(),
            probe_step: refine__probe_step(),
            max_step: refine__max_step(),
            dtheta: refine__dtheta(),
            frot_tol: refine__frot_tol(),
            max_rotations: refine__max_rotations(),
        }
    }
}

// finite and strictly positive (so NaN fails)
fn check_positive(name: &str, value: f64) -> Result<(), DimerError> {
    match value > 0.0 && value.is_finite() {
        true => Ok(()),
        false => Err(bad_params(format!("'{}' must be positive and finite, got {}", name, value))),
    }
}

impl Params {
    /// Reject settings the search cannot run with.
    pub fn validate(&self) -> Result<(), DimerError> {
        check_positive("delta", self.delta)?;
        check_positive("dtheta", self.dtheta)?;
        check_positive("dtheta-min", self.dtheta_min)?;
        check_positive("max-rotation", self.max_rotation)?;
        check_positive("frot-tol", self.frot_tol)?;
        check_positive("probe-step", self.probe_step)?;
        check_positive("max-step", self.max_step)?;
        check_positive("force-sq-tol", self.force_sq_tol)?;

        if self.dtheta_min > self.dtheta {
            return Err(bad_params("'dtheta-min' exceeds 'dtheta'"));
        }
        if self.max_rotation > FRAC_PI_2 {
            return Err(bad_params(format!("'max-rotation' cannot exceed π/2, got {}", self.max_rotation)));
        }
        if self.probe_step > self.max_step {
            return Err(bad_params("'probe-step' exceeds 'max-step'"));
        }
        if self.max_rotations == 0 {
            return Err(bad_params("'max-rotations' must be at least 1"));
        }
        if self.max_iterations == 0 {
            return Err(bad_params("'max-iterations' must be at least 1"));
        }
        if let Some(refine) = &self.refine {
            check_positive("refine.threshold", refine.threshold)?;
            check_positive("refine.probe-step", refine.probe_step)?;
            check_positive("refine.max-step", refine.max_step)?;
            check_positive("refine.dtheta", refine.dtheta)?;
            check_positive("refine.frot-tol", refine.frot_tol)?;
            if refine.probe_step > refine.max_step {
                return Err(bad_params("'refine.probe-step' exceeds 'refine.max-step'"));
            }
            if refine.max_rotations == 0 {
                return Err(bad_params("'refine.max-rotations' must be at least 1"));
            }
        }
        Ok(())
    }

    pub(crate) fn rotation_settings(&self) -> RotationSettings {
        RotationSettings {
            dtheta_min: self.dtheta_min,
            max_rotation: self.max_rotation,
            frot_tol: self.frot_tol,
            max_rotations: self.max_rotations,
        }
    }

    pub(crate) fn translation_settings(&self) -> TranslationSettings {
        TranslationSettings {
            probe_step: self.probe_step,
            max_step: self.max_step,
        }
    }

    /// The settings to continue with once `refine` kicks in.
    pub(crate) fn refined(&self, refine: &Refine) -> Params {
        Params {
            probe_step: refine.probe_step,
            max_step: refine.max_step,
            dtheta: refine.dtheta,
            dtheta_min: f64::min(self.dtheta_min, refine.dtheta),
            frot_tol: refine.frot_tol,
            max_rotations: refine.max_rotations,
            refine: None,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_empty_json() {
        let params: Params = from_json!({});
        assert_eq!(params, Params::default());
        params.validate().unwrap();
    }

    #[test]
    fn kebab_case_keys() {
        let params: Params = from_json!({
            "force-sq-tol": 1e-8,
            "max-rotations": 3,
            "replicas": "one",
            "refine": {"threshold": 0.1},
        });
        assert_eq!(params.force_sq_tol, 1e-8);
        assert_eq!(params.max_rotations, 3);
        assert_eq!(params.replicas, ReplicaMode::One);
        assert_eq!(params.refine, Some(Refine { threshold: 0.1, ..Refine::default() }));
        params.validate().unwrap();
    }

    #[test]
    fn validation_rejects_nonsense() {
        let bad = vec![
            Params { delta: 0.0, ..Params::default() },
            Params { delta: -1e-3, ..Params::default() },
            Params { dtheta: std::f64::NAN, ..Params::default() },
            Params { probe_step: 0.1, max_step: 0.01, ..Params::default() },
            Params { max_rotation: 2.0, ..Params::default() },
            Params { max_rotations: 0, ..Params::default() },
            Params { max_iterations: 0, ..Params::default() },
            Params { force_sq_tol: 0.0, ..Params::default() },
            Params { refine: Some(Refine { frot_tol: -1.0, ..Refine::default() }), ..Params::default() },
        ];
        for params in bad {
            match params.validate() {
                Err(DimerError::BadParams(_)) => {},
                r => panic!("accepted {:?}: {:?}", params, r),
            }
        }
    }

    #[test]
    fn refinement_keeps_the_rest() {
        let params = Params { delta: 2e-3, refine: Some(Refine::default()), ..Params::default() };
        let refined = params.refined(&Refine::default());
        assert_eq!(refined.delta, 2e-3);
        assert_eq!(refined.probe_step, 1e-6);
        assert_eq!(refined.dtheta_min, 1e-7);
        assert_eq!(refined.refine, None);
        refined.validate().unwrap();
    }
}
