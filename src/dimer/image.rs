//! The dimer itself: a center, two replicas, and the unit axis between them.

use saddle_slice_math::{vnormalize, vset_offset, vaxpy, v, V, BadNorm};

use crate::errors::{DimerError, StepError};
use crate::force::{Evaluator, ForceQuery};

/// How the force at the `minus` replica is obtained.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ReplicaMode {
    /// Evaluate both replicas.
    Two,
    /// Evaluate only `plus`, and use `F(minus) = 2 F(center) - F(plus)`.
    ///
    /// Halves the cost of rotation, at the price of a first order error
    /// in the curvature when the center force is large.
    One,
}

/// Center configuration, replicas at `center ± delta * N`, and `N`.
///
/// All vectors are flat, of length `3 * num_particles`.
#[derive(Debug, Clone)]
pub struct DimerImage {
    center: Vec<f64>,
    plus: Vec<f64>,
    minus: Vec<f64>,
    orientation: Vec<f64>,
    delta: f64,
    mode: ReplicaMode,
    // positions of probe replicas
    scratch: Vec<f64>,
}

/// Forces at both replicas for one orientation.
#[derive(Debug, Clone)]
pub(crate) struct ReplicaForces {
    pub(crate) plus: Vec<f64>,
    pub(crate) minus: Vec<f64>,
    pub(crate) energy_plus: f64,
}

impl DimerImage {
    pub fn new(center: Vec<f64>, orientation: &[f64], delta: f64, mode: ReplicaMode) -> Result<Self, DimerError> {
        if center.is_empty() || center.len() % 3 != 0 {
            return Err(DimerError::BadParams(format!(
                "configuration must hold a positive multiple of 3 coordinates, got {}", center.len(),
            )));
        }
        if !(delta > 0.0 && delta.is_finite()) {
            return Err(DimerError::BadParams(format!("dimer separation must be positive, got {}", delta)));
        }
        if orientation.len() != center.len() {
            return Err(DimerError::BadDimension {
                what: "orientation",
                expected: center.len(),
                actual: orientation.len(),
            });
        }

        let ndim = center.len();
        let mut image = DimerImage {
            plus: center.clone(),
            minus: center.clone(),
            scratch: vec![0.0; ndim],
            orientation: vec![0.0; ndim],
            center,
            delta,
            mode,
        };
        image.set_orientation(orientation)
            .map_err(|BadNorm(norm)| DimerError::BadParams(format!("orientation has bad norm {}", norm)))?;
        Ok(image)
    }

    pub fn center(&self) -> &[f64] { &self.center }
    pub fn plus(&self) -> &[f64] { &self.plus }
    pub fn minus(&self) -> &[f64] { &self.minus }
    pub fn orientation(&self) -> &[f64] { &self.orientation }
    pub fn delta(&self) -> f64 { self.delta }
    pub fn mode(&self) -> ReplicaMode { self.mode }

    /// Point the dimer along `dir` (normalized here), keeping the center fixed.
    pub fn set_orientation(&mut self, dir: &[f64]) -> Result<(), BadNorm> {
        assert_eq!(dir.len(), self.center.len());
        let V(dir) = vnormalize(dir)?;
        vset_offset(&mut self.plus, &self.center, self.delta, &dir);
        vset_offset(&mut self.minus, &self.center, -self.delta, &dir);
        self.orientation = dir;
        self.resync_orientation();
        Ok(())
    }

    /// Rigidly move the whole dimer by `alpha * dir`.
    pub fn translate(&mut self, alpha: f64, dir: &[f64]) {
        vaxpy(&mut self.center, alpha, dir);
        vaxpy(&mut self.plus, alpha, dir);
        vaxpy(&mut self.minus, alpha, dir);
        self.resync_orientation();
    }

    /// Exchange the replicas, reversing `N`.
    pub fn swap_ends(&mut self) {
        std::mem::swap(&mut self.plus, &mut self.minus);
        self.resync_orientation();
    }

    // N is always whatever the replicas say it is.
    fn resync_orientation(&mut self) {
        match vnormalize(&(v(&self.plus) - v(&self.center))) {
            Ok(V(n)) => self.orientation = n,
            Err(BadNorm(norm)) => warn!("dimer replica coincides with center (|plus - center| = {:e})", norm),
        }
    }

    /// Forces at the replicas of the current orientation.
    pub(crate) fn replica_forces<F: ForceQuery>(
        &mut self,
        eval: &mut Evaluator<F>,
        center_force: &[f64],
    ) -> Result<ReplicaForces, StepError<F::Error>> {
        let plus = eval.compute(&self.plus)?;
        let minus = match self.mode {
            ReplicaMode::Two => eval.compute(&self.minus)?.force,
            ReplicaMode::One => (2.0 * v(center_force) - v(&plus.force)).0,
        };
        Ok(ReplicaForces { plus: plus.force, minus, energy_plus: plus.energy })
    }

    /// Forces at the replicas the dimer would have if it pointed along `dir` (a unit vector).
    ///
    /// Does not modify the dimer.
    pub(crate) fn probe_forces<F: ForceQuery>(
        &mut self,
        eval: &mut Evaluator<F>,
        dir: &[f64],
        center_force: &[f64],
    ) -> Result<ReplicaForces, StepError<F::Error>> {
        vset_offset(&mut self.scratch, &self.center, self.delta, dir);
        let plus = eval.compute(&self.scratch)?;
        let minus = match self.mode {
            ReplicaMode::Two => {
                vset_offset(&mut self.scratch, &self.center, -self.delta, dir);
                eval.compute(&self.scratch)?.force
            },
            ReplicaMode::One => (2.0 * v(center_force) - v(&plus.force)).0,
        };
        Ok(ReplicaForces { plus: plus.force, minus, energy_plus: plus.energy })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use saddle_slice_math::vnorm;

    fn image() -> DimerImage {
        DimerImage::new(vec![1.0, 2.0, 3.0], &[0.0, 3.0, 4.0], 0.1, ReplicaMode::Two).unwrap()
    }

    #[test]
    fn replicas_straddle_center() {
        let image = image();
        assert_close!(image.orientation(), &[0.0, 0.6, 0.8][..]);
        assert_close!(abs=1e-12, image.plus(), &[1.0, 2.06, 3.08][..]);
        assert_close!(abs=1e-12, image.minus(), &[1.0, 1.94, 2.92][..]);
    }

    #[test]
    fn translation_is_rigid() {
        let mut image = image();
        let before = image.orientation().to_vec();
        image.translate(0.5, &[1.0, -1.0, 0.0]);
        assert_close!(abs=1e-12, image.center(), &[1.5, 1.5, 3.0][..]);
        assert_close!(abs=1e-12, image.plus(), &[1.5, 1.56, 3.08][..]);
        assert_close!(abs=1e-12, image.orientation(), &before[..]);
        assert_close!(vnorm(image.orientation()), 1.0);
    }

    #[test]
    fn swapping_reverses_orientation() {
        let mut image = image();
        image.swap_ends();
        assert_close!(abs=1e-12, image.orientation(), &[0.0, -0.6, -0.8][..]);
    }

    #[test]
    fn rejects_bad_input() {
        let result = DimerImage::new(vec![0.0; 3], &[0.0; 3], 0.1, ReplicaMode::One);
        assert!(matches!(result, Err(DimerError::BadParams(_))));

        let result = DimerImage::new(vec![0.0; 3], &[1.0; 6], 0.1, ReplicaMode::One);
        assert!(matches!(result, Err(DimerError::BadDimension { expected: 3, actual: 6, .. })));

        let result = DimerImage::new(vec![0.0; 4], &[1.0; 4], 0.1, ReplicaMode::One);
        assert!(matches!(result, Err(DimerError::BadParams(_))));
    }
}
