//! Walking downhill from a saddle.
//!
//! A half dimer (the center plus one end) starts at the saddle, pointing along
//! the unstable mode, and takes fixed-length steps along its orientation.  The
//! orientation is gradually turned towards the force, so that the walk follows
//! the valley into the neighboring minimum.

#![allow(non_snake_case)]

use std::f64::consts::FRAC_PI_2;

use slice_of_array::prelude::*;
use saddle_slice_math::{vdot, vnormalize, vset_offset, vaxpy, v, V};

use crate::errors::{bad_params, DimerError, Failure, StepError};
use crate::force::{Evaluator, ForceQuery};

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct MepParams {
    /// Distance moved per step.
    #[serde(default = "mep__step_length")] pub step_length: f64,
    /// Largest angle (radians) the orientation may turn per step.
    #[serde(default = "mep__max_turn")] pub max_turn: f64,
    /// Steps taken straight along the initial orientation before turning is allowed.
    /// (the force vanishes at the saddle itself)
    #[serde(default = "mep__warmup_steps")] pub warmup_steps: u32,
    #[serde(default = "mep__max_steps")] pub max_steps: u32,
    /// Distance from the center to the end of the half dimer.
    #[serde(default = "mep__delta")] pub delta: f64,
}

fn mep__step_length() -> f64 { 1e-2 }
fn mep__max_turn() -> f64 { 0.1 }
fn mep__warmup_steps() -> u32 { 2 }
fn mep__max_steps() -> u32 { 10_000 }
fn mep__delta() -> f64 { 1e-3 }

impl Default for MepParams {
    fn default() -> Self {
        MepParams {
            step_length: mep__step_length(),
            max_turn: mep__max_turn(),
            warmup_steps: mep__warmup_steps(),
            max_steps: mep__max_steps(),
            delta: mep__delta(),
        }
    }
}

impl MepParams {
    pub fn validate(&self) -> Result<(), DimerError> {
        let positive = |x: f64| x > 0.0 && x.is_finite();
        if !positive(self.step_length) {
            return Err(bad_params(format!("'step-length' must be positive, got {}", self.step_length)));
        }
        if !positive(self.delta) {
            return Err(bad_params(format!("'delta' must be positive, got {}", self.delta)));
        }
        if !(positive(self.max_turn) && self.max_turn <= FRAC_PI_2) {
            return Err(bad_params(format!("'max-turn' must be in (0, π/2], got {}", self.max_turn)));
        }
        if self.max_steps == 0 {
            return Err(bad_params("'max-steps' must be at least 1"));
        }
        Ok(())
    }
}

/// Which way to leave the saddle, relative to its orientation.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Backward => -1.0,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum MepTermination {
    MinimumFound,
    StepBudgetExceeded,
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
pub struct PathPoint {
    pub position: Vec<[f64; 3]>,
    pub energy: f64,
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct MepOutput {
    pub termination: MepTermination,
    pub direction: Direction,
    /// The lowest point reached.
    pub position: Vec<[f64; 3]>,
    pub energy: f64,
    /// Every accepted point, starting with the saddle.
    pub path: Vec<PathPoint>,
    pub num_evaluations: u64,
    // ensures addition of new fields is backwards compatible
    #[serde(skip)]
    #[allow(non_snake_case)]
    __no_full_destructure: (),
}

/// Walk from `saddle` into the minimum on one side.
///
/// `orientation` is the unstable mode at the saddle (it need not be normalized).
pub fn walk<F: ForceQuery>(
    params: &MepParams,
    saddle: &[[f64; 3]],
    orientation: &[[f64; 3]],
    direction: Direction,
    query: F,
) -> Result<MepOutput, Failure<F::Error>> {
    params.validate()?;
    if orientation.len() != saddle.len() {
        let (expected, actual) = (saddle.flat().len(), orientation.flat().len());
        return Err(DimerError::BadDimension { what: "orientation", expected, actual }.into());
    }
    let N = match vnormalize(orientation.flat()) {
        Ok(V(N)) => (direction.sign() * v(N)).0,
        Err(_) => return Err(bad_params("zero orientation given to the path walker").into()),
    };

    let mut walker = Walker {
        params,
        N,
        center: saddle.flat().to_vec(),
        end: vec![0.0; saddle.flat().len()],
        path: vec![],
        eval: Evaluator::new(query),
    };
    match walker.run() {
        Ok(termination) => {
            let last = walker.path.last().cloned().ok_or_else(|| bad_params("empty path"))?;
            match termination {
                MepTermination::MinimumFound => info!("MEP ({:?}): minimum found after {} steps", direction, walker.path.len() - 1),
                MepTermination::StepBudgetExceeded => warn!("MEP ({:?}): ran out of steps", direction),
            }
            info!("MEP ({:?}): energy {}", direction, last.energy);
            Ok(MepOutput {
                termination,
                direction,
                position: last.position,
                energy: last.energy,
                num_evaluations: walker.eval.num_evaluations,
                path: walker.path,
                __no_full_destructure: (),
            })
        },
        Err(error) => Err(Failure {
            best_position: Some(walker.center.nest().to_vec()),
            error,
        }),
    }
}

struct Walker<'p, F> {
    params: &'p MepParams,
    N: Vec<f64>,
    center: Vec<f64>,
    end: Vec<f64>,
    path: Vec<PathPoint>,
    eval: Evaluator<F>,
}

impl<'p, F: ForceQuery> Walker<'p, F> {
    fn run(&mut self) -> Result<MepTermination, StepError<F::Error>> {
        let mut energy = self.eval.energy(&self.center)?;
        self.record(energy);

        for step in 0..self.params.max_steps {
            vset_offset(&mut self.end, &self.center, self.params.delta, &self.N);
            if step >= self.params.warmup_steps {
                let force_center = self.eval.compute(&self.center)?.force;
                let force_end = self.eval.compute(&self.end)?.force;
                self.turn_towards(&(v(force_center) + v(force_end)));
            }

            let mut next = self.center.clone();
            vaxpy(&mut next, self.params.step_length, &self.N);
            let next_energy = self.eval.energy(&next)?;
            trace!("MEP step {}: E = {}", step, next_energy);
            if next_energy >= energy {
                return Ok(MepTermination::MinimumFound);
            }
            self.center = next;
            energy = next_energy;
            self.record(energy);
        }
        Ok(MepTermination::StepBudgetExceeded)
    }

    fn record(&mut self, energy: f64) {
        let position = self.center.nest().to_vec();
        self.path.push(PathPoint { position, energy });
    }

    // Rotate N in the plane of N and `target` by at most `max_turn`.
    fn turn_towards(&mut self, target: &[f64]) {
        let target = match vnormalize(target) {
            Ok(V(x)) => x,
            Err(_) => return,
        };
        let cos = vdot(&self.N, &target).max(-1.0).min(1.0);
        let angle = cos.acos();
        let perp = match vnormalize(&(v(&target) - cos * v(&self.N))) {
            Ok(V(x)) => x,
            // parallel or antiparallel; nothing sensible to do
            Err(_) => return,
        };
        let turn = angle.min(self.params.max_turn);
        let (sin, cos) = turn.sin_cos();
        let V(N) = cos * v(&self.N) + sin * v(&perp);
        if let Ok(V(N)) = vnormalize(&N) {
            self.N = N;
        }
    }
}
