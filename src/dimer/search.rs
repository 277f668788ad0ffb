/* ************************************************************************ **
** This file is part of saddle, and is licensed under EITHER the MIT        **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! The outer loop: rotate, translate, check.

use std::fmt;

use rand::rngs::StdRng;
use slice_of_array::prelude::*;
use saddle_slice_math::{vnorm, vsqnorm, vnormalize, V};

use crate::errors::{bad_params, DimerError, Failure, StepError};
use crate::force::{Evaluation, Evaluator, ForceQuery};
use crate::image::DimerImage;
use crate::curvature::estimate_curvature;
use crate::rotation::{self, RotationSummary};
use crate::settings::{Params, Refine};
use crate::translation::{self, TranslationSummary};
use crate::util::random;

pub use self::stop_condition::StopCondition;
pub mod stop_condition {
    use super::*;
    use crate::stop_condition::prelude::*;
    use crate::stop_condition::Cereal;

    /// Quantities that stop conditions can be written in terms of.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Objectives {
        pub force_sq: f64,
        pub force_max: f64,
        pub force_rms: f64,
    }

    impl Objectives {
        pub fn from_state(state: &IterationState<'_>) -> Self {
            let force_sq = vsqnorm(state.force);
            Objectives {
                force_sq,
                force_max: saddle_slice_math::vmax_abs(state.force),
                force_rms: f64::sqrt(force_sq / state.force.len() as f64),
            }
        }
    }

    #[derive(Serialize, Deserialize)]
    #[derive(Debug, Copy, Clone, PartialEq)]
    pub enum Simple {
        /// Sum of squared force components at the center.  (the "saddle tolerance")
        #[serde(rename =   "force-sq")] ForceSq(f64),
        /// Largest force component at the center.
        #[serde(rename =  "force-max")] ForceMax(f64),
        /// Root mean square of the force components, an intensive version of `force-sq`.
        #[serde(rename =  "force-rms")] ForceRms(f64),
    }

    impl ShouldStop<Objectives> for Simple {
        fn should_stop(&self, objs: &Objectives) -> bool {
            match *self {
                Simple::ForceSq(tol) => objs.force_sq < tol,
                Simple::ForceMax(tol) => objs.force_max < tol,
                Simple::ForceRms(tol) => objs.force_rms < tol,
            }
        }
    }

    /// Configuration for the built-in stop conditions.
    ///
    /// Usually deserialized from JSON or YAML: the basic conditions are the
    /// `#[serde]` names on [`Simple`], combined with `"any"` and `"all"`.
    /// The iteration budget is not among them; running out of iterations
    /// is never a success.
    pub type StopCondition = Cereal<Simple>;

    impl StopCondition {
        /// The default: sum of squared forces below `tol`.
        pub fn force_sq(tol: f64) -> Self { Cereal::Simple(Simple::ForceSq(tol)) }

        /// Convert to the more general form accepted by the Builder API.
        pub fn to_function(&self) -> impl Clone + FnMut(IterationState<'_>) -> bool {
            let cond = self.clone();
            move |state: IterationState<'_>| cond.should_stop(&Objectives::from_state(&state))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn serialized_repr() {
            let cond: StopCondition = from_json!({"any": [
                {"force-max": 1e-3},
                {"all": [{"force-sq": 1e-4}, {"force-rms": 1e-2}]},
            ]});
            let objs = |force_max, force_sq, force_rms| Objectives { force_sq, force_max, force_rms };
            assert!(!cond.should_stop(&objs(1e-2, 1.0, 1e-3)));
            assert!(cond.should_stop(&objs(1e-4, 1.0, 1.0)));
            assert!(cond.should_stop(&objs(1e-2, 1e-5, 1e-3)));
            assert!(!cond.should_stop(&objs(1e-2, 1e-5, 1.0)));

            assert_eq!(
                serde_json::to_value(StopCondition::force_sq(1e-6)).unwrap(),
                json!({"force-sq": 1e-6}),
            );
        }
    }
}

//==================================================================================================
// closures in builder API

#[derive(Debug, Clone)]
pub struct IterationState<'a> {
    /// Complete outer iterations, including the one just finished.
    pub iterations: u64,
    pub energy: f64,
    /// Sum of squared forces at the center.
    pub saddle_tolerance: f64,
    pub curvature: f64,
    /// Rotational force left after the rotation phase.
    pub frot: f64,
    pub rotations: u32,
    /// Length of the translation this iteration.
    pub step: f64,
    pub center: &'a [f64],
    pub force: &'a [f64],
    pub orientation: &'a [f64],
    // ensures addition of new fields is backwards compatible
    #[allow(non_snake_case)]
    __no_full_destructure: (),
}

/// Trait for producing fresh instances of an `IterationStateFn`.
///
/// This lets a single Builder be cloned, or used for several searches.
/// It is implemented for all cloneable closures that take an `IterationState`,
/// so long as calls to a clone do not affect the "freshness" of the original.
pub trait BuildIterationStateFn: objekt::Clone {
    type Output;

    /// Produce a fresh instance with no history of calls made to it yet.
    fn build(&self) -> Box<dyn FnMut(IterationState<'_>) -> Self::Output>;
}

impl<F, B> BuildIterationStateFn for F
where
    F: FnMut(IterationState<'_>) -> B,
    F: Clone + 'static,
{
    type Output = B;

    fn build(&self) -> Box<dyn FnMut(IterationState<'_>) -> B> { Box::new(self.clone()) }
}

pub fn get_basic_output_fn(
    mut emit: impl Clone + FnMut(fmt::Arguments<'_>),
) -> impl Clone + FnMut(IterationState<'_>) {
    let mut last_energy = None::<f64>;

    move |state: IterationState<'_>| {
        let d_energy = last_energy.map(|prev| state.energy - prev).unwrap_or(0.0);
        emit(format_args!(
            " i: {i:>5}  E: {e:18.12} dE: {de:+8.2e}  F²: {fsq:>10.4e}  C: {c:+10.4e}  Frot: {frot:>9.3e} ({r})  step: {s:+9.3e}",
            i = state.iterations,
            e = state.energy,
            de = d_energy,
            fsq = state.saddle_tolerance,
            c = state.curvature,
            frot = state.frot,
            r = state.rotations,
            s = state.step,
        ));
        last_energy = Some(state.energy);
    }
}

//==================================================================================================
// Builder

/// Configures and starts saddle searches.
///
/// Without an explicit [`Builder::stop_condition`], a search converges once the
/// sum of squared forces at the center drops below `force-sq-tol`.
#[must_use]
pub struct Builder {
    params: Params,
    build_stop_condition: Option<Box<dyn BuildIterationStateFn<Output=bool>>>,
    build_output_fns: Vec<Box<dyn BuildIterationStateFn<Output=()>>>,
    excluded_modes: Vec<Vec<f64>>,
    orthogonal_search: bool,
    seed: Option<u64>,
}

impl Builder {
    pub fn new(params: Params) -> Self {
        Builder {
            params,
            build_stop_condition: None,
            build_output_fns: vec![],
            excluded_modes: vec![],
            orthogonal_search: false,
            seed: None,
        }
    }

    pub fn params(&self) -> &Params { &self.params }

    /// Set up an arbitrary function for logging output each iteration.
    ///
    /// This will exist alongside any previously existing output functions.
    pub fn output_fn(&mut self, f: impl BuildIterationStateFn<Output=()> + 'static) -> &mut Self {
        self.build_output_fns.push(Box::new(f)); self
    }

    /// Set up a "standard" output function that writes a formatted line on each iteration.
    /// The output format may change.
    pub fn basic_output_fn(&mut self, emit: impl Clone + FnMut(fmt::Arguments<'_>) + 'static) -> &mut Self {
        self.output_fn(get_basic_output_fn(emit))
    }

    pub fn stop_condition(&mut self, f: impl BuildIterationStateFn<Output=bool> + 'static) -> &mut Self {
        self.build_stop_condition = Some(Box::new(f)); self
    }

    /// Keep the orientation orthogonal to a mode (e.g. a rigid translation).
    ///
    /// Modes need not be normalized or orthogonal to one another, but must be
    /// linearly independent.
    pub fn exclude_mode(&mut self, mode: &[[f64; 3]]) -> &mut Self {
        self.excluded_modes.push(mode.flat().to_vec()); self
    }

    /// Look for a second unstable mode once the first rotation phase converges.
    ///
    /// The mode found by that rotation is excluded and the dimer is pointed at a
    /// random direction orthogonal to it.  The exclusion is lifted as soon as the
    /// orthogonal mode has the lower curvature of the two.
    pub fn orthogonal_search(&mut self, enable: bool) -> &mut Self {
        self.orthogonal_search = enable; self
    }

    /// Seed for the random initial orientation.
    pub fn seed(&mut self, seed: u64) -> &mut Self {
        self.seed = Some(seed); self
    }

    /// Validate everything and evaluate the starting configuration.
    ///
    /// `orientation` need not be normalized.  If absent, a random direction is used.
    pub fn start<F: ForceQuery>(
        &self,
        center: &[[f64; 3]],
        orientation: Option<&[[f64; 3]]>,
        query: F,
    ) -> Result<DimerSearch<F>, Failure<F::Error>> {
        let params = self.params.clone();
        params.validate()?;

        let center = center.flat().to_vec();
        let ndim = center.len();
        if ndim == 0 {
            return Err(bad_params("cannot search in a space of no particles").into());
        }
        let excluded_modes = orthonormalize(&self.excluded_modes, ndim)?;
        let mut rng = random::rng(self.seed);

        let orthogonal = match self.orthogonal_search {
            false => Orthogonal::Off,
            // needs one direction for the lowest mode and at least one more to explore
            true if ndim < excluded_modes.len() + 2 => {
                warn!("no room for an orthogonal search with {} excluded modes", excluded_modes.len());
                Orthogonal::Off
            },
            true => Orthogonal::Pending,
        };

        let orientation = match orientation {
            Some(dir) => {
                let dir = dir.flat();
                if dir.len() != ndim {
                    let actual = dir.len();
                    return Err(DimerError::BadDimension { what: "orientation", expected: ndim, actual }.into());
                }
                dir.to_vec()
            },
            None => random::direction(ndim, &mut rng),
        };
        let orientation = rotation::project_out(orientation, &excluded_modes);
        let image = DimerImage::new(center, &orientation, params.delta, params.replicas)?;

        let stop_condition: Box<dyn FnMut(IterationState<'_>) -> bool> = match &self.build_stop_condition {
            Some(f) => f.build(),
            None => Box::new(StopCondition::force_sq(params.force_sq_tol).to_function()),
        };
        let output_fns = self.build_output_fns.iter().map(|x| x.build()).collect();

        let mut eval = Evaluator::new(query);
        let best_position = image.center().nest::<[f64; 3]>().to_vec();
        let mut image = image;
        let center = match initial_evaluation(&mut image, &mut eval) {
            Ok(center) => center,
            Err(error) => return Err(Failure { best_position: Some(best_position), error }),
        };

        Ok(DimerSearch {
            dtheta: params.dtheta,
            refine: params.refine.clone(),
            params,
            phase: Phase::Rotating,
            image,
            center,
            curvature: 0.0,
            last_rotation: None,
            last_translation: None,
            iterations: 0,
            trace: vec![],
            excluded_modes,
            orthogonal,
            rng,
            stop_condition,
            output_fns,
            eval,
        })
    }

    /// Start and run a search to completion.
    pub fn run<F: ForceQuery>(
        &self,
        center: &[[f64; 3]],
        orientation: Option<&[[f64; 3]]>,
        query: F,
    ) -> Result<Output, Failure<F::Error>> {
        self.start(center, orientation, query)?.run()
    }
}

impl Clone for Builder {
    fn clone(&self) -> Self {
        Builder {
            params: self.params.clone(),
            build_output_fns: self.build_output_fns.iter().map(|x| objekt::clone_box(&**x)).collect(),
            build_stop_condition: self.build_stop_condition.as_ref().map(|x| objekt::clone_box(&**x)),
            excluded_modes: self.excluded_modes.clone(),
            orthogonal_search: self.orthogonal_search,
            seed: self.seed,
        }
    }
}

// Gram-Schmidt
fn orthonormalize(modes: &[Vec<f64>], ndim: usize) -> Result<Vec<Vec<f64>>, DimerError> {
    let mut out: Vec<Vec<f64>> = vec![];
    for mode in modes {
        if mode.len() != ndim {
            return Err(DimerError::BadDimension { what: "excluded mode", expected: ndim, actual: mode.len() });
        }
        match vnormalize(&rotation::project_out(mode.clone(), &out)) {
            Ok(V(unit)) => out.push(unit),
            Err(_) => return Err(bad_params("excluded modes must be linearly independent")),
        }
    }
    Ok(out)
}

// Evaluates the center, and turns the dimer around if it starts out pointing uphill.
fn initial_evaluation<F: ForceQuery>(
    image: &mut DimerImage,
    eval: &mut Evaluator<F>,
) -> Result<Evaluation, StepError<F::Error>> {
    let center = eval.compute(image.center())?;
    let energy_plus = eval.energy(image.plus())?;
    if center.energy > energy_plus {
        debug!("dimer starts out pointing downhill; reversing it");
        image.swap_ends();
    }
    Ok(center)
}

//==================================================================================================
// The search itself

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Phase {
    Rotating,
    Translating,
    ConvergenceCheck,
}

// While `Active`, the last excluded mode is the lowest mode being avoided.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Orthogonal {
    Off,
    Pending,
    Active,
    Done,
}

/// Why a search stopped.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Termination {
    SaddleFound,
    StepBudgetExceeded,
}

/// Record of one outer iteration.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct TraceEntry {
    pub iteration: u64,
    pub energy: f64,
    pub saddle_tolerance: f64,
    pub curvature: f64,
    pub frot: f64,
    pub rotations: u32,
    pub step: f64,
}

/// A saddle search in progress.
///
/// Each call to [`DimerSearch::step`] performs one full outer iteration.
pub struct DimerSearch<F> {
    params: Params,
    refine: Option<Refine>,
    dtheta: f64,
    phase: Phase,
    image: DimerImage,
    center: Evaluation,
    curvature: f64,
    last_rotation: Option<RotationSummary>,
    last_translation: Option<TranslationSummary>,
    iterations: u64,
    trace: Vec<TraceEntry>,
    excluded_modes: Vec<Vec<f64>>,
    orthogonal: Orthogonal,
    rng: StdRng,
    stop_condition: Box<dyn FnMut(IterationState<'_>) -> bool>,
    output_fns: Vec<Box<dyn FnMut(IterationState<'_>)>>,
    eval: Evaluator<F>,
}

impl<F: ForceQuery> DimerSearch<F> {
    /// Perform one outer iteration.
    ///
    /// Returns `Some` once the search should stop; further calls keep iterating
    /// (a converged dimer barely moves).
    pub fn step(&mut self) -> Result<Option<Termination>, Failure<F::Error>> {
        match self.advance() {
            Ok(termination) => Ok(termination),
            Err(error) => Err(Failure { best_position: Some(self.center()), error }),
        }
    }

    /// Iterate until the stop condition or the iteration budget says otherwise.
    pub fn run(mut self) -> Result<Output, Failure<F::Error>> {
        loop {
            if let Some(termination) = self.step()? {
                return Ok(self.into_output(termination));
            }
        }
    }

    fn advance(&mut self) -> Result<Option<Termination>, StepError<F::Error>> {
        self.eval.iteration = self.iterations;
        loop {
            match self.phase {
                Phase::Rotating => {
                    let summary = rotation::rotate(
                        &mut self.image,
                        &self.center.force,
                        &self.params.rotation_settings(),
                        &mut self.dtheta,
                        &self.excluded_modes,
                        &mut self.eval,
                    )?;
                    self.curvature = summary.curvature;
                    let converged = summary.converged;
                    self.last_rotation = Some(summary);

                    match self.orthogonal {
                        Orthogonal::Pending if converged => {
                            self.begin_orthogonal_search();
                            continue;
                        },
                        Orthogonal::Active => self.compare_orthogonal_mode()?,
                        _ => {},
                    }
                    self.phase = Phase::Translating;
                },
                Phase::Translating => {
                    let summary = translation::translate(
                        &mut self.image,
                        &mut self.center,
                        self.curvature,
                        &self.params.translation_settings(),
                        &mut self.eval,
                    )?;
                    self.last_translation = Some(summary);
                    self.phase = Phase::ConvergenceCheck;
                },
                Phase::ConvergenceCheck => {
                    self.phase = Phase::Rotating;
                    self.iterations += 1;
                    return Ok(self.check_convergence());
                },
            }
        }
    }

    fn begin_orthogonal_search(&mut self) {
        let lowest = self.image.orientation().to_vec();
        info!("lowest mode has curvature {:+e}; searching orthogonal to it", self.curvature);
        self.excluded_modes.push(lowest);
        self.orthogonal = Orthogonal::Active;

        let ndim = self.image.center().len();
        loop {
            let dir = rotation::project_out(random::direction(ndim, &mut self.rng), &self.excluded_modes);
            if self.image.set_orientation(&dir).is_ok() {
                break;
            }
        }
    }

    // Lifts the exclusion once the orthogonal mode is the softer one.
    fn compare_orthogonal_mode(&mut self) -> Result<(), StepError<F::Error>> {
        let lowest = match self.excluded_modes.last() {
            Some(mode) => mode.clone(),
            None => return Ok(()),
        };
        let forces = self.image.probe_forces(&mut self.eval, &lowest, &self.center.force)?;
        let lowest_curvature = estimate_curvature(&forces.plus, &forces.minus, &lowest, self.image.delta());
        trace!("curvatures: {:+e} (lowest), {:+e} (orthogonal)", lowest_curvature, self.curvature);

        if self.curvature < lowest_curvature {
            info!(
                "orthogonal mode is softer ({:+e} < {:+e}); ending orthogonal search",
                self.curvature, lowest_curvature,
            );
            self.excluded_modes.pop();
            self.orthogonal = Orthogonal::Done;
        }
        Ok(())
    }

    fn check_convergence(&mut self) -> Option<Termination> {
        let saddle_tolerance = vsqnorm(&self.center.force);
        let (frot, rotations) = match &self.last_rotation {
            Some(r) => (r.frot(), r.rotations),
            None => (0.0, 0),
        };
        let step = self.last_translation.as_ref().map_or(0.0, |t| t.step);

        let entry = TraceEntry {
            iteration: self.iterations,
            energy: self.center.energy,
            saddle_tolerance,
            curvature: self.curvature,
            frot,
            rotations,
            step,
        };
        debug!(
            "iteration {}: E = {}, F² = {:e}, C = {:+e}, step = {:+e}",
            entry.iteration, entry.energy, entry.saddle_tolerance, entry.curvature, entry.step,
        );
        self.trace.push(entry);

        let state = IterationState {
            iterations: self.iterations,
            energy: self.center.energy,
            saddle_tolerance,
            curvature: self.curvature,
            frot,
            rotations,
            step,
            center: self.image.center(),
            force: &self.center.force,
            orientation: self.image.orientation(),
            __no_full_destructure: (),
        };
        for output_fn in &mut self.output_fns {
            output_fn(state.clone());
        }
        let converged = (self.stop_condition)(state);

        if !converged && self.refine.as_ref().map_or(false, |r| saddle_tolerance < r.threshold) {
            if let Some(refine) = self.refine.take() {
                info!("saddle tolerance {:e} is below {:e}; switching to refined settings", saddle_tolerance, refine.threshold);
                self.params = self.params.refined(&refine);
                self.dtheta = refine.dtheta;
            }
        }

        if converged {
            Some(Termination::SaddleFound)
        } else if self.iterations >= self.params.max_iterations {
            Some(Termination::StepBudgetExceeded)
        } else {
            None
        }
    }

    fn into_output(self, termination: Termination) -> Output {
        match termination {
            Termination::SaddleFound => info!("Saddle search converged."),
            Termination::StepBudgetExceeded => warn!("Saddle search ran out of iterations!"),
        }
        info!(" Iterations: {}", self.iterations);
        info!("     Energy: {}", self.center.energy);
        info!("  Curvature: {:+e}", self.curvature);
        info!("   Force Sq: {:e}", vsqnorm(&self.center.force));
        info!("Evaluations: {}", self.eval.num_evaluations);

        let nested = |x: &[f64]| x.nest::<[f64; 3]>().to_vec();
        Output {
            termination,
            iterations: self.iterations,
            center: nested(self.image.center()),
            plus: nested(self.image.plus()),
            minus: nested(self.image.minus()),
            orientation: nested(self.image.orientation()),
            force: nested(&self.center.force),
            energy: self.center.energy,
            curvature: self.curvature,
            num_evaluations: self.eval.num_evaluations,
            trace: self.trace,
            __no_full_destructure: (),
        }
    }

    /// Current center of the dimer.
    pub fn center(&self) -> Vec<[f64; 3]> { self.image.center().nest().to_vec() }
    /// Current unit orientation of the dimer.
    pub fn orientation(&self) -> Vec<[f64; 3]> { self.image.orientation().nest().to_vec() }
    pub fn image(&self) -> &DimerImage { &self.image }
    pub fn energy(&self) -> f64 { self.center.energy }
    pub fn force(&self) -> Vec<[f64; 3]> { self.center.force.nest().to_vec() }
    /// Sum of squared forces at the center.
    pub fn saddle_tolerance(&self) -> f64 { vsqnorm(&self.center.force) }
    /// Curvature along the orientation, from the latest rotation phase.
    pub fn curvature(&self) -> f64 { self.curvature }
    pub fn iterations(&self) -> u64 { self.iterations }
    pub fn trace(&self) -> &[TraceEntry] { &self.trace }
    pub fn last_rotation(&self) -> Option<&RotationSummary> { self.last_rotation.as_ref() }
    pub fn last_translation(&self) -> Option<&TranslationSummary> { self.last_translation.as_ref() }
    pub fn num_evaluations(&self) -> u64 { self.eval.num_evaluations }
    /// The mode an orthogonal search is currently avoiding, if any.
    pub fn avoided_mode(&self) -> Option<Vec<[f64; 3]>> {
        match self.orthogonal {
            Orthogonal::Active => self.excluded_modes.last().map(|x| x.nest().to_vec()),
            _ => None,
        }
    }
    /// Distance of the center from `position`.
    pub fn distance_to(&self, position: &[[f64; 3]]) -> f64 {
        let V(diff) = saddle_slice_math::v(self.image.center()) - saddle_slice_math::v(position.flat());
        vnorm(&diff)
    }
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Output {
    pub termination: Termination,
    pub iterations: u64,
    pub center: Vec<[f64; 3]>,
    pub plus: Vec<[f64; 3]>,
    pub minus: Vec<[f64; 3]>,
    /// Unit vector; the unstable mode at a saddle.
    pub orientation: Vec<[f64; 3]>,
    pub force: Vec<[f64; 3]>,
    pub energy: f64,
    pub curvature: f64,
    pub num_evaluations: u64,
    pub trace: Vec<TraceEntry>,
    // ensures addition of new fields is backwards compatible
    #[serde(skip)]
    #[allow(non_snake_case)]
    __no_full_destructure: (),
}

impl Output {
    pub fn converged(&self) -> bool { self.termination == Termination::SaddleFound }
    /// Sum of squared forces at the final center.
    pub fn saddle_tolerance(&self) -> f64 { vsqnorm(self.force.flat()) }
}
