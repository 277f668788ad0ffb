//! The energy model, as seen by the search.

use either::{Left, Right};
use slice_of_array::prelude::*;

use crate::errors::{DimerError, StepError};
use crate::util::cache::LastCache;

/// Computes the energy and per-particle forces (negative gradient) of a configuration.
///
/// Must give the same answer when called twice with the same positions.
/// An infinite energy marks an unphysical configuration and aborts the search.
///
/// This is implemented for closures `FnMut(&[[f64; 3]]) -> Result<(f64, Vec<[f64; 3]>), E>`.
pub trait ForceQuery {
    type Error;

    fn evaluate(&mut self, positions: &[[f64; 3]]) -> Result<(f64, Vec<[f64; 3]>), Self::Error>;
}

impl<E, F> ForceQuery for F
where F: FnMut(&[[f64; 3]]) -> Result<(f64, Vec<[f64; 3]>), E>,
{
    type Error = E;

    fn evaluate(&mut self, positions: &[[f64; 3]]) -> Result<(f64, Vec<[f64; 3]>), E>
    { self(positions) }
}

/// Energy and flattened force at one configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Evaluation {
    pub(crate) energy: f64,
    pub(crate) force: Vec<f64>,
}

/// Wraps a `ForceQuery` to work on flat coordinates.
///
/// Remembers the last result so that asking twice in a row costs nothing,
/// and rejects anything non-finite before it can reach the algorithm.
pub(crate) struct Evaluator<F> {
    query: F,
    cache: LastCache<Vec<f64>, Evaluation>,
    /// Outer iteration to blame in `DimerError::Unphysical`.
    pub(crate) iteration: u64,
    pub(crate) num_evaluations: u64,
}

impl<F: ForceQuery> Evaluator<F> {
    pub(crate) fn new(query: F) -> Self {
        Evaluator {
            query,
            cache: LastCache::new(),
            iteration: 0,
            num_evaluations: 0,
        }
    }

    pub(crate) fn compute(&mut self, position: &[f64]) -> Result<Evaluation, StepError<F::Error>> {
        if let Some(cached) = self.cache.get(position) {
            return Ok(cached.clone());
        }

        let (energy, force) = self.query.evaluate(position.nest()).map_err(Right)?;
        self.num_evaluations += 1;

        let force = force.flat().to_vec();
        if force.len() != position.len() {
            return Err(Left(DimerError::BadDimension {
                what: "force",
                expected: position.len(),
                actual: force.len(),
            }));
        }
        if !(energy.is_finite() && force.iter().all(|x| x.is_finite())) {
            return Err(Left(DimerError::Unphysical { energy, iteration: self.iteration }));
        }

        let evaluation = Evaluation { energy, force };
        self.cache.put(position.to_vec(), evaluation.clone());
        Ok(evaluation)
    }

    /// Energy only, for callers that discard the force.
    pub(crate) fn energy(&mut self, position: &[f64]) -> Result<f64, StepError<F::Error>> {
        self.compute(position).map(|e| e.energy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Never;
    use either::Either;

    #[test]
    fn repeated_configuration_is_cached() {
        let mut calls = 0;
        let query = |pos: &[[f64; 3]]| -> Result<_, Never> {
            calls += 1;
            Ok((pos[0][0], vec![[1.0, 2.0, 3.0]]))
        };
        let mut eval = Evaluator::new(query);
        eval.compute(&[1.0, 0.0, 0.0]).unwrap();
        eval.compute(&[1.0, 0.0, 0.0]).unwrap();
        assert_eq!(eval.num_evaluations, 1);

        eval.compute(&[2.0, 0.0, 0.0]).unwrap();
        eval.compute(&[1.0, 0.0, 0.0]).unwrap();
        assert_eq!(eval.num_evaluations, 3);
        drop(eval);
        assert_eq!(calls, 3);
    }

    #[test]
    fn infinite_energy_is_unphysical() {
        let query = |_: &[[f64; 3]]| -> Result<_, Never> {
            Ok((std::f64::INFINITY, vec![[0.0; 3]]))
        };
        let mut eval = Evaluator::new(query);
        eval.iteration = 4;
        match eval.compute(&[0.0; 3]) {
            Err(Either::Left(DimerError::Unphysical { iteration: 4, .. })) => {},
            r => panic!("unexpected: {:?}", r),
        }
    }

    #[test]
    fn nan_force_is_unphysical() {
        let query = |_: &[[f64; 3]]| -> Result<_, Never> {
            Ok((0.0, vec![[0.0, std::f64::NAN, 0.0]]))
        };
        match Evaluator::new(query).compute(&[0.0; 3]) {
            Err(Either::Left(DimerError::Unphysical { .. })) => {},
            r => panic!("unexpected: {:?}", r),
        }
    }

    #[test]
    fn wrong_force_length() {
        let query = |_: &[[f64; 3]]| -> Result<_, Never> { Ok((0.0, vec![[0.0; 3]; 2])) };
        match Evaluator::new(query).compute(&[0.0; 3]) {
            Err(Either::Left(DimerError::BadDimension { expected: 3, actual: 6, .. })) => {},
            r => panic!("unexpected: {:?}", r),
        }
    }

    #[test]
    fn user_errors_pass_through() {
        let query = |_: &[[f64; 3]]| -> Result<(f64, Vec<[f64; 3]>), &'static str> { Err("nope") };
        match Evaluator::new(query).compute(&[0.0; 3]) {
            Err(Either::Right("nope")) => {},
            r => panic!("unexpected: {:?}", r),
        }
    }
}
