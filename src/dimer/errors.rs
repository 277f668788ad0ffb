/* ************************************************************************ **
** This file is part of saddle, and is licensed under EITHER the MIT        **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use std::fmt;

use either::{Either, Left};

#[derive(Debug, Fail)]
pub enum DimerError {
    /// The force query produced a non-finite energy or force.
    #[fail(display = "unphysical configuration at iteration {} (energy: {})", iteration, energy)]
    Unphysical { energy: f64, iteration: u64 },
    #[fail(display = "bad dimer parameters: {}", _0)]
    BadParams(String),
    #[fail(display = "dimension mismatch in {}: expected {} values, got {}", what, expected, actual)]
    BadDimension { what: &'static str, expected: usize, actual: usize },
}

/// Errors raised inside the algorithm, before the best position is attached.
pub(crate) type StepError<E> = Either<DimerError, E>;

/// An error type extended with some additional data.
#[derive(Debug)]
pub struct Failure<E> {
    /// The center of the dimer when the failure occurred.
    ///
    /// `None` if the search failed before the first force evaluation.
    pub best_position: Option<Vec<[f64; 3]>>,
    pub error: Either<DimerError, E>,
}

impl<E> From<DimerError> for Failure<E> {
    fn from(e: DimerError) -> Self {
        Failure {
            best_position: None,
            error: Left(e),
        }
    }
}

impl<E: fmt::Display> fmt::Display for Failure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    { self.error.fmt(f) }
}

pub(crate) fn bad_params(msg: impl Into<String>) -> DimerError {
    DimerError::BadParams(msg.into())
}
