/* ************************************************************************ **
** This file is part of saddle, and is licensed under EITHER the MIT        **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Saddle point search by the rotation-translation dimer method.
//!
//! The search only ever asks for energies and forces; no Hessian is formed.
//! A *dimer* is a pair of images `center ± delta * N` straddling the current
//! estimate of the saddle.  Each outer iteration
//!
//! 1. rotates `N` towards the lowest curvature mode ([`rotation`]),
//! 2. translates the dimer along an effective force that climbs along `N`
//!    and descends along everything else ([`translation`]),
//! 3. checks the force at the center against a stop condition.
//!
//! Entry points are [`Builder`] (a saddle search) and [`mep::walk`]
//! (descent from a converged saddle into the neighboring minimum).

#[macro_use] extern crate serde_derive;
#[macro_use] extern crate failure;
#[macro_use] extern crate log;
#[cfg_attr(test, macro_use)] extern crate serde_json;
#[cfg(test)] #[macro_use] extern crate saddle_assert_close;

// because if you're writing a json literal,
// then you probably know it's valid...
#[cfg(test)]
macro_rules! from_json {
    ($($arg:tt)*)
    => { ::serde_json::from_value(json!($($arg)*)).unwrap() };
}

pub(crate) mod util;
mod errors;
mod force;
pub mod image;
pub mod curvature;
pub mod rotation;
pub mod translation;
pub mod stop_condition;
mod settings;
pub mod search;
pub mod mep;
pub mod test_functions;

pub use crate::errors::{DimerError, Failure};
pub use crate::force::ForceQuery;
pub use crate::image::ReplicaMode;
pub use crate::settings::{Params, Refine};
pub use crate::search::{Builder, DimerSearch, Output, Termination, TraceEntry, IterationState};
pub use crate::search::StopCondition;
pub use crate::util::Never;

#[cfg(test)]
pub(crate) fn init_test_logger() {
    let _ = env_logger::try_init();
}
