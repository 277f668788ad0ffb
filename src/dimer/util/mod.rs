/* ************************************************************************ **
** This file is part of saddle, and is licensed under EITHER the MIT        **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use std::fmt;

/// Error type for force queries that cannot fail.
///
/// Has no values, so a `Result<T, Never>` is always `Ok`.
#[derive(Debug, Copy, Clone, Hash, PartialOrd, Ord, PartialEq, Eq)]
pub enum Never {}

impl fmt::Display for Never {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result { match *self {} }
}

pub(crate) mod cache;

pub(crate) mod random {
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;
    use rand_distr::StandardNormal;
    use saddle_slice_math::{vnormalize, V};

    /// Deterministic when a seed is given, otherwise seeded from the OS.
    pub(crate) fn rng(seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// A unit vector drawn uniformly from the sphere in `ndim` dimensions.
    pub(crate) fn direction(ndim: usize, rng: &mut impl Rng) -> Vec<f64> {
        assert!(ndim > 0);
        loop {
            let vec: Vec<f64> = (0..ndim).map(|_| rng.sample(StandardNormal)).collect();
            if let Ok(V(dir)) = vnormalize(&vec) {
                return dir;
            }
        }
    }

}
