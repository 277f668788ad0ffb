/* ************************************************************************ **
** This file is part of saddle, and is licensed under EITHER the MIT        **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Checks performed after deserialization.

use crate::config::*;
use failure::Error;

impl Settings {
    pub fn validate(self) -> Result<ValidatedSettings, Error> {
        if self.center.is_empty() {
            bail!("'center' must contain at least one particle");
        }
        if self.center.iter().flat_map(|row| row.iter()).any(|x| !x.is_finite()) {
            bail!("'center' contains a non-finite coordinate");
        }
        if let Some(orientation) = &self.orientation {
            if orientation.len() != self.center.len() {
                bail!(
                    "'orientation' has {} rows but 'center' has {}",
                    orientation.len(), self.center.len(),
                );
            }
        }
        self.dimer.validate()?;
        if let Some(mep) = &self.mep {
            mep.validate()?;
        }
        if self.exclude_translations && self.center.len() < 2 {
            bail!("'exclude-translations' would leave a single particle nowhere to go");
        }
        self.potential.validate()?;

        Ok(ValidatedSettings(self))
    }
}

impl PotentialKind {
    fn validate(&self) -> Result<(), Error> {
        match self {
            PotentialKind::DoubleWell(lift) |
            PotentialKind::MullerBrown(lift) => check_stiffness(lift.z_stiffness),
            PotentialKind::CoupledDoubleWell(cfg) => {
                if !(cfg.coupling > 0.0) {
                    bail!("'coupling' must be positive, got {}", cfg.coupling);
                }
                check_stiffness(cfg.z_stiffness)
            },
            PotentialKind::LennardJones(cfg) => {
                if !(cfg.epsilon > 0.0 && cfg.sigma > 0.0) {
                    bail!("'epsilon' and 'sigma' must be positive");
                }
                if !(0.0 <= cfg.overlap && cfg.overlap < 1.0) {
                    bail!("'overlap' must be in [0, 1), got {}", cfg.overlap);
                }
                Ok(())
            },
        }
    }
}

fn check_stiffness(z_stiffness: f64) -> Result<(), Error> {
    if !(z_stiffness > 0.0) {
        bail!("'z-stiffness' must be positive, got {}", z_stiffness);
    }
    Ok(())
}
