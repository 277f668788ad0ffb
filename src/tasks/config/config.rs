/* ************************************************************************ **
** This file is part of saddle, and is licensed under EITHER the MIT        **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use serde::de;

pub use saddle_dimer::Params as DimerParams;
pub use saddle_dimer::StopCondition;
pub use saddle_dimer::mep::MepParams;

/// Root settings object.
///
/// This is what you should deserialize.
#[derive(Serialize)]
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSettings(pub Settings);

/// Raw deserialized form of settings.
///
/// You shouldn't deserialize this type directly; deserialize `ValidatedSettings`
/// instead, so that the checks in `validate` are performed.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    /// The energy model.  See [`PotentialKind`].
    pub potential: PotentialKind,

    /// Starting center of the dimer, one row per movable particle.
    pub center: Vec<[f64; 3]>,

    /// Starting orientation.  Need not be normalized.
    ///
    /// If absent, a random direction is drawn (using `seed`, if given).
    #[serde(default)]
    pub orientation: Option<Vec<[f64; 3]>>,

    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default)]
    pub dimer: DimerParams,

    /// Replaces the default `{"force-sq": <dimer.force-sq-tol>}`.
    #[serde(default)]
    pub stop_condition: Option<StopCondition>,

    /// Keep the dimer from pointing along a rigid translation of all particles.
    #[serde(default)]
    pub exclude_translations: bool,

    /// Once the lowest mode is found, look for another unstable mode orthogonal to it.
    #[serde(default)]
    pub orthogonal_search: bool,

    /// Walk downhill from the saddle in both directions.  Absent disables this.
    #[serde(default)]
    pub mep: Option<MepParams>,
}
derive_yaml_read!{Settings}
derive_yaml_read!{ValidatedSettings}

impl<'de> de::Deserialize<'de> for ValidatedSettings {
    fn deserialize<D: de::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let cereal: Settings = de::Deserialize::deserialize(deserializer)?;

        cereal.validate().map_err(de::Error::custom)
    }
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum PotentialKind {
    /// `(x^2 - 1)^2 + y^2 + k z^2` on each particle.
    DoubleWell(Lift),
    /// `(x^2 - 1)^2 + c (y - x)^2 + k z^2` on each particle.
    CoupledDoubleWell(CoupledDoubleWell),
    /// The Müller-Brown surface, plus `k z^2`, on each particle.
    MullerBrown(Lift),
    LennardJones(LennardJones),
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Lift {
    #[serde(default = "lift__z_stiffness")]
    pub z_stiffness: f64,
}
fn lift__z_stiffness() -> f64 { 1.0 }

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct CoupledDoubleWell {
    #[serde(default = "coupled_double_well__coupling")]
    pub coupling: f64,
    #[serde(default = "lift__z_stiffness")]
    pub z_stiffness: f64,
}
fn coupled_double_well__coupling() -> f64 { 1.0 }

/// Pairwise 12-6 potential among the movable particles and between movable and
/// fixed particles.  No cutoff.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct LennardJones {
    #[serde(default = "lennard_jones__epsilon")]
    pub epsilon: f64,
    #[serde(default = "lennard_jones__sigma")]
    pub sigma: f64,
    /// Positions of particles that contribute to the energy but never move.
    #[serde(default)]
    pub fixed: Vec<[f64; 3]>,
    /// Separations below this (in units of sigma) are unphysical, and give an
    /// infinite energy.
    #[serde(default = "lennard_jones__overlap")]
    pub overlap: f64,
}
fn lennard_jones__epsilon() -> f64 { 1.0 }
fn lennard_jones__sigma() -> f64 { 1.0 }
fn lennard_jones__overlap() -> f64 { 0.5 }

impl Default for Lift {
    fn default() -> Self { Lift { z_stiffness: lift__z_stiffness() } }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::YamlRead;

    #[test]
    fn minimal_settings() {
        let yaml = "
potential:
  double-well: {}
center: [[0.1, 0.2, 0.0]]
";
        let ValidatedSettings(settings) = YamlRead::from_reader(yaml.as_bytes()).unwrap();
        assert_eq!(settings.potential, PotentialKind::DoubleWell(Lift::default()));
        assert_eq!(settings.dimer, DimerParams::default());
        assert_eq!(settings.orientation, None);
        assert_eq!(settings.mep, None);
        assert!(!settings.exclude_translations);
        assert!(!settings.orthogonal_search);
    }

    #[test]
    fn full_settings() {
        let yaml = "
potential:
  lennard-jones:
    sigma: 2.0
    fixed: [[0, 0, 0], [3, 0, 0]]
center: [[1.5, 1.0, 0.0], [1.5, -1.0, 0.0]]
orientation: [[0, 1, 0], [0, -1, 0]]
seed: 7
dimer:
  delta: 0.002
  max-iterations: 50
  refine: {}
stop-condition:
  any: [{force-max: 1.0e-4}, {force-rms: 1.0e-5}]
exclude-translations: true
orthogonal-search: true
mep:
  step-length: 0.005
";
        let ValidatedSettings(settings) = YamlRead::from_reader(yaml.as_bytes()).unwrap();
        match &settings.potential {
            PotentialKind::LennardJones(lj) => {
                assert_eq!(lj.sigma, 2.0);
                assert_eq!(lj.epsilon, 1.0);
                assert_eq!(lj.fixed.len(), 2);
            },
            p => panic!("unexpected potential: {:?}", p),
        }
        assert_eq!(settings.center.len(), 2);
        assert_eq!(settings.orientation.as_ref().map(|o| o.len()), Some(2));
        assert!(settings.exclude_translations);
        assert!(settings.orthogonal_search);
        assert_eq!(settings.seed, Some(7));
        assert_eq!(settings.dimer.delta, 0.002);
        assert_eq!(settings.dimer.max_iterations, 50);
        assert!(settings.dimer.refine.is_some());
        assert!(settings.stop_condition.is_some());
        assert_eq!(settings.mep.map(|m| m.step_length), Some(0.005));
    }

    #[test]
    fn typos_are_not_fatal() {
        let yaml = "
potential:
  muller-brown: {}
center: [[0.2, 0.3, 0.0]]
dimer:
  detla: 0.1
";
        let ValidatedSettings(settings) = YamlRead::from_reader(yaml.as_bytes()).unwrap();
        assert_eq!(settings.dimer.delta, DimerParams::default().delta);
    }
}
